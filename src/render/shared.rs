pub const VERTEX_SHADER: &str = r#"
struct Transforms {
    model_view: mat4x4<f32>,
    projection: mat4x4<f32>,
}

struct VertexInput {
    @location(0) vertex: vec3<f32>,
    @location(1) texture_coords: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) texture_coords: vec2<f32>,
}

@group(0) @binding(0)
var<uniform> transforms: Transforms;

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.position = transforms.projection * transforms.model_view * vec4<f32>(input.vertex, 1.0);
    output.texture_coords = input.texture_coords;
    return output;
}
"#;

pub const FRAGMENT_SHADER: &str = r#"
struct FragmentInput {
    @location(0) texture_coords: vec2<f32>,
}

@group(1) @binding(0)
var texture_unit: texture_2d<f32>;

@group(1) @binding(1)
var texture_sampler: sampler;

@fragment
fn fs_main(input: FragmentInput) -> @location(0) vec4<f32> {
    return textureSample(texture_unit, texture_sampler, input.texture_coords);
}
"#;
