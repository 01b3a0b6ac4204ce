use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::compositor::{ColorMask, DrawCall, Topology};
use crate::error::{DemoError, ShaderStage};

use super::buffers::{TransformUniform, POSITION_LAYOUT, TEXCOORD_LAYOUT};
use super::depth::DepthBuffer;

/// Fixed state a pipeline is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub topology: Topology,
    pub color_mask: ColorMask,
    pub depth_write: bool,
}

impl PipelineKey {
    /// Every combination the frame compositor emits.
    pub const VARIANTS: [PipelineKey; 5] = [
        PipelineKey {
            topology: Topology::TriangleStrip,
            color_mask: ColorMask::ALL,
            depth_write: false,
        },
        PipelineKey {
            topology: Topology::TriangleStrip,
            color_mask: ColorMask::ALL,
            depth_write: true,
        },
        PipelineKey {
            topology: Topology::LineStrip,
            color_mask: ColorMask::ALL,
            depth_write: true,
        },
        PipelineKey {
            topology: Topology::TriangleStrip,
            color_mask: ColorMask::RED,
            depth_write: true,
        },
        PipelineKey {
            topology: Topology::TriangleStrip,
            color_mask: ColorMask::CYAN,
            depth_write: true,
        },
    ];

    pub fn of(draw: &DrawCall) -> Self {
        Self {
            topology: draw.topology,
            color_mask: draw.color_mask,
            depth_write: draw.depth_write,
        }
    }
}

impl From<Topology> for wgpu::PrimitiveTopology {
    fn from(topology: Topology) -> Self {
        match topology {
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        }
    }
}

impl From<ColorMask> for wgpu::ColorWrites {
    fn from(mask: ColorMask) -> Self {
        let mut writes = wgpu::ColorWrites::empty();
        writes.set(wgpu::ColorWrites::RED, mask.red);
        writes.set(wgpu::ColorWrites::GREEN, mask.green);
        writes.set(wgpu::ColorWrites::BLUE, mask.blue);
        writes.set(wgpu::ColorWrites::ALPHA, mask.alpha);
        writes
    }
}

/// Compiled vertex and fragment stages plus every pipeline built from them.
///
/// Binding layouts are resolved once here:
/// group 0 holds the transforms (dynamic offset), group 1 the texture and
/// its sampler.
pub struct ShaderProgram {
    name: String,
    transforms_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl ShaderProgram {
    pub async fn compile(
        device: &wgpu::Device,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, DemoError> {
        let vertex = compile_stage(device, name, ShaderStage::Vertex, vertex_source).await?;
        let fragment = compile_stage(device, name, ShaderStage::Fragment, fragment_source).await?;

        let transforms_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("transforms-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(TransformUniform::SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{name}-pipeline-layout")),
            bind_group_layouts: &[&transforms_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipelines = PipelineKey::VARIANTS
            .iter()
            .map(|key| {
                let pipeline =
                    create_pipeline(device, name, &layout, &vertex, &fragment, target_format, key);
                (*key, pipeline)
            })
            .collect();
        if let Some(err) = device.pop_error_scope().await {
            return Err(DemoError::ShaderLink(err.to_string()));
        }

        log::debug!("compiled shader program {name}");
        Ok(Self {
            name: name.to_string(),
            transforms_layout,
            texture_layout,
            pipelines,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transforms_layout(&self) -> &wgpu::BindGroupLayout {
        &self.transforms_layout
    }

    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    pub fn pipeline(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }
}

async fn compile_stage(
    device: &wgpu::Device,
    name: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, DemoError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{name}-{stage}")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match device.pop_error_scope().await {
        Some(err) => Err(DemoError::ShaderCompile {
            stage,
            log: err.to_string(),
        }),
        None => Ok(module),
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    name: &str,
    layout: &wgpu::PipelineLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    target_format: wgpu::TextureFormat,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{name}-{key:?}")),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: "vs_main",
            buffers: &[POSITION_LAYOUT, TEXCOORD_LAYOUT],
        },
        primitive: wgpu::PrimitiveState {
            topology: key.topology.into(),
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: key.depth_write,
            depth_compare: if key.depth_write {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: None,
                write_mask: key.color_mask.into(),
            })],
        }),
        multiview: None,
    })
}
