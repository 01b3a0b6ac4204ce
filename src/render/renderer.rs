use std::collections::HashMap;
use std::ops::Range;

use glam::Mat4;

use crate::assets::TextureImage;
use crate::compositor::{DrawCall, FramePlan, MeshId, TextureSlot};
use crate::error::DemoError;
use crate::mesh::Mesh;

use super::buffers::{GeometryBuffer, TransformSlots, TransformUniform};
use super::depth::DepthBuffer;
use super::program::{PipelineKey, ShaderProgram};
use super::shared::{FRAGMENT_SHADER, VERTEX_SHADER};
use super::textures::{create_sampler, GpuTexture};

/// Remaps GL clip depth `[-1, 1]` to the `[0, 1]` range wgpu expects.
const GL_TO_WGPU_DEPTH: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.5, 0.0, //
    0.0, 0.0, 0.5, 1.0,
]);

const INITIAL_TRANSFORM_SLOTS: usize = 8;

/// wgpu renderer executing composed frames. Runs on native windows and, via
/// the WebGL2 backend, on an HTML canvas.
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthBuffer,
    program: ShaderProgram,
    transforms: TransformSlots,
    meshes: HashMap<MeshId, GeometryBuffer>,
    textures: HashMap<TextureSlot, GpuTexture>,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
}

impl Renderer {
    /// Creates the GPU context for `target` and compiles the shader program.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, DemoError> {
        if width == 0 || height == 0 {
            return Err(DemoError::UnsupportedContext(
                "drawing surface has zero area".into(),
            ));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(target)
            .map_err(|err| DemoError::UnsupportedContext(err.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| DemoError::UnsupportedContext("no compatible GPU adapter".into()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .map_err(|err| DemoError::UnsupportedContext(err.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| !format.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| DemoError::UnsupportedContext("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, width, height);
        let program =
            ShaderProgram::compile(&device, "basic", VERTEX_SHADER, FRAGMENT_SHADER, surface_format)
                .await?;
        let transforms =
            TransformSlots::new(&device, program.transforms_layout(), INITIAL_TRANSFORM_SLOTS);
        let repeat_sampler = create_sampler(&device, wgpu::AddressMode::Repeat);
        let clamp_sampler = create_sampler(&device, wgpu::AddressMode::ClampToEdge);

        let mut renderer = Self {
            surface,
            device,
            queue,
            config,
            depth,
            program,
            transforms,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            repeat_sampler,
            clamp_sampler,
        };
        renderer.upload_texture(TextureSlot::Blank, &TextureImage::solid([0, 0, 0, 255]));
        log::info!(
            "renderer ready: {:?} {surface_format:?} {width}x{height}",
            adapter.get_info().backend
        );
        Ok(renderer)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, width, height);
    }

    /// Uploads `mesh` under `id`, replacing any previous contents.
    pub fn buffer_mesh(&mut self, id: MeshId, mesh: &Mesh) {
        match self.meshes.get_mut(&id) {
            Some(buffer) => buffer.buffer_data(&self.device, mesh),
            None => {
                let buffer = GeometryBuffer::new(&self.device, mesh_label(id), mesh);
                self.meshes.insert(id, buffer);
            }
        }
    }

    pub fn upload_texture(&mut self, slot: TextureSlot, image: &TextureImage) {
        let sampler = match slot {
            TextureSlot::Webcam => &self.clamp_sampler,
            TextureSlot::Blank | TextureSlot::Surface => &self.repeat_sampler,
        };
        let layout = self.program.texture_layout();
        match self.textures.get_mut(&slot) {
            Some(texture) => texture.upload(&self.device, &self.queue, layout, sampler, image),
            None => {
                let texture = GpuTexture::new(
                    &self.device,
                    &self.queue,
                    layout,
                    sampler,
                    texture_label(slot),
                    image,
                );
                self.textures.insert(slot, texture);
            }
        }
    }

    /// Draws every call of `plan`, starting a new pass wherever depth is cleared.
    pub fn render(&mut self, plan: &FramePlan) -> Result<(), wgpu::SurfaceError> {
        if plan.draws.len() > self.transforms.capacity() {
            self.transforms = TransformSlots::new(
                &self.device,
                self.program.transforms_layout(),
                plan.draws.len() * 2,
            );
        }
        for (slot, draw) in plan.draws.iter().enumerate() {
            let uniform = TransformUniform::new(draw.model_view, GL_TO_WGPU_DEPTH * draw.projection);
            self.transforms.write(&self.queue, slot, &uniform);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        let [r, g, b, a] = plan.clear_color;
        for (index, range) in depth_passes(&plan.draws).into_iter().enumerate() {
            let color_load = if index == 0 {
                wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a })
            } else {
                wgpu::LoadOp::Load
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for slot in range {
                self.record_draw(&mut pass, slot, &plan.draws[slot]);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn record_draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, slot: usize, draw: &DrawCall) {
        let Some(mesh) = self.meshes.get(&draw.mesh) else {
            log::trace!("skipping {}: mesh not uploaded", draw.label);
            return;
        };
        let Some(pipeline) = self.program.pipeline(&PipelineKey::of(draw)) else {
            log::warn!("skipping {}: no pipeline for {:?}", draw.label, PipelineKey::of(draw));
            return;
        };
        let texture = self
            .textures
            .get(&draw.texture)
            .or_else(|| self.textures.get(&TextureSlot::Blank));
        let Some(texture) = texture else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, self.transforms.bind_group(), &[self.transforms.offset(slot)]);
        pass.set_bind_group(1, texture.bind_group(), &[]);
        mesh.draw(pass);
    }
}

/// Splits the draw list at every depth clear. The first range always exists
/// so the frame is cleared even when nothing is drawn.
fn depth_passes(draws: &[DrawCall]) -> Vec<Range<usize>> {
    let mut passes = Vec::new();
    let mut start = 0;
    for (index, draw) in draws.iter().enumerate() {
        if index > start && draw.clear_depth {
            passes.push(start..index);
            start = index;
        }
    }
    passes.push(start..draws.len());
    passes
}

fn mesh_label(id: MeshId) -> &'static str {
    match id {
        MeshId::Background => "background",
        MeshId::Sphere => "sphere",
        MeshId::Surface => "surface",
    }
}

fn texture_label(slot: TextureSlot) -> &'static str {
    match slot {
        TextureSlot::Blank => "blank-texture",
        TextureSlot::Surface => "surface-texture",
        TextureSlot::Webcam => "webcam-texture",
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::compositor::FrameCompositor;
    use crate::controls::{ControlPanel, SceneToggles};
    use crate::input::TrackballRotator;
    use crate::stereo::CameraParameters;

    fn plan(webcam: bool) -> FramePlan {
        let toggles = SceneToggles::new();
        toggles.set_webcam_enabled(webcam);
        let panel = ControlPanel::new(&CameraParameters::default());
        let trackball = TrackballRotator::new(64, 64, 0.0);
        FrameCompositor::default().compose(&panel, &trackball, &toggles)
    }

    #[test]
    fn passes_split_at_depth_clears() {
        assert_eq!(depth_passes(&plan(false).draws), vec![0..2, 2..3, 3..4]);
        assert_eq!(depth_passes(&plan(true).draws), vec![0..3, 3..4, 4..5]);
        assert_eq!(depth_passes(&[]), vec![0..0]);
    }

    #[test]
    fn depth_remap_maps_gl_range() {
        let near = GL_TO_WGPU_DEPTH * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = GL_TO_WGPU_DEPTH * Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(near.z / near.w, 0.0);
        assert_eq!(far.z / far.w, 1.0);
    }
}
