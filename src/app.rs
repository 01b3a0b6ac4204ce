use std::fmt;
use std::sync::Arc;

use crate::assets::{AssetSlot, TextureImage};
use crate::audio::SpatialAudio;
use crate::compositor::{sync_audio, FrameCompositor, FramePlan, MeshId, SceneState, TextureSlot};
use crate::config::DemoConfig;
use crate::controls::{ControlSource, SceneToggles};
use crate::input::ViewMatrixProvider;
use crate::mesh::{background_quad, Mesh};
use crate::render::Renderer;
use crate::stereo::StereoProjection;
use crate::surface::{create_surface_data, ShapeParameters, SurfaceSampling, SurfaceState};
use crate::webcam::WebcamSource;

/// Host supplied inputs read on every frame.
pub struct Collaborators {
    pub controls: Arc<dyn ControlSource>,
    pub view: Arc<dyn ViewMatrixProvider>,
    pub toggles: Arc<SceneToggles>,
    pub webcam: Box<dyn WebcamSource>,
}

/// The running demo: GPU state, per-frame scene state and the assets still
/// being loaded.
pub struct DemoApp {
    renderer: Renderer,
    compositor: FrameCompositor,
    collaborators: Collaborators,
    audio: Option<Box<dyn SpatialAudio>>,
    pending_audio: Option<AssetSlot<Box<dyn SpatialAudio>>>,
    pending_texture: Option<AssetSlot<TextureImage>>,
    surface: SurfaceState,
}

impl DemoApp {
    /// Builds every mesh once and uploads it.
    pub fn new(mut renderer: Renderer, config: &DemoConfig, collaborators: Collaborators) -> Self {
        renderer.buffer_mesh(MeshId::Background, &background_quad());
        renderer.buffer_mesh(MeshId::Sphere, &config.sphere.build());
        let surface = SurfaceState::new(config.shape, config.sampling, config.zoom);
        let mesh = surface.mesh();
        log::info!("surface mesh: {} vertices", mesh.vertex_count());
        renderer.buffer_mesh(MeshId::Surface, &mesh);
        renderer.upload_texture(TextureSlot::Surface, &TextureImage::solid([0, 0, 0, 255]));

        Self {
            renderer,
            compositor: FrameCompositor::new(SceneState::new(config.orbit, config.camera)),
            collaborators,
            audio: None,
            pending_audio: None,
            pending_texture: None,
            surface,
        }
    }

    /// Surface texture arriving later; frames render untextured until then.
    pub fn attach_texture(&mut self, slot: AssetSlot<TextureImage>) {
        self.pending_texture = Some(slot);
    }

    pub fn attach_audio(&mut self, slot: AssetSlot<Box<dyn SpatialAudio>>) {
        self.pending_audio = Some(slot);
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn scene(&self) -> &SceneState {
        self.compositor.scene()
    }

    pub fn scene_mut(&mut self) -> &mut SceneState {
        self.compositor.scene_mut()
    }

    pub fn toggles(&self) -> &Arc<SceneToggles> {
        &self.collaborators.toggles
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Composes and draws one frame from the current control snapshot.
    pub fn render_frame(&mut self) -> Result<FramePlan, wgpu::SurfaceError> {
        self.poll_assets();

        if self.collaborators.webcam.is_enabled() {
            if let Some(frame) = self.collaborators.webcam.current_frame() {
                self.renderer.upload_texture(TextureSlot::Webcam, &frame);
            }
        }

        let plan = self.compositor.compose(
            self.collaborators.controls.as_ref(),
            self.collaborators.view.as_ref(),
            &self.collaborators.toggles,
        );
        sync_audio(&plan, self.audio.as_deref(), &self.collaborators.toggles);
        self.renderer.render(&plan)?;
        Ok(plan)
    }

    pub fn set_shape_parameters(&mut self, shape: ShapeParameters) {
        let mesh = self.surface.set_shape_parameters(shape);
        self.rebuffer_surface(mesh);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let mesh = self.surface.set_zoom(zoom);
        self.rebuffer_surface(mesh);
    }

    pub fn set_surface_sampling(&mut self, sampling: SurfaceSampling) {
        let mesh = self.surface.set_surface_sampling(sampling);
        self.rebuffer_surface(mesh);
    }

    pub fn zoom(&self) -> f64 {
        self.surface.zoom()
    }

    fn rebuffer_surface(&mut self, mesh: Option<Mesh>) {
        if let Some(mesh) = mesh {
            log::debug!("regenerated surface: {} vertices", mesh.vertex_count());
            self.renderer.buffer_mesh(MeshId::Surface, &mesh);
        }
    }

    fn poll_assets(&mut self) {
        if let Some(slot) = &self.pending_texture {
            if let Some(image) = slot.take_ready() {
                log::info!("{} loaded ({}x{})", slot.name(), image.width, image.height);
                self.renderer.upload_texture(TextureSlot::Surface, &image);
            }
            if !slot.is_pending() {
                self.pending_texture = None;
            }
        }
        if let Some(slot) = &self.pending_audio {
            if let Some(audio) = slot.take_ready() {
                log::info!("{} ready", slot.name());
                self.audio = Some(audio);
            }
            if !slot.is_pending() {
                self.pending_audio = None;
            }
        }
    }
}

/// Mesh and projection statistics, printed in headless mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub surface_vertices: usize,
    pub surface_rows: usize,
    pub surface_columns: usize,
    pub sphere_vertices: usize,
    pub background_vertices: usize,
    pub stereo: StereoProjection,
}

impl SceneSummary {
    pub fn from_config(config: &DemoConfig) -> Self {
        let surface = create_surface_data(&config.shape, &config.sampling, config.zoom);
        let sphere: Mesh = config.sphere.build();
        Self {
            surface_vertices: surface.vertex_count(),
            surface_rows: config.sampling.rows(config.shape.b),
            surface_columns: config.sampling.columns(),
            sphere_vertices: sphere.vertex_count(),
            background_vertices: background_quad().vertex_count(),
            stereo: StereoProjection::build(&config.camera),
        }
    }
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "surface: {} vertices ({} rows x {} columns x 2)",
            self.surface_vertices, self.surface_rows, self.surface_columns
        )?;
        writeln!(f, "sphere: {} vertices", self.sphere_vertices)?;
        writeln!(f, "background: {} vertices", self.background_vertices)?;
        for (name, eye) in [("left", &self.stereo.left_eye), ("right", &self.stereo.right_eye)] {
            writeln!(
                f,
                "{name} eye: left={:.4} right={:.4} bottom={:.4} top={:.4} near={} far={}",
                eye.left, eye.right, eye.bottom, eye.top, eye.near, eye.far
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::SphereSettings;

    #[test]
    fn summary_counts_default_meshes() {
        let config = DemoConfig {
            sphere: SphereSettings {
                lat_segments: 4,
                lon_segments: 4,
                ..SphereSettings::default()
            },
            ..DemoConfig::default()
        };
        let summary = SceneSummary::from_config(&config);
        assert_eq!(summary.surface_rows, 6001);
        assert_eq!(summary.surface_columns, 13);
        assert_eq!(summary.surface_vertices, 6001 * 13 * 2);
        assert_eq!(summary.sphere_vertices, 25);
        assert_eq!(summary.background_vertices, 6);
    }

    #[test]
    fn summary_prints_both_eyes() {
        let text = SceneSummary::from_config(&DemoConfig {
            sampling: SurfaceSampling {
                radial_step: 0.25,
                angular_step: 0.5,
            },
            sphere: SphereSettings {
                lat_segments: 2,
                lon_segments: 2,
                ..SphereSettings::default()
            },
            ..DemoConfig::default()
        })
        .to_string();
        assert!(text.contains("surface: 650 vertices (25 rows x 13 columns x 2)"));
        assert!(text.contains("sphere: 9 vertices"));
        assert!(text.contains("left eye:"));
        assert!(text.contains("right eye:"));
    }
}
