use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

use crate::audio::SpatialAudio;
use crate::controls::{read_camera_parameters, ControlSource, SceneToggles};
use crate::input::ViewMatrixProvider;
use crate::orbit::{OrbitMode, OrbitPath, OrbitState};
use crate::stereo::{CameraParameters, StereoProjection};

/// Depth at which the surface is placed in front of the viewer.
const SURFACE_DEPTH: f32 = -20.0;
/// Horizontal nudge applied to each eye's model-view.
const EYE_SHIFT: f32 = 0.01;

const SPHERE_FOV: f32 = FRAC_PI_2;
const SPHERE_NEAR: f32 = 0.1;
const SPHERE_FAR: f32 = 100.0;

pub const CLEAR_COLOR: [f64; 4] = [1.0, 1.0, 1.0, 1.0];

/// GPU resident meshes the frame can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshId {
    Background,
    Sphere,
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    TriangleStrip,
    LineStrip,
}

/// Color channels a draw is allowed to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorMask {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
}

impl ColorMask {
    pub const ALL: Self = Self {
        red: true,
        green: true,
        blue: true,
        alpha: true,
    };
    /// Left eye, seen through the red filter.
    pub const RED: Self = Self {
        red: true,
        green: false,
        blue: false,
        alpha: false,
    };
    /// Right eye, seen through the cyan filter.
    pub const CYAN: Self = Self {
        red: false,
        green: true,
        blue: true,
        alpha: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Opaque black, what an unbound texture samples to.
    Blank,
    Surface,
    Webcam,
}

/// One draw call with everything the renderer needs to issue it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub label: &'static str,
    pub mesh: MeshId,
    pub topology: Topology,
    pub color_mask: ColorMask,
    pub depth_write: bool,
    /// Clear the depth buffer before this draw.
    pub clear_depth: bool,
    pub texture: TextureSlot,
    pub model_view: Mat4,
    pub projection: Mat4,
}

impl DrawCall {
    fn new(label: &'static str, mesh: MeshId, model_view: Mat4, projection: Mat4) -> Self {
        Self {
            label,
            mesh,
            topology: Topology::TriangleStrip,
            color_mask: ColorMask::ALL,
            depth_write: true,
            clear_depth: false,
            texture: TextureSlot::Blank,
            model_view,
            projection,
        }
    }
}

/// Everything needed to draw one frame, in submission order.
///
/// Projection matrices use GL clip conventions (depth in `[-1, 1]`); the
/// renderer remaps depth for its backend.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub clear_color: [f64; 4],
    pub camera: CameraParameters,
    pub stereo: StereoProjection,
    pub orbit_mode: OrbitMode,
    pub sphere_position: Vec3,
    pub draws: Vec<DrawCall>,
}

/// Mutable state carried from one frame to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    pub orbit: OrbitState,
    pub orbit_path: OrbitPath,
    pub camera_defaults: CameraParameters,
    pub draw_sphere_wireframe: bool,
}

impl SceneState {
    pub fn new(orbit_path: OrbitPath, camera_defaults: CameraParameters) -> Self {
        Self {
            orbit: OrbitState::new(),
            orbit_path,
            camera_defaults,
            draw_sphere_wireframe: true,
        }
    }
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new(OrbitPath::default(), CameraParameters::default())
    }
}

/// Builds the per-frame draw list from live controls and scene state.
#[derive(Debug, Clone, Default)]
pub struct FrameCompositor {
    scene: SceneState,
}

impl FrameCompositor {
    pub fn new(scene: SceneState) -> Self {
        Self { scene }
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    pub fn compose(
        &mut self,
        controls: &dyn ControlSource,
        view: &dyn ViewMatrixProvider,
        toggles: &SceneToggles,
    ) -> FramePlan {
        let camera = read_camera_parameters(controls, &self.scene.camera_defaults);
        let stereo = StereoProjection::build(&camera);

        let orbit_mode = self
            .scene
            .orbit
            .advance(&self.scene.orbit_path, toggles.active_orientation());
        let sphere_position = self.scene.orbit.position();
        let view = view.view_matrix();

        let mut draws = Vec::with_capacity(5);

        if toggles.webcam_enabled() {
            let projection = Mat4::orthographic_rh_gl(0.0, 1.0, 0.0, 1.0, -1.0, 1.0);
            draws.push(DrawCall {
                depth_write: false,
                texture: TextureSlot::Webcam,
                ..DrawCall::new("background", MeshId::Background, Mat4::IDENTITY, projection)
            });
        }

        let sphere_projection = Mat4::perspective_rh_gl(
            SPHERE_FOV,
            1.0,
            SPHERE_NEAR,
            SPHERE_FAR,
        );
        let sphere_model_view = Mat4::from_translation(sphere_position) * view;
        let sphere = DrawCall::new("sphere", MeshId::Sphere, sphere_model_view, sphere_projection);
        draws.push(sphere);
        if self.scene.draw_sphere_wireframe {
            draws.push(DrawCall {
                label: "sphere-wireframe",
                topology: Topology::LineStrip,
                ..sphere
            });
        }

        let left_model_view = Mat4::from_translation(Vec3::new(-EYE_SHIFT, 0.0, SURFACE_DEPTH)) * view;
        draws.push(DrawCall {
            color_mask: ColorMask::RED,
            clear_depth: true,
            texture: TextureSlot::Surface,
            ..DrawCall::new("surface-left", MeshId::Surface, left_model_view, stereo.left)
        });

        let right_model_view = Mat4::from_translation(Vec3::new(EYE_SHIFT, 0.0, SURFACE_DEPTH)) * view;
        draws.push(DrawCall {
            color_mask: ColorMask::CYAN,
            clear_depth: true,
            texture: TextureSlot::Surface,
            ..DrawCall::new("surface-right", MeshId::Surface, right_model_view, stereo.right)
        });

        FramePlan {
            clear_color: CLEAR_COLOR,
            camera,
            stereo,
            orbit_mode,
            sphere_position,
            draws,
        }
    }
}

/// Keeps the audio source glued to the sphere; nothing happens until the
/// audio graph has loaded.
pub fn sync_audio(plan: &FramePlan, audio: Option<&dyn SpatialAudio>, toggles: &SceneToggles) {
    if let Some(audio) = audio {
        audio.set_position(plan.sphere_position);
        audio.set_filter_enabled(toggles.filter_enabled());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::controls::{ControlPanel, EYE_SEPARATION};
    use crate::orbit::OrientationReading;

    struct FixedView(Mat4);

    impl ViewMatrixProvider for FixedView {
        fn view_matrix(&self) -> Mat4 {
            self.0
        }
    }

    fn compose_once(compositor: &mut FrameCompositor, toggles: &SceneToggles) -> FramePlan {
        let panel = ControlPanel::new(&CameraParameters::default());
        compositor.compose(&panel, &FixedView(Mat4::from_rotation_y(0.3)), toggles)
    }

    #[test]
    fn draw_order_without_webcam() {
        let mut compositor = FrameCompositor::default();
        let plan = compose_once(&mut compositor, &SceneToggles::new());
        let labels: Vec<_> = plan.draws.iter().map(|draw| draw.label).collect();
        assert_eq!(
            labels,
            ["sphere", "sphere-wireframe", "surface-left", "surface-right"]
        );
        assert_eq!(plan.clear_color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(plan.draws[1].topology, Topology::LineStrip);
        assert_eq!(plan.draws[2].color_mask, ColorMask::RED);
        assert_eq!(plan.draws[3].color_mask, ColorMask::CYAN);
        assert!(plan.draws[2].clear_depth && plan.draws[3].clear_depth);
        assert!(!plan.draws[0].clear_depth);
        assert_eq!(plan.draws[2].projection, plan.stereo.left);
        assert_eq!(plan.draws[3].projection, plan.stereo.right);
    }

    #[test]
    fn webcam_background_is_drawn_first() {
        let toggles = SceneToggles::new();
        toggles.set_webcam_enabled(true);
        let mut compositor = FrameCompositor::default();
        let plan = compose_once(&mut compositor, &toggles);
        let background = plan.draws[0];
        assert_eq!(background.mesh, MeshId::Background);
        assert_eq!(background.texture, TextureSlot::Webcam);
        assert!(!background.depth_write);
        assert_eq!(background.model_view, Mat4::IDENTITY);
        let corner = background.projection.project_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!(corner.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn eyes_are_shifted_apart() {
        let mut compositor = FrameCompositor::default();
        let plan = compose_once(&mut compositor, &SceneToggles::new());
        let left = plan.draws[2].model_view.transform_point3(Vec3::ZERO);
        let right = plan.draws[3].model_view.transform_point3(Vec3::ZERO);
        assert!(left.abs_diff_eq(Vec3::new(-0.01, 0.0, -20.0), 1e-6));
        assert!(right.abs_diff_eq(Vec3::new(0.01, 0.0, -20.0), 1e-6));
    }

    #[test]
    fn sphere_is_translated_to_orbit() {
        let mut compositor = FrameCompositor::default();
        let plan = compose_once(&mut compositor, &SceneToggles::new());
        let centre = plan.draws[0].model_view.transform_point3(Vec3::ZERO);
        assert!(centre.abs_diff_eq(plan.sphere_position, 1e-6));
        assert_eq!(plan.orbit_mode, OrbitMode::Time);
    }

    #[test]
    fn sphere_uses_square_wide_perspective() {
        let mut compositor = FrameCompositor::default();
        let plan = compose_once(&mut compositor, &SceneToggles::new());
        let sphere = plan.draws[0];
        let wireframe = plan.draws[1];
        assert_eq!(sphere.mesh, MeshId::Sphere);
        assert_eq!(
            sphere.projection,
            Mat4::perspective_rh_gl(FRAC_PI_2, 1.0, 0.1, 100.0)
        );
        assert_eq!(wireframe.mesh, MeshId::Sphere);
        assert_eq!(wireframe.projection, sphere.projection);
        assert_eq!(wireframe.model_view, sphere.model_view);
    }

    #[test]
    fn repeated_frames_share_transforms() {
        let toggles = SceneToggles::new();
        let mut compositor = FrameCompositor::default();
        let first = compose_once(&mut compositor, &toggles);
        let second = compose_once(&mut compositor, &toggles);
        assert_eq!(first.stereo, second.stereo);
        assert_eq!(first.draws[2], second.draws[2]);
        assert_eq!(first.draws[3], second.draws[3]);
        assert_ne!(first.sphere_position, second.sphere_position);
    }

    #[test]
    fn sensor_driven_frames_are_identical() {
        let toggles = SceneToggles::new();
        toggles.set_orientation_enabled(true);
        toggles.record_orientation(OrientationReading {
            alpha: 30.0,
            beta: 5.0,
            gamma: 5.0,
        });
        let mut compositor = FrameCompositor::default();
        let first = compose_once(&mut compositor, &toggles);
        let second = compose_once(&mut compositor, &toggles);
        assert_eq!(first, second);
        assert_eq!(first.orbit_mode, OrbitMode::Sensor);
    }

    #[test]
    fn live_controls_change_projection() {
        let panel = ControlPanel::new(&CameraParameters::default());
        let view = FixedView(Mat4::IDENTITY);
        let toggles = SceneToggles::new();
        let mut compositor = FrameCompositor::default();
        let before = compositor.compose(&panel, &view, &toggles);
        panel.set(EYE_SEPARATION, 0.0);
        let after = compositor.compose(&panel, &view, &toggles);
        assert_ne!(before.stereo.left, before.stereo.right);
        assert_eq!(after.stereo.left, after.stereo.right);
    }

    #[derive(Default)]
    struct RecordingAudio {
        positions: RefCell<Vec<Vec3>>,
        filter: RefCell<Option<bool>>,
    }

    impl SpatialAudio for RecordingAudio {
        fn set_position(&self, position: Vec3) {
            self.positions.borrow_mut().push(position);
        }

        fn set_filter_enabled(&self, enabled: bool) {
            *self.filter.borrow_mut() = Some(enabled);
        }
    }

    #[test]
    fn audio_follows_sphere_when_present() {
        let toggles = SceneToggles::new();
        toggles.set_filter_enabled(true);
        let mut compositor = FrameCompositor::default();
        let plan = compose_once(&mut compositor, &toggles);

        sync_audio(&plan, None, &toggles);

        let audio = RecordingAudio::default();
        sync_audio(&plan, Some(&audio), &toggles);
        assert_eq!(audio.positions.borrow().as_slice(), &[plan.sphere_position]);
        assert_eq!(*audio.filter.borrow(), Some(true));
    }
}
