use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::orbit::OrientationReading;
use crate::stereo::CameraParameters;

pub const EYE_SEPARATION: &str = "eyeSeparation";
pub const FOV: &str = "fov";
pub const NEAR_CLIPPING_DISTANCE: &str = "nearClippingDistance";
pub const CONVERGENCE_DISTANCE: &str = "convergenceDistance";

/// Range and step of one numeric control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ControlSpec {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Camera controls, in display order. The ranges keep the projection
/// well defined: convergence never reaches zero and fov stays below π.
pub const CAMERA_CONTROLS: [ControlSpec; 4] = [
    ControlSpec {
        id: EYE_SEPARATION,
        label: "Eye separation",
        min: 0.0,
        max: 5.0,
        step: 0.01,
    },
    ControlSpec {
        id: FOV,
        label: "Field of view",
        min: 0.1,
        max: 3.0,
        step: 0.01,
    },
    ControlSpec {
        id: NEAR_CLIPPING_DISTANCE,
        label: "Near clipping distance",
        min: 0.1,
        max: 20.0,
        step: 0.1,
    },
    ControlSpec {
        id: CONVERGENCE_DISTANCE,
        label: "Convergence distance",
        min: 1.0,
        max: 200.0,
        step: 0.5,
    },
];

pub fn control_spec(id: &str) -> Option<&'static ControlSpec> {
    CAMERA_CONTROLS.iter().find(|spec| spec.id == id)
}

/// Source of live numeric control values.
pub trait ControlSource {
    fn value_by_id(&self, id: &str) -> Option<f32>;
}

impl<T> ControlSource for Arc<T>
where
    T: ControlSource + ?Sized,
{
    fn value_by_id(&self, id: &str) -> Option<f32> {
        (**self).value_by_id(id)
    }
}

/// Reads the camera controls, using `fallback` for anything missing.
pub fn read_camera_parameters(
    controls: &dyn ControlSource,
    fallback: &CameraParameters,
) -> CameraParameters {
    CameraParameters {
        eye_separation: controls
            .value_by_id(EYE_SEPARATION)
            .unwrap_or(fallback.eye_separation),
        fov: controls.value_by_id(FOV).unwrap_or(fallback.fov),
        near_clipping_distance: controls
            .value_by_id(NEAR_CLIPPING_DISTANCE)
            .unwrap_or(fallback.near_clipping_distance),
        convergence_distance: controls
            .value_by_id(CONVERGENCE_DISTANCE)
            .unwrap_or(fallback.convergence_distance),
    }
}

/// In-memory control values, clamped to their [`ControlSpec`].
#[derive(Debug, Default)]
pub struct ControlPanel {
    values: RwLock<HashMap<&'static str, f32>>,
}

impl ControlPanel {
    pub fn new(defaults: &CameraParameters) -> Self {
        let panel = Self::default();
        panel.set(EYE_SEPARATION, defaults.eye_separation);
        panel.set(FOV, defaults.fov);
        panel.set(NEAR_CLIPPING_DISTANCE, defaults.near_clipping_distance);
        panel.set(CONVERGENCE_DISTANCE, defaults.convergence_distance);
        panel
    }

    /// Stores a clamped value; unknown ids are ignored.
    pub fn set(&self, id: &str, value: f32) -> bool {
        let Some(spec) = control_spec(id) else {
            return false;
        };
        self.values.write().insert(spec.id, spec.clamp(value));
        true
    }

    /// Moves a control by `steps` increments of its step size.
    pub fn nudge(&self, id: &str, steps: f32) -> Option<f32> {
        let spec = control_spec(id)?;
        let mut values = self.values.write();
        let value = values.entry(spec.id).or_insert(spec.min);
        *value = spec.clamp(*value + spec.step * steps);
        Some(*value)
    }

    pub fn snapshot(&self) -> Vec<(&'static str, f32)> {
        CAMERA_CONTROLS
            .iter()
            .filter_map(|spec| self.value_by_id(spec.id).map(|value| (spec.id, value)))
            .collect()
    }
}

impl ControlSource for ControlPanel {
    fn value_by_id(&self, id: &str) -> Option<f32> {
        self.values.read().get(id).copied()
    }
}

/// Feature switches flipped by the host UI and read once per frame.
#[derive(Debug, Default)]
pub struct SceneToggles {
    webcam_enabled: RwLock<bool>,
    orientation_enabled: RwLock<bool>,
    orientation: RwLock<Option<OrientationReading>>,
    filter_enabled: RwLock<bool>,
}

impl SceneToggles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_webcam_enabled(&self, enabled: bool) {
        *self.webcam_enabled.write() = enabled;
    }

    pub fn webcam_enabled(&self) -> bool {
        *self.webcam_enabled.read()
    }

    pub fn set_orientation_enabled(&self, enabled: bool) {
        *self.orientation_enabled.write() = enabled;
    }

    pub fn orientation_enabled(&self) -> bool {
        *self.orientation_enabled.read()
    }

    pub fn record_orientation(&self, reading: OrientationReading) {
        *self.orientation.write() = Some(reading);
    }

    /// Latest reading, only while orientation control is switched on.
    pub fn active_orientation(&self) -> Option<OrientationReading> {
        if self.orientation_enabled() {
            *self.orientation.read()
        } else {
            None
        }
    }

    pub fn set_filter_enabled(&self, enabled: bool) {
        *self.filter_enabled.write() = enabled;
    }

    pub fn filter_enabled(&self) -> bool {
        *self.filter_enabled.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_clamps_to_spec() {
        let panel = ControlPanel::new(&CameraParameters::default());
        assert!(panel.set(FOV, 10.0));
        assert_eq!(panel.value_by_id(FOV), Some(3.0));
        assert!(panel.set(CONVERGENCE_DISTANCE, 0.0));
        assert_eq!(panel.value_by_id(CONVERGENCE_DISTANCE), Some(1.0));
        assert!(!panel.set("zoom", 2.0));
        assert_eq!(panel.value_by_id("zoom"), None);
    }

    #[test]
    fn nudge_moves_by_step() {
        let panel = ControlPanel::new(&CameraParameters::default());
        let before = panel.value_by_id(EYE_SEPARATION).unwrap();
        let after = panel.nudge(EYE_SEPARATION, 2.0).unwrap();
        assert!((after - before - 0.02).abs() < 1e-6);
        assert_eq!(panel.nudge(EYE_SEPARATION, -1000.0), Some(0.0));
    }

    #[test]
    fn missing_controls_fall_back() {
        struct OnlyFov;
        impl ControlSource for OnlyFov {
            fn value_by_id(&self, id: &str) -> Option<f32> {
                (id == FOV).then_some(0.9)
            }
        }
        let fallback = CameraParameters::default();
        let camera = read_camera_parameters(&OnlyFov, &fallback);
        assert_eq!(camera.fov, 0.9);
        assert_eq!(camera.eye_separation, fallback.eye_separation);
        assert_eq!(camera.convergence_distance, fallback.convergence_distance);
    }

    #[test]
    fn orientation_hidden_while_disabled() {
        let toggles = SceneToggles::new();
        toggles.record_orientation(OrientationReading {
            alpha: 1.0,
            beta: 2.0,
            gamma: 3.0,
        });
        assert_eq!(toggles.active_orientation(), None);
        toggles.set_orientation_enabled(true);
        assert_eq!(toggles.active_orientation().map(|r| r.alpha), Some(1.0));
    }

    #[test]
    fn default_camera_fits_control_ranges() {
        let defaults = CameraParameters::default();
        let panel = ControlPanel::new(&defaults);
        assert_eq!(read_camera_parameters(&panel, &defaults), defaults);
    }
}
