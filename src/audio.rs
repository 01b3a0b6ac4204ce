use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Positional audio source following the orbiting sphere.
pub trait SpatialAudio {
    fn set_position(&self, position: Vec3);

    /// Routes the panned signal through the peaking filter or around it.
    fn set_filter_enabled(&self, enabled: bool);
}

/// Peaking equaliser applied to the panned signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakingFilter {
    pub frequency: f32,
    pub gain: f32,
    pub q: f32,
}

impl Default for PeakingFilter {
    fn default() -> Self {
        Self {
            frequency: 1000.0,
            gain: 25.0,
            q: 1.0,
        }
    }
}
