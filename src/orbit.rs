use std::f32::consts::FRAC_PI_2;
use std::f64::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Angle added to the accumulator every frame in time driven mode.
pub const TIME_STEP: f64 = 0.02;

/// Latest device orientation event, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrientationReading {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl OrientationReading {
    /// Browsers report zeros (or nulls) until the sensor delivers data.
    pub fn is_live(&self) -> bool {
        self.alpha != 0.0 && self.beta != 0.0 && self.gamma != 0.0
    }

    pub fn orbit_angle(&self) -> f32 {
        self.alpha.to_radians() + FRAC_PI_2
    }
}

/// Circle followed by the sphere in the `xz` plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitPath {
    pub offset_x: f32,
    pub offset_y: f32,
    pub offset_z: f32,
    pub radius: f32,
}

impl Default for OrbitPath {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            offset_z: -5.0,
            radius: 4.0,
        }
    }
}

impl OrbitPath {
    pub fn point_at(&self, angle: f32) -> Vec3 {
        Vec3::new(
            self.offset_x + angle.cos() * self.radius,
            self.offset_y,
            self.offset_z + angle.sin() * self.radius,
        )
    }
}

/// Which input drove the orbit on a given frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitMode {
    Sensor,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrbitState {
    angle_step: f64,
    position: Vec3,
}

impl OrbitState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn angle_step(&self) -> f64 {
        self.angle_step
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Moves the sphere for one frame.
    ///
    /// A live sensor reading wins and leaves the accumulator untouched;
    /// otherwise the accumulator advances by [`TIME_STEP`]. The accumulator
    /// is kept in `f64` and only its phase is narrowed for the position.
    pub fn advance(&mut self, path: &OrbitPath, sensor: Option<OrientationReading>) -> OrbitMode {
        let (angle, mode) = match sensor.filter(OrientationReading::is_live) {
            Some(reading) => (reading.orbit_angle(), OrbitMode::Sensor),
            None => {
                self.angle_step += TIME_STEP;
                ((self.angle_step % TAU) as f32, OrbitMode::Time)
            }
        };
        self.position = path.point_at(angle);
        mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn time_mode_stays_on_circle() {
        let path = OrbitPath::default();
        let mut state = OrbitState::new();
        let mut expected_step = 0.0;
        for _ in 0..200 {
            assert_eq!(state.advance(&path, None), OrbitMode::Time);
            expected_step += TIME_STEP;
            let position = state.position();
            let distance = ((position.x - 0.0).powi(2) + (position.z + 5.0).powi(2)).sqrt();
            assert!((distance - 4.0).abs() < 1e-4);
            assert_eq!(position.y, 0.0);
        }
        assert_eq!(state.angle_step(), expected_step);
    }

    #[test]
    fn time_mode_is_deterministic() {
        let path = OrbitPath::default();
        let mut first = OrbitState::new();
        let mut second = OrbitState::new();
        for _ in 0..37 {
            first.advance(&path, None);
            second.advance(&path, None);
        }
        assert_eq!(first, second);
    }

    #[test]
    fn sensor_angle_for_alpha_ninety_is_pi() {
        let reading = OrientationReading {
            alpha: 90.0,
            beta: 10.0,
            gamma: -5.0,
        };
        assert!((reading.orbit_angle() - PI).abs() < 1e-6);

        let mut state = OrbitState::new();
        let path = OrbitPath::default();
        assert_eq!(state.advance(&path, Some(reading)), OrbitMode::Sensor);
        assert_eq!(state.angle_step(), 0.0);
        let position = state.position();
        assert!((position.x + 4.0).abs() < 1e-5);
        assert!((position.z + 5.0).abs() < 1e-5);
    }

    #[test]
    fn zero_reading_falls_back_to_time() {
        let mut state = OrbitState::new();
        let reading = OrientationReading {
            alpha: 45.0,
            beta: 0.0,
            gamma: 3.0,
        };
        assert_eq!(
            state.advance(&OrbitPath::default(), Some(reading)),
            OrbitMode::Time
        );
        assert_eq!(state.angle_step(), TIME_STEP);
    }

    #[test]
    fn accumulator_keeps_advancing_after_a_long_run() {
        let path = OrbitPath::default();
        let mut state = OrbitState {
            angle_step: 600_000.0,
            ..OrbitState::new()
        };
        let mut previous = state.angle_step();
        let mut positions = Vec::new();
        for _ in 0..1_000 {
            state.advance(&path, None);
            let step = state.angle_step() - previous;
            assert!((step - TIME_STEP).abs() < 1e-6, "uneven step {step}");
            previous = state.angle_step();
            positions.push(state.position());
        }
        assert!(positions.windows(2).all(|pair| pair[0] != pair[1]));

        let phase = (state.angle_step() % TAU) as f32;
        assert!(state.position().abs_diff_eq(path.point_at(phase), 1e-5));
    }
}
