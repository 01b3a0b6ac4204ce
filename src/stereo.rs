use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Far plane shared by both eyes.
pub const FAR_CLIPPING_DISTANCE: f32 = 2000.0;

/// Camera controls sampled every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParameters {
    pub eye_separation: f32,
    pub fov: f32,
    pub near_clipping_distance: f32,
    pub convergence_distance: f32,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            eye_separation: 0.5,
            fov: 1.2,
            near_clipping_distance: 10.0,
            convergence_distance: 50.0,
        }
    }
}

impl CameraParameters {
    pub fn is_valid(&self) -> bool {
        self.convergence_distance != 0.0
            && self.fov > 0.0
            && self.fov < std::f32::consts::PI
            && self.near_clipping_distance.is_finite()
    }
}

/// Clip volume of one eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeFrustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl EyeFrustum {
    /// Orthographic box over the eye bounds, GL clip space with depth in `[-1, 1]`.
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh_gl(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }

    /// How far the horizontal bounds are from being mirror images.
    pub fn asymmetry(&self) -> f32 {
        (self.right.abs() - self.left.abs()).abs()
    }
}

/// Off-axis projections for the red (left) and cyan (right) eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoProjection {
    pub left_eye: EyeFrustum,
    pub right_eye: EyeFrustum,
    pub left: Mat4,
    pub right: Mat4,
}

impl StereoProjection {
    pub fn build(camera: &CameraParameters) -> Self {
        debug_assert!(camera.is_valid(), "invalid camera parameters: {camera:?}");
        let CameraParameters {
            eye_separation,
            fov,
            near_clipping_distance: near,
            convergence_distance: convergence,
        } = *camera;

        let top = near * (fov / 2.0).tan();
        let bottom = -top;

        let a = (fov / 2.0).tan() * convergence;
        let b = a - eye_separation / 2.0;
        let c = a + eye_separation / 2.0;

        let left_eye = EyeFrustum {
            left: -b * near / convergence,
            right: c * near / convergence,
            bottom,
            top,
            near,
            far: FAR_CLIPPING_DISTANCE,
        };
        let right_eye = EyeFrustum {
            left: -c * near / convergence,
            right: b * near / convergence,
            ..left_eye
        };

        Self {
            left: left_eye.projection(),
            right: right_eye.projection(),
            left_eye,
            right_eye,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn camera(eye_separation: f32) -> CameraParameters {
        CameraParameters {
            eye_separation,
            fov: FRAC_PI_2,
            near_clipping_distance: 0.1,
            convergence_distance: 5.0,
        }
    }

    #[test]
    fn zero_separation_collapses_to_one_frustum() {
        let stereo = StereoProjection::build(&camera(0.0));
        assert_eq!(stereo.left, stereo.right);

        let half = 0.1 * (FRAC_PI_2 / 2.0).tan();
        let symmetric = Mat4::orthographic_rh_gl(-half, half, -half, half, 0.1, 2000.0);
        assert!(stereo.left.abs_diff_eq(symmetric, 1e-5));
        assert!(stereo.left_eye.asymmetry() < 1e-6);
    }

    #[test]
    fn asymmetry_grows_with_separation() {
        let mut previous = -1.0;
        for step in 0..8 {
            let stereo = StereoProjection::build(&camera(step as f32 * 0.05));
            let asymmetry = stereo.left_eye.asymmetry();
            assert!(asymmetry > previous, "step {step}: {asymmetry} <= {previous}");
            assert!((asymmetry - stereo.right_eye.asymmetry()).abs() < 1e-6);
            previous = asymmetry;
        }
    }

    #[test]
    fn eyes_mirror_each_other() {
        let stereo = StereoProjection::build(&camera(0.2));
        assert!((stereo.left_eye.left + stereo.right_eye.right).abs() < 1e-6);
        assert!((stereo.left_eye.right + stereo.right_eye.left).abs() < 1e-6);
        assert_eq!(stereo.left_eye.top, stereo.right_eye.top);
        assert_eq!(stereo.left_eye.far, FAR_CLIPPING_DISTANCE);
        assert_ne!(stereo.left, stereo.right);
    }

    #[test]
    fn validity_checks_divisor_and_fov() {
        assert!(CameraParameters::default().is_valid());
        let mut bad = CameraParameters::default();
        bad.convergence_distance = 0.0;
        assert!(!bad.is_valid());
        bad = CameraParameters::default();
        bad.fov = std::f32::consts::PI;
        assert!(!bad.is_valid());
    }
}
