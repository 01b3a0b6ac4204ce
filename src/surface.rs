use std::f64::consts::{E, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;

/// Radial and angular offset of the second vertex emitted for each sample.
const STRIP_RADIAL_OFFSET: f64 = 0.5;
const STRIP_ANGULAR_OFFSET: f64 = 0.5;

/// Coefficients of the damped radial spiral surface.
///
/// `b` is both the outer radius and the divisor of the angular frequency, so
/// it must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeParameters {
    pub b: f64,
    pub m: f64,
    pub a: f64,
    pub n: f64,
    pub phi: f64,
}

impl Default for ShapeParameters {
    fn default() -> Self {
        Self {
            b: 6.0,
            m: 6.0,
            a: 4.0,
            n: 0.5,
            phi: 0.0,
        }
    }
}

impl ShapeParameters {
    pub fn x(&self, r: f64, u: f64, zoom: f64) -> f64 {
        r * u.cos() / zoom
    }

    pub fn y(&self, r: f64, u: f64, zoom: f64) -> f64 {
        r * u.sin() / zoom
    }

    pub fn z(&self, r: f64, zoom: f64) -> f64 {
        let w = self.m * PI / self.b;
        self.a * E.powf(-self.n * r) * (w * r + self.phi).sin() / zoom
    }

    fn point(&self, r: f64, u: f64, zoom: f64) -> [f64; 3] {
        [self.x(r, u, zoom), self.y(r, u, zoom), self.z(r, zoom)]
    }
}

/// Step sizes used to walk the `(r, u)` domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSampling {
    pub radial_step: f64,
    pub angular_step: f64,
}

impl Default for SurfaceSampling {
    fn default() -> Self {
        Self {
            radial_step: 0.001,
            angular_step: 0.5,
        }
    }
}

impl SurfaceSampling {
    /// Number of radii in `[0, b]`, both ends included.
    pub fn rows(&self, b: f64) -> usize {
        (b / self.radial_step + 1e-9).floor() as usize + 1
    }

    /// Number of angles in `[0, 2π)`.
    pub fn columns(&self) -> usize {
        (TAU / self.angular_step).ceil() as usize
    }

    pub fn vertex_count(&self, b: f64) -> usize {
        self.rows(b) * self.columns() * 2
    }
}

/// Builds the triangle strip for the surface.
///
/// Every `(r, u)` sample emits the point itself followed by the point at
/// `(r + 0.5, u + 0.5)`; the strip relies on that interleave.
pub fn create_surface_data(shape: &ShapeParameters, sampling: &SurfaceSampling, zoom: f64) -> Mesh {
    debug_assert!(shape.b > 0.0, "surface radius must be positive");
    let rows = sampling.rows(shape.b);
    let columns = sampling.columns();
    let mut mesh = Mesh::with_capacity(rows * columns * 2);

    for row in 0..rows {
        let r = row as f64 * sampling.radial_step;
        for column in 0..columns {
            let u = column as f64 * sampling.angular_step;
            let next_r = r + STRIP_RADIAL_OFFSET;
            let next_u = u + STRIP_ANGULAR_OFFSET;
            mesh.push(shape.point(r, u, zoom), texcoord(shape, r, u));
            mesh.push(shape.point(next_r, next_u, zoom), texcoord(shape, next_r, next_u));
        }
    }

    mesh
}

/// Current surface inputs; every accepted change yields a rebuilt mesh.
///
/// Rejected values are logged and leave the previous inputs in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceState {
    shape: ShapeParameters,
    sampling: SurfaceSampling,
    zoom: f64,
}

impl SurfaceState {
    pub fn new(shape: ShapeParameters, sampling: SurfaceSampling, zoom: f64) -> Self {
        Self {
            shape,
            sampling,
            zoom,
        }
    }

    pub fn shape(&self) -> &ShapeParameters {
        &self.shape
    }

    pub fn sampling(&self) -> &SurfaceSampling {
        &self.sampling
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn mesh(&self) -> Mesh {
        create_surface_data(&self.shape, &self.sampling, self.zoom)
    }

    pub fn set_shape_parameters(&mut self, shape: ShapeParameters) -> Option<Mesh> {
        if !(shape.b > 0.0) {
            log::warn!("ignoring surface with non-positive radius b={}", shape.b);
            return None;
        }
        self.shape = shape;
        Some(self.mesh())
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Option<Mesh> {
        if zoom == 0.0 || !zoom.is_finite() {
            log::warn!("ignoring zoom {zoom}");
            return None;
        }
        self.zoom = zoom;
        Some(self.mesh())
    }

    pub fn set_surface_sampling(&mut self, sampling: SurfaceSampling) -> Option<Mesh> {
        if !(sampling.radial_step > 0.0 && sampling.angular_step > 0.0) {
            log::warn!("ignoring non-positive sampling steps {sampling:?}");
            return None;
        }
        self.sampling = sampling;
        Some(self.mesh())
    }
}

fn texcoord(shape: &ShapeParameters, r: f64, u: f64) -> [f64; 2] {
    [u / TAU, r / shape.b]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coarse() -> SurfaceSampling {
        SurfaceSampling {
            radial_step: 0.25,
            angular_step: 0.5,
        }
    }

    #[test]
    fn vertex_and_texcoord_counts_match() {
        let shape = ShapeParameters::default();
        let mesh = create_surface_data(&shape, &coarse(), 1.0);
        assert_eq!(mesh.vertices.len() * 2, mesh.texcoords.len() * 3);
        // 25 radii in [0, 6] and 13 angles below 2π, two vertices each
        assert_eq!(mesh.vertex_count(), 25 * 13 * 2);
        assert_eq!(mesh.vertex_count(), coarse().vertex_count(shape.b));
    }

    #[test]
    fn default_sampling_covers_whole_radius() {
        let sampling = SurfaceSampling::default();
        assert_eq!(sampling.rows(6.0), 6001);
        assert_eq!(sampling.columns(), 13);
        assert_eq!(sampling.vertex_count(6.0), 6001 * 13 * 2);
    }

    #[test]
    fn generation_is_deterministic() {
        let shape = ShapeParameters {
            b: 3.0,
            m: 2.0,
            a: 1.5,
            n: 0.25,
            phi: 0.3,
        };
        let first = create_surface_data(&shape, &coarse(), 1.0);
        let second = create_surface_data(&shape, &coarse(), 1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn strip_interleaves_offset_row() {
        let shape = ShapeParameters::default();
        let mesh = create_surface_data(&shape, &coarse(), 1.0);

        assert_eq!(mesh.position(0), Some([0.0, 0.0, 0.0]));
        let [x, y, z] = mesh.position(1).unwrap();
        let expected = shape.point(0.5, 0.5, 1.0);
        assert!((x as f64 - expected[0]).abs() < 1e-6);
        assert!((y as f64 - expected[1]).abs() < 1e-6);
        assert!((z as f64 - expected[2]).abs() < 1e-6);

        let [u, v] = mesh.texcoord(1).unwrap();
        assert!((u as f64 - 0.5 / TAU).abs() < 1e-7);
        assert!((v as f64 - 0.5 / 6.0).abs() < 1e-7);
    }

    #[test]
    fn zoom_scales_every_axis() {
        let shape = ShapeParameters::default();
        let unit = create_surface_data(&shape, &coarse(), 1.0);
        let halved = create_surface_data(&shape, &coarse(), 2.0);
        for (full, half) in unit.vertices.iter().zip(&halved.vertices) {
            assert!((full / 2.0 - half).abs() < 1e-5);
        }
        assert_eq!(unit.texcoords, halved.texcoords);
    }

    #[test]
    fn height_follows_damped_sine() {
        let shape = ShapeParameters::default();
        let r: f64 = 0.25;
        let expected = 4.0 * (-0.5 * r).exp() * (PI * r).sin();
        assert!((shape.z(r, 1.0) - expected).abs() < 1e-12);
    }

    fn coarse_state() -> SurfaceState {
        SurfaceState::new(ShapeParameters::default(), coarse(), 1.0)
    }

    #[test]
    fn rejected_shape_keeps_previous_surface() {
        let mut state = coarse_state();
        let before = state;
        for b in [0.0, -2.0, f64::NAN] {
            let shape = ShapeParameters {
                b,
                ..ShapeParameters::default()
            };
            assert!(state.set_shape_parameters(shape).is_none());
            assert_eq!(state, before);
        }
    }

    #[test]
    fn accepted_shape_rebuilds_surface() {
        let mut state = coarse_state();
        let shape = ShapeParameters {
            b: 3.0,
            ..ShapeParameters::default()
        };
        let mesh = state.set_shape_parameters(shape).expect("valid shape");
        assert_eq!(state.shape(), &shape);
        assert_eq!(mesh, create_surface_data(&shape, &coarse(), 1.0));
        assert_eq!(mesh.vertex_count(), coarse().vertex_count(3.0));
    }

    #[test]
    fn zoom_must_be_finite_and_non_zero() {
        let mut state = coarse_state();
        assert!(state.set_zoom(0.0).is_none());
        assert!(state.set_zoom(f64::INFINITY).is_none());
        assert_eq!(state.zoom(), 1.0);

        let zoomed = state.set_zoom(2.0).expect("valid zoom");
        let unit = create_surface_data(&ShapeParameters::default(), &coarse(), 1.0);
        assert_eq!(state.zoom(), 2.0);
        assert_eq!(zoomed.vertex_count(), unit.vertex_count());
        assert_ne!(zoomed, unit);
    }

    #[test]
    fn sampling_steps_must_be_positive() {
        let mut state = coarse_state();
        let rejected = [
            SurfaceSampling {
                radial_step: 0.0,
                angular_step: 0.5,
            },
            SurfaceSampling {
                radial_step: 0.25,
                angular_step: -0.5,
            },
        ];
        for sampling in rejected {
            assert!(state.set_surface_sampling(sampling).is_none());
            assert_eq!(state.sampling(), &coarse());
        }

        let finer = SurfaceSampling {
            radial_step: 0.1,
            angular_step: 0.25,
        };
        let mesh = state.set_surface_sampling(finer).expect("valid sampling");
        assert_eq!(state.sampling(), &finer);
        assert_eq!(mesh.vertex_count(), finer.vertex_count(6.0));
    }
}
