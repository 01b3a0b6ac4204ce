use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;

/// Tessellation of the orbiting sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereSettings {
    pub radius: f64,
    pub lat_segments: u32,
    pub lon_segments: u32,
}

impl Default for SphereSettings {
    fn default() -> Self {
        Self {
            radius: 0.5,
            lat_segments: 500,
            lon_segments: 500,
        }
    }
}

/// Builds a UV sphere, one row of `lon_segments + 1` vertices per latitude.
///
/// The same vertex order is drawn as a filled strip and as a line strip.
pub fn create_sphere_data(radius: f64, lat_segments: u32, lon_segments: u32) -> Mesh {
    let mut mesh =
        Mesh::with_capacity((lat_segments as usize + 1) * (lon_segments as usize + 1));

    for i in 0..=lat_segments {
        let theta = i as f64 * PI / lat_segments as f64;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for j in 0..=lon_segments {
            let phi = j as f64 * TAU / lon_segments as f64;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let position = [
                radius * cos_phi * sin_theta,
                radius * cos_theta,
                radius * sin_phi * sin_theta,
            ];
            let texcoord = [
                1.0 - j as f64 / lon_segments as f64,
                1.0 - i as f64 / lat_segments as f64,
            ];
            mesh.push(position, texcoord);
        }
    }

    mesh
}

impl SphereSettings {
    pub fn build(&self) -> Mesh {
        create_sphere_data(self.radius, self.lat_segments, self.lon_segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sphere_has_expected_layout() {
        let mesh = create_sphere_data(0.5, 4, 4);
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.position(0), Some([0.0, 0.5, 0.0]));
        assert_eq!(mesh.texcoord(0), Some([1.0, 1.0]));
        assert_eq!(mesh.texcoord(24), Some([0.0, 0.0]));
    }

    #[test]
    fn vertex_count_is_grid_size() {
        let mesh = create_sphere_data(2.0, 7, 11);
        assert_eq!(mesh.vertex_count(), 8 * 12);
        assert_eq!(mesh.texcoords.len(), 8 * 12 * 2);
    }

    #[test]
    fn poles_collapse() {
        let (lat, lon) = (6, 9);
        let radius = 1.5;
        let mesh = create_sphere_data(radius, lat, lon);
        let row = lon as usize + 1;
        for j in 0..row {
            let north = mesh.position(j).unwrap();
            let south = mesh.position(lat as usize * row + j).unwrap();
            assert!(north[0].abs() < 1e-6 && north[2].abs() < 1e-6);
            assert!((north[1] - radius as f32).abs() < 1e-6);
            assert!(south[0].abs() < 1e-6 && south[2].abs() < 1e-6);
            assert!((south[1] + radius as f32).abs() < 1e-6);
        }
    }

    #[test]
    fn vertices_lie_on_sphere() {
        let mesh = create_sphere_data(3.0, 8, 8);
        for index in 0..mesh.vertex_count() {
            let [x, y, z] = mesh.position(index).unwrap();
            let length = (x * x + y * y + z * z).sqrt();
            assert!((length - 3.0).abs() < 1e-5);
        }
    }
}
