use serde::{Deserialize, Serialize};

/// CPU side geometry ready for upload.
///
/// Positions are laid out as `x, y, z` triples and texture coordinates as
/// `u, v` pairs, one pair per position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub texcoords: Vec<f32>,
}

impl Mesh {
    pub fn with_capacity(vertex_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count * 3),
            texcoords: Vec::with_capacity(vertex_count * 2),
        }
    }

    pub fn push(&mut self, position: [f64; 3], texcoord: [f64; 2]) {
        self.vertices
            .extend(position.iter().map(|component| *component as f32));
        self.texcoords
            .extend(texcoord.iter().map(|component| *component as f32));
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn position(&self, index: usize) -> Option<[f32; 3]> {
        self.vertices
            .get(index * 3..index * 3 + 3)
            .map(|slice| [slice[0], slice[1], slice[2]])
    }

    pub fn texcoord(&self, index: usize) -> Option<[f32; 2]> {
        self.texcoords
            .get(index * 2..index * 2 + 2)
            .map(|slice| [slice[0], slice[1]])
    }
}

/// Full screen quad used behind everything when the webcam is on.
///
/// The texture coordinates mirror the frame horizontally so the picture
/// behaves like a mirror.
pub fn background_quad() -> Mesh {
    Mesh {
        vertices: vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0,
        ],
        texcoords: vec![
            1.0, 1.0, //
            0.0, 1.0, //
            0.0, 0.0, //
            0.0, 0.0, //
            1.0, 0.0, //
            1.0, 1.0,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_quad_is_paired() {
        let quad = background_quad();
        assert_eq!(quad.vertex_count(), 6);
        assert_eq!(quad.texcoords.len(), 12);
        assert_eq!(quad.position(2), Some([1.0, 1.0, 0.0]));
        assert_eq!(quad.texcoord(0), Some([1.0, 1.0]));
    }

    #[test]
    fn push_narrows_to_f32() {
        let mut mesh = Mesh::with_capacity(1);
        mesh.push([0.1, 0.2, 0.3], [0.5, 1.0]);
        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.position(0), Some([0.1_f32, 0.2_f32, 0.3_f32]));
        assert_eq!(mesh.position(1), None);
    }
}
