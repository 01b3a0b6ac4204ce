use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::mesh::Mesh;

pub(crate) const POSITION_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: (3 * std::mem::size_of::<f32>()) as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    }],
};

pub(crate) const TEXCOORD_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: (2 * std::mem::size_of::<f32>()) as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: 1,
    }],
};

/// Position and texture coordinate buffers for one mesh.
pub struct GeometryBuffer {
    name: String,
    positions: wgpu::Buffer,
    texcoords: wgpu::Buffer,
    count: u32,
}

impl GeometryBuffer {
    pub fn new(device: &wgpu::Device, name: &str, mesh: &Mesh) -> Self {
        let (positions, texcoords) = create_buffers(device, name, mesh);
        Self {
            name: name.to_string(),
            positions,
            texcoords,
            count: mesh.vertex_count() as u32,
        }
    }

    /// Replaces the whole contents with `mesh`.
    pub fn buffer_data(&mut self, device: &wgpu::Device, mesh: &Mesh) {
        let (positions, texcoords) = create_buffers(device, &self.name, mesh);
        self.positions = positions;
        self.texcoords = texcoords;
        self.count = mesh.vertex_count() as u32;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.positions.slice(..));
        pass.set_vertex_buffer(1, self.texcoords.slice(..));
        pass.draw(0..self.count, 0..1);
    }
}

fn create_buffers(device: &wgpu::Device, name: &str, mesh: &Mesh) -> (wgpu::Buffer, wgpu::Buffer) {
    let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{name}-vertices")),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let texcoords = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{name}-texcoords")),
        contents: bytemuck::cast_slice(&mesh.texcoords),
        usage: wgpu::BufferUsages::VERTEX,
    });
    (positions, texcoords)
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct TransformUniform {
    model_view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
}

impl TransformUniform {
    pub(crate) const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub(crate) fn new(model_view: Mat4, projection: Mat4) -> Self {
        Self {
            model_view: model_view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }
}

/// One uniform buffer holding a transform slot per draw call, bound with a
/// dynamic offset.
pub(crate) struct TransformSlots {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl TransformSlots {
    pub(crate) fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = align_to(TransformUniform::SIZE, alignment);
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("transform-slots"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transform-bind-group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(TransformUniform::SIZE),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn write(&self, queue: &wgpu::Queue, slot: usize, uniform: &TransformUniform) {
        queue.write_buffer(&self.buffer, self.offset(slot) as u64, bytemuck::bytes_of(uniform));
    }

    pub(crate) fn offset(&self, slot: usize) -> u32 {
        (self.stride * slot as u64) as u32
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

fn align_to(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_two_matrices() {
        assert_eq!(TransformUniform::SIZE, 128);
    }

    #[test]
    fn slots_respect_alignment() {
        assert_eq!(align_to(128, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(300, 256), 512);
        assert_eq!(align_to(128, 0), 128);
    }

    #[test]
    fn uniform_layout_is_column_major() {
        let uniform = TransformUniform::new(
            Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0)),
            Mat4::IDENTITY,
        );
        assert_eq!(uniform.model_view[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniform.projection[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
