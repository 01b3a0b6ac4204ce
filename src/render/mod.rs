mod buffers;
mod depth;
mod program;
mod renderer;
mod shared;
mod textures;

pub use buffers::GeometryBuffer;
pub use program::{PipelineKey, ShaderProgram};
pub use renderer::Renderer;
pub use shared::{FRAGMENT_SHADER, VERTEX_SHADER};
