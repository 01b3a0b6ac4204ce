//! Anaglyph stereo rendering of a damped spiral surface.
//!
//! The surface is drawn twice per frame, once per eye through an off-axis
//! projection and a red or cyan color mask, behind an orbiting sphere and an
//! optional webcam background. Geometry, projections and the per-frame draw
//! list are plain Rust and testable without a GPU; [`render::Renderer`]
//! executes the draw list with wgpu on native windows and WebGL2 canvases.

pub mod app;
pub mod assets;
pub mod audio;
pub mod compositor;
pub mod config;
pub mod controls;
pub mod error;
pub mod input;
pub mod mesh;
pub mod orbit;
pub mod render;
pub mod sphere;
pub mod stereo;
pub mod surface;
pub mod webcam;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{Collaborators, DemoApp, SceneSummary};
pub use assets::{AssetSlot, TextureImage};
pub use audio::{PeakingFilter, SpatialAudio};
pub use compositor::{FrameCompositor, FramePlan, SceneState};
pub use config::DemoConfig;
pub use controls::{ControlPanel, ControlSource, SceneToggles};
pub use error::DemoError;
pub use input::{TrackballRotator, ViewMatrixProvider};
pub use mesh::Mesh;
pub use orbit::{OrbitMode, OrbitPath, OrbitState, OrientationReading};
pub use render::Renderer;
pub use sphere::{create_sphere_data, SphereSettings};
pub use stereo::{CameraParameters, StereoProjection};
pub use surface::{create_surface_data, ShapeParameters, SurfaceSampling, SurfaceState};
pub use webcam::{NoWebcam, WebcamSource};
