use std::fmt;

/// Programmable stage a shader module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failures surfaced by the demo.
///
/// Shader and context errors are fatal during initialization. Asset and
/// permission errors only disable the feature that needed them.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("Error in {stage} shader: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("Link error in program: {0}")]
    ShaderLink(String),
    #[error("failed to load {name}: {reason}")]
    AssetLoad { name: String, reason: String },
    #[error("could not get a graphics context: {0}")]
    UnsupportedContext(String),
    #[error("permission denied for {0}")]
    PermissionDenied(String),
}

impl DemoError {
    pub fn asset(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::AssetLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error must stop startup instead of degrading a feature.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ShaderCompile { .. } | Self::ShaderLink(_) | Self::UnsupportedContext(_)
        )
    }
}
