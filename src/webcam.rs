use crate::assets::TextureImage;

/// Live camera feed used as the frame background.
pub trait WebcamSource {
    /// Whether the user has switched the background on.
    fn is_enabled(&self) -> bool;

    /// Latest frame, if the stream has produced one since it started.
    fn current_frame(&mut self) -> Option<TextureImage>;
}

/// Stand-in for hosts without camera access.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWebcam;

impl WebcamSource for NoWebcam {
    fn is_enabled(&self) -> bool {
        false
    }

    fn current_frame(&mut self) -> Option<TextureImage> {
        None
    }
}
