use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::DemoError;

/// Decoded RGBA8 image ready for texture upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    pub fn decode(name: &str, bytes: &[u8]) -> Result<Self, DemoError> {
        let image = image::load_from_memory(bytes)
            .map_err(|err| DemoError::asset(name, err))?
            .into_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            rgba: image.into_raw(),
        })
    }

    /// Single opaque pixel, used while nothing better is loaded.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: rgba.to_vec(),
        }
    }
}

#[derive(Debug)]
enum AssetState<T> {
    Pending,
    Ready(T),
    Failed(DemoError),
    Taken,
}

/// Hand-off point between an asynchronous loader and the render loop.
///
/// The loader calls [`AssetSlot::fill`] once; the render loop polls
/// [`AssetSlot::take_ready`] every frame and never waits.
#[derive(Debug)]
pub struct AssetSlot<T> {
    name: String,
    state: Arc<Mutex<AssetState<T>>>,
}

impl<T> Clone for AssetSlot<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> AssetSlot<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(AssetState::Pending)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fill(&self, result: Result<T, DemoError>) {
        let mut state = self.state.lock();
        if !matches!(*state, AssetState::Pending) {
            return;
        }
        *state = match result {
            Ok(asset) => AssetState::Ready(asset),
            Err(err) => {
                log::warn!("{err}; continuing without {}", self.name);
                AssetState::Failed(err)
            }
        };
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), AssetState::Pending)
    }

    pub fn failure(&self) -> Option<String> {
        match &*self.state.lock() {
            AssetState::Failed(err) => Some(err.to_string()),
            _ => None,
        }
    }

    /// Returns the asset the first time it is observed ready.
    pub fn take_ready(&self) -> Option<T> {
        let mut state = self.state.lock();
        if !matches!(*state, AssetState::Ready(_)) {
            return None;
        }
        match mem::replace(&mut *state, AssetState::Taken) {
            AssetState::Ready(asset) => Some(asset),
            _ => None,
        }
    }
}

/// Reads and decodes a texture on a worker thread.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_texture_in_background(path: std::path::PathBuf) -> AssetSlot<TextureImage> {
    let slot = AssetSlot::new(path.display().to_string());
    let loader = slot.clone();
    std::thread::spawn(move || {
        let result = std::fs::read(&path)
            .map_err(|err| DemoError::asset(loader.name(), err))
            .and_then(|bytes| TextureImage::decode(loader.name(), &bytes));
        loader.fill(result);
    });
    slot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .expect("encode png");
        bytes.into_inner()
    }

    #[test]
    fn slot_hands_out_asset_once() {
        let slot = AssetSlot::new("texture.png");
        assert!(slot.is_pending());
        assert_eq!(slot.take_ready(), None::<u32>);
        slot.fill(Ok(7));
        assert!(!slot.is_pending());
        assert_eq!(slot.take_ready(), Some(7));
        assert_eq!(slot.take_ready(), None);
    }

    #[test]
    fn failed_slot_reports_reason() {
        let slot: AssetSlot<u32> = AssetSlot::new("audio.mp3");
        slot.fill(Err(DemoError::asset("audio.mp3", "decode failed")));
        assert_eq!(slot.take_ready(), None);
        assert_eq!(
            slot.failure().as_deref(),
            Some("failed to load audio.mp3: decode failed")
        );
        slot.fill(Ok(1));
        assert_eq!(slot.take_ready(), None);
    }

    #[test]
    fn decodes_png_to_rgba() {
        let texture = TextureImage::decode("memory.png", &png_bytes()).unwrap();
        assert_eq!((texture.width, texture.height), (2, 3));
        assert_eq!(texture.rgba.len(), 2 * 3 * 4);
        assert_eq!(&texture.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_is_an_asset_error() {
        let err = TextureImage::decode("broken.png", b"not an image").unwrap_err();
        assert!(matches!(err, DemoError::AssetLoad { .. }));
    }

    #[test]
    fn background_loader_reports_missing_file() {
        let slot = load_texture_in_background("/definitely/missing/texture.png".into());
        for _ in 0..200 {
            if !slot.is_pending() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(slot.failure().is_some());
    }
}
