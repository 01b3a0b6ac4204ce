use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    window, CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlVideoElement, MediaStream,
    MediaStreamConstraints,
};

use crate::assets::TextureImage;
use crate::controls::SceneToggles;
use crate::error::DemoError;
use crate::webcam::WebcamSource;

/// `HTMLMediaElement.HAVE_CURRENT_DATA`
const HAVE_CURRENT_DATA: u16 = 2;

/// Camera stream played into a hidden video element and copied out through
/// a 2D canvas.
pub(super) struct DomWebcam {
    video: HtmlVideoElement,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    toggles: Arc<SceneToggles>,
    started: Rc<Cell<bool>>,
}

/// Starts the camera stream once, on first use.
#[derive(Clone)]
pub(super) struct WebcamStarter {
    video: HtmlVideoElement,
    started: Rc<Cell<bool>>,
}

impl DomWebcam {
    pub(super) fn new(document: &Document, toggles: Arc<SceneToggles>) -> Result<Self> {
        let video = document
            .create_element("video")
            .map_err(|err| anyhow!("failed to create video element: {err:?}"))?
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| anyhow!("video element has the wrong type"))?;
        video
            .set_attribute("autoplay", "true")
            .map_err(|err| anyhow!("failed to configure video: {err:?}"))?;
        video.set_muted(true);

        let canvas = document
            .create_element("canvas")
            .map_err(|err| anyhow!("failed to create canvas: {err:?}"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("canvas element has the wrong type"))?;
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("2d context unavailable: {err:?}"))?
            .ok_or_else(|| anyhow!("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("2d context has the wrong type"))?;

        Ok(Self {
            video,
            canvas,
            context,
            toggles,
            started: Rc::new(Cell::new(false)),
        })
    }

    pub(super) fn starter(&self) -> WebcamStarter {
        WebcamStarter {
            video: self.video.clone(),
            started: Rc::clone(&self.started),
        }
    }

    fn capture(&self) -> Result<TextureImage> {
        let (width, height) = (self.video.video_width(), self.video.video_height());
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }
        self.context
            .draw_image_with_html_video_element(&self.video, 0.0, 0.0)
            .map_err(|err| anyhow!("drawImage failed: {err:?}"))?;
        let pixels = self
            .context
            .get_image_data(0.0, 0.0, width as f64, height as f64)
            .map_err(|err| anyhow!("getImageData failed: {err:?}"))?;
        Ok(TextureImage {
            width,
            height,
            rgba: pixels.data().0,
        })
    }
}

impl WebcamSource for DomWebcam {
    fn is_enabled(&self) -> bool {
        self.toggles.webcam_enabled()
    }

    fn current_frame(&mut self) -> Option<TextureImage> {
        if self.video.ready_state() < HAVE_CURRENT_DATA || self.video.video_width() == 0 {
            return None;
        }
        match self.capture() {
            Ok(frame) => Some(frame),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }
}

impl WebcamStarter {
    pub(super) fn start(&self) {
        if self.started.replace(true) {
            return;
        }
        let video = self.video.clone();
        let started = Rc::clone(&self.started);
        spawn_local(async move {
            match open_stream().await {
                Ok(stream) => {
                    video.set_src_object(Some(&stream));
                    if let Err(err) = video.play() {
                        log::warn!("webcam playback failed: {err:?}");
                    }
                }
                Err(err) => {
                    log::warn!("{err}; background stays off");
                    started.set(false);
                }
            }
        });
    }
}

async fn open_stream() -> Result<MediaStream, DemoError> {
    let denied = |reason: JsValue| DemoError::PermissionDenied(format!("webcam ({reason:?})"));
    let devices = window()
        .ok_or_else(|| denied(JsValue::from_str("no window")))?
        .navigator()
        .media_devices()
        .map_err(denied)?;
    let constraints = MediaStreamConstraints::new();
    constraints.set_video(&JsValue::TRUE);
    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(denied)?;
    JsFuture::from(promise)
        .await
        .map_err(denied)?
        .dyn_into::<MediaStream>()
        .map_err(denied)
}
