#![cfg(target_arch = "wasm32")]

mod audio;
mod controls;
mod orientation;
mod webcam;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use gloo_events::EventListener;
use js_sys::{ArrayBuffer, Uint8Array};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{window, Document, HtmlCanvasElement, HtmlInputElement, Response};

use crate::assets::{AssetSlot, TextureImage};
use crate::audio::SpatialAudio;
use crate::input::wasm::WasmInputHandler;
use crate::{Collaborators, DemoApp, DemoConfig, DemoError, Renderer, SceneToggles, TrackballRotator};

use self::audio::WebAudio;
use self::controls::DomControls;
use self::orientation::OrientationSensor;
use self::webcam::DomWebcam;

const CONTROLS_ID: &str = "controls";
const CANVAS_HOLDER_ID: &str = "canvas-holder";
const WEBCAM_TOGGLE_ID: &str = "webcam";
const ORIENTATION_TOGGLE_ID: &str = "device-orientation";
const ORIENTATION_REQUEST_ID: &str = "request-orientation";
const AUDIO_BUTTON_ID: &str = "audio";
const FILTER_TOGGLE_ID: &str = "filter";

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Starts the demo on the canvas with id `canvas_id`.
///
/// `config_xml` overrides the built-in defaults. Initialization failures are
/// written into the canvas holder and returned to the caller.
#[wasm_bindgen]
pub async fn start(canvas_id: String, config_xml: Option<String>) -> Result<(), JsValue> {
    match initialize(&canvas_id, config_xml.as_deref()).await {
        Ok(app) => schedule_animation_loop(app).map_err(|err| JsValue::from_str(&err.to_string())),
        Err(err) => {
            log::error!("initialization failed: {err:?}");
            report_failure(&err);
            Err(JsValue::from_str(&err.to_string()))
        }
    }
}

struct WebApp {
    demo: DemoApp,
    canvas: HtmlCanvasElement,
    _input: WasmInputHandler,
    _orientation: OrientationSensor,
    _listeners: Vec<EventListener>,
}

async fn initialize(canvas_id: &str, config_xml: Option<&str>) -> Result<Rc<RefCell<WebApp>>> {
    let config = match config_xml {
        Some(xml) => DemoConfig::from_xml(xml).context("failed to parse demo config")?,
        None => DemoConfig::default(),
    };

    let document = document()?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| anyhow!("canvas element {canvas_id} not found"))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| anyhow!("element {canvas_id} is not a canvas"))?;

    let controls = Arc::new(DomControls::render(&document, CONTROLS_ID, &config.camera)?);
    let toggles = Arc::new(SceneToggles::new());

    let renderer = Renderer::new(
        wgpu::SurfaceTarget::Canvas(canvas.clone()),
        canvas.width(),
        canvas.height(),
    )
    .await?;

    let trackball = Arc::new(TrackballRotator::new(canvas.width(), canvas.height(), 0.0));
    let input = WasmInputHandler::attach(&canvas, Arc::clone(&trackball))?;
    let orientation = OrientationSensor::attach(
        &document,
        ORIENTATION_TOGGLE_ID,
        ORIENTATION_REQUEST_ID,
        Arc::clone(&toggles),
    )?;
    let webcam = DomWebcam::new(&document, Arc::clone(&toggles))?;

    let mut listeners = Vec::new();
    if let Some(toggle) = input_element(&document, WEBCAM_TOGGLE_ID) {
        let starter = webcam.starter();
        toggles.set_webcam_enabled(toggle.checked());
        if toggle.checked() {
            starter.start();
        }
        let toggles = Arc::clone(&toggles);
        let element = toggle.clone();
        listeners.push(EventListener::new(&toggle, "change", move |_| {
            let enabled = element.checked();
            toggles.set_webcam_enabled(enabled);
            if enabled {
                starter.start();
            }
        }));
    }
    if let Some(toggle) = input_element(&document, FILTER_TOGGLE_ID) {
        toggles.set_filter_enabled(toggle.checked());
        let toggles = Arc::clone(&toggles);
        let element = toggle.clone();
        listeners.push(EventListener::new(&toggle, "change", move |_| {
            toggles.set_filter_enabled(element.checked());
        }));
    }

    let collaborators = Collaborators {
        controls,
        view: trackball,
        toggles,
        webcam: Box::new(webcam),
    };
    let mut demo = DemoApp::new(renderer, &config, collaborators);

    let texture = AssetSlot::new(config.texture_path.clone());
    spawn_local(load_texture(texture.clone()));
    demo.attach_texture(texture);

    let audio: AssetSlot<Box<dyn SpatialAudio>> = AssetSlot::new(config.audio_path.clone());
    if let Some(button) = document.get_element_by_id(AUDIO_BUTTON_ID) {
        let slot = audio.clone();
        let filter = config.filter;
        listeners.push(EventListener::new(&button, "click", move |_| {
            if !slot.is_pending() {
                return;
            }
            let slot = slot.clone();
            spawn_local(async move {
                let result = WebAudio::load(slot.name(), filter)
                    .await
                    .map(|audio| Box::new(audio) as Box<dyn SpatialAudio>);
                slot.fill(result);
            });
        }));
    }
    demo.attach_audio(audio);

    Ok(Rc::new(RefCell::new(WebApp {
        demo,
        canvas,
        _input: input,
        _orientation: orientation,
        _listeners: listeners,
    })))
}

impl WebApp {
    fn render_frame(&mut self) -> Result<()> {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        if self.demo.renderer().size() != (width, height) {
            self.demo.renderer_mut().resize(width, height);
        }
        match self.demo.render_frame() {
            Ok(_) => Ok(()),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.demo.renderer_mut().resize(width, height);
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(anyhow!("GPU is out of memory")),
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout; retrying next frame");
                Ok(())
            }
        }
    }
}

/// Renders one frame per display refresh. The closure re-requests itself and
/// stays alive for the lifetime of the page; a fatal frame error ends the loop.
fn schedule_animation_loop(app: Rc<RefCell<WebApp>>) -> Result<()> {
    let frame: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = Rc::clone(&frame);

    *frame.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if let Err(err) = app.borrow_mut().render_frame() {
            log::error!("render failed: {err:?}");
            return;
        }
        if let Some(closure) = next.borrow().as_ref() {
            if let Err(err) = request_animation_frame(closure) {
                web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
            }
        }
    }) as Box<dyn FnMut()>));

    let first = frame.borrow();
    let closure = first
        .as_ref()
        .ok_or_else(|| anyhow!("animation closure missing"))?;
    request_animation_frame(closure)
}

fn request_animation_frame(closure: &Closure<dyn FnMut()>) -> Result<()> {
    window()
        .ok_or_else(|| anyhow!("window not available"))?
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    Ok(())
}

async fn load_texture(slot: AssetSlot<TextureImage>) {
    let result = match fetch_bytes(slot.name()).await {
        Ok(bytes) => TextureImage::decode(slot.name(), &bytes),
        Err(err) => Err(DemoError::asset(slot.name(), err)),
    };
    slot.fill(result);
}

pub(crate) async fn fetch_bytes(path: &str) -> Result<Vec<u8>> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let response: Response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|err| anyhow!("fetch failed: {err:?}"))?
        .dyn_into()
        .map_err(|_| anyhow!("fetch did not return a response"))?;
    if !response.ok() {
        return Err(anyhow!("HTTP {}", response.status()));
    }
    let promise = response
        .array_buffer()
        .map_err(|err| anyhow!("body unavailable: {err:?}"))?;
    let buffer: ArrayBuffer = JsFuture::from(promise)
        .await
        .map_err(|err| anyhow!("failed to read body: {err:?}"))?
        .dyn_into()
        .map_err(|_| anyhow!("body is not an ArrayBuffer"))?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

fn document() -> Result<Document> {
    window()
        .and_then(|win| win.document())
        .ok_or_else(|| anyhow!("document not available"))
}

fn input_element(document: &Document, id: &str) -> Option<HtmlInputElement> {
    document
        .get_element_by_id(id)
        .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
}

fn report_failure(err: &anyhow::Error) {
    let Ok(document) = document() else {
        return;
    };
    if let Some(holder) = document.get_element_by_id(CANVAS_HOLDER_ID) {
        let reason = match err.downcast_ref::<DemoError>() {
            Some(DemoError::UnsupportedContext(_)) => {
                "Sorry, could not get a WebGL graphics context.".to_string()
            }
            _ => format!("Sorry, could not initialize the WebGL graphics context: {err}"),
        };
        holder.set_text_content(None);
        if let Ok(paragraph) = document.create_element("p") {
            paragraph.set_text_content(Some(&reason));
            if let Err(err) = holder.append_child(&paragraph) {
                log::warn!("failed to show error message: {err:?}");
            }
        }
    }
}
