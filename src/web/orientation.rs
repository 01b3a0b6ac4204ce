use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use gloo_events::{EventListener, EventListenerOptions};
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{window, DeviceOrientationEvent, Document, HtmlInputElement};

use crate::controls::SceneToggles;
use crate::error::DemoError;
use crate::orbit::OrientationReading;

/// Feeds `deviceorientation` events into [`SceneToggles`].
///
/// The sensor listener is installed after the permission request triggered by
/// the request button; the checkbox only decides whether readings are used.
pub(super) struct OrientationSensor {
    _sensor: Rc<RefCell<Option<EventListener>>>,
    _listeners: Vec<EventListener>,
}

impl OrientationSensor {
    pub(super) fn attach(
        document: &Document,
        toggle_id: &str,
        request_id: &str,
        toggles: Arc<SceneToggles>,
    ) -> Result<Self> {
        let sensor = Rc::new(RefCell::new(None));
        let mut listeners = Vec::new();

        if let Some(toggle) = document
            .get_element_by_id(toggle_id)
            .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
        {
            toggles.set_orientation_enabled(toggle.checked());
            let toggles = Arc::clone(&toggles);
            let element = toggle.clone();
            listeners.push(EventListener::new(&toggle, "change", move |_| {
                toggles.set_orientation_enabled(element.checked());
            }));
        }

        if let Some(button) = document.get_element_by_id(request_id) {
            let sensor = Rc::clone(&sensor);
            listeners.push(EventListener::new(&button, "click", move |_| {
                let sensor = Rc::clone(&sensor);
                let toggles = Arc::clone(&toggles);
                spawn_local(async move {
                    match request_permission().await {
                        Ok(()) => {
                            log::info!("device orientation permission granted");
                            match listen(toggles) {
                                Ok(listener) => *sensor.borrow_mut() = Some(listener),
                                Err(err) => log::error!("{err:?}"),
                            }
                        }
                        Err(err) => log::warn!("{err}; orbit stays time driven"),
                    }
                });
            }));
        }

        Ok(Self {
            _sensor: sensor,
            _listeners: listeners,
        })
    }
}

/// Asks for sensor access where the browser requires it (iOS Safari).
async fn request_permission() -> Result<(), DemoError> {
    let denied = || DemoError::PermissionDenied("device orientation".into());
    let window = window().ok_or_else(denied)?;
    let constructor =
        Reflect::get(&window, &JsValue::from_str("DeviceOrientationEvent")).map_err(|_| denied())?;
    if constructor.is_undefined() {
        return Err(denied());
    }
    let request = Reflect::get(&constructor, &JsValue::from_str("requestPermission"))
        .map_err(|_| denied())?;
    let Some(request) = request.dyn_ref::<Function>() else {
        return Ok(());
    };
    let promise: Promise = request
        .call0(&constructor)
        .and_then(|value| value.dyn_into())
        .map_err(|_| denied())?;
    let answer = JsFuture::from(promise).await.map_err(|_| denied())?;
    if answer.as_string().as_deref() == Some("granted") {
        Ok(())
    } else {
        Err(denied())
    }
}

fn listen(toggles: Arc<SceneToggles>) -> Result<EventListener> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    Ok(EventListener::new_with_options(
        &window,
        "deviceorientation",
        EventListenerOptions::run_in_capture_phase(),
        move |event| {
            if let Some(event) = event.dyn_ref::<DeviceOrientationEvent>() {
                toggles.record_orientation(OrientationReading {
                    alpha: event.alpha().unwrap_or(0.0) as f32,
                    beta: event.beta().unwrap_or(0.0) as f32,
                    gamma: event.gamma().unwrap_or(0.0) as f32,
                });
            }
        },
    ))
}
