use std::sync::Arc;

use anyhow::Result;
use glam::Vec2;
use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, MouseEvent};

use super::TrackballRotator;

/// Forwards canvas pointer events to the shared [`TrackballRotator`].
pub struct WasmInputHandler {
    listeners: Vec<EventListener>,
}

impl WasmInputHandler {
    pub fn attach(canvas: &HtmlCanvasElement, trackball: Arc<TrackballRotator>) -> Result<Self> {
        let mut listeners = Vec::new();

        {
            let trackball = Arc::clone(&trackball);
            listeners.push(EventListener::new(canvas, "mousedown", move |event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    event.prevent_default();
                    trackball.begin_drag(pointer(event));
                }
            }));
        }

        {
            let trackball = Arc::clone(&trackball);
            listeners.push(EventListener::new(canvas, "mousemove", move |event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    trackball.drag_to(pointer(event));
                }
            }));
        }

        for name in ["mouseup", "mouseleave"] {
            let trackball = Arc::clone(&trackball);
            listeners.push(EventListener::new(canvas, name, move |_| {
                trackball.end_drag();
            }));
        }

        Ok(Self { listeners })
    }
}

impl Drop for WasmInputHandler {
    fn drop(&mut self) {
        self.listeners.clear();
    }
}

fn pointer(event: &MouseEvent) -> Vec2 {
    Vec2::new(event.offset_x() as f32, event.offset_y() as f32)
}
