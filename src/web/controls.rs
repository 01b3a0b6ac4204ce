use anyhow::{anyhow, Result};
use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlInputElement};

use crate::controls::{
    ControlSource, ControlSpec, CAMERA_CONTROLS, EYE_SEPARATION, FOV, NEAR_CLIPPING_DISTANCE,
};
use crate::stereo::CameraParameters;

/// Range inputs for the camera controls, read back on every frame.
pub(super) struct DomControls {
    inputs: Vec<(&'static str, HtmlInputElement)>,
    _listeners: Vec<EventListener>,
}

impl DomControls {
    /// Renders one labelled slider per control into the element `container_id`.
    pub(super) fn render(
        document: &Document,
        container_id: &str,
        defaults: &CameraParameters,
    ) -> Result<Self> {
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| anyhow!("controls container #{container_id} not found"))?;
        let mut inputs = Vec::with_capacity(CAMERA_CONTROLS.len());
        let mut listeners = Vec::with_capacity(CAMERA_CONTROLS.len());

        for spec in &CAMERA_CONTROLS {
            let value = spec.clamp(default_value(spec, defaults));
            let row = create(document, "div")?;
            let label = create(document, "label")?;
            label.set_attribute("for", spec.id).map_err(js_error)?;
            label.set_text_content(Some(spec.label));

            let input = create(document, "input")?
                .dyn_into::<HtmlInputElement>()
                .map_err(|_| anyhow!("failed to create input element"))?;
            input.set_type("range");
            input.set_id(spec.id);
            input.set_min(&spec.min.to_string());
            input.set_max(&spec.max.to_string());
            input.set_step(&spec.step.to_string());
            input.set_value(&value.to_string());

            let readout = create(document, "span")?;
            readout.set_text_content(Some(&value.to_string()));
            {
                let source = input.clone();
                let readout = readout.clone();
                listeners.push(EventListener::new(&input, "input", move |_| {
                    readout.set_text_content(Some(&source.value()));
                }));
            }

            row.append_child(&label).map_err(js_error)?;
            row.append_child(&input).map_err(js_error)?;
            row.append_child(&readout).map_err(js_error)?;
            container.append_child(&row).map_err(js_error)?;
            inputs.push((spec.id, input));
        }

        Ok(Self {
            inputs,
            _listeners: listeners,
        })
    }
}

impl ControlSource for DomControls {
    fn value_by_id(&self, id: &str) -> Option<f32> {
        self.inputs
            .iter()
            .find(|(input_id, _)| *input_id == id)
            .and_then(|(_, input)| input.value().parse::<f32>().ok())
    }
}

fn default_value(spec: &ControlSpec, defaults: &CameraParameters) -> f32 {
    match spec.id {
        EYE_SEPARATION => defaults.eye_separation,
        FOV => defaults.fov,
        NEAR_CLIPPING_DISTANCE => defaults.near_clipping_distance,
        _ => defaults.convergence_distance,
    }
}

fn create(document: &Document, tag: &str) -> Result<Element> {
    document.create_element(tag).map_err(js_error)
}

fn js_error(err: wasm_bindgen::JsValue) -> anyhow::Error {
    anyhow!("DOM operation failed: {err:?}")
}
