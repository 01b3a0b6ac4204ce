use std::cell::Cell;

use glam::Vec3;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioBuffer, AudioBufferSourceNode, AudioContext, BiquadFilterNode, BiquadFilterType,
    PannerNode,
};

use crate::audio::{PeakingFilter, SpatialAudio};
use crate::error::DemoError;

/// Looped track with a dry mix and a panned, optionally filtered, copy.
///
/// ```text
/// source -> volume -> main volume -> destination
/// source -> panner -> peaking filter -> destination
///                  \-> destination              (filter off)
/// ```
pub(super) struct WebAudio {
    context: AudioContext,
    _source: AudioBufferSourceNode,
    panner: PannerNode,
    filter: BiquadFilterNode,
    filter_connected: Cell<bool>,
}

impl WebAudio {
    pub(super) async fn load(path: &str, settings: PeakingFilter) -> Result<Self, DemoError> {
        let fail = |err: JsValue| DemoError::asset(path, format!("{err:?}"));

        let context = AudioContext::new().map_err(fail)?;
        let main_volume = context.create_gain().map_err(fail)?;
        main_volume
            .connect_with_audio_node(&context.destination())
            .map_err(fail)?;
        let source = context.create_buffer_source().map_err(fail)?;
        let volume = context.create_gain().map_err(fail)?;
        source.connect_with_audio_node(&volume).map_err(fail)?;
        volume.connect_with_audio_node(&main_volume).map_err(fail)?;
        source.set_loop(true);

        let bytes = super::fetch_bytes(path)
            .await
            .map_err(|err| DemoError::asset(path, err))?;
        let array = js_sys::Uint8Array::from(bytes.as_slice());
        let decoded = JsFuture::from(context.decode_audio_data(&array.buffer()).map_err(fail)?)
            .await
            .map_err(fail)?
            .dyn_into::<AudioBuffer>()
            .map_err(fail)?;
        source.set_buffer(Some(&decoded));
        source
            .start_with_when(context.current_time())
            .map_err(fail)?;

        let panner = context.create_panner().map_err(fail)?;
        let filter = context.create_biquad_filter().map_err(fail)?;
        source.connect_with_audio_node(&panner).map_err(fail)?;
        panner.connect_with_audio_node(&filter).map_err(fail)?;
        filter
            .connect_with_audio_node(&context.destination())
            .map_err(fail)?;

        filter.set_type(BiquadFilterType::Peaking);
        filter.frequency().set_value(settings.frequency);
        filter.gain().set_value(settings.gain);
        filter.q().set_value(settings.q);

        log::info!("audio graph ready: {path}");
        Ok(Self {
            context,
            _source: source,
            panner,
            filter,
            filter_connected: Cell::new(true),
        })
    }
}

impl SpatialAudio for WebAudio {
    fn set_position(&self, position: Vec3) {
        self.panner.position_x().set_value(position.x);
        self.panner.position_y().set_value(position.y);
        self.panner.position_z().set_value(position.z);
    }

    fn set_filter_enabled(&self, enabled: bool) {
        if self.filter_connected.get() == enabled {
            return;
        }
        let rewired = self.panner.disconnect().and_then(|_| {
            if enabled {
                self.panner.connect_with_audio_node(&self.filter)
            } else {
                self.panner
                    .connect_with_audio_node(&self.context.destination())
            }
        });
        match rewired {
            Ok(_) => self.filter_connected.set(enabled),
            Err(err) => log::warn!("failed to switch audio filter: {err:?}"),
        }
    }
}
