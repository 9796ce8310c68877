pub mod automation;
pub mod dsp;
pub mod engine;
pub mod error;
#[cfg(feature = "playback")]
pub mod playback;
pub mod schedule;
pub mod score;

use std::sync::OnceLock;

use wasm_bindgen::prelude::*;

pub use crate::dsp::effects::FxConfig;
pub use crate::dsp::style::SynthStyle;
pub use crate::engine::{CHANNELS, Engine, SAMPLE_RATE};
pub use crate::error::{LoadError, PlaybackError, SynthError};
pub use crate::score::Track;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The process-wide engine instance backing the WASM API. Native callers
/// normally construct their own [`Engine`] instead.
pub fn shared_engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(Engine::new)
}

/// WASM-exposed: return the stepsynth version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: load a track (as a JSON value) with the given effect
/// configuration into the shared engine.
#[wasm_bindgen]
pub fn load_track(track: JsValue, config: JsValue) -> Result<(), JsValue> {
    let track: Track =
        serde_wasm_bindgen::from_value(track).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let config: FxConfig =
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    shared_engine()
        .load(&track, config)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: pull `frames` stereo frames from the shared engine.
/// Returns interleaved f32 samples for AudioWorklet playback.
#[wasm_bindgen]
pub fn read_block(frames: usize) -> Vec<f32> {
    let mut buffer = vec![0.0_f32; frames * CHANNELS];
    shared_engine().read(&mut buffer);
    buffer
}

/// WASM-exposed: rewind the shared engine without reloading.
#[wasm_bindgen]
pub fn reset_playback() {
    shared_engine().reset();
}

/// WASM-exposed: master volume modifier.
#[wasm_bindgen]
pub fn set_master_volume(volume: f32) {
    shared_engine().set_volume(volume);
}

/// WASM-exposed: vibrato rate (Hz) and depth (semitones).
#[wasm_bindgen]
pub fn set_vibrato(rate: f32, depth: f32) {
    shared_engine().set_vibrato_rate(rate);
    shared_engine().set_vibrato_depth(depth);
}

/// WASM-exposed: select the synthesis style by index
/// (0 = classic, 1 = electronic, 2 = synthwave).
#[wasm_bindgen]
pub fn set_style(index: u8) {
    shared_engine().set_style(SynthStyle::from_index(index));
}

/// WASM-exposed: absolute 16th-note step since the top of the track.
#[wasm_bindgen]
pub fn current_step() -> u32 {
    shared_engine().current_step() as u32
}

/// WASM-exposed: current bar index.
#[wasm_bindgen]
pub fn current_bar() -> u32 {
    shared_engine().current_bar() as u32
}

/// WASM-exposed: step within the current bar [0, 16).
#[wasm_bindgen]
pub fn step_in_bar() -> u32 {
    shared_engine().step_in_bar() as u32
}

/// WASM-exposed: whether the shared engine is producing audio.
#[wasm_bindgen]
pub fn is_playing() -> bool {
    shared_engine().is_playing()
}
