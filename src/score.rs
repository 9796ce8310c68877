//! Score model — the declarative multi-track song structure handed to the
//! engine by the composer.
//!
//! A `Track` is pure data: it carries no playback state. The engine compiles
//! it into a sample-indexed schedule at load time (see `schedule`).

use serde::{Deserialize, Serialize};

/// A complete multi-track score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Display name of the track.
    pub name: String,
    /// Tempo in beats per minute.
    pub tempo: f64,
    /// Length of the track in bars (16 steps per bar).
    pub bars: u32,
    /// Musical key, e.g. "Cm" or "F#". Informational only to the engine.
    pub key: String,
    /// The parts (one per instrument line).
    pub parts: Vec<Part>,
}

/// One instrument line within a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// MIDI-style channel number.
    pub channel: u8,
    /// Instrument program id (General-MIDI-like bucketing).
    pub program: u8,
    /// The notes of this part, in step units.
    pub notes: Vec<Note>,
    /// Synthesis parameters applied to every note of this part.
    pub synth: SynthParameters,
}

/// A single note in 16th-note step units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI note number (0–127).
    pub pitch: u8,
    /// Velocity (0–127). Zero-velocity notes never sound.
    pub velocity: u8,
    /// Start position in 16th-note steps from the top of the track.
    pub start_step: u32,
    /// Duration in 16th-note steps. Zero-duration notes never sound.
    pub duration_steps: u32,
}

/// Per-part synthesis configuration: oscillators, effect chain, automation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthParameters {
    /// Ordered oscillator list. The Electronic and Synthwave styles sum
    /// these; the Classic style uses only the first entry's envelope.
    #[serde(default)]
    pub oscillators: Vec<OscillatorSpec>,
    /// Ordered effect chain, applied per voice in declaration order.
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
    /// Optional time-varying overrides for the delay and reverb amounts.
    #[serde(default)]
    pub automation: Option<Automation>,
}

/// Waveform shapes the oscillators can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    #[serde(alias = "saw")]
    Sawtooth,
    Triangle,
}

/// One oscillator of a part's voice stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorSpec {
    /// Waveform shape.
    pub wave: Waveform,
    /// Whether this oscillator contributes to the sum.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Linear amplitude of this oscillator.
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    /// Detune relative to the note pitch, in semitones.
    #[serde(default)]
    pub semitone_offset: f64,
    /// ADSR attack time in seconds (None = program-bucket default).
    pub attack: Option<f64>,
    /// ADSR decay time in seconds.
    pub decay: Option<f64>,
    /// ADSR sustain level [0, 1].
    pub sustain: Option<f64>,
    /// ADSR release time in seconds.
    pub release: Option<f64>,
    /// Optional resonant filter applied post-waveform (Synthwave style).
    pub filter: Option<FilterSpec>,
}

fn default_enabled() -> bool {
    true
}

fn default_amplitude() -> f64 {
    1.0
}

impl Default for OscillatorSpec {
    fn default() -> Self {
        OscillatorSpec {
            wave: Waveform::Sine,
            enabled: true,
            amplitude: 1.0,
            semitone_offset: 0.0,
            attack: None,
            decay: None,
            sustain: None,
            release: None,
            filter: None,
        }
    }
}

/// Resonant filter settings for one oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Filter mode.
    #[serde(default)]
    pub mode: FilterMode,
    /// Cutoff frequency in Hz.
    pub cutoff: f64,
    /// Resonance (Q). 0.707 is flat Butterworth response.
    #[serde(default = "default_resonance")]
    pub resonance: f64,
}

fn default_resonance() -> f64 {
    0.707
}

/// Filter response shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
}

/// The effect types a chain may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Reverb,
    Delay,
    BitCrusher,
    Distortion,
}

/// One entry of a part's effect chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    /// Which effect to apply.
    pub kind: EffectKind,
    /// Intensity [0, 1]. Dry/wet blend, or quantization depth for the
    /// bit-crusher. Overridden by an automation curve when one is present.
    pub amount: f64,
}

/// Time-varying effect intensity, independent per effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    /// Reverb amount over playback time.
    #[serde(default)]
    pub reverb: Option<crate::automation::Curve>,
    /// Delay amount over playback time.
    #[serde(default)]
    pub delay: Option<crate::automation::Curve>,
}
