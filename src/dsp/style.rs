//! Synthesis styles — strategy variants selecting how a voice's
//! oscillators are combined into a signal.
//!
//! Each style is one rendering function; the engine dispatches on the
//! style enum and never branches on it anywhere else.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::oscillator::{self, soft_saturate};
use super::voice::Voice;

/// The selectable synthesis styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthStyle {
    /// Single implicit oscillator, program-bucketed sine-harmonic blends.
    #[default]
    Classic,
    /// Full oscillator stack with band-limited waveforms and saturation.
    Electronic,
    /// Per-oscillator envelopes and filters, amplitude LFO and vibrato.
    Synthwave,
}

impl SynthStyle {
    /// Stable index used for the lock-free style selector atomic.
    pub fn index(self) -> u8 {
        match self {
            SynthStyle::Classic => 0,
            SynthStyle::Electronic => 1,
            SynthStyle::Synthwave => 2,
        }
    }

    /// Inverse of [`index`](Self::index); unknown values fall back to Classic.
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => SynthStyle::Electronic,
            2 => SynthStyle::Synthwave,
            _ => SynthStyle::Classic,
        }
    }

    /// Synthwave forces one voice per instrument program; the other styles
    /// stack voices freely.
    pub fn monophonic_per_program(self) -> bool {
        matches!(self, SynthStyle::Synthwave)
    }

    /// Produce the style's raw signal for one voice at its current elapsed
    /// position, pre-amplitude and pre-effects. `None` retires the voice.
    pub fn render(self, voice: &mut Voice, ctx: &StyleContext) -> Option<f64> {
        match self {
            SynthStyle::Classic => render_classic(voice, ctx),
            SynthStyle::Electronic => render_electronic(voice, ctx),
            SynthStyle::Synthwave => render_synthwave(voice, ctx),
        }
    }
}

/// Per-sample rendering context shared by all voices.
#[derive(Debug, Clone, Copy)]
pub struct StyleContext {
    pub sample_rate: f64,
    /// Playback time in seconds since the cursor was last reset.
    pub global_time_secs: f64,
    /// Vibrato rate in Hz (Synthwave only).
    pub vibrato_rate: f64,
    /// Vibrato depth in semitones (Synthwave only).
    pub vibrato_depth: f64,
}

/// Instrument-program families used for Classic-style timbres and for
/// envelope defaults when a part's oscillators carry no ADSR times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramBucket {
    Bass,
    Lead,
    Pad,
}

impl ProgramBucket {
    /// Classify a General-MIDI-like program id.
    pub fn of(program: u8) -> Self {
        match program {
            32..=39 => ProgramBucket::Bass,
            40..=55 | 88..=103 => ProgramBucket::Pad,
            _ => ProgramBucket::Lead,
        }
    }

    /// Default ADSR times (attack, decay, sustain level, release) in seconds.
    pub fn default_adsr(self) -> (f64, f64, f64, f64) {
        match self {
            ProgramBucket::Bass => (0.005, 0.08, 0.9, 0.15),
            ProgramBucket::Lead => (0.01, 0.1, 0.7, 0.3),
            ProgramBucket::Pad => (0.4, 0.3, 0.8, 1.2),
        }
    }

    /// Fixed sine-harmonic blend at phase `p` (in cycles).
    fn blend(self, p: f64) -> f64 {
        let x = TAU * p;
        match self {
            ProgramBucket::Bass => ((x).sin() + 0.5 * (2.0 * x).sin()) / 1.5,
            ProgramBucket::Lead => {
                ((x).sin() + 0.3 * (2.0 * x).sin() + 0.15 * (3.0 * x).sin()) / 1.45
            }
            ProgramBucket::Pad => {
                ((x).sin() + 0.4 * (3.0 * x).sin() + 0.2 * (5.0 * x).sin()) / 1.6
            }
        }
    }
}

/// Classic: one implicit oscillator, timbre picked by program family,
/// phase derived directly from the elapsed counter.
fn render_classic(voice: &mut Voice, ctx: &StyleContext) -> Option<f64> {
    let env = voice.lead_envelope().level_at(voice.elapsed)?;
    let phase = voice.elapsed as f64 * voice.frequency / ctx.sample_rate;
    let signal = ProgramBucket::of(voice.program).blend(phase);
    Some(signal * env)
}

/// Electronic: sum the enabled oscillator stack, detuned per entry, soften
/// with soft saturation, then apply the first oscillator's envelope.
fn render_electronic(voice: &mut Voice, ctx: &StyleContext) -> Option<f64> {
    let env = voice.lead_envelope().level_at(voice.elapsed)?;
    let mut sum = 0.0;
    for osc in &voice.oscillators {
        let spec = osc.resolved;
        if spec.amplitude == 0.0 {
            continue;
        }
        let freq = voice.frequency * semitone_ratio(spec.semitone_offset);
        let dt = freq / ctx.sample_rate;
        let phase = voice.elapsed as f64 * dt;
        sum += oscillator::sample(spec.wave, phase, dt) * spec.amplitude;
    }
    Some(soft_saturate(sum) * env)
}

/// Synthwave: per-oscillator envelope and filter, a slow shared amplitude
/// LFO, and pitch vibrato common to the whole voice.
fn render_synthwave(voice: &mut Voice, ctx: &StyleContext) -> Option<f64> {
    if voice.finished() {
        return None;
    }
    let vibrato = semitone_ratio(
        ctx.vibrato_depth
            * (TAU * ctx.vibrato_rate * voice.elapsed as f64 / ctx.sample_rate).sin(),
    );
    let mut sum = 0.0;
    for osc in &mut voice.oscillators {
        let spec = osc.resolved;
        let Some(env) = spec.envelope.level_at(voice.elapsed) else {
            continue;
        };
        let freq = voice.frequency * semitone_ratio(spec.semitone_offset) * vibrato;
        let dt = freq / ctx.sample_rate;
        let phase = voice.elapsed as f64 * dt;
        let mut signal = oscillator::sample(spec.wave, phase, dt);
        if let Some(filter) = osc.filter.as_mut() {
            signal = filter.process(signal);
        }
        sum += signal * spec.amplitude * env;
    }
    let lfo = 0.8 + 0.2 * (TAU * 0.2 * ctx.global_time_secs).sin();
    Some(sum * lfo)
}

/// Frequency multiplier for a semitone offset.
#[inline]
fn semitone_ratio(semitones: f64) -> f64 {
    (2.0_f64).powf(semitones / 12.0)
}
