//! Voice — one currently-sounding note with its own oscillator, envelope,
//! filter, and bit-crusher state.

use std::sync::Arc;

use crate::score::{FilterSpec, SynthParameters, Waveform};

use super::effects::BitCrusher;
use super::envelope::Envelope;
use super::filter::Biquad;

/// An oscillator resolved against a concrete note at load time: spec values
/// flattened, envelope times converted to sample counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedOscillator {
    pub wave: Waveform,
    pub amplitude: f64,
    pub semitone_offset: f64,
    pub envelope: Envelope,
    pub filter: Option<FilterSpec>,
}

/// Per-oscillator runtime state inside a voice.
#[derive(Debug, Clone)]
pub struct OscState {
    pub resolved: ResolvedOscillator,
    /// Filter instance, created fresh per voice and destroyed with it.
    pub filter: Option<Biquad>,
}

/// A sounding note instance.
#[derive(Debug, Clone)]
pub struct Voice {
    /// Base frequency in Hz (before per-oscillator detune and vibrato).
    pub frequency: f64,
    /// Velocity-derived gain [0, 1].
    pub amplitude: f64,
    /// Note duration in samples (gate length, excluding release).
    pub duration_samples: u64,
    /// Samples processed so far.
    pub elapsed: u64,
    pub channel: u8,
    pub program: u8,
    pub oscillators: Vec<OscState>,
    pub crusher: BitCrusher,
    /// The owning part's parameters (effect chain + automation).
    pub params: Arc<SynthParameters>,
    total_samples: u64,
}

impl Voice {
    /// Instantiate a voice from a scheduled note's resolved data.
    ///
    /// `oscillators` is never empty: the scheduler substitutes a default
    /// oscillator when a part declares none.
    pub fn start(
        frequency: f64,
        amplitude: f64,
        duration_samples: u64,
        channel: u8,
        program: u8,
        oscillators: &[ResolvedOscillator],
        params: Arc<SynthParameters>,
        sample_rate: f64,
    ) -> Self {
        let total_samples = oscillators
            .iter()
            .map(|osc| osc.envelope.total_samples())
            .max()
            .unwrap_or(0);
        let oscillators = oscillators
            .iter()
            .map(|&resolved| OscState {
                resolved,
                filter: resolved
                    .filter
                    .as_ref()
                    .map(|spec| Biquad::from_spec(spec, sample_rate)),
            })
            .collect();
        Voice {
            frequency,
            amplitude,
            duration_samples,
            elapsed: 0,
            channel,
            program,
            oscillators,
            crusher: BitCrusher::new(),
            params,
            total_samples,
        }
    }

    /// The envelope governing the voice as a whole (first oscillator's).
    pub fn lead_envelope(&self) -> &Envelope {
        &self.oscillators[0].resolved.envelope
    }

    /// True once every oscillator envelope is exhausted.
    pub fn finished(&self) -> bool {
        self.elapsed >= self.total_samples
    }

    /// Advance the elapsed-sample counter by one.
    pub fn advance(&mut self) {
        self.elapsed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48_000.0;

    fn resolved(envelope: Envelope) -> ResolvedOscillator {
        ResolvedOscillator {
            wave: Waveform::Sine,
            amplitude: 1.0,
            semitone_offset: 0.0,
            envelope,
            filter: None,
        }
    }

    #[test]
    fn voice_lifetime_covers_longest_envelope() {
        let short = Envelope::resolve(0.0, 0.0, 1.0, 0.1, 1000, SR);
        let long = Envelope::resolve(0.0, 0.0, 1.0, 0.5, 1000, SR);
        let voice = Voice::start(
            440.0,
            0.8,
            1000,
            0,
            0,
            &[resolved(short), resolved(long)],
            Arc::new(SynthParameters::default()),
            SR,
        );
        assert_eq!(
            long.total_samples(),
            1000 + 24_000,
            "sanity: long envelope lifetime"
        );
        assert!(!voice.finished());
        let mut voice = voice;
        for _ in 0..short.total_samples() {
            voice.advance();
        }
        assert!(!voice.finished(), "voice outlives the shorter envelope");
        for _ in short.total_samples()..long.total_samples() {
            voice.advance();
        }
        assert!(voice.finished());
    }

    #[test]
    fn filter_instance_is_per_voice() {
        let env = Envelope::resolve(0.0, 0.0, 1.0, 0.1, 100, SR);
        let with_filter = ResolvedOscillator {
            filter: Some(FilterSpec {
                mode: crate::score::FilterMode::Lowpass,
                cutoff: 800.0,
                resonance: 1.2,
            }),
            ..resolved(env)
        };
        let voice = Voice::start(
            440.0,
            1.0,
            100,
            0,
            0,
            &[with_filter],
            Arc::new(SynthParameters::default()),
            SR,
        );
        assert!(voice.oscillators[0].filter.is_some());

        // A second voice from the same resolved data gets its own state
        let other = Voice::start(
            440.0,
            1.0,
            100,
            0,
            0,
            &[with_filter],
            Arc::new(SynthParameters::default()),
            SR,
        );
        assert!(other.oscillators[0].filter.is_some());
    }
}
