//! Schedule — compiles a score into a sample-indexed event map.
//!
//! Compilation happens once per load, outside the engine lock: all step
//! arithmetic, oscillator resolution, and envelope conversion is done here
//! so the real-time path only performs map lookups.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dsp::envelope::Envelope;
use crate::dsp::style::ProgramBucket;
use crate::dsp::voice::ResolvedOscillator;
use crate::error::LoadError;
use crate::score::{OscillatorSpec, SynthParameters, Track, Waveform};

/// Steps per bar at 16th-note granularity.
pub const STEPS_PER_BAR: u32 = 16;

/// Length of one 16th-note step in samples at the given tempo.
pub fn samples_per_step(tempo: f64, sample_rate: f64) -> f64 {
    (60_000.0 / tempo / 4.0) / 1000.0 * sample_rate
}

/// A note resolved to sample units, ready to become a voice.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNote {
    pub pitch: u8,
    pub velocity: u8,
    pub duration_samples: u64,
    pub channel: u8,
    pub program: u8,
    /// Resolved oscillator list; never empty.
    pub oscillators: Vec<ResolvedOscillator>,
    /// The owning part's parameters, shared with every sibling note.
    pub params: Arc<SynthParameters>,
}

/// The compiled, immutable playback plan for one track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    /// Notes grouped by absolute start sample.
    events: BTreeMap<u64, Vec<ScheduledNote>>,
    /// Loop boundary in samples.
    pub total_samples: u64,
    /// Step length in samples (fractional).
    pub samples_per_step: f64,
    /// Total notes scheduled, for diagnostics.
    pub note_count: usize,
}

impl Schedule {
    /// Compile a track at the given sample rate.
    ///
    /// Zero-velocity and zero-duration notes are dropped here so they never
    /// reach the voice pool.
    pub fn compile(track: &Track, sample_rate: f64) -> Result<Schedule, LoadError> {
        if !track.tempo.is_finite() || track.tempo <= 0.0 {
            return Err(LoadError::InvalidTempo { bpm: track.tempo });
        }
        if track.bars == 0 {
            return Err(LoadError::EmptyTrack);
        }

        let sps = samples_per_step(track.tempo, sample_rate);
        let mut events: BTreeMap<u64, Vec<ScheduledNote>> = BTreeMap::new();
        let mut note_count = 0;

        for part in &track.parts {
            let params = Arc::new(part.synth.clone());
            for note in &part.notes {
                if note.velocity == 0 || note.duration_steps == 0 {
                    continue;
                }
                let start_sample = (note.start_step as f64 * sps).round() as u64;
                let duration_samples = (note.duration_steps as f64 * sps).round() as u64;
                let oscillators = resolve_oscillators(
                    &part.synth.oscillators,
                    part.program,
                    duration_samples,
                    sample_rate,
                );
                events.entry(start_sample).or_default().push(ScheduledNote {
                    pitch: note.pitch.min(127),
                    velocity: note.velocity.min(127),
                    duration_samples,
                    channel: part.channel,
                    program: part.program,
                    oscillators,
                    params: Arc::clone(&params),
                });
                note_count += 1;
            }
        }

        let total_samples =
            ((track.bars as u64 * STEPS_PER_BAR as u64) as f64 * sps).round() as u64;

        Ok(Schedule {
            events,
            total_samples,
            samples_per_step: sps,
            note_count,
        })
    }

    /// Notes starting exactly at `sample`, if any.
    pub fn notes_at(&self, sample: u64) -> Option<&[ScheduledNote]> {
        self.events.get(&sample).map(Vec::as_slice)
    }

    /// Step index for an absolute sample position.
    pub fn step_at(&self, sample: u64) -> u32 {
        if self.samples_per_step <= 0.0 {
            return 0;
        }
        (sample as f64 / self.samples_per_step) as u32
    }
}

/// Flatten a part's oscillator specs against one note.
///
/// Disabled entries are dropped; a part with no usable oscillators gets a
/// single default sine so every voice has an envelope to live by.
fn resolve_oscillators(
    specs: &[OscillatorSpec],
    program: u8,
    duration_samples: u64,
    sample_rate: f64,
) -> Vec<ResolvedOscillator> {
    let (da, dd, ds, dr) = ProgramBucket::of(program).default_adsr();
    let resolve = |spec: &OscillatorSpec| ResolvedOscillator {
        wave: spec.wave,
        amplitude: spec.amplitude,
        semitone_offset: spec.semitone_offset,
        envelope: Envelope::resolve(
            spec.attack.unwrap_or(da),
            spec.decay.unwrap_or(dd),
            spec.sustain.unwrap_or(ds),
            spec.release.unwrap_or(dr),
            duration_samples,
            sample_rate,
        ),
        filter: spec.filter,
    };

    let resolved: Vec<ResolvedOscillator> = specs
        .iter()
        .filter(|spec| spec.enabled)
        .map(resolve)
        .collect();
    if !resolved.is_empty() {
        return resolved;
    }
    vec![ResolvedOscillator {
        wave: Waveform::Sine,
        amplitude: 1.0,
        semitone_offset: 0.0,
        envelope: Envelope::resolve(da, dd, ds, dr, duration_samples, sample_rate),
        filter: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Note, Part};

    const SR: f64 = 48_000.0;

    fn track_with_notes(notes: Vec<Note>) -> Track {
        Track {
            name: "test".to_string(),
            tempo: 120.0,
            bars: 2,
            key: "C".to_string(),
            parts: vec![Part {
                channel: 0,
                program: 81,
                notes,
                synth: SynthParameters::default(),
            }],
        }
    }

    #[test]
    fn step_length_at_120_bpm() {
        // 60000/120/4 ms = 125 ms per 16th = 6000 samples at 48 kHz
        assert_eq!(samples_per_step(120.0, SR), 6000.0);
    }

    #[test]
    fn notes_land_on_their_step() {
        let schedule = Schedule::compile(
            &track_with_notes(vec![
                Note {
                    pitch: 60,
                    velocity: 100,
                    start_step: 0,
                    duration_steps: 4,
                },
                Note {
                    pitch: 64,
                    velocity: 100,
                    start_step: 3,
                    duration_steps: 1,
                },
            ]),
            SR,
        )
        .expect("compile failed");

        let first = schedule.notes_at(0).expect("note at step 0");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].pitch, 60);
        assert_eq!(first[0].duration_samples, 24_000);

        let second = schedule.notes_at(18_000).expect("note at step 3");
        assert_eq!(second[0].pitch, 64);
        assert!(schedule.notes_at(1).is_none());
    }

    #[test]
    fn chords_group_on_one_sample() {
        let schedule = Schedule::compile(
            &track_with_notes(vec![
                Note {
                    pitch: 60,
                    velocity: 100,
                    start_step: 4,
                    duration_steps: 2,
                },
                Note {
                    pitch: 64,
                    velocity: 90,
                    start_step: 4,
                    duration_steps: 2,
                },
                Note {
                    pitch: 67,
                    velocity: 80,
                    start_step: 4,
                    duration_steps: 2,
                },
            ]),
            SR,
        )
        .expect("compile failed");
        let chord = schedule.notes_at(24_000).expect("chord at step 4");
        assert_eq!(chord.len(), 3);
    }

    #[test]
    fn total_length_covers_all_bars() {
        let schedule =
            Schedule::compile(&track_with_notes(vec![]), SR).expect("compile failed");
        // 2 bars * 16 steps * 6000 samples
        assert_eq!(schedule.total_samples, 192_000);
    }

    #[test]
    fn silent_notes_are_dropped() {
        let schedule = Schedule::compile(
            &track_with_notes(vec![
                Note {
                    pitch: 60,
                    velocity: 0,
                    start_step: 0,
                    duration_steps: 4,
                },
                Note {
                    pitch: 60,
                    velocity: 100,
                    start_step: 1,
                    duration_steps: 0,
                },
            ]),
            SR,
        )
        .expect("compile failed");
        assert_eq!(schedule.note_count, 0);
        assert!(schedule.notes_at(0).is_none());
        assert!(schedule.notes_at(6000).is_none());
    }

    #[test]
    fn rejects_bad_tempo() {
        let mut track = track_with_notes(vec![]);
        track.tempo = 0.0;
        assert_eq!(
            Schedule::compile(&track, SR),
            Err(LoadError::InvalidTempo { bpm: 0.0 })
        );
        track.tempo = f64::NAN;
        assert!(matches!(
            Schedule::compile(&track, SR),
            Err(LoadError::InvalidTempo { .. })
        ));
    }

    #[test]
    fn rejects_zero_bars() {
        let mut track = track_with_notes(vec![]);
        track.bars = 0;
        assert_eq!(Schedule::compile(&track, SR), Err(LoadError::EmptyTrack));
    }

    #[test]
    fn empty_part_gets_default_oscillator() {
        let schedule = Schedule::compile(
            &track_with_notes(vec![Note {
                pitch: 69,
                velocity: 100,
                start_step: 0,
                duration_steps: 4,
            }]),
            SR,
        )
        .expect("compile failed");
        let note = &schedule.notes_at(0).unwrap()[0];
        assert_eq!(note.oscillators.len(), 1);
        assert_eq!(note.oscillators[0].wave, Waveform::Sine);
    }

    #[test]
    fn disabled_oscillators_are_skipped() {
        let mut track = track_with_notes(vec![Note {
            pitch: 69,
            velocity: 100,
            start_step: 0,
            duration_steps: 4,
        }]);
        track.parts[0].synth.oscillators = vec![
            OscillatorSpec {
                wave: Waveform::Sawtooth,
                enabled: false,
                ..Default::default()
            },
            OscillatorSpec {
                wave: Waveform::Square,
                ..Default::default()
            },
        ];
        let schedule = Schedule::compile(&track, SR).expect("compile failed");
        let note = &schedule.notes_at(0).unwrap()[0];
        assert_eq!(note.oscillators.len(), 1);
        assert_eq!(note.oscillators[0].wave, Waveform::Square);
    }

    #[test]
    fn step_index_derivation() {
        let schedule =
            Schedule::compile(&track_with_notes(vec![]), SR).expect("compile failed");
        assert_eq!(schedule.step_at(0), 0);
        assert_eq!(schedule.step_at(5999), 0);
        assert_eq!(schedule.step_at(6000), 1);
        assert_eq!(schedule.step_at(95_999), 15);
        assert_eq!(schedule.step_at(96_000), 16);
    }

    #[test]
    fn fractional_tempo_rounds_per_note() {
        // 140 BPM: sps = 60000/140/4/1000*48000 ≈ 5142.857
        let mut track = track_with_notes(vec![Note {
            pitch: 60,
            velocity: 100,
            start_step: 7,
            duration_steps: 1,
        }]);
        track.tempo = 140.0;
        let schedule = Schedule::compile(&track, SR).expect("compile failed");
        let sps = samples_per_step(140.0, SR);
        let expected = (7.0 * sps).round() as u64;
        assert!(schedule.notes_at(expected).is_some());
    }
}
