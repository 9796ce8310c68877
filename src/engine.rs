//! Engine — the real-time voice manager and mixer.
//!
//! One audio callback thread pulls interleaved stereo buffers through
//! [`Engine::read`]; game and UI threads call [`Engine::load`] /
//! [`Engine::reset`] and the atomic property setters concurrently. All
//! mutable playback state sits behind a single mutex; `load` precomputes
//! its schedule and effect buffers before taking it, so the real-time
//! thread only ever blocks for the duration of a pointer swap.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::dsp::delay::DelayLine;
use crate::dsp::effects::{FxConfig, FxContext, apply_chain};
use crate::dsp::reverb::Reverb;
use crate::dsp::style::{StyleContext, SynthStyle};
use crate::dsp::voice::Voice;
use crate::error::LoadError;
use crate::schedule::{STEPS_PER_BAR, Schedule};
use crate::score::Track;

/// Fixed engine sample rate in Hz.
pub const SAMPLE_RATE: f64 = 48_000.0;
/// Output channel count (stereo, mono signal duplicated).
pub const CHANNELS: usize = 2;
/// Headroom applied to the voice sum before clamping.
const MASTER_GAIN: f64 = 0.2;
/// Polyphony cap; notes arriving with a full voice pool are dropped.
const MAX_VOICES: usize = 64;

/// MIDI note number to frequency, A4 (69) = 440 Hz equal temperament.
pub fn midi_to_frequency(note: u8) -> f64 {
    440.0 * (2.0_f64).powf((note as f64 - 69.0) / 12.0)
}

/// Everything guarded by the engine lock.
struct EngineState {
    schedule: Schedule,
    config: FxConfig,
    voices: Vec<Voice>,
    /// Absolute sample position within the track.
    cursor: u64,
    /// False once a non-looping track has run out.
    playing: bool,
    /// Shared delay line, reallocated only on load.
    delay: DelayLine,
    /// Shared reverb tank, reallocated only on load.
    reverb: Reverb,
    loaded: bool,
}

/// The playback engine. Cheap to share behind an `Arc`.
pub struct Engine {
    state: Mutex<EngineState>,
    // Runtime-mutable properties: plain value swaps, no lock involved.
    volume_bits: AtomicU32,
    vibrato_rate_bits: AtomicU32,
    vibrato_depth_bits: AtomicU32,
    style: AtomicU8,
    // Read-only playback position for UI synchronization.
    step: AtomicU64,
    playing: AtomicBool,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            state: Mutex::new(EngineState {
                schedule: Schedule::default(),
                config: FxConfig::default(),
                voices: Vec::new(),
                cursor: 0,
                playing: false,
                delay: DelayLine::new(FxConfig::default().delay_time, SAMPLE_RATE),
                reverb: Reverb::new(FxConfig::default().reverb_time, SAMPLE_RATE),
                loaded: false,
            }),
            volume_bits: AtomicU32::new(1.0_f32.to_bits()),
            vibrato_rate_bits: AtomicU32::new(5.0_f32.to_bits()),
            vibrato_depth_bits: AtomicU32::new(0.1_f32.to_bits()),
            style: AtomicU8::new(SynthStyle::default().index()),
            step: AtomicU64::new(0),
            playing: AtomicBool::new(false),
        }
    }

    /// Compile and install a track, replacing all prior playback state.
    ///
    /// The schedule and the effect buffers are built before the lock is
    /// taken; the critical section is a plain swap.
    pub fn load(&self, track: &Track, config: FxConfig) -> Result<(), LoadError> {
        let schedule = Schedule::compile(track, SAMPLE_RATE)?;
        let delay = DelayLine::new(config.delay_time, SAMPLE_RATE);
        let reverb = Reverb::new(config.reverb_time, SAMPLE_RATE);
        let voices = Vec::with_capacity(MAX_VOICES);

        info!(
            track = %track.name,
            tempo = track.tempo,
            parts = track.parts.len(),
            notes = schedule.note_count,
            total_samples = schedule.total_samples,
            looping = config.looping,
            "track loaded"
        );

        let mut state = self.state.lock();
        *state = EngineState {
            schedule,
            config,
            voices,
            cursor: 0,
            playing: true,
            delay,
            reverb,
            loaded: true,
        };
        drop(state);

        self.step.store(0, Ordering::Relaxed);
        self.playing.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Rewind to the top of the track without reallocating anything.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.voices.clear();
        state.cursor = 0;
        state.delay.clear();
        state.reverb.clear();
        state.playing = state.loaded;
        let playing = state.playing;
        drop(state);

        self.step.store(0, Ordering::Relaxed);
        self.playing.store(playing, Ordering::Relaxed);
        debug!("playback reset");
    }

    /// Fill `out` with interleaved stereo samples.
    ///
    /// Always writes the whole buffer (silence where nothing is sounding)
    /// and returns the number of frames produced.
    pub fn read(&self, out: &mut [f32]) -> usize {
        out.fill(0.0);
        let frames = out.len() / CHANNELS;

        let volume = self.volume() as f64;
        let style = self.style();
        let vibrato_rate = self.vibrato_rate() as f64;
        let vibrato_depth = self.vibrato_depth() as f64;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.loaded {
            return frames;
        }

        let EngineState {
            schedule,
            config,
            voices,
            cursor,
            playing,
            delay,
            reverb,
            ..
        } = state;

        for frame in 0..frames {
            if !*playing {
                break;
            }

            // 1. Activate notes scheduled at this exact sample.
            if let Some(due) = schedule.notes_at(*cursor) {
                for note in due {
                    if style.monophonic_per_program()
                        && voices.iter().any(|v| v.program == note.program)
                    {
                        continue;
                    }
                    if voices.len() >= MAX_VOICES {
                        continue;
                    }
                    voices.push(Voice::start(
                        midi_to_frequency(note.pitch),
                        note.velocity as f64 / 127.0,
                        note.duration_samples,
                        note.channel,
                        note.program,
                        &note.oscillators,
                        note.params.clone(),
                        SAMPLE_RATE,
                    ));
                }
            }

            // 2. Advance and mix all active voices, removing finished ones
            //    in reverse index order.
            let ctx = StyleContext {
                sample_rate: SAMPLE_RATE,
                global_time_secs: *cursor as f64 / SAMPLE_RATE,
                vibrato_rate,
                vibrato_depth,
            };
            let mut sum = 0.0;
            for i in (0..voices.len()).rev() {
                let voice = &mut voices[i];
                match style.render(voice, &ctx) {
                    Some(signal) => {
                        let mut fx = FxContext {
                            config: &*config,
                            delay: &mut *delay,
                            reverb: &mut *reverb,
                            time_secs: ctx.global_time_secs,
                        };
                        let processed = apply_chain(
                            signal,
                            &voice.params.effects,
                            voice.params.automation.as_ref(),
                            &mut voice.crusher,
                            &mut fx,
                        );
                        sum += processed * voice.amplitude;
                        voice.advance();
                        if voice.finished() {
                            voices.swap_remove(i);
                        }
                    }
                    None => {
                        voices.swap_remove(i);
                    }
                }
            }

            // 3. Master volume, headroom, hard clamp; mono duplicated.
            let sample = (sum * volume * MASTER_GAIN).clamp(-1.0, 1.0) as f32;
            out[frame * CHANNELS] = sample;
            out[frame * CHANNELS + 1] = sample;

            // 4. Advance the cursor and publish the musical position.
            *cursor += 1;
            self.step
                .store(schedule.step_at(*cursor) as u64, Ordering::Relaxed);

            // 5. End of track: wrap or fall silent.
            if *cursor >= schedule.total_samples {
                if config.looping {
                    voices.clear();
                    *cursor = 0;
                    self.step.store(0, Ordering::Relaxed);
                } else {
                    *playing = false;
                }
            }
        }

        let still_playing = *playing;
        drop(guard);
        self.playing.store(still_playing, Ordering::Relaxed);
        frames
    }

    // ── Runtime-mutable properties ──────────────────────────────────

    /// Master volume modifier applied before the fixed headroom gain.
    pub fn set_volume(&self, volume: f32) {
        self.volume_bits
            .store(volume.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    /// Vibrato rate in Hz (Synthwave style).
    pub fn set_vibrato_rate(&self, rate: f32) {
        self.vibrato_rate_bits.store(rate.to_bits(), Ordering::Relaxed);
    }

    pub fn vibrato_rate(&self) -> f32 {
        f32::from_bits(self.vibrato_rate_bits.load(Ordering::Relaxed))
    }

    /// Vibrato depth in semitones (Synthwave style).
    pub fn set_vibrato_depth(&self, depth: f32) {
        self.vibrato_depth_bits.store(depth.to_bits(), Ordering::Relaxed);
    }

    pub fn vibrato_depth(&self) -> f32 {
        f32::from_bits(self.vibrato_depth_bits.load(Ordering::Relaxed))
    }

    pub fn set_style(&self, style: SynthStyle) {
        self.style.store(style.index(), Ordering::Relaxed);
    }

    pub fn style(&self) -> SynthStyle {
        SynthStyle::from_index(self.style.load(Ordering::Relaxed))
    }

    // ── Read-only playback position ─────────────────────────────────

    /// Absolute 16th-note step since the top of the track.
    pub fn current_step(&self) -> u64 {
        self.step.load(Ordering::Relaxed)
    }

    /// Bar index derived from the current step.
    pub fn current_bar(&self) -> u64 {
        self.current_step() / STEPS_PER_BAR as u64
    }

    /// Step within the current bar [0, 16).
    pub fn step_in_bar(&self) -> u64 {
        self.current_step() % STEPS_PER_BAR as u64
    }

    /// Whether the engine is producing non-silent output.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    /// Number of currently sounding voices. Diagnostic; takes the lock.
    pub fn active_voice_count(&self) -> usize {
        self.state.lock().voices.len()
    }

    /// Absolute sample position of the cursor. Diagnostic; takes the lock.
    pub fn cursor_samples(&self) -> u64 {
        self.state.lock().cursor
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
