//! ADSR Envelope — amplitude as a function of a voice's elapsed sample count.
//!
//! Unlike a gated envelope, every stage length is resolved up front from the
//! note's duration, so the level is a pure function of the elapsed counter.

/// A resolved ADSR envelope in sample units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    attack: u64,
    decay: u64,
    sustain: u64,
    release: u64,
    /// Sustain level [0, 1].
    pub sustain_level: f64,
}

impl Envelope {
    /// Resolve an envelope against a note duration.
    ///
    /// Stage times are in seconds; the sustain stage absorbs whatever of the
    /// note duration is left after attack and decay (never negative).
    pub fn resolve(
        attack_secs: f64,
        decay_secs: f64,
        sustain_level: f64,
        release_secs: f64,
        duration_samples: u64,
        sample_rate: f64,
    ) -> Self {
        let attack = (attack_secs * sample_rate).round() as u64;
        let decay = (decay_secs * sample_rate).round() as u64;
        let release = (release_secs * sample_rate).round() as u64;
        let sustain = duration_samples.saturating_sub(attack + decay);
        Envelope {
            attack,
            decay,
            sustain,
            release,
            sustain_level: sustain_level.clamp(0.0, 1.0),
        }
    }

    /// Total lifetime of a voice driven by this envelope, in samples.
    pub fn total_samples(&self) -> u64 {
        self.attack + self.decay + self.sustain + self.release
    }

    /// Amplitude multiplier at elapsed sample `s`, or `None` once the
    /// envelope is exhausted (the voice retirement signal).
    pub fn level_at(&self, s: u64) -> Option<f64> {
        if s >= self.total_samples() {
            return None;
        }
        if s < self.attack {
            return Some(s as f64 / self.attack as f64);
        }
        let mut offset = s - self.attack;
        if offset < self.decay {
            let t = offset as f64 / self.decay as f64;
            return Some(1.0 - (1.0 - self.sustain_level) * t);
        }
        offset -= self.decay;
        if offset < self.sustain {
            return Some(self.sustain_level);
        }
        offset -= self.sustain;
        // The total_samples() bound above guarantees release > 0 here.
        let t = offset as f64 / self.release as f64;
        Some(self.sustain_level * (1.0 - t))
    }
}
