//! Delay — a single mono feedback delay line on a circular buffer.
//!
//! One instance is allocated at load time and shared by every voice the
//! engine mixes, so overlapping notes feed a common echo tail.

/// A circular delay buffer. Reading and writing share one index: the slot
/// read each sample was written exactly `len` samples ago.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f64>,
    pos: usize,
}

impl DelayLine {
    /// Allocate a delay line of `delay_secs` at the given sample rate.
    pub fn new(delay_secs: f64, sample_rate: f64) -> Self {
        let len = ((delay_secs * sample_rate) as usize).max(1);
        DelayLine {
            buffer: vec![0.0; len],
            pos: 0,
        }
    }

    /// Length of the line in samples.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Process one sample: returns `input + wet · delayed`, writes
    /// `input + feedback · delayed` back, and advances the index.
    #[inline]
    pub fn process(&mut self, input: f64, wet: f64, feedback: f64) -> f64 {
        let delayed = self.buffer[self.pos];
        self.buffer[self.pos] = input + feedback * delayed;
        self.pos = (self.pos + 1) % self.buffer.len();
        input + wet * delayed
    }

    /// Zero the buffer without reallocating.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}
