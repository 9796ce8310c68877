//! Band-limited waveform generators (PolyBLEP).
//!
//! The engine drives every voice from an elapsed-sample counter, so these
//! are pure functions of phase rather than stateful oscillators: callers
//! pass `phase = elapsed * frequency / sample_rate` (unwrapped) and the
//! per-sample phase increment `dt = frequency / sample_rate`.

use std::f64::consts::PI;

use crate::score::Waveform;

/// Square peak level. Slightly inside ±1 to soften the edge harmonics.
const SQUARE_LEVEL: f64 = 0.95;

/// Evaluate one waveform at the given unwrapped phase.
pub fn sample(wave: Waveform, phase: f64, dt: f64) -> f64 {
    let t = phase - phase.floor();
    match wave {
        Waveform::Sine => (2.0 * PI * t).sin(),
        Waveform::Square => square(t, dt),
        Waveform::Sawtooth => sawtooth(t, dt),
        Waveform::Triangle => triangle(t),
    }
}

/// Naive rising sawtooth with a two-segment PolyBLEP correction at the wrap.
fn sawtooth(t: f64, dt: f64) -> f64 {
    let naive = 2.0 * t - 1.0;
    naive - poly_blep(t, dt)
}

/// Square built from two PolyBLEP-corrected edges, scaled to ±0.95.
fn square(t: f64, dt: f64) -> f64 {
    let mut value = if t < 0.5 { 1.0 } else { -1.0 };
    value += poly_blep(t, dt);
    value -= poly_blep((t + 0.5) % 1.0, dt);
    value * SQUARE_LEVEL
}

/// Triangle: `1 - 4·|t - floor(t + 1/2)|`. Continuous, so no BLEP needed.
fn triangle(t: f64) -> f64 {
    1.0 - 4.0 * (t - (t + 0.5).floor()).abs()
}

/// Soft saturation `x / (1 + |x|)`, used to tame summed oscillator stacks.
pub fn soft_saturate(x: f64) -> f64 {
    x / (1.0 + x.abs())
}

/// PolyBLEP (Polynomial Band-Limited Step) correction.
///
/// `t` is the wrapped phase [0, 1), `dt` the phase increment per sample.
/// Nonzero only in the one-sample neighbourhood of the discontinuity.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
