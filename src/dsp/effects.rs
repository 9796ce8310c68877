//! Per-voice effect chain — bit-crusher, distortion, and the dispatch that
//! routes a voice's sample through its declared chain.
//!
//! Delay and reverb live on shared engine-wide buffers (`delay`, `reverb`
//! modules); the bit-crusher's hold state is owned by each voice.

use serde::{Deserialize, Serialize};

use crate::score::{Automation, EffectKind, EffectSpec};

use super::delay::DelayLine;
use super::reverb::Reverb;

/// Effect configuration supplied at load, plus the loop flag.
///
/// Missing fields deserialize to the defaults, so a partial JSON object is
/// a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// Reverb wet level applied on top of the per-note amount.
    pub reverb_mix: f64,
    /// Scales the reverb tap spacing (seconds).
    pub reverb_time: f64,
    /// Delay wet level applied on top of the per-note amount.
    pub delay_mix: f64,
    /// Delay feedback [0, 1).
    pub delay_feedback: f64,
    /// Delay time in seconds; sets the shared buffer length at load.
    pub delay_time: f64,
    /// Bit-crusher sample-and-hold length in samples.
    pub crusher_reduction: u32,
    /// Distortion input gain.
    pub distortion_drive: f64,
    /// Distortion output gain after clipping.
    pub distortion_post_gain: f64,
    /// Whether playback wraps at the end of the track.
    pub looping: bool,
}

impl Default for FxConfig {
    fn default() -> Self {
        FxConfig {
            reverb_mix: 0.35,
            reverb_time: 1.0,
            delay_mix: 0.3,
            delay_feedback: 0.35,
            delay_time: 0.25,
            crusher_reduction: 4,
            distortion_drive: 1.8,
            distortion_post_gain: 0.8,
            looping: true,
        }
    }
}

/// Sample-and-hold decimation state. One per voice.
#[derive(Debug, Clone, Copy)]
pub struct BitCrusher {
    hold_counter: u32,
    held: f64,
}

impl BitCrusher {
    pub fn new() -> Self {
        BitCrusher {
            // Forces the first processed sample to be captured.
            hold_counter: u32::MAX,
            held: 0.0,
        }
    }

    /// Quantize to `2^(16 − amount·12)` levels and hold each captured value
    /// for `reduction` samples.
    #[inline]
    pub fn process(&mut self, input: f64, amount: f64, reduction: u32) -> f64 {
        if self.hold_counter >= reduction.max(1) {
            let bits = 16.0 - amount.clamp(0.0, 1.0) * 12.0;
            let levels = 2.0_f64.powf(bits);
            self.held = (input * levels).round() / levels;
            self.hold_counter = 0;
        }
        self.hold_counter += 1;
        self.held
    }
}

impl Default for BitCrusher {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive, hard-clip at ±0.5, then make up gain.
#[inline]
pub fn distort(input: f64, drive: f64, post_gain: f64) -> f64 {
    (input * drive).clamp(-0.5, 0.5) * post_gain
}

/// Mutable engine-side context threaded through the chain.
pub struct FxContext<'a> {
    pub config: &'a FxConfig,
    pub delay: &'a mut DelayLine,
    pub reverb: &'a mut Reverb,
    /// Playback time in seconds, for automation lookup.
    pub time_secs: f64,
}

/// Run one sample through a voice's effect chain, in declaration order.
///
/// An automation curve, when present for reverb or delay, replaces that
/// effect's static amount entirely.
pub fn apply_chain(
    input: f64,
    chain: &[EffectSpec],
    automation: Option<&Automation>,
    crusher: &mut BitCrusher,
    ctx: &mut FxContext<'_>,
) -> f64 {
    let mut signal = input;
    for spec in chain {
        signal = match spec.kind {
            EffectKind::Delay => {
                let amount = automation
                    .and_then(|a| a.delay.as_ref())
                    .map(|curve| curve.value_at(ctx.time_secs))
                    .unwrap_or(spec.amount);
                let wet = ctx.config.delay_mix * amount;
                ctx.delay.process(signal, wet, ctx.config.delay_feedback)
            }
            EffectKind::Reverb => {
                let amount = automation
                    .and_then(|a| a.reverb.as_ref())
                    .map(|curve| curve.value_at(ctx.time_secs))
                    .unwrap_or(spec.amount);
                ctx.reverb.process(signal, ctx.config.reverb_mix * amount)
            }
            EffectKind::BitCrusher => {
                crusher.process(signal, spec.amount, ctx.config.crusher_reduction)
            }
            EffectKind::Distortion => {
                let driven = distort(
                    signal,
                    ctx.config.distortion_drive,
                    ctx.config.distortion_post_gain,
                );
                signal * (1.0 - spec.amount) + driven * spec.amount
            }
        };
    }
    signal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{Curve, Keyframe};

    fn ctx_parts() -> (FxConfig, DelayLine, Reverb) {
        (
            FxConfig::default(),
            DelayLine::new(0.01, 1000.0),
            Reverb::new(0.1, 1000.0),
        )
    }

    #[test]
    fn crusher_holds_between_captures() {
        let mut crusher = BitCrusher::new();
        let a = crusher.process(0.5, 0.0, 3);
        let b = crusher.process(-0.9, 0.0, 3);
        let c = crusher.process(0.1, 0.0, 3);
        assert_eq!(a, b);
        assert_eq!(b, c);
        // Fourth call captures fresh input
        let d = crusher.process(0.25, 0.0, 3);
        assert!((d - 0.25).abs() < 1e-3);
    }

    #[test]
    fn crusher_quantizes_to_levels() {
        let mut crusher = BitCrusher::new();
        // amount = 1 → 2^4 = 16 levels
        let out = crusher.process(0.12345, 1.0, 1);
        let levels = 16.0;
        let expected = (0.12345_f64 * levels).round() / levels;
        assert!((out - expected).abs() < 1e-12);
    }

    #[test]
    fn crusher_full_depth_at_amount_zero() {
        let mut crusher = BitCrusher::new();
        // amount = 0 → 16-bit quantization, essentially transparent
        let out = crusher.process(0.123456789, 0.0, 1);
        assert!((out - 0.123456789).abs() < 1e-4);
    }

    #[test]
    fn distortion_clips_at_half() {
        assert_eq!(distort(1.0, 2.0, 1.0), 0.5);
        assert_eq!(distort(-1.0, 2.0, 1.0), -0.5);
        assert!((distort(0.1, 2.0, 1.0) - 0.2).abs() < 1e-12);
        // Post gain scales the clipped signal
        assert_eq!(distort(1.0, 2.0, 0.8), 0.4);
    }

    #[test]
    fn chain_applies_in_order() {
        let (config, mut delay, mut reverb) = ctx_parts();
        let mut crusher = BitCrusher::new();
        let chain = [EffectSpec {
            kind: EffectKind::Distortion,
            amount: 1.0,
        }];
        let mut ctx = FxContext {
            config: &config,
            delay: &mut delay,
            reverb: &mut reverb,
            time_secs: 0.0,
        };
        let out = apply_chain(1.0, &chain, None, &mut crusher, &mut ctx);
        // Fully wet distortion: clip(1.0 * 1.8) * 0.8
        assert!((out - 0.4).abs() < 1e-12);
    }

    #[test]
    fn empty_chain_passes_through() {
        let (config, mut delay, mut reverb) = ctx_parts();
        let mut crusher = BitCrusher::new();
        let mut ctx = FxContext {
            config: &config,
            delay: &mut delay,
            reverb: &mut reverb,
            time_secs: 0.0,
        };
        let out = apply_chain(0.7, &[], None, &mut crusher, &mut ctx);
        assert_eq!(out, 0.7);
    }

    #[test]
    fn automation_overrides_static_delay_amount() {
        let (config, mut delay, mut reverb) = ctx_parts();
        let mut crusher = BitCrusher::new();
        let chain = [EffectSpec {
            kind: EffectKind::Delay,
            amount: 1.0,
        }];
        let automation = Automation {
            delay: Some(Curve::new(vec![Keyframe { time: 0.0, value: 0.0 }])),
            reverb: None,
        };

        // Prime the delay buffer with an impulse, then read at the echo point
        let mut ctx = FxContext {
            config: &config,
            delay: &mut delay,
            reverb: &mut reverb,
            time_secs: 0.0,
        };
        apply_chain(1.0, &chain, Some(&automation), &mut crusher, &mut ctx);
        for _ in 0..9 {
            apply_chain(0.0, &chain, Some(&automation), &mut crusher, &mut ctx);
        }
        // Curve pins the amount to 0, so the echo is fully suppressed
        let out = apply_chain(0.0, &chain, Some(&automation), &mut crusher, &mut ctx);
        assert_eq!(out, 0.0);
    }
}
