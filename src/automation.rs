//! Automation curves — piecewise-linear effect intensity over playback time.

use serde::{Deserialize, Serialize};

/// A single automation keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Playback time in seconds.
    pub time: f64,
    /// Effect amount [0, 1] at that time.
    pub value: f64,
}

/// A piecewise-linear curve over playback time.
///
/// Keyframes must be supplied in non-decreasing time order; the curve does
/// not sort or validate them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub keyframes: Vec<Keyframe>,
}

impl Curve {
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        Curve { keyframes }
    }

    /// Evaluate the curve at time `t` (seconds).
    ///
    /// Empty curves evaluate to 0. Outside the keyframe range the first or
    /// last value is held; inside, the bracketing pair is linearly
    /// interpolated.
    pub fn value_at(&self, t: f64) -> f64 {
        let keys = &self.keyframes;
        let Some(first) = keys.first() else {
            return 0.0;
        };
        if t <= first.time {
            return first.value;
        }
        let last = keys[keys.len() - 1];
        if t >= last.time {
            return last.value;
        }
        for pair in keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time {
                let span = b.time - a.time;
                if span <= 0.0 {
                    return b.value;
                }
                let frac = (t - a.time) / span;
                return a.value + (b.value - a.value) * frac;
            }
        }
        last.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(points: &[(f64, f64)]) -> Curve {
        Curve::new(
            points
                .iter()
                .map(|&(time, value)| Keyframe { time, value })
                .collect(),
        )
    }

    #[test]
    fn empty_curve_is_zero() {
        let c = Curve::default();
        assert_eq!(c.value_at(0.0), 0.0);
        assert_eq!(c.value_at(100.0), 0.0);
    }

    #[test]
    fn clamps_before_first_keyframe() {
        let c = curve(&[(1.0, 0.3), (2.0, 0.8)]);
        assert_eq!(c.value_at(0.0), 0.3);
        assert_eq!(c.value_at(-5.0), 0.3);
    }

    #[test]
    fn clamps_after_last_keyframe() {
        let c = curve(&[(1.0, 0.3), (2.0, 0.8)]);
        assert_eq!(c.value_at(2.0), 0.8);
        assert_eq!(c.value_at(99.0), 0.8);
    }

    #[test]
    fn midpoint_interpolates() {
        let c = curve(&[(0.0, 0.0), (2.0, 1.0)]);
        let v = c.value_at(1.0);
        assert!((v - 0.5).abs() < 1e-12, "midpoint should be 0.5, got {v}");
    }

    #[test]
    fn interpolates_between_inner_pair() {
        let c = curve(&[(0.0, 0.0), (1.0, 1.0), (3.0, 0.0)]);
        let v = c.value_at(2.0);
        assert!((v - 0.5).abs() < 1e-12, "expected 0.5 on the down-ramp, got {v}");
    }

    #[test]
    fn coincident_keyframes_take_later_value() {
        let c = curve(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.2), (2.0, 0.2)]);
        let v = c.value_at(1.0);
        assert!(v == 1.0 || v == 0.2, "coincident keyframes should not panic");
    }

    #[test]
    fn single_keyframe_holds_everywhere() {
        let c = curve(&[(1.0, 0.6)]);
        assert_eq!(c.value_at(0.0), 0.6);
        assert_eq!(c.value_at(1.0), 0.6);
        assert_eq!(c.value_at(5.0), 0.6);
    }
}
