//! Checked division and interpolation helpers.
//!
//! Every ratio in the strategy chain and the skeletal graph goes through
//! these functions. A degenerate denominator or an out-of-range ratio
//! returns a defined fallback and logs a warning instead of propagating
//! NaN or an out-of-range position into the graph.

use tracing::warn;
use vcad_walls_math::Coord;

/// Smallest denominator magnitude treated as non-zero.
pub const MIN_DENOMINATOR: f64 = 1e-9;

/// Lower bound of a transition anchor position.
pub const MIN_ANCHOR: f64 = 0.1;

/// Upper bound of a transition anchor position.
pub const MAX_ANCHOR: f64 = 0.9;

/// `num / den`, or `fallback` when `den` is (nearly) zero.
pub fn checked_ratio(num: f64, den: f64, fallback: f64, context: &str) -> f64 {
    if den.abs() < MIN_DENOMINATOR || !num.is_finite() || !den.is_finite() {
        warn!(num, den, fallback, context, "degenerate denominator, using fallback");
        return fallback;
    }
    num / den
}

/// Clamp `value` into `[lo, hi]`, warning when it was off by more than `0.01`.
pub fn clamp_logged(value: f64, lo: f64, hi: f64, context: &str) -> f64 {
    let clamped = if value.is_nan() { lo } else { value.clamp(lo, hi) };
    if (clamped - value).abs() > 0.01 || value.is_nan() {
        warn!(value, clamped, context, "value outside valid range, clamped");
    }
    clamped
}

/// Relative position of a transition anchor between two optimal thicknesses.
///
/// Computes `1 - (transition - lower) / (upper - lower)` and clamps it to
/// `[0.1, 0.9]`. A non-positive denominator yields `0.5`.
pub fn transition_anchor(lower_optimum: Coord, transition: Coord, upper_optimum: Coord) -> f64 {
    let denominator = upper_optimum - lower_optimum;
    if denominator <= 0 {
        warn!(
            lower_optimum,
            transition, upper_optimum, "non-increasing optimal thicknesses, anchor set to 0.5"
        );
        return 0.5;
    }
    let raw = 1.0 - (transition - lower_optimum) as f64 / denominator as f64;
    clamp_logged(raw, MIN_ANCHOR, MAX_ANCHOR, "transition anchor")
}

/// Fraction `pos / len` clamped to `[0, 1]`; zero for an empty interval.
pub fn unit_ratio(pos: Coord, len: Coord, context: &str) -> f64 {
    if len == 0 {
        return 0.0;
    }
    clamp_logged(pos as f64 / len as f64, 0.0, 1.0, context)
}

/// Linear interpolation between two integer values, rounded.
pub fn lerp_coord(a: Coord, b: Coord, t: f64) -> Coord {
    a + ((b - a) as f64 * t).round() as Coord
}

/// Keep an interpolated transition rest within the rests of both ends.
///
/// The rest at an intermediate node must lie between `start_rest` and
/// `end_rest`; anything outside is clamped with a warning.
pub fn clamp_rest(rest: f64, start_rest: f64, end_rest: f64) -> f64 {
    let lo = start_rest.min(end_rest);
    let hi = start_rest.max(end_rest);
    if rest.is_nan() {
        warn!(start_rest, end_rest, "transition rest is NaN, using start rest");
        return start_rest;
    }
    if rest < lo || rest > hi {
        warn!(rest, start_rest, end_rest, "transition rest out of range, clamped");
        return rest.clamp(lo, hi);
    }
    rest
}
