//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - Optional `fast-math` approximations for hot paths (the oscillator sine)
//! - Clean, side-effect free helpers that are easy to test
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

/// Wrap phase into [0, 1).
#[inline]
pub fn wrap_phase01(p: f32) -> f32 {
    let w = p - p.floor();
    if w >= 1.0 { 0.0 } else { w }
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x.abs() < EPS_SMALL { 0.0 } else { x }
}

/// Number of whole frames covering `seconds` at `sr` (at least one).
#[inline]
pub fn seconds_to_frames(seconds: f32, sr: u32) -> usize {
    ((seconds.max(0.0) * sr as f32).round() as usize).max(1)
}

// --------------------------------- Fast trig -------------------------------------

/// Fast sine with range reduction into [-π, π] and 5th-order minimax-style poly.
/// Max abs error ~1e-3 for musical uses when `fast-math` is enabled; falls back to exact otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let mut xr = x;
            let k = (xr / TAU).round();
            xr -= k * TAU;

            // 5th-order odd polynomial: sin(x) ≈ x * (a + b x^2 + c x^4)
            let x2 = xr * xr;
            xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98))
        } else {
            x.sin()
        }
    }
}

/// Sine of a normalized phase in [0, 1).
#[inline]
pub fn sin01(phase01: f32) -> f32 {
    fast_sin(TAU * phase01)
}

// --------------------------------- Smoothing -------------------------------------

/// One-pole smoothing coefficient for a time constant `t_ms` (milliseconds).
///
/// The discrete one-pole form: `y[n] += (1 - a) * (x[n] - y[n])`
/// where `a = exp(-1/(tau * sr))` for first-order lag with time constant `tau`.
///
/// We interpret `t_ms` as the time to reach ~63% (1 - 1/e). Common for parameter smoothing.
/// A zero time constant returns `0.0`, i.e. the smoother jumps straight to its target.
#[inline]
pub fn one_pole_coeff_ms(t_ms: f32, sr: f32) -> f32 {
    if t_ms <= 0.0 { return 0.0; }
    let tau = t_ms * 0.001;
    (-1.0 / (tau * sr.max(1.0))).exp()
}

// --------------------------------- Tests (std only) ------------------------------
