//! Envelopes and parameter slewing primitives.
//!
//! - `SlewLimiter`          : one-pole slew/smoother for gain and other control values
//! - `apply_loop_crossfade` : linear fade-in/fade-out over the head and tail of a loop
//! - `burst_decay`          : exponential decay used by short percussive bursts

use crate::dsp::one_pole_coeff_ms;

// -------------------------------- Slew Limiter -----------------------------------

/// One-pole slew/smoother: `y += (x - y) * (1 - a)`
///
/// Use `alpha = one_pole_coeff_ms(t_ms, sr)`.
#[derive(Copy, Clone, Debug)]
pub struct SlewLimiter {
    alpha: f32,
    y:     f32,
}

impl SlewLimiter {
    #[inline]
    pub fn new(t_ms: f32, sr: f32) -> Self {
        Self { alpha: one_pole_coeff_ms(t_ms, sr), y: 0.0 }
    }

    #[inline]
    pub fn reset(&mut self, y0: f32) { self.y = y0; }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += (x - self.y) * (1.0 - self.alpha);
        self.y
    }

    #[inline]
    pub fn value(&self) -> f32 { self.y }
}

// -------------------------------- Loop crossfade ---------------------------------

/// Default share of a loop spent fading at each end.
pub const LOOP_FADE_FRACTION: f32 = 0.05;

/// Fade the first and last `fraction` of `samples` towards zero.
///
/// Gain at head index `i` (and tail index `len - 1 - i`) is `i / fade_len`, so the
/// first and last samples are exactly zero and the ramp is monotonic on both sides.
pub fn apply_loop_crossfade(samples: &mut [f32], fraction: f32) {
    let len = samples.len();
    let fade = ((len as f32 * fraction.clamp(0.0, 0.5)) as usize).min(len / 2);
    if fade == 0 {
        return;
    }
    let inv = 1.0 / fade as f32;
    for i in 0..fade {
        let g = i as f32 * inv;
        samples[i] *= g;
        samples[len - 1 - i] *= g;
    }
}

/// Exponential burst decay `exp(-j / tau)` at offset `j` (samples).
#[inline]
pub fn burst_decay(j: usize, tau: f32) -> f32 {
    (-(j as f32) / tau).exp()
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slew_moves_towards_target() {
        let sr = 48000.0;
        let mut s = SlewLimiter::new(50.0, sr);
        for _ in 0..(sr as usize) { s.process(1.0); }
        assert!(s.value() > 0.9);
    }

    #[test]
    fn zero_time_slew_jumps() {
        let mut s = SlewLimiter::new(0.0, 48_000.0);
        assert_eq!(s.process(0.7), 0.7);
    }

    #[test]
    fn crossfade_ramps_monotonically_at_both_ends() {
        let mut buf = vec![1.0_f32; 1000];
        apply_loop_crossfade(&mut buf, LOOP_FADE_FRACTION);
        assert_eq!(buf[0], 0.0);
        assert_eq!(buf[999], 0.0);
        for i in 1..50 {
            assert!(buf[i] > buf[i - 1], "head not rising at {i}");
            assert!(buf[999 - i] > buf[1000 - i], "tail not falling at {i}");
        }
        assert!(buf[50..950].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn crossfade_on_tiny_buffer_is_noop() {
        let mut buf = vec![1.0_f32; 3];
        apply_loop_crossfade(&mut buf, LOOP_FADE_FRACTION);
        assert_eq!(buf, vec![1.0; 3]);
    }

    #[test]
    fn burst_decay_starts_at_unity() {
        assert_eq!(burst_decay(0, 10.0), 1.0);
        assert!(burst_decay(10, 10.0) < 0.37);
    }
}
