//! Filters: the small recursive shapers behind the noise colors and textures.
//!
//! Goals
//! - Allocation free, one sample in, one sample out
//! - Fixed coefficients: every shaper here is tuned for a specific color or texture
//!
//! Contents
//! - `OnePoleLP`       : `y += a * (x - y)` with a fixed coefficient (wind body)
//! - `PreEmphasis`     : first-difference high-pass `y = x - k x[n-1]` (rain hiss)
//! - `LeakyIntegrator` : `y = (y + k x) / (1 + k)` Brownian integrator with makeup gain
//! - `PinkFilter`      : Paul Kellet's 7-state pink approximation (-3 dB/oct)

use crate::dsp::kill_denormals;

/// One-pole low-pass `y += a * (x - y)`.
///
/// With `a = 0.3` this is `y = 0.3 x + 0.7 y[n-1]`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleLP {
    a: f32,
    y: f32,
}

impl OnePoleLP {
    #[inline]
    pub fn new(a: f32) -> Self {
        Self { a: a.clamp(0.0, 1.0), y: 0.0 }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += self.a * (x - self.y);
        kill_denormals(self.y)
    }

    #[inline] pub fn value(&self) -> f32 { self.y }
}

/// First-difference high-pass: `y[n] = x[n] - k * x[n-1]`.
#[derive(Copy, Clone, Debug)]
pub struct PreEmphasis {
    k: f32,
    x1: f32,
}

impl PreEmphasis {
    #[inline]
    pub fn new(k: f32) -> Self {
        Self { k, x1: 0.0 }
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.k * self.x1;
        self.x1 = x;
        y
    }
}

/// Leaky integrator producing a -6 dB/oct (Brownian) slope.
///
/// `state = (state + k * x) / (1 + k)`, output `state * makeup`.
/// The state is a convex combination of its previous value and the input, so for
/// inputs in [-1, 1] it never leaves [-1, 1].
#[derive(Copy, Clone, Debug)]
pub struct LeakyIntegrator {
    k: f32,
    makeup: f32,
    state: f32,
}

impl LeakyIntegrator {
    /// Integrator tuned for brown noise from uniform white input.
    pub const BROWN_STEP: f32 = 0.02;
    pub const BROWN_MAKEUP: f32 = 3.5;

    #[inline]
    pub fn new(k: f32, makeup: f32) -> Self {
        Self { k, makeup, state: 0.0 }
    }

    #[inline]
    pub fn brown() -> Self {
        Self::new(Self::BROWN_STEP, Self::BROWN_MAKEUP)
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.state = kill_denormals((self.state + self.k * x) / (1.0 + self.k));
        self.state * self.makeup
    }
}

/// Paul Kellet's refined pink noise filter.
///
/// Six leaky accumulators with fixed decay/gain pairs plus a one-sample
/// delayed white term (`b6`) and a direct white term. The sum approximates a
/// -3 dB/oct slope above ~10 Hz; `ATTENUATION` brings it back near unity.
#[derive(Copy, Clone, Debug, Default)]
pub struct PinkFilter {
    b: [f32; 7],
}

impl PinkFilter {
    /// (decay, gain) for b0..b5.
    const POLES: [(f32, f32); 6] = [
        (0.998_86, 0.055_517_9),
        (0.993_32, 0.075_075_9),
        (0.969_00, 0.153_852_0),
        (0.866_50, 0.310_485_6),
        (0.550_00, 0.532_952_2),
        (-0.761_6, -0.016_898_0),
    ];
    const DIRECT: f32 = 0.536_2;
    const DELAYED: f32 = 0.115_926;
    pub const ATTENUATION: f32 = 0.11;

    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn process(&mut self, white: f32) -> f32 {
        let mut sum = 0.0;
        for (b, (decay, gain)) in self.b.iter_mut().zip(Self::POLES) {
            *b = kill_denormals(decay * *b + white * gain);
            sum += *b;
        }
        let out = (sum + self.b[6] + white * Self::DIRECT) * Self::ATTENUATION;
        self.b[6] = white * Self::DELAYED;
        out
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_pole_lp_moves_towards_input() {
        let mut lp = OnePoleLP::new(0.3);
        let first = lp.process(1.0);
        assert!((first - 0.3).abs() < 1e-6);
        for _ in 0..200 {
            lp.process(1.0);
        }
        assert!(lp.value() > 0.99, "y={}", lp.value());
    }

    #[test]
    fn pre_emphasis_blocks_dc() {
        let mut hp = PreEmphasis::new(0.95);
        let mut y = 0.0;
        for _ in 0..100 {
            y = hp.process(1.0);
        }
        assert!((y - 0.05).abs() < 1e-6, "y={y}");
    }

    #[test]
    fn leaky_integrator_state_is_bounded() {
        let mut li = LeakyIntegrator::new(0.02, 1.0);
        let mut y = 0.0;
        for _ in 0..10_000 {
            y = li.process(1.0);
        }
        assert!(y <= 1.0 && y > 0.99, "y={y}");
    }

    #[test]
    fn pink_filter_settles_on_dc() {
        // b5's negative pole alternates; everything else settles.
        let mut pink = PinkFilter::new();
        for _ in 0..50_000 {
            pink.process(0.0);
        }
        assert!(pink.process(0.0).abs() < 1e-6);
    }
}
