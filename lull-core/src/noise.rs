//! Noise colors rendered into loopable sample buffers.
//!
//! Every channel is an independent run of the algorithm (uncorrelated stereo,
//! no mono collapse). Filter state is not carried across the loop point; these
//! buffers are spectrally dense enough that the seam is not faded unless the
//! caller asks for it.

use core::fmt;
use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::envelopes::{apply_loop_crossfade, LOOP_FADE_FRACTION};
use crate::filters::{LeakyIntegrator, PinkFilter};

/// Noise color by spectral slope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    /// Flat spectrum.
    #[default]
    White,
    /// ≈ -3 dB/oct.
    Pink,
    /// ≈ -6 dB/oct.
    Brown,
    /// Pink with the extremes rolled off (mid emphasis).
    Green,
}

impl NoiseColor {
    pub const ALL: [NoiseColor; 4] = [Self::White, Self::Pink, Self::Brown, Self::Green];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Pink => "pink",
            Self::Brown => "brown",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for NoiseColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoiseColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(Self::White),
            "pink" => Ok(Self::Pink),
            "brown" | "brownian" | "red" => Ok(Self::Brown),
            "green" => Ok(Self::Green),
            other => Err(format!("unknown noise color: {other}")),
        }
    }
}

/// One uniform sample in [-1, 1).
#[inline]
pub fn white_sample<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(-1.0_f32..1.0)
}

/// Fill `out` with white noise.
pub fn fill_white<R: Rng + ?Sized>(out: &mut [f32], rng: &mut R) {
    for s in out.iter_mut() {
        *s = white_sample(rng);
    }
}

/// Fill `out` with Kellet-filtered pink noise.
pub fn fill_pink<R: Rng + ?Sized>(out: &mut [f32], rng: &mut R) {
    let mut pink = PinkFilter::new();
    for s in out.iter_mut() {
        *s = pink.process(white_sample(rng));
    }
}

/// Fill `out` with integrated (Brownian) noise.
pub fn fill_brown<R: Rng + ?Sized>(out: &mut [f32], rng: &mut R) {
    let mut integrator = LeakyIntegrator::brown();
    for s in out.iter_mut() {
        *s = integrator.process(white_sample(rng));
    }
}

/// Fill `out` with green noise: pink smoothed by a centered 3-tap moving average.
/// The ends reuse the edge sample as the missing neighbour.
pub fn fill_green<R: Rng + ?Sized>(out: &mut [f32], rng: &mut R) {
    fill_pink(out, rng);
    let n = out.len();
    if n < 2 {
        return;
    }
    let mut prev = out[0];
    for i in 0..n {
        let cur = out[i];
        let next = if i + 1 < n { out[i + 1] } else { cur };
        out[i] = (prev + cur + next) / 3.0;
        prev = cur;
    }
}

/// Fill one channel with the requested color.
pub fn fill_color<R: Rng + ?Sized>(color: NoiseColor, out: &mut [f32], rng: &mut R) {
    match color {
        NoiseColor::White => fill_white(out, rng),
        NoiseColor::Pink => fill_pink(out, rng),
        NoiseColor::Brown => fill_brown(out, rng),
        NoiseColor::Green => fill_green(out, rng),
    }
}

/// Synthesize `frames` frames of `color` noise on `channels` independent channels.
pub fn synthesize<R: Rng + ?Sized>(
    color: NoiseColor,
    frames: usize,
    channels: usize,
    sample_rate: u32,
    rng: &mut R,
) -> SampleBuffer {
    let data = (0..channels)
        .map(|_| {
            let mut ch = vec![0.0; frames];
            fill_color(color, &mut ch, rng);
            ch
        })
        .collect();
    SampleBuffer::from_channels(sample_rate, data)
}

/// Same as [`synthesize`], then fades the loop seam like the textures do.
pub fn synthesize_crossfaded<R: Rng + ?Sized>(
    color: NoiseColor,
    frames: usize,
    channels: usize,
    sample_rate: u32,
    rng: &mut R,
) -> SampleBuffer {
    let data = (0..channels)
        .map(|_| {
            let mut ch = vec![0.0; frames];
            fill_color(color, &mut ch, rng);
            apply_loop_crossfade(&mut ch, LOOP_FADE_FRACTION);
            ch
        })
        .collect();
    SampleBuffer::from_channels(sample_rate, data)
}

// ------------------------------------ Tests --------------------------------------
