//! Procedural "natural sound" textures: wind, rain and ocean.
//!
//! Unlike the noise colors, every texture carries slow modulation that is not
//! phase-continuous at the loop point, so each channel is always finished with
//! a loop crossfade over its first and last 5%.

use core::fmt;
use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::dsp::{sin01, TAU};
use crate::envelopes::{apply_loop_crossfade, burst_decay, LOOP_FADE_FRACTION};
use crate::filters::{OnePoleLP, PreEmphasis};
use crate::noise::{fill_brown, white_sample};

/// Texture kind layered under the noise bed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureKind {
    Wind,
    Rain,
    Ocean,
}

impl TextureKind {
    pub const ALL: [TextureKind; 3] = [Self::Wind, Self::Rain, Self::Ocean];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wind => "wind",
            Self::Rain => "rain",
            Self::Ocean => "ocean",
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wind" => Ok(Self::Wind),
            "rain" => Ok(Self::Rain),
            "ocean" | "waves" => Ok(Self::Ocean),
            other => Err(format!("unknown texture: {other}")),
        }
    }
}

// ----------------------------------- Wind ----------------------------------------

const WIND_SMOOTHING: f32 = 0.3;
const WIND_GUST_HZ: f32 = 0.15;
const WIND_GUST_FLOOR: f32 = 0.3;
const WIND_BOOST: f32 = 1.5;

/// Low-passed white noise under a slow gust envelope in [0.3, 1.0].
pub fn fill_wind<R: Rng + ?Sized>(out: &mut [f32], sample_rate: u32, rng: &mut R) {
    let sr = sample_rate.max(1) as f32;
    let mut lp = OnePoleLP::new(WIND_SMOOTHING);
    let mid = 0.5 * (1.0 + WIND_GUST_FLOOR);
    let depth = 0.5 * (1.0 - WIND_GUST_FLOOR);
    for (i, s) in out.iter_mut().enumerate() {
        let t = i as f32 / sr;
        let gust = mid + depth * (TAU * WIND_GUST_HZ * t).sin();
        *s = lp.process(white_sample(rng)) * gust * WIND_BOOST;
    }
}

// ----------------------------------- Rain ----------------------------------------

const RAIN_EMPHASIS: f32 = 0.95;
const RAIN_HISS_GAIN: f32 = 0.25;
const DROP_PROBABILITY: f64 = 0.04;
const DROP_MIN_LEN: usize = 20;
const DROP_MAX_LEN: usize = 70;
const DROP_DECAY: f32 = 10.0;
const DROP_GAIN: f32 = 0.5;

/// High-passed hiss plus sparse droplet bursts with exponential decay.
pub fn fill_rain<R: Rng + ?Sized>(out: &mut [f32], rng: &mut R) {
    let mut hp = PreEmphasis::new(RAIN_EMPHASIS);
    for s in out.iter_mut() {
        *s = hp.process(white_sample(rng)) * RAIN_HISS_GAIN;
    }

    let n = out.len();
    for i in 0..n {
        if !rng.gen_bool(DROP_PROBABILITY) {
            continue;
        }
        let len = rng.gen_range(DROP_MIN_LEN..DROP_MAX_LEN);
        for j in 0..len.min(n - i) {
            out[i + j] += white_sample(rng) * burst_decay(j, DROP_DECAY) * DROP_GAIN;
        }
    }
}

// ----------------------------------- Ocean ---------------------------------------

/// (cycles per loop, depth, phase in turns) for swell, main wave and ripples.
/// Whole cycles per loop keep the modulation phase-continuous at the seam.
const OCEAN_PARTIALS: [(f32, f32, f32); 3] = [
    (1.0, 0.25, 0.0),
    (3.0, 0.20, 0.0),
    (12.0, 0.05, 0.3),
];
const OCEAN_BIAS: f32 = 0.6;
const OCEAN_MIN: f32 = 0.4;
const OCEAN_MAX: f32 = 1.0;
const OCEAN_GAIN: f32 = 1.2;

/// Ocean swell envelope at `pos01` (position within the loop, 0..1).
#[inline]
pub fn ocean_envelope(pos01: f32) -> f32 {
    let m = OCEAN_PARTIALS
        .iter()
        .fold(OCEAN_BIAS, |acc, &(cycles, depth, phase)| {
            acc + depth * sin01((cycles * pos01 + phase).fract())
        });
    m.clamp(OCEAN_MIN, OCEAN_MAX)
}

/// Brown noise bed under the three-partial swell envelope.
pub fn fill_ocean<R: Rng + ?Sized>(out: &mut [f32], rng: &mut R) {
    fill_brown(out, rng);
    let n = out.len().max(1) as f32;
    for (i, s) in out.iter_mut().enumerate() {
        *s *= ocean_envelope(i as f32 / n) * OCEAN_GAIN;
    }
}

// ------------------------------------ API ----------------------------------------

/// Fill one channel with `kind`, including the loop crossfade.
pub fn fill_texture<R: Rng + ?Sized>(kind: TextureKind, out: &mut [f32], sample_rate: u32, rng: &mut R) {
    match kind {
        TextureKind::Wind => fill_wind(out, sample_rate, rng),
        TextureKind::Rain => fill_rain(out, rng),
        TextureKind::Ocean => fill_ocean(out, rng),
    }
    apply_loop_crossfade(out, LOOP_FADE_FRACTION);
}

/// Synthesize `frames` frames of `kind` on `channels` independent channels.
pub fn synthesize<R: Rng + ?Sized>(
    kind: TextureKind,
    frames: usize,
    channels: usize,
    sample_rate: u32,
    rng: &mut R,
) -> SampleBuffer {
    let data = (0..channels)
        .map(|_| {
            let mut ch = vec![0.0; frames];
            fill_texture(kind, &mut ch, sample_rate, rng);
            ch
        })
        .collect();
    SampleBuffer::from_channels(sample_rate, data)
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    const SR: u32 = 16_000;
    const N: usize = 64_000;

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|s| s * s).sum::<f32>() / x.len().max(1) as f32).sqrt()
    }

    fn fill_raw(kind: TextureKind, out: &mut [f32], rng: &mut impl Rng) {
        match kind {
            TextureKind::Wind => fill_wind(out, SR, rng),
            TextureKind::Rain => fill_rain(out, rng),
            TextureKind::Ocean => fill_ocean(out, rng),
        }
    }

    #[test]
    fn every_texture_fades_to_zero_at_both_ends() {
        let fade = (N as f32 * LOOP_FADE_FRACTION) as usize;
        for kind in TextureKind::ALL {
            let buf = synthesize(kind, N, 2, SR, &mut create_rng(21));
            assert_eq!(buf.frames(), N);

            let mut raw = vec![0.0; N];
            fill_raw(kind, &mut raw, &mut create_rng(21));
            let ch = buf.channel(0).unwrap();

            assert_eq!(ch[0], 0.0, "{kind} head");
            assert_eq!(ch[N - 1], 0.0, "{kind} tail");
            let mut last_gain = -1.0;
            for i in 0..fade {
                let g = i as f32 / fade as f32;
                assert!(g > last_gain);
                last_gain = g;
                assert!((ch[i] - raw[i] * g).abs() < 1e-6, "{kind} head sample {i}");
                assert!((ch[N - 1 - i] - raw[N - 1 - i] * g).abs() < 1e-6, "{kind} tail sample {i}");
            }
            assert_eq!(&ch[fade..N - fade], &raw[fade..N - fade]);

            for ch in buf.channels() {
                let head = rms(&ch[..fade / 4]);
                let body = rms(&ch[N / 2 - fade / 2..N / 2 + fade / 2]);
                assert!(head < body, "{kind}: head={head} body={body}");
            }
        }
    }

    #[test]
    fn ocean_envelope_stays_clamped_and_loops() {
        for i in 0..1000 {
            let e = ocean_envelope(i as f32 / 1000.0);
            assert!((OCEAN_MIN..=OCEAN_MAX).contains(&e), "e={e}");
        }
        assert!((ocean_envelope(0.0) - ocean_envelope(0.999_999)).abs() < 1e-3);
    }

    #[test]
    fn rain_has_droplets_above_the_hiss() {
        let mut rng = create_rng(3);
        let mut drops = vec![0.0; N];
        fill_rain(&mut drops, &mut rng);

        let mut rng = create_rng(3);
        let mut hp = PreEmphasis::new(RAIN_EMPHASIS);
        let hiss: Vec<f32> = (0..N).map(|_| hp.process(white_sample(&mut rng)) * RAIN_HISS_GAIN).collect();

        assert!(rms(&drops) > rms(&hiss));
    }

    #[test]
    fn wind_is_smoother_than_its_source() {
        let mut rng = create_rng(9);
        let mut wind = vec![0.0; N];
        fill_wind(&mut wind, SR, &mut rng);
        let diff: Vec<f32> = wind.windows(2).map(|w| w[1] - w[0]).collect();
        // Flat noise has diff rms ≈ 1.41 × its rms; the low-pass pulls that well below.
        assert!(rms(&diff) < rms(&wind));
    }

    #[test]
    fn parses_texture_names() {
        assert_eq!("Rain".parse::<TextureKind>(), Ok(TextureKind::Rain));
        assert!("thunder".parse::<TextureKind>().is_err());
    }
}
