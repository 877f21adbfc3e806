//! Lull Core — DSP primitives and the buffer synthesizers behind the focus-sound engine.
//!
//! Features
//! - `fast-math`: enable a polynomial sine for the oscillator hot path
//!
//! Modules
//! - [`dsp`]       : math helpers (phase wrap, fast sine, smoothing coeffs, frame counts)
//! - [`envelopes`] : slew limiter, loop-seam crossfade, burst decay
//! - [`filters`]   : one-pole LP, pre-emphasis HP, leaky integrator, Kellet pink filter
//! - [`buffer`]    : immutable planar `SampleBuffer`
//! - [`rng`]       : seedable PCG32 streams, one per buffer key
//! - [`noise`]     : white / pink / brown / green noise buffers
//! - [`texture`]   : wind / rain / ocean texture buffers
//!
//! Design
//! - Synthesizers are pure functions of (kind, length, channels, sample rate, RNG);
//!   randomness is always injected so tests can seed it
//! - Sample-by-sample primitives carry no heap state

pub mod buffer;
pub mod dsp;
pub mod envelopes;
pub mod filters;
pub mod noise;
pub mod rng;
pub mod texture;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::buffer::SampleBuffer;
    pub use crate::dsp::{fast_sin, kill_denormals, one_pole_coeff_ms, seconds_to_frames, wrap_phase01, TAU};
    pub use crate::envelopes::{apply_loop_crossfade, SlewLimiter, LOOP_FADE_FRACTION};
    pub use crate::filters::{LeakyIntegrator, OnePoleLP, PinkFilter, PreEmphasis};
    pub use crate::noise::NoiseColor;
    pub use crate::texture::TextureKind;
}
