//! Engine configuration.

use serde::Deserialize;

/// Tunables for one engine instance. Every field has a default, so a TOML file
/// only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Preferred device sample rate; `None` takes the device default.
    pub sample_rate: Option<u32>,
    /// Output device name; `None` takes the host default.
    pub device: Option<String>,
    /// Loop length of noise-color buffers, seconds.
    pub noise_seconds: f32,
    /// Loop length of texture buffers, seconds.
    pub texture_seconds: f32,
    /// Base seed for reproducible buffers; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Capacity of the control → render transaction queue.
    pub command_capacity: usize,
    /// Gain smoothing time constant, milliseconds.
    pub gain_smoothing_ms: f32,
    /// Fade the loop seam of noise-color buffers too (textures always fade).
    pub noise_crossfade: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            device: None,
            noise_seconds: 2.0,
            texture_seconds: 4.0,
            seed: None,
            command_capacity: 64,
            gain_smoothing_ms: 20.0,
            noise_crossfade: false,
        }
    }
}

impl EngineConfig {
    /// Config with a fixed seed, handy for tests and offline renders.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed), ..Self::default() }
    }
}
