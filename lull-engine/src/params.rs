//! Modes, parameter sets and partial updates.
//!
//! Ranges: carrier 200–600 Hz, beat 4–20 Hz, every volume 0–1. Finite values
//! outside a range are clamped (with a warning); NaN/∞ are rejected.

use serde::{Deserialize, Serialize};
use tracing::warn;

use lull_core::noise::NoiseColor;
use lull_core::texture::TextureKind;

use crate::error::{EngineError, EngineResult};

pub const CARRIER_RANGE: (f32, f32) = (200.0, 600.0);
pub const BEAT_RANGE: (f32, f32) = (4.0, 20.0);
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// Which sub-graph is live.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Idle,
    Binaural,
    Noise,
}

/// Reject non-finite values, clamp the rest into `range`.
pub(crate) fn sanitize(name: &'static str, value: f32, range: (f32, f32)) -> EngineResult<f32> {
    if !value.is_finite() {
        return Err(EngineError::InvalidParameter { name, value });
    }
    let clamped = value.clamp(range.0, range.1);
    if clamped != value {
        warn!(parameter = name, value, clamped, "parameter out of range, clamping");
    }
    Ok(clamped)
}

fn sanitize_opt(name: &'static str, value: Option<f32>, range: (f32, f32)) -> EngineResult<Option<f32>> {
    value.map(|v| sanitize(name, v, range)).transpose()
}

// --------------------------------- Binaural ---------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinauralParams {
    /// Left-ear tone, Hz.
    pub carrier: f32,
    /// Right ear plays `carrier + beat`, Hz.
    pub beat: f32,
    pub volume: f32,
}

impl Default for BinauralParams {
    fn default() -> Self {
        Self { carrier: 250.0, beat: 10.0, volume: 0.5 }
    }
}

impl BinauralParams {
    pub fn new(carrier: f32, beat: f32, volume: f32) -> Self {
        Self { carrier, beat, volume }
    }

    pub(crate) fn sanitized(self) -> EngineResult<Self> {
        Ok(Self {
            carrier: sanitize("carrier", self.carrier, CARRIER_RANGE)?,
            beat: sanitize("beat", self.beat, BEAT_RANGE)?,
            volume: sanitize("volume", self.volume, VOLUME_RANGE)?,
        })
    }

    /// Apply a partial update, returning the merged set.
    pub fn merged(self, update: &BinauralUpdate) -> Self {
        Self {
            carrier: update.carrier.unwrap_or(self.carrier),
            beat: update.beat.unwrap_or(self.beat),
            volume: update.volume.unwrap_or(self.volume),
        }
    }
}

/// Partial binaural update; `None` fields are left as they are.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BinauralUpdate {
    pub carrier: Option<f32>,
    pub beat: Option<f32>,
    pub volume: Option<f32>,
}

impl BinauralUpdate {
    pub fn carrier(hz: f32) -> Self { Self { carrier: Some(hz), ..Self::default() } }
    pub fn beat(hz: f32) -> Self { Self { beat: Some(hz), ..Self::default() } }
    pub fn volume(v: f32) -> Self { Self { volume: Some(v), ..Self::default() } }

    pub(crate) fn sanitized(self) -> EngineResult<Self> {
        Ok(Self {
            carrier: sanitize_opt("carrier", self.carrier, CARRIER_RANGE)?,
            beat: sanitize_opt("beat", self.beat, BEAT_RANGE)?,
            volume: sanitize_opt("volume", self.volume, VOLUME_RANGE)?,
        })
    }
}

// ----------------------------------- Noise ----------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    pub color: NoiseColor,
    pub volume: f32,
    /// `None` plays the noise bed alone.
    pub texture: Option<TextureKind>,
    pub texture_volume: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self { color: NoiseColor::White, volume: 0.5, texture: None, texture_volume: 0.3 }
    }
}

impl NoiseParams {
    pub fn new(color: NoiseColor, volume: f32) -> Self {
        Self { color, volume, ..Self::default() }
    }

    pub fn with_texture(mut self, kind: TextureKind, volume: f32) -> Self {
        self.texture = Some(kind);
        self.texture_volume = volume;
        self
    }

    pub(crate) fn sanitized(self) -> EngineResult<Self> {
        Ok(Self {
            volume: sanitize("volume", self.volume, VOLUME_RANGE)?,
            texture_volume: sanitize("texture_volume", self.texture_volume, VOLUME_RANGE)?,
            ..self
        })
    }

    pub fn merged(self, update: &NoiseUpdate) -> Self {
        Self {
            color: update.color.unwrap_or(self.color),
            volume: update.volume.unwrap_or(self.volume),
            texture: update.texture.unwrap_or(self.texture),
            texture_volume: update.texture_volume.unwrap_or(self.texture_volume),
        }
    }
}

/// Partial noise update. `texture: Some(None)` switches the texture layer off.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseUpdate {
    pub color: Option<NoiseColor>,
    pub volume: Option<f32>,
    pub texture: Option<Option<TextureKind>>,
    pub texture_volume: Option<f32>,
}

impl NoiseUpdate {
    pub fn color(color: NoiseColor) -> Self { Self { color: Some(color), ..Self::default() } }
    pub fn volume(v: f32) -> Self { Self { volume: Some(v), ..Self::default() } }
    pub fn texture(kind: Option<TextureKind>) -> Self { Self { texture: Some(kind), ..Self::default() } }
    pub fn texture_volume(v: f32) -> Self { Self { texture_volume: Some(v), ..Self::default() } }

    pub(crate) fn sanitized(self) -> EngineResult<Self> {
        Ok(Self {
            volume: sanitize_opt("volume", self.volume, VOLUME_RANGE)?,
            texture_volume: sanitize_opt("texture_volume", self.texture_volume, VOLUME_RANGE)?,
            ..self
        })
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn out_of_range_values_are_clamped() {
        let p = BinauralParams::new(900.0, 1.0, 1.5).sanitized().unwrap();
        assert_eq!(p, BinauralParams::new(600.0, 4.0, 1.0));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = BinauralParams::new(f32::NAN, 10.0, 0.5).sanitized().unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "carrier", .. }));
        assert!(NoiseUpdate::volume(f32::INFINITY).sanitized().is_err());
    }

    #[test]
    fn merged_keeps_untouched_fields() {
        let p = BinauralParams::new(400.0, 10.0, 0.5).merged(&BinauralUpdate::beat(16.0));
        assert_eq!(p, BinauralParams::new(400.0, 16.0, 0.5));

        let n = NoiseParams::new(NoiseColor::White, 0.4)
            .with_texture(TextureKind::Rain, 0.2)
            .merged(&NoiseUpdate::texture(None));
        assert_eq!(n.texture, None);
        assert_eq!(n.texture_volume, 0.2);
    }

    #[test]
    fn params_deserialize_from_toml() {
        let n: NoiseParams = toml::from_str(
            "color = \"pink\"\nvolume = 0.4\ntexture = \"ocean\"\ntexture_volume = 0.2\n",
        )
        .unwrap();
        assert_eq!(n, NoiseParams::new(NoiseColor::Pink, 0.4).with_texture(TextureKind::Ocean, 0.2));
    }
}
