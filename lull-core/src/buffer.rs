//! Immutable multi-channel sample buffers produced by the synthesizers.

/// Planar, fixed-length, multi-channel `f32` audio.
///
/// Built once by a synthesizer and never mutated afterwards; players share it
/// behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    frames: usize,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Wrap already-synthesized channels. Every channel is truncated or
    /// zero-padded to the length of the first so the buffer stays rectangular.
    pub fn from_channels(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.first().map_or(0, Vec::len);
        for ch in &mut channels {
            ch.resize(frames, 0.0);
        }
        Self { sample_rate, frames, channels }
    }

    #[inline] pub fn sample_rate(&self) -> u32 { self.sample_rate }
    #[inline] pub fn frames(&self) -> usize { self.frames }
    #[inline] pub fn channel_count(&self) -> usize { self.channels.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.frames == 0 || self.channels.is_empty() }

    /// Samples of channel `index`, if present.
    #[inline]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Sample at `frame` for `channel`; mono buffers answer for every channel.
    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        let ch = channel.min(self.channels.len().saturating_sub(1));
        self.channels
            .get(ch)
            .and_then(|c| c.get(frame))
            .copied()
            .unwrap_or(0.0)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.frames as f32 / self.sample_rate.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_made_rectangular() {
        let buf = SampleBuffer::from_channels(8_000, vec![vec![0.5; 4], vec![0.25; 2]]);
        assert_eq!(buf.frames(), 4);
        assert_eq!(buf.channel(1), Some(&[0.25, 0.25, 0.0, 0.0][..]));
    }

    #[test]
    fn mono_answers_for_all_channels() {
        let buf = SampleBuffer::from_channels(8_000, vec![vec![0.1, 0.2]]);
        assert_eq!(buf.sample(1, 1), 0.2);
        assert_eq!(buf.sample(0, 7), 0.0);
        assert!((buf.duration_secs() - 0.00025).abs() < 1e-9);
    }
}
