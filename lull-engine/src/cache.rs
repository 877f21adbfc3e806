//! Process-lifetime cache of synthesized loop buffers.
//!
//! Entries are created on first demand and never evicted or replaced. Each key
//! owns a `OnceLock`, so a second caller asking for a key that is still being
//! synthesized blocks on that one generation instead of starting another;
//! different keys synthesize in parallel.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

use lull_core::buffer::SampleBuffer;
use lull_core::noise::{self, NoiseColor};
use lull_core::rng::rng_for;
use lull_core::texture::{self, TextureKind};

/// Channel count of every cached buffer.
pub const CHANNELS: usize = 2;

/// What a buffer holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Noise(NoiseColor),
    Texture(TextureKind),
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Noise(c) => write!(f, "noise/{c}"),
            BufferKind::Texture(t) => write!(f, "texture/{t}"),
        }
    }
}

/// Full cache key: kind plus the rendering shape it was made for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: BufferKind,
    pub sample_rate: u32,
    pub frames: usize,
    /// Loop seam faded (always true for textures).
    pub crossfade: bool,
}

type Slot = Arc<OnceLock<Arc<SampleBuffer>>>;

/// Append-only buffer cache, shareable across engines.
pub struct BufferCache {
    seed: Option<u64>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    syntheses: AtomicUsize,
}

impl fmt::Debug for BufferCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferCache")
            .field("seed", &self.seed)
            .field("entries", &self.len())
            .field("syntheses", &self.synthesis_count())
            .finish()
    }
}

impl BufferCache {
    /// `seed = Some(..)` makes every buffer reproducible; `None` draws from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed, slots: Mutex::new(HashMap::new()), syntheses: AtomicUsize::new(0) }
    }

    /// Cached buffer for `key`, synthesizing it on first use.
    pub fn get_or_synthesize(&self, key: CacheKey) -> Arc<SampleBuffer> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key).or_default())
        };
        if let Some(buf) = slot.get() {
            debug!(kind = %key.kind, "buffer cache hit");
            return Arc::clone(buf);
        }
        Arc::clone(slot.get_or_init(|| Arc::new(self.synthesize(key))))
    }

    fn synthesize(&self, key: CacheKey) -> SampleBuffer {
        self.syntheses.fetch_add(1, Ordering::Relaxed);
        debug!(kind = %key.kind, frames = key.frames, sample_rate = key.sample_rate, "synthesizing buffer");
        let mut rng = rng_for(self.seed, &key.kind.to_string());
        match key.kind {
            BufferKind::Noise(color) if key.crossfade => {
                noise::synthesize_crossfaded(color, key.frames, CHANNELS, key.sample_rate, &mut rng)
            }
            BufferKind::Noise(color) => noise::synthesize(color, key.frames, CHANNELS, key.sample_rate, &mut rng),
            BufferKind::Texture(kind) => texture::synthesize(kind, key.frames, CHANNELS, key.sample_rate, &mut rng),
        }
    }

    /// Whether `key` is already synthesized (in-flight generations do not count).
    pub fn contains(&self, key: &CacheKey) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).is_some_and(|s| s.get().is_some())
    }

    /// Number of keys with a finished buffer.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|s| s.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total syntheses performed so far.
    pub fn synthesis_count(&self) -> usize {
        self.syntheses.load(Ordering::Relaxed)
    }
}

impl Default for BufferCache {
    fn default() -> Self {
        Self::new(None)
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn key(kind: BufferKind) -> CacheKey {
        CacheKey { kind, sample_rate: 8_000, frames: 1_000, crossfade: matches!(kind, BufferKind::Texture(_)) }
    }

    #[test]
    fn second_request_is_a_hit() {
        let cache = BufferCache::new(Some(1));
        let a = cache.get_or_synthesize(key(BufferKind::Noise(NoiseColor::Pink)));
        let b = cache.get_or_synthesize(key(BufferKind::Noise(NoiseColor::Pink)));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.synthesis_count(), 1);
        assert_eq!(a.channel_count(), CHANNELS);
    }

    #[test]
    fn distinct_keys_get_distinct_buffers() {
        let cache = BufferCache::new(Some(1));
        let pink = cache.get_or_synthesize(key(BufferKind::Noise(NoiseColor::Pink)));
        let rain = cache.get_or_synthesize(key(BufferKind::Texture(TextureKind::Rain)));
        assert!(!Arc::ptr_eq(&pink, &rain));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.synthesis_count(), 2);
    }

    #[test]
    fn concurrent_misses_synthesize_once() {
        let cache = Arc::new(BufferCache::new(Some(5)));
        let k = CacheKey { frames: 200_000, ..key(BufferKind::Texture(TextureKind::Ocean)) };
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_synthesize(k))
            })
            .collect();
        let bufs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.synthesis_count(), 1);
        assert!(bufs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn seeded_caches_agree() {
        let k = key(BufferKind::Noise(NoiseColor::Brown));
        let a = BufferCache::new(Some(3)).get_or_synthesize(k);
        let b = BufferCache::new(Some(3)).get_or_synthesize(k);
        assert_eq!(*a, *b);
    }
}
