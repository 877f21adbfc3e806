//! Audio backends: where the [`Renderer`] ends up once the engine starts.
//!
//! A backend owns the platform side of the render path. The engine launches it
//! lazily on the first `start*` call and from then on only talks to the graph
//! through the transaction queue.
//!
//! - [`OfflineBackend`] : no device; an [`OfflineTap`] pulls frames on demand
//!   (tests, WAV rendering)
//! - `CpalBackend`      : realtime output, see [`crate::realtime`] (feature `realtime`)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{EngineError, EngineResult};
use crate::graph::{Graph, Renderer};

/// Platform audio stack as seen by the engine.
pub trait AudioBackend {
    /// Hand `renderer` to the render path and start pulling frames.
    /// Returns the sample rate the path runs at.
    fn launch(&mut self, renderer: Renderer) -> EngineResult<u32>;

    /// Pause pulling frames (e.g. an audio-session interruption began).
    fn suspend(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Continue pulling frames after [`suspend`](Self::suspend).
    fn resume(&mut self) -> EngineResult<()> {
        Ok(())
    }
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn launch(&mut self, renderer: Renderer) -> EngineResult<u32> { (**self).launch(renderer) }
    fn suspend(&mut self) -> EngineResult<()> { (**self).suspend() }
    fn resume(&mut self) -> EngineResult<()> { (**self).resume() }
}

// ---------------------------------- Offline --------------------------------------

#[derive(Default)]
struct OfflineShared {
    renderer: Mutex<Option<Renderer>>,
    suspended: AtomicBool,
}

/// Backend without a device. Frames are rendered only when the tap asks.
pub struct OfflineBackend {
    sample_rate: u32,
    failure: Option<String>,
    shared: Arc<OfflineShared>,
}

/// Pull side of an [`OfflineBackend`]; cheap to clone.
#[derive(Clone)]
pub struct OfflineTap {
    shared: Arc<OfflineShared>,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate: sample_rate.max(1), failure: None, shared: Arc::default() }
    }

    /// A backend whose launch always fails, standing in for a missing device.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { failure: Some(reason.into()), ..Self::new(48_000) }
    }

    pub fn tap(&self) -> OfflineTap {
        OfflineTap { shared: Arc::clone(&self.shared) }
    }
}

impl AudioBackend for OfflineBackend {
    fn launch(&mut self, renderer: Renderer) -> EngineResult<u32> {
        if let Some(reason) = &self.failure {
            return Err(EngineError::unavailable(reason.clone()));
        }
        *self.shared.renderer.lock().unwrap_or_else(PoisonError::into_inner) = Some(renderer);
        Ok(self.sample_rate)
    }

    fn suspend(&mut self) -> EngineResult<()> {
        self.shared.suspended.store(true, Ordering::Release);
        Ok(())
    }

    fn resume(&mut self) -> EngineResult<()> {
        self.shared.suspended.store(false, Ordering::Release);
        Ok(())
    }
}

impl OfflineTap {
    /// Render `frames` interleaved stereo frames. Silence before launch or while suspended.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * 2];
        if self.is_suspended() {
            return out;
        }
        let mut guard = self.shared.renderer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(renderer) = guard.as_mut() {
            renderer.render_interleaved(&mut out, 2);
        }
        out
    }

    /// Apply pending transactions without rendering audio.
    pub fn flush(&self) {
        let mut guard = self.shared.renderer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(renderer) = guard.as_mut() {
            renderer.begin_block();
        }
    }

    /// Inspect the render-side graph as it stands (pending transactions not applied).
    pub fn with_graph<R>(&self, f: impl FnOnce(&Graph) -> R) -> Option<R> {
        let guard = self.shared.renderer.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|r| f(r.graph()))
    }

    /// Nodes live on the render side (0 before launch).
    pub fn node_count(&self) -> usize {
        self.with_graph(Graph::node_count).unwrap_or(0)
    }

    pub fn is_launched(&self) -> bool {
        self.shared.renderer.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.suspended.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::channel;

    #[test]
    fn tap_is_silent_until_launched() {
        let backend = OfflineBackend::new(8_000);
        let tap = backend.tap();
        assert!(!tap.is_launched());
        assert!(tap.render(16).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn launch_reports_sample_rate() {
        let mut backend = OfflineBackend::new(22_050);
        let (_handle, renderer) = channel(4);
        assert_eq!(backend.launch(renderer), Ok(22_050));
        assert!(backend.tap().is_launched());
    }

    #[test]
    fn unavailable_backend_fails_launch() {
        let mut backend = OfflineBackend::unavailable("no output device");
        let (_handle, renderer) = channel(4);
        assert!(matches!(backend.launch(renderer), Err(EngineError::ResourceUnavailable(_))));
    }
}
