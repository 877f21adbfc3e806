//! Engine facade: the one control surface hosts talk to.
//!
//! An [`Engine`] is an explicit object with an owned backend. Nothing touches
//! the audio device until the first `start*` call (or [`Engine::initialize`]),
//! so constructing an engine never fails.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::backend::{AudioBackend, OfflineBackend, OfflineTap};
use crate::binaural::BinauralVoice;
use crate::cache::{BufferCache, BufferKind};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::{channel, NodeId};
use crate::manager::{LayerInfo, SignalGraphManager};
use crate::params::{BinauralParams, BinauralUpdate, Mode, NoiseParams, NoiseUpdate};

/// Read-only snapshot for hosts.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct EngineState {
    pub mode: Mode,
    pub is_playing: bool,
    /// Most recently applied binaural params (kept after stop).
    pub binaural: BinauralParams,
    /// Most recently applied noise params (kept after stop).
    pub noise: NoiseParams,
}

/// Focus-sound engine over an [`AudioBackend`].
pub struct Engine<B: AudioBackend> {
    config: EngineConfig,
    backend: B,
    cache: Arc<BufferCache>,
    manager: Option<SignalGraphManager>,
    suspended: bool,
}

impl<B: AudioBackend> Engine<B> {
    /// Engine with its own buffer cache.
    pub fn new(config: EngineConfig, backend: B) -> Self {
        let cache = Arc::new(BufferCache::new(config.seed));
        Self::with_cache(config, backend, cache)
    }

    /// Engine sharing `cache` with other engines.
    pub fn with_cache(config: EngineConfig, backend: B, cache: Arc<BufferCache>) -> Self {
        Self { config, backend, cache, manager: None, suspended: false }
    }

    /// Launch the backend if it is not running yet. Returns the render sample rate.
    pub fn initialize(&mut self) -> EngineResult<u32> {
        Ok(self.launched()?.sample_rate())
    }

    fn launched(&mut self) -> EngineResult<&mut SignalGraphManager> {
        if self.manager.is_none() {
            let (handle, renderer) = channel(self.config.command_capacity);
            let sample_rate = self.backend.launch(renderer).inspect_err(|e| error!(error = %e, "audio backend failed to launch"))?;
            info!(sample_rate, "engine initialized");
            self.manager = Some(SignalGraphManager::new(handle, Arc::clone(&self.cache), self.config.clone(), sample_rate));
        }
        self.manager.as_mut().ok_or_else(|| EngineError::unavailable("engine not initialized"))
    }

    fn resume_if_suspended(&mut self) -> EngineResult<()> {
        if self.suspended {
            self.backend.resume()?;
            self.suspended = false;
        }
        Ok(())
    }

    /// Launch if needed and bring suspended output back before a mode switch is
    /// queued, so a failed resume leaves the previous mode in place.
    fn ready_to_play(&mut self) -> EngineResult<&mut SignalGraphManager> {
        self.launched()?;
        self.resume_if_suspended()?;
        self.launched()
    }

    // ------------------------------- Binaural ------------------------------------

    pub fn start_binaural(&mut self, params: BinauralParams) -> EngineResult<()> {
        self.ready_to_play()?.start_binaural(params)
    }

    pub fn update_binaural(&mut self, update: BinauralUpdate) -> EngineResult<()> {
        match self.manager.as_mut() {
            Some(m) => m.update_binaural(update),
            None => Err(EngineError::NotActive { requested: Mode::Binaural, current: Mode::Idle }),
        }
    }

    pub fn stop_binaural(&mut self) -> EngineResult<()> {
        self.manager.as_mut().map_or(Ok(()), SignalGraphManager::stop_binaural)
    }

    // --------------------------------- Noise -------------------------------------

    pub fn start_noise(&mut self, params: NoiseParams) -> EngineResult<()> {
        self.ready_to_play()?.start_noise(params)
    }

    pub fn update_noise(&mut self, update: NoiseUpdate) -> EngineResult<()> {
        match self.manager.as_mut() {
            Some(m) => m.update_noise(update),
            None => Err(EngineError::NotActive { requested: Mode::Noise, current: Mode::Idle }),
        }
    }

    pub fn stop_noise(&mut self) -> EngineResult<()> {
        self.manager.as_mut().map_or(Ok(()), SignalGraphManager::stop_noise)
    }

    /// Exit whatever mode is active. Idempotent in every state.
    pub fn stop(&mut self) -> EngineResult<()> {
        self.manager.as_mut().map_or(Ok(()), SignalGraphManager::stop)
    }

    // ------------------------------ Lifecycle ------------------------------------

    /// Synthesize buffers for `kinds` on a background thread. A `start*` racing
    /// it for the same buffer waits for this generation instead of running its own.
    pub fn prewarm(&mut self, kinds: &[BufferKind]) -> EngineResult<JoinHandle<usize>> {
        let manager = self.launched()?;
        let keys: Vec<_> = kinds.iter().map(|&k| manager.key_for(k)).collect();
        let cache = Arc::clone(&self.cache);
        debug!(count = keys.len(), "prewarming buffers");
        thread::Builder::new()
            .name("lull-prewarm".into())
            .spawn(move || {
                for key in &keys {
                    cache.get_or_synthesize(*key);
                }
                keys.len()
            })
            .map_err(|e| EngineError::unavailable(e.to_string()))
    }

    /// The platform interrupted audio (call, alarm, another app).
    pub fn interruption_began(&mut self) -> EngineResult<()> {
        if self.manager.is_none() || self.suspended {
            return Ok(());
        }
        self.backend.suspend()?;
        self.suspended = true;
        info!("audio interrupted, output suspended");
        Ok(())
    }

    /// The interruption is over; output resumes if a mode is active.
    pub fn interruption_ended(&mut self) -> EngineResult<()> {
        if self.mode() == Mode::Idle {
            return Ok(());
        }
        self.resume_if_suspended()?;
        info!("interruption ended, output resumed");
        Ok(())
    }

    // ------------------------------- Inspection ----------------------------------

    pub fn get_state(&self) -> EngineState {
        let mode = self.mode();
        EngineState {
            mode,
            is_playing: mode != Mode::Idle && !self.suspended,
            binaural: self.manager.as_ref().map(SignalGraphManager::binaural_params).unwrap_or_default(),
            noise: self.manager.as_ref().map(SignalGraphManager::noise_params).unwrap_or_default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.manager.as_ref().map_or(Mode::Idle, SignalGraphManager::mode)
    }

    /// Render sample rate, once launched.
    pub fn sample_rate(&self) -> Option<u32> {
        self.manager.as_ref().map(SignalGraphManager::sample_rate)
    }

    pub fn is_suspended(&self) -> bool { self.suspended }

    pub fn live_nodes(&self) -> Vec<NodeId> {
        self.manager.as_ref().map(SignalGraphManager::live_nodes).unwrap_or_default()
    }

    pub fn binaural_frequencies(&self) -> Option<(f32, f32)> {
        self.manager.as_ref()?.binaural_frequencies()
    }

    pub fn binaural_voice(&self) -> Option<BinauralVoice> {
        self.manager.as_ref()?.binaural_voice()
    }

    pub fn noise_layer(&self) -> Option<LayerInfo> {
        self.manager.as_ref()?.noise_layer()
    }

    pub fn texture_layer(&self) -> Option<LayerInfo> {
        self.manager.as_ref()?.texture_layer()
    }

    pub fn mix_bus(&self) -> Option<NodeId> {
        self.manager.as_ref()?.mix_bus()
    }

    pub fn cache(&self) -> &Arc<BufferCache> { &self.cache }
    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn backend(&self) -> &B { &self.backend }
}

impl Engine<OfflineBackend> {
    /// Engine without a device, plus the tap that pulls its audio.
    pub fn offline(config: EngineConfig, sample_rate: u32) -> (Self, OfflineTap) {
        let backend = OfflineBackend::new(sample_rate);
        let tap = backend.tap();
        (Self::new(config, backend), tap)
    }
}

#[cfg(feature = "realtime")]
impl Engine<crate::realtime::CpalBackend> {
    /// Engine on the configured (or default) output device.
    pub fn realtime(config: EngineConfig) -> Self {
        let backend = crate::realtime::CpalBackend::new(config.device.clone(), config.sample_rate);
        Self::new(config, backend)
    }
}
