//! Signal graph manager: the mode state machine and the node bookkeeping behind it.
//!
//! The manager is the only owner of the control-side view of the graph. Every
//! public call records exactly one [`Transaction`] (a mode switch carries both
//! the teardown and the build) and commits its bookkeeping only after the
//! transaction was accepted, so a failed call leaves the previous state intact.
//! Stops go through [`GraphHandle::submit_teardown`], which is never refused.
//!
//! Noise session layout:
//!
//! ```text
//! player(color)   ─► gain ─┐
//!                          ├─► bus ─► sink
//! player(texture) ─► gain ─┘
//! ```
//!
//! A loop player never changes its buffer: a color or texture change stops and
//! disconnects that layer's player and gain and builds a fresh pair, leaving the
//! other layer, the bus and the sink alone.

use std::sync::Arc;

use tracing::{debug, info};

use lull_core::dsp::seconds_to_frames;
use lull_core::noise::NoiseColor;
use lull_core::texture::TextureKind;

use crate::binaural::{configure, BinauralVoice};
use crate::cache::{BufferCache, BufferKind, CacheKey};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::{GraphHandle, NodeId, Transaction};
use crate::nodes::{BufferPlayer, Gain, Node};
use crate::params::{BinauralParams, BinauralUpdate, Mode, NoiseParams, NoiseUpdate};

/// One looping layer of the noise session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    pub player: NodeId,
    pub gain: NodeId,
    pub kind: BufferKind,
}

#[derive(Copy, Clone, Debug)]
struct BinauralSession {
    voice: BinauralVoice,
    sink: NodeId,
}

#[derive(Copy, Clone, Debug)]
struct NoiseSession {
    color: LayerInfo,
    texture: Option<LayerInfo>,
    bus: NodeId,
    sink: NodeId,
}

/// Mode state machine over a [`GraphHandle`].
pub struct SignalGraphManager {
    handle: GraphHandle,
    cache: Arc<BufferCache>,
    config: EngineConfig,
    sample_rate: u32,
    mode: Mode,
    binaural: Option<BinauralSession>,
    noise: Option<NoiseSession>,
    binaural_params: BinauralParams,
    noise_params: NoiseParams,
}

impl SignalGraphManager {
    pub fn new(handle: GraphHandle, cache: Arc<BufferCache>, config: EngineConfig, sample_rate: u32) -> Self {
        Self {
            handle,
            cache,
            config,
            sample_rate: sample_rate.max(1),
            mode: Mode::Idle,
            binaural: None,
            noise: None,
            binaural_params: BinauralParams::default(),
            noise_params: NoiseParams::default(),
        }
    }

    // ------------------------------- Binaural ------------------------------------

    /// Enter binaural mode, tearing down whatever was live first.
    pub fn start_binaural(&mut self, params: BinauralParams) -> EngineResult<()> {
        let params = params.sanitized()?;
        let mut tx = Transaction::new();
        self.record_exit_all(&mut tx);

        let sr = self.sr();
        let sink = self.handle.allocate();
        tx.insert(sink, Node::Sink);
        let voice = BinauralVoice::build(&mut self.handle, &mut tx, &params, sink, sr, self.config.gain_smoothing_ms);
        self.handle.submit(tx)?;

        self.noise = None;
        self.binaural = Some(BinauralSession { voice, sink });
        self.binaural_params = params;
        self.mode = Mode::Binaural;
        let (left, right) = configure(params.carrier, params.beat);
        info!(left, right, volume = params.volume, "binaural started");
        Ok(())
    }

    /// Retune the running binaural voice in place.
    pub fn update_binaural(&mut self, update: BinauralUpdate) -> EngineResult<()> {
        let update = update.sanitized()?;
        let Some(session) = self.binaural.filter(|_| self.mode == Mode::Binaural) else {
            return Err(self.not_active(Mode::Binaural));
        };
        let params = self.binaural_params.merged(&update);
        let mut tx = Transaction::new();
        session.voice.update(&mut tx, &params);
        self.handle.submit(tx)?;

        self.binaural_params = params;
        debug!(carrier = params.carrier, beat = params.beat, volume = params.volume, "binaural updated");
        Ok(())
    }

    /// Leave binaural mode. No-op unless binaural nodes are live.
    pub fn stop_binaural(&mut self) -> EngineResult<()> {
        let Some(session) = self.binaural else { return Ok(()) };
        let mut tx = Transaction::new();
        Self::record_exit_binaural(&mut tx, &session);
        self.handle.submit_teardown(tx);

        self.binaural = None;
        if self.mode == Mode::Binaural {
            self.mode = Mode::Idle;
        }
        info!("binaural stopped");
        Ok(())
    }

    fn record_exit_binaural(tx: &mut Transaction, session: &BinauralSession) {
        session.voice.teardown(tx);
        tx.disconnect(session.sink);
    }

    // --------------------------------- Noise -------------------------------------

    /// Enter noise mode, tearing down whatever was live first.
    pub fn start_noise(&mut self, params: NoiseParams) -> EngineResult<()> {
        let params = params.sanitized()?;
        let mut tx = Transaction::new();
        self.record_exit_all(&mut tx);

        let sink = self.handle.allocate();
        let bus = self.handle.allocate();
        tx.insert(sink, Node::Sink).insert(bus, Node::Bus).connect(bus, sink);
        let color = self.record_layer(&mut tx, BufferKind::Noise(params.color), params.volume, bus);
        let texture = params
            .texture
            .map(|kind| self.record_layer(&mut tx, BufferKind::Texture(kind), params.texture_volume, bus));
        self.handle.submit(tx)?;

        self.binaural = None;
        self.noise = Some(NoiseSession { color, texture, bus, sink });
        self.noise_params = params;
        self.mode = Mode::Noise;
        info!(color = %params.color, texture = ?params.texture, volume = params.volume, "noise started");
        Ok(())
    }

    /// Apply a partial noise update. Level changes happen in place; a new color
    /// or texture rebuilds only that layer.
    pub fn update_noise(&mut self, update: NoiseUpdate) -> EngineResult<()> {
        let update = update.sanitized()?;
        let Some(mut session) = self.noise.filter(|_| self.mode == Mode::Noise) else {
            return Err(self.not_active(Mode::Noise));
        };
        let old = self.noise_params;
        let params = old.merged(&update);
        let mut tx = Transaction::new();

        if params.color != old.color {
            debug!(from = %old.color, to = %params.color, "rebuilding color layer");
            Self::record_layer_teardown(&mut tx, &session.color);
            session.color = self.record_layer(&mut tx, BufferKind::Noise(params.color), params.volume, session.bus);
        } else if params.volume != old.volume {
            tx.set_gain(session.color.gain, params.volume);
        }

        if params.texture != old.texture {
            debug!(from = ?old.texture, to = ?params.texture, "rebuilding texture layer");
            if let Some(layer) = session.texture.take() {
                Self::record_layer_teardown(&mut tx, &layer);
            }
            session.texture = params
                .texture
                .map(|kind| self.record_layer(&mut tx, BufferKind::Texture(kind), params.texture_volume, session.bus));
        } else if params.texture_volume != old.texture_volume {
            if let Some(layer) = &session.texture {
                tx.set_gain(layer.gain, params.texture_volume);
            }
        }

        self.handle.submit(tx)?;
        self.noise = Some(session);
        self.noise_params = params;
        Ok(())
    }

    /// Turn the texture layer on (or switch it) under a running noise session.
    pub fn start_texture(&mut self, kind: TextureKind, volume: f32) -> EngineResult<()> {
        self.update_noise(NoiseUpdate { texture: Some(Some(kind)), texture_volume: Some(volume), ..NoiseUpdate::default() })
    }

    /// Remove the texture layer, keeping the noise bed playing.
    pub fn stop_texture(&mut self) -> EngineResult<()> {
        self.update_noise(NoiseUpdate::texture(None))
    }

    /// Leave noise mode. No-op unless noise nodes are live.
    pub fn stop_noise(&mut self) -> EngineResult<()> {
        let Some(session) = self.noise else { return Ok(()) };
        let mut tx = Transaction::new();
        Self::record_exit_noise(&mut tx, &session);
        self.handle.submit_teardown(tx);

        self.noise = None;
        if self.mode == Mode::Noise {
            self.mode = Mode::Idle;
        }
        info!("noise stopped");
        Ok(())
    }

    fn record_exit_noise(tx: &mut Transaction, session: &NoiseSession) {
        Self::record_layer_teardown(tx, &session.color);
        if let Some(layer) = &session.texture {
            Self::record_layer_teardown(tx, layer);
        }
        tx.disconnect(session.bus).disconnect(session.sink);
    }

    fn record_layer(&mut self, tx: &mut Transaction, kind: BufferKind, volume: f32, bus: NodeId) -> LayerInfo {
        let buffer = self.cache.get_or_synthesize(self.key_for(kind));
        let player = self.handle.allocate();
        let gain = self.handle.allocate();
        tx.insert(player, Node::Player(BufferPlayer::new(buffer)))
            .insert(gain, Node::Gain(Gain::new(volume, self.config.gain_smoothing_ms, self.sr())))
            .connect(player, gain)
            .connect(gain, bus)
            .start(player);
        LayerInfo { player, gain, kind }
    }

    fn record_layer_teardown(tx: &mut Transaction, layer: &LayerInfo) {
        tx.stop(layer.player).disconnect(layer.player).disconnect(layer.gain);
    }

    // --------------------------------- Common ------------------------------------

    /// Exit every mode. Safe from any state, including a stalled render path;
    /// repeated calls do nothing.
    pub fn stop(&mut self) -> EngineResult<()> {
        if self.binaural.is_none() && self.noise.is_none() {
            self.mode = Mode::Idle;
            return Ok(());
        }
        let mut tx = Transaction::new();
        self.record_exit_all(&mut tx);
        self.handle.submit_teardown(tx);

        self.binaural = None;
        self.noise = None;
        self.mode = Mode::Idle;
        info!("all modes stopped");
        Ok(())
    }

    fn record_exit_all(&self, tx: &mut Transaction) {
        if let Some(session) = &self.binaural {
            Self::record_exit_binaural(tx, session);
        }
        if let Some(session) = &self.noise {
            Self::record_exit_noise(tx, session);
        }
    }

    /// Cache key for `kind` at this manager's sample rate and configured loop lengths.
    pub fn key_for(&self, kind: BufferKind) -> CacheKey {
        let (seconds, crossfade) = match kind {
            BufferKind::Noise(_) => (self.config.noise_seconds, self.config.noise_crossfade),
            BufferKind::Texture(_) => (self.config.texture_seconds, true),
        };
        CacheKey { kind, sample_rate: self.sample_rate, frames: seconds_to_frames(seconds, self.sample_rate), crossfade }
    }

    fn not_active(&self, requested: Mode) -> EngineError {
        debug!(?requested, current = ?self.mode, "update ignored, mode not active");
        EngineError::NotActive { requested, current: self.mode }
    }

    #[inline]
    fn sr(&self) -> f32 {
        self.sample_rate as f32
    }

    /// Drop nodes the render side has retired.
    pub fn collect_garbage(&mut self) -> usize {
        self.handle.collect_garbage()
    }

    // ------------------------------- Inspection ----------------------------------

    pub fn mode(&self) -> Mode { self.mode }
    pub fn sample_rate(&self) -> u32 { self.sample_rate }
    pub fn binaural_params(&self) -> BinauralParams { self.binaural_params }
    pub fn noise_params(&self) -> NoiseParams { self.noise_params }

    /// Every node id this manager currently considers live.
    pub fn live_nodes(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        if let Some(s) = &self.binaural {
            ids.extend(s.voice.nodes());
            ids.push(s.sink);
        }
        if let Some(s) = &self.noise {
            ids.extend([s.color.player, s.color.gain]);
            if let Some(t) = &s.texture {
                ids.extend([t.player, t.gain]);
            }
            ids.extend([s.bus, s.sink]);
        }
        ids
    }

    /// `(left, right)` tone frequencies while binaural is live.
    pub fn binaural_frequencies(&self) -> Option<(f32, f32)> {
        self.binaural.map(|_| configure(self.binaural_params.carrier, self.binaural_params.beat))
    }

    pub fn binaural_voice(&self) -> Option<BinauralVoice> {
        self.binaural.map(|s| s.voice)
    }

    pub fn noise_layer(&self) -> Option<LayerInfo> {
        self.noise.map(|s| s.color)
    }

    pub fn texture_layer(&self) -> Option<LayerInfo> {
        self.noise.and_then(|s| s.texture)
    }

    pub fn mix_bus(&self) -> Option<NodeId> {
        self.noise.map(|s| s.bus)
    }

    /// The buffer color currently behind the noise layer.
    pub fn noise_color(&self) -> Option<NoiseColor> {
        match self.noise_layer()?.kind {
            BufferKind::Noise(c) => Some(c),
            BufferKind::Texture(_) => None,
        }
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{channel, Renderer};
    use pretty_assertions::assert_eq;

    fn manager() -> (SignalGraphManager, Renderer) {
        let (handle, renderer) = channel(16);
        let config = EngineConfig { noise_seconds: 0.25, texture_seconds: 0.5, ..EngineConfig::seeded(7) };
        let cache = Arc::new(BufferCache::new(config.seed));
        (SignalGraphManager::new(handle, cache, config, 8_000), renderer)
    }

    #[test]
    fn binaural_enter_builds_six_nodes() {
        let (mut m, mut r) = manager();
        m.start_binaural(BinauralParams::new(400.0, 10.0, 0.5)).unwrap();
        r.begin_block();
        assert_eq!(m.mode(), Mode::Binaural);
        assert_eq!(m.live_nodes().len(), 6);
        assert_eq!(r.graph().node_count(), 6);
        assert_eq!(m.binaural_frequencies(), Some((400.0, 410.0)));
    }

    #[test]
    fn update_while_idle_reports_not_active() {
        let (mut m, _r) = manager();
        let err = m.update_binaural(BinauralUpdate::beat(12.0)).unwrap_err();
        assert_eq!(err, EngineError::NotActive { requested: Mode::Binaural, current: Mode::Idle });
        assert!(matches!(m.update_noise(NoiseUpdate::volume(0.2)), Err(EngineError::NotActive { .. })));
        assert_eq!(m.mode(), Mode::Idle);
        assert_eq!(m.binaural_params(), BinauralParams::default());
    }

    #[test]
    fn stop_binaural_does_not_touch_noise() {
        let (mut m, _r) = manager();
        m.start_noise(NoiseParams::new(NoiseColor::Brown, 0.5)).unwrap();
        m.stop_binaural().unwrap();
        assert_eq!(m.mode(), Mode::Noise);
        assert!(m.noise_layer().is_some());
    }

    #[test]
    fn texture_toggle_keeps_color_layer() {
        let (mut m, mut r) = manager();
        m.start_noise(NoiseParams::new(NoiseColor::Pink, 0.5)).unwrap();
        let color = m.noise_layer();
        m.start_texture(TextureKind::Wind, 0.3).unwrap();
        r.begin_block();
        assert_eq!(r.graph().node_count(), 6);
        m.stop_texture().unwrap();
        r.begin_block();
        assert_eq!(m.noise_layer(), color);
        assert_eq!(m.texture_layer(), None);
        assert_eq!(r.graph().node_count(), 4);
    }

    #[test]
    fn rejected_update_leaves_state() {
        let (mut m, _r) = manager();
        m.start_binaural(BinauralParams::new(300.0, 8.0, 0.4)).unwrap();
        let before = m.live_nodes();
        assert!(m.update_binaural(BinauralUpdate::carrier(f32::NAN)).is_err());
        assert_eq!(m.live_nodes(), before);
        assert_eq!(m.binaural_params(), BinauralParams::new(300.0, 8.0, 0.4));
    }

    #[test]
    fn texture_switch_rebuilds_only_the_texture_layer() {
        let (mut m, mut r) = manager();
        m.start_noise(NoiseParams::new(NoiseColor::Pink, 0.5).with_texture(TextureKind::Wind, 0.3)).unwrap();
        r.begin_block();
        let color = m.noise_layer().unwrap();
        let bus = m.mix_bus().unwrap();
        let wind = m.texture_layer().unwrap();

        m.update_noise(NoiseUpdate::texture(Some(TextureKind::Rain))).unwrap();
        r.begin_block();

        let rain = m.texture_layer().unwrap();
        assert_eq!(rain.kind, BufferKind::Texture(TextureKind::Rain));
        assert_ne!(rain.player, wind.player);
        assert_ne!(rain.gain, wind.gain);
        assert_eq!(m.noise_layer(), Some(color));
        assert_eq!(m.mix_bus(), Some(bus));

        let g = r.graph();
        assert!(!g.contains(wind.player) && !g.contains(wind.gain));
        assert!(g.is_running(rain.player));
        assert_eq!(g.output_of(rain.player), Some(rain.gain));
        assert_eq!(g.output_of(rain.gain), Some(bus));
        assert!(g.is_running(color.player));
        assert_eq!(g.node_count(), 6);
    }

    #[test]
    fn full_queue_keeps_previous_mode() {
        let (handle, _renderer) = channel(1);
        let cache = Arc::new(BufferCache::new(Some(1)));
        let config = EngineConfig { noise_seconds: 0.1, texture_seconds: 0.1, ..EngineConfig::seeded(1) };
        let mut m = SignalGraphManager::new(handle, cache, config, 8_000);
        m.start_binaural(BinauralParams::default()).unwrap();
        // renderer never drains and the switch is larger than the overflow allows
        let params = NoiseParams::default().with_texture(TextureKind::Ocean, 0.2);
        let err = m.start_noise(params).unwrap_err();
        assert_eq!(err, EngineError::CommandQueueFull);
        assert_eq!(m.mode(), Mode::Binaural);
        assert!(m.binaural_voice().is_some());
        assert!(m.noise_layer().is_none());
    }

    #[test]
    fn stop_lands_after_a_stalled_queue_of_updates() {
        let (handle, mut r) = channel(2);
        let cache = Arc::new(BufferCache::new(Some(3)));
        let config = EngineConfig { noise_seconds: 0.1, ..EngineConfig::seeded(3) };
        let mut m = SignalGraphManager::new(handle, cache, config, 8_000);
        m.start_noise(NoiseParams::new(NoiseColor::Pink, 0.5)).unwrap();
        r.begin_block();

        for i in 0..500 {
            m.update_noise(NoiseUpdate::volume((i % 100) as f32 / 100.0)).unwrap();
        }
        m.update_noise(NoiseUpdate::color(NoiseColor::Brown)).unwrap();
        m.stop().unwrap();
        assert_eq!(m.mode(), Mode::Idle);
        assert!(m.live_nodes().is_empty());

        r.begin_block();
        assert_eq!(r.graph().node_count(), 0);
    }
}
