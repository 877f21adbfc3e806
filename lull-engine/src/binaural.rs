//! Binaural beat sub-graph: two sine sources panned hard left / hard right into
//! one shared gain.
//!
//! ```text
//! osc(carrier)        ─► pan(L) ─┐
//!                                ├─► gain ─► sink
//! osc(carrier + beat) ─► pan(R) ─┘
//! ```

use crate::graph::{GraphHandle, NodeId, Transaction};
use crate::nodes::{Gain, Node, Osc, Panner};
use crate::params::BinauralParams;

/// Left/right tone frequencies for a carrier and beat.
#[inline]
pub fn configure(carrier: f32, beat: f32) -> (f32, f32) {
    (carrier, carrier + beat)
}

/// Node ids of a live binaural sub-graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BinauralVoice {
    pub left: NodeId,
    pub right: NodeId,
    pub pan_left: NodeId,
    pub pan_right: NodeId,
    pub gain: NodeId,
}

impl BinauralVoice {
    /// Record the full build into `tx`: source → router → scaler → `sink`, then start both tones.
    pub fn build(
        handle: &mut GraphHandle,
        tx: &mut Transaction,
        params: &BinauralParams,
        sink: NodeId,
        sr: f32,
        smoothing_ms: f32,
    ) -> Self {
        let voice = Self {
            left: handle.allocate(),
            right: handle.allocate(),
            pan_left: handle.allocate(),
            pan_right: handle.allocate(),
            gain: handle.allocate(),
        };
        let (fl, fr) = configure(params.carrier, params.beat);
        tx.insert(voice.left, Node::Oscillator(Osc::new(fl, sr)))
            .insert(voice.right, Node::Oscillator(Osc::new(fr, sr)))
            .insert(voice.pan_left, Node::Panner(Panner::hard_left()))
            .insert(voice.pan_right, Node::Panner(Panner::hard_right()))
            .insert(voice.gain, Node::Gain(Gain::new(params.volume, smoothing_ms, sr)))
            .connect(voice.left, voice.pan_left)
            .connect(voice.right, voice.pan_right)
            .connect(voice.pan_left, voice.gain)
            .connect(voice.pan_right, voice.gain)
            .connect(voice.gain, sink)
            .start(voice.left)
            .start(voice.right);
        voice
    }

    /// Retune/re-level the live nodes in place.
    pub fn update(&self, tx: &mut Transaction, params: &BinauralParams) {
        let (fl, fr) = configure(params.carrier, params.beat);
        tx.set_frequency(self.left, fl)
            .set_frequency(self.right, fr)
            .set_gain(self.gain, params.volume);
    }

    /// Stop both tones, then disconnect sources, routers and the scaler.
    pub fn teardown(&self, tx: &mut Transaction) {
        tx.stop(self.left)
            .stop(self.right)
            .disconnect(self.left)
            .disconnect(self.right)
            .disconnect(self.pan_left)
            .disconnect(self.pan_right)
            .disconnect(self.gain);
    }

    pub fn nodes(&self) -> [NodeId; 5] {
        [self.left, self.right, self.pan_left, self.pan_right, self.gain]
    }
}
