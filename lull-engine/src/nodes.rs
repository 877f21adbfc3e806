//! Building blocks (nodes) of the render graph.
//!
//! These are per-sample components designed for realtime use: no locks and no
//! heap work while rendering. Sources produce a stereo [`Frame`]; every other node
//! transforms the frame accumulated at its input.
//!
//! Contents:
//! - `Generator`    : trait for anything that emits frames on its own
//! - `Osc`          : sine oscillator whose frequency can move without a phase jump
//! - `BufferPlayer` : looping player over a shared, immutable `SampleBuffer`
//! - `Panner`       : constant-power panner (`PanLaw`)
//! - `Gain`         : amplitude scaler with slewed target changes
//! - `Node`, `Role` : the closed set of node kinds the graph knows how to render

use std::sync::Arc;

use lull_core::buffer::SampleBuffer;
use lull_core::dsp::{sin01, wrap_phase01};
use lull_core::envelopes::SlewLimiter;

/// One stereo frame `[left, right]`.
pub type Frame = [f32; 2];

pub const SILENCE: Frame = [0.0, 0.0];

/// Anything that can generate one frame at a time.
pub trait Generator {
    fn next(&mut self) -> Frame;
}

// -------------------------------- Oscillator -------------------------------------

/// Free-running sine oscillator, mono content on both channels.
#[derive(Copy, Clone, Debug)]
pub struct Osc {
    phase: f32, // [0,1)
    freq:  f32, // Hz
    sr:    f32,
}

impl Osc {
    #[inline] pub fn new(freq_hz: f32, sr: f32) -> Self { Self { phase: 0.0, freq: freq_hz.max(0.0), sr: sr.max(1.0) } }

    /// Changes the frequency; the phase carries on from where it is.
    #[inline] pub fn set_freq(&mut self, hz: f32) { self.freq = hz.max(0.0); }
    #[inline] pub fn freq(&self) -> f32 { self.freq }
}

impl Generator for Osc {
    #[inline]
    fn next(&mut self) -> Frame {
        let s = sin01(self.phase);
        self.phase = wrap_phase01(self.phase + self.freq / self.sr);
        [s, s]
    }
}

// ------------------------------- Buffer player -----------------------------------

/// Loops a shared buffer forever. There is deliberately no way to swap the
/// buffer: a different buffer means a different player.
#[derive(Clone, Debug)]
pub struct BufferPlayer {
    buffer: Arc<SampleBuffer>,
    pos: usize,
}

impl BufferPlayer {
    pub fn new(buffer: Arc<SampleBuffer>) -> Self { Self { buffer, pos: 0 } }
}

impl Generator for BufferPlayer {
    #[inline]
    fn next(&mut self) -> Frame {
        let frames = self.buffer.frames();
        if frames == 0 {
            return SILENCE;
        }
        let f = [self.buffer.sample(0, self.pos), self.buffer.sample(1, self.pos)];
        self.pos += 1;
        if self.pos >= frames { self.pos = 0; }
        f
    }
}

// ---------------------------------- Panner ---------------------------------------

/// Constant-power panner helper.
#[derive(Copy, Clone, Debug)]
pub struct PanLaw;
impl PanLaw {
    /// Return (left, right) gains given `pan` in [-1..1], where -1 = hard left, +1 = hard right.
    #[inline]
    pub fn gains(pan: f32) -> (f32, f32) {
        let p = (pan.clamp(-1.0, 1.0) + 1.0) * 0.25 * core::f32::consts::PI; // map to [0, π/2]
        (p.cos(), p.sin())
    }
}

/// Folds the input to mono and places it with [`PanLaw`].
#[derive(Copy, Clone, Debug)]
pub struct Panner {
    gl: f32,
    gr: f32,
}

impl Panner {
    pub fn new(pan: f32) -> Self {
        let (gl, gr) = PanLaw::gains(pan);
        Self { gl, gr }
    }
    pub fn hard_left() -> Self { Self::new(-1.0) }
    pub fn hard_right() -> Self { Self::new(1.0) }

    #[inline]
    pub fn process(&self, x: Frame) -> Frame {
        let m = 0.5 * (x[0] + x[1]);
        [m * self.gl, m * self.gr]
    }
}

// ----------------------------------- Gain ----------------------------------------

/// Amplitude scaler. Target changes are slewed so volume moves never click.
#[derive(Copy, Clone, Debug)]
pub struct Gain {
    target: f32,
    smoother: SlewLimiter,
}

impl Gain {
    pub fn new(gain: f32, smoothing_ms: f32, sr: f32) -> Self {
        let mut smoother = SlewLimiter::new(smoothing_ms, sr);
        smoother.reset(gain);
        Self { target: gain, smoother }
    }

    #[inline] pub fn set_target(&mut self, gain: f32) { self.target = gain; }
    #[inline] pub fn target(&self) -> f32 { self.target }

    #[inline]
    pub fn process(&mut self, x: Frame) -> Frame {
        let g = self.smoother.process(self.target);
        [x[0] * g, x[1] * g]
    }
}

// ----------------------------------- Node ----------------------------------------

/// Position of a node in the signal chain. Connections only ever point from a
/// lower rank to a higher one, which is what lets the graph render in one pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Source,
    Router,
    Scaler,
    Bus,
    Sink,
}

/// Every node kind the render graph can hold.
#[derive(Clone, Debug)]
pub enum Node {
    Oscillator(Osc),
    Player(BufferPlayer),
    Panner(Panner),
    Gain(Gain),
    /// Summing point; passes its accumulated input through.
    Bus,
    /// Final output; its input is the rendered frame.
    Sink,
}

impl Node {
    pub fn role(&self) -> Role {
        match self {
            Node::Oscillator(_) | Node::Player(_) => Role::Source,
            Node::Panner(_) => Role::Router,
            Node::Gain(_) => Role::Scaler,
            Node::Bus => Role::Bus,
            Node::Sink => Role::Sink,
        }
    }

    /// Render one frame. Sources ignore `input` and stay silent unless `running`.
    #[inline]
    pub fn process(&mut self, input: Frame, running: bool) -> Frame {
        match self {
            Node::Oscillator(o) => if running { o.next() } else { SILENCE },
            Node::Player(p) => if running { p.next() } else { SILENCE },
            Node::Panner(p) => p.process(input),
            Node::Gain(g) => g.process(input),
            Node::Bus | Node::Sink => input,
        }
    }
}

// ------------------------------------ Tests --------------------------------------
