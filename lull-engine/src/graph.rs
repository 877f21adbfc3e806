//! Realtime render graph and the control → render command path.
//!
//! The control side never touches live nodes. It allocates [`NodeId`]s, records
//! [`GraphOp`]s into a [`Transaction`] and submits the whole transaction through a
//! lock-free SPSC queue. The render side ([`Renderer`]) drains pending
//! transactions at the start of each block, so every control call lands between
//! two blocks, never mid-block.
//!
//! When the queue is full (output suspended, or a stalled device) submits spill
//! into a single overflow transaction. Parameter changes there are coalesced per
//! node, and nodes that are inserted and then disconnected before ever reaching
//! the render side are dropped from it, so a stalled queue cannot grow without
//! bound. The renderer takes the overflow after draining the queue.
//!
//! Design goals
//! - The render path never waits: the overflow slot is only ever try-locked
//! - Allocation only when a transaction grows the graph
//! - Nodes kept ordered by [`Role`] so one forward pass renders a frame
//! - Retired nodes and spent transactions travel back to the control side to be
//!   dropped there

use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::error::{EngineError, EngineResult};
use crate::nodes::{Frame, Node, Role, SILENCE};

/// Handle of a node, allocated by the control side and never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// One mutation of the render graph.
#[derive(Debug)]
pub enum GraphOp {
    Insert { id: NodeId, node: Node },
    Connect { from: NodeId, to: NodeId },
    Start(NodeId),
    Stop(NodeId),
    /// Detach and drop the node. Anything routed into it is left unconnected.
    Disconnect(NodeId),
    SetFrequency { id: NodeId, hz: f32 },
    SetGain { id: NodeId, gain: f32 },
}

impl GraphOp {
    fn touches(&self, node: NodeId) -> bool {
        match *self {
            GraphOp::Insert { id, .. }
            | GraphOp::Start(id)
            | GraphOp::Stop(id)
            | GraphOp::Disconnect(id)
            | GraphOp::SetFrequency { id, .. }
            | GraphOp::SetGain { id, .. } => id == node,
            GraphOp::Connect { from, to } => from == node || to == node,
        }
    }
}

/// Ordered ops applied atomically between two render blocks.
#[derive(Debug, Default)]
pub struct Transaction {
    ops: Vec<GraphOp>,
}

impl Transaction {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, id: NodeId, node: Node) -> &mut Self { self.ops.push(GraphOp::Insert { id, node }); self }
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> &mut Self { self.ops.push(GraphOp::Connect { from, to }); self }
    pub fn start(&mut self, id: NodeId) -> &mut Self { self.ops.push(GraphOp::Start(id)); self }
    pub fn stop(&mut self, id: NodeId) -> &mut Self { self.ops.push(GraphOp::Stop(id)); self }
    pub fn disconnect(&mut self, id: NodeId) -> &mut Self { self.ops.push(GraphOp::Disconnect(id)); self }
    pub fn set_frequency(&mut self, id: NodeId, hz: f32) -> &mut Self { self.ops.push(GraphOp::SetFrequency { id, hz }); self }
    pub fn set_gain(&mut self, id: NodeId, gain: f32) -> &mut Self { self.ops.push(GraphOp::SetGain { id, gain }); self }

    pub fn is_empty(&self) -> bool { self.ops.is_empty() }
    pub fn len(&self) -> usize { self.ops.len() }

    fn inserts(&self, node: NodeId) -> bool {
        self.ops.iter().any(|op| matches!(op, GraphOp::Insert { id, .. } if *id == node))
    }

    /// Append `later`, keeping only the newest value per node for parameter ops.
    /// Disconnecting a node this transaction inserts removes every trace of it.
    fn absorb(&mut self, later: Transaction) {
        for op in later.ops {
            match op {
                GraphOp::SetFrequency { id, hz } => {
                    self.ops.retain(|o| !matches!(o, GraphOp::SetFrequency { id: other, .. } if *other == id));
                    self.ops.push(GraphOp::SetFrequency { id, hz });
                }
                GraphOp::SetGain { id, gain } => {
                    self.ops.retain(|o| !matches!(o, GraphOp::SetGain { id: other, .. } if *other == id));
                    self.ops.push(GraphOp::SetGain { id, gain });
                }
                GraphOp::Disconnect(id) if self.inserts(id) => self.ops.retain(|o| !o.touches(id)),
                op => self.ops.push(op),
            }
        }
    }
}

/// Ops per queue slot the overflow transaction may hold.
const OVERFLOW_OPS_PER_SLOT: usize = 16;

type Overflow = Arc<Mutex<Option<Transaction>>>;

/// Things the render side hands back for the control side to drop.
#[derive(Debug)]
enum Retired {
    Node(Node),
    Transaction(Transaction),
}

// ----------------------------------- Graph ---------------------------------------

#[derive(Debug)]
struct Slot {
    id: NodeId,
    node: Node,
    output: Option<NodeId>,
    running: bool,
}

/// Render-side node set. Slots are sorted by role rank; `routes[i]` is the slot
/// index that slot `i` feeds.
#[derive(Debug, Default)]
pub struct Graph {
    slots: Vec<Slot>,
    routes: Vec<Option<usize>>,
    accum: Vec<Frame>,
}

impl Graph {
    pub fn with_capacity(n: usize) -> Self {
        Self { slots: Vec::with_capacity(n), routes: Vec::with_capacity(n), accum: Vec::with_capacity(n) }
    }

    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    /// Apply one op; returns a node that left the graph.
    pub fn apply(&mut self, op: GraphOp) -> Option<Node> {
        match op {
            GraphOp::Insert { id, node } => {
                if self.index_of(id).is_some() {
                    return Some(node);
                }
                let role = node.role();
                let pos = self.slots.partition_point(|s| s.node.role() <= role);
                self.slots.insert(pos, Slot { id, node, output: None, running: false });
            }
            GraphOp::Connect { from, to } => {
                if let (Some(a), Some(b)) = (self.index_of(from), self.index_of(to)) {
                    if self.slots[a].node.role() < self.slots[b].node.role() {
                        self.slots[a].output = Some(to);
                    }
                }
            }
            GraphOp::Start(id) => {
                if let Some(i) = self.index_of(id) { self.slots[i].running = true; }
            }
            GraphOp::Stop(id) => {
                if let Some(i) = self.index_of(id) { self.slots[i].running = false; }
            }
            GraphOp::Disconnect(id) => {
                let i = self.index_of(id)?;
                let slot = self.slots.remove(i);
                for s in &mut self.slots {
                    if s.output == Some(id) { s.output = None; }
                }
                return Some(slot.node);
            }
            GraphOp::SetFrequency { id, hz } => {
                if let Some(Slot { node: Node::Oscillator(o), .. }) = self.index_of(id).map(|i| &mut self.slots[i]) {
                    o.set_freq(hz);
                }
            }
            GraphOp::SetGain { id, gain } => {
                if let Some(Slot { node: Node::Gain(g), .. }) = self.index_of(id).map(|i| &mut self.slots[i]) {
                    g.set_target(gain);
                }
            }
        }
        None
    }

    /// Resolve output ids to slot indices after a batch of ops.
    pub fn rebuild_routes(&mut self) {
        self.routes.clear();
        for s in &self.slots {
            let to = s.output.and_then(|id| self.slots.iter().position(|t| t.id == id));
            self.routes.push(to);
        }
        self.accum.resize(self.slots.len(), SILENCE);
    }

    /// Render one stereo frame in a single pass over the rank-ordered slots.
    #[inline]
    pub fn render_frame(&mut self) -> Frame {
        for a in self.accum.iter_mut() { *a = SILENCE; }
        let mut out = SILENCE;
        for i in 0..self.slots.len() {
            let slot = &mut self.slots[i];
            let y = slot.node.process(self.accum[i], slot.running);
            match self.routes[i] {
                Some(j) => {
                    self.accum[j][0] += y[0];
                    self.accum[j][1] += y[1];
                }
                None if slot.node.role() == Role::Sink => {
                    out[0] += y[0];
                    out[1] += y[1];
                }
                None => {}
            }
        }
        out
    }

    pub fn node_count(&self) -> usize { self.slots.len() }
    pub fn contains(&self, id: NodeId) -> bool { self.index_of(id).is_some() }
    pub fn is_running(&self, id: NodeId) -> bool { self.index_of(id).is_some_and(|i| self.slots[i].running) }
    pub fn output_of(&self, id: NodeId) -> Option<NodeId> { self.index_of(id).and_then(|i| self.slots[i].output) }

    /// Current frequency of an oscillator node.
    pub fn frequency(&self, id: NodeId) -> Option<f32> {
        match self.index_of(id).map(|i| &self.slots[i].node) {
            Some(Node::Oscillator(o)) => Some(o.freq()),
            _ => None,
        }
    }
}

// ---------------------------------- Channel --------------------------------------

/// Control side of the command path.
pub struct GraphHandle {
    commands: HeapProd<Transaction>,
    retired: HeapCons<Retired>,
    overflow: Overflow,
    overflow_limit: usize,
    next_id: u32,
}

/// Render side of the command path; owned by whatever drives the audio callback.
pub struct Renderer {
    graph: Graph,
    commands: HeapCons<Transaction>,
    retired: HeapProd<Retired>,
    overflow: Overflow,
}

/// Create a connected handle/renderer pair. `capacity` is the number of queued
/// transactions; past it, submits spill into the overflow transaction, which
/// holds at most `capacity * 16` ops.
pub fn channel(capacity: usize) -> (GraphHandle, Renderer) {
    let capacity = capacity.max(1);
    let (cmd_tx, cmd_rx) = HeapRb::<Transaction>::new(capacity).split();
    let (ret_tx, ret_rx) = HeapRb::<Retired>::new(capacity * 16).split();
    let overflow = Overflow::default();
    (
        GraphHandle {
            commands: cmd_tx,
            retired: ret_rx,
            overflow: Arc::clone(&overflow),
            overflow_limit: capacity * OVERFLOW_OPS_PER_SLOT,
            next_id: 0,
        },
        Renderer { graph: Graph::with_capacity(32), commands: cmd_rx, retired: ret_tx, overflow },
    )
}

impl GraphHandle {
    /// Fresh node id.
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Queue `tx` for the next render block. All of it or none of it: when the
    /// overflow cannot take the whole transaction it is refused.
    pub fn submit(&mut self, tx: Transaction) -> EngineResult<()> {
        self.enqueue(tx, true)
    }

    /// Queue a teardown. Never refused: it may only grow the overflow by ops
    /// on nodes the render side already holds.
    pub fn submit_teardown(&mut self, tx: Transaction) {
        // unbounded enqueue cannot fail
        let _ = self.enqueue(tx, false);
    }

    fn enqueue(&mut self, tx: Transaction, bounded: bool) -> EngineResult<()> {
        self.collect_garbage();
        if tx.is_empty() {
            return Ok(());
        }
        let mut overflow = self.overflow.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = overflow.take() {
            if let Err(pending) = self.commands.try_push(pending) {
                *overflow = Some(pending);
            }
        }
        if let Some(pending) = overflow.as_mut() {
            if bounded && pending.len() + tx.len() > self.overflow_limit {
                return Err(EngineError::CommandQueueFull);
            }
            pending.absorb(tx);
            return Ok(());
        }
        if let Err(tx) = self.commands.try_push(tx) {
            if bounded && tx.len() > self.overflow_limit {
                return Err(EngineError::CommandQueueFull);
            }
            *overflow = Some(tx);
        }
        Ok(())
    }

    /// Drop whatever the render side has retired. Returns how many items were freed.
    pub fn collect_garbage(&mut self) -> usize {
        let mut n = 0;
        while let Some(item) = self.retired.try_pop() {
            drop(item);
            n += 1;
        }
        n
    }
}

impl Renderer {
    /// Apply every pending transaction, then the overflow. Call once at the top
    /// of each block.
    pub fn begin_block(&mut self) {
        while let Some(tx) = self.commands.try_pop() {
            self.apply(tx);
        }
        let spilled = match self.overflow.try_lock() {
            Ok(mut slot) => slot.take(),
            Err(TryLockError::Poisoned(p)) => p.into_inner().take(),
            // control side is mid-submit; pick it up next block
            Err(TryLockError::WouldBlock) => None,
        };
        if let Some(tx) = spilled {
            self.apply(tx);
        }
    }

    fn apply(&mut self, mut tx: Transaction) {
        for op in tx.ops.drain(..) {
            if let Some(node) = self.graph.apply(op) {
                self.retire(Retired::Node(node));
            }
        }
        self.graph.rebuild_routes();
        self.retire(Retired::Transaction(tx));
    }

    #[inline]
    fn retire(&mut self, item: Retired) {
        // A full return queue means the control side is not collecting; drop here.
        let _ = self.retired.try_push(item);
    }

    /// Next stereo frame (call `begin_block` first for each block).
    #[inline]
    pub fn next_frame(&mut self) -> Frame {
        self.graph.render_frame()
    }

    /// Render one block of interleaved audio with `channels` channels; channels
    /// beyond the first two repeat left/right.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        self.begin_block();
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let f = self.next_frame();
            if channels == 1 {
                frame[0] = 0.5 * (f[0] + f[1]);
                continue;
            }
            for (c, s) in frame.iter_mut().enumerate() {
                *s = f[c % 2];
            }
        }
    }

    pub fn graph(&self) -> &Graph { &self.graph }
}

// ------------------------------------ Tests --------------------------------------
