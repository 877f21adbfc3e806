//! Lull Engine: binaural beats and noise/texture beds on a hot-reconfigurable graph.
//!
//! Crate layout:
//! - [`nodes`]    : oscillator, loop player, panner, gain, bus, sink
//! - [`graph`]    : render graph, transactions and the lock-free control → render queue
//! - [`cache`]    : process-lifetime cache of synthesized loop buffers
//! - [`binaural`] : the two-tone binaural sub-graph
//! - [`manager`]  : mode state machine (idle / binaural / noise)
//! - [`engine`]   : the control facade hosts call
//! - [`backend`]  : `AudioBackend` trait and the offline backend
//! - `realtime`   : CPAL output backend (feature `realtime`, on by default)
//!
//! Control calls never block on the render path: each one becomes a single
//! transaction that the render callback applies at the start of its next block.

pub mod backend;
pub mod binaural;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod manager;
pub mod nodes;
pub mod params;
#[cfg(feature = "realtime")]
pub mod realtime;

pub use backend::{AudioBackend, OfflineBackend, OfflineTap};
pub use cache::{BufferCache, BufferKind, CacheKey};
pub use config::EngineConfig;
pub use engine::{Engine, EngineState};
pub use error::{EngineError, EngineResult};
pub use manager::LayerInfo;
pub use params::{BinauralParams, BinauralUpdate, Mode, NoiseParams, NoiseUpdate};
#[cfg(feature = "realtime")]
pub use realtime::CpalBackend;

pub use lull_core::noise::NoiseColor;
pub use lull_core::texture::TextureKind;
