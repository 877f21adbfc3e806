//! Error types for the engine control surface.

use thiserror::Error;

use crate::params::Mode;

/// Result type for engine control calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors a control call can report. None of them leave a half-built graph behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// An update was issued for a mode that is not running.
    #[error("{requested:?} mode is not active (current mode: {current:?})")]
    NotActive {
        /// Mode the call targeted.
        requested: Mode,
        /// Mode the engine was actually in.
        current: Mode,
    },

    /// The platform audio stack could not be opened or started.
    #[error("audio output unavailable: {0}")]
    ResourceUnavailable(String),

    /// The render path has not drained earlier transactions yet.
    #[error("render command queue is full")]
    CommandQueueFull,

    /// A parameter was NaN or infinite.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },

    /// Suspending or resuming the output stream failed.
    #[error("audio stream error: {0}")]
    Stream(String),
}

impl EngineError {
    /// Creates a resource-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ResourceUnavailable(message.into())
    }

    /// Stable numeric code, used by the C ABI.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::NotActive { .. } => 1,
            EngineError::ResourceUnavailable(_) => 2,
            EngineError::CommandQueueFull => 3,
            EngineError::InvalidParameter { .. } => 4,
            EngineError::Stream(_) => 5,
        }
    }
}
