//! Error types for lifecycle operations and the JSON boundary.

use crate::stream::StreamId;
use thiserror::Error;

/// Hard failures of the lifecycle API. Validation findings are never reported here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Every physical output channel of the gasket is already in use.
    #[error("No available stream source index found in gasket {gasket} ({used} output streams in use)")]
    NoAvailableChannel {
        /// Source gasket name.
        gasket: String,
        /// Outbound streams already attached.
        used: usize,
    },

    /// The named gasket is not part of the hardware description.
    #[error("Unknown gasket: {0}")]
    UnknownGasket(String),

    /// A tied source gasket needs its stream id resolved from a linked input first.
    #[error("A valid source stream must be selected for tied gasket {gasket}")]
    TiedSourceNotLinked {
        /// Source gasket name.
        gasket: String,
    },

    /// The linked stream has no destination on the tied gasket.
    #[error("Stream {stream} has no destination on gasket {gasket}")]
    LinkedStreamMissesGasket {
        /// Linked stream.
        stream: StreamId,
        /// Tied gasket name.
        gasket: String,
    },

    /// No stream carries this id.
    #[error("Stream {0} not found")]
    StreamNotFound(StreamId),
}

/// Failures while reading a hardware description or persisted streams.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Malformed JSON or a shape mismatch.
    #[error("JSON error: {source}")]
    Json {
        /// Underlying parser error
        #[from]
        source: serde_json::Error,
    },

    /// Two gaskets share one name.
    #[error("Duplicate gasket name: {0}")]
    DuplicateGasket(String),
}

/// Result alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, ModelError>;
