//! Error types for glbrecode-core.

use std::io;
use thiserror::Error;

/// Result type for glbrecode-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by recoders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for glbrecode-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The container layout is not one this engine can rebuild.
    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// Buffer views violate positional or ownership invariants.
    #[error("buffer view ordering error: {0}")]
    Ordering(String),

    /// The recoder did not produce a replacement for an image.
    #[error("recoding image {image} (buffer view {view}) failed: {source}")]
    RecodeFailure {
        image: usize,
        view: usize,
        #[source]
        source: BoxError,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The manifest is missing a field or has one of the wrong type.
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// GLB framing error.
    #[error("invalid GLB container: {0}")]
    Container(String),

    /// Rebuilt stream diverged from the computed layout.
    #[error("layout mismatch: {0}")]
    Layout(String),
}

impl Error {
    /// Create an unsupported layout error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedLayout(msg.into())
    }

    /// Create an ordering error.
    pub fn ordering(msg: impl Into<String>) -> Self {
        Self::Ordering(msg.into())
    }

    /// Create a manifest error.
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }
}

impl From<gltf::Error> for Error {
    fn from(err: gltf::Error) -> Self {
        Error::Container(err.to_string())
    }
}
