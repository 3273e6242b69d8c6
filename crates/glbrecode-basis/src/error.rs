//! Error types for glbrecode-basis.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while recoding a texture.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The encoder executable is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// The encoder could not be run or reported a failure.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// The encoder ran but left no output file behind.
    #[error("{tool} produced no output at {}", path.display())]
    OutputMissing { tool: String, path: PathBuf },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Texture could not be decoded or resized.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Workspace error.
    #[error("workspace error: {0}")]
    Workspace(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an output missing error.
    pub fn output_missing(tool: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::OutputMissing {
            tool: tool.into(),
            path: path.into(),
        }
    }
}
