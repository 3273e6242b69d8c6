//! # glbrecode-basis
//!
//! Basis Universal recoding for GLB textures.
//!
//! This crate provides:
//! - [`BasisEncoder`], a [`glbrecode_core::RecodeInvoker`] that runs the
//!   `basisu` encoder on each embedded image
//! - encoder detection ([`check_basisu`], [`get_tool_path`])
//! - a [`Workspace`] for intermediate files, temporary or kept
//! - power-of-two checks and resizing for textures ([`texture`])
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support

mod error;
pub mod encoder;
pub mod template;
pub mod texture;
pub mod tools;
pub mod workspace;

// Re-exports
pub use encoder::{BasisEncoder, EncoderSettings, Preset};
pub use error::{Error, Result};
pub use template::TemplateContext;
pub use texture::{Dimensions, NpotTexture};
pub use tools::{check_basisu, check_tool, get_tool_path, require_tool, ToolInfo, BASISU};
pub use workspace::Workspace;
