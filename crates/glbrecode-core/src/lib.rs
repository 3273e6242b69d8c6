//! # glbrecode-core
//!
//! Buffer-view remapping and container rebuild engine for GLB files.
//!
//! A GLB holds a JSON manifest and one binary chunk. The manifest's buffer
//! views carve that chunk into blocks; images point at blocks. When an image
//! block is swapped for a recoded version of a different length, every block
//! after it moves. This crate:
//!
//! 1. validates and orders the buffer views ([`index`]),
//! 2. hands each embedded image to a [`RecodeInvoker`] ([`recode`]),
//! 3. streams a new binary chunk with the replacements and recomputed
//!    offsets ([`rebuild`]),
//! 4. patches the manifest to match and declares the texture extension
//!    ([`patch`]),
//! 5. frames and writes the output GLB ([`container`]).
//!
//! [`session`] strings the stages together.
//!
//! ## Example
//!
//! ```no_run
//! use glbrecode_core::{recode_file, Replacement, RecodeInvoker, RecodeRequest, SessionOptions};
//! use std::path::Path;
//!
//! struct Passthrough;
//!
//! impl RecodeInvoker for Passthrough {
//!     fn name(&self) -> &str {
//!         "passthrough"
//!     }
//!
//!     fn recode(&self, request: &RecodeRequest<'_>) -> Result<Replacement, glbrecode_core::BoxError> {
//!         Ok(Replacement::memory(request.data.to_vec(), "image/basis"))
//!     }
//! }
//!
//! let report = recode_file(
//!     Path::new("model.glb"),
//!     Path::new("model.basis.glb"),
//!     &Passthrough,
//!     SessionOptions::default(),
//! )?;
//! println!("recoded {} images", report.summary.recoded.len());
//! # Ok::<(), glbrecode_core::Error>(())
//! ```

pub mod container;
pub mod error;
pub mod index;
pub mod manifest;
pub mod patch;
pub mod rebuild;
pub mod recode;
pub mod session;

pub use container::{encode_glb, write_container, GlbContainer};
pub use error::{BoxError, Error, Result};
pub use index::{BlockDescriptor, BufferIndex, Gap, GapKind, SHARED_BUFFER};
pub use manifest::{BufferViewDecl, ImageDecl, Manifest};
pub use patch::{ManifestPatcher, PatchReport, DEFAULT_EXTENSION, DEFAULT_MIME_TYPE};
pub use rebuild::{pad_len, BlockLayout, BufferRebuilder, RebuiltLayout};
pub use recode::{RecodeInvoker, RecodeRequest, Replacement, ReplacementSource};
pub use session::{
    recode_file, RebuildOutput, RebuildSession, RecodeSummary, RecodedImage, RunReport,
    SessionOptions,
};
