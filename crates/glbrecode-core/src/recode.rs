//! Recoder boundary.
//!
//! The engine never transforms image bytes itself. It hands each embedded
//! image to a [`RecodeInvoker`] and consumes whatever replacement comes back.

use crate::BoxError;
use std::path::PathBuf;

/// Where the bytes of a replacement block live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementSource {
    /// A file produced by an external encoder.
    File(PathBuf),
    /// Bytes already held in memory.
    Memory(Vec<u8>),
}

/// A recoded block waiting to be streamed into the rebuilt chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Replacement bytes.
    pub source: ReplacementSource,
    /// Number of bytes to read from `source`.
    pub length: u64,
    /// Media type of the recoded image.
    pub mime_type: String,
}

/// Input handed to a recoder for one image.
#[derive(Debug, Clone, Copy)]
pub struct RecodeRequest<'a> {
    /// Index in the manifest's `images` array.
    pub image: usize,
    /// Buffer view holding the image.
    pub view: usize,
    /// Declared media type, e.g. `image/png`.
    pub mime_type: &'a str,
    /// Encoded image bytes.
    pub data: &'a [u8],
}

impl RecodeRequest<'_> {
    /// File extension derived from the media subtype (`image/jpeg` -> `jpeg`).
    pub fn extension(&self) -> &str {
        self.mime_type
            .rsplit_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty())
            .unwrap_or("bin")
    }
}

/// Transforms one embedded image into its recoded form.
///
/// Implementations block until the transformation completes. Returning an
/// error aborts the whole rebuild.
pub trait RecodeInvoker {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Recode a single image.
    fn recode(&self, request: &RecodeRequest<'_>) -> Result<Replacement, BoxError>;
}

impl<T: RecodeInvoker + ?Sized> RecodeInvoker for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recode(&self, request: &RecodeRequest<'_>) -> Result<Replacement, BoxError> {
        (**self).recode(request)
    }
}

impl Replacement {
    /// Build an in-memory replacement.
    pub fn memory(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            length: data.len() as u64,
            source: ReplacementSource::Memory(data),
            mime_type: mime_type.into(),
        }
    }

    /// Build a file-backed replacement of known length.
    pub fn file(path: impl Into<PathBuf>, length: u64, mime_type: impl Into<String>) -> Self {
        Self {
            source: ReplacementSource::File(path.into()),
            length,
            mime_type: mime_type.into(),
        }
    }
}
