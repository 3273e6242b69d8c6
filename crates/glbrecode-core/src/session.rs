//! One rebuild, start to finish.
//!
//! A [`RebuildSession`] owns the manifest, the original binary chunk and the
//! buffer index for a single run: index, recode every embedded image, rebuild
//! the binary chunk, patch the manifest. Nothing is written until the very
//! end, so a recoding failure leaves no output behind.

use crate::container::{write_container, GlbContainer};
use crate::index::BufferIndex;
use crate::manifest::Manifest;
use crate::patch::{ManifestPatcher, PatchReport, DEFAULT_EXTENSION, DEFAULT_MIME_TYPE};
use crate::rebuild::{BufferRebuilder, RebuiltLayout};
use crate::recode::{RecodeInvoker, RecodeRequest};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings for a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Extension declared in the output manifest.
    pub extension: String,
    /// Media type of recoded images; images already of this type are skipped.
    pub mime_type: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }
}

/// An image whose buffer view was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecodedImage {
    pub image: usize,
    pub view: usize,
    pub original_length: u64,
    pub replacement_length: u64,
    pub mime_type: String,
}

/// What the recoding stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecodeSummary {
    /// Images recoded, one per buffer view.
    pub recoded: Vec<RecodedImage>,
    /// Images that reuse a buffer view recoded for an earlier image.
    pub shared: usize,
    /// Images left alone (external URI or already recoded).
    pub skipped: usize,
}

impl RecodeSummary {
    /// Total bytes of the replaced views before recoding.
    pub fn bytes_before(&self) -> u64 {
        self.recoded.iter().map(|r| r.original_length).sum()
    }

    /// Total bytes of the replacements.
    pub fn bytes_after(&self) -> u64 {
        self.recoded.iter().map(|r| r.replacement_length).sum()
    }
}

/// A rebuilt container that has not been written yet.
#[derive(Debug, Clone)]
pub struct RebuildOutput {
    pub manifest: Manifest,
    pub bin: Vec<u8>,
    pub layout: RebuiltLayout,
    pub patch: PatchReport,
}

impl RebuildOutput {
    /// Write the container to `path`.
    pub fn write(&self, path: &Path) -> Result<PathBuf> {
        write_container(path, &self.manifest, &self.bin)
    }
}

/// Outcome of [`recode_file`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub summary: RecodeSummary,
    pub patch: PatchReport,
    pub original_chunk_length: u64,
    pub chunk_length: u64,
}

/// State for a single rebuild.
pub struct RebuildSession {
    manifest: Manifest,
    bin: Vec<u8>,
    index: BufferIndex,
    options: SessionOptions,
    /// Image index -> recoded media type.
    recoded: BTreeMap<usize, String>,
    summary: RecodeSummary,
}

impl RebuildSession {
    /// Start a session, validating the container's buffer views.
    pub fn new(container: GlbContainer, options: SessionOptions) -> Result<Self> {
        let (manifest, bin) = container.into_parts();
        let index = BufferIndex::from_manifest(&manifest, bin.len() as u64)?;
        tracing::info!(
            "Buffer count: {}, buffer views: {}, images: {}, textures: {}",
            manifest.buffer_count(),
            index.len(),
            manifest.images()?.len(),
            manifest.texture_count()
        );

        Ok(Self {
            manifest,
            bin,
            index,
            options,
            recoded: BTreeMap::new(),
            summary: RecodeSummary::default(),
        })
    }

    /// The validated buffer index.
    pub fn index(&self) -> &BufferIndex {
        &self.index
    }

    /// The manifest as loaded.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// What recoding has done so far.
    pub fn summary(&self) -> &RecodeSummary {
        &self.summary
    }

    /// Recode every embedded image, one at a time.
    ///
    /// The first failure aborts the session.
    pub fn recode_images<R: RecodeInvoker + ?Sized>(&mut self, invoker: &R) -> Result<&RecodeSummary> {
        let images = self.manifest.images()?;
        tracing::info!(
            "Found {} images to re-encode with {}",
            images.len(),
            invoker.name()
        );

        let mut views_done: BTreeMap<usize, String> = BTreeMap::new();

        for image in &images {
            let Some(view) = image.buffer_view else {
                tracing::warn!(
                    "Image {} is not embedded ({}), skipping",
                    image.index,
                    image.uri.as_deref().unwrap_or("no uri")
                );
                self.summary.skipped += 1;
                continue;
            };
            let mime_type = image.mime_type.as_deref().ok_or_else(|| {
                Error::manifest(format!("images[{}] is embedded but has no mimeType", image.index))
            })?;
            if mime_type == self.options.mime_type {
                tracing::info!("Image {} is already {}, skipping", image.index, mime_type);
                self.summary.skipped += 1;
                continue;
            }
            if let Some(done) = views_done.get(&view) {
                tracing::debug!("Image {} shares already recoded BV #{}", image.index, view);
                self.recoded.insert(image.index, done.clone());
                self.summary.shared += 1;
                continue;
            }

            let data = self.index.original_bytes(view, &self.bin)?;
            tracing::info!(
                "Re-encoding image {} ({}), BV #{} -> {} bytes",
                image.index,
                mime_type,
                view,
                data.len()
            );

            let request = RecodeRequest {
                image: image.index,
                view,
                mime_type,
                data,
            };
            let replacement = invoker
                .recode(&request)
                .map_err(|source| Error::RecodeFailure {
                    image: image.index,
                    view,
                    source,
                })?;

            tracing::info!(
                "Image {} recoded to {}: {} -> {} bytes",
                image.index,
                replacement.mime_type,
                data.len(),
                replacement.length
            );
            self.summary.recoded.push(RecodedImage {
                image: image.index,
                view,
                original_length: data.len() as u64,
                replacement_length: replacement.length,
                mime_type: replacement.mime_type.clone(),
            });
            self.recoded.insert(image.index, replacement.mime_type.clone());
            views_done.insert(view, replacement.mime_type.clone());
            self.index.mark_updated(view, replacement)?;
        }

        Ok(&self.summary)
    }

    /// Rebuild the binary chunk and patch the manifest.
    pub fn rebuild(self) -> Result<RebuildOutput> {
        let (bin, layout) = BufferRebuilder::new(&self.index, &self.bin).rebuild_to_vec()?;
        tracing::info!(
            "Rebuilt binary chunk: {} -> {} bytes",
            self.bin.len(),
            layout.chunk_length
        );

        let mut manifest = self.manifest;
        let patch =
            ManifestPatcher::new(&self.options.extension).patch(&mut manifest, &layout, &self.recoded)?;

        Ok(RebuildOutput {
            manifest,
            bin,
            layout,
            patch,
        })
    }
}

/// Recode `input` into `output` in one call.
pub fn recode_file<R: RecodeInvoker + ?Sized>(
    input: &Path,
    output: &Path,
    invoker: &R,
    options: SessionOptions,
) -> Result<RunReport> {
    tracing::info!("Processing GLB at {}", input.display());
    let container = GlbContainer::open(input)?;
    let original_chunk_length = container.bin().len() as u64;

    let mut session = RebuildSession::new(container, options)?;
    session.recode_images(invoker)?;
    let summary = session.summary().clone();

    let rebuilt = session.rebuild()?;
    let output = rebuilt.write(output)?;

    Ok(RunReport {
        output,
        summary,
        patch: rebuilt.patch,
        original_chunk_length,
        chunk_length: rebuilt.layout.chunk_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recode::Replacement;
    use crate::BoxError;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::cell::Cell;

    struct FixedLength {
        length: usize,
        calls: Cell<usize>,
    }

    impl RecodeInvoker for FixedLength {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recode(&self, request: &RecodeRequest<'_>) -> std::result::Result<Replacement, BoxError> {
            self.calls.set(self.calls.get() + 1);
            let byte = request.view as u8 + 0xA0;
            Ok(Replacement::memory(vec![byte; self.length], DEFAULT_MIME_TYPE))
        }
    }

    struct AlwaysFails;

    impl RecodeInvoker for AlwaysFails {
        fn name(&self) -> &str {
            "fails"
        }

        fn recode(&self, _: &RecodeRequest<'_>) -> std::result::Result<Replacement, BoxError> {
            Err("encoder produced no output".into())
        }
    }

    fn container() -> GlbContainer {
        let manifest = Manifest::from_value(json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 193 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 100 },
                { "buffer": 0, "byteOffset": 100, "byteLength": 53 },
                { "buffer": 0, "byteOffset": 153, "byteLength": 40 }
            ],
            "images": [
                { "bufferView": 0, "mimeType": "image/png" },
                { "uri": "outside.png" },
                { "bufferView": 0, "mimeType": "image/png" }
            ],
            "textures": [{ "source": 0 }, { "source": 1 }, { "source": 2 }]
        }))
        .unwrap();
        GlbContainer::new(manifest, (0..193u32).map(|i| i as u8).collect())
    }

    #[test]
    fn test_session_recodes_and_patches() {
        let invoker = FixedLength {
            length: 37,
            calls: Cell::new(0),
        };
        let mut session = RebuildSession::new(container(), SessionOptions::default()).unwrap();
        let summary = session.recode_images(&invoker).unwrap().clone();

        assert_eq!(invoker.calls.get(), 1);
        assert_eq!(summary.recoded.len(), 1);
        assert_eq!(summary.shared, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.bytes_before(), 100);
        assert_eq!(summary.bytes_after(), 37);

        let output = session.rebuild().unwrap();
        let json = output.manifest.as_value();
        assert_eq!(json["bufferViews"][1]["byteOffset"], 40);
        assert_eq!(json["bufferViews"][2]["byteOffset"], 93);
        assert_eq!(json["images"][2]["mimeType"], DEFAULT_MIME_TYPE);
        assert_eq!(json["images"][1].get("mimeType"), None);
        assert_eq!(output.patch.textures, 2);
        assert_eq!(output.bin.len() % 4, 0);
        assert_eq!(&output.bin[40..93], &container().bin()[100..153]);
    }

    #[test]
    fn test_failure_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.glb");
        let output = dir.path().join("out.glb");
        container().write(&input).unwrap();

        let err = recode_file(&input, &output, &AlwaysFails, SessionOptions::default()).unwrap_err();
        assert_matches!(err, Error::RecodeFailure { image: 0, view: 0, .. });
        assert!(err.to_string().contains("encoder produced no output"));
        assert!(!output.exists());
    }

    #[test]
    fn test_already_recoded_images_are_skipped() {
        let invoker = FixedLength {
            length: 8,
            calls: Cell::new(0),
        };
        let options = SessionOptions {
            mime_type: "image/png".to_string(),
            ..SessionOptions::default()
        };
        let mut session = RebuildSession::new(container(), options).unwrap();
        let summary = session.recode_images(&invoker).unwrap();
        assert_eq!(invoker.calls.get(), 0);
        assert_eq!(summary.skipped, 3);

        let output = session.rebuild().unwrap();
        assert!(output.manifest.as_value().get("extensionsUsed").is_none());
    }

    #[test]
    fn test_embedded_image_without_mime_type() {
        let manifest = Manifest::from_value(json!({
            "buffers": [{ "byteLength": 4 }],
            "bufferViews": [{ "buffer": 0, "byteLength": 4 }],
            "images": [{ "bufferView": 0 }]
        }))
        .unwrap();
        let mut session =
            RebuildSession::new(GlbContainer::new(manifest, vec![0; 4]), SessionOptions::default())
                .unwrap();
        let invoker = FixedLength {
            length: 4,
            calls: Cell::new(0),
        };
        assert_matches!(session.recode_images(&invoker), Err(Error::Manifest(_)));
    }
}
