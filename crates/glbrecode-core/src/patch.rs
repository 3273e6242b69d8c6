//! Manifest patching.
//!
//! Brings the in-memory manifest in line with a rebuilt binary chunk and
//! declares the texture extension that points consumers at the recoded
//! images.

use crate::index::SHARED_BUFFER;
use crate::manifest::Manifest;
use crate::rebuild::RebuiltLayout;
use crate::Result;
use serde_json::json;
use std::collections::BTreeMap;

/// Extension declared for Basis Universal textures.
pub const DEFAULT_EXTENSION: &str = "MOZ_HUBS_texture_basis";

/// Media type written for recoded images.
pub const DEFAULT_MIME_TYPE: &str = "image/basis";

/// Counts of what a patch changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Buffer views whose offset or length was written.
    pub buffer_views: usize,
    /// Images whose media type was rewritten.
    pub images: usize,
    /// Textures that received the extension object.
    pub textures: usize,
    /// Whether the extension was newly declared.
    pub extension_added: bool,
}

/// Applies a [`RebuiltLayout`] and the recoding extension to a manifest.
#[derive(Debug, Clone)]
pub struct ManifestPatcher<'a> {
    extension: &'a str,
}

impl<'a> ManifestPatcher<'a> {
    /// Create a patcher declaring `extension`.
    pub fn new(extension: &'a str) -> Self {
        Self { extension }
    }

    /// Apply everything in one go.
    ///
    /// `recoded` maps image index to its new media type.
    pub fn patch(
        &self,
        manifest: &mut Manifest,
        layout: &RebuiltLayout,
        recoded: &BTreeMap<usize, String>,
    ) -> Result<PatchReport> {
        let mut report = PatchReport {
            buffer_views: self.apply_layout(manifest, layout)?,
            ..PatchReport::default()
        };

        for (&image, mime_type) in recoded {
            manifest.set_image_mime_type(image, mime_type)?;
            report.images += 1;
        }

        if !recoded.is_empty() {
            report.extension_added = self.declare_extension(manifest)?;
            report.textures = self.tag_textures(manifest, recoded)?;
        }

        tracing::debug!(
            "Patched manifest: {} buffer views, {} images, {} textures",
            report.buffer_views,
            report.images,
            report.textures
        );
        Ok(report)
    }

    /// Write new offsets/lengths for every buffer view and the buffer length.
    pub fn apply_layout(&self, manifest: &mut Manifest, layout: &RebuiltLayout) -> Result<usize> {
        for block in layout.blocks() {
            manifest.set_buffer_view_range(block.id, block.offset, block.length)?;
        }
        manifest.set_buffer_length(SHARED_BUFFER, layout.chunk_length)?;
        Ok(layout.blocks().len())
    }

    /// Add the extension to `extensionsUsed` and `extensionsRequired`.
    ///
    /// Returns `true` if either list changed.
    pub fn declare_extension(&self, manifest: &mut Manifest) -> Result<bool> {
        let used = manifest.add_extension_used(self.extension)?;
        let required = manifest.add_extension_required(self.extension)?;
        Ok(used || required)
    }

    /// Attach `{ "source": n }` under the extension to every texture whose
    /// source image was recoded.
    pub fn tag_textures(
        &self,
        manifest: &mut Manifest,
        recoded: &BTreeMap<usize, String>,
    ) -> Result<usize> {
        let mut tagged = 0;
        for (texture, source) in manifest.texture_sources().into_iter().enumerate() {
            let Some(source) = source.filter(|s| recoded.contains_key(s)) else {
                continue;
            };
            manifest.set_texture_extension(texture, self.extension, json!({ "source": source }))?;
            tagged += 1;
        }
        Ok(tagged)
    }
}

impl Default for ManifestPatcher<'static> {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BufferIndex;
    use crate::rebuild::BufferRebuilder;
    use crate::recode::Replacement;
    use serde_json::json;

    fn manifest() -> Manifest {
        Manifest::from_value(json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_materials_unlit"],
            "buffers": [{ "byteLength": 193 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 100 },
                { "buffer": 0, "byteOffset": 100, "byteLength": 53 },
                { "buffer": 0, "byteOffset": 153, "byteLength": 40 }
            ],
            "images": [
                { "bufferView": 0, "mimeType": "image/png" },
                { "bufferView": 2, "mimeType": "image/jpeg" }
            ],
            "textures": [
                { "source": 0, "sampler": 0 },
                { "source": 1 },
                { "source": 0 }
            ]
        }))
        .unwrap()
    }

    fn rebuilt(manifest: &Manifest) -> RebuiltLayout {
        let bin = vec![1u8; 193];
        let mut index = BufferIndex::from_manifest(manifest, 193).unwrap();
        index
            .mark_updated(0, Replacement::memory(vec![2; 37], DEFAULT_MIME_TYPE))
            .unwrap();
        BufferRebuilder::new(&index, &bin).rebuild_to_vec().unwrap().1
    }

    #[test]
    fn test_patch_applies_layout_and_extension() {
        let mut manifest = manifest();
        let layout = rebuilt(&manifest);
        let recoded = BTreeMap::from([(0, DEFAULT_MIME_TYPE.to_string())]);

        let report = ManifestPatcher::default()
            .patch(&mut manifest, &layout, &recoded)
            .unwrap();
        assert_eq!(report.buffer_views, 3);
        assert_eq!(report.images, 1);
        assert_eq!(report.textures, 2);
        assert!(report.extension_added);

        let json = manifest.as_value();
        assert_eq!(json["bufferViews"][0]["byteLength"], 37);
        assert_eq!(json["bufferViews"][1]["byteOffset"], 40);
        assert_eq!(json["bufferViews"][2]["byteOffset"], 93);
        assert_eq!(json["buffers"][0]["byteLength"], 136);
        assert_eq!(json["images"][0]["mimeType"], "image/basis");
        assert_eq!(json["images"][1]["mimeType"], "image/jpeg");
        assert_eq!(
            json["extensionsUsed"],
            json!(["KHR_materials_unlit", DEFAULT_EXTENSION])
        );
        assert_eq!(json["extensionsRequired"], json!([DEFAULT_EXTENSION]));
        assert_eq!(
            json["textures"][2]["extensions"][DEFAULT_EXTENSION],
            json!({ "source": 0 })
        );
        assert!(json["textures"][1].get("extensions").is_none());
        assert_eq!(json["textures"][0]["sampler"], 0);
    }

    #[test]
    fn test_declare_extension_is_idempotent() {
        let mut manifest = manifest();
        let patcher = ManifestPatcher::new("EXT_test");
        assert!(patcher.declare_extension(&mut manifest).unwrap());
        assert!(!patcher.declare_extension(&mut manifest).unwrap());
        assert_eq!(manifest.as_value()["extensionsRequired"], json!(["EXT_test"]));
    }

    #[test]
    fn test_nothing_recoded_leaves_extensions_alone() {
        let mut manifest = manifest();
        let layout = rebuilt(&manifest);
        let report = ManifestPatcher::default()
            .patch(&mut manifest, &layout, &BTreeMap::new())
            .unwrap();
        assert!(!report.extension_added);
        assert!(manifest.as_value().get("extensionsRequired").is_none());
    }
}
