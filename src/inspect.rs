//! Read-only view of a GLB's buffer layout.

use anyhow::{Context, Result};
use glbrecode_core::{BufferIndex, GapKind, GlbContainer, SHARED_BUFFER};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub file: PathBuf,
    pub bin_length: u64,
    /// `buffers[0].byteLength` as declared in the manifest.
    pub buffer_length: Option<u64>,
    pub buffers: usize,
    pub buffer_views: usize,
    pub textures: usize,
    pub images: Vec<ImageEntry>,
    /// Blocks in binary chunk order.
    pub blocks: Vec<BlockEntry>,
    pub gaps: Vec<GapEntry>,
    pub extensions_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageEntry {
    pub index: usize,
    pub buffer_view: Option<usize>,
    pub mime_type: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockEntry {
    pub id: usize,
    pub offset: u64,
    pub length: u64,
    /// Images stored in this block.
    pub images: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GapEntry {
    pub after: Option<usize>,
    pub before: usize,
    pub offset: u64,
    pub length: u64,
    pub kind: &'static str,
}

/// Parse `path` and describe its layout.
pub fn inspect(path: &Path) -> Result<InspectReport> {
    let container =
        GlbContainer::open(path).with_context(|| format!("Failed to read GLB: {:?}", path))?;
    let manifest = container.manifest();
    let index = BufferIndex::from_manifest(manifest, container.bin().len() as u64)
        .with_context(|| format!("Unsupported buffer layout in {:?}", path))?;

    let images: Vec<ImageEntry> = manifest
        .images()?
        .into_iter()
        .map(|image| ImageEntry {
            index: image.index,
            buffer_view: image.buffer_view,
            mime_type: image.mime_type,
            uri: image.uri,
        })
        .collect();

    let blocks = index
        .ordered()
        .map(|block| BlockEntry {
            id: block.id,
            offset: block.original_offset,
            length: block.original_length,
            images: images
                .iter()
                .filter(|i| i.buffer_view == Some(block.id))
                .map(|i| i.index)
                .collect(),
        })
        .collect();

    let gaps = index
        .gaps()
        .iter()
        .map(|gap| GapEntry {
            after: gap.after,
            before: gap.before,
            offset: gap.offset,
            length: gap.length,
            kind: match gap.kind {
                GapKind::AlignmentPadding => "alignment",
                GapKind::Unexplained => "unexplained",
            },
        })
        .collect();

    let extensions_used = manifest
        .as_value()
        .get("extensionsUsed")
        .and_then(|v| v.as_array())
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(InspectReport {
        file: path.to_path_buf(),
        bin_length: container.bin().len() as u64,
        buffer_length: manifest.buffer_length(SHARED_BUFFER),
        buffers: manifest.buffer_count(),
        buffer_views: index.len(),
        textures: manifest.texture_count(),
        images,
        blocks,
        gaps,
        extensions_used,
    })
}

/// Print a human readable report.
pub fn print_report(report: &InspectReport) {
    println!("File: {}", report.file.display());
    println!("BIN chunk: {} bytes", report.bin_length);
    match report.buffer_length {
        Some(length) if length != report.bin_length => {
            println!("Declared buffer length: {} bytes (differs)", length)
        }
        Some(_) => {}
        None => println!("Declared buffer length: missing"),
    }
    println!("Buffers: {}", report.buffers);
    println!("Buffer views: {}", report.buffer_views);
    println!("Textures: {}", report.textures);
    if !report.extensions_used.is_empty() {
        println!("Extensions: {}", report.extensions_used.join(", "));
    }

    println!("\nImages: {}", report.images.len());
    for image in &report.images {
        print!("  [{}]", image.index);
        match (image.buffer_view, &image.uri) {
            (Some(view), _) => print!(" BV #{}", view),
            (None, Some(uri)) => print!(" uri {}", uri),
            (None, None) => print!(" (no source)"),
        }
        if let Some(ref mime) = image.mime_type {
            print!(" {}", mime);
        }
        println!();
    }

    println!("\nBuffer order:");
    for block in &report.blocks {
        if let Some(gap) = report.gaps.iter().find(|g| g.before == block.id) {
            println!("    ({} gap of {} bytes)", gap.kind, gap.length);
        }
        print!(
            "  BV #{:<4} off: {:<10} len: {}",
            block.id, block.offset, block.length
        );
        if !block.images.is_empty() {
            let images: Vec<String> = block.images.iter().map(|i| i.to_string()).collect();
            print!("  [image {}]", images.join(", "));
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glbrecode_core::Manifest;
    use serde_json::json;

    #[test]
    fn test_inspect_reports_order_and_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.glb");
        let manifest = Manifest::from_value(json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_materials_unlit"],
            "buffers": [{ "byteLength": 32 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 21, "byteLength": 11 },
                { "buffer": 0, "byteOffset": 0, "byteLength": 6 },
                { "buffer": 0, "byteOffset": 8, "byteLength": 4 }
            ],
            "images": [{ "bufferView": 0, "mimeType": "image/png" }, { "uri": "a.jpg" }],
            "textures": [{ "source": 0 }]
        }))
        .unwrap();
        GlbContainer::new(manifest, vec![0; 32]).write(&path).unwrap();

        let report = inspect(&path).unwrap();
        assert_eq!(report.buffer_views, 3);
        assert_eq!(report.buffer_length, Some(32));
        let order: Vec<usize> = report.blocks.iter().map(|b| b.id).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(report.blocks[2].images, vec![0]);
        assert_eq!(report.extensions_used, vec!["KHR_materials_unlit"]);

        let kinds: Vec<(usize, &str)> = report.gaps.iter().map(|g| (g.before, g.kind)).collect();
        assert_eq!(kinds, vec![(2, "alignment"), (0, "unexplained")]);
    }
}
