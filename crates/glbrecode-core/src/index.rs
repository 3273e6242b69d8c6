//! Buffer view indexing.
//!
//! Validates the manifest's buffer views against the single shared buffer and
//! orders them by where they sit in the binary chunk.

use crate::manifest::{BufferViewDecl, Manifest};
use crate::recode::Replacement;
use crate::{Error, Result};

/// Index of the only buffer a rebuildable container may declare.
pub const SHARED_BUFFER: usize = 0;

/// One buffer view tracked through a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Buffer view id.
    pub id: usize,
    /// Buffer the view belongs to.
    pub buffer: usize,
    /// Offset in the original binary chunk.
    pub original_offset: u64,
    /// Length in the original binary chunk.
    pub original_length: u64,
    /// Recoded bytes, when the block was updated.
    pub replacement: Option<Replacement>,
}

impl BlockDescriptor {
    /// Whether a replacement has been recorded.
    pub fn is_updated(&self) -> bool {
        self.replacement.is_some()
    }

    /// First byte past the block in the original chunk.
    pub fn original_end(&self) -> u64 {
        self.original_offset + self.original_length
    }
}

/// How a gap between two blocks is explained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapKind {
    /// Bytes before a block that starts on a 4-byte boundary.
    AlignmentPadding,
    /// Bytes before a block that starts off a 4-byte boundary.
    Unexplained,
}

/// Bytes in the original chunk not covered by any block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// Block before the gap, `None` for a gap at the start of the chunk.
    pub after: Option<usize>,
    /// Block after the gap.
    pub before: usize,
    /// Offset of the first gap byte.
    pub offset: u64,
    /// Number of gap bytes.
    pub length: u64,
    /// Classification.
    pub kind: GapKind,
}

/// Validated buffer views in binary-chunk order.
#[derive(Debug, Clone)]
pub struct BufferIndex {
    descriptors: Vec<BlockDescriptor>,
    order: Vec<usize>,
    gaps: Vec<Gap>,
}

impl BufferIndex {
    /// Index the buffer views of `manifest` against a binary chunk of `bin_len` bytes.
    pub fn from_manifest(manifest: &Manifest, bin_len: u64) -> Result<Self> {
        let views = manifest.buffer_views()?;
        Self::build(manifest.buffer_count(), &views, bin_len)
    }

    /// Validate and order explicit buffer view declarations.
    pub fn build(buffer_count: usize, views: &[BufferViewDecl], bin_len: u64) -> Result<Self> {
        if buffer_count != 1 {
            return Err(Error::unsupported(format!(
                "GLB contains {buffer_count} buffers - only single buffer GLBs are supported"
            )));
        }
        if views.is_empty() {
            return Err(Error::unsupported("no buffer views found in the GLB"));
        }

        let mut descriptors = Vec::with_capacity(views.len());
        for (position, view) in views.iter().enumerate() {
            if view.id != position {
                return Err(Error::ordering(format!(
                    "buffer view id {} is declared at index {position}",
                    view.id
                )));
            }
            if view.buffer != SHARED_BUFFER {
                return Err(Error::ordering(format!(
                    "buffer view {} refers to buffer {}",
                    view.id, view.buffer
                )));
            }
            let end = view
                .byte_offset
                .checked_add(view.byte_length)
                .filter(|end| *end <= bin_len)
                .ok_or_else(|| {
                    Error::ordering(format!(
                        "buffer view {} ({} + {}) exceeds the {bin_len} byte binary chunk",
                        view.id, view.byte_offset, view.byte_length
                    ))
                })?;
            tracing::trace!(
                "BV #{} -> off: {}, len: {}, end: {}",
                view.id,
                view.byte_offset,
                view.byte_length,
                end
            );

            descriptors.push(BlockDescriptor {
                id: view.id,
                buffer: view.buffer,
                original_offset: view.byte_offset,
                original_length: view.byte_length,
                replacement: None,
            });
        }

        // Stable: equal offsets keep declaration order.
        let mut order: Vec<usize> = (0..descriptors.len()).collect();
        order.sort_by_key(|&id| descriptors[id].original_offset);

        let gaps = find_gaps(&descriptors, &order)?;

        tracing::debug!("Buffer view list in buffer order:");
        for id in &order {
            let block = &descriptors[*id];
            tracing::debug!(
                "  BV #{} -> off: {}, len: {}",
                block.id,
                block.original_offset,
                block.original_length
            );
        }
        for gap in &gaps {
            match gap.kind {
                GapKind::AlignmentPadding => tracing::debug!(
                    "BV #{} preceded by {} bytes of alignment padding",
                    gap.before,
                    gap.length
                ),
                GapKind::Unexplained => tracing::warn!(
                    "Gap of {} bytes found at offset {} before BV #{}",
                    gap.length,
                    gap.offset,
                    gap.before
                ),
            }
        }

        Ok(Self {
            descriptors,
            order,
            gaps,
        })
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> &[BlockDescriptor] {
        &self.descriptors
    }

    /// Look up a descriptor by id.
    pub fn descriptor(&self, id: usize) -> Option<&BlockDescriptor> {
        self.descriptors.get(id)
    }

    /// Block ids sorted by original offset.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Descriptors in binary-chunk order.
    pub fn ordered(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.order.iter().map(|&id| &self.descriptors[id])
    }

    /// Gaps between blocks, in chunk order.
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// Gap immediately preceding block `id`, if any.
    pub fn gap_before(&self, id: usize) -> Option<&Gap> {
        self.gaps.iter().find(|g| g.before == id)
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Always false for a validated index.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Number of blocks carrying a replacement.
    pub fn updated_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.is_updated()).count()
    }

    /// Original bytes of block `id`.
    pub fn original_bytes<'a>(&self, id: usize, bin: &'a [u8]) -> Result<&'a [u8]> {
        let block = self
            .descriptor(id)
            .ok_or_else(|| Error::ordering(format!("buffer view {id} does not exist")))?;
        bin.get(block.original_offset as usize..block.original_end() as usize)
            .ok_or_else(|| {
                Error::ordering(format!("buffer view {id} exceeds the binary chunk"))
            })
    }

    /// Record the replacement for block `id`.
    pub fn mark_updated(&mut self, id: usize, replacement: Replacement) -> Result<()> {
        let block = self
            .descriptors
            .get_mut(id)
            .ok_or_else(|| Error::ordering(format!("buffer view {id} does not exist")))?;
        block.replacement = Some(replacement);
        Ok(())
    }
}

fn find_gaps(descriptors: &[BlockDescriptor], order: &[usize]) -> Result<Vec<Gap>> {
    let mut gaps = Vec::new();
    let mut cursor = 0u64;
    let mut previous: Option<&BlockDescriptor> = None;

    for &id in order {
        let block = &descriptors[id];
        if block.original_offset < cursor {
            // Only reachable when a previous block exists.
            let prev = previous.map(|p| p.id).unwrap_or_default();
            return Err(Error::ordering(format!(
                "buffer view {} (offset {}) overlaps buffer view {prev} ending at {cursor}",
                block.id, block.original_offset
            )));
        }
        if block.original_offset > cursor {
            let length = block.original_offset - cursor;
            let kind = if block.original_offset % 4 == 0 {
                GapKind::AlignmentPadding
            } else {
                GapKind::Unexplained
            };
            gaps.push(Gap {
                after: previous.map(|p| p.id),
                before: block.id,
                offset: cursor,
                length,
                kind,
            });
        }
        cursor = block.original_end();
        previous = Some(block);
    }

    Ok(gaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn view(id: usize, offset: u64, length: u64) -> BufferViewDecl {
        BufferViewDecl {
            id,
            buffer: SHARED_BUFFER,
            byte_offset: offset,
            byte_length: length,
        }
    }

    #[test]
    fn test_rejects_multiple_buffers() {
        let err = BufferIndex::build(2, &[view(0, 0, 4)], 4).unwrap_err();
        assert_matches!(err, Error::UnsupportedLayout(_));
        let err = BufferIndex::build(0, &[view(0, 0, 4)], 4).unwrap_err();
        assert_matches!(err, Error::UnsupportedLayout(_));
    }

    #[test]
    fn test_rejects_empty() {
        let err = BufferIndex::build(1, &[], 0).unwrap_err();
        assert_matches!(err, Error::UnsupportedLayout(_));
    }

    #[test]
    fn test_rejects_misordered_ids() {
        let err = BufferIndex::build(1, &[view(0, 0, 4), view(2, 4, 4)], 8).unwrap_err();
        assert_matches!(err, Error::Ordering(msg) if msg.contains("index 1"));
    }

    #[test]
    fn test_rejects_foreign_buffer() {
        let mut second = view(1, 4, 4);
        second.buffer = 1;
        let err = BufferIndex::build(1, &[view(0, 0, 4), second], 8).unwrap_err();
        assert_matches!(err, Error::Ordering(_));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = BufferIndex::build(1, &[view(0, 0, 12)], 8).unwrap_err();
        assert_matches!(err, Error::Ordering(_));
        let err = BufferIndex::build(1, &[view(0, u64::MAX, 2)], 8).unwrap_err();
        assert_matches!(err, Error::Ordering(_));
    }

    #[test]
    fn test_rejects_overlap() {
        let err = BufferIndex::build(1, &[view(0, 0, 8), view(1, 4, 8)], 16).unwrap_err();
        assert_matches!(err, Error::Ordering(msg) if msg.contains("overlaps"));
    }

    #[test]
    fn test_orders_by_offset() {
        let views = [view(0, 100, 53), view(1, 0, 100), view(2, 153, 40)];
        let index = BufferIndex::build(1, &views, 193).unwrap();
        assert_eq!(index.order(), &[1, 0, 2]);
        assert!(index.gaps().is_empty());
    }

    #[test]
    fn test_equal_offsets_keep_declaration_order() {
        let views = [view(0, 8, 0), view(1, 0, 8), view(2, 8, 4), view(3, 12, 0)];
        let index = BufferIndex::build(1, &views, 12).unwrap();
        assert_eq!(index.order(), &[1, 0, 2, 3]);
    }

    #[test]
    fn test_classifies_gaps() {
        // 0..10, pad to 12, 12..17, stray bytes to 19
        let views = [view(0, 0, 10), view(1, 12, 5), view(2, 19, 1)];
        let index = BufferIndex::build(1, &views, 20).unwrap();
        let gaps = index.gaps();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].kind, GapKind::AlignmentPadding);
        assert_eq!(gaps[0].length, 2);
        assert_eq!(gaps[0].after, Some(0));
        assert_eq!(gaps[1].kind, GapKind::Unexplained);
        assert_eq!(gaps[1].offset, 17);
        assert_eq!(index.gap_before(2).map(|g| g.length), Some(2));
    }

    #[test]
    fn test_wide_gap_before_aligned_block_is_padding() {
        let index = BufferIndex::build(1, &[view(0, 0, 10), view(1, 16, 4)], 20).unwrap();
        let gap = index.gap_before(1).unwrap();
        assert_eq!(gap.length, 6);
        assert_eq!(gap.kind, GapKind::AlignmentPadding);
    }

    #[test]
    fn test_leading_gap() {
        let index = BufferIndex::build(1, &[view(0, 8, 4)], 12).unwrap();
        let gap = index.gap_before(0).unwrap();
        assert_eq!(gap.after, None);
        assert_eq!(gap.offset, 0);
        assert_eq!(gap.length, 8);
        assert_eq!(gap.kind, GapKind::AlignmentPadding);
    }

    #[test]
    fn test_mark_updated() {
        let mut index = BufferIndex::build(1, &[view(0, 0, 4), view(1, 4, 4)], 8).unwrap();
        index
            .mark_updated(1, Replacement::memory(vec![0; 3], "image/basis"))
            .unwrap();
        assert!(index.descriptor(1).unwrap().is_updated());
        assert_eq!(index.updated_count(), 1);
        assert!(index
            .mark_updated(7, Replacement::memory(vec![], "image/basis"))
            .is_err());
    }

    #[test]
    fn test_original_bytes() {
        let bin: Vec<u8> = (0..8).collect();
        let index = BufferIndex::build(1, &[view(0, 0, 4), view(1, 4, 4)], 8).unwrap();
        assert_eq!(index.original_bytes(1, &bin).unwrap(), &[4, 5, 6, 7]);
    }
}
