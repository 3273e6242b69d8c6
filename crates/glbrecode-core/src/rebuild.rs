//! Binary chunk rebuilding.
//!
//! Walks the blocks in chunk order, streaming either the original bytes or
//! the recorded replacement, and computes where every block lands.
//!
//! ```text
//! original:  [ BV1 ........ ][ BV0 ...... ][pad][ BV2 ... ]
//! rebuilt:   [ BV1 ........ ][ BV0' ][p][ BV2 ... ]
//!                                    ^ replacement padded to 4 bytes
//! ```
//!
//! Each block's new offset is its original offset plus a running signed
//! adjustment. An updated block adds `(new_len - old_len) + pad` to the
//! adjustment. Bytes between blocks are carried over verbatim while the
//! stream is still in step with the original. Once the stream has shifted,
//! a block that originally started on a 4-byte boundary is realigned with
//! fresh zero padding instead; the difference also goes into the adjustment.

use crate::index::BufferIndex;
use crate::recode::{Replacement, ReplacementSource};
use crate::{Error, Result};
use std::fs::File;
use std::io::{self, Read, Write};

/// Chunk alignment required by the GLB container.
pub const CHUNK_ALIGNMENT: u64 = 4;

const ZEROS: [u8; 4] = [0; 4];

/// Zero bytes needed to bring `len` up to a multiple of 4.
#[inline]
pub fn pad_len(len: u64) -> u64 {
    (CHUNK_ALIGNMENT - len % CHUNK_ALIGNMENT) % CHUNK_ALIGNMENT
}

/// Where a block ended up in the rebuilt chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// Buffer view id.
    pub id: usize,
    /// New byte offset.
    pub offset: u64,
    /// New byte length.
    pub length: u64,
    /// Zero bytes written after a replacement.
    pub padding: u64,
    /// Whether the bytes came from a replacement.
    pub updated: bool,
}

impl BlockLayout {
    /// First byte past the block (excluding padding).
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Result of a rebuild pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuiltLayout {
    blocks: Vec<BlockLayout>,
    /// Total bytes written, including trailing padding.
    pub chunk_length: u64,
    /// Offset adjustment after the last block.
    pub offset_adjustment: i64,
}

impl RebuiltLayout {
    /// Layouts in buffer view id order.
    pub fn blocks(&self) -> &[BlockLayout] {
        &self.blocks
    }

    /// Layout of one buffer view.
    pub fn block(&self, id: usize) -> Option<&BlockLayout> {
        self.blocks.get(id)
    }
}

/// Streams a rebuilt binary chunk for a validated [`BufferIndex`].
pub struct BufferRebuilder<'a> {
    index: &'a BufferIndex,
    original: &'a [u8],
}

impl<'a> BufferRebuilder<'a> {
    /// Create a rebuilder over the original binary chunk.
    pub fn new(index: &'a BufferIndex, original: &'a [u8]) -> Self {
        Self { index, original }
    }

    /// Rebuild into an in-memory buffer.
    pub fn rebuild_to_vec(&self) -> Result<(Vec<u8>, RebuiltLayout)> {
        let mut out = Vec::with_capacity(self.original.len());
        let layout = self.rebuild(&mut out)?;
        Ok((out, layout))
    }

    /// Stream the rebuilt chunk into `out`.
    ///
    /// Stops at the first read or write failure; `out` may then hold a
    /// partial chunk.
    pub fn rebuild<W: Write>(&self, out: W) -> Result<RebuiltLayout> {
        let mut out = PositionedWriter::new(out);
        let mut layouts: Vec<Option<BlockLayout>> = vec![None; self.index.len()];
        let mut adjustment: i64 = 0;
        let mut cursor = 0u64;

        for block in self.index.ordered() {
            let gap = block.original_offset - cursor;
            if gap > 0 || adjustment != 0 {
                let written = if out.position() == cursor {
                    out.write_all(self.slice(cursor, gap)?)?;
                    gap
                } else if block.original_offset % CHUNK_ALIGNMENT == 0 {
                    let pad = pad_len(out.position());
                    write_zeros(&mut out, pad)?;
                    pad
                } else {
                    out.write_all(self.slice(cursor, gap)?)?;
                    gap
                };
                if written != gap {
                    tracing::debug!(
                        "BV #{} realigned: {} gap bytes replaced by {}",
                        block.id,
                        gap,
                        written
                    );
                    adjustment += written as i64 - gap as i64;
                }
            }

            let new_offset = shifted(block.original_offset, adjustment)?;
            if new_offset != out.position() {
                return Err(Error::Layout(format!(
                    "BV #{} computed at offset {new_offset} but stream is at {}",
                    block.id,
                    out.position()
                )));
            }

            let layout = match &block.replacement {
                Some(replacement) => {
                    copy_replacement(replacement, &mut out)?;
                    let padding = pad_len(replacement.length);
                    write_zeros(&mut out, padding)?;
                    adjustment += (replacement.length as i64 - block.original_length as i64)
                        + padding as i64;
                    tracing::debug!(
                        "BV #{} - wrote {} recoded bytes (+{} pad) at {} - write_ptr={}",
                        block.id,
                        replacement.length,
                        padding,
                        new_offset,
                        out.position()
                    );
                    BlockLayout {
                        id: block.id,
                        offset: new_offset,
                        length: replacement.length,
                        padding,
                        updated: true,
                    }
                }
                None => {
                    out.write_all(self.slice(block.original_offset, block.original_length)?)?;
                    tracing::trace!(
                        "BV #{} - copied {} bytes to {} - write_ptr={}",
                        block.id,
                        block.original_length,
                        new_offset,
                        out.position()
                    );
                    BlockLayout {
                        id: block.id,
                        offset: new_offset,
                        length: block.original_length,
                        padding: 0,
                        updated: false,
                    }
                }
            };
            layouts[block.id] = Some(layout);
            cursor = block.original_end();
        }

        let trailing = self.original.len() as u64 - cursor.min(self.original.len() as u64);
        if trailing > 0 {
            tracing::debug!("Dropping {} trailing bytes not covered by any BV", trailing);
        }
        let tail = pad_len(out.position());
        write_zeros(&mut out, tail)?;
        out.flush()?;

        let blocks = layouts
            .into_iter()
            .enumerate()
            .map(|(id, layout)| {
                layout.ok_or_else(|| Error::Layout(format!("BV #{id} was never written")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RebuiltLayout {
            blocks,
            chunk_length: out.position(),
            offset_adjustment: adjustment,
        })
    }

    fn slice(&self, offset: u64, length: u64) -> Result<&'a [u8]> {
        let original = self.original;
        original
            .get(offset as usize..(offset + length) as usize)
            .ok_or_else(|| {
                Error::Layout(format!(
                    "range {offset}+{length} exceeds the {} byte binary chunk",
                    original.len()
                ))
            })
    }
}

fn shifted(offset: u64, adjustment: i64) -> Result<u64> {
    offset
        .checked_add_signed(adjustment)
        .ok_or_else(|| Error::Layout(format!("offset {offset} shifted by {adjustment} is negative")))
}

fn write_zeros<W: Write>(out: &mut W, count: u64) -> io::Result<()> {
    out.write_all(&ZEROS[..count as usize])
}

fn copy_replacement<W: Write>(replacement: &Replacement, out: &mut W) -> Result<()> {
    let copied = match &replacement.source {
        ReplacementSource::Memory(data) => {
            if data.len() as u64 != replacement.length {
                return Err(length_mismatch(data.len() as u64, replacement.length).into());
            }
            out.write_all(data)?;
            data.len() as u64
        }
        ReplacementSource::File(path) => {
            let file = File::open(path).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("cannot open replacement {}: {e}", path.display()),
                )
            })?;
            let on_disk = file.metadata()?.len();
            if on_disk != replacement.length {
                return Err(length_mismatch(on_disk, replacement.length).into());
            }
            io::copy(&mut file.take(replacement.length), out)?
        }
    };

    if copied != replacement.length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "replacement ended after {copied} of {} bytes",
                replacement.length
            ),
        )
        .into());
    }
    Ok(())
}

fn length_mismatch(actual: u64, expected: u64) -> io::Error {
    let kind = if actual < expected {
        io::ErrorKind::UnexpectedEof
    } else {
        io::ErrorKind::InvalidData
    };
    io::Error::new(
        kind,
        format!("replacement holds {actual} bytes, expected {expected}"),
    )
}

/// Writer that counts the bytes passed through it.
struct PositionedWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> PositionedWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    fn position(&self) -> u64 {
        self.position
    }
}

impl<W: Write> Write for PositionedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
