//! GLB container reading and writing.
//!
//! Chunk framing is delegated to `gltf::binary::Glb`; this module only moves
//! the manifest and the binary chunk in and out of it.

use crate::manifest::Manifest;
use crate::{Error, Result};
use gltf::binary::{Glb, Header};
use std::borrow::Cow;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// GLB header size (magic, version, length).
const HEADER_LEN: usize = 12;

/// Chunk header size (length, type).
const CHUNK_HEADER_LEN: usize = 8;

/// Parsed GLB: manifest plus the single binary chunk.
#[derive(Debug, Clone)]
pub struct GlbContainer {
    manifest: Manifest,
    bin: Vec<u8>,
}

impl GlbContainer {
    /// Build a container from already separated parts.
    pub fn new(manifest: Manifest, bin: Vec<u8>) -> Self {
        Self { manifest, bin }
    }

    /// Read and parse a GLB file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Self::from_slice(&bytes)
    }

    /// Parse a GLB held in memory.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let glb = Glb::from_slice(bytes)?;
        let manifest = Manifest::from_slice(&glb.json)?;
        let bin = glb
            .bin
            .map(Cow::into_owned)
            .ok_or_else(|| Error::unsupported("GLB has no BIN chunk"))?;
        Ok(Self { manifest, bin })
    }

    /// The manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The binary chunk, including any trailing chunk padding.
    pub fn bin(&self) -> &[u8] {
        &self.bin
    }

    /// Split into manifest and binary chunk.
    pub fn into_parts(self) -> (Manifest, Vec<u8>) {
        (self.manifest, self.bin)
    }

    /// Encode to GLB bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        encode_glb(&self.manifest, &self.bin)
    }

    /// Write to `path`; see [`write_container`].
    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        write_container(path.as_ref(), &self.manifest, &self.bin)
    }
}

/// Frame a manifest and binary chunk as GLB bytes.
pub fn encode_glb(manifest: &Manifest, bin: &[u8]) -> Result<Vec<u8>> {
    let json = manifest.to_vec()?;
    let length = HEADER_LEN
        + CHUNK_HEADER_LEN
        + align4(json.len())
        + CHUNK_HEADER_LEN
        + align4(bin.len());
    let length = u32::try_from(length)
        .map_err(|_| Error::Container(format!("{length} bytes exceeds the GLB size limit")))?;

    let glb = Glb {
        header: Header {
            magic: *b"glTF",
            version: 2,
            length,
        },
        json: Cow::Owned(json),
        bin: Some(Cow::Borrowed(bin)),
    };

    let mut out = Vec::with_capacity(length as usize);
    glb.to_writer(&mut out)?;
    Ok(out)
}

/// Write a GLB to `path`.
///
/// The bytes go to a temporary file next to `path` which then replaces it,
/// so a failure part-way leaves any previous file untouched and no truncated
/// output behind.
pub fn write_container(path: &Path, manifest: &Manifest, bin: &[u8]) -> Result<PathBuf> {
    let bytes = encode_glb(manifest, bin)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        writer.write_all(&bytes)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path.to_path_buf())
}

fn align4(len: usize) -> usize {
    (len + 3) & !3
}
