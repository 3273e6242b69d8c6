//! In-memory glTF manifest.
//!
//! The JSON chunk is held as a `serde_json::Value` tree so that fields this
//! crate does not understand survive a rebuild untouched. All writes go
//! through [`Manifest`] methods.

use crate::{Error, Result};
use serde_json::{Map, Value};

/// A `bufferViews` entry as declared in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferViewDecl {
    /// Declared id (positional index in the `bufferViews` array).
    pub id: usize,
    /// Index of the buffer the view refers to.
    pub buffer: usize,
    /// Byte offset into the buffer.
    pub byte_offset: u64,
    /// Byte length of the view.
    pub byte_length: u64,
}

/// An `images` entry as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDecl {
    /// Positional index in the `images` array.
    pub index: usize,
    /// Buffer view holding the encoded image, if embedded.
    pub buffer_view: Option<usize>,
    /// Declared media type.
    pub mime_type: Option<String>,
    /// External URI, if the image is not embedded.
    pub uri: Option<String>,
}

/// Owned, mutable glTF manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    root: Value,
}

impl Manifest {
    /// Parse a manifest from the bytes of a JSON chunk.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let root: Value = serde_json::from_slice(bytes)?;
        Self::from_value(root)
    }

    /// Wrap an already parsed JSON value.
    pub fn from_value(root: Value) -> Result<Self> {
        if !root.is_object() {
            return Err(Error::manifest("top-level JSON value is not an object"));
        }
        Ok(Self { root })
    }

    /// Borrow the underlying JSON tree.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Consume the manifest, returning the JSON tree.
    pub fn into_value(self) -> Value {
        self.root
    }

    /// Serialize to compact JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.root)?)
    }

    /// Number of entries in `buffers`.
    pub fn buffer_count(&self) -> usize {
        self.array("buffers").len()
    }

    /// Number of entries in `textures`.
    pub fn texture_count(&self) -> usize {
        self.array("textures").len()
    }

    /// Declared byte length of a buffer.
    pub fn buffer_length(&self, index: usize) -> Option<u64> {
        self.array("buffers")
            .get(index)
            .and_then(|b| b.get("byteLength"))
            .and_then(Value::as_u64)
    }

    /// Parse every `bufferViews` entry.
    ///
    /// A missing `byteOffset` defaults to 0. A missing `buffer` or
    /// `byteLength` is an error.
    pub fn buffer_views(&self) -> Result<Vec<BufferViewDecl>> {
        self.array("bufferViews")
            .iter()
            .enumerate()
            .map(|(id, view)| {
                let buffer = required_index(view, "buffer")
                    .ok_or_else(|| Error::manifest(format!("bufferViews[{id}] has no buffer")))?;
                let byte_length = view
                    .get("byteLength")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        Error::manifest(format!("bufferViews[{id}] has no byteLength"))
                    })?;
                let byte_offset = match view.get("byteOffset") {
                    None => 0,
                    Some(v) => v.as_u64().ok_or_else(|| {
                        Error::manifest(format!("bufferViews[{id}] has a non-integer byteOffset"))
                    })?,
                };
                Ok(BufferViewDecl {
                    id,
                    buffer,
                    byte_offset,
                    byte_length,
                })
            })
            .collect()
    }

    /// Parse every `images` entry.
    pub fn images(&self) -> Result<Vec<ImageDecl>> {
        self.array("images")
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let buffer_view = match image.get("bufferView") {
                    None => None,
                    Some(v) => Some(v.as_u64().map(|v| v as usize).ok_or_else(|| {
                        Error::manifest(format!("images[{index}] has a non-integer bufferView"))
                    })?),
                };
                Ok(ImageDecl {
                    index,
                    buffer_view,
                    mime_type: image
                        .get("mimeType")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    uri: image.get("uri").and_then(Value::as_str).map(str::to_string),
                })
            })
            .collect()
    }

    /// The `source` image of every texture, in texture order.
    pub fn texture_sources(&self) -> Vec<Option<usize>> {
        self.array("textures")
            .iter()
            .map(|t| required_index(t, "source"))
            .collect()
    }

    /// Overwrite a buffer view's offset and length.
    pub fn set_buffer_view_range(&mut self, id: usize, offset: u64, length: u64) -> Result<()> {
        let view = self.entry_mut("bufferViews", id)?;
        view.insert("byteOffset".to_string(), Value::from(offset));
        view.insert("byteLength".to_string(), Value::from(length));
        Ok(())
    }

    /// Overwrite a buffer's declared byte length.
    pub fn set_buffer_length(&mut self, index: usize, length: u64) -> Result<()> {
        let buffer = self.entry_mut("buffers", index)?;
        buffer.insert("byteLength".to_string(), Value::from(length));
        Ok(())
    }

    /// Overwrite an image's media type.
    pub fn set_image_mime_type(&mut self, index: usize, mime_type: &str) -> Result<()> {
        let image = self.entry_mut("images", index)?;
        image.insert("mimeType".to_string(), Value::from(mime_type));
        Ok(())
    }

    /// Add `name` to `extensionsUsed`. Returns `false` if already present.
    pub fn add_extension_used(&mut self, name: &str) -> Result<bool> {
        self.add_to_string_set("extensionsUsed", name)
    }

    /// Add `name` to `extensionsRequired`. Returns `false` if already present.
    pub fn add_extension_required(&mut self, name: &str) -> Result<bool> {
        self.add_to_string_set("extensionsRequired", name)
    }

    /// Whether `extensionsUsed` lists `name`.
    pub fn uses_extension(&self, name: &str) -> bool {
        contains_str(self.array("extensionsUsed"), name)
    }

    /// Whether `extensionsRequired` lists `name`.
    pub fn requires_extension(&self, name: &str) -> bool {
        contains_str(self.array("extensionsRequired"), name)
    }

    /// Set `textures[index].extensions[name] = value`, keeping other extensions.
    pub fn set_texture_extension(&mut self, index: usize, name: &str, value: Value) -> Result<()> {
        let texture = self.entry_mut("textures", index)?;
        let extensions = texture
            .entry("extensions")
            .or_insert_with(|| Value::Object(Map::new()));
        let extensions = extensions.as_object_mut().ok_or_else(|| {
            Error::manifest(format!("textures[{index}].extensions is not an object"))
        })?;
        extensions.insert(name.to_string(), value);
        Ok(())
    }

    /// Read `textures[index].extensions[name]`.
    pub fn texture_extension(&self, index: usize, name: &str) -> Option<&Value> {
        self.array("textures")
            .get(index)
            .and_then(|t| t.get("extensions"))
            .and_then(|e| e.get(name))
    }

    fn array(&self, key: &str) -> &[Value] {
        self.root
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn entry_mut(&mut self, key: &str, index: usize) -> Result<&mut Map<String, Value>> {
        self.root
            .get_mut(key)
            .and_then(Value::as_array_mut)
            .and_then(|items| items.get_mut(index))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::manifest(format!("{key}[{index}] does not exist")))
    }

    fn add_to_string_set(&mut self, key: &str, name: &str) -> Result<bool> {
        let root = self
            .root
            .as_object_mut()
            .ok_or_else(|| Error::manifest("top-level JSON value is not an object"))?;
        let list = root
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| Error::manifest(format!("{key} is not an array")))?;

        if contains_str(list, name) {
            return Ok(false);
        }
        list.push(Value::from(name));
        Ok(true)
    }
}

fn required_index(value: &Value, key: &str) -> Option<usize> {
    value.get(key).and_then(Value::as_u64).map(|v| v as usize)
}

fn contains_str(list: &[Value], name: &str) -> bool {
    list.iter().any(|v| v.as_str() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Manifest {
        Manifest::from_value(json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 96 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 64 },
                { "buffer": 0, "byteLength": 32 }
            ],
            "images": [
                { "bufferView": 0, "mimeType": "image/png" },
                { "uri": "external.jpg" }
            ],
            "textures": [
                { "source": 0, "sampler": 0 },
                { "source": 1, "extensions": { "KHR_texture_transform": {} } }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(Manifest::from_slice(b"[1, 2, 3]").is_err());
        assert!(Manifest::from_slice(b"not json").is_err());
    }

    #[test]
    fn test_buffer_views_default_offset() {
        let views = sample().buffer_views().unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[1].byte_offset, 0);
        assert_eq!(views[1].byte_length, 32);
        assert_eq!(views[1].id, 1);
    }

    #[test]
    fn test_buffer_view_missing_length() {
        let manifest = Manifest::from_value(json!({
            "buffers": [{ "byteLength": 4 }],
            "bufferViews": [{ "buffer": 0 }]
        }))
        .unwrap();
        let err = manifest.buffer_views().unwrap_err();
        assert!(err.to_string().contains("byteLength"));
    }

    #[test]
    fn test_images() {
        let images = sample().images().unwrap();
        assert_eq!(images[0].buffer_view, Some(0));
        assert_eq!(images[0].mime_type.as_deref(), Some("image/png"));
        assert_eq!(images[1].buffer_view, None);
        assert_eq!(images[1].uri.as_deref(), Some("external.jpg"));
    }

    #[test]
    fn test_extension_sets_are_idempotent() {
        let mut manifest = sample();
        assert!(manifest.add_extension_used("EXT_a").unwrap());
        assert!(!manifest.add_extension_used("EXT_a").unwrap());
        assert!(manifest.add_extension_required("EXT_a").unwrap());
        assert!(manifest.uses_extension("EXT_a"));
        assert!(manifest.requires_extension("EXT_a"));
        assert_eq!(manifest.as_value()["extensionsUsed"], json!(["EXT_a"]));
    }

    #[test]
    fn test_texture_extension_keeps_existing() {
        let mut manifest = sample();
        manifest
            .set_texture_extension(1, "EXT_a", json!({ "source": 1 }))
            .unwrap();
        let ext = &manifest.as_value()["textures"][1]["extensions"];
        assert!(ext.get("KHR_texture_transform").is_some());
        assert_eq!(ext["EXT_a"]["source"], 1);
    }

    #[test]
    fn test_setters_on_missing_entries() {
        let mut manifest = sample();
        assert!(manifest.set_buffer_view_range(5, 0, 0).is_err());
        assert!(manifest.set_image_mime_type(9, "image/basis").is_err());
        manifest.set_buffer_view_range(1, 64, 16).unwrap();
        assert_eq!(manifest.as_value()["bufferViews"][1]["byteOffset"], 64);
        assert_eq!(manifest.as_value()["bufferViews"][1]["byteLength"], 16);
    }
}
