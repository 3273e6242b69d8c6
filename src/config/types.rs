use glbrecode_basis::{EncoderSettings, Preset};
use glbrecode_core::{SessionOptions, DEFAULT_EXTENSION, DEFAULT_MIME_TYPE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Encoder settings for this config.
    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            preset: self.encoder.preset,
            extra_args: self.encoder.extra_args.clone(),
            resize_npot: self.encoder.resize_npot,
            mime_type: self.output.mime_type.clone(),
        }
    }

    /// Rebuild session options for this config.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            extension: self.output.extension.clone(),
            mime_type: self.output.mime_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub basisu_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EncoderConfig {
    #[serde(default)]
    pub preset: Preset,

    /// Appended after the preset arguments. Supports `{input}`, `{output}`,
    /// `{workspace}`, `{filestem}`, `{image}` and `{view}`.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Scale non power-of-two textures down before encoding
    #[serde(default)]
    pub resize_npot: bool,

    /// Keep intermediate files in this directory instead of a temp dir
    #[serde(default)]
    pub keep_intermediates: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Extension declared in the output manifest
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Media type written for recoded images
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            mime_type: default_mime_type(),
        }
    }
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}
