//! Basis Universal encoding through the `basisu` command-line tool.

use crate::template::TemplateContext;
use crate::texture::{self, NpotTexture};
use crate::tools::{get_tool_path, BASISU};
use crate::workspace::Workspace;
use crate::{Error, Result};
use glbrecode_core::{BoxError, RecodeInvoker, RecodeRequest, Replacement, DEFAULT_MIME_TYPE};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

/// Encoder argument sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Mipmapped, compression level 1, quality 192.
    #[default]
    Standard,
    /// Fast linear-space encode for previews.
    Preview,
    /// Maximum endpoint/selector codebooks at compression level 5.
    Full,
}

impl Preset {
    /// Arguments passed to `basisu` ahead of the file arguments.
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Preset::Standard => &["-mipmap", "-comp_level", "1", "-q", "192"],
            Preset::Preview => &["-linear", "-mipmap", "-individual"],
            Preset::Full => &[
                "-linear",
                "-mipmap",
                "-individual",
                "-max_endpoints",
                "16128",
                "-max_selectors",
                "16128",
                "-comp_level",
                "5",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Standard => "standard",
            Preset::Preview => "preview",
            Preset::Full => "full",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Preset::Standard),
            "preview" => Ok(Preset::Preview),
            "full" => Ok(Preset::Full),
            other => Err(format!(
                "unknown preset '{}' (expected standard, preview or full)",
                other
            )),
        }
    }
}

/// How images are encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub preset: Preset,
    /// Extra arguments, placeholders substituted per image.
    pub extra_args: Vec<String>,
    /// Scale non power-of-two images down before encoding.
    pub resize_npot: bool,
    /// Media type reported for encoder output.
    pub mime_type: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            preset: Preset::default(),
            extra_args: Vec::new(),
            resize_npot: false,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }
}

/// [`RecodeInvoker`] that runs `basisu` once per image.
///
/// Each image is written to `image_<img>_BV<view>.<ext>` in the workspace and
/// encoded to `image_<img>_BV<view>.basis`. The replacement refers to that
/// file, so the encoder (and its workspace) must outlive the rebuild.
///
/// # Example
///
/// ```no_run
/// use glbrecode_basis::{BasisEncoder, EncoderSettings, Workspace};
/// use glbrecode_core::{recode_file, SessionOptions};
/// use std::path::Path;
///
/// let encoder = BasisEncoder::locate(None, EncoderSettings::default(), Workspace::temporary()?)?;
/// recode_file(
///     Path::new("model.glb"),
///     Path::new("model.basis.glb"),
///     &encoder,
///     SessionOptions::default(),
/// )?;
/// for npot in encoder.npot_textures() {
///     println!("{}", npot);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct BasisEncoder {
    program: PathBuf,
    settings: EncoderSettings,
    workspace: Workspace,
    npot: RefCell<Vec<NpotTexture>>,
}

impl BasisEncoder {
    /// Create an encoder that runs `program`.
    pub fn new(program: impl Into<PathBuf>, settings: EncoderSettings, workspace: Workspace) -> Self {
        Self {
            program: program.into(),
            settings,
            workspace,
            npot: RefCell::new(Vec::new()),
        }
    }

    /// Find `basisu` (configured path first, then `PATH`) and create an encoder.
    pub fn locate(
        config_path: Option<&Path>,
        settings: EncoderSettings,
        workspace: Workspace,
    ) -> Result<Self> {
        let program = get_tool_path(BASISU, config_path)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("Using {} at {}", BASISU, program.display());
        Ok(Self::new(program, settings, workspace))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Non power-of-two textures seen so far.
    pub fn npot_textures(&self) -> Vec<NpotTexture> {
        self.npot.borrow().clone()
    }

    /// Full argument list for one invocation.
    pub fn command_args(&self, input: &Path, output: &Path, image: usize, view: usize) -> Vec<String> {
        let ctx = TemplateContext::new()
            .with_files(input, output, self.workspace.dir())
            .with_indices(image, view)
            .with_var("preset", self.settings.preset.as_str());

        let mut args: Vec<String> = self
            .settings
            .preset
            .args()
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(ctx.substitute_all(&self.settings.extra_args));
        args.push("-file".to_string());
        args.push(input.display().to_string());
        args.push("-output_file".to_string());
        args.push(output.display().to_string());
        args
    }

    /// Encode one image, returning a file-backed replacement.
    pub fn encode(&self, request: &RecodeRequest<'_>) -> Result<Replacement> {
        if request.data.is_empty() {
            return Err(Error::InvalidInput(format!(
                "image {} in BV #{} is empty",
                request.image, request.view
            )));
        }

        let stem = format!("image_{}_BV{}", request.image, request.view);
        let mut input = self
            .workspace
            .file(&format!("{}.{}", stem, request.extension()));
        std::fs::write(&input, request.data)?;

        if let Some(resized) = self.check_dimensions(request)? {
            input = self.workspace.file(&format!("{}_pot.png", stem));
            std::fs::write(&input, resized)?;
        }

        let output = self.workspace.file(&format!("{}.basis", stem));
        if output.exists() {
            std::fs::remove_file(&output)?;
        }

        self.run(&input, &output, request.image, request.view)?;

        let length = std::fs::metadata(&output)?.len();
        if length == 0 {
            return Err(Error::output_missing(BASISU, output));
        }
        Ok(Replacement::file(output, length, self.settings.mime_type.clone()))
    }

    /// Record NPOT textures; returns resized PNG bytes when resizing applies.
    fn check_dimensions(&self, request: &RecodeRequest<'_>) -> Result<Option<Vec<u8>>> {
        let dims = match texture::probe_dimensions(request.data) {
            Ok(dims) => dims,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Could not read dimensions of image {}: {}",
                    request.image,
                    _e
                );
                return Ok(None);
            }
        };
        if dims.is_power_of_two() {
            return Ok(None);
        }

        let target = dims.power_of_two_floor();
        let resized = if self.settings.resize_npot {
            #[cfg(feature = "tracing")]
            tracing::info!(
                "Resizing image {} from {} to {}",
                request.image,
                dims,
                target
            );
            Some(texture::resize_to(request.data, target)?)
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Image {} is {}, not a power of two (nearest {})",
                request.image,
                dims,
                target
            );
            None
        };

        self.npot.borrow_mut().push(NpotTexture {
            image: request.image,
            view: request.view,
            original: dims,
            resized: resized.as_ref().map(|_| target),
        });
        Ok(resized)
    }

    fn run(&self, input: &Path, output: &Path, image: usize, view: usize) -> Result<()> {
        let args = self.command_args(input, output, image, view);

        #[cfg(feature = "tracing")]
        tracing::debug!("Running {} {}", self.program.display(), args.join(" "));

        let result = Command::new(&self.program).args(&args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(self.program.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        // basisu's exit status is unreliable; the output file is what counts.
        if output.exists() {
            if !result.status.success() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "{} exited with {} but wrote {}",
                    BASISU,
                    result.status,
                    output.display()
                );
            }
            return Ok(());
        }

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stdout = String::from_utf8_lossy(&result.stdout);
            let message = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::tool_failed(
                BASISU,
                format!("{} ({})", message, result.status),
            ));
        }

        Err(Error::output_missing(BASISU, output))
    }
}

impl RecodeInvoker for BasisEncoder {
    fn name(&self) -> &str {
        BASISU
    }

    fn recode(&self, request: &RecodeRequest<'_>) -> std::result::Result<Replacement, BoxError> {
        self.encode(request).map_err(Into::into)
    }
}
