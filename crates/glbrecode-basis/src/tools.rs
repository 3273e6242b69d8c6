//! Encoder detection.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Executable name of the Basis Universal encoder.
pub const BASISU: &str = "basisu";

/// What we know about an encoder executable.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool could be run.
    pub available: bool,
    /// First line of its version banner, if any.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Probe a tool by running it with `version_arg`.
///
/// `basisu` prints its banner and exits non-zero when given an unknown
/// option, so any successful spawn with output counts as available.
///
/// # Example
///
/// ```no_run
/// use glbrecode_basis::check_tool;
///
/// let info = check_tool("basisu", "-version");
/// if info.available {
///     println!("basisu: {:?}", info.version);
/// }
/// ```
pub fn check_tool(program: impl AsRef<Path>, version_arg: &str) -> ToolInfo {
    let program = program.as_ref();
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string());

    match Command::new(program).arg(version_arg).output() {
        Ok(output) => {
            let banner = if output.stdout.is_empty() {
                &output.stderr
            } else {
                &output.stdout
            };
            let version = String::from_utf8_lossy(banner)
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(|s| s.to_string());

            let path = if program.components().count() > 1 {
                Some(program.to_path_buf())
            } else {
                which::which(program).ok()
            };

            ToolInfo {
                name,
                available: true,
                version,
                path,
            }
        }
        Err(_) => ToolInfo {
            name,
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check the Basis Universal encoder, honouring a configured path.
pub fn check_basisu(config_path: Option<&Path>) -> ToolInfo {
    match get_tool_path(BASISU, config_path) {
        Ok(path) => check_tool(path, "-version"),
        Err(_) => ToolInfo {
            name: BASISU.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Require that a tool is on `PATH`, returning its path.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over `PATH` lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        #[cfg(feature = "tracing")]
        tracing::warn!(
            "Configured {} path {} does not exist, falling back to PATH",
            name,
            path.display()
        );
    }

    require_tool(name)
}
