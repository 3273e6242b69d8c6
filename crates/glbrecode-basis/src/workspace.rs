//! Directory for intermediate encoder files.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Where extracted images and encoder output live during a run.
///
/// A temporary workspace is removed when dropped. A kept workspace points at
/// a caller-chosen directory and is left in place so the intermediates can be
/// inspected afterwards.
///
/// Replacement files handed to the rebuilder live here, so the workspace must
/// outlive the rebuild.
///
/// # Example
///
/// ```no_run
/// use glbrecode_basis::Workspace;
///
/// let workspace = Workspace::temporary()?;
/// let png = workspace.file("image_0_BV3.png");
/// assert!(png.starts_with(workspace.dir()));
/// # Ok::<(), glbrecode_basis::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    dir: WorkspaceDir,
}

#[derive(Debug)]
enum WorkspaceDir {
    Temp(TempDir),
    Kept(PathBuf),
}

impl Workspace {
    /// Create a workspace in a fresh temporary directory.
    pub fn temporary() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("glbrecode-")
            .map_err(|e| Error::Workspace(format!("Failed to create temp dir: {}", e)))?;
        Ok(Self {
            dir: WorkspaceDir::Temp(temp_dir),
        })
    }

    /// Use `dir` as a persistent workspace, creating it if needed.
    pub fn keep_in(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Workspace(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        if !dir.is_dir() {
            return Err(Error::Workspace(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(Self {
            dir: WorkspaceDir::Kept(dir.to_path_buf()),
        })
    }

    /// Temporary unless `keep` names a directory.
    pub fn new(keep: Option<&Path>) -> Result<Self> {
        match keep {
            Some(dir) => Self::keep_in(dir),
            None => Self::temporary(),
        }
    }

    /// The workspace directory.
    pub fn dir(&self) -> &Path {
        match &self.dir {
            WorkspaceDir::Temp(temp_dir) => temp_dir.path(),
            WorkspaceDir::Kept(path) => path,
        }
    }

    /// Path for a file named `name` inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir().join(name)
    }

    /// Whether files survive the workspace being dropped.
    pub fn is_kept(&self) -> bool {
        matches!(self.dir, WorkspaceDir::Kept(_))
    }
}
