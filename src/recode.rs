//! Recode command: resolve paths, build the encoder, run the rebuild.

use crate::config::Config;
use anyhow::{Context, Result};
use glbrecode_basis::{BasisEncoder, NpotTexture, Preset, Workspace};
use glbrecode_core::{recode_file, RunReport};
use std::path::{Path, PathBuf};

/// Per-run overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct RecodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub preset: Option<Preset>,
    pub keep_intermediates: Option<PathBuf>,
    pub resize_npot: bool,
}

/// What a finished run did.
#[derive(Debug)]
pub struct RecodeOutcome {
    pub report: RunReport,
    pub npot: Vec<NpotTexture>,
    /// Intermediate directory, if it was kept.
    pub intermediates: Option<PathBuf>,
}

/// Make `path` absolute against the current directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}

/// Resolve the input path and check it names an existing `.glb` file.
pub fn resolve_input(path: &Path) -> Result<PathBuf> {
    let path = absolute(path)?;
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {:?}", path);
    }
    if !path.is_file() {
        anyhow::bail!("Input is not a file: {:?}", path);
    }
    if !has_glb_extension(&path) {
        anyhow::bail!("Input file must have a .glb extension: {:?}", path);
    }
    Ok(path)
}

fn has_glb_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("glb"))
        .unwrap_or(false)
}

/// Recode every embedded image of `job.input` into `job.output`.
pub fn run(job: &RecodeJob, config: &Config) -> Result<RecodeOutcome> {
    let input = resolve_input(&job.input)?;
    let output = absolute(&job.output)?;
    if input == output {
        anyhow::bail!("Output would overwrite the input file: {:?}", input);
    }

    let mut settings = config.encoder_settings();
    if let Some(preset) = job.preset {
        settings.preset = preset;
    }
    settings.resize_npot |= job.resize_npot;

    let keep = job
        .keep_intermediates
        .as_deref()
        .or(config.encoder.keep_intermediates.as_deref())
        .map(absolute)
        .transpose()?;
    let workspace = Workspace::new(keep.as_deref()).context("Failed to set up intermediate directory")?;
    tracing::debug!("Intermediate files in {:?}", workspace.dir());

    let encoder = BasisEncoder::locate(config.tools.basisu_path.as_deref(), settings, workspace)
        .context("Cannot recode without the basisu encoder")?;
    tracing::info!(
        "Encoding with {} (preset {})",
        encoder.program().display(),
        encoder.settings().preset
    );

    let report = recode_file(&input, &output, &encoder, config.session_options())
        .with_context(|| format!("Failed to recode {:?}", input))?;

    Ok(RecodeOutcome {
        report,
        npot: encoder.npot_textures(),
        intermediates: keep,
    })
}

/// Print the end-of-run summary.
pub fn print_summary(outcome: &RecodeOutcome) {
    let report = &outcome.report;
    let summary = &report.summary;

    println!("Output: {}", report.output.display());
    println!(
        "Images recoded: {} (shared: {}, skipped: {})",
        summary.recoded.len(),
        summary.shared,
        summary.skipped
    );
    for image in &summary.recoded {
        println!(
            "  image {} (BV #{}): {} -> {} bytes",
            image.image, image.view, image.original_length, image.replacement_length
        );
    }
    println!(
        "BIN chunk: {} -> {} bytes",
        report.original_chunk_length, report.chunk_length
    );

    if !outcome.npot.is_empty() {
        println!("\nTextures not a power of two:");
        for npot in &outcome.npot {
            println!("  {}", npot);
        }
    }

    if let Some(ref dir) = outcome.intermediates {
        println!("\nIntermediate files kept in {}", dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glb_extension_is_case_insensitive() {
        assert!(has_glb_extension(Path::new("a/model.glb")));
        assert!(has_glb_extension(Path::new("MODEL.GLB")));
        assert!(!has_glb_extension(Path::new("model.gltf")));
        assert!(!has_glb_extension(Path::new("model")));
    }

    #[test]
    fn test_resolve_input_checks() {
        let dir = tempfile::tempdir().unwrap();
        let gltf = dir.path().join("scene.gltf");
        std::fs::write(&gltf, b"{}").unwrap();
        let err = resolve_input(&gltf).unwrap_err();
        assert!(err.to_string().contains(".glb"));

        let missing = dir.path().join("missing.glb");
        let err = resolve_input(&missing).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let glb = dir.path().join("scene.Glb");
        std::fs::write(&glb, b"glTF").unwrap();
        assert_eq!(resolve_input(&glb).unwrap(), glb);
    }

    #[test]
    fn test_absolute_joins_cwd() {
        let resolved = absolute(Path::new("out.glb")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("out.glb"));
    }
}
