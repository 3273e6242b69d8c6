mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    expand_paths(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./glbrecode.toml",
        "~/.config/glbrecode/config.toml",
        "/etc/glbrecode/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand_paths(config: &mut Config) {
    config.tools.basisu_path = config.tools.basisu_path.take().map(expand);
    config.encoder.keep_intermediates = config.encoder.keep_intermediates.take().map(expand);
}

fn expand(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path,
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.output.extension.trim().is_empty() {
        anyhow::bail!("output.extension cannot be empty");
    }

    if config.output.mime_type.trim().is_empty() {
        anyhow::bail!("output.mime_type cannot be empty");
    }

    if let Some(ref path) = config.tools.basisu_path {
        if !path.exists() {
            tracing::warn!("Configured basisu path does not exist: {:?}", path);
        }
    }

    for arg in &config.encoder.extra_args {
        if arg == "-file" || arg == "-output_file" {
            anyhow::bail!("encoder.extra_args must not contain {}", arg);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glbrecode_basis::Preset;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
[tools]
basisu_path = "/opt/basis/bin/basisu"

[encoder]
preset = "full"
extra_args = ["-y_flip"]
resize_npot = true
keep_intermediates = "/tmp/glb-work"

[output]
extension = "KHR_texture_basisu"
mime_type = "image/ktx2"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.encoder.preset, Preset::Full);
        assert!(config.encoder.resize_npot);
        assert_eq!(
            config.tools.basisu_path.as_deref(),
            Some(Path::new("/opt/basis/bin/basisu"))
        );

        let settings = config.encoder_settings();
        assert_eq!(settings.extra_args, vec!["-y_flip"]);
        assert_eq!(settings.mime_type, "image/ktx2");

        let options = config.session_options();
        assert_eq!(options.extension, "KHR_texture_basisu");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.encoder.preset, Preset::Standard);
        assert_eq!(config.output.extension, "MOZ_HUBS_texture_basis");
        assert_eq!(config.output.mime_type, "image/basis");
        assert!(config.encoder.keep_intermediates.is_none());
    }

    #[test]
    fn test_rejects_empty_extension() {
        let file = write_config("[output]\nextension = \"\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("extension"));
    }

    #[test]
    fn test_rejects_unknown_preset() {
        let file = write_config("[encoder]\npreset = \"ultra\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_file_args() {
        let file = write_config("[encoder]\nextra_args = [\"-output_file\", \"x\"]\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_tilde_is_expanded() {
        let file = write_config("[encoder]\nkeep_intermediates = \"~/glb-work\"\n");
        let config = load_config(file.path()).unwrap();
        let dir = config.encoder.keep_intermediates.unwrap();
        if std::env::var_os("HOME").is_some() {
            assert!(!dir.starts_with("~"));
        }
        assert!(dir.ends_with("glb-work"));
    }

    #[test]
    fn test_missing_file_fails() {
        let err = load_config(Path::new("/nonexistent/glbrecode.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
