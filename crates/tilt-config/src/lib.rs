mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Returns the config directory, e.g. `~/.config/tilt-arcade/`. It is only
/// created on save.
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("tilt-arcade"))
}

/// Returns the config file path: `<config dir>/tilt-arcade/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from the default location, or return defaults if not found.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

/// Load config from `path`, or return defaults if the file does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        info!(?path, "Loaded config");
        Ok(config)
    } else {
        info!(?path, "No config found, using defaults");
        Ok(AppConfig::default())
    }
}

/// Save config to the default location.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &config_path()?)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    info!(?path, "Saved config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tilt-config-{}-{name}.toml", std::process::id()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = scratch_path("missing");
        let _ = std::fs::remove_file(&path);
        let config = load_config_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let path = scratch_path("roundtrip");
        let mut config = AppConfig::default();
        config.filter.algorithm = "mahony".into();
        config.filter.ki = 0.02;
        config.gestures.vertical_pitch_deg = Some(30.0);
        config.transport.address = Some("127.0.0.1:9000".into());

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn loading_never_creates_directories() {
        let dir = std::env::temp_dir().join(format!("tilt-config-{}-absent", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let config = load_config_from(&dir.join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(!dir.exists());
    }

    #[test]
    fn saving_creates_missing_directory() {
        let dir = std::env::temp_dir().join(format!("tilt-config-{}-fresh", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("config.toml");

        save_config_to(&AppConfig::default(), &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = scratch_path("malformed");
        std::fs::write(&path, "filter = 3").unwrap();
        let result = load_config_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }
}
