//! Configuration management for feedtips.
//!
//! Configuration is read from `~/.config/feedtips/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::tips::DisplayFrequency;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub tips: TipsConfig,
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; defaults to `<data dir>/feedtips/feedtips.db`.
    pub path: Option<PathBuf>,
    /// Keep everything in memory for the lifetime of the process.
    pub in_memory: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TipsConfig {
    pub display_frequency: DisplayFrequency,
    /// Wipe tip status and event donations on every start.
    pub reset_on_launch: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Value given to every tip's `isPro` parameter at startup.
    pub is_pro: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self { is_pro: true }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/feedtips/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedtips").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# feedtips configuration

[store]
# Database file. Defaults to the platform data directory.
# path = "/home/me/.local/share/feedtips/feedtips.db"

# Keep items and tip history in memory only
in_memory = false

[tips]
# How often a new tip may appear after another one was shown:
# immediate, hourly, daily, weekly, monthly
display_frequency = "immediate"

# Clear tip status and event donations on every start
reset_on_launch = false

[environment]
# Unlocks the tips gated on the isPro parameter
is_pro = true
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert!(!config.store.in_memory);
        assert_eq!(config.tips.display_frequency, DisplayFrequency::Immediate);
        assert!(!config.tips.reset_on_launch);
        assert!(config.environment.is_pro);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[tips]
display_frequency = "daily"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.tips.display_frequency, DisplayFrequency::Daily);
        assert!(config.environment.is_pro);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.tips.display_frequency, DisplayFrequency::Immediate);
        assert!(config.environment.is_pro);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[environment]\nis_pro = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.environment.is_pro);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[tips]\ndisplay_frequency = \"sometimes\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
