use crate::extension::LoadOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub extension: ExtensionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Directory holding the extension modules
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Scoring module, relative to `root`
    #[serde(default = "default_calculate")]
    pub calculate: PathBuf,

    /// Damage-tier module, relative to `root`
    #[serde(default = "default_damage")]
    pub damage: PathBuf,

    /// Refuse modules that do not provide every formula
    #[serde(default)]
    pub strict: bool,

    /// Disable process and file-loading functions inside extensions
    #[serde(default = "default_true")]
    pub sandbox: bool,

    /// How often `watch` checks module files for changes
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".waves-ext").join("waves_build"))
        .unwrap_or_else(|| PathBuf::from("waves_build"))
}

fn default_calculate() -> PathBuf {
    PathBuf::from("calculate.lua")
}

fn default_damage() -> PathBuf {
    PathBuf::from("damage.lua")
}

fn default_true() -> bool {
    true
}

fn default_watch_interval_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            calculate: default_calculate(),
            damage: default_damage(),
            strict: false,
            sandbox: true,
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ExtensionConfig {
    #[must_use]
    pub fn calculate_path(&self) -> PathBuf {
        self.root.join(&self.calculate)
    }

    #[must_use]
    pub fn damage_path(&self) -> PathBuf {
        self.root.join(&self.damage)
    }

    #[must_use]
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict: self.strict,
            sandboxed: self.sandbox,
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("Failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path.as_ref(), contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get default configuration path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;

        Ok(home.join(".waves-ext").join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_extension_config() {
        let config = ExtensionConfig::default();
        assert!(!config.strict);
        assert!(config.sandbox);
        assert_eq!(config.calculate, PathBuf::from("calculate.lua"));
        assert!(config.damage_path().ends_with("damage.lua"));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
extension:
  root: /srv/waves_build
  strict: true
logging:
  level: debug
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.extension.strict);
        assert!(config.extension.sandbox);
        assert_eq!(
            config.extension.calculate_path(),
            PathBuf::from("/srv/waves_build/calculate.lua")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.extension.watch_interval_ms = 500;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.extension.watch_interval_ms, 500);
        assert_eq!(loaded.extension.root, config.extension.root);
    }
}
