//! Sentry configuration
//!
//! Read from `<config_dir>/devsentry/config.toml` (or an explicit path).
//! Every field has a default, so a partial or missing file is fine.

use sentry_watcher::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Valid rescan interval range in milliseconds
pub const POLL_INTERVAL_RANGE: (u64, u64) = (50, 60_000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{key} = {value} is out of range ({min}-{max})")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentryConfig {
    pub provider: ProviderConfig,
    pub display: DisplayConfig,
}

/// Terminal output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Colorize event output (default: true)
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

fn default_true() -> bool {
    true
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub buses: Vec<String>,
    pub poll_interval_ms: Option<u64>,
    pub no_color: bool,
}

impl SentryConfig {
    /// Parse a TOML document
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line overrides, then validate
    pub fn with_overrides(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(root) = &overrides.root {
            self.provider.root = root.clone();
        }
        if !overrides.buses.is_empty() {
            self.provider.buses = overrides.buses.clone();
        }
        if let Some(interval) = overrides.poll_interval_ms {
            self.provider.poll_interval_ms = interval;
        }
        if overrides.no_color {
            self.display.color = false;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = POLL_INTERVAL_RANGE;
        let value = self.provider.poll_interval_ms;
        if !(min..=max).contains(&value) {
            return Err(ConfigError::OutOfRange {
                key: "provider.poll_interval_ms",
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Default config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("devsentry").join("config.toml"))
}

/// Load configuration
///
/// An explicit path must exist. The default location is optional and
/// falls back to built-in defaults when absent.
pub fn load(explicit: Option<&Path>) -> Result<SentryConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(SentryConfig::default()),
        },
    };

    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = SentryConfig::parse(&contents, &path)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = SentryConfig::parse(
            "[provider]\nbuses = [\"usb\"]\npoll_interval_ms = 250\n",
            Path::new("config.toml"),
        )
        .unwrap();

        assert_eq!(config.provider.buses, vec!["usb".to_string()]);
        assert_eq!(config.provider.poll_interval_ms, 250);
        assert_eq!(config.provider.root, PathBuf::from("/sys/bus"));
        assert!(config.provider.attributes.contains(&"product".to_string()));
        assert!(config.display.color);
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            root: Some(PathBuf::from("/tmp/bus")),
            buses: vec!["pci".to_string()],
            poll_interval_ms: Some(100),
            no_color: true,
        };
        let config = SentryConfig::default().with_overrides(&overrides).unwrap();

        assert_eq!(config.provider.root, PathBuf::from("/tmp/bus"));
        assert_eq!(config.provider.buses, vec!["pci".to_string()]);
        assert_eq!(config.provider.poll_interval_ms, 100);
        assert!(!config.display.color);
    }

    #[test]
    fn test_interval_out_of_range() {
        let overrides = Overrides {
            poll_interval_ms: Some(1),
            ..Overrides::default()
        };
        assert!(matches!(
            SentryConfig::default().with_overrides(&overrides),
            Err(ConfigError::OutOfRange { value: 1, .. })
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[display]\ncolor = false\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert!(!config.display.color);
        assert_eq!(config.provider, ProviderConfig::default());

        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(load(Some(&missing)), Err(ConfigError::Read { .. })));

        std::fs::write(&path, "[provider\n").unwrap();
        assert!(matches!(load(Some(&path)), Err(ConfigError::Parse { .. })));
    }
}
