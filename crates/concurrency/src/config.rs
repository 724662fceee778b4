//! Concurrency-control configuration via `concurrency.toml`
//!
//! The only setting is which protocol the facade runs. A missing key falls
//! back to the lock-based engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strata_core::{Algorithm, Error, Result};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "concurrency.toml";

/// Configuration loaded from `concurrency.toml`.
///
/// # Example
///
/// ```toml
/// # "lock" (default), "timestamp" or "validation"
/// algorithm = "timestamp"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    /// Protocol selector: `"lock"`, `"timestamp"` or `"validation"`
    #[serde(default = "default_algorithm_str")]
    pub algorithm: String,
}

fn default_algorithm_str() -> String {
    Algorithm::Lock.as_str().to_string()
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm_str(),
        }
    }
}

impl ConcurrencyConfig {
    /// Config selecting `algorithm`
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        Self {
            algorithm: algorithm.as_str().to_string(),
        }
    }

    /// Parse the algorithm string
    ///
    /// # Errors
    ///
    /// `UnsupportedAlgorithm` if the name is not a known protocol or alias.
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.algorithm.parse()
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Strata concurrency-control configuration
#
# Protocol run by the concurrency-control manager:
#   "lock"       = two-phase locking with wound-wait (default)
#   "timestamp"  = timestamp ordering
#   "validation" = optimistic concurrency control
algorithm = "lock"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names an
    /// unknown algorithm.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: ConcurrencyConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        // Validate the algorithm eagerly
        config.algorithm()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_lock() {
        let config = ConcurrencyConfig::default();
        assert_eq!(config.algorithm, "lock");
        assert_eq!(config.algorithm().unwrap(), Algorithm::Lock);
    }

    #[test]
    fn parse_aliases() {
        let config: ConcurrencyConfig = toml::from_str("algorithm = \"occ\"").unwrap();
        assert_eq!(config.algorithm().unwrap(), Algorithm::Validation);

        let config: ConcurrencyConfig = toml::from_str("algorithm = \"TS\"").unwrap();
        assert_eq!(config.algorithm().unwrap(), Algorithm::Timestamp);
    }

    #[test]
    fn parse_invalid_algorithm_returns_error() {
        let config: ConcurrencyConfig = toml::from_str("algorithm = \"mvcc\"").unwrap();
        assert!(matches!(
            config.algorithm(),
            Err(Error::UnsupportedAlgorithm(name)) if name == "mvcc"
        ));
    }

    #[test]
    fn default_toml_parses_correctly() {
        let config: ConcurrencyConfig =
            toml::from_str(ConcurrencyConfig::default_toml()).unwrap();
        assert_eq!(config, ConcurrencyConfig::default());
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        ConcurrencyConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());

        let config = ConcurrencyConfig::from_file(&path).unwrap();
        assert_eq!(config.algorithm, "lock");
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "algorithm = \"validation\"\n").unwrap();
        ConcurrencyConfig::write_default_if_missing(&path).unwrap();

        let config = ConcurrencyConfig::from_file(&path).unwrap();
        assert_eq!(config.algorithm, "validation");
    }

    #[test]
    fn from_file_with_missing_field_uses_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "").unwrap();

        let config = ConcurrencyConfig::from_file(&path).unwrap();
        assert_eq!(config.algorithm, "lock");
    }

    #[test]
    fn from_file_rejects_unknown_algorithm() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "algorithm = \"turbo\"\n").unwrap();

        assert!(matches!(
            ConcurrencyConfig::from_file(&path),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn from_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let err = ConcurrencyConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ConcurrencyConfig::for_algorithm(Algorithm::Timestamp);

        config.write_to_file(&path).unwrap();
        assert_eq!(ConcurrencyConfig::from_file(&path).unwrap(), config);
    }
}
