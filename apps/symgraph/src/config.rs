//! # Configuration
//!
//! Optional `symgraph.toml` settings. Every field has a default, so an
//! absent file and an empty file behave the same. Command-line flags take
//! precedence over the file; `SYMGRAPH_LOG_FORMAT` takes precedence over
//! the file's `log_format`.
//!
//! ```toml
//! graph = "symbols.db"
//! backend = "redb"
//! log_format = "json"
//! walk_limit = 500
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use symgraph_core::SymGraphError;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "symgraph.toml";

/// Environment variable that overrides `log_format`.
pub const LOG_FORMAT_ENV: &str = "SYMGRAPH_LOG_FORMAT";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SETTINGS
// =============================================================================

/// Where a graph is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Canonical binary file.
    File,
    /// ACID redb database.
    #[default]
    Redb,
}

impl Backend {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Backend::File => "file",
            Backend::Redb => "redb",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// Machine-parseable, one JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse the value of `SYMGRAPH_LOG_FORMAT`. Anything other than
    /// `json` means text.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Path to the persisted graph
    #[serde(default = "default_graph")]
    pub graph: PathBuf,

    /// Storage backend
    #[serde(default)]
    pub backend: Backend,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Default cap on nodes printed by `walk` and `complete`
    #[serde(default = "default_walk_limit")]
    pub walk_limit: usize,
}

fn default_graph() -> PathBuf {
    PathBuf::from("symgraph.db")
}

fn default_walk_limit() -> usize {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graph: default_graph(),
            backend: Backend::default(),
            log_format: LogFormat::default(),
            walk_limit: default_walk_limit(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// `DeserializationError` for malformed TOML, unknown keys or bad values.
    pub fn from_toml(text: &str) -> Result<Self, SymGraphError> {
        toml::from_str(text)
            .map_err(|e| SymGraphError::DeserializationError(format!("config: {}", e)))
    }

    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one, `symgraph.toml` in the
    /// working directory is used if present, and defaults otherwise. The
    /// `SYMGRAPH_LOG_FORMAT` environment variable is applied last.
    ///
    /// # Errors
    ///
    /// `IoError` if the file cannot be read or is too large, and anything
    /// `from_toml` returns.
    pub fn load(path: Option<&Path>) -> Result<Self, SymGraphError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(value) = std::env::var(LOG_FORMAT_ENV) {
            config.log_format = LogFormat::from_env_value(&value);
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, SymGraphError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            SymGraphError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(SymGraphError::IoError(format!(
                "Config '{}' is {} bytes, maximum is {}",
                path.display(),
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            SymGraphError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&text)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = AppConfig::from_toml("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.backend, Backend::Redb);
        assert_eq!(config.walk_limit, 1000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml("backend = \"file\"\nwalk_limit = 5\n").expect("parse");
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.walk_limit, 5);
        assert_eq!(config.graph, PathBuf::from("symgraph.db"));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = AppConfig::from_toml("grpah = \"x.db\"").expect_err("typo");
        assert!(matches!(err, SymGraphError::DeserializationError(_)));
    }

    #[test]
    fn bad_backend_rejected() {
        assert!(AppConfig::from_toml("backend = \"sqlite\"").is_err());
    }

    #[test]
    fn env_value_parsing() {
        assert_eq!(LogFormat::from_env_value("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("text"), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value("pretty"), LogFormat::Text);
    }
}
