//! Analysis defaults loaded from a JSON file.
//!
//! ```json
//! {
//!   "parse_mode": "lenient",
//!   "match_mode": "regex",
//!   "thresholds": { "min_inherited_time": 1.0 }
//! }
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parsers::ParseMode;
use crate::views::{MatchMode, Thresholds};

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".costtree.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub parse_mode: ParseMode,
    /// Match mode used for name filters and searches when none is given.
    pub match_mode: MatchMode,
    pub thresholds: Thresholds,
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` when given, else [`DEFAULT_CONFIG_FILE`] if it exists,
    /// else the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
