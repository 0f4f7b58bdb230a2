//! Runtime configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! database_path = "drafts.db"
//! log_profile = "production"
//! destroy_snapshot = "persisted"
//! busy_timeout_ms = 2000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ExError, ExErrorKind, Result};
use crate::logging_facility::{self, Profile};

/// Environment variable overriding `database_path`
pub const ENV_DATABASE_PATH: &str = "DRAFTER_DATABASE_PATH";

/// Source of the attributes captured by a DESTROY draft
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroySnapshot {
    /// The live entity's current in-memory attributes
    #[default]
    InMemory,
    /// The attributes last persisted for the entity
    Persisted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrafterConfig {
    /// SQLite database file; `None` means an in-memory database
    pub database_path: Option<PathBuf>,
    pub log_profile: Profile,
    pub destroy_snapshot: DestroySnapshot,
    pub busy_timeout_ms: u64,
}

impl Default for DrafterConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_profile: Profile::default(),
            destroy_snapshot: DestroySnapshot::default(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl DrafterConfig {
    /// Parse TOML, falling back to defaults for missing keys
    ///
    /// # Errors
    ///
    /// `Config` when the TOML is malformed or a value has the wrong type.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| {
            ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_message(e.to_string())
        })
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Config` if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_message(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `DRAFTER_DATABASE_PATH` when set and non-empty
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Install the global subscriber for `log_profile` (first call wins)
    pub fn init_logging(&self) {
        logging_facility::init(self.log_profile);
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_DATABASE_PATH).filter(|p| !p.is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        self
    }
}
