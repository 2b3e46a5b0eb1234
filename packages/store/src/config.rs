//! # Club configuration: `nkhonde.toml`
//!
//! Tunables for a club installation, read by the command line at start-up and
//! passed explicitly to the operations that need them.
//!
//! ## Structure
//!
//! ```toml
//! [attendance]
//! penalty_amount = 500        # charged per absence
//!
//! [ledger]
//! max_commit_retries = 3      # re-reads after a conflicting loan approval
//!
//! [auth]
//! min_password_len = 8
//! session_ttl_hours = 168
//! reset_token_ttl_minutes = 60
//!
//! [storage]
//! data_dir = ""               # empty = platform data directory
//! ```
//!
//! Every section and field has a default, so a missing or empty file is
//! equivalent to [`ClubConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Top-level configuration stored in `nkhonde.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClubConfig {
    #[serde(default)]
    pub attendance: AttendanceConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttendanceConfig {
    /// Fixed charge per absence, in kwacha.
    #[serde(default = "default_penalty_amount")]
    pub penalty_amount: i64,
}

fn default_penalty_amount() -> i64 {
    500
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            penalty_amount: default_penalty_amount(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,
}

fn default_max_commit_retries() -> u32 {
    3
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: default_max_commit_retries(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_reset_token_ttl_minutes")]
    pub reset_token_ttl_minutes: i64,
}

fn default_min_password_len() -> usize {
    8
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

fn default_reset_token_ttl_minutes() -> i64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_len: default_min_password_len(),
            session_ttl_hours: default_session_ttl_hours(),
            reset_token_ttl_minutes: default_reset_token_ttl_minutes(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding documents and blobs. Empty means the platform default.
    #[serde(default)]
    pub data_dir: String,
}

impl ClubConfig {
    /// Builder method to set the per-absence penalty.
    pub fn with_penalty_amount(mut self, amount: i64) -> Self {
        self.attendance.penalty_amount = amount;
        self
    }

    /// Builder method to set the data directory.
    pub fn with_data_dir(mut self, dir: &str) -> Self {
        self.storage.data_dir = dir.to_string();
        self
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "nkhonde.toml"
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load from `path`, falling back to the defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        match std::fs::read_to_string(path) {
            Ok(s) => Ok(Self::from_toml(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = ClubConfig::from_toml("").unwrap();
        assert_eq!(config, ClubConfig::default());
        assert_eq!(config.attendance.penalty_amount, 500);
        assert_eq!(config.ledger.max_commit_retries, 3);
        assert_eq!(config.auth.session_ttl_hours, 168);
    }

    #[test]
    fn test_partial_section() {
        let config = ClubConfig::from_toml("[attendance]\npenalty_amount = 1000\n").unwrap();
        assert_eq!(config.attendance.penalty_amount, 1000);
        assert_eq!(config.auth.min_password_len, 8);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ClubConfig::default()
            .with_penalty_amount(750)
            .with_data_dir("/var/lib/nkhonde");
        let text = config.to_toml().unwrap();
        assert_eq!(ClubConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("nkhonde_definitely_missing.toml");
        assert_eq!(ClubConfig::load(&path).unwrap(), ClubConfig::default());
    }
}
