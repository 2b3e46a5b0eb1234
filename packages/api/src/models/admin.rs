//! # Admin model for club chairpersons
//!
//! ## [`Admin`]
//!
//! The complete document from the `admins` collection, keyed by the lower-cased
//! e-mail address. Carries the Argon2id `password_hash` and is never handed to a
//! front end directly.
//!
//! ## [`AdminInfo`]
//!
//! The projection safe to display: e-mail and name only. The admin's e-mail is the
//! `chairEmail` that scopes every member, loan and contribution they manage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full admin record from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Admin {
    /// Convert to AdminInfo for display.
    pub fn to_info(&self) -> AdminInfo {
        AdminInfo {
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Admin information safe to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminInfo {
    pub email: String,
    pub name: String,
}

impl AdminInfo {
    /// Get display name, falling back to email if name is blank.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}
