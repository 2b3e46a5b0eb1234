use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    #[default]
    General,
    Contribution,
    Loan,
    Attendance,
    Meeting,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::General => "general",
            NotificationCategory::Contribution => "contribution",
            NotificationCategory::Loan => "loan",
            NotificationCategory::Attendance => "attendance",
            NotificationCategory::Meeting => "meeting",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "general" => Ok(NotificationCategory::General),
            "contribution" => Ok(NotificationCategory::Contribution),
            "loan" => Ok(NotificationCategory::Loan),
            "attendance" => Ok(NotificationCategory::Attendance),
            "meeting" => Ok(NotificationCategory::Meeting),
            other => Err(format!("unknown notification category: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Only this address sees the notification when set.
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub category: NotificationCategory,
    pub chair_email: String,
}

/// Input of the send-notification form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub user_email: Option<String>,
    pub category: NotificationCategory,
}
