use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One meeting's attendance: member id → present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    pub chair_email: String,
    #[serde(default)]
    pub marks: BTreeMap<String, bool>,
}

impl AttendanceRecord {
    /// Records are keyed by date within a club.
    pub fn doc_id(chair_email: &str, date: NaiveDate) -> String {
        format!("{}_{}", date.format("%Y-%m-%d"), chair_email)
    }
}
