use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A signed ledger entry: deposits are positive, loan-driven debits negative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub id: String,
    /// Stable member identifier; ledger lookups join on this.
    pub member_id: String,
    /// Display name captured when the entry was written.
    pub member_name: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub chair_email: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Input of the add-contribution form.
#[derive(Clone, Debug, PartialEq)]
pub struct NewContribution {
    pub member_id: String,
    pub amount: i64,
    pub date: NaiveDate,
}
