use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Loan lifecycle. Both transitions are admin-triggered and reversible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Pending,
    Approved,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Approved => "Approved",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(LoanStatus::Pending),
            "approved" => Ok(LoanStatus::Approved),
            other => Err(format!("unknown loan status: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,
    pub member_id: String,
    pub member_name: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub status: LoanStatus,
    pub chair_email: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Input of the new-loan form.
#[derive(Clone, Debug, PartialEq)]
pub struct NewLoan {
    pub member_id: String,
    pub amount: i64,
    pub date: NaiveDate,
}
