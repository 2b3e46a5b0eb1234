//! Meeting attendance and absence penalties.
//!
//! Only the present/absent marks are stored. The penalty is always derived from
//! the current marks and the configured per-absence amount.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use store::collections::ATTENDANCE;
use store::config::AttendanceConfig;
use store::{to_fields, DocumentStore};

use crate::error::{ApiError, ApiResult};
use crate::members::list_members;
use crate::models::AttendanceRecord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendanceRow {
    pub member_id: String,
    pub name: String,
    pub present: bool,
}

/// The roster of one meeting with each member's mark.
#[derive(Clone, Debug, PartialEq)]
pub struct AttendanceSheet {
    date: NaiveDate,
    penalty_amount: i64,
    rows: Vec<AttendanceRow>,
}

impl AttendanceSheet {
    /// Build a sheet for `roster` (member id, name). Members without a stored
    /// mark count as present; marks for ids not on the roster are dropped.
    pub fn new(
        date: NaiveDate,
        penalty_amount: i64,
        roster: impl IntoIterator<Item = (String, String)>,
        stored: &BTreeMap<String, bool>,
    ) -> Self {
        let rows = roster
            .into_iter()
            .map(|(member_id, name)| {
                let present = stored.get(&member_id).copied().unwrap_or(true);
                AttendanceRow {
                    member_id,
                    name,
                    present,
                }
            })
            .collect();
        Self {
            date,
            penalty_amount,
            rows,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn rows(&self) -> &[AttendanceRow] {
        &self.rows
    }

    pub fn penalty_amount(&self) -> i64 {
        self.penalty_amount
    }

    fn row_mut(&mut self, member_id: &str) -> ApiResult<&mut AttendanceRow> {
        self.rows
            .iter_mut()
            .find(|r| r.member_id == member_id)
            .ok_or_else(|| ApiError::not_found("member", member_id))
    }

    pub fn set_present(&mut self, member_id: &str, present: bool) -> ApiResult<()> {
        self.row_mut(member_id)?.present = present;
        Ok(())
    }

    /// Flip a member's mark, returning the new value.
    pub fn toggle(&mut self, member_id: &str) -> ApiResult<bool> {
        let row = self.row_mut(member_id)?;
        row.present = !row.present;
        Ok(row.present)
    }

    pub fn absent_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.present).count()
    }

    pub fn total_penalty(&self) -> i64 {
        self.absent_count() as i64 * self.penalty_amount
    }

    /// Penalty owed by one member; zero when present or not on the roster.
    pub fn penalty_for(&self, member_id: &str) -> i64 {
        match self.rows.iter().find(|r| r.member_id == member_id) {
            Some(row) if !row.present => self.penalty_amount,
            _ => 0,
        }
    }

    pub fn marks(&self) -> BTreeMap<String, bool> {
        self.rows
            .iter()
            .map(|r| (r.member_id.clone(), r.present))
            .collect()
    }
}

/// Load the sheet for `date`: the club's current roster merged with any stored
/// marks.
pub async fn load_sheet<S: DocumentStore>(
    store: &S,
    config: &AttendanceConfig,
    chair_email: &str,
    date: NaiveDate,
) -> ApiResult<AttendanceSheet> {
    let members = list_members(store, chair_email).await?;
    let stored = match store
        .get(ATTENDANCE, &AttendanceRecord::doc_id(chair_email, date))
        .await?
    {
        Some(doc) => doc.decode::<AttendanceRecord>()?.marks,
        None => BTreeMap::new(),
    };

    let roster = members.into_iter().map(|m| {
        let name = m.display_name();
        (m.member_id, name)
    });
    Ok(AttendanceSheet::new(date, config.penalty_amount, roster, &stored))
}

/// Persist the sheet's marks, replacing whatever was stored for that date.
pub async fn save_sheet<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    sheet: &AttendanceSheet,
) -> ApiResult<AttendanceRecord> {
    let record = AttendanceRecord {
        date: sheet.date(),
        chair_email: chair_email.to_string(),
        marks: sheet.marks(),
    };
    store
        .set(
            ATTENDANCE,
            &AttendanceRecord::doc_id(chair_email, record.date),
            to_fields(&record)?,
        )
        .await?;

    tracing::info!(
        date = %record.date,
        absent = sheet.absent_count(),
        penalty = sheet.total_penalty(),
        "attendance saved"
    );
    Ok(record)
}
