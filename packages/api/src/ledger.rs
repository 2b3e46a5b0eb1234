//! # Ledger adjustment on loan approval
//!
//! Approving a loan debits the member's contribution balance by the loan amount;
//! unapproving credits it back. The member's ledger entry is the earliest
//! contribution (by `createdAt`, then id) with the loan's `memberId` in the same
//! club. When the member has none, a synthetic entry holding just the adjustment
//! is created.
//!
//! Each transition is planned from a fresh read and committed as one batch:
//!
//! | Write | Precondition |
//! |-------|--------------|
//! | loan with the new status | loan version as read |
//! | ledger entry with `amount + delta` | entry version as read, or missing |
//! | "Loan Update" notification | missing |
//!
//! If anything moved between read and commit the store rejects the batch
//! without writing; the transition is re-planned up to
//! [`LedgerConfig::max_commit_retries`] more times before reporting a conflict.

use chrono::Utc;
use store::collections::{CONTRIBUTIONS, LOANS, NOTIFICATIONS};
use store::config::LedgerConfig;
use store::{to_fields, Batch, Direction, Document, DocumentStore, Precondition, Query};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::loans::load_loan;
use crate::models::{Contribution, Loan, LoanStatus, Notification, NotificationCategory};

/// Which loan to act on, on behalf of which admin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoanDecision {
    pub loan_id: String,
    pub chair_email: String,
}

impl LoanDecision {
    pub fn new(chair_email: &str, loan_id: &str) -> Self {
        Self {
            loan_id: loan_id.to_string(),
            chair_email: chair_email.to_string(),
        }
    }
}

/// Outcome of a committed transition.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerAdjustment {
    pub loan: Loan,
    /// The ledger entry after the adjustment.
    pub contribution: Contribution,
    /// Signed change applied to the entry's amount.
    pub delta: i64,
    /// Whether the entry was created by this transition.
    pub created: bool,
}

/// Pending → Approved, debiting the member's ledger entry.
pub async fn approve_loan<S: DocumentStore>(
    store: &S,
    config: &LedgerConfig,
    decision: &LoanDecision,
) -> ApiResult<LedgerAdjustment> {
    transition(store, config, decision, LoanStatus::Approved).await
}

/// Approved → Pending, crediting the loan amount back.
pub async fn unapprove_loan<S: DocumentStore>(
    store: &S,
    config: &LedgerConfig,
    decision: &LoanDecision,
) -> ApiResult<LedgerAdjustment> {
    transition(store, config, decision, LoanStatus::Pending).await
}

/// Current balance of a member: the sum of all their entries, saturating at
/// the `i64` bounds.
pub async fn member_balance<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    member_id: &str,
) -> ApiResult<i64> {
    let docs = store
        .query(CONTRIBUTIONS, &member_entries(chair_email, member_id))
        .await?;
    let mut balance: i64 = 0;
    for doc in &docs {
        balance = balance.saturating_add(doc.decode::<Contribution>()?.amount);
    }
    Ok(balance)
}

fn member_entries(chair_email: &str, member_id: &str) -> Query {
    Query::new()
        .where_eq("chairEmail", chair_email)
        .where_eq("memberId", member_id)
        .order_by("createdAt", Direction::Ascending)
}

async fn ledger_entry<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    member_id: &str,
) -> ApiResult<Option<Document>> {
    let mut docs = store
        .query(CONTRIBUTIONS, &member_entries(chair_email, member_id).limit(1))
        .await?;
    Ok(docs.pop())
}

async fn transition<S: DocumentStore>(
    store: &S,
    config: &LedgerConfig,
    decision: &LoanDecision,
    target: LoanStatus,
) -> ApiResult<LedgerAdjustment> {
    let attempts = config.max_commit_retries.saturating_add(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let (batch, adjustment) = plan(store, decision, target).await?;
        match store.commit(batch).await {
            Ok(_) => {
                tracing::info!(
                    loan_id = %adjustment.loan.id,
                    member_id = %adjustment.loan.member_id,
                    status = %target,
                    delta = adjustment.delta,
                    balance = adjustment.contribution.amount,
                    "ledger adjusted"
                );
                return Ok(adjustment);
            }
            Err(e) if e.is_conflict() && attempt < attempts => {
                tracing::warn!(loan_id = %decision.loan_id, attempt, error = %e, "ledger commit conflicted, retrying");
            }
            Err(e) if e.is_conflict() => {
                return Err(ApiError::Conflict(format!(
                    "loan {} kept changing during the update; gave up after {} attempts",
                    decision.loan_id, attempts
                )));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn plan<S: DocumentStore>(
    store: &S,
    decision: &LoanDecision,
    target: LoanStatus,
) -> ApiResult<(Batch, LedgerAdjustment)> {
    let (mut loan, loan_version) = load_loan(store, &decision.chair_email, &decision.loan_id).await?;
    if loan.status == target {
        return Err(ApiError::Conflict(format!(
            "loan {} is already {}",
            loan.id, target
        )));
    }

    let delta = match target {
        LoanStatus::Approved => -loan.amount,
        LoanStatus::Pending => loan.amount,
    };
    let now = Utc::now();

    let existing = ledger_entry(store, &decision.chair_email, &loan.member_id).await?;
    let precondition = Precondition::from_read(existing.as_ref());
    let (contribution, created) = match existing {
        Some(doc) => {
            let mut entry: Contribution = doc.decode()?;
            entry.amount = entry.amount.checked_add(delta).ok_or_else(|| {
                ApiError::validation(format!(
                    "Adjusting {} by {} would overflow the balance",
                    loan.member_name, delta
                ))
            })?;
            (entry, false)
        }
        None => (
            Contribution {
                id: Uuid::new_v4().to_string(),
                member_id: loan.member_id.clone(),
                member_name: loan.member_name.clone(),
                amount: delta,
                date: now.date_naive(),
                chair_email: decision.chair_email.clone(),
                created_at: now,
            },
            true,
        ),
    };

    loan.status = target;

    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        title: "Loan Update".to_string(),
        message: format!("{} loan status: {}", loan.member_name, loan.status),
        created_at: now,
        user_email: None,
        category: NotificationCategory::Loan,
        chair_email: decision.chair_email.clone(),
    };

    let batch = Batch::new()
        .set_if(
            LOANS,
            &loan.id,
            to_fields(&loan)?,
            Precondition::Version(loan_version),
        )
        .set_if(
            CONTRIBUTIONS,
            &contribution.id,
            to_fields(&contribution)?,
            precondition,
        )
        .set_if(
            NOTIFICATIONS,
            &notification.id,
            to_fields(&notification)?,
            Precondition::Missing,
        );

    Ok((
        batch,
        LedgerAdjustment {
            loan,
            contribution,
            delta,
            created,
        },
    ))
}
