//! Contribution ledger entries: manual deposits, listing and the live feed.

use chrono::Utc;
use store::collections::CONTRIBUTIONS;
use store::{
    to_fields, Batch, Direction, Document, DocumentChange, DocumentStore, LiveQuery, Precondition,
    Query, Snapshot,
};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::members::get_member;
use crate::models::{Contribution, NewContribution};

fn club_query(chair_email: &str) -> Query {
    Query::new()
        .where_eq("chairEmail", chair_email)
        .order_by("date", Direction::Descending)
        .order_by("createdAt", Direction::Descending)
}

/// Record a deposit for a member of the club.
pub async fn add_contribution<S: DocumentStore>(
    store: &S,
    chair_email: &str,
    new: NewContribution,
) -> ApiResult<Contribution> {
    if new.amount <= 0 {
        return Err(ApiError::validation("Contribution amount must be positive"));
    }
    let member = get_member(store, chair_email, &new.member_id).await?;

    let contribution = Contribution {
        id: Uuid::new_v4().to_string(),
        member_name: member.display_name(),
        member_id: member.member_id,
        amount: new.amount,
        date: new.date,
        chair_email: chair_email.to_string(),
        created_at: Utc::now(),
    };
    store
        .commit(Batch::new().set_if(
            CONTRIBUTIONS,
            &contribution.id,
            to_fields(&contribution)?,
            Precondition::Missing,
        ))
        .await?;

    tracing::info!(
        member_id = %contribution.member_id,
        amount = contribution.amount,
        "contribution recorded"
    );
    Ok(contribution)
}

/// Every ledger entry of the club, newest date first.
pub async fn list_contributions<S: DocumentStore>(
    store: &S,
    chair_email: &str,
) -> ApiResult<Vec<Contribution>> {
    decode_all(&store.query(CONTRIBUTIONS, &club_query(chair_email)).await?)
}

fn decode_all(docs: &[Document]) -> ApiResult<Vec<Contribution>> {
    docs.iter()
        .map(|doc| doc.decode().map_err(ApiError::from))
        .collect()
}

/// Sum of all entries, loan debits included. Saturates at the `i64` bounds.
pub fn total_contributions(contributions: &[Contribution]) -> i64 {
    contributions
        .iter()
        .fold(0i64, |total, c| total.saturating_add(c.amount))
}

/// Live view of the club's contributions.
pub struct ContributionFeed<'a, S: DocumentStore> {
    live: LiveQuery<'a, S>,
}

impl<'a, S: DocumentStore> ContributionFeed<'a, S> {
    pub fn current(&self) -> ApiResult<Vec<Contribution>> {
        decode_all(self.live.current())
    }

    /// Wait for the next change and return the refreshed list together with the
    /// number of entries added, modified and removed.
    pub async fn next(&mut self) -> ApiResult<(Vec<Contribution>, FeedDelta)> {
        let snapshot = self.live.changed().await?;
        summarize(snapshot)
    }

    /// Re-read the list without waiting for a change event.
    pub async fn poll(&mut self) -> ApiResult<(Vec<Contribution>, FeedDelta)> {
        let snapshot = self.live.refresh().await?;
        summarize(snapshot)
    }
}

fn summarize(snapshot: Snapshot) -> ApiResult<(Vec<Contribution>, FeedDelta)> {
    let mut delta = FeedDelta::default();
    for change in &snapshot.changes {
        match change {
            DocumentChange::Added(_) => delta.added += 1,
            DocumentChange::Modified(_) => delta.modified += 1,
            DocumentChange::Removed(_) => delta.removed += 1,
        }
    }
    Ok((decode_all(&snapshot.documents)?, delta))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedDelta {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

impl FeedDelta {
    pub fn is_empty(&self) -> bool {
        self.added + self.modified + self.removed == 0
    }
}

pub async fn watch_contributions<'a, S: DocumentStore>(
    store: &'a S,
    chair_email: &str,
) -> ApiResult<ContributionFeed<'a, S>> {
    let live = LiveQuery::open(store, CONTRIBUTIONS, club_query(chair_email)).await?;
    Ok(ContributionFeed { live })
}
