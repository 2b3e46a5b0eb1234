//! # Document store: the storage seam shared by every backend
//!
//! [`DocumentStore`] is the async interface every data operation in the `api`
//! crate is written against. The same logic runs against [`crate::MemoryStore`]
//! (tests, ephemeral use) and [`crate::FileStore`] (persistent, on-device).
//!
//! ## Trait methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`get`](DocumentStore::get) | Fetch one document by collection and id. |
//! | [`query`](DocumentStore::query) | Equality-filtered, ordered read of one collection. |
//! | [`commit`](DocumentStore::commit) | Apply a [`Batch`] atomically, returning the documents written. |
//! | [`subscribe`](DocumentStore::subscribe) | Receiver on the store-wide change feed. |
//!
//! ## Live queries
//!
//! [`LiveQuery`] turns the change feed into snapshot updates for one query. It
//! subscribes before loading the initial snapshot so no change is missed, then on
//! every relevant [`ChangeEvent`] re-runs the query and reports what was added,
//! modified or removed relative to the previous snapshot.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::broadcast;

use crate::batch::Batch;
use crate::document::{Document, Fields};
use crate::error::StoreError;
use crate::query::Query;

/// Capacity of each backend's change feed.
pub const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Published on the change feed for every document a committed batch touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
}

/// Async interface over a collection-oriented document database.
pub trait DocumentStore {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>>;

    fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Document>, StoreError>>;

    fn commit(&self, batch: Batch) -> impl Future<Output = Result<Vec<Document>, StoreError>>;

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Unconditionally write a single document.
    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<Document, StoreError>> {
        let batch = Batch::new().set(collection, id, fields);
        let collection = collection.to_string();
        let id = id.to_string();
        async move {
            self.commit(batch)
                .await?
                .pop()
                .ok_or(StoreError::NotFound { collection, id })
        }
    }
}

/// A set of changes between two consecutive snapshots of a live query.
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentChange {
    Added(Document),
    Modified(Document),
    Removed(String),
}

/// The result of a live query after a change.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
    pub changes: Vec<DocumentChange>,
}

/// Compute the incremental changes that turn `old` into `new`.
pub fn diff_snapshots(old: &[Document], new: &[Document]) -> Vec<DocumentChange> {
    let before: HashMap<&str, u64> = old.iter().map(|d| (d.id.as_str(), d.version)).collect();
    let after: HashMap<&str, u64> = new.iter().map(|d| (d.id.as_str(), d.version)).collect();

    let mut changes = Vec::new();
    for doc in new {
        match before.get(doc.id.as_str()) {
            None => changes.push(DocumentChange::Added(doc.clone())),
            Some(v) if *v != doc.version => changes.push(DocumentChange::Modified(doc.clone())),
            Some(_) => {}
        }
    }
    for doc in old {
        if !after.contains_key(doc.id.as_str()) {
            changes.push(DocumentChange::Removed(doc.id.clone()));
        }
    }
    changes
}

/// A query kept up to date from the store's change feed.
pub struct LiveQuery<'a, S: DocumentStore> {
    store: &'a S,
    collection: String,
    query: Query,
    receiver: broadcast::Receiver<ChangeEvent>,
    current: Vec<Document>,
}

impl<'a, S: DocumentStore> LiveQuery<'a, S> {
    pub async fn open(store: &'a S, collection: &str, query: Query) -> Result<Self, StoreError> {
        let receiver = store.subscribe();
        let current = store.query(collection, &query).await?;
        Ok(Self {
            store,
            collection: collection.to_string(),
            query,
            receiver,
            current,
        })
    }

    /// The latest snapshot.
    pub fn current(&self) -> &[Document] {
        &self.current
    }

    /// Wait for the next change to this collection and return the new snapshot.
    pub async fn changed(&mut self) -> Result<Snapshot, StoreError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.collection == self.collection => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, collection = %self.collection, "change feed lagged, reloading");
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::Unavailable("change feed closed".to_string()));
                }
            }
        }
        self.refresh().await
    }

    /// Re-run the query now. Needed when writes happen outside this process
    /// and never reach the change feed.
    pub async fn refresh(&mut self) -> Result<Snapshot, StoreError> {
        let documents = self.store.query(&self.collection, &self.query).await?;
        let changes = diff_snapshots(&self.current, &documents);
        self.current = documents.clone();
        Ok(Snapshot { documents, changes })
    }
}
