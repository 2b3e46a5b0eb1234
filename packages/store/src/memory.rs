use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::batch::Batch;
use crate::blob::{hash_blob, sanitize_prefix, BlobRef, BlobStore, Sha};
use crate::document::Document;
use crate::error::StoreError;
use crate::query::Query;
use crate::repo::{ChangeEvent, ChangeKind, DocumentStore, CHANGE_FEED_CAPACITY};

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-memory DocumentStore for testing and ephemeral sessions.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: Arc::default(),
            blobs: Arc::default(),
            changes,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_collections(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.lock_collections()?;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self.lock_collections()?;
        let docs = collections
            .get(collection)
            .map(|c| c.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(query.apply(docs))
    }

    async fn commit(&self, batch: Batch) -> Result<Vec<Document>, StoreError> {
        batch.validate()?;
        let mut collections = self.lock_collections()?;

        for write in batch.writes() {
            let current = collections
                .get(&write.collection)
                .and_then(|c| c.get(&write.id));
            write.check(current)?;
        }

        let mut written = Vec::new();
        let mut events = Vec::new();
        for write in batch.writes() {
            let docs = collections.entry(write.collection.clone()).or_default();
            let existed = docs.contains_key(&write.id);
            match write.apply(docs.get(&write.id)) {
                Some(doc) => {
                    docs.insert(write.id.clone(), doc.clone());
                    written.push(doc);
                    events.push(ChangeEvent {
                        collection: write.collection.clone(),
                        id: write.id.clone(),
                        kind: if existed {
                            ChangeKind::Updated
                        } else {
                            ChangeKind::Created
                        },
                    });
                }
                None => {
                    if docs.remove(&write.id).is_some() {
                        events.push(ChangeEvent {
                            collection: write.collection.clone(),
                            id: write.id.clone(),
                            kind: ChangeKind::Deleted,
                        });
                    }
                }
            }
        }
        drop(collections);

        for event in events {
            // No receivers is fine.
            let _ = self.changes.send(event);
        }
        Ok(written)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

impl BlobStore for MemoryStore {
    async fn put_blob(&self, prefix: &str, data: Vec<u8>) -> Result<BlobRef, StoreError> {
        let sha = hash_blob(&data);
        let path = format!("{}/{}", sanitize_prefix(prefix), sha.to_hex());
        self.blobs
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?
            .insert(path.clone(), data);
        Ok(BlobRef {
            url: format!("memory://{path}"),
            sha,
            path,
        })
    }

    async fn get_blob(&self, prefix: &str, sha: &Sha) -> Result<Option<Vec<u8>>, StoreError> {
        let path = format!("{}/{}", sanitize_prefix(prefix), sha.to_hex());
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(blobs.get(&path).cloned())
    }
}
