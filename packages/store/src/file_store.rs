//! # Filesystem-backed document store
//!
//! [`FileStore`] is a [`DocumentStore`] and [`BlobStore`] implementation that
//! persists documents and uploads to the local filesystem. It is what the
//! `nkhonde` command line uses to keep club data across runs.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── documents/
//! │   └── <collection>/
//! │       └── <id>.json      # serialised Document (id, version, fields)
//! └── blobs/
//!     └── <prefix>/
//!         └── <sha_hex>      # raw upload bytes
//! ```
//!
//! ## Commits
//!
//! A commit takes the store's mutex, re-reads every target document, checks all
//! preconditions, stages each new document to `<id>.json.tmp` and only then
//! renames the staged files into place. Clones of a `FileStore` share the mutex
//! and the change feed; separate processes writing the same directory are not
//! coordinated.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::batch::Batch;
use crate::blob::{hash_blob, sanitize_prefix, BlobRef, BlobStore, Sha};
use crate::document::Document;
use crate::error::StoreError;
use crate::query::Query;
use crate::repo::{ChangeEvent, ChangeKind, DocumentStore, CHANGE_FEED_CAPACITY};

/// Filesystem-backed store for on-device persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
    lock: Arc<Mutex<()>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            base,
            lock: Arc::default(),
            changes,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn documents_dir(&self) -> PathBuf {
        self.base.join("documents")
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.documents_dir().join(encode_segment(collection))
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", encode_segment(id)))
    }

    fn blob_path(&self, prefix: &str, sha: &Sha) -> PathBuf {
        self.base
            .join("blobs")
            .join(sanitize_prefix(prefix))
            .join(sha.to_hex())
    }

    fn read_document(&self, path: &Path) -> Result<Option<Document>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let dir = self.collection_dir(collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut docs = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(doc) = self.read_document(&path)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.lock
            .lock()
            .map_err(|_| StoreError::Unavailable("file store lock poisoned".to_string()))
    }
}

/// Percent-encode anything outside `[A-Za-z0-9._@-]` so ids (which may be
/// e-mail addresses) map to a single safe path segment.
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'@' => out.push(b as char),
            b'.' if !out.is_empty() => out.push('.'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

impl DocumentStore for FileStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.read_document(&self.document_path(collection, id))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let docs = self.read_collection(collection)?;
        tracing::debug!(collection, scanned = docs.len(), "file store query");
        Ok(query.apply(docs))
    }

    async fn commit(&self, batch: Batch) -> Result<Vec<Document>, StoreError> {
        batch.validate()?;
        let _guard = self.guard()?;

        let mut current = Vec::with_capacity(batch.len());
        for write in batch.writes() {
            let path = self.document_path(&write.collection, &write.id);
            let doc = self.read_document(&path)?;
            write.check(doc.as_ref())?;
            current.push((path, doc));
        }

        // Stage every new document before touching any live file.
        let mut staged = Vec::new();
        for (write, (path, existing)) in batch.writes().iter().zip(&current) {
            if let Some(doc) = write.apply(existing.as_ref()) {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let tmp = path.with_extension("json.tmp");
                fs::write(&tmp, serde_json::to_vec_pretty(&doc)?)?;
                staged.push((tmp, doc));
            }
        }

        let mut written = Vec::new();
        let mut events = Vec::new();
        let mut staged = staged.into_iter();
        for (write, (path, existing)) in batch.writes().iter().zip(current) {
            let event = |kind| ChangeEvent {
                collection: write.collection.clone(),
                id: write.id.clone(),
                kind,
            };
            if write.apply(existing.as_ref()).is_some() {
                if let Some((tmp, doc)) = staged.next() {
                    fs::rename(&tmp, &path)?;
                    events.push(event(if existing.is_some() {
                        ChangeKind::Updated
                    } else {
                        ChangeKind::Created
                    }));
                    written.push(doc);
                }
            } else if existing.is_some() {
                fs::remove_file(&path)?;
                events.push(event(ChangeKind::Deleted));
            }
        }

        for event in events {
            let _ = self.changes.send(event);
        }
        Ok(written)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

impl BlobStore for FileStore {
    async fn put_blob(&self, prefix: &str, data: Vec<u8>) -> Result<BlobRef, StoreError> {
        let sha = hash_blob(&data);
        let path = self.blob_path(prefix, &sha);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        let url = match fs::canonicalize(&path) {
            Ok(abs) => format!("file://{}", abs.display()),
            Err(_) => format!("file://{}", path.display()),
        };
        Ok(BlobRef {
            path: format!("{}/{}", sanitize_prefix(prefix), sha.to_hex()),
            sha,
            url,
        })
    }

    async fn get_blob(&self, prefix: &str, sha: &Sha) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.blob_path(prefix, sha)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Precondition;
    use crate::document::Fields;
    use serde_json::json;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "nkhonde_store_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = test_dir("roundtrip");

        let store = FileStore::new(dir.clone());
        store
            .set("clubMembers", "M-001", fields(json!({"firstName": "Mary"})))
            .await
            .unwrap();

        // Re-open from same directory
        let store2 = FileStore::new(dir.clone());
        let doc = store2.get("clubMembers", "M-001").await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.field("firstName"), Some(&json!("Mary")));

        let all = store2.query("clubMembers", &Query::new()).await.unwrap();
        assert_eq!(all.len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_refresh_sees_writes_from_another_handle() {
        let dir = test_dir("refresh");
        let reader = FileStore::new(dir.clone());
        let writer = FileStore::new(dir.clone());

        let q = Query::new().where_eq("chairEmail", "x@c");
        let mut live = crate::repo::LiveQuery::open(&reader, "contributions", q)
            .await
            .unwrap();
        assert!(live.current().is_empty());

        // Separate handles do not share a change feed.
        writer
            .set("contributions", "c1", fields(json!({"chairEmail": "x@c"})))
            .await
            .unwrap();
        let snapshot = live.refresh().await.unwrap();
        assert_eq!(snapshot.documents.len(), 1);
        assert_eq!(snapshot.changes.len(), 1);

        let again = live.refresh().await.unwrap();
        assert!(again.changes.is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_store_conflict_leaves_files_untouched() {
        let dir = test_dir("conflict");
        let store = FileStore::new(dir.clone());

        store
            .set("loans", "l1", fields(json!({"status": "Pending"})))
            .await
            .unwrap();

        let batch = Batch::new()
            .set("contributions", "c1", fields(json!({"amount": -2000})))
            .set_if(
                "loans",
                "l1",
                fields(json!({"status": "Approved"})),
                Precondition::Version(7),
            );
        assert!(store.commit(batch).await.unwrap_err().is_conflict());
        assert!(store.get("contributions", "c1").await.unwrap().is_none());

        let loan = store.get("loans", "l1").await.unwrap().unwrap();
        assert_eq!(loan.field("status"), Some(&json!("Pending")));

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_store_delete_and_email_ids() {
        let dir = test_dir("delete");
        let store = FileStore::new(dir.clone());

        store
            .set("admins", "chair@club.mw", fields(json!({"name": "Chair"})))
            .await
            .unwrap();
        assert!(store.get("admins", "chair@club.mw").await.unwrap().is_some());

        store
            .commit(Batch::new().delete("admins", "chair@club.mw"))
            .await
            .unwrap();
        assert!(store.get("admins", "chair@club.mw").await.unwrap().is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_store_blobs() {
        let dir = test_dir("blobs");
        let store = FileStore::new(dir.clone());

        let blob = store.put_blob("memberImages", vec![1, 2, 3]).await.unwrap();
        assert!(blob.url.starts_with("file://"));
        assert_eq!(
            store.get_blob("memberImages", &blob.sha).await.unwrap(),
            Some(vec![1, 2, 3])
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("chair@club.mw"), "chair@club.mw");
        assert_eq!(encode_segment("../x"), "%2E.%2Fx");
        assert_eq!(encode_segment("a b"), "a%20b");
    }
}
