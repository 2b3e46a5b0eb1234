//! # Blob storage: content-addressed binary objects
//!
//! Member photos and other uploads are stored by content hash. [`hash_blob`]
//! frames the bytes with a git-style `"blob {len}\0"` header and takes the
//! SHA-1 of the result, so identical uploads share one object and a [`Sha`]
//! is enough to fetch it back.
//!
//! A [`BlobRef`] records where the object was filed (`"{prefix}/{sha}"`, e.g.
//! `memberImages/3b18e5…`) together with the URL the backend serves it under.

use std::future::Future;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::StoreError;

/// A 20-byte SHA-1 hash identifying a blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha(pub [u8; 20]);

impl Sha {
    /// Create a Sha from a hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 40 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Sha(bytes))
    }

    /// Return the hex string representation.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Sha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash blob content with its header: "blob {size}\0{content}"
pub fn hash_blob(content: &[u8]) -> Sha {
    let header = format!("blob {}\0", content.len());
    let mut hasher = Sha1::new();
    hasher.update(header.as_bytes());
    hasher.update(content);
    let result = hasher.finalize();
    let mut sha_bytes = [0u8; 20];
    sha_bytes.copy_from_slice(&result);
    Sha(sha_bytes)
}

/// Where an uploaded blob lives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlobRef {
    pub sha: Sha,
    /// Storage path: "memberImages/<sha hex>"
    pub path: String,
    /// Public URL of the stored object.
    pub url: String,
}

/// Keep path prefixes to a single safe segment.
pub fn sanitize_prefix(prefix: &str) -> String {
    let cleaned: String = prefix
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "blobs".to_string()
    } else {
        cleaned
    }
}

/// Async interface for binary uploads.
pub trait BlobStore {
    fn put_blob(
        &self,
        prefix: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<BlobRef, StoreError>>;

    fn get_blob(
        &self,
        prefix: &str,
        sha: &Sha,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>>;
}
