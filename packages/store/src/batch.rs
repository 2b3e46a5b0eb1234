//! # Batches: conditional multi-document writes
//!
//! A [`Batch`] groups writes across any number of collections. Each write names a
//! [`Precondition`] on the current state of its target document. Backends check
//! every precondition first and only then apply the writes, so either the whole
//! batch lands or nothing does.
//!
//! | Precondition | Holds when |
//! |--------------|------------|
//! | [`Precondition::None`] | always |
//! | [`Precondition::Missing`] | the document does not exist |
//! | [`Precondition::Version`] | the document exists at exactly that version |
//!
//! A failed precondition surfaces as [`StoreError::Conflict`]; callers doing a
//! read-modify-write re-read and retry.

use crate::document::{Document, Fields};
use crate::error::StoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precondition {
    None,
    Missing,
    Version(u64),
}

impl Precondition {
    /// The precondition that pins a document to the state it was read in.
    pub fn from_read(doc: Option<&Document>) -> Self {
        match doc {
            Some(d) => Precondition::Version(d.version),
            None => Precondition::Missing,
        }
    }

    fn describe(&self) -> String {
        match self {
            Precondition::None => "any".to_string(),
            Precondition::Missing => "missing".to_string(),
            Precondition::Version(v) => format!("version {v}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    Set(Fields),
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Write {
    pub collection: String,
    pub id: String,
    pub op: WriteOp,
    pub precondition: Precondition,
}

impl Write {
    /// Verify this write's precondition against the document currently stored.
    pub fn check(&self, current: Option<&Document>) -> Result<(), StoreError> {
        let ok = match (self.precondition, current) {
            (Precondition::None, _) => true,
            (Precondition::Missing, None) => true,
            (Precondition::Missing, Some(_)) => false,
            (Precondition::Version(v), Some(doc)) => doc.version == v,
            (Precondition::Version(_), None) => false,
        };
        if ok {
            return Ok(());
        }
        let found = match current {
            Some(doc) => format!("version {}", doc.version),
            None => "missing".to_string(),
        };
        Err(StoreError::Conflict {
            collection: self.collection.clone(),
            id: self.id.clone(),
            expected: self.precondition.describe(),
            found,
        })
    }

    /// The document this write produces, or `None` for a delete.
    pub fn apply(&self, current: Option<&Document>) -> Option<Document> {
        match &self.op {
            WriteOp::Set(fields) => Some(Document {
                id: self.id.clone(),
                version: current.map(|d| d.version + 1).unwrap_or(1),
                fields: fields.clone(),
            }),
            WriteOp::Delete => None,
        }
    }
}

/// An ordered list of writes committed all-or-nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    writes: Vec<Write>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(self, collection: &str, id: &str, fields: Fields) -> Self {
        self.set_if(collection, id, fields, Precondition::None)
    }

    pub fn set_if(
        mut self,
        collection: &str,
        id: &str,
        fields: Fields,
        precondition: Precondition,
    ) -> Self {
        self.writes.push(Write {
            collection: collection.to_string(),
            id: id.to_string(),
            op: WriteOp::Set(fields),
            precondition,
        });
        self
    }

    pub fn delete(self, collection: &str, id: &str) -> Self {
        self.delete_if(collection, id, Precondition::None)
    }

    pub fn delete_if(mut self, collection: &str, id: &str, precondition: Precondition) -> Self {
        self.writes.push(Write {
            collection: collection.to_string(),
            id: id.to_string(),
            op: WriteOp::Delete,
            precondition,
        });
        self
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Reject batches that write the same document twice; the second write's
    /// precondition would be checked against stale state.
    pub fn validate(&self) -> Result<(), StoreError> {
        for (i, w) in self.writes.iter().enumerate() {
            if self.writes[..i]
                .iter()
                .any(|prev| prev.collection == w.collection && prev.id == w.id)
            {
                return Err(StoreError::Unavailable(format!(
                    "batch writes {}/{} more than once",
                    w.collection, w.id
                )));
            }
        }
        Ok(())
    }
}
