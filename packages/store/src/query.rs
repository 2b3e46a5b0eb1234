//! # Queries: equality filters, ordering, limits
//!
//! A [`Query`] is evaluated by every backend the same way: keep the documents
//! whose fields equal every filter value, sort them by the ordering field (ties
//! broken by document id so results are deterministic), then truncate to the
//! limit.
//!
//! Field values are compared with [`compare_values`]: missing/null sorts first,
//! then booleans, numbers and strings. Dates are stored as ISO strings and
//! timestamps as epoch milliseconds, so both order correctly.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Document;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A filtered, ordered read of a single collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    /// Sort by `field`. Later calls add secondary sort keys.
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order.push((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| doc.field(field) == Some(value))
    }

    /// Apply the query to an unordered set of documents.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        out.sort_by(|a, b| {
            for (field, direction) in &self.order {
                let ord = compare_values(a.field(field), b.field(field));
                let ord = match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.id.cmp(&b.id)
        });
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over JSON field values used for sorting.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        Document {
            id: id.to_string(),
            version: 1,
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    fn sample() -> Vec<Document> {
        vec![
            doc("c", json!({"chairEmail": "a@club", "date": "2025-10-24", "amount": 5000})),
            doc("a", json!({"chairEmail": "a@club", "date": "2025-10-26", "amount": 10000})),
            doc("b", json!({"chairEmail": "b@club", "date": "2025-10-25", "amount": 200})),
            doc("d", json!({"chairEmail": "a@club", "date": "2025-10-26", "amount": -300})),
        ]
    }

    #[test]
    fn test_equality_filter() {
        let q = Query::new().where_eq("chairEmail", "a@club");
        let ids: Vec<_> = q.apply(sample()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_order_descending_with_id_tiebreak() {
        let q = Query::new()
            .where_eq("chairEmail", "a@club")
            .order_by("date", Direction::Descending);
        let ids: Vec<_> = q.apply(sample()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "d", "c"]);
    }

    #[test]
    fn test_numeric_order_and_limit() {
        let q = Query::new().order_by("amount", Direction::Ascending).limit(2);
        let ids: Vec<_> = q.apply(sample()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["d", "b"]);
    }

    #[test]
    fn test_missing_field_sorts_first() {
        assert_eq!(
            compare_values(None, Some(&json!("x"))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!(3)), Some(&json!(2.5))),
            Ordering::Greater
        );
    }
}
