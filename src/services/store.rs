//! Store executor boundary.
//!
//! The triple store is an opaque collaborator: it receives a query string for a
//! logical database and answers with flat rows, or fails. Everything above this
//! trait is store-agnostic.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// One flat result row, keyed by projection variable.
pub type Row = Map<String, Value>;

/// Whether a statement reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Query,
    Update,
}

/// Hint about how many rows the caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Single,
    List,
}

/// A single round trip to the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreRequest<'a> {
    pub database: &'a str,
    pub text: &'a str,
    pub operation: StoreOperation,
    pub shape: Option<ResultShape>,
}

impl<'a> StoreRequest<'a> {
    pub fn query(database: &'a str, text: &'a str, shape: ResultShape) -> Self {
        Self {
            database,
            text,
            operation: StoreOperation::Query,
            shape: Some(shape),
        }
    }

    pub fn update(database: &'a str, text: &'a str) -> Self {
        Self {
            database,
            text,
            operation: StoreOperation::Update,
            shape: None,
        }
    }
}

/// Failures raised by a store executor.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed store response: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Executes query-language text against the store.
///
/// Implementations own transport, authentication, timeouts and any retry
/// policy. Each call is one self-contained request; an update request is
/// applied atomically by the store or not at all.
#[async_trait]
pub trait StoreExecutor: Send + Sync {
    async fn execute(&self, request: StoreRequest<'_>) -> Result<Vec<Row>, StoreError>;
}

#[async_trait]
impl<T: StoreExecutor + ?Sized> StoreExecutor for std::sync::Arc<T> {
    async fn execute(&self, request: StoreRequest<'_>) -> Result<Vec<Row>, StoreError> {
        (**self).execute(request).await
    }
}

/// Build a row from a JSON object literal. Non-objects yield an empty row.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Merge rows that share the same `iri` binding.
///
/// A SELECT over multi-valued predicates returns one row per value
/// combination. Collapsing keeps the first-seen row order and turns a key
/// that received differing values into an array of the distinct values.
/// Rows without an `iri` binding are kept as they are.
pub fn collapse_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut collapsed: Vec<Row> = Vec::with_capacity(rows.len());
    let mut positions: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for row in rows {
        let Some(iri) = row.get("iri").and_then(Value::as_str).map(str::to_string) else {
            collapsed.push(row);
            continue;
        };

        match positions.get(&iri) {
            None => {
                positions.insert(iri, collapsed.len());
                collapsed.push(row);
            }
            Some(&index) => {
                let target = &mut collapsed[index];
                for (key, value) in row {
                    merge_value(target, key, value);
                }
            }
        }
    }

    collapsed
}

fn merge_value(target: &mut Row, key: String, value: Value) {
    match target.get_mut(&key) {
        None => {
            target.insert(key, value);
        }
        Some(Value::Array(existing)) => {
            if !existing.contains(&value) {
                existing.push(value);
            }
        }
        Some(existing) => {
            if *existing != value {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_collapse_merges_multi_valued_bindings() {
        let rows = vec![
            row(json!({"iri": "a", "name": "one", "labels": "l1"})),
            row(json!({"iri": "b", "name": "two"})),
            row(json!({"iri": "a", "name": "one", "labels": "l2"})),
            row(json!({"iri": "a", "name": "one", "labels": "l1"})),
        ];

        let collapsed = collapse_rows(rows);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0]["iri"], json!("a"));
        assert_eq!(collapsed[0]["name"], json!("one"));
        assert_eq!(collapsed[0]["labels"], json!(["l1", "l2"]));
        assert_eq!(collapsed[1]["iri"], json!("b"));
    }

    #[test]
    fn test_collapse_keeps_rows_without_iri() {
        let rows = vec![row(json!({"count": 1})), row(json!({"count": 1}))];
        assert_eq!(collapse_rows(rows).len(), 2);
    }
}
