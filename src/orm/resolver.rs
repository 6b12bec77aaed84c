//! Reference resolution ahead of mutations.
//!
//! Relational fields arrive as public ids. Before any statement is built,
//! each id is looked up with a narrow existence query; a miss aborts the
//! whole mutation with `NotFound`, so nothing is ever written with a
//! dangling reference.

use std::collections::HashMap;

use serde_json::Value;

use crate::entities::EntityKind;
use crate::entities::vocab::PRED_ID;
use crate::error::{DataError, DataResult};
use crate::orm::identity::{iri_term, validate_id, validate_iri};
use crate::orm::traits::{PredicateDescriptor, ValueKind, literal};
use crate::services::{ResultShape, StoreExecutor, StoreRequest};

/// Resolved IRIs per relational field.
pub type ResolvedRefs = HashMap<&'static str, Vec<String>>;

/// Existence lookups against one database.
pub struct Resolver<'a, S: ?Sized> {
    store: &'a S,
    database: &'a str,
}

impl<'a, S: StoreExecutor + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S, database: &'a str) -> Self {
        Self { store, database }
    }

    /// Resolve a public id of `kind` to its graph identity.
    pub async fn resolve(&self, external_id: &str, kind: EntityKind) -> DataResult<String> {
        validate_id(external_id)?;
        let text = format!(
            "SELECT ?iri\nWHERE {{\n  ?iri a <{}> ;\n    {} {} .\n}}\nLIMIT 1",
            kind.primary_class(),
            PRED_ID,
            literal(external_id.trim())
        );
        let rows = self
            .store
            .execute(StoreRequest::query(self.database, &text, ResultShape::Single))
            .await?;

        rows.iter()
            .find_map(|row| row.get("iri").and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| {
                tracing::debug!(kind = %kind, id = %external_id, "Reference did not resolve");
                DataError::not_found(kind, external_id)
            })
    }

    /// Whether an entity of `kind` exists at `iri`.
    pub async fn exists(&self, iri: &str, kind: EntityKind) -> DataResult<bool> {
        validate_iri(iri)?;
        let text = format!(
            "SELECT ?iri\nWHERE {{\n  VALUES ?iri {{ {} }}\n  ?iri a <{}> .\n}}\nLIMIT 1",
            iri_term(iri),
            kind.primary_class()
        );
        let rows = self
            .store
            .execute(StoreRequest::query(self.database, &text, ResultShape::Single))
            .await?;
        Ok(!rows.is_empty())
    }

    /// Resolve every id supplied for one relational field.
    pub async fn resolve_field(
        &self,
        descriptor: &PredicateDescriptor,
        values: &[&Value],
    ) -> DataResult<Vec<String>> {
        let ValueKind::Reference(target) = descriptor.value else {
            return Err(DataError::validation(descriptor.field, "not a relational field"));
        };

        let mut resolved = Vec::with_capacity(values.len());
        for value in values {
            let id = value
                .as_str()
                .ok_or_else(|| DataError::validation(descriptor.field, "expected an id"))?;
            resolved.push(self.resolve(id, target).await?);
        }
        Ok(resolved)
    }
}
