//! GraphQL DataLoader for hint fields
//!
//! The reducer leaves relationships as raw child IRIs under hint keys
//! (`installed_sw_iri`, `ports_iri`, ...). Field resolvers of the API layer
//! materialise them on demand. Going through a DataLoader collects every
//! hint requested within the same tick and fetches them with one query:
//!
//! ```text
//! SELECT DISTINCT ?iri ?id ?object_type ...
//! WHERE { VALUES ?iri { <a> <b> <c> } ?iri a <class> . OPTIONAL { ... } }
//! ```
//!
//! One loader is registered per target kind. Only broad fields are bound;
//! second-pass aggregates are not joined for hint materialisation.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dataloader::Loader;

use crate::entities::EntityKind;
use crate::error::DataError;
use crate::orm::builder::{SelectQuery, Selection};
use crate::orm::reducer::{Node, Reducer};
use crate::services::{ResultShape, StoreExecutor, StoreRequest, collapse_rows};

/// Batch loader from hint IRIs to nodes of one kind.
///
/// # Example
///
/// ```ignore
/// let loader = DataLoader::new(
///     HintLoader::new(store.clone(), "cyio", EntityKind::Software),
///     tokio::spawn,
/// );
/// let software = loader.load_many(node_hints).await?;
/// ```
pub struct HintLoader<S> {
    store: Arc<S>,
    database: String,
    kind: EntityKind,
    selection: Selection,
}

impl<S: StoreExecutor> HintLoader<S> {
    pub fn new(store: Arc<S>, database: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            store,
            database: database.into(),
            kind,
            selection: Selection::all(kind),
        }
    }

    /// Narrow the fields fetched for each hint.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }
}

impl<S> Loader<String> for HintLoader<S>
where
    S: StoreExecutor + 'static,
{
    type Value = Node;
    type Error = Arc<DataError>;

    async fn load(&self, keys: &[String]) -> Result<HashMap<String, Self::Value>, Self::Error> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        tracing::debug!(
            kind = %self.kind,
            hint_count = keys.len(),
            "Batch loading {} hints",
            self.kind
        );

        let built = SelectQuery::new(self.kind)
            .select(&self.selection)
            .by_iris(keys.to_vec())
            .build()
            .map_err(Arc::new)?;

        let rows = self
            .store
            .execute(StoreRequest::query(
                &self.database,
                &built.text,
                ResultShape::List,
            ))
            .await
            .map_err(|e| Arc::new(DataError::from(e)))?;

        let reducer = Reducer::new(self.kind, &self.selection).database(&self.database);
        let result: HashMap<String, Node> = reducer
            .reduce_all(collapse_rows(rows))
            .into_iter()
            .map(|node| (node.iri().to_string(), node.project(&self.selection)))
            .collect();

        tracing::debug!(
            kind = %self.kind,
            requested = keys.len(),
            loaded = result.len(),
            "Hint batch load complete"
        );

        Ok(result)
    }
}
