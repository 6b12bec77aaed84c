//! Repository pattern for entity data access
//!
//! [Repository] is the entry point used by API resolvers and internal
//! service code alike. It owns nothing but a store handle and the
//! configuration, and strings the other pieces together:
//!
//! ```text
//! list:   SelectQuery -> store -> Reducer -> (second pass) -> assemble -> project
//! create: Resolver -> build_insert -> store -> read back
//! update: read current -> Resolver -> diff -> store -> read back
//! delete: read current -> build_delete -> store
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! let repo = Repository::new(store, &config);
//!
//! let page = repo
//!     .list(EntityKind::Software, &Selection::new(["name", "display_name"]), &ListArgs::default().first(25))
//!     .await?;
//!
//! let created = repo
//!     .create(EntityKind::Software, &props)
//!     .await?;
//! ```

use chrono::Utc;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::entities::EntityKind;
use crate::error::{DataError, DataResult};
use crate::graphql::pagination::{Connection, Edge, ListArgs, assemble};
use crate::orm::builder::{FieldPartition, ParentScope, SelectQuery, Selection};
use crate::orm::diff::{EditInstruction, EditOp, diff};
use crate::orm::identity::{is_empty_value, validate_entity_iri, validate_id};
use crate::orm::mutation::{build_delete, build_insert, values_of};
use crate::orm::reducer::{Node, Reducer};
use crate::orm::related::RelatedJoin;
use crate::orm::resolver::{ResolvedRefs, Resolver};
use crate::orm::traits::ValueKind;
use crate::services::{ResultShape, Row, StoreExecutor, StoreRequest, collapse_rows};

/// Data access for every entity kind against one logical database.
pub struct Repository<S> {
    store: S,
    database: String,
    related_batch_size: usize,
    related_concurrency: usize,
    default_page_size: Option<usize>,
}

impl<S: StoreExecutor> Repository<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            database: config.store_database.clone(),
            related_batch_size: config.related_batch_size,
            related_concurrency: config.related_concurrency,
            default_page_size: config.default_page_size,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn related(&self) -> RelatedJoin<'_, S> {
        RelatedJoin::new(
            &self.store,
            &self.database,
            self.related_batch_size,
            self.related_concurrency,
        )
    }

    fn resolver(&self) -> Resolver<'_, S> {
        Resolver::new(&self.store, &self.database)
    }

    async fn select(&self, text: &str, shape: ResultShape) -> DataResult<Vec<Row>> {
        let rows = self
            .store
            .execute(StoreRequest::query(&self.database, text, shape))
            .await?;
        Ok(collapse_rows(rows))
    }

    /// List entities of a kind as a connection.
    pub async fn list(
        &self,
        kind: EntityKind,
        selection: &Selection,
        args: &ListArgs,
    ) -> DataResult<Connection<Node>> {
        self.list_scoped(kind, selection, args, None).await
    }

    /// List the entities a parent points at through one of its fields.
    pub async fn list_related(
        &self,
        kind: EntityKind,
        selection: &Selection,
        args: &ListArgs,
        scope: ParentScope,
    ) -> DataResult<Connection<Node>> {
        self.list_scoped(kind, selection, args, Some(scope)).await
    }

    async fn list_scoped(
        &self,
        kind: EntityKind,
        selection: &Selection,
        args: &ListArgs,
        scope: Option<ParentScope>,
    ) -> DataResult<Connection<Node>> {
        let mut query = SelectQuery::new(kind)
            .select(selection)
            .bind_also(args.referenced_fields());
        if let Some(scope) = scope {
            query = query.parent_scope(scope);
        }
        let built = query.build()?;

        let resolved = selection.resolve(kind.predicate_map());
        let mut bound = resolved.clone();
        for field in args.referenced_fields() {
            bound.push(field);
        }

        let rows = self.select(&built.text, ResultShape::List).await?;
        let row_count = rows.len();
        let bound = bound.resolve(kind.predicate_map());
        let reducer = Reducer::new(kind, &bound).database(&self.database);
        let candidates = reducer.reduce_all(rows);

        // Sorting or filtering on an aggregate needs it on every candidate;
        // otherwise only the page's nodes are joined.
        let needs_all = built.partition.expensive_among(args.referenced_fields());
        let candidates = if needs_all {
            self.related()
                .attach(candidates, &built.partition.expensive)
                .await?
        } else {
            candidates
        };

        let mut args = args.clone();
        if args.first.is_none() {
            args.first = self.default_page_size;
        }
        let connection = assemble(candidates, &args);

        let connection = if !needs_all && built.partition.has_expensive() {
            self.attach_to_page(connection, &built.partition).await?
        } else {
            connection
        };

        tracing::debug!(
            kind = %kind,
            rows = row_count,
            edges = connection.edges.len(),
            global_count = connection.page_info.global_count,
            "Listed entities"
        );

        Ok(connection.map(|node| node.project(&resolved)))
    }

    async fn attach_to_page(
        &self,
        connection: Connection<Node>,
        partition: &FieldPartition,
    ) -> DataResult<Connection<Node>> {
        let Connection { edges, page_info } = connection;
        let (cursors, nodes): (Vec<String>, Vec<Node>) =
            edges.into_iter().map(|e| (e.cursor, e.node)).unzip();
        let nodes = self.related().attach(nodes, &partition.expensive).await?;

        Ok(Connection {
            edges: cursors
                .into_iter()
                .zip(nodes)
                .map(|(cursor, node)| Edge { node, cursor })
                .collect(),
            page_info,
        })
    }

    /// Fetch one entity by public id.
    pub async fn get(
        &self,
        kind: EntityKind,
        id: &str,
        selection: &Selection,
    ) -> DataResult<Option<Node>> {
        let query = SelectQuery::new(kind).select(selection).by_id(id);
        self.fetch_one(kind, query, selection, true).await
    }

    /// Fetch one entity by graph identity.
    pub async fn get_by_iri(
        &self,
        kind: EntityKind,
        iri: &str,
        selection: &Selection,
    ) -> DataResult<Option<Node>> {
        validate_entity_iri(kind, iri)?;
        let query = SelectQuery::new(kind).select(selection).by_iri(iri);
        self.fetch_one(kind, query, selection, true).await
    }

    async fn fetch_one(
        &self,
        kind: EntityKind,
        query: SelectQuery,
        selection: &Selection,
        join_expensive: bool,
    ) -> DataResult<Option<Node>> {
        let built = query.build()?;
        let rows = self.select(&built.text, ResultShape::Single).await?;
        let resolved = selection.resolve(kind.predicate_map());
        let reducer = Reducer::new(kind, &resolved).database(&self.database);

        let Some(node) = reducer.reduce_all(rows).into_iter().next() else {
            return Ok(None);
        };
        let node = if join_expensive && built.partition.has_expensive() {
            self.related()
                .attach(vec![node], &built.partition.expensive)
                .await?
                .pop()
        } else {
            Some(node)
        };
        Ok(node.map(|n| n.project(&resolved)))
    }

    /// Current state of an entity with every broad field, or `NotFound`.
    async fn current(&self, kind: EntityKind, id: &str) -> DataResult<Node> {
        let selection = Selection::all(kind);
        let query = SelectQuery::new(kind).select(&selection).by_id(id);
        self.fetch_one(kind, query, &selection, false)
            .await?
            .ok_or_else(|| DataError::not_found(kind, id))
    }

    /// Create an entity and return it as stored.
    pub async fn create(&self, kind: EntityKind, props: &Map<String, Value>) -> DataResult<Node> {
        let props = self.resolve_references(kind, props).await?;
        let plan = build_insert(kind, &props, Utc::now())?;

        if plan.identity.deterministic
            && self.resolver().exists(&plan.identity.iri, kind).await?
        {
            return Err(DataError::conflict(kind, &plan.identity.id));
        }

        self.store
            .execute(StoreRequest::update(&self.database, &plan.text))
            .await?;
        tracing::info!(
            kind = %kind,
            iri = %plan.identity.iri,
            children = plan.children.len(),
            "Created entity"
        );

        self.get_by_iri(kind, &plan.identity.iri, &Selection::all(kind))
            .await?
            .ok_or_else(|| DataError::not_found(kind, &plan.identity.id))
    }

    /// Apply edit instructions to an entity and return it as stored.
    pub async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        edits: &[EditInstruction],
    ) -> DataResult<Node> {
        validate_id(id)?;
        if edits.is_empty() {
            return Err(DataError::validation(id, "no edit instructions given"));
        }
        let current = self.current(kind, id).await?;
        let refs = self.resolve_edit_references(&current, edits).await?;
        let plan = diff(&current, edits, &refs, Utc::now())?;

        match plan.text() {
            Some(text) => {
                self.store
                    .execute(StoreRequest::update(&self.database, &text))
                    .await?;
                tracing::info!(
                    kind = %kind,
                    iri = %current.iri(),
                    operations = plan.operations.len(),
                    "Updated entity"
                );
            }
            None => {
                tracing::debug!(kind = %kind, iri = %current.iri(), "Update resolved to no-op");
            }
        }

        self.get_by_iri(current.kind(), current.iri(), &Selection::all(current.kind()))
            .await?
            .ok_or_else(|| DataError::not_found(kind, id))
    }

    /// Delete an entity with its embedded children; returns the public id.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> DataResult<String> {
        validate_id(id)?;
        let current = self.current(kind, id).await?;
        let map = current.kind().predicate_map();

        let children: Vec<String> = map
            .descriptors()
            .iter()
            .filter(|d| matches!(d.value, ValueKind::Embedded(_)))
            .filter_map(|d| current.get(d.output_key()))
            .flat_map(|value| -> Vec<&str> {
                match value {
                    Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                    Value::String(single) => vec![single.as_str()],
                    _ => Vec::new(),
                }
            })
            .map(str::to_string)
            .collect();

        let text = build_delete(current.kind(), current.iri(), &children)?;
        self.store
            .execute(StoreRequest::update(&self.database, &text))
            .await?;
        tracing::info!(
            kind = %current.kind(),
            iri = %current.iri(),
            children = children.len(),
            "Deleted entity"
        );
        Ok(id.to_string())
    }

    /// Replace relational ids in create properties with resolved IRIs.
    async fn resolve_references(
        &self,
        kind: EntityKind,
        props: &Map<String, Value>,
    ) -> DataResult<Map<String, Value>> {
        let map = kind.predicate_map();
        let resolver = self.resolver();
        let mut resolved = props.clone();

        for descriptor in map.descriptors() {
            if !matches!(descriptor.value, ValueKind::Reference(_)) {
                continue;
            }
            let Some(value) = props.get(descriptor.field).filter(|v| !is_empty_value(v)) else {
                continue;
            };
            let values = values_of(descriptor, value)?;
            let iris = resolver.resolve_field(descriptor, &values).await?;
            let value = if descriptor.multi {
                Value::Array(iris.into_iter().map(Value::String).collect())
            } else {
                iris.into_iter().next().map_or(Value::Null, Value::String)
            };
            resolved.insert(descriptor.field.to_string(), value);
        }
        Ok(resolved)
    }

    /// Resolve the relational values that an edit will write. Removals drop
    /// the stored links as they are, so their values are never looked up.
    async fn resolve_edit_references(
        &self,
        current: &Node,
        edits: &[EditInstruction],
    ) -> DataResult<ResolvedRefs> {
        let map = current.kind().predicate_map();
        let resolver = self.resolver();
        let mut refs = ResolvedRefs::new();

        for edit in edits {
            let Some(descriptor) = map.get_by_key(&edit.key) else {
                continue;
            };
            if !matches!(descriptor.value, ValueKind::Reference(_)) {
                continue;
            }
            let has_key = current.field_value(descriptor.field).is_some();
            let values: Vec<&Value> = match EditOp::resolve(edit, has_key) {
                Ok(EditOp::Add(_) | EditOp::Replace(_)) => {
                    edit.value.iter().filter(|v| !is_empty_value(v)).collect()
                }
                // Invalid instructions are reported by the diff itself
                _ => continue,
            };
            refs.insert(descriptor.field, resolver.resolve_field(descriptor, &values).await?);
        }
        Ok(refs)
    }
}
