//! SELECT construction from predicate maps.
//!
//! [SelectQuery] turns a kind, a [Selection] and the fields that filters or
//! ordering need into a broad SELECT with one `OPTIONAL` per bound field.
//! Expensive fields are split off into a [FieldPartition] and never appear
//! in the broad query; the repository joins them in a second pass.

use crate::entities::EntityKind;
use crate::entities::vocab::{CLASS_ASSET_INVENTORY, PRED_INVENTORY_ASSETS};
use crate::error::{DataError, DataResult};
use crate::orm::identity::{iri_term, validate_entity_iri, validate_id, validate_iri};
use crate::orm::traits::{PredicateDescriptor, PredicateMap, literal};

/// Fields every query binds regardless of the caller's projection.
pub const IDENTITY_FIELDS: [&str; 2] = ["id", "object_type"];

/// Ordered, duplicate-free list of requested field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    fields: Vec<String>,
}

impl Selection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::default();
        for field in fields {
            selection.push(field.as_ref());
        }
        selection
    }

    /// Every field a kind exposes.
    pub fn all(kind: EntityKind) -> Self {
        Self::new(kind.predicate_map().field_names())
    }

    pub fn push(&mut self, field: &str) {
        if !self.contains(field) {
            self.fields.push(field.to_string());
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy normalised against a map: hint keys become field names and
    /// unknown names are dropped.
    pub fn resolve(&self, map: &PredicateMap) -> Self {
        Self::new(
            self.fields
                .iter()
                .filter_map(|name| map.get_by_key(name).map(|d| d.field)),
        )
    }
}

/// Broad/expensive split of the effective field list.
#[derive(Debug, Clone, Default)]
pub struct FieldPartition {
    /// Bound as OPTIONAL patterns in the broad SELECT
    pub broad: Vec<&'static PredicateDescriptor>,
    /// Joined afterwards in batched second-pass queries
    pub expensive: Vec<&'static PredicateDescriptor>,
}

impl FieldPartition {
    fn push(&mut self, descriptor: &'static PredicateDescriptor) {
        let target = if descriptor.is_broad() {
            &mut self.broad
        } else {
            &mut self.expensive
        };
        if !target.iter().any(|d| d.field == descriptor.field) {
            target.push(descriptor);
        }
    }

    pub fn has_expensive(&self) -> bool {
        !self.expensive.is_empty()
    }

    /// Whether an expensive field is among `fields`.
    pub fn expensive_among<'a>(&self, mut fields: impl Iterator<Item = &'a str>) -> bool {
        fields.any(|name| {
            self.expensive
                .iter()
                .any(|d| d.field == name || d.hint == Some(name))
        })
    }
}

/// Restricts a listing to the entities one parent points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentScope {
    pub parent: String,
    pub predicate: &'static str,
}

impl ParentScope {
    /// Scope through `field` of a parent entity of `parent_kind`.
    pub fn new(parent_kind: EntityKind, parent_iri: &str, field: &str) -> DataResult<Self> {
        validate_entity_iri(parent_kind, parent_iri)?;
        let descriptor = parent_kind
            .predicate_map()
            .get_by_key(field)
            .filter(|d| d.is_broad())
            .ok_or_else(|| {
                DataError::validation(field, format!("{} has no such relationship", parent_kind))
            })?;
        Ok(Self {
            parent: parent_iri.to_string(),
            predicate: descriptor.predicate,
        })
    }
}

/// Output of [SelectQuery::build].
#[derive(Debug, Clone)]
pub struct BuiltSelect {
    pub text: String,
    pub partition: FieldPartition,
}

#[derive(Debug, Clone)]
enum Target {
    /// Every member of the default collection
    Inventory,
    Parent(ParentScope),
    Iris(Vec<String>),
    Id(String),
    /// No restriction beyond the class
    Unscoped,
}

/// A query builder for one entity kind.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    kind: EntityKind,
    selection: Selection,
    extra: Vec<String>,
    target: Target,
}

impl SelectQuery {
    /// Create a new query builder for the entity kind.
    pub fn new(kind: EntityKind) -> Self {
        let target = if kind.is_inventory_member() {
            Target::Inventory
        } else {
            Target::Unscoped
        };
        Self {
            kind,
            selection: Selection::default(),
            extra: Vec::new(),
            target,
        }
    }

    pub fn select(mut self, selection: &Selection) -> Self {
        self.selection = selection.clone();
        self
    }

    /// Bind fields the caller did not ask for, e.g. filter and order keys.
    pub fn bind_also<'a>(mut self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        self.extra.extend(fields.into_iter().map(str::to_string));
        self
    }

    /// Replace the default inventory scope with a parent relationship.
    pub fn parent_scope(mut self, scope: ParentScope) -> Self {
        self.target = Target::Parent(scope);
        self
    }

    /// Look up specific entities by graph identity.
    pub fn by_iris(mut self, iris: Vec<String>) -> Self {
        self.target = Target::Iris(iris);
        self
    }

    pub fn by_iri(self, iri: &str) -> Self {
        self.by_iris(vec![iri.to_string()])
    }

    /// Look up one entity by public id.
    pub fn by_id(mut self, id: &str) -> Self {
        self.target = Target::Id(id.to_string());
        self
    }

    /// Effective field list: identity, selection, extra bindings and the
    /// inputs of derived fields. Unknown names are ignored.
    pub fn partition(&self) -> FieldPartition {
        let map = self.kind.predicate_map();
        let mut partition = FieldPartition::default();

        let mut names: Vec<&str> = IDENTITY_FIELDS.to_vec();
        if self.kind.is_abstract() {
            names.push("asset_type");
        }
        names.extend(self.selection.fields().iter().map(String::as_str));
        names.extend(self.extra.iter().map(String::as_str));

        for name in names {
            let Some(descriptor) = map.get_by_key(name) else {
                tracing::debug!(kind = %self.kind, field = name, "Ignoring unmapped field");
                continue;
            };
            partition.push(descriptor);
            for dependency in descriptor.depends_on {
                if let Some(input) = map.get(dependency) {
                    partition.push(input);
                }
            }
        }
        partition
    }

    /// Build the SELECT text.
    pub fn build(&self) -> DataResult<BuiltSelect> {
        let partition = self.partition();

        let mut variables = String::from("?iri");
        for descriptor in &partition.broad {
            variables.push_str(" ?");
            variables.push_str(descriptor.field);
        }

        let mut body: Vec<String> = Vec::new();
        match &self.target {
            Target::Iris(iris) => {
                if iris.is_empty() {
                    return Err(DataError::validation(self.kind.object_type(), "no IRIs to look up"));
                }
                let mut terms = Vec::with_capacity(iris.len());
                for iri in iris {
                    validate_iri(iri)?;
                    terms.push(iri_term(iri));
                }
                body.push(format!("VALUES ?iri {{ {} }}", terms.join(" ")));
            }
            Target::Id(id) => {
                validate_id(id)?;
                body.push(format!(
                    "?iri {} {} .",
                    self.kind.predicate_map().get("id").map_or("", |d| d.predicate),
                    literal(id.trim())
                ));
            }
            _ => {}
        }

        body.push(format!("?iri a <{}> .", self.kind.primary_class()));

        match &self.target {
            Target::Inventory => {
                body.push(format!(
                    "?inventory a <{}> ; {} ?iri .",
                    CLASS_ASSET_INVENTORY, PRED_INVENTORY_ASSETS
                ));
            }
            Target::Parent(scope) => {
                body.push(format!("{} {} ?iri .", iri_term(&scope.parent), scope.predicate));
            }
            _ => {}
        }

        for descriptor in &partition.broad {
            body.push(descriptor.optional("?iri", None));
        }

        let text = format!(
            "SELECT DISTINCT {}\nWHERE {{\n  {}\n}}",
            variables,
            body.join("\n  ")
        );
        tracing::debug!(kind = %self.kind, query = %text, "Built select");

        Ok(BuiltSelect { text, partition })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_selection_deduplicates_in_order() {
        let selection = Selection::new(["name", "version", "name", "labels_iri"]);
        assert_eq!(selection.fields(), ["name", "version", "labels_iri"]);

        let resolved = selection.resolve(EntityKind::Software.predicate_map());
        assert_eq!(resolved.fields(), ["name", "version", "labels"]);
    }

    #[test]
    fn test_select_binds_identity_and_requested_fields() {
        let built = SelectQuery::new(EntityKind::Network)
            .select(&Selection::new(["name", "no_such_field"]))
            .build()
            .unwrap();

        assert_eq!(
            built.text,
            "SELECT DISTINCT ?iri ?id ?object_type ?name\n\
             WHERE {\n  \
             ?iri a <http://scap.nist.gov/ns/asset-identification#Network> .\n  \
             ?inventory a <http://csrc.nist.gov/ns/oscal/common#AssetInventory> ; <http://csrc.nist.gov/ns/oscal/common#assets> ?iri .\n  \
             OPTIONAL { ?iri <http://darklight.ai/ns/common#id> ?id } .\n  \
             OPTIONAL { ?iri <http://darklight.ai/ns/common#object_type> ?object_type } .\n  \
             OPTIONAL { ?iri <http://scap.nist.gov/ns/asset-identification#name> ?name } .\n\
             }"
        );
    }

    #[test]
    fn test_expensive_fields_stay_out_of_the_broad_query() {
        let built = SelectQuery::new(EntityKind::Hardware)
            .select(&Selection::new(["name", "top_risk_severity"]))
            .bind_also(["risk_count"])
            .build()
            .unwrap();

        assert!(!built.text.contains("top_risk_severity"));
        assert!(!built.text.contains("related_observations"));
        let expensive: Vec<_> = built.partition.expensive.iter().map(|d| d.field).collect();
        assert_eq!(expensive, vec!["top_risk_severity", "risk_count"]);
    }

    #[test]
    fn test_derived_fields_pull_in_their_inputs() {
        let built = SelectQuery::new(EntityKind::Software)
            .select(&Selection::new(["display_name"]))
            .build()
            .unwrap();
        for variable in ["?display_name", "?name", "?vendor_name", "?version"] {
            assert!(built.text.contains(variable), "missing {}", variable);
        }
    }

    #[test]
    fn test_parent_scope_replaces_inventory_scope() {
        let parent = EntityKind::Hardware.iri_for("1").unwrap();
        let scope = ParentScope::new(EntityKind::Hardware, &parent, "installed_software").unwrap();
        let built = SelectQuery::new(EntityKind::Software)
            .parent_scope(scope)
            .build()
            .unwrap();

        assert!(!built.text.contains("AssetInventory"));
        assert!(built.text.contains(&format!(
            "<{}> <http://scap.nist.gov/ns/asset-identification#installed_software> ?iri .",
            parent
        )));
    }

    #[test]
    fn test_lookups_validate_identity_before_building() {
        assert_matches!(
            SelectQuery::new(EntityKind::Software).by_id("nope").build(),
            Err(DataError::Validation { .. })
        );
        assert_matches!(
            SelectQuery::new(EntityKind::Software).by_iri("http://x/> } DROP ALL {").build(),
            Err(DataError::Validation { .. })
        );

        let built = SelectQuery::new(EntityKind::Port)
            .by_iris(vec!["http://example.com/Port-1".to_string()])
            .build()
            .unwrap();
        assert!(built.text.contains("VALUES ?iri { <http://example.com/Port-1> }"));
        assert!(!built.text.contains("?inventory"));
    }
}
