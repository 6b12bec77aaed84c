//! Edit-diff engine.
//!
//! An update arrives as a list of [EditInstruction]s. Each instruction is
//! turned into an [EditOp] exactly once, before any statement text exists:
//! an explicit operation is validated, a missing one is inferred from the
//! current entity. Scalar and relational fields then become one
//! [PredicateChange] each, folded into a single DELETE/INSERT/WHERE
//! statement. Embedded collections are handled on the side: every prior
//! child is detached and deleted and the supplied values are created as new
//! children; the instruction itself resolves to [EditOp::Skip].

use std::collections::HashSet;

use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::EntityKind;
use crate::error::{DataError, DataResult};
use crate::orm::identity::{Identity, is_empty_value, validate_iri};
use crate::orm::mutation::{
    OPERATION_SEPARATOR, PredicateChange, child_group, child_removal, update_statement,
};
use crate::orm::reducer::Node;
use crate::orm::resolver::ResolvedRefs;
use crate::orm::traits::{PredicateDescriptor, ValueKind};

/// Operation requested for one field.
#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOperation {
    Add,
    Replace,
    Remove,
    Skip,
}

/// One field-level edit as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditInstruction {
    pub key: String,
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(default)]
    pub operation: Option<EditOperation>,
}

impl EditInstruction {
    pub fn new(key: &str, value: Vec<Value>) -> Self {
        Self {
            key: key.to_string(),
            value,
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: EditOperation) -> Self {
        self.operation = Some(operation);
        self
    }
}

/// A resolved edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    Add(Vec<Value>),
    Replace(Vec<Value>),
    Remove,
    Skip,
}

/// Operation implied by the current entity and the supplied value.
pub fn infer(current_has_key: bool, value_is_empty: bool) -> EditOperation {
    if value_is_empty {
        EditOperation::Remove
    } else if current_has_key {
        EditOperation::Replace
    } else {
        EditOperation::Add
    }
}

impl EditOp {
    /// Resolve an instruction against the current entity.
    pub fn resolve(instruction: &EditInstruction, current_has_key: bool) -> DataResult<Self> {
        let values: Vec<Value> = instruction
            .value
            .iter()
            .filter(|v| !is_empty_value(v))
            .cloned()
            .collect();
        let operation = instruction
            .operation
            .unwrap_or_else(|| infer(current_has_key, values.is_empty()));

        Ok(match operation {
            EditOperation::Add if values.is_empty() => {
                return Err(DataError::validation(
                    &instruction.key,
                    "add requires at least one value",
                ));
            }
            EditOperation::Add => EditOp::Add(values),
            EditOperation::Replace if values.is_empty() => EditOp::Remove,
            EditOperation::Replace => EditOp::Replace(values),
            EditOperation::Remove => EditOp::Remove,
            EditOperation::Skip => EditOp::Skip,
        })
    }

    fn values(&self) -> &[Value] {
        match self {
            EditOp::Add(values) | EditOp::Replace(values) => values,
            EditOp::Remove | EditOp::Skip => &[],
        }
    }
}

/// Wholesale replacement of one embedded collection.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedReplacement {
    pub field: &'static str,
    /// One detach+delete group per prior child
    pub removals: Vec<String>,
    /// One create+attach group per new child
    pub creations: Vec<String>,
    pub created: Vec<Identity>,
}

/// Everything an update will send, in order.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub replacements: Vec<EmbeddedReplacement>,
    /// Generic predicate statement; `None` when every instruction was skipped
    pub update: Option<String>,
    /// Resolved operation per applied instruction
    pub operations: Vec<(&'static str, EditOp)>,
}

impl UpdatePlan {
    /// The whole plan as one update request, or `None` for a no-op.
    pub fn text(&self) -> Option<String> {
        let operations: Vec<&str> = self
            .replacements
            .iter()
            .flat_map(|r| r.removals.iter().chain(r.creations.iter()))
            .map(String::as_str)
            .chain(self.update.as_deref())
            .collect();
        if operations.is_empty() {
            None
        } else {
            Some(operations.join(OPERATION_SEPARATOR))
        }
    }
}

/// Compute the mutation for `edits` against the current state of an entity.
///
/// Relational values must already be resolved in `refs`. Unknown keys are
/// ignored; read-only keys, duplicated keys and an empty list are rejected.
pub fn diff(
    current: &Node,
    edits: &[EditInstruction],
    refs: &ResolvedRefs,
    at: DateTime<Utc>,
) -> DataResult<UpdatePlan> {
    let kind = current.kind();
    let map = kind.predicate_map();

    if edits.is_empty() {
        return Err(DataError::validation(current.iri(), "no edit instructions given"));
    }
    let mut seen = HashSet::new();
    for edit in edits {
        if !seen.insert(edit.key.as_str()) {
            return Err(DataError::validation(&edit.key, "key appears more than once"));
        }
    }

    let mut plan = UpdatePlan::default();
    let mut changes = Vec::new();

    for edit in edits {
        let Some(descriptor) = map.get_by_key(&edit.key) else {
            tracing::debug!(kind = %kind, key = %edit.key, "Ignoring edit for unmapped field");
            continue;
        };
        if descriptor.read_only {
            return Err(DataError::validation(&edit.key, "field is read-only"));
        }

        let op = EditOp::resolve(edit, current.field_value(descriptor.field).is_some())?;
        let op = match (descriptor.value, op) {
            (_, EditOp::Skip) => EditOp::Skip,
            (ValueKind::Embedded(_), op) => {
                plan.replacements
                    .push(replace_embedded(kind, current, descriptor, &op, at)?);
                EditOp::Skip
            }
            (_, op) => {
                changes.push(predicate_change(descriptor, &op, refs)?);
                op
            }
        };
        plan.operations.push((descriptor.field, op));
    }

    plan.update = update_statement(kind, current.iri(), &changes, at);
    tracing::debug!(
        kind = %kind,
        iri = %current.iri(),
        changes = changes.len(),
        replacements = plan.replacements.len(),
        "Computed edit diff"
    );
    Ok(plan)
}

fn predicate_change(
    descriptor: &'static PredicateDescriptor,
    op: &EditOp,
    refs: &ResolvedRefs,
) -> DataResult<PredicateChange> {
    let insert = match descriptor.value {
        ValueKind::Reference(_) if !op.values().is_empty() => {
            let iris = refs.get(descriptor.field).ok_or_else(|| {
                DataError::validation(descriptor.field, "reference was not resolved")
            })?;
            render_all(descriptor, &iris.iter().cloned().map(Value::String).collect::<Vec<_>>())?
        }
        _ => render_all(descriptor, op.values())?,
    };

    Ok(PredicateChange {
        descriptor,
        remove_existing: matches!(op, EditOp::Replace(_) | EditOp::Remove),
        insert,
    })
}

fn render_all(descriptor: &PredicateDescriptor, values: &[Value]) -> DataResult<Vec<String>> {
    if !descriptor.multi && values.len() > 1 {
        return Err(DataError::validation(
            descriptor.field,
            "field takes a single value",
        ));
    }
    values.iter().map(|v| descriptor.render_value(v)).collect()
}

fn replace_embedded(
    kind: EntityKind,
    current: &Node,
    descriptor: &'static PredicateDescriptor,
    op: &EditOp,
    at: DateTime<Utc>,
) -> DataResult<EmbeddedReplacement> {
    let ValueKind::Embedded(collection) = descriptor.value else {
        return Err(DataError::validation(descriptor.field, "not an embedded collection"));
    };

    let prior: Vec<&str> = match current.get(descriptor.output_key()) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(single)) => vec![single.as_str()],
        _ => Vec::new(),
    };

    let mut replacement = EmbeddedReplacement {
        field: descriptor.field,
        ..Default::default()
    };
    for child in prior {
        validate_iri(child)?;
        replacement
            .removals
            .push(child_removal(current.iri(), descriptor, child));
    }

    let values = op.values();
    if !descriptor.multi && values.len() > 1 {
        return Err(DataError::validation(
            descriptor.field,
            "field takes a single value",
        ));
    }
    for value in values {
        let spec = collection.parse(descriptor.field, value)?;
        let (identity, group) = child_group(kind, current.iri(), descriptor, &spec, at)?;
        replacement.creations.push(group);
        replacement.created.push(identity);
    }
    Ok(replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::row;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn hardware() -> Node {
        Node::new(
            EntityKind::Hardware,
            EntityKind::Hardware.iri_for("h1").unwrap(),
            row(json!({
                "id": "h1",
                "object_type": "hardware",
                "name": "web-01",
                "hostname": "web-01.local",
                "mac_addr_iri": [
                    EntityKind::MacAddress.iri_for("m1").unwrap(),
                    EntityKind::MacAddress.iri_for("m2").unwrap(),
                    EntityKind::MacAddress.iri_for("m3").unwrap(),
                ],
            })),
        )
    }

    #[test]
    fn test_inference_table() {
        assert_eq!(infer(true, true), EditOperation::Remove);
        assert_eq!(infer(false, true), EditOperation::Remove);
        assert_eq!(infer(false, false), EditOperation::Add);
        assert_eq!(infer(true, false), EditOperation::Replace);
    }

    #[test]
    fn test_explicit_operations() {
        let add_empty = EditInstruction::new("name", vec![]).with_operation(EditOperation::Add);
        assert_matches!(EditOp::resolve(&add_empty, false), Err(DataError::Validation { .. }));

        let replace_empty =
            EditInstruction::new("name", vec![json!("")]).with_operation(EditOperation::Replace);
        assert_eq!(EditOp::resolve(&replace_empty, true).unwrap(), EditOp::Remove);

        let skip = EditInstruction::new("name", vec![json!("x")]).with_operation(EditOperation::Skip);
        assert_eq!(EditOp::resolve(&skip, true).unwrap(), EditOp::Skip);
    }

    #[test]
    fn test_scalar_edits_share_one_statement() {
        let edits = vec![
            EditInstruction::new("hostname", vec![json!("web-02.local")]),
            EditInstruction::new("fqdn", vec![json!("web-02.example.com")]),
            EditInstruction::new("description", vec![]),
            EditInstruction::new("not_a_field", vec![json!("x")]),
        ];
        let plan = diff(&hardware(), &edits, &ResolvedRefs::new(), at()).unwrap();

        assert_eq!(
            plan.operations,
            vec![
                ("hostname", EditOp::Replace(vec![json!("web-02.local")])),
                ("fqdn", EditOp::Add(vec![json!("web-02.example.com")])),
                ("description", EditOp::Remove),
            ]
        );
        let text = plan.text().unwrap();
        assert_eq!(text.matches("DELETE {").count(), 1);
        assert!(text.contains("\"web-02.local\""));
        assert!(plan.replacements.is_empty());
    }

    #[test]
    fn test_all_skipped_is_a_no_op() {
        let edits = vec![
            EditInstruction::new("hostname", vec![json!("x")]).with_operation(EditOperation::Skip),
            EditInstruction::new("unknown", vec![json!("y")]),
        ];
        let plan = diff(&hardware(), &edits, &ResolvedRefs::new(), at()).unwrap();
        assert!(plan.update.is_none());
        assert!(plan.text().is_none());
    }

    #[test]
    fn test_invalid_edit_lists() {
        let current = hardware();
        assert_matches!(
            diff(&current, &[], &ResolvedRefs::new(), at()),
            Err(DataError::Validation { .. })
        );

        let duplicated = vec![
            EditInstruction::new("name", vec![json!("a")]),
            EditInstruction::new("name", vec![json!("b")]),
        ];
        assert_matches!(
            diff(&current, &duplicated, &ResolvedRefs::new(), at()),
            Err(DataError::Validation { .. })
        );

        let read_only = vec![EditInstruction::new("created", vec![json!("2020-01-01")])];
        assert_matches!(
            diff(&current, &read_only, &ResolvedRefs::new(), at()),
            Err(DataError::Validation { .. })
        );
    }

    #[test]
    fn test_embedded_collection_is_replaced_wholesale() {
        let edits = vec![EditInstruction::new(
            "mac_address",
            vec![json!("aa:bb:cc:dd:ee:01"), json!("aa:bb:cc:dd:ee:02")],
        )];
        let plan = diff(&hardware(), &edits, &ResolvedRefs::new(), at()).unwrap();

        let replacement = &plan.replacements[0];
        assert_eq!(replacement.removals.len(), 3);
        assert_eq!(replacement.creations.len(), 2);
        assert_eq!(plan.operations, vec![("mac_address", EditOp::Skip)]);
        assert!(plan.update.is_none());

        let text = plan.text().unwrap();
        let last_removal = text.rfind("MACAddress-m3").unwrap();
        let first_creation = text.find(&replacement.created[0].iri).unwrap();
        assert!(last_removal < first_creation);
    }

    #[test]
    fn test_embedded_removal_creates_nothing() {
        let edits = vec![EditInstruction::new("mac_address", vec![]).with_operation(EditOperation::Remove)];
        let plan = diff(&hardware(), &edits, &ResolvedRefs::new(), at()).unwrap();
        assert_eq!(plan.replacements[0].removals.len(), 3);
        assert!(plan.replacements[0].creations.is_empty());
    }

    #[test]
    fn test_references_use_resolved_iris() {
        let os = EntityKind::OperatingSystem.iri_for("os-1").unwrap();
        let mut refs = ResolvedRefs::new();
        refs.insert("installed_operating_system", vec![os.clone()]);

        let edits = vec![EditInstruction::new(
            "installed_operating_system",
            vec![json!("0b8a7e64-0c4e-4a43-9d7b-5c7f1e2a3b4c")],
        )];
        let plan = diff(&hardware(), &edits, &refs, at()).unwrap();
        assert!(plan.update.unwrap().contains(&format!("<{}>", os)));

        assert_matches!(
            diff(&hardware(), &edits, &ResolvedRefs::new(), at()),
            Err(DataError::Validation { .. })
        );
    }
}
