//! INSERT / DELETE / UPDATE statement construction.
//!
//! Every entity lives in a named graph of its own. A mutation is a list of
//! SPARQL Update operations joined with `;` and sent as one request, so the
//! store applies it entirely or not at all. Parent operations always come
//! before the operations on their children.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::entities::EntityKind;
use crate::entities::vocab::{
    CLASS_ASSET_INVENTORY, PRED_CREATED, PRED_ID, PRED_INVENTORY_ASSETS, PRED_MODIFIED,
    PRED_OBJECT_TYPE,
};
use crate::error::{DataError, DataResult};
use crate::orm::children::ChildSpec;
use crate::orm::identity::{
    Identity, generate, generate_random, is_empty_value, iri_term, validate_entity_iri,
    validate_iri,
};
use crate::orm::traits::{PredicateDescriptor, ValueKind, datetime_literal, literal};

/// Separator between operations of one update request.
pub const OPERATION_SEPARATOR: &str = " ;\n";

/// Statements and identities produced for a create.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub identity: Identity,
    /// Identities of the embedded children created alongside
    pub children: Vec<Identity>,
    pub text: String,
}

/// Build the create request for a new entity.
///
/// Reference fields must already hold resolved IRIs. Read-only and unknown
/// properties are ignored; missing required properties are rejected.
pub fn build_insert(
    kind: EntityKind,
    props: &Map<String, Value>,
    at: DateTime<Utc>,
) -> DataResult<InsertPlan> {
    check_required(kind, props)?;
    let identity = generate(kind, props)?;

    let mut operations = vec![insert_data(
        &identity.iri,
        &entity_triples(kind, &identity, props, at)?,
    )];
    if kind.is_inventory_member() {
        operations.push(inventory_attach(&identity.iri));
    }

    let mut children = Vec::new();
    for descriptor in kind.predicate_map().descriptors() {
        let ValueKind::Embedded(collection) = descriptor.value else {
            continue;
        };
        let Some(value) = props.get(descriptor.field).filter(|v| !is_empty_value(v)) else {
            continue;
        };
        let values = values_of(descriptor, value)?;
        for value in values {
            let spec = collection.parse(descriptor.field, value)?;
            let (child, group) = child_group(kind, &identity.iri, descriptor, &spec, at)?;
            children.push(child);
            operations.push(group);
        }
    }

    let text = operations.join(OPERATION_SEPARATOR);
    tracing::debug!(kind = %kind, iri = %identity.iri, query = %text, "Built insert");

    Ok(InsertPlan {
        identity,
        children,
        text,
    })
}

/// Build the delete request for an entity and its embedded children.
pub fn build_delete(kind: EntityKind, iri: &str, children: &[String]) -> DataResult<String> {
    validate_entity_iri(kind, iri)?;
    for child in children {
        validate_iri(child)?;
    }

    let mut operations = Vec::with_capacity(children.len() + 2);
    if kind.is_inventory_member() {
        operations.push(inventory_detach(iri));
    }
    operations.push(delete_entity(iri, Some(kind.primary_class())));
    operations.extend(children.iter().map(|child| delete_entity(child, None)));

    let text = operations.join(OPERATION_SEPARATOR);
    tracing::debug!(kind = %kind, iri = %iri, query = %text, "Built delete");
    Ok(text)
}

/// Create one embedded child and attach it to its parent.
pub fn child_group(
    parent_kind: EntityKind,
    parent_iri: &str,
    descriptor: &PredicateDescriptor,
    spec: &ChildSpec,
    at: DateTime<Utc>,
) -> DataResult<(Identity, String)> {
    check_required(spec.kind, &spec.props)?;
    let identity = generate_random(spec.kind)?;
    let create = insert_data(
        &identity.iri,
        &entity_triples(spec.kind, &identity, &spec.props, at)?,
    );
    let attach = attach(parent_kind, parent_iri, descriptor.predicate, &identity.iri);
    let group = [create, attach].join(OPERATION_SEPARATOR);
    Ok((identity, group))
}

/// Detach one embedded child from its parent and delete it.
pub fn child_removal(parent_iri: &str, descriptor: &PredicateDescriptor, child_iri: &str) -> String {
    [
        detach(parent_iri, descriptor.predicate, child_iri),
        delete_entity(child_iri, None),
    ]
    .join(OPERATION_SEPARATOR)
}

/// One predicate touched by an update.
#[derive(Debug, Clone)]
pub struct PredicateChange {
    pub descriptor: &'static PredicateDescriptor,
    /// Delete every current value first (replace and remove)
    pub remove_existing: bool,
    /// Rendered terms to insert (add and replace)
    pub insert: Vec<String>,
}

/// Build one DELETE/INSERT/WHERE statement for a set of predicate changes.
///
/// Deletions and insertions share the WHERE binding of the entity's graph,
/// and `modified` is re-stamped. Returns `None` when nothing changes.
pub fn update_statement(
    kind: EntityKind,
    iri: &str,
    changes: &[PredicateChange],
    at: DateTime<Utc>,
) -> Option<String> {
    if changes.is_empty() {
        return None;
    }

    let subject = iri_term(iri);
    let mut deletes = Vec::new();
    let mut inserts = Vec::new();
    let mut optionals = Vec::new();

    for (index, change) in changes.iter().enumerate() {
        if change.remove_existing {
            let variable = format!("?o{}", index);
            let pattern = change.descriptor.binding(&subject, Some(&variable));
            deletes.push(format!("{} .", pattern));
            optionals.push(format!("OPTIONAL {{ GRAPH ?g {{ {} }} }} .", pattern));
        }
        for term in &change.insert {
            inserts.push(format!(
                "{} .",
                change.descriptor.binding(&subject, Some(term))
            ));
        }
    }

    deletes.push(format!("{} {} ?modified .", subject, PRED_MODIFIED));
    optionals.push(format!(
        "OPTIONAL {{ GRAPH ?g {{ {} {} ?modified }} }} .",
        subject, PRED_MODIFIED
    ));
    inserts.push(format!("{} {} {} .", subject, PRED_MODIFIED, datetime_literal(&at)));

    Some(format!(
        "DELETE {{\n  GRAPH ?g {{\n    {}\n  }}\n}}\nINSERT {{\n  GRAPH ?g {{\n    {}\n  }}\n}}\nWHERE {{\n  GRAPH ?g {{ {} a <{}> }} .\n  {}\n}}",
        deletes.join("\n    "),
        inserts.join("\n    "),
        subject,
        kind.primary_class(),
        optionals.join("\n  ")
    ))
}

/// Values of a field as a list, rejecting several values for a single-valued field.
pub fn values_of<'v>(descriptor: &PredicateDescriptor, value: &'v Value) -> DataResult<Vec<&'v Value>> {
    let values: Vec<&Value> = match value {
        Value::Array(items) => items.iter().filter(|v| !is_empty_value(v)).collect(),
        single => vec![single],
    };
    if !descriptor.multi && values.len() > 1 {
        return Err(DataError::validation(
            descriptor.field,
            "field takes a single value",
        ));
    }
    Ok(values)
}

fn check_required(kind: EntityKind, props: &Map<String, Value>) -> DataResult<()> {
    for descriptor in kind.predicate_map().descriptors() {
        if descriptor.required && props.get(descriptor.field).is_none_or(is_empty_value) {
            return Err(DataError::validation(
                descriptor.field,
                format!("is required to create {}", kind),
            ));
        }
    }
    Ok(())
}

fn entity_triples(
    kind: EntityKind,
    identity: &Identity,
    props: &Map<String, Value>,
    at: DateTime<Utc>,
) -> DataResult<Vec<String>> {
    let subject = iri_term(&identity.iri);
    let stamp = datetime_literal(&at);

    let mut triples: Vec<String> = kind
        .classes()
        .iter()
        .map(|class| format!("{} a <{}>", subject, class))
        .collect();
    triples.push(format!("{} {} {}", subject, PRED_ID, literal(&identity.id)));
    triples.push(format!(
        "{} {} {}",
        subject,
        PRED_OBJECT_TYPE,
        literal(kind.object_type())
    ));
    triples.push(format!("{} {} {}", subject, PRED_CREATED, stamp));
    triples.push(format!("{} {} {}", subject, PRED_MODIFIED, stamp));

    let map = kind.predicate_map();
    for (key, value) in props {
        let Some(descriptor) = map.get(key) else {
            tracing::debug!(kind = %kind, field = %key, "Ignoring unmapped property");
            continue;
        };
        if descriptor.read_only
            || matches!(descriptor.value, ValueKind::Embedded(_))
            || is_empty_value(value)
        {
            continue;
        }
        for value in values_of(descriptor, value)? {
            let term = descriptor.render_value(value)?;
            triples.push(descriptor.binding(&subject, Some(&term)));
        }
    }
    Ok(triples)
}

fn insert_data(graph: &str, triples: &[String]) -> String {
    format!(
        "INSERT DATA {{\n  GRAPH {} {{\n    {} .\n  }}\n}}",
        iri_term(graph),
        triples.join(" .\n    ")
    )
}

/// Delete every triple of an entity within its own graph.
fn delete_entity(iri: &str, class: Option<&str>) -> String {
    let subject = iri_term(iri);
    let pattern = match class {
        Some(class) => format!("{} a <{}> ; ?p ?o", subject, class),
        None => format!("{} ?p ?o", subject),
    };
    format!(
        "DELETE {{\n  GRAPH {s} {{ {s} ?p ?o }}\n}}\nWHERE {{\n  GRAPH {s} {{ {pattern} }}\n}}",
        s = subject,
        pattern = pattern
    )
}

/// Link a child to its parent, only if the parent exists with its class.
fn attach(parent_kind: EntityKind, parent_iri: &str, predicate: &str, child_iri: &str) -> String {
    let parent = iri_term(parent_iri);
    format!(
        "INSERT {{\n  GRAPH ?g {{ {p} {pred} {c} }}\n}}\nWHERE {{\n  GRAPH ?g {{ {p} a <{class}> }}\n}}",
        p = parent,
        pred = predicate,
        c = iri_term(child_iri),
        class = parent_kind.primary_class()
    )
}

fn detach(parent_iri: &str, predicate: &str, child_iri: &str) -> String {
    let link = format!("{} {} {}", iri_term(parent_iri), predicate, iri_term(child_iri));
    format!(
        "DELETE {{\n  GRAPH ?g {{ {link} }}\n}}\nWHERE {{\n  GRAPH ?g {{ {link} }}\n}}",
        link = link
    )
}

fn inventory_attach(iri: &str) -> String {
    format!(
        "INSERT {{\n  GRAPH ?g {{ ?inventory {assets} {iri} }}\n}}\nWHERE {{\n  GRAPH ?g {{ ?inventory a <{class}> }}\n}}",
        assets = PRED_INVENTORY_ASSETS,
        iri = iri_term(iri),
        class = CLASS_ASSET_INVENTORY
    )
}

fn inventory_detach(iri: &str) -> String {
    format!(
        "DELETE {{\n  GRAPH ?g {{ ?inventory {assets} {iri} }}\n}}\nWHERE {{\n  GRAPH ?g {{ ?inventory a <{class}> ; {assets} {iri} }}\n}}",
        assets = PRED_INVENTORY_ASSETS,
        iri = iri_term(iri),
        class = CLASS_ASSET_INVENTORY
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_insert_writes_classes_identity_and_properties() {
        let plan = build_insert(
            EntityKind::Software,
            &props(json!({"name": "nginx", "vendor_name": "nginx-inc", "version": "1.21",
                "id": "caller-supplied", "unknown": "x"})),
            at(),
        )
        .unwrap();

        let subject = format!("<{}>", plan.identity.iri);
        assert!(plan.identity.deterministic);
        assert!(plan.text.starts_with(&format!("INSERT DATA {{\n  GRAPH {} {{", subject)));
        assert!(plan.text.contains(&format!(
            "{} a <http://scap.nist.gov/ns/asset-identification#Software>",
            subject
        )));
        assert!(plan.text.contains(&format!(
            "{} <http://darklight.ai/ns/common#id> \"{}\"",
            subject, plan.identity.id
        )));
        assert!(plan.text.contains(
            "\"2024-05-01T12:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime>"
        ));
        assert!(!plan.text.contains("caller-supplied"));
        assert!(!plan.text.contains("unknown"));
        assert!(plan.text.contains("?inventory <http://csrc.nist.gov/ns/oscal/common#assets>"));
    }

    #[test]
    fn test_insert_requires_required_fields() {
        assert_matches!(
            build_insert(EntityKind::Software, &props(json!({"version": "1"})), at()),
            Err(DataError::Validation { identifier, .. }) if identifier == "name"
        );
    }

    #[test]
    fn test_insert_creates_children_after_the_parent() {
        let plan = build_insert(
            EntityKind::Hardware,
            &props(json!({"name": "web-01", "mac_address": ["aa:bb:cc:dd:ee:01", "aa:bb:cc:dd:ee:02"],
                "ports": ["443/tcp"]})),
            at(),
        )
        .unwrap();

        assert_eq!(plan.children.len(), 3);
        let parent_at = plan.text.find(&plan.identity.iri).unwrap();
        for child in &plan.children {
            let child_at = plan.text.find(&child.iri).unwrap();
            assert!(parent_at < child_at);
        }
        assert_eq!(plan.text.matches("INSERT DATA").count(), 4);
    }

    #[test]
    fn test_insert_rejects_several_values_for_single_field() {
        assert_matches!(
            build_insert(
                EntityKind::Software,
                &props(json!({"name": ["a", "b"]})),
                at()
            ),
            Err(DataError::Validation { .. })
        );
    }

    #[test]
    fn test_delete_is_confined_to_the_entity_graph() {
        let iri = EntityKind::Hardware.iri_for("1").unwrap();
        let child = EntityKind::Port.iri_for("2").unwrap();
        let text = build_delete(EntityKind::Hardware, &iri, &[child.clone()]).unwrap();

        assert!(text.contains(&format!("GRAPH <{iri}> {{ <{iri}> ?p ?o }}", iri = iri)));
        assert!(text.contains(&format!("GRAPH <{c}> {{ <{c}> ?p ?o }}", c = child)));
        assert!(!text.contains("DELETE WHERE"));

        assert_matches!(
            build_delete(EntityKind::Network, &iri, &[]),
            Err(DataError::Validation { .. })
        );
    }

    #[test]
    fn test_update_statement_shape() {
        let map = EntityKind::Software.predicate_map();
        let iri = EntityKind::Software.iri_for("1").unwrap();
        let changes = vec![PredicateChange {
            descriptor: map.get("version").unwrap(),
            remove_existing: true,
            insert: vec![literal("1.22")],
        }];

        let text = update_statement(EntityKind::Software, &iri, &changes, at()).unwrap();
        let s = format!("<{}>", iri);
        let version = "<http://scap.nist.gov/ns/asset-identification#version>";
        let modified = "<http://darklight.ai/ns/common#modified>";
        assert_eq!(
            text,
            format!(
                "DELETE {{\n  GRAPH ?g {{\n    {s} {v} ?o0 .\n    {s} {m} ?modified .\n  }}\n}}\n\
                 INSERT {{\n  GRAPH ?g {{\n    {s} {v} \"1.22\" .\n    {s} {m} \"2024-05-01T12:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime> .\n  }}\n}}\n\
                 WHERE {{\n  GRAPH ?g {{ {s} a <http://scap.nist.gov/ns/asset-identification#Software> }} .\n  \
                 OPTIONAL {{ GRAPH ?g {{ {s} {v} ?o0 }} }} .\n  \
                 OPTIONAL {{ GRAPH ?g {{ {s} {m} ?modified }} }} .\n}}",
                s = s,
                v = version,
                m = modified
            )
        );

        assert!(update_statement(EntityKind::Software, &iri, &[], at()).is_none());
    }
}
