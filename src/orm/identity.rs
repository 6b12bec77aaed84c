//! Entity identity: public ids, graph IRIs and their validation.
//!
//! A new entity receives a UUID-shaped public id and an IRI made of its
//! kind's namespace segment plus that id. Kinds that declare identity
//! material get a name-based (v5) id over a canonical rendering of those
//! fields, so re-creating the same entity lands on the same identity.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entities::EntityKind;
use crate::error::{DataError, DataResult};

/// Namespace for name-based entity ids.
pub const IDENTITY_NAMESPACE: Uuid = Uuid::from_u128(0x9e5f_3c1a_72b4_4d0e_a1c6_5b8d_2f40_e917);

/// Absolute http(s) IRI without characters that would break out of `<...>`.
static IRI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^https?://[^\s<>"{}|\\^`]+$"#).expect("valid IRI pattern"));

/// Identity assigned to a new entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub iri: String,
    pub id: String,
    /// Derived from identity material rather than random
    pub deterministic: bool,
}

/// Canonical rendering of a kind's identity material, if any field is present.
pub fn identity_material(kind: EntityKind, props: &Map<String, Value>) -> Option<String> {
    let material: BTreeMap<&str, &Value> = kind
        .identity_material()
        .iter()
        .filter_map(|field| {
            props
                .get(*field)
                .filter(|v| !is_empty_value(v))
                .map(|v| (*field, v))
        })
        .collect();

    if material.is_empty() {
        return None;
    }
    serde_json::to_string(&material).ok()
}

/// Generate the identity for a new entity of `kind`.
pub fn generate(kind: EntityKind, props: &Map<String, Value>) -> DataResult<Identity> {
    let (uuid, deterministic) = match identity_material(kind, props) {
        Some(material) => (Uuid::new_v5(&IDENTITY_NAMESPACE, material.as_bytes()), true),
        None => (Uuid::new_v4(), false),
    };
    let id = uuid.to_string();
    let iri = kind
        .iri_for(&id)
        .ok_or_else(|| DataError::validation(kind.object_type(), "abstract kinds cannot be created"))?;

    Ok(Identity {
        iri,
        id,
        deterministic,
    })
}

/// Random identity, used for privately owned children.
pub fn generate_random(kind: EntityKind) -> DataResult<Identity> {
    let id = Uuid::new_v4().to_string();
    let iri = kind
        .iri_for(&id)
        .ok_or_else(|| DataError::validation(kind.object_type(), "abstract kinds cannot be created"))?;
    Ok(Identity {
        iri,
        id,
        deterministic: false,
    })
}

/// Check the shape of a public id.
pub fn validate_id(id: &str) -> DataResult<Uuid> {
    Uuid::parse_str(id.trim())
        .map_err(|_| DataError::validation(id, "identifier is not a UUID"))
}

/// Check that a string is an absolute, safely embeddable IRI.
pub fn validate_iri(iri: &str) -> DataResult<()> {
    if IRI_PATTERN.is_match(iri) {
        Ok(())
    } else {
        Err(DataError::validation(iri, "malformed IRI"))
    }
}

/// Check that an IRI names an entity of `kind`.
pub fn validate_entity_iri(kind: EntityKind, iri: &str) -> DataResult<()> {
    validate_iri(iri)?;
    if kind.is_abstract() || kind.concrete_kinds().iter().any(|k| k.owns_iri(iri)) {
        Ok(())
    } else {
        Err(DataError::validation(
            iri,
            format!("IRI does not belong to the {} namespace", kind),
        ))
    }
}

/// Render an IRI as a term.
pub fn iri_term(iri: &str) -> String {
    format!("<{}>", iri)
}

/// Empty strings, empty arrays and null count as absent.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty_value),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_deterministic_identity_for_same_material() {
        let a = props(json!({"name": "nginx", "vendor_name": "nginx-inc", "version": "1.21"}));
        let b = props(json!({"version": "1.21", "vendor_name": "nginx-inc", "name": "nginx",
            "description": "not identity material"}));

        let first = generate(EntityKind::Software, &a).unwrap();
        let second = generate(EntityKind::Software, &b).unwrap();
        assert!(first.deterministic);
        assert_eq!(first, second);
        assert!(first.iri.ends_with(&format!("Software-{}", first.id)));
    }

    #[test]
    fn test_random_identity_without_material() {
        let empty = props(json!({"mac_address_value": "00:11:22:33:44:55"}));
        let first = generate(EntityKind::MacAddress, &empty).unwrap();
        let second = generate(EntityKind::MacAddress, &empty).unwrap();
        assert!(!first.deterministic);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_abstract_kind_cannot_be_created() {
        assert_matches!(
            generate(EntityKind::Asset, &Map::new()),
            Err(DataError::Validation { .. })
        );
    }

    #[test]
    fn test_validation_of_ids_and_iris() {
        assert!(validate_id("6f1c8a0e-2d7b-4e1f-9c3a-1b2c3d4e5f60").is_ok());
        assert_matches!(validate_id("not-a-uuid"), Err(DataError::Validation { .. }));

        assert!(validate_iri("http://scap.nist.gov/ns/asset-identification#Software-1").is_ok());
        assert!(validate_iri("http://x/a> . <http://evil").is_err());
        assert!(validate_iri("urn:nope").is_err());

        let software = EntityKind::Software.iri_for("abc").unwrap();
        assert!(validate_entity_iri(EntityKind::Software, &software).is_ok());
        assert!(validate_entity_iri(EntityKind::Asset, &software).is_ok());
        assert!(validate_entity_iri(EntityKind::Network, &software).is_err());
    }

    #[test]
    fn test_empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("  ")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!(["", null])));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!(0)));
    }
}
