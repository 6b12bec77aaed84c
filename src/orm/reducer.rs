//! Turns flat result rows into sparse, typed nodes.
//!
//! Each row is mapped through the predicate map of the concrete kind it
//! belongs to. Empty bindings never reach the output, multi-valued fields
//! always surface as arrays, and IRI-valued fields are emitted under their
//! hint key so a field-level lookup can materialise them later.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::entities::EntityKind;
use crate::entities::legacy::infer_kind_from_iri;
use crate::error::ConstraintViolation;
use crate::orm::builder::Selection;
use crate::orm::identity::is_empty_value;
use crate::orm::traits::{Derivation, PredicateDescriptor, ValueKind};
use crate::services::Row;

/// One reduced entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(skip)]
    kind: EntityKind,
    iri: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Node {
    pub fn new(kind: EntityKind, iri: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            kind,
            iri: iri.into(),
            fields,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Internal graph identity; also the pagination cursor.
    pub fn iri(&self) -> &str {
        &self.iri
    }

    /// Public identifier, absent on structurally broken rows.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Value of a field, looked up under its output key.
    pub fn field_value(&self, field: &str) -> Option<&Value> {
        let key = self
            .kind
            .predicate_map()
            .get(field)
            .map_or(field, |d| d.output_key());
        self.fields.get(key)
    }

    /// Copy of the node with one more field. Empty values are not stored.
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        if !is_empty_value(&value) {
            self.fields.insert(key.to_string(), value);
        }
        self
    }

    /// Restrict the node to the caller's projection plus its identity fields.
    ///
    /// Fields bound only to evaluate a filter or an ordering are dropped here.
    pub fn project(self, selection: &Selection) -> Self {
        let map = self.kind.predicate_map();
        let fields = self
            .fields
            .into_iter()
            .filter(|(key, _)| {
                key == "id"
                    || key == "object_type"
                    || map
                        .get_by_key(key)
                        .is_some_and(|d| selection.contains(d.field))
            })
            .collect();
        Self {
            kind: self.kind,
            iri: self.iri,
            fields,
        }
    }
}

/// `vendor name version`; the vendor is left out when the name already starts with it.
pub fn display_name(name: &str, vendor: Option<&str>, version: Option<&str>) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if let Some(vendor) = vendor.map(str::trim).filter(|v| !v.is_empty()) {
        if !name
            .trim()
            .to_lowercase()
            .starts_with(&vendor.to_lowercase())
        {
            parts.push(vendor);
        }
    }
    parts.push(name.trim());
    if let Some(version) = version.map(str::trim).filter(|v| !v.is_empty()) {
        parts.push(version);
    }
    parts.join(" ")
}

/// Reduces rows of one queried kind.
pub struct Reducer<'a> {
    kind: EntityKind,
    selection: &'a Selection,
    database: Option<&'a str>,
}

impl<'a> Reducer<'a> {
    pub fn new(kind: EntityKind, selection: &'a Selection) -> Self {
        Self {
            kind,
            selection,
            database: None,
        }
    }

    /// Database name included in constraint violation logs.
    pub fn database(mut self, database: &'a str) -> Self {
        self.database = Some(database);
        self
    }

    /// Reduce every row, dropping the ones that cannot be typed.
    pub fn reduce_all(&self, rows: Vec<Row>) -> Vec<Node> {
        rows.into_iter().filter_map(|row| self.reduce(row)).collect()
    }

    /// Reduce one row. Returns `None` (after logging) when the row has no IRI
    /// or its concrete kind cannot be determined.
    pub fn reduce(&self, row: Row) -> Option<Node> {
        let Some(iri) = row.get("iri").and_then(Value::as_str).map(str::to_string) else {
            ConstraintViolation::new(None, "iri", "has no graph identity").log(self.database);
            return None;
        };

        let kind = match self.discriminate(&iri, &row) {
            Ok(kind) => kind,
            Err(reason) => {
                ConstraintViolation::new(Some(&iri), "object_type", reason).log(self.database);
                return None;
            }
        };

        let map = kind.predicate_map();
        let mut fields = Map::new();
        for (key, value) in row {
            if key == "iri" || is_empty_value(&value) {
                continue;
            }
            // Rows carry SELECT variables; replayed nodes may carry hint keys
            let Some(descriptor) = map.get_by_key(&key) else {
                continue;
            };
            if let Some(value) = normalize(descriptor, value) {
                fields.insert(descriptor.output_key().to_string(), value);
            }
        }

        if !fields.contains_key("object_type") {
            fields.insert(
                "object_type".to_string(),
                Value::String(kind.object_type().to_string()),
            );
        }

        for descriptor in map.descriptors() {
            if descriptor.derivation.is_some()
                && self.selection.contains(descriptor.field)
                && !fields.contains_key(descriptor.field)
            {
                if let Some(value) = derive(descriptor, &fields) {
                    fields.insert(descriptor.field.to_string(), value);
                }
            }
        }

        Some(Node::new(kind, iri, fields))
    }

    /// Primary discriminator first, legacy inference last.
    ///
    /// A row whose `object_type` names a kind outside the queried one (a
    /// sibling sharing the same class) is rejected, never retyped.
    fn discriminate(&self, iri: &str, row: &Row) -> Result<EntityKind, &'static str> {
        let allowed = self.kind.concrete_kinds();

        if let Some(kind) = first_str(row.get("object_type"))
            .and_then(EntityKind::from_object_type)
            .filter(|kind| !kind.is_abstract())
        {
            return if allowed.contains(&kind) {
                Ok(kind)
            } else {
                Err("names a kind outside the queried one")
            };
        }
        if !self.kind.is_abstract() {
            return Ok(self.kind);
        }
        if let Some(kind) = first_str(row.get("asset_type")).and_then(EntityKind::from_asset_type) {
            if allowed.contains(&kind) {
                return Ok(kind);
            }
        }
        infer_kind_from_iri(iri)
            .filter(|kind| allowed.contains(kind))
            .ok_or("has an undeterminable type")
    }
}

fn first_str(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(Value::as_str),
        _ => None,
    }
}

fn normalize(descriptor: &PredicateDescriptor, value: Value) -> Option<Value> {
    let values: Vec<Value> = match value {
        Value::Array(items) => items,
        single => vec![single],
    };
    let mut values: Vec<Value> = values
        .into_iter()
        .filter(|v| !is_empty_value(v))
        .map(|v| coerce(descriptor.value, v))
        .collect();

    if descriptor.multi {
        return (!values.is_empty()).then_some(Value::Array(values));
    }
    if values.is_empty() {
        None
    } else {
        Some(values.swap_remove(0))
    }
}

fn coerce(kind: ValueKind, value: Value) -> Value {
    match (kind, value) {
        (ValueKind::Boolean, Value::String(s)) => match s.as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => Value::String(s),
        },
        (ValueKind::Integer, Value::String(s)) => match s.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(s),
        },
        (_, value) => value,
    }
}

fn derive(descriptor: &PredicateDescriptor, fields: &Map<String, Value>) -> Option<Value> {
    match descriptor.derivation? {
        Derivation::DisplayName => {
            let name = fields.get("name").and_then(Value::as_str)?;
            let text = display_name(
                name,
                fields.get("vendor_name").and_then(Value::as_str),
                fields.get("version").and_then(Value::as_str),
            );
            Some(Value::String(text))
        }
    }
}
