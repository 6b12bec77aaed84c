//! Core types for the predicate-map layer
//!
//! Every entity kind exposes a static table of [PredicateDescriptor]s. The
//! table is the single source of truth for:
//! - which graph predicate (or property path) backs each field
//! - how a value is rendered into a query fragment
//! - whether the field is fetched in the broad query or a second pass
//! - which result key carries raw child IRIs ("hint" fields)

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

use crate::entities::EntityKind;
use crate::error::{DataError, DataResult};
use crate::orm::identity::{iri_term, validate_iri};
use crate::orm::related::Severity;

const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// How a field's values are represented in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Plain string literal
    Literal,
    Boolean,
    Integer,
    DateTime,
    /// Raw IRI of another node (labels, notes, ...)
    Iri,
    /// Risk severity level, ordered by rank rather than text
    Severity,
    /// External id of another entity; resolved to its IRI before writing
    Reference(EntityKind),
    /// Privately owned child entities, always replaced wholesale
    Embedded(ChildCollection),
}

/// Embedded child collections owned by a parent entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildCollection {
    IpAddress,
    MacAddress,
    Port,
    AddressRange,
}

/// Whether a field is bound in the main query or fetched afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Bound as an OPTIONAL pattern in the broad SELECT
    Broad,
    /// One-to-many backlink aggregate; joined in a second, batched pass
    Expensive,
}

/// Fields whose value is computed from other fields when not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// `vendor name version`, vendor omitted when the name already starts with it
    DisplayName,
}

/// Describes one field of an entity kind.
#[derive(Debug, Clone, Copy)]
pub struct PredicateDescriptor {
    /// Field name as seen by callers; also the SELECT variable name
    pub field: &'static str,
    /// Predicate IRI in angle brackets, or a property path
    pub predicate: &'static str,
    pub value: ValueKind,
    /// Field may carry several values
    pub multi: bool,
    /// Result key for raw child IRIs, kept apart from the materialised field
    pub hint: Option<&'static str>,
    /// Must be supplied on create
    pub required: bool,
    /// Cannot be edited by callers
    pub read_only: bool,
    pub strategy: FetchStrategy,
    pub derivation: Option<Derivation>,
    /// Fields that must be bound for a derived value to be computed
    pub depends_on: &'static [&'static str],
}

impl PredicateDescriptor {
    const fn base(field: &'static str, predicate: &'static str, value: ValueKind) -> Self {
        Self {
            field,
            predicate,
            value,
            multi: false,
            hint: None,
            required: false,
            read_only: false,
            strategy: FetchStrategy::Broad,
            derivation: None,
            depends_on: &[],
        }
    }

    pub const fn literal(field: &'static str, predicate: &'static str) -> Self {
        Self::base(field, predicate, ValueKind::Literal)
    }

    pub const fn boolean(field: &'static str, predicate: &'static str) -> Self {
        Self::base(field, predicate, ValueKind::Boolean)
    }

    pub const fn integer(field: &'static str, predicate: &'static str) -> Self {
        Self::base(field, predicate, ValueKind::Integer)
    }

    pub const fn datetime(field: &'static str, predicate: &'static str) -> Self {
        Self::base(field, predicate, ValueKind::DateTime)
    }

    /// Multi-valued IRI list surfaced under a hint key.
    pub const fn iri_list(field: &'static str, predicate: &'static str, hint: &'static str) -> Self {
        Self {
            multi: true,
            hint: Some(hint),
            ..Self::base(field, predicate, ValueKind::Iri)
        }
    }

    pub const fn reference(
        field: &'static str,
        predicate: &'static str,
        target: EntityKind,
        hint: &'static str,
    ) -> Self {
        Self {
            hint: Some(hint),
            ..Self::base(field, predicate, ValueKind::Reference(target))
        }
    }

    pub const fn embedded(
        field: &'static str,
        predicate: &'static str,
        collection: ChildCollection,
        hint: &'static str,
    ) -> Self {
        Self {
            multi: true,
            hint: Some(hint),
            ..Self::base(field, predicate, ValueKind::Embedded(collection))
        }
    }

    /// Aggregate computed from backlinks in a second pass.
    pub const fn expensive(field: &'static str, path: &'static str, value: ValueKind) -> Self {
        Self {
            read_only: true,
            strategy: FetchStrategy::Expensive,
            ..Self::base(field, path, value)
        }
    }

    pub const fn multi(self) -> Self {
        Self { multi: true, ..self }
    }

    pub const fn single(self) -> Self {
        Self { multi: false, ..self }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }

    pub const fn derived(self, derivation: Derivation, depends_on: &'static [&'static str]) -> Self {
        Self {
            derivation: Some(derivation),
            depends_on,
            ..self
        }
    }

    /// Key under which the reducer emits this field.
    pub fn output_key(&self) -> &'static str {
        self.hint.unwrap_or(self.field)
    }

    /// Whether the field is bound in the broad SELECT.
    pub fn is_broad(&self) -> bool {
        self.strategy == FetchStrategy::Broad
    }

    /// Render `subject predicate object`. A missing value binds `?field`.
    pub fn binding(&self, subject: &str, value: Option<&str>) -> String {
        match value {
            Some(object) => format!("{} {} {}", subject, self.predicate, object),
            None => format!("{} {} ?{}", subject, self.predicate, self.field),
        }
    }

    /// Same fragment as [binding](Self::binding), but absence does not drop the row.
    pub fn optional(&self, subject: &str, value: Option<&str>) -> String {
        format!("OPTIONAL {{ {} }} .", self.binding(subject, value))
    }

    /// Render one caller-supplied value as an RDF term.
    ///
    /// Reference values must already be resolved to IRIs. Embedded values
    /// are never rendered here; they go through child creation.
    pub fn render_value(&self, value: &Value) -> DataResult<String> {
        match self.value {
            ValueKind::Literal => Ok(literal(&self.scalar_text(value)?)),
            ValueKind::Boolean => {
                let flag = match value {
                    Value::Bool(b) => *b,
                    Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                        "true" | "1" | "yes" => true,
                        "false" | "0" | "no" => false,
                        _ => return Err(self.invalid(value, "expected a boolean")),
                    },
                    _ => return Err(self.invalid(value, "expected a boolean")),
                };
                Ok(typed_literal(&flag.to_string(), XSD_BOOLEAN))
            }
            ValueKind::Integer => {
                let number = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match number {
                    Some(n) => Ok(typed_literal(&n.to_string(), XSD_INTEGER)),
                    None => Err(self.invalid(value, "expected an integer")),
                }
            }
            ValueKind::DateTime => {
                let text = self.scalar_text(value)?;
                let parsed = parse_timestamp(&text)
                    .ok_or_else(|| self.invalid(value, "expected an RFC 3339 timestamp"))?;
                Ok(datetime_literal(&parsed))
            }
            ValueKind::Severity => {
                let text = self.scalar_text(value)?;
                let severity = Severity::parse(&text)
                    .ok_or_else(|| self.invalid(value, "unknown severity level"))?;
                Ok(literal(severity.as_str()))
            }
            ValueKind::Iri | ValueKind::Reference(_) => {
                let text = self.scalar_text(value)?;
                validate_iri(&text)?;
                Ok(iri_term(&text))
            }
            ValueKind::Embedded(_) => Err(DataError::validation(
                self.field,
                "embedded collections are written through child entities",
            )),
        }
    }

    fn scalar_text(&self, value: &Value) -> DataResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Err(DataError::validation(self.field, "null is not allowed")),
            _ => Err(self.invalid(value, "expected a scalar value")),
        }
    }

    fn invalid(&self, value: &Value, reason: &str) -> DataError {
        DataError::validation(self.field, format!("{}: {}", reason, value))
    }
}

/// Immutable, process-wide field table for one entity kind.
#[derive(Debug)]
pub struct PredicateMap {
    kind: EntityKind,
    descriptors: &'static [PredicateDescriptor],
    by_field: HashMap<&'static str, usize>,
    by_hint: HashMap<&'static str, usize>,
}

impl PredicateMap {
    pub fn new(kind: EntityKind, descriptors: &'static [PredicateDescriptor]) -> Self {
        let mut by_field = HashMap::with_capacity(descriptors.len());
        let mut by_hint = HashMap::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            by_field.insert(descriptor.field, index);
            if let Some(hint) = descriptor.hint {
                by_hint.insert(hint, index);
            }
        }
        Self {
            kind,
            descriptors,
            by_field,
            by_hint,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Look up a descriptor by field name. Unknown fields yield `None`.
    pub fn get(&self, field: &str) -> Option<&'static PredicateDescriptor> {
        self.by_field.get(field).map(|&i| &self.descriptors[i])
    }

    /// Look up a descriptor by field name or by its hint key.
    pub fn get_by_key(&self, key: &str) -> Option<&'static PredicateDescriptor> {
        self.get(key)
            .or_else(|| self.by_hint.get(key).map(|&i| &self.descriptors[i]))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.by_field.contains_key(field)
    }

    pub fn descriptors(&self) -> &'static [PredicateDescriptor] {
        self.descriptors
    }

    /// Names of every field, in table order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.field).collect()
    }
}

/// Quote and escape a plain string literal.
pub fn literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn typed_literal(text: &str, datatype: &str) -> String {
    format!("{}^^<{}>", literal(text), datatype)
}

/// Render a UTC timestamp as an `xsd:dateTime` literal.
pub fn datetime_literal(at: &DateTime<Utc>) -> String {
    typed_literal(&at.to_rfc3339_opts(SecondsFormat::Secs, true), XSD_DATETIME)
}

/// Accept RFC 3339 timestamps and bare dates (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
