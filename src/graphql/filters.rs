//! GraphQL filter input types for list queries
//!
//! A list query carries any number of [FilterInput]s. Each filter names a
//! field, one or more values and an operator:
//! - match (equality)
//! - wildcard (`*` glob, substring when no `*` is given)
//! - gt, lt, gte, lte (ordered comparison)
//!
//! Filters are evaluated in memory by the connection assembler, after the
//! broad query has returned, so they see derived and second-pass fields too.

use std::cmp::Ordering;

use async_graphql::{Enum, InputObject};
use regex::Regex;
use serde_json::Value;

use crate::orm::reducer::Node;
use crate::orm::related::Severity;
use crate::orm::traits::{ValueKind, parse_timestamp};

/// Comparison applied between a field value and a filter value.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FilterOperator {
    /// Equal (strings compare case-insensitively)
    #[default]
    Match,
    /// Glob with `*`; plain text matches as a substring
    Wildcard,
    Gt,
    Lt,
    Gte,
    Lte,
}

/// How several conditions are combined.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FilterMode {
    #[default]
    And,
    Or,
}

/// Sort direction for `ordered_by`.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OrderMode {
    /// Ascending order (A-Z, 1-9, oldest-newest)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest-oldest)
    Desc,
}

/// Filter on one field
#[derive(InputObject, Clone, Debug, Default)]
pub struct FilterInput {
    /// Field name (or hint key)
    pub key: String,
    /// Candidate values
    pub values: Vec<String>,
    #[graphql(default)]
    pub operator: FilterOperator,
    /// How the values of this filter combine (defaults to any value matching)
    pub filter_mode: Option<FilterMode>,
}

impl FilterInput {
    pub fn new(key: &str, values: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn operator(mut self, operator: FilterOperator) -> Self {
        self.operator = operator;
        self
    }

    pub fn mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = Some(mode);
        self
    }

    /// Whether a node passes this filter. A node without the field never passes.
    pub fn matches(&self, node: &Node) -> bool {
        let Some(value) = node.field_value(&self.key) else {
            return false;
        };
        if self.values.is_empty() {
            return true;
        }
        let kind = node
            .kind()
            .predicate_map()
            .get_by_key(&self.key)
            .map(|d| d.value);

        let candidates: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        let value_matches = |wanted: &String| {
            candidates
                .iter()
                .any(|candidate| self.test(kind, candidate, wanted))
        };

        match self.filter_mode.unwrap_or(FilterMode::Or) {
            FilterMode::Or => self.values.iter().any(value_matches),
            FilterMode::And => self.values.iter().all(value_matches),
        }
    }

    fn test(&self, kind: Option<ValueKind>, candidate: &Value, wanted: &str) -> bool {
        let wanted_value = Value::String(wanted.to_string());
        match self.operator {
            FilterOperator::Match => {
                compare_values(kind, candidate, &wanted_value) == Some(Ordering::Equal)
            }
            FilterOperator::Wildcard => {
                wildcard_match(&value_text(candidate).to_lowercase(), &wanted.to_lowercase())
            }
            FilterOperator::Gt => {
                compare_values(kind, candidate, &wanted_value) == Some(Ordering::Greater)
            }
            FilterOperator::Lt => {
                compare_values(kind, candidate, &wanted_value) == Some(Ordering::Less)
            }
            FilterOperator::Gte => matches!(
                compare_values(kind, candidate, &wanted_value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lte => matches!(
                compare_values(kind, candidate, &wanted_value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// Evaluate a filter list.
///
/// Filters naming a key the node's kind does not know are ignored. When no
/// filter remains the node passes.
pub fn passes(filters: &[FilterInput], mode: FilterMode, node: &Node) -> bool {
    let map = node.kind().predicate_map();
    let mut known = filters
        .iter()
        .filter(|f| map.get_by_key(&f.key).is_some())
        .peekable();
    if known.peek().is_none() {
        return true;
    }
    match mode {
        FilterMode::And => known.all(|f| f.matches(node)),
        FilterMode::Or => known.any(|f| f.matches(node)),
    }
}

/// Order two field values according to the field's value kind.
///
/// Severities compare by rank, timestamps chronologically, numbers
/// numerically and everything else as case-insensitive text. `None` means
/// the values are not comparable under that kind.
pub fn compare_values(kind: Option<ValueKind>, a: &Value, b: &Value) -> Option<Ordering> {
    match kind {
        Some(ValueKind::Severity) => {
            let (a, b) = (Severity::parse(&value_text(a))?, Severity::parse(&value_text(b))?);
            Some(a.cmp(&b))
        }
        Some(ValueKind::DateTime) => {
            let (a, b) = (parse_timestamp(&value_text(a))?, parse_timestamp(&value_text(b))?);
            Some(a.cmp(&b))
        }
        Some(ValueKind::Boolean) => {
            let (a, b) = (as_bool(a)?, as_bool(b)?);
            Some(a.cmp(&b))
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => Some(
                value_text(a)
                    .to_lowercase()
                    .cmp(&value_text(b).to_lowercase()),
            ),
        },
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.first().map(value_text).unwrap_or_default(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
        _ => None,
    }
}

/// `*` matches any run of characters; a pattern without `*` is a substring test.
fn wildcard_match(text: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return text.contains(pattern);
    }

    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    match Regex::new(&format!("(?s)^{}$", body)) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Unusable wildcard pattern");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityKind;
    use crate::services::row;
    use serde_json::json;

    fn node(fields: Value) -> Node {
        Node::new(EntityKind::Hardware, "http://example.com/h", row(fields))
    }

    #[test]
    fn test_match_is_case_insensitive_and_checks_every_array_element() {
        let host = node(json!({"name": "Web-01", "labels_iri": ["http://a", "http://b"]}));
        assert!(FilterInput::new("name", &["web-01"]).matches(&host));
        assert!(FilterInput::new("labels", &["http://b"]).matches(&host));
        assert!(!FilterInput::new("vendor_name", &["x"]).matches(&host));
    }

    #[test]
    fn test_wildcard_patterns() {
        assert!(wildcard_match("web-server-01", "web*01"));
        assert!(wildcard_match("web-server-01", "*server*"));
        assert!(wildcard_match("web-server-01", "server"));
        assert!(!wildcard_match("web-server-01", "db*"));
        assert!(!wildcard_match("web-server-01", "*02"));
        assert!(wildcard_match("10.0.0.1", "10.*.1"));
        assert!(!wildcard_match("10x0x0x1", "10.0.*"));
        assert!(wildcard_match("a+b(c)", "a+b*"));
    }

    #[test]
    fn test_ordered_comparisons_respect_value_kind() {
        let host = node(json!({"top_risk_severity": "high", "vlan_id": "20",
            "last_scanned": "2024-03-01T00:00:00Z"}));
        assert!(
            FilterInput::new("top_risk_severity", &["moderate"])
                .operator(FilterOperator::Gt)
                .matches(&host)
        );
        assert!(
            !FilterInput::new("top_risk_severity", &["very-high"])
                .operator(FilterOperator::Gte)
                .matches(&host)
        );
        assert!(
            FilterInput::new("vlan_id", &["100"])
                .operator(FilterOperator::Lt)
                .matches(&host)
        );
        assert!(
            FilterInput::new("last_scanned", &["2024-01-01"])
                .operator(FilterOperator::Gt)
                .matches(&host)
        );
    }

    #[test]
    fn test_filter_modes() {
        let host = node(json!({"name": "web", "vendor_name": "dell"}));
        let name = FilterInput::new("name", &["web"]);
        let vendor = FilterInput::new("vendor_name", &["hp"]);

        assert!(!passes(&[name.clone(), vendor.clone()], FilterMode::And, &host));
        assert!(passes(&[name.clone(), vendor], FilterMode::Or, &host));
        assert!(passes(&[], FilterMode::And, &host));

        let both = FilterInput::new("name", &["web", "db"]).mode(FilterMode::And);
        assert!(!both.matches(&host));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let host = node(json!({"name": "web"}));
        let unknown = FilterInput::new("no_such_field", &["x"]);

        assert!(passes(&[unknown.clone()], FilterMode::And, &host));
        assert!(passes(
            &[unknown.clone(), FilterInput::new("name", &["web"])],
            FilterMode::And,
            &host
        ));
        assert!(!passes(
            &[unknown, FilterInput::new("name", &["db"])],
            FilterMode::Or,
            &host
        ));
    }
}
