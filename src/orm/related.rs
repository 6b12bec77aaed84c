//! Second-pass join for expensive backlink aggregates.
//!
//! Risk summaries hang off an asset through a three-hop inverse path, one
//! row per risk. Binding that path in the broad SELECT would multiply every
//! asset row by its risks, so the aggregates are fetched afterwards: the
//! IRIs of the rows that need them are chunked into `VALUES ?subject { .. }`
//! batches, the batches run with bounded concurrency, and each result is
//! attributed back to its subject by IRI.

use std::collections::HashMap;
use std::fmt;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::entities::vocab::{
    CLASS_RISK, INACTIVE_RISK_STATUSES, PATH_RISK_SUBJECT, PRED_RISK_LEVEL, PRED_RISK_STATUS,
};
use crate::error::DataResult;
use crate::orm::identity::iri_term;
use crate::orm::reducer::Node;
use crate::orm::traits::{PredicateDescriptor, ValueKind, literal};
use crate::services::{ResultShape, Row, StoreExecutor, StoreRequest};

/// Risk severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl Severity {
    /// Accepts `very-high`, `very_high`, `Very High` and so on.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized: String = text
            .trim()
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "very-low" => Some(Severity::VeryLow),
            "low" => Some(Severity::Low),
            "moderate" | "medium" => Some(Severity::Moderate),
            "high" => Some(Severity::High),
            "very-high" | "critical" => Some(Severity::VeryHigh),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::VeryLow => "very-low",
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::VeryHigh => "very-high",
        }
    }

    /// 1 (very low) to 5 (very high).
    pub fn rank(self) -> u8 {
        self as u8 + 1
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate over the open risks of one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskSummary {
    pub risk_count: i64,
    pub top_risk_severity: Option<Severity>,
}

impl RiskSummary {
    /// Value of an expensive field, or `None` when it has nothing to say.
    pub fn value_for(&self, descriptor: &PredicateDescriptor) -> Option<Value> {
        match descriptor.value {
            ValueKind::Integer => Some(Value::from(self.risk_count)),
            ValueKind::Severity => self
                .top_risk_severity
                .map(|s| Value::String(s.as_str().to_string())),
            _ => None,
        }
    }
}

/// Build the batched risk summary query for a set of subjects.
pub fn risk_summary_query(subjects: &[&str]) -> String {
    let values = subjects
        .iter()
        .map(|iri| iri_term(iri))
        .collect::<Vec<_>>()
        .join(" ");
    let inactive = INACTIVE_RISK_STATUSES
        .iter()
        .map(|status| literal(status))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "SELECT DISTINCT ?subject ?risk ?risk_level ?risk_status\n\
         WHERE {{\n\
         \x20 VALUES ?subject {{ {values} }}\n\
         \x20 ?risk a <{risk}> ;\n\
         \x20   {path} ?subject .\n\
         \x20 OPTIONAL {{ ?risk {level} ?risk_level }} .\n\
         \x20 OPTIONAL {{ ?risk {status} ?risk_status }} .\n\
         \x20 FILTER (!BOUND(?risk_status) || STR(?risk_status) NOT IN ({inactive}))\n\
         }}",
        values = values,
        risk = CLASS_RISK,
        path = PATH_RISK_SUBJECT,
        level = PRED_RISK_LEVEL,
        status = PRED_RISK_STATUS,
        inactive = inactive,
    )
}

/// Fold `?subject ?risk ?risk_level` rows into one summary per subject.
///
/// A risk bound with several levels counts once, at its highest level.
pub fn summarize(rows: &[Row]) -> HashMap<String, RiskSummary> {
    let mut per_risk: HashMap<(String, String), Option<Severity>> = HashMap::new();

    for row in rows {
        let (Some(subject), Some(risk)) = (
            row.get("subject").and_then(Value::as_str),
            row.get("risk").and_then(Value::as_str),
        ) else {
            continue;
        };
        let level = severities(row.get("risk_level")).into_iter().max();
        let entry = per_risk
            .entry((subject.to_string(), risk.to_string()))
            .or_insert(None);
        *entry = (*entry).max(level);
    }

    let mut summaries: HashMap<String, RiskSummary> = HashMap::new();
    for ((subject, _), level) in per_risk {
        let summary = summaries.entry(subject).or_default();
        summary.risk_count += 1;
        summary.top_risk_severity = summary.top_risk_severity.max(level);
    }
    summaries
}

fn severities(value: Option<&Value>) -> Vec<Severity> {
    let items = match value {
        Some(Value::Array(items)) => items.as_slice(),
        Some(other) => std::slice::from_ref(other),
        None => &[],
    };
    items
        .iter()
        .filter_map(|v| v.as_str().and_then(Severity::parse))
        .collect()
}

/// Runs the batched second pass against a store.
pub struct RelatedJoin<'a, S: ?Sized> {
    store: &'a S,
    database: &'a str,
    batch_size: usize,
    concurrency: usize,
}

impl<'a, S: StoreExecutor + ?Sized> RelatedJoin<'a, S> {
    pub fn new(store: &'a S, database: &'a str, batch_size: usize, concurrency: usize) -> Self {
        Self {
            store,
            database,
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch risk summaries for every subject, keyed by IRI.
    pub async fn risk_summaries(&self, subjects: &[&str]) -> DataResult<HashMap<String, RiskSummary>> {
        if subjects.is_empty() {
            return Ok(HashMap::new());
        }

        let batches: Vec<&[&str]> = subjects.chunks(self.batch_size).collect();
        tracing::debug!(
            subjects = subjects.len(),
            batches = batches.len(),
            concurrency = self.concurrency,
            "Joining risk summaries"
        );

        let partials: Vec<HashMap<String, RiskSummary>> = stream::iter(batches)
            .map(|batch| async move {
                let text = risk_summary_query(batch);
                let rows = self
                    .store
                    .execute(StoreRequest::query(self.database, &text, ResultShape::List))
                    .await?;
                Ok::<_, crate::error::DataError>(summarize(&rows))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        // Batches are disjoint, so merging never overwrites a subject
        Ok(partials.into_iter().flatten().collect())
    }

    /// Materialise the requested expensive fields onto each node.
    pub async fn attach(
        &self,
        nodes: Vec<Node>,
        fields: &[&'static PredicateDescriptor],
    ) -> DataResult<Vec<Node>> {
        if fields.is_empty() || nodes.is_empty() {
            return Ok(nodes);
        }

        let subjects: Vec<&str> = nodes.iter().map(Node::iri).collect();
        let summaries = self.risk_summaries(&subjects).await?;

        Ok(nodes
            .into_iter()
            .map(|node| {
                let summary = summaries.get(node.iri()).copied().unwrap_or_default();
                fields.iter().fold(node, |node, descriptor| {
                    match summary.value_for(descriptor) {
                        Some(value) => node.with_field(descriptor.field, value),
                        None => node,
                    }
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityKind;
    use crate::services::{ScriptedExecutor, row};
    use serde_json::json;

    #[test]
    fn test_severity_parsing_and_order() {
        assert_eq!(Severity::parse("Very High"), Some(Severity::VeryHigh));
        assert_eq!(Severity::parse("very_low"), Some(Severity::VeryLow));
        assert_eq!(Severity::parse("unknown"), None);
        assert!(Severity::VeryHigh > Severity::High);
        assert!(Severity::Moderate > Severity::Low);
        assert_eq!(Severity::VeryHigh.rank(), 5);
    }

    #[test]
    fn test_query_binds_every_subject_and_filters_closed_risks() {
        let text = risk_summary_query(&["http://example.com/a", "http://example.com/b"]);
        assert!(text.contains("VALUES ?subject { <http://example.com/a> <http://example.com/b> }"));
        assert!(text.contains(r#"NOT IN ("closed", "deviation_approved")"#));
    }

    #[test]
    fn test_summarize_counts_distinct_risks() {
        let rows = vec![
            row(json!({"subject": "a", "risk": "r1", "risk_level": "low"})),
            row(json!({"subject": "a", "risk": "r1", "risk_level": "high"})),
            row(json!({"subject": "a", "risk": "r2", "risk_level": "moderate"})),
            row(json!({"subject": "b", "risk": "r3"})),
        ];
        let summaries = summarize(&rows);
        assert_eq!(
            summaries["a"],
            RiskSummary {
                risk_count: 2,
                top_risk_severity: Some(Severity::High)
            }
        );
        assert_eq!(summaries["b"].risk_count, 1);
        assert_eq!(summaries["b"].top_risk_severity, None);
    }

    #[tokio::test]
    async fn test_attach_keeps_rows_associated_across_batches() {
        let store = ScriptedExecutor::new()
            .respond(vec![row(json!({"subject": "http://example.com/a", "risk": "r1", "risk_level": "high"}))])
            .respond(vec![row(json!({"subject": "http://example.com/b", "risk": "r2", "risk_level": "low"}))]);

        let nodes = vec![
            Node::new(EntityKind::Software, "http://example.com/a", Default::default()),
            Node::new(EntityKind::Software, "http://example.com/b", Default::default()),
        ];
        let map = EntityKind::Software.predicate_map();
        let fields = [
            map.get("risk_count").unwrap(),
            map.get("top_risk_severity").unwrap(),
        ];

        // One subject per batch, one batch at a time so the script order holds
        let join = RelatedJoin::new(&store, "db", 1, 1);
        let nodes = join.attach(nodes, &fields).await.unwrap();

        assert_eq!(nodes[0].get("top_risk_severity"), Some(&json!("high")));
        assert_eq!(nodes[1].get("top_risk_severity"), Some(&json!("low")));
        assert_eq!(nodes[1].get("risk_count"), Some(&json!(1)));
        assert_eq!(store.requests().len(), 2);
    }
}
