//! Cursor-based pagination types for GraphQL
//!
//! Implements the Relay connection shape for list queries. Cursors are the
//! nodes' graph identities. The assembler works on an already materialised
//! candidate list: it sorts, skips `offset` rows, filters what remains and
//! collects at most `first` edges.

use std::cmp::Ordering;

use async_graphql::SimpleObject;

use crate::error::ConstraintViolation;
use crate::graphql::filters::{FilterInput, FilterMode, OrderMode, compare_values, passes};
use crate::orm::reducer::Node;

/// Information about pagination in a connection
#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// When paginating forwards, are there more items?
    pub has_next_page: bool,
    /// Were items skipped before this page?
    pub has_previous_page: bool,
    /// Cursor of the first item in this page
    pub start_cursor: Option<String>,
    /// Cursor of the last item in this page
    pub end_cursor: Option<String>,
    /// Number of well-formed items before filtering and windowing
    pub global_count: i64,
}

/// An edge in a connection, containing a node and cursor (internal use)
#[derive(Debug, Clone)]
pub struct Edge<T> {
    /// The item at the end of the edge
    pub node: T,
    /// A cursor for pagination
    pub cursor: String,
}

/// A paginated connection result (internal use)
#[derive(Debug, Clone)]
pub struct Connection<T> {
    /// The edges in this connection
    pub edges: Vec<Edge<T>>,
    /// Pagination information
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Create an empty connection
    pub fn empty(global_count: i64) -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo {
                global_count,
                ..Default::default()
            },
        }
    }

    /// Transform every node, keeping cursors and page info.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Connection<U> {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    node: f(edge.node),
                    cursor: edge.cursor,
                })
                .collect(),
            page_info: self.page_info,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// List arguments accepted by every list query.
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// Maximum number of edges (None = all)
    pub first: Option<usize>,
    /// Rows skipped before filters are applied
    pub offset: usize,
    pub ordered_by: Option<String>,
    pub order_mode: OrderMode,
    pub filters: Vec<FilterInput>,
    /// How the filters combine with each other
    pub filter_mode: FilterMode,
}

impl ListArgs {
    pub fn first(mut self, first: usize) -> Self {
        self.first = Some(first);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, field: &str, mode: OrderMode) -> Self {
        self.ordered_by = Some(field.to_string());
        self.order_mode = mode;
        self
    }

    pub fn filter(mut self, filter: FilterInput) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    /// Field names the assembler needs bound on every candidate.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .map(|f| f.key.as_str())
            .chain(self.ordered_by.as_deref())
    }
}

/// Build a page out of the full candidate list.
///
/// Candidates without a public id are dropped (and logged) before anything
/// else, so they neither count toward `global_count` nor consume `offset`.
pub fn assemble(candidates: Vec<Node>, args: &ListArgs) -> Connection<Node> {
    let mut valid: Vec<Node> = candidates
        .into_iter()
        .filter(|node| {
            let ok = node.id().is_some();
            if !ok {
                ConstraintViolation::new(Some(node.iri()), "id", "has no public identifier")
                    .log(None);
            }
            ok
        })
        .collect();
    let global_count = valid.len() as i64;

    if let Some(field) = args.ordered_by.as_deref() {
        sort_nodes(&mut valid, field, args.order_mode);
    }

    if args.offset > valid.len() {
        return Connection::empty(global_count);
    }

    let limit = args.first.unwrap_or(usize::MAX);
    let mut edges: Vec<Edge<Node>> = Vec::new();
    let mut filter_count = 0usize;
    let mut has_next_page = false;

    for node in valid.into_iter().skip(args.offset) {
        if !passes(&args.filters, args.filter_mode, &node) {
            continue;
        }
        filter_count += 1;
        if edges.len() == limit {
            // One more qualifying row exists beyond the window
            has_next_page = true;
            break;
        }
        edges.push(Edge {
            cursor: node.iri().to_string(),
            node,
        });
    }

    let page_info = PageInfo {
        has_next_page,
        has_previous_page: args.offset > 0 && filter_count > 0,
        start_cursor: edges.first().map(|e| e.cursor.clone()),
        end_cursor: edges.last().map(|e| e.cursor.clone()),
        global_count,
    };

    tracing::debug!(
        global_count,
        edges = edges.len(),
        offset = args.offset,
        has_next_page,
        "Assembled connection"
    );

    Connection { edges, page_info }
}

/// Stable sort by one field. Rows lacking the field go last in both directions.
fn sort_nodes(nodes: &mut [Node], field: &str, mode: OrderMode) {
    nodes.sort_by(|a, b| {
        match (a.field_value(field), b.field_value(field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let kind = a.kind().predicate_map().get_by_key(field).map(|d| d.value);
                let ordering = compare_values(kind, x, y).unwrap_or(Ordering::Equal);
                match mode {
                    OrderMode::Asc => ordering,
                    OrderMode::Desc => ordering.reverse(),
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityKind;
    use crate::graphql::filters::FilterOperator;
    use crate::services::row;
    use serde_json::json;

    fn software(i: usize, name: &str) -> Node {
        Node::new(
            EntityKind::Software,
            format!("http://example.com/Software-{}", i),
            row(json!({"id": i.to_string(), "name": name})),
        )
    }

    fn cursors(connection: &Connection<Node>) -> Vec<&str> {
        connection.edges.iter().map(|e| e.cursor.as_str()).collect()
    }

    #[test]
    fn test_first_page_without_arguments_returns_everything() {
        let nodes: Vec<Node> = (0..3).map(|i| software(i, "x")).collect();
        let page = assemble(nodes, &ListArgs::default());
        assert_eq!(page.edges.len(), 3);
        assert!(!page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
        assert_eq!(page.page_info.global_count, 3);
        assert_eq!(
            page.page_info.start_cursor.as_deref(),
            Some("http://example.com/Software-0")
        );
    }

    #[test]
    fn test_exact_fit_has_no_next_page() {
        let nodes: Vec<Node> = (0..4).map(|i| software(i, "x")).collect();
        let page = assemble(nodes, &ListArgs::default().first(2).offset(2));
        assert_eq!(page.edges.len(), 2);
        assert!(!page.page_info.has_next_page);
        assert!(page.page_info.has_previous_page);
    }

    #[test]
    fn test_offset_past_the_end_is_an_empty_page() {
        let nodes: Vec<Node> = (0..3).map(|i| software(i, "x")).collect();
        let page = assemble(nodes, &ListArgs::default().first(5).offset(4));
        assert!(page.edges.is_empty());
        assert!(!page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
        assert_eq!(page.page_info.global_count, 3);
    }

    #[test]
    fn test_offset_is_applied_before_filters() {
        let nodes = vec![
            software(0, "web"),
            software(1, "db"),
            software(2, "web"),
            software(3, "db"),
            software(4, "web"),
        ];
        let args = ListArgs::default()
            .offset(1)
            .first(1)
            .filter(FilterInput::new("name", &["web"]));
        let page = assemble(nodes, &args);
        assert_eq!(cursors(&page), vec!["http://example.com/Software-2"]);
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.global_count, 5);
    }

    #[test]
    fn test_unknown_filter_key_keeps_every_row() {
        let nodes: Vec<Node> = (0..3).map(|i| software(i, "x")).collect();
        let args = ListArgs::default().filter(FilterInput::new("no_such_field", &["x"]));
        let page = assemble(nodes, &args);
        assert_eq!(page.edges.len(), 3);
        assert_eq!(page.page_info.global_count, 3);
    }

    #[test]
    fn test_previous_page_requires_a_qualifying_row() {
        let nodes = vec![software(0, "web"), software(1, "db")];
        let args = ListArgs::default()
            .offset(1)
            .filter(FilterInput::new("name", &["web"]));
        let page = assemble(nodes, &args);
        assert!(page.edges.is_empty());
        assert!(!page.page_info.has_previous_page);
    }

    #[test]
    fn test_sort_is_stable_and_puts_missing_values_last() {
        let unnamed = Node::new(
            EntityKind::Software,
            "http://example.com/Software-9",
            row(json!({"id": "9"})),
        );
        let nodes = vec![
            unnamed,
            software(0, "beta"),
            software(1, "Alpha"),
            software(2, "beta"),
        ];

        let asc = assemble(
            nodes.clone(),
            &ListArgs::default().order_by("name", OrderMode::Asc),
        );
        assert_eq!(
            cursors(&asc),
            vec![
                "http://example.com/Software-1",
                "http://example.com/Software-0",
                "http://example.com/Software-2",
                "http://example.com/Software-9",
            ]
        );

        let desc = assemble(nodes, &ListArgs::default().order_by("name", OrderMode::Desc));
        assert_eq!(cursors(&desc)[0], "http://example.com/Software-0");
        assert_eq!(cursors(&desc)[3], "http://example.com/Software-9");
    }

    #[test]
    fn test_severity_sort_uses_rank() {
        let node = |i: usize, severity: &str| {
            Node::new(
                EntityKind::Hardware,
                format!("http://example.com/Hardware-{}", i),
                row(json!({"id": i.to_string(), "top_risk_severity": severity})),
            )
        };
        let nodes = vec![node(0, "moderate"), node(1, "very-high"), node(2, "low")];
        let page = assemble(
            nodes,
            &ListArgs::default()
                .order_by("top_risk_severity", OrderMode::Desc)
                .filter(FilterInput::new("top_risk_severity", &["low"]).operator(FilterOperator::Gt)),
        );
        assert_eq!(
            cursors(&page),
            vec!["http://example.com/Hardware-1", "http://example.com/Hardware-0"]
        );
    }
}
