//! SPARQL 1.1 protocol client for the triple store.
//!
//! Queries go to `{base}/{database}/query`, updates to
//! `{base}/{database}/update`. Result documents are flattened into rows and
//! rows for the same subject are collapsed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Number, Value};
use tracing::debug;
use url::Url;

use crate::config::Config;

use super::store::{
    ResultShape, Row, StoreError, StoreExecutor, StoreOperation, StoreRequest, collapse_rows,
};

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// HTTP executor speaking the SPARQL protocol.
pub struct HttpStoreExecutor {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl HttpStoreExecutor {
    /// Create an executor from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.store_timeout_secs))
            .build()?;

        // A trailing slash makes `join` append instead of replacing the last segment
        let mut base = config.store_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| StoreError::Unavailable(format!("invalid store url '{}': {}", base, e)))?;

        Ok(Self {
            client,
            base_url,
            username: config.store_username.clone(),
            password: config.store_password.clone(),
        })
    }

    fn endpoint(&self, database: &str, operation: StoreOperation) -> Result<Url, StoreError> {
        let path = match operation {
            StoreOperation::Query => format!("{}/query", database),
            StoreOperation::Update => format!("{}/update", database),
        };
        self.base_url
            .join(&path)
            .map_err(|e| StoreError::Unavailable(format!("invalid endpoint '{}': {}", path, e)))
    }
}

#[async_trait]
impl StoreExecutor for HttpStoreExecutor {
    async fn execute(&self, request: StoreRequest<'_>) -> Result<Vec<Row>, StoreError> {
        let url = self.endpoint(request.database, request.operation)?;
        let content_type = match request.operation {
            StoreOperation::Query => "application/sparql-query",
            StoreOperation::Update => "application/sparql-update",
        };

        debug!(
            database = request.database,
            operation = ?request.operation,
            url = %url,
            "Sending store request"
        );

        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(ACCEPT, "application/sparql-results+json")
            .body(request.text.to_string());
        if let Some(ref username) = self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if request.operation == StoreOperation::Update {
            return Ok(Vec::new());
        }

        let text = resp.text().await?;
        let mut rows = parse_results(&text)?;
        if request.shape == Some(ResultShape::Single) {
            rows.truncate(1);
        }
        Ok(rows)
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    #[serde(rename = "type")]
    term_type: String,
    value: String,
    datatype: Option<String>,
}

/// Parse a `application/sparql-results+json` document into collapsed rows.
pub fn parse_results(text: &str) -> Result<Vec<Row>, StoreError> {
    let document: SparqlResults =
        serde_json::from_str(text).map_err(|e| StoreError::Decode(e.to_string()))?;

    let rows = document
        .results
        .bindings
        .into_iter()
        .map(|binding| {
            binding
                .into_iter()
                .map(|(var, term)| (var, term_to_value(term)))
                .collect::<Row>()
        })
        .collect();

    Ok(collapse_rows(rows))
}

fn term_to_value(term: SparqlTerm) -> Value {
    match term.term_type.as_str() {
        "bnode" => Value::String(format!("_:{}", term.value)),
        "uri" => Value::String(term.value),
        _ => {
            let Some(local) = term.datatype.as_deref().and_then(|d| d.strip_prefix(XSD)) else {
                return Value::String(term.value);
            };
            match local {
                "boolean" => match term.value.as_str() {
                    "true" | "1" => Value::Bool(true),
                    "false" | "0" => Value::Bool(false),
                    _ => Value::String(term.value),
                },
                "integer" | "int" | "long" | "short" | "nonNegativeInteger" | "positiveInteger"
                | "unsignedInt" | "unsignedLong" | "unsignedShort" => term
                    .value
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or(Value::String(term.value)),
                "decimal" | "double" | "float" => term
                    .value
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::String(term.value)),
                _ => Value::String(term.value),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_results_converts_typed_literals() {
        let doc = json!({
            "head": {"vars": ["iri", "id", "is_scanned", "port_number"]},
            "results": {"bindings": [
                {
                    "iri": {"type": "uri", "value": "http://example.com#Port-1"},
                    "id": {"type": "literal", "value": "1"},
                    "is_scanned": {"type": "literal", "value": "true",
                        "datatype": "http://www.w3.org/2001/XMLSchema#boolean"},
                    "port_number": {"type": "literal", "value": "443",
                        "datatype": "http://www.w3.org/2001/XMLSchema#nonNegativeInteger"}
                }
            ]}
        });

        let rows = parse_results(&doc.to_string()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["iri"], json!("http://example.com#Port-1"));
        assert_eq!(rows[0]["id"], json!("1"));
        assert_eq!(rows[0]["is_scanned"], json!(true));
        assert_eq!(rows[0]["port_number"], json!(443));
    }

    #[test]
    fn test_parse_results_rejects_garbage() {
        let err = parse_results("<html>oops</html>").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn test_endpoint_joins_database_and_operation() {
        let config = Config {
            store_url: "http://localhost:5820".to_string(),
            ..Config::default()
        };
        let executor = HttpStoreExecutor::new(&config).unwrap();
        let url = executor.endpoint("cyio", StoreOperation::Update).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5820/cyio/update");
    }
}
