//! Scripted store executor for tests and local tooling.
//!
//! Query requests are answered from a queue of canned responses in order;
//! update requests succeed unless a failure was queued for them. Every
//! request is recorded so tests can inspect the emitted statements.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::store::{ResultShape, Row, StoreError, StoreExecutor, StoreOperation, StoreRequest};

/// A request as seen by the [ScriptedExecutor].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub database: String,
    pub text: String,
    pub operation: StoreOperation,
    pub shape: Option<ResultShape>,
}

#[derive(Default)]
pub struct ScriptedExecutor {
    queries: Mutex<VecDeque<Result<Vec<Row>, String>>>,
    updates: Mutex<VecDeque<Result<(), String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next unanswered query.
    pub fn respond(self, rows: Vec<Row>) -> Self {
        self.queries.lock().push_back(Ok(rows));
        self
    }

    /// Queue a failure for the next unanswered query.
    pub fn fail_query(self, message: &str) -> Self {
        self.queries.lock().push_back(Err(message.to_string()));
        self
    }

    /// Queue a failure for the next update.
    pub fn fail_update(self, message: &str) -> Self {
        self.updates.lock().push_back(Err(message.to_string()));
        self
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Only the update requests received so far.
    pub fn updates(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.operation == StoreOperation::Update)
            .cloned()
            .collect()
    }

    /// Number of queued query responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl StoreExecutor for ScriptedExecutor {
    async fn execute(&self, request: StoreRequest<'_>) -> Result<Vec<Row>, StoreError> {
        self.requests.lock().push(RecordedRequest {
            database: request.database.to_string(),
            text: request.text.to_string(),
            operation: request.operation,
            shape: request.shape,
        });

        match request.operation {
            StoreOperation::Update => match self.updates.lock().pop_front() {
                None | Some(Ok(())) => Ok(Vec::new()),
                Some(Err(message)) => Err(StoreError::Unavailable(message)),
            },
            StoreOperation::Query => match self.queries.lock().pop_front() {
                Some(Ok(rows)) => Ok(rows),
                Some(Err(message)) => Err(StoreError::Unavailable(message)),
                None => Err(StoreError::Unavailable(
                    "no scripted response left for query".to_string(),
                )),
            },
        }
    }
}
