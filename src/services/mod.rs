//! Store executors and process-level services

pub mod http;
pub mod logging;
pub mod scripted;
pub mod store;

pub use http::HttpStoreExecutor;
pub use logging::{LogFormat, init_tracing};
pub use scripted::{RecordedRequest, ScriptedExecutor};
pub use store::{
    ResultShape, Row, StoreError, StoreExecutor, StoreOperation, StoreRequest, collapse_rows, row,
};
