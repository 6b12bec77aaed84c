//! Asset Graph - predicate-map driven data access for an asset inventory
//!
//! Entities (software, operating systems, hardware, networks and their
//! embedded addresses and ports) are stored as named graphs in a SPARQL
//! triple store. This crate builds the queries and updates, reduces result
//! rows into sparse nodes, and pages them for an API layer.

pub mod config;
pub mod entities;
pub mod error;
pub mod graphql;
pub mod orm;
pub mod services;

pub use config::Config;
pub use entities::EntityKind;
pub use error::{DataError, DataResult};
pub use orm::Repository;
