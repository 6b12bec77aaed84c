//! GraphQL-facing value types: filter inputs and connection pages.

pub mod filters;
pub mod pagination;

pub use filters::{FilterInput, FilterMode, FilterOperator, OrderMode};
pub use pagination::{Connection, Edge, ListArgs, PageInfo};
