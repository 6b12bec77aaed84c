//! Predicate-map ORM layer
//!
//! Every entity kind is described once by a [PredicateMap]: the field names
//! the API speaks, the RDF predicate each one maps to, and how its values
//! are fetched and written. Everything else is driven from those tables:
//! - SELECT generation with field partitioning ([builder])
//! - Row reduction into sparse nodes ([reducer])
//! - Second-pass aggregate joins ([related])
//! - Insert/delete/update statements ([mutation], [diff])
//! - Reference resolution ahead of writes ([resolver])
//! - Batched hint materialisation ([loaders])
//!
//! # Repository Pattern
//!
//! The repository module strings these together behind one interface that
//! works for both API resolvers and internal service code:
//!
//! ```rust,ignore
//! use crate::graphql::pagination::ListArgs;
//!
//! let page = repo
//!     .list(EntityKind::Hardware, &Selection::new(["name", "ip_address"]), &ListArgs::default().first(50))
//!     .await?;
//! ```

pub mod builder;
pub mod children;
pub mod diff;
pub mod identity;
pub mod loaders;
pub mod mutation;
pub mod reducer;
pub mod related;
mod repository;
pub mod resolver;
pub mod traits;

pub use builder::{FieldPartition, ParentScope, SelectQuery, Selection};
pub use diff::{EditInstruction, EditOperation};
pub use loaders::HintLoader;
pub use reducer::{Node, Reducer};
pub use related::Severity;
pub use repository::*;
pub use traits::*;
