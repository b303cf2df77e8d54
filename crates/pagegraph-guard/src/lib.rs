//! pagegraph-guard: Read-only enforcement for user-authored Cypher.
//!
//! Three independent layers protect the graph:
//! - a lexical keyword classifier,
//! - execution under a role whose write privileges are revoked,
//! - the database's own privilege enforcement.

pub mod classifier;
pub mod error;
pub mod explain;
pub mod gate;

pub use classifier::KeywordQueryClassifier;
pub use error::QueryError;
pub use explain::ExplainQueryValidator;
pub use gate::{QueryGate, QueryValidator};
