//! Error types for the pagegraph-guard crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// The query was judged unsafe and was not executed. Never retry.
    #[error("Query not allowed: {reason}")]
    NotAllowed { reason: String },

    /// Infrastructure failure while checking or executing the query.
    #[error("Graph error: {0}")]
    Graph(#[from] pagegraph_graph::GraphError),
}

impl QueryError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::NotAllowed { .. })
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
