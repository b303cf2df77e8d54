//! Error types for the pagegraph-sync crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The transaction was rolled back; nothing from this call persisted.
    #[error("Graph error: {0}")]
    Graph(#[from] pagegraph_graph::GraphError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
