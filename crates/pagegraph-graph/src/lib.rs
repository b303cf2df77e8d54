//! pagegraph-graph: Neo4j access for the pagegraph mirror.
//!
//! This crate is the single access point for the graph database. Writes go
//! through a [`GraphTransaction`] under the full-privilege role; every read
//! and every user-authored query runs under the read-only role.

pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::{GraphState, MemoryGraph};
pub use store::{
    GraphStore, GraphTransaction, PageNode, QueryProbe, ReadQueryRunner, SubjectNode,
};
