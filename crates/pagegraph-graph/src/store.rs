//! Storage seam between the synchronizer and a graph backend.
//!
//! A [`GraphTransaction`] exposes the handful of graph mutations page
//! synchronization needs. Everything done through one transaction becomes
//! visible atomically on [`GraphTransaction::commit`]; dropping or rolling
//! back a transaction discards it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use pagegraph_core::{PageId, Relation, RelationId, ScalarValue, SchemaName, SubjectId};

use crate::client::GraphError;

/// Generic label carried by every page node.
pub const PAGE_LABEL: &str = "Page";
/// Generic label carried by every subject node.
pub const SUBJECT_LABEL: &str = "Subject";
/// Page to subject membership edge type.
pub const HAS_SUBJECT: &str = "HAS_SUBJECT";

/// Display properties written onto a page node.
#[derive(Debug, Clone, PartialEq)]
pub struct PageNode {
    pub id: PageId,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_editor: String,
}

/// A subject node: generic label plus one schema-derived label.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectNode {
    pub id: SubjectId,
    pub name: String,
    pub schema: SchemaName,
    pub properties: BTreeMap<String, Vec<ScalarValue>>,
}

/// Opens transactions against the graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, GraphError>;
}

/// Mutations used by page synchronization, scoped to one transaction.
#[async_trait]
pub trait GraphTransaction: Send {
    /// Create or update the page node.
    async fn upsert_page(&mut self, page: &PageNode) -> Result<(), GraphError>;

    /// Create or update a subject node, replacing its properties and its
    /// schema label.
    async fn upsert_subject(&mut self, subject: &SubjectNode) -> Result<(), GraphError>;

    /// Create or update the membership edge. No-op when either node is missing.
    async fn link_subject(
        &mut self,
        page_id: &PageId,
        subject_id: &SubjectId,
        is_main: bool,
    ) -> Result<(), GraphError>;

    /// Set `is_main` on an existing membership edge. Never creates one.
    async fn set_membership_main(
        &mut self,
        page_id: &PageId,
        subject_id: &SubjectId,
        is_main: bool,
    ) -> Result<(), GraphError>;

    /// Remove membership edges from the page to subjects not in `keep`.
    /// Subjects left without any owning page are deleted with their edges.
    /// Returns the number of memberships removed.
    async fn detach_subjects_except(
        &mut self,
        page_id: &PageId,
        keep: &[SubjectId],
    ) -> Result<u64, GraphError>;

    /// Current outgoing relation edges of a subject, keyed by their `id`.
    async fn outgoing_relations(&mut self, source: &SubjectId) -> Result<Vec<Relation>, GraphError>;

    /// Create a relation edge. Returns `false` without creating anything when
    /// the source or target subject does not exist.
    async fn create_relation(
        &mut self,
        source: &SubjectId,
        relation: &Relation,
    ) -> Result<bool, GraphError>;

    /// Replace the properties of an existing edge, keeping its `id`.
    async fn update_relation(
        &mut self,
        source: &SubjectId,
        relation: &Relation,
    ) -> Result<(), GraphError>;

    async fn delete_relation(
        &mut self,
        source: &SubjectId,
        relation_id: &RelationId,
    ) -> Result<(), GraphError>;

    /// Remove the page node and every subject it alone owns.
    /// Returns the number of subjects deleted.
    async fn delete_page(&mut self, page_id: &PageId) -> Result<u64, GraphError>;

    async fn commit(&mut self) -> Result<(), GraphError>;

    async fn rollback(&mut self) -> Result<(), GraphError>;
}

/// Executes user-authored queries under the read-only role.
#[async_trait]
pub trait ReadQueryRunner: Send + Sync {
    type Row: Send;

    async fn run_read(&self, cypher: &str) -> Result<Vec<Self::Row>, GraphError>;
}

/// Executes a query under the read-only role and always rolls it back.
///
/// An `Err(GraphError::PermissionDenied(_))` means the database refused it.
#[async_trait]
pub trait QueryProbe: Send + Sync {
    async fn probe(&self, cypher: &str) -> Result<(), GraphError>;
}
