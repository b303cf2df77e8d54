//! In-memory implementation of [`GraphStore`].
//!
//! Mirrors the semantics of the Neo4j store closely enough to exercise page
//! synchronization without a database. A transaction holds the store lock
//! for its whole lifetime and works on a copy of the state, which replaces
//! the shared state only on commit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pagegraph_core::{PageId, Relation, RelationId, SubjectId};

use crate::client::GraphError;
use crate::store::{GraphStore, GraphTransaction, PageNode, SubjectNode, SUBJECT_LABEL};

/// Committed graph contents.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    pages: BTreeMap<PageId, PageNode>,
    subjects: BTreeMap<SubjectId, SubjectNode>,
    memberships: BTreeMap<(PageId, SubjectId), bool>,
    relations: BTreeMap<SubjectId, Vec<Relation>>,
    mutations: u64,
}

impl GraphState {
    pub fn page(&self, id: &PageId) -> Option<&PageNode> {
        self.pages.get(id)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn subject(&self, id: &SubjectId) -> Option<&SubjectNode> {
        self.subjects.get(id)
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Labels the subject node would carry in Neo4j.
    pub fn subject_labels(&self, id: &SubjectId) -> Vec<String> {
        self.subjects
            .get(id)
            .map(|s| vec![SUBJECT_LABEL.to_string(), s.schema.0.clone()])
            .unwrap_or_default()
    }

    /// Subjects linked to a page with their `is_main` flag, ordered by id.
    pub fn memberships(&self, page_id: &PageId) -> Vec<(SubjectId, bool)> {
        self.memberships
            .iter()
            .filter(|((p, _), _)| p == page_id)
            .map(|((_, s), is_main)| (s.clone(), *is_main))
            .collect()
    }

    pub fn relations_from(&self, source: &SubjectId) -> &[Relation] {
        self.relations.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn relation_count(&self) -> usize {
        self.relations.values().map(Vec::len).sum()
    }

    /// Number of state-changing operations committed so far.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
            && self.subjects.is_empty()
            && self.memberships.is_empty()
            && self.relation_count() == 0
    }

    fn owned(&self, subject: &SubjectId) -> bool {
        self.memberships.keys().any(|(_, s)| s == subject)
    }

    /// Delete a subject node along with every edge touching it.
    fn detach_delete_subject(&mut self, id: &SubjectId) {
        self.subjects.remove(id);
        self.relations.remove(id);
        for edges in self.relations.values_mut() {
            edges.retain(|r| &r.target != id);
        }
        self.relations.retain(|_, edges| !edges.is_empty());
        self.memberships.retain(|(_, s), _| s != id);
    }
}

/// Shared in-memory graph. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryGraph {
    state: Arc<Mutex<GraphState>>,
    failing_relation_writes: Arc<std::sync::atomic::AtomicBool>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the committed state.
    pub async fn snapshot(&self) -> GraphState {
        self.state.lock().await.clone()
    }

    /// Make every subsequent relation write fail, for rollback testing.
    pub fn fail_relation_writes(&self, fail: bool) {
        self.failing_relation_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, GraphError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            working,
            fail_relation_writes: self
                .failing_relation_writes
                .load(std::sync::atomic::Ordering::SeqCst),
        }))
    }
}

pub struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<GraphState>>,
    working: GraphState,
    fail_relation_writes: bool,
}

impl MemoryTransaction {
    fn state(&mut self) -> Result<&mut GraphState, GraphError> {
        if self.guard.is_none() {
            return Err(GraphError::TransactionClosed);
        }
        Ok(&mut self.working)
    }

    fn relation_write(&mut self) -> Result<&mut GraphState, GraphError> {
        if self.fail_relation_writes {
            return Err(GraphError::Connection("injected relation write failure".into()));
        }
        self.state()
    }
}

#[async_trait]
impl GraphTransaction for MemoryTransaction {
    async fn upsert_page(&mut self, page: &PageNode) -> Result<(), GraphError> {
        let state = self.state()?;
        if state.pages.get(&page.id) != Some(page) {
            state.pages.insert(page.id.clone(), page.clone());
            state.mutations += 1;
        }
        Ok(())
    }

    async fn upsert_subject(&mut self, subject: &SubjectNode) -> Result<(), GraphError> {
        let state = self.state()?;
        if state.subjects.get(&subject.id) != Some(subject) {
            state.subjects.insert(subject.id.clone(), subject.clone());
            state.mutations += 1;
        }
        Ok(())
    }

    async fn link_subject(
        &mut self,
        page_id: &PageId,
        subject_id: &SubjectId,
        is_main: bool,
    ) -> Result<(), GraphError> {
        let state = self.state()?;
        if !state.pages.contains_key(page_id) || !state.subjects.contains_key(subject_id) {
            return Ok(());
        }
        let key = (page_id.clone(), subject_id.clone());
        if state.memberships.get(&key) != Some(&is_main) {
            state.memberships.insert(key, is_main);
            state.mutations += 1;
        }
        Ok(())
    }

    async fn set_membership_main(
        &mut self,
        page_id: &PageId,
        subject_id: &SubjectId,
        is_main: bool,
    ) -> Result<(), GraphError> {
        let state = self.state()?;
        let key = (page_id.clone(), subject_id.clone());
        if let Some(flag) = state.memberships.get_mut(&key) {
            if *flag != is_main {
                *flag = is_main;
                state.mutations += 1;
            }
        }
        Ok(())
    }

    async fn detach_subjects_except(
        &mut self,
        page_id: &PageId,
        keep: &[SubjectId],
    ) -> Result<u64, GraphError> {
        let state = self.state()?;
        let keep: BTreeSet<&SubjectId> = keep.iter().collect();
        let stale: Vec<SubjectId> = state
            .memberships
            .keys()
            .filter(|(p, s)| p == page_id && !keep.contains(s))
            .map(|(_, s)| s.clone())
            .collect();

        for subject in &stale {
            state.memberships.remove(&(page_id.clone(), subject.clone()));
            if !state.owned(subject) {
                state.detach_delete_subject(subject);
            }
            state.mutations += 1;
        }
        Ok(stale.len() as u64)
    }

    async fn outgoing_relations(&mut self, source: &SubjectId) -> Result<Vec<Relation>, GraphError> {
        Ok(self.state()?.relations_from(source).to_vec())
    }

    async fn create_relation(
        &mut self,
        source: &SubjectId,
        relation: &Relation,
    ) -> Result<bool, GraphError> {
        let state = self.relation_write()?;
        if !state.subjects.contains_key(source) || !state.subjects.contains_key(&relation.target) {
            return Ok(false);
        }
        state
            .relations
            .entry(source.clone())
            .or_default()
            .push(relation.clone());
        state.mutations += 1;
        Ok(true)
    }

    async fn update_relation(
        &mut self,
        source: &SubjectId,
        relation: &Relation,
    ) -> Result<(), GraphError> {
        let state = self.relation_write()?;
        let existing = state
            .relations
            .get_mut(source)
            .and_then(|edges| edges.iter_mut().find(|r| r.id == relation.id));
        if let Some(edge) = existing {
            if edge.properties != relation.properties {
                edge.properties = relation.properties.clone();
                state.mutations += 1;
            }
        }
        Ok(())
    }

    async fn delete_relation(
        &mut self,
        source: &SubjectId,
        relation_id: &RelationId,
    ) -> Result<(), GraphError> {
        let state = self.relation_write()?;
        if let Some(edges) = state.relations.get_mut(source) {
            let before = edges.len();
            edges.retain(|r| &r.id != relation_id);
            if edges.len() != before {
                state.mutations += 1;
            }
            if edges.is_empty() {
                state.relations.remove(source);
            }
        }
        Ok(())
    }

    async fn delete_page(&mut self, page_id: &PageId) -> Result<u64, GraphError> {
        let state = self.state()?;
        if state.pages.remove(page_id).is_none() {
            return Ok(0);
        }
        state.mutations += 1;

        let linked: Vec<SubjectId> = state
            .memberships
            .keys()
            .filter(|(p, _)| p == page_id)
            .map(|(_, s)| s.clone())
            .collect();
        state.memberships.retain(|(p, _), _| p != page_id);

        let mut removed = 0;
        for subject in linked {
            if !state.owned(&subject) {
                state.detach_delete_subject(&subject);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn commit(&mut self) -> Result<(), GraphError> {
        let mut guard = self.guard.take().ok_or(GraphError::TransactionClosed)?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), GraphError> {
        self.guard.take().ok_or(GraphError::TransactionClosed)?;
        self.working = GraphState::default();
        Ok(())
    }
}
