//! Page-level synchronization. Each public operation runs in exactly one
//! graph transaction and either commits fully or rolls back.

use pagegraph_core::time::compact_to_iso8601;
use pagegraph_core::{Page, PageId, SubjectId, TypedRelationList};
use pagegraph_graph::{GraphStore, GraphTransaction, PageNode};
use serde::Serialize;

use crate::error::Result;
use crate::projector::NodePropertyProjector;
use crate::reconciler::{RelationChanges, RelationReconciler};

/// What a single `save_page` did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub page_id: PageId,
    pub subjects_synced: u32,
    /// Subjects whose schema could not be resolved.
    pub subjects_skipped: u32,
    /// Memberships removed because the subject left the page.
    pub subjects_detached: u64,
    pub relations: RelationChanges,
}

pub struct GraphSynchronizer<S> {
    store: S,
    projector: NodePropertyProjector,
    reconciler: RelationReconciler,
}

impl<S: GraphStore> GraphSynchronizer<S> {
    pub fn new(store: S, projector: NodePropertyProjector) -> Self {
        Self {
            store,
            projector,
            reconciler: RelationReconciler::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mirror a page and its subjects into the graph.
    pub async fn save_page(&self, page: &Page) -> Result<SyncReport> {
        let mut txn = self.store.begin().await?;

        match self.write_page(txn.as_mut(), page).await {
            Ok(report) => {
                txn.commit().await?;
                tracing::info!(
                    page = %page.id,
                    synced = report.subjects_synced,
                    skipped = report.subjects_skipped,
                    detached = report.subjects_detached,
                    relation_churn = report.relations.churn(),
                    "Page synchronized"
                );
                Ok(report)
            }
            Err(e) => {
                abort(txn.as_mut(), &page.id).await;
                Err(e)
            }
        }
    }

    /// Remove a page and every subject only it owned. Returns the number of
    /// subject nodes deleted.
    pub async fn delete_page(&self, page_id: &PageId) -> Result<u64> {
        let mut txn = self.store.begin().await?;

        match txn.delete_page(page_id).await {
            Ok(removed) => {
                txn.commit().await?;
                tracing::info!(page = %page_id, subjects_removed = removed, "Page deleted");
                Ok(removed)
            }
            Err(e) => {
                abort(txn.as_mut(), page_id).await;
                Err(e.into())
            }
        }
    }

    /// Reconcile one subject's outgoing relations in a transaction of its own.
    pub async fn reconcile(
        &self,
        source: &SubjectId,
        relations: &TypedRelationList,
    ) -> Result<RelationChanges> {
        let mut txn = self.store.begin().await?;

        match self.reconciler.reconcile(txn.as_mut(), source, relations).await {
            Ok(changes) => {
                txn.commit().await?;
                tracing::debug!(subject = %source, churn = changes.churn(), "Relations reconciled");
                Ok(changes)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!(subject = %source, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn write_page(&self, txn: &mut dyn GraphTransaction, page: &Page) -> Result<SyncReport> {
        let mut report = SyncReport {
            page_id: page.id.clone(),
            ..Default::default()
        };

        txn.upsert_page(&page_node(page)).await?;

        // Nodes first, so relations between subjects of the same page
        // find their targets regardless of declaration order.
        let mut synced = Vec::new();
        for (subject, is_main) in page.subjects.all() {
            if self
                .projector
                .update_subject(txn, &page.id, subject, is_main)
                .await?
            {
                synced.push(subject);
            } else {
                // The node stays as it was, but its role on this page follows
                // the new content so the page keeps a single main subject.
                txn.set_membership_main(&page.id, &subject.id, is_main)
                    .await?;
                report.subjects_skipped += 1;
            }
        }

        for subject in &synced {
            report.relations += self
                .reconciler
                .reconcile(txn, &subject.id, &subject.relations())
                .await?;
        }
        report.subjects_synced = synced.len() as u32;

        report.subjects_detached = txn
            .detach_subjects_except(&page.id, &page.subjects.ids())
            .await?;

        Ok(report)
    }
}

fn page_node(page: &Page) -> PageNode {
    PageNode {
        id: page.id.clone(),
        title: page.properties.title.clone(),
        created_at: compact_to_iso8601(&page.properties.creation_time),
        updated_at: compact_to_iso8601(&page.properties.modification_time),
        last_editor: page.properties.last_editor.clone(),
    }
}

async fn abort(txn: &mut dyn GraphTransaction, page_id: &PageId) {
    match txn.rollback().await {
        Ok(()) => tracing::warn!(page = %page_id, "Page synchronization rolled back"),
        Err(e) => tracing::warn!(page = %page_id, error = %e, "Rollback failed"),
    }
}
