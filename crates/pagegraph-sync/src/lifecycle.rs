//! Page lifecycle hooks: host content events mapped onto the synchronizer.

use std::sync::Arc;

use pagegraph_core::{Page, PageId};
use pagegraph_graph::GraphStore;

use crate::error::Result;
use crate::synchronizer::{GraphSynchronizer, SyncReport};

pub struct PageLifecycle<S> {
    synchronizer: Arc<GraphSynchronizer<S>>,
}

impl<S> Clone for PageLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            synchronizer: Arc::clone(&self.synchronizer),
        }
    }
}

impl<S: GraphStore> PageLifecycle<S> {
    pub fn new(synchronizer: Arc<GraphSynchronizer<S>>) -> Self {
        Self { synchronizer }
    }

    /// A page was created or edited.
    pub async fn on_page_saved(&self, page: &Page) -> Result<SyncReport> {
        tracing::debug!(page = %page.id, "Page saved");
        self.synchronizer.save_page(page).await
    }

    /// A previously deleted page was restored with its current content.
    pub async fn on_page_undeleted(&self, page: &Page) -> Result<SyncReport> {
        tracing::info!(page = %page.id, "Page restored");
        self.synchronizer.save_page(page).await
    }

    pub async fn on_page_deleted(&self, page_id: &PageId) -> Result<u64> {
        tracing::debug!(page = %page_id, "Page deleted");
        self.synchronizer.delete_page(page_id).await
    }
}
