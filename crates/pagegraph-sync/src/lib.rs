//! pagegraph-sync: Mirrors pages and their subjects into the graph.
//!
//! [`GraphSynchronizer`] owns the transaction boundary. Inside it,
//! [`NodePropertyProjector`] writes subject nodes and
//! [`RelationReconciler`] diffs relation edges by their stable ids.

pub mod error;
pub mod lifecycle;
pub mod projector;
pub mod reconciler;
pub mod synchronizer;

pub use error::SyncError;
pub use lifecycle::PageLifecycle;
pub use projector::NodePropertyProjector;
pub use reconciler::{RelationAction, RelationChanges, RelationPlan, RelationReconciler};
pub use synchronizer::{GraphSynchronizer, SyncReport};
