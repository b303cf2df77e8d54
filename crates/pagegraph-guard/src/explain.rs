//! Authoritative read-only check by execution under the read-only role.
//!
//! A keyword list cannot know every procedure an extension may register.
//! Running the query under a role whose write privileges are revoked lets
//! the database decide; the probe is always rolled back.

use async_trait::async_trait;
use pagegraph_graph::{GraphError, QueryProbe};

use crate::gate::QueryValidator;

pub struct ExplainQueryValidator<P> {
    probe: P,
}

impl<P: QueryProbe> ExplainQueryValidator<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl<P: QueryProbe> QueryValidator for ExplainQueryValidator<P> {
    /// Permission denials become `Ok(false)`; other failures propagate so the
    /// caller can tell a rejection from an outage.
    async fn is_read_only(&self, query: &str) -> Result<bool, GraphError> {
        match self.probe.probe(query).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_permission_denied() => {
                tracing::info!("Query refused by the read-only role");
                tracing::debug!(error = %e, "Probe denial detail");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
