//! Read operations for the page graph.
//!
//! Everything here runs under the read-only role, including internal
//! bookkeeping reads.

use async_trait::async_trait;
use neo4rs::{query, Row};

use pagegraph_core::{PageId, SubjectId};

use crate::client::{GraphClient, GraphError};
use crate::store::{QueryProbe, ReadQueryRunner};

/// A page membership as stored in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub subject_id: SubjectId,
    pub is_main: bool,
}

impl GraphClient {
    /// Count nodes carrying `label` (escaped before interpolation).
    pub async fn count_nodes(&self, label: &str) -> Result<i64, GraphError> {
        let cypher = format!(
            "MATCH (n:{}) RETURN count(n) AS cnt",
            crate::mutations::escape_identifier(label)
        );

        match self.read_one(query(&cypher)).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Subjects linked to a page, ordered by subject id.
    pub async fn page_memberships(&self, page_id: &PageId) -> Result<Vec<Membership>, GraphError> {
        let q = query(
            "MATCH (:Page {id: $id})-[r:HAS_SUBJECT]->(s:Subject)
             RETURN s.id AS id, r.is_main AS is_main
             ORDER BY id",
        )
        .param("id", page_id.to_string());

        let rows = self.run_read_query(q).await?;
        let mut memberships = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .get("id")
                .map_err(|e| GraphError::Serialization(format!("Failed to get subject id: {e}")))?;
            memberships.push(Membership {
                subject_id: SubjectId(id),
                is_main: row.get::<bool>("is_main").unwrap_or(false),
            });
        }
        Ok(memberships)
    }

    /// Count relation edges leaving a subject.
    pub async fn count_relations(&self, source: &SubjectId) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (:Subject {id: $id})-[r]->(:Subject)
             WHERE r.id IS NOT NULL
             RETURN count(r) AS cnt",
        )
        .param("id", source.to_string());

        match self.read_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl ReadQueryRunner for GraphClient {
    type Row = Row;

    async fn run_read(&self, cypher: &str) -> Result<Vec<Row>, GraphError> {
        self.run_read_query(query(cypher)).await
    }
}

#[async_trait]
impl QueryProbe for GraphClient {
    async fn probe(&self, cypher: &str) -> Result<(), GraphError> {
        let mut txn = self.start_read_txn().await?;

        let outcome = async {
            let mut stream = txn.execute(query(cypher)).await?;
            while stream.next(txn.handle()).await?.is_some() {}
            Ok::<(), GraphError>(())
        }
        .await;

        // Nothing a probe does may persist, even when it succeeded.
        if let Err(e) = txn.rollback().await {
            tracing::debug!(error = %e, "Probe rollback failed");
        }
        outcome
    }
}
