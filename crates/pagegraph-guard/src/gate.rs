//! Layered execution filter for user-authored queries.
//!
//! 1. Keyword classification (pure, no I/O).
//! 2. Any configured validators, e.g. [`crate::ExplainQueryValidator`].
//! 3. Execution under the read-only role, where the database enforces its
//!    own privilege revocation.

use std::sync::Arc;

use async_trait::async_trait;
use pagegraph_graph::{GraphError, ReadQueryRunner};

use crate::classifier::KeywordQueryClassifier;
use crate::error::{QueryError, Result};

/// Decides whether a query is read-only.
#[async_trait]
pub trait QueryValidator: Send + Sync {
    async fn is_read_only(&self, query: &str) -> std::result::Result<bool, GraphError>;
}

#[async_trait]
impl QueryValidator for KeywordQueryClassifier {
    async fn is_read_only(&self, query: &str) -> std::result::Result<bool, GraphError> {
        Ok(KeywordQueryClassifier::is_read_only(self, query))
    }
}

pub struct QueryGate<R> {
    classifier: KeywordQueryClassifier,
    validators: Vec<Arc<dyn QueryValidator>>,
    runner: R,
}

impl<R: ReadQueryRunner> QueryGate<R> {
    pub fn new(runner: R) -> Self {
        Self {
            classifier: KeywordQueryClassifier::new(),
            validators: Vec::new(),
            runner,
        }
    }

    /// Add a validator consulted after keyword classification, in order.
    pub fn with_validator(mut self, validator: Arc<dyn QueryValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Keyword classification only.
    pub fn check(&self, query: &str) -> Result<()> {
        match self.classifier.find_write_keyword(query) {
            Some(keyword) => {
                tracing::info!(keyword, "Query rejected by keyword classifier");
                Err(QueryError::NotAllowed {
                    reason: format!("contains {keyword}"),
                })
            }
            None => Ok(()),
        }
    }

    /// Validate and, if every layer agrees, execute the query.
    pub async fn run(&self, query: &str) -> Result<Vec<R::Row>> {
        self.check(query)?;

        for validator in &self.validators {
            if !validator.is_read_only(query).await? {
                return Err(QueryError::NotAllowed {
                    reason: "refused by the read-only role".to_string(),
                });
            }
        }

        match self.runner.run_read(query).await {
            Ok(rows) => {
                tracing::debug!(rows = rows.len(), "Read query executed");
                Ok(rows)
            }
            Err(e) if e.is_permission_denied() => {
                tracing::info!("Read query refused by the database");
                Err(QueryError::NotAllowed {
                    reason: "refused by the database".to_string(),
                })
            }
            Err(e) => Err(QueryError::Graph(e)),
        }
    }
}
