//! Neo4j connection management and shared graph client.

use neo4rs::{ConfigBuilder, Graph, Query, Row};
use serde::Deserialize;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(neo4rs::Error),

    /// The database refused the operation for the connected role.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction already finished")]
    TransactionClosed,
}

impl GraphError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(err: neo4rs::Error) -> Self {
        let message = err.to_string();
        if is_permission_denial(&message) {
            Self::PermissionDenied(message)
        } else {
            Self::Query(err)
        }
    }
}

/// Whether a driver error message reports a privilege or access-mode refusal.
pub fn is_permission_denial(message: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "Neo.ClientError.Security.Forbidden",
        "Neo.ClientError.Statement.AccessMode",
        "not allowed for user",
        "in read access mode not allowed",
        "permission denied",
    ];
    let lower = message.to_lowercase();
    MARKERS
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

/// Configuration for connecting to Neo4j with two roles.
///
/// `user` holds full privileges and is used for synchronization.
/// `read_user` must have write privileges revoked at the database level;
/// every user-authored query runs under it.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_read_user")]
    pub read_user: String,
    #[serde(default = "default_password")]
    pub read_password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_read_user() -> String {
    "pagegraph_reader".to_string()
}

fn default_password() -> String {
    "pagegraph-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            read_user: default_read_user(),
            read_password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Thread-safe Neo4j client holding one connection pool per role.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    writer: Graph,
    reader: Graph,
}

impl GraphClient {
    /// Connect both the full-privilege and the read-only pool.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let writer = connect_as(config, &config.user, &config.password).await?;
        let reader = connect_as(config, &config.read_user, &config.read_password).await?;

        tracing::info!(
            uri = %config.uri,
            writer = %config.user,
            reader = %config.read_user,
            "Connected to Neo4j"
        );
        Ok(Self { writer, reader })
    }

    /// Begin a transaction under the full-privilege role.
    pub async fn start_txn(&self) -> Result<neo4rs::Txn, GraphError> {
        Ok(self.writer.start_txn().await?)
    }

    /// Begin a transaction under the read-only role.
    pub async fn start_read_txn(&self) -> Result<neo4rs::Txn, GraphError> {
        Ok(self.reader.start_txn().await?)
    }

    /// Execute a query under the full-privilege role, discarding results.
    pub async fn run_write_query(&self, query: Query) -> Result<(), GraphError> {
        self.writer.run(query).await?;
        Ok(())
    }

    /// Execute a query under the read-only role and collect all rows.
    pub async fn run_read_query(&self, query: Query) -> Result<Vec<Row>, GraphError> {
        let mut stream = self.reader.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query under the read-only role and return the first row.
    pub async fn read_one(&self, query: Query) -> Result<Option<Row>, GraphError> {
        let mut stream = self.reader.execute(query).await?;
        Ok(stream.next().await?)
    }
}

async fn connect_as(config: &GraphConfig, user: &str, password: &str) -> Result<Graph, GraphError> {
    let neo_config = ConfigBuilder::default()
        .uri(&config.uri)
        .user(user)
        .password(password)
        .max_connections(config.max_connections as usize)
        .fetch_size(config.fetch_size)
        .build()
        .map_err(|e| GraphError::Connection(e.to_string()))?;

    Graph::connect(neo_config)
        .await
        .map_err(|e| GraphError::Connection(e.to_string()))
}
