//! Configuration for the pagegraph command-line tool.

use pagegraph_graph::GraphConfig;
use serde::Deserialize;

/// Top-level configuration.
///
/// Loaded from `pagegraph.toml` (or the file named by `--config`) and
/// `PAGEGRAPH__` environment variables, e.g. `PAGEGRAPH__NEO4J__URI`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: GraphConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub schemas: SchemaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Probe queries under the read-only role before running them.
    #[serde(default = "default_true")]
    pub explain_check: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    /// JSON file holding an array of schema definitions.
    #[serde(default)]
    pub path: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            explain_check: default_true(),
        }
    }
}

impl AppConfig {
    /// Layer the optional config file under environment overrides.
    pub fn load(file_prefix: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("PAGEGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.neo4j.read_user, "pagegraph_reader");
        assert_eq!(config.neo4j.max_connections, 16);
        assert!(config.query.explain_check);
        assert!(config.schemas.path.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");

        let config = AppConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.neo4j.user, "neo4j");
        assert!(config.query.explain_check);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("site.toml"),
            r#"
[neo4j]
uri = "bolt://graph.internal:7687"
read_user = "wiki_reader"
read_password = "s3cret"

[query]
explain_check = false

[schemas]
path = "/etc/pagegraph/schemas.json"
"#,
        )
        .unwrap();

        let prefix = dir.path().join("site");
        let config = AppConfig::load(prefix.to_str().unwrap()).unwrap();

        assert_eq!(config.neo4j.uri, "bolt://graph.internal:7687");
        assert_eq!(config.neo4j.read_user, "wiki_reader");
        assert_eq!(config.neo4j.read_password, "s3cret");
        assert_eq!(config.neo4j.user, "neo4j");
        assert!(!config.query.explain_check);
        assert_eq!(
            config.schemas.path.as_deref(),
            Some("/etc/pagegraph/schemas.json")
        );
    }
}
