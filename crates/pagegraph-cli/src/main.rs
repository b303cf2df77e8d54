//! CLI entry point for the pagegraph mirror.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use pagegraph_core::{Page, PageId, PropertyTypeRegistry, SchemaRegistry, ValueBuilderRegistry};
use pagegraph_graph::GraphClient;
use pagegraph_guard::{ExplainQueryValidator, KeywordQueryClassifier, QueryGate};
use pagegraph_sync::{GraphSynchronizer, NodePropertyProjector, PageLifecycle};

use pagegraph_cli::config::AppConfig;

#[derive(Parser)]
#[command(name = "pagegraph")]
#[command(about = "Mirror wiki pages into Neo4j and query them read-only")]
struct Cli {
    /// Config file prefix (default: pagegraph).
    #[arg(short, long, default_value = "pagegraph")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a query with the keyword classifier only.
    Check { query: String },

    #[command(flatten)]
    Graph(GraphCommand),
}

/// Commands that need configuration and a database connection.
#[derive(Subcommand)]
enum GraphCommand {
    /// Run a user query under the read-only role.
    Query { query: String },

    /// Synchronize a page from its JSON representation.
    Save {
        #[arg(long)]
        page: PathBuf,
    },

    /// Restore a previously deleted page.
    Undelete {
        #[arg(long)]
        page: PathBuf,
    },

    /// Remove a page and the subjects only it owns.
    Delete { page_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    match cli.command {
        // Pure classification needs neither config nor a database.
        Command::Check { query } => check(&query),
        Command::Graph(command) => run(&cli.config, command).await,
    }
}

fn check(query: &str) -> anyhow::Result<()> {
    match KeywordQueryClassifier::new().find_write_keyword(query) {
        None => {
            println!("read-only");
            Ok(())
        }
        Some(keyword) => anyhow::bail!("Query not allowed: contains {keyword}"),
    }
}

async fn run(config_prefix: &str, command: GraphCommand) -> anyhow::Result<()> {
    let config = AppConfig::load(config_prefix)?;
    let graph = GraphClient::connect(&config.neo4j).await?;

    match command {
        GraphCommand::Query { query } => {
            let mut gate = QueryGate::new(graph.clone());
            if config.query.explain_check {
                gate = gate.with_validator(Arc::new(ExplainQueryValidator::new(graph.clone())));
            }

            let rows = gate.run(&query).await?;
            for row in &rows {
                println!("{row:?}");
            }
            tracing::info!(rows = rows.len(), "Query complete");
        }
        GraphCommand::Save { page } => {
            let lifecycle = build_lifecycle(graph, &config)?;
            let report = lifecycle.on_page_saved(&load_page(&page)?).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        GraphCommand::Undelete { page } => {
            let lifecycle = build_lifecycle(graph, &config)?;
            let report = lifecycle.on_page_undeleted(&load_page(&page)?).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        GraphCommand::Delete { page_id } => {
            let lifecycle = build_lifecycle(graph, &config)?;
            let removed = lifecycle.on_page_deleted(&PageId::new(page_id)).await?;
            println!("{removed} subject(s) removed");
        }
    }

    Ok(())
}

/// Composition root for page synchronization.
fn build_lifecycle(
    graph: GraphClient,
    config: &AppConfig,
) -> anyhow::Result<PageLifecycle<GraphClient>> {
    let schemas = match &config.schemas.path {
        Some(path) => SchemaRegistry::from_json_file(path)?,
        None => {
            tracing::warn!("No schemas.path configured, every subject will be skipped");
            SchemaRegistry::new()
        }
    };

    let projector = NodePropertyProjector::new(
        Arc::new(ValueBuilderRegistry::with_defaults()),
        Arc::new(PropertyTypeRegistry::with_defaults()),
        Arc::new(schemas),
    );
    let synchronizer = GraphSynchronizer::new(graph, projector);
    Ok(PageLifecycle::new(Arc::new(synchronizer)))
}

fn load_page(path: &Path) -> anyhow::Result<Page> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid page JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_parses_without_graph_command() {
        let cli = Cli::try_parse_from(["pagegraph", "check", "MATCH (n) RETURN n"]).unwrap();
        assert!(matches!(cli.command, Command::Check { query } if query == "MATCH (n) RETURN n"));
    }

    #[test]
    fn test_graph_commands_stay_top_level() {
        let cli = Cli::try_parse_from(["pagegraph", "delete", "p1"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Graph(GraphCommand::Delete { page_id }) if page_id == "p1"
        ));

        let cli = Cli::try_parse_from(["pagegraph", "save", "--page", "page.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Graph(GraphCommand::Save { page }) if page == PathBuf::from("page.json")
        ));
    }

    #[test]
    fn test_check_rejects_write_query() {
        assert!(check("MATCH (n) RETURN n").is_ok());
        assert!(check("MATCH (n) DETACH DELETE n").is_err());
    }
}
