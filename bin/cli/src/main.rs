//! Command-line tool for pathway workflows.

mod backend;
mod config;

use crate::backend::DirectoryBackend;
use crate::config::CliConfig;
use clap::{Parser, Subcommand};
use pathway_core::WorkflowId;
use pathway_workflow::{
    EditorConfig, GraphStore, NodeConfig, PersistenceAdapter, PersistenceError, ValidationStatus,
    Workflow, catalog, validation,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pathway - create and inspect website automation workflows
#[derive(Parser)]
#[command(name = "pathway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding workflow files (overrides PATHWAY__STORE_DIR)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create and save a fresh workflow
    New {
        /// Workflow name
        name: String,

        /// URL pattern for the starting trigger
        #[arg(long, default_value = "*")]
        url_pattern: String,
    },

    /// Validate a stored workflow
    Check {
        /// Workflow ID
        id: WorkflowId,
    },

    /// Print a stored workflow's nodes and edges
    Show {
        /// Workflow ID
        id: WorkflowId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let (cli_config, editor_config) = match (CliConfig::from_env(), EditorConfig::from_env()) {
        (Ok(cli_config), Ok(editor_config)) => (cli_config, editor_config),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let store_dir = cli.store_dir.unwrap_or(cli_config.store_dir);
    tracing::debug!(store_dir = %store_dir.display(), "Loaded configuration");

    let backend = DirectoryBackend::new(store_dir);
    let adapter = PersistenceAdapter::new(backend);

    let result = match cli.command {
        Command::New { name, url_pattern } => {
            create(&adapter, &editor_config, name, url_pattern).await
        }
        Command::Check { id } => check(&adapter, id).await,
        Command::Show { id } => show(&adapter, id).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(report) => {
            eprintln!("error: {report}");
            if let PersistenceError::ValidationFailed { findings } = report.current_context() {
                for finding in findings {
                    eprintln!("  {finding}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn create(
    adapter: &PersistenceAdapter<DirectoryBackend>,
    editor_config: &EditorConfig,
    name: String,
    url_pattern: String,
) -> pathway_core::Result<bool, PersistenceError> {
    let mut store = GraphStore::new_workflow(name, editor_config);

    let trigger = store
        .workflow()
        .graph()
        .nodes()
        .next()
        .map(|node| (node.id, node.node_type));
    if let Some((trigger_id, trigger_type)) = trigger {
        let takes_url = catalog::spec_for(trigger_type)
            .fields
            .iter()
            .any(|field| field.name == "url-pattern");
        if takes_url {
            let mut config = NodeConfig::new();
            config.insert("url-pattern".to_string(), url_pattern.into());
            if let Err(report) = store.update_node_config(trigger_id, config) {
                tracing::warn!(error = %report, "Could not configure the starting trigger");
            }
        }
    }

    let version = adapter.save(&mut store).await?;
    println!("{} (version {version})", store.workflow_id());
    Ok(true)
}

async fn check(
    adapter: &PersistenceAdapter<DirectoryBackend>,
    id: WorkflowId,
) -> pathway_core::Result<bool, PersistenceError> {
    let workflow = adapter.load(id).await?;
    let findings = validation::validate_graph(&workflow);

    for finding in &findings {
        println!("{finding}");
    }
    if findings.is_empty() {
        println!("{}: ok", workflow.name());
    }
    Ok(!validation::has_errors(&findings))
}

async fn show(
    adapter: &PersistenceAdapter<DirectoryBackend>,
    id: WorkflowId,
) -> pathway_core::Result<bool, PersistenceError> {
    let workflow = adapter.load(id).await?;
    let saved_at = adapter
        .backend()
        .saved_at(id)
        .await
        .map_err(|report| report.context(PersistenceError::Transport { workflow_id: id }))?;

    print!("{}", render(&workflow));
    if let Some(saved_at) = saved_at {
        println!("saved at {}", saved_at.to_rfc3339());
    }
    Ok(true)
}

fn render(workflow: &Workflow) -> String {
    let graph = workflow.graph();
    let mut out = format!(
        "{} ({})\nversion {}, {}\n",
        workflow.name(),
        workflow.id(),
        workflow.version(),
        if workflow.is_enabled() { "enabled" } else { "disabled" },
    );

    out.push_str(&format!("nodes ({}):\n", graph.node_count()));
    for node in graph.nodes() {
        let status = match node.status() {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid(_) => "invalid",
        };
        out.push_str(&format!(
            "  {} {} at ({}, {}) [{status}]\n",
            node.id, node.node_type, node.position.x, node.position.y,
        ));
    }

    out.push_str(&format!("edges ({}):\n", graph.edge_count()));
    for edge in graph.edges() {
        match &edge.label {
            Some(label) => out.push_str(&format!("  {} -> {} [{label}]\n", edge.from, edge.to)),
            None => out.push_str(&format!("  {} -> {}\n", edge.from, edge.to)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_workflow_can_be_checked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let adapter = PersistenceAdapter::new(DirectoryBackend::new(dir.path()));
        let config = EditorConfig::default();

        let created = create(&adapter, &config, "Landing".to_string(), "/landing".to_string())
            .await
            .expect("create");
        assert!(created);

        let entry = std::fs::read_dir(dir.path())
            .expect("read dir")
            .next()
            .expect("one file")
            .expect("entry");
        let file_name = entry.file_name();
        let id: WorkflowId = file_name
            .to_str()
            .and_then(|name| name.strip_suffix(".json"))
            .expect("json file")
            .parse()
            .expect("workflow id");

        assert!(check(&adapter, id).await.expect("check"));

        let workflow = adapter.load(id).await.expect("load");
        let rendered = render(&workflow);
        assert!(rendered.starts_with("Landing ("));
        assert!(rendered.contains("page-visit"));
        assert!(rendered.contains("nodes (1):"));
        assert!(rendered.contains("edges (0):"));
    }

    #[tokio::test]
    async fn checking_missing_workflow_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let adapter = PersistenceAdapter::new(DirectoryBackend::new(dir.path()));
        let id = WorkflowId::new();

        let report = check(&adapter, id).await.expect_err("missing");
        assert_eq!(
            report.current_context(),
            &PersistenceError::NotFound { workflow_id: id }
        );
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["pathway", "new", "Promo", "--url-pattern", "/promo"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Command::New { ref name, ref url_pattern } if name == "Promo" && url_pattern == "/promo"
        ));

        let id = WorkflowId::new();
        let cli = Cli::try_parse_from(["pathway", "--store-dir", "/tmp/wf", "show", &id.to_string()])
            .expect("parse");
        assert_eq!(cli.store_dir, Some(PathBuf::from("/tmp/wf")));
        assert!(matches!(cli.command, Command::Show { id: parsed } if parsed == id));
    }
}
