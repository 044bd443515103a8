//! Civic Canvas - Entry Point
//!
//! Command line front end for civic data trust workflows: validate workflow
//! files, upload CSVs and run analysis nodes against the execution backend.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use tracing::{error, info};

use civic_canvas::app::options::AppOptions;
use civic_canvas::app::state::AppState;
use civic_canvas::errors::CanvasError;
use civic_canvas::exec::chain::FunctionChain;
use civic_canvas::exec::files::{download_results, upload_csv};
use civic_canvas::exec::orchestrator::{ExecutionOutcome, ExecutionStatus};
use civic_canvas::exec::transform::run_transform;
use civic_canvas::filesys::file::File;
use civic_canvas::graph::store::GraphStore;
use civic_canvas::http::execution::DownloadQuery;
use civic_canvas::logs::{init_logging, LogOptions};
use civic_canvas::models::library::is_analysis_type;
use civic_canvas::storage::layout::StorageLayout;
use civic_canvas::storage::settings::Settings;
use civic_canvas::storage::workflow_file::{list_workflows, load_workflow};
use civic_canvas::utils::version_info;

const USAGE: &str = "\
Usage: civic-canvas [OPTION]

  --version                                 Print version information
  --validate=<workflow.json>                Check a workflow's connections
  --execute=<workflow.json> --node=<id>     Run one node; results are saved into the file
        [--chain=<chain.json>]              Use this function chain instead of the node's
  --execute=<workflow.json> --all           Run every analysis node
  --transform=<workflow.json> --node=<id>   Run a merge or split node; outputs are saved into the file
  --workflows                               List saved workflows
  --upload=<file.csv>                       Upload a CSV and keep it as the fallback input
  --notebook=<start|stop|status|check-files|cleanup>
  --download=<execution_id> --node=<id>     Download execution results
        [--filename=<name>] [--format=csv]";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    if cli_args.is_empty() || cli_args.contains_key("help") {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let layout = StorageLayout::default();
    let settings = match Settings::load(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let options = AppOptions::from_settings(&settings, layout);
    let state = match AppState::init(options).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match dispatch(&state, &cli_args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(state: &AppState, cli_args: &HashMap<String, String>) -> Result<(), CanvasError> {
    if let Some(path) = cli_args.get("validate") {
        return validate(path).await;
    }
    if let Some(path) = cli_args.get("execute") {
        return execute(state, path, cli_args).await;
    }
    if let Some(path) = cli_args.get("transform") {
        return transform(state, path, cli_args).await;
    }
    if cli_args.contains_key("workflows") {
        return workflows(state).await;
    }
    if let Some(path) = cli_args.get("upload") {
        return upload(state, path).await;
    }
    if let Some(action) = cli_args.get("notebook") {
        return notebook(state, action).await;
    }
    if let Some(execution_id) = cli_args.get("download") {
        return download(state, execution_id, cli_args).await;
    }

    println!("{}", USAGE);
    Err(CanvasError::ConfigError("no command given".to_string()))
}

async fn validate(path: &str) -> Result<(), CanvasError> {
    let workflow = load_workflow(&File::new(path)).await?;
    let mut store = GraphStore::default();
    store.load_workflow(workflow);

    let report = store.validate();
    if report.is_healthy() {
        println!(
            "{} '{}': {} nodes, {} connections",
            "ok".green().bold(),
            store.name(),
            store.nodes().len(),
            store.connections().len()
        );
        return Ok(());
    }

    for issue in &report.issues {
        println!("{} {}: {}", "invalid".red().bold(), issue.subject_id, issue.message);
    }
    Err(CanvasError::InvalidConnection(format!(
        "{} issue(s) found",
        report.issues.len()
    )))
}

async fn execute(
    state: &AppState,
    path: &str,
    cli_args: &HashMap<String, String>,
) -> Result<(), CanvasError> {
    let file = File::new(path);
    state.open_workflow(&file).await?;

    if cli_args.contains_key("all") {
        let node_ids: Vec<String> = state
            .store
            .read()
            .await
            .nodes()
            .values()
            .filter(|n| is_analysis_type(&n.node_type))
            .map(|n| n.id.clone())
            .collect();
        info!("Executing {} analysis node(s)", node_ids.len());

        let results = state.orchestrator.execute_many(&node_ids).await;
        let mut failures = 0;
        for (node_id, result) in results {
            match result {
                Ok(outcome) => print_outcome(&outcome),
                Err(e) => {
                    failures += 1;
                    println!("{} {}: {}", "failed".red().bold(), node_id, e);
                }
            }
        }
        state.save_workflow(&file).await?;
        if failures > 0 {
            return Err(CanvasError::ExecutionFailed(format!(
                "{} node(s) failed",
                failures
            )));
        }
        return Ok(());
    }

    let node_id = cli_args
        .get("node")
        .ok_or_else(|| CanvasError::ConfigError("--node=<id> is required".to_string()))?;
    let chain = match cli_args.get("chain") {
        Some(chain_path) => Some(read_chain(chain_path).await?),
        None => None,
    };

    let outcome = state.orchestrator.execute(node_id, chain).await?;
    print_outcome(&outcome);
    state.save_workflow(&file).await
}

async fn read_chain(path: &str) -> Result<FunctionChain, CanvasError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading function chain {}", path))?;
    let chain = serde_json::from_str(&contents)
        .with_context(|| format!("parsing function chain {}", path))?;
    Ok(chain)
}

fn print_outcome(outcome: &ExecutionOutcome) {
    let label = match outcome.status {
        ExecutionStatus::Success => "done".green().bold(),
        ExecutionStatus::PartialSuccess { .. } => "partial".yellow().bold(),
    };
    println!(
        "{} {}: {} ({} plots, {} tables)",
        label, outcome.node_id, outcome.message, outcome.plot_count, outcome.table_count
    );
    if let Some(url) = &outcome.download_url {
        println!("     download: {}", url);
    }
}

async fn transform(
    state: &AppState,
    path: &str,
    cli_args: &HashMap<String, String>,
) -> Result<(), CanvasError> {
    let node_id = cli_args
        .get("node")
        .ok_or_else(|| CanvasError::ConfigError("--node=<id> is required".to_string()))?;
    let file = File::new(path);
    state.open_workflow(&file).await?;

    let response = run_transform(&state.http_client, &state.store, node_id).await?;
    println!(
        "{} {}: {} output(s){}",
        "done".green().bold(),
        node_id,
        response.outputs.len(),
        response
            .message
            .map(|m| format!(" ({})", m))
            .unwrap_or_default()
    );
    state.save_workflow(&file).await
}

async fn workflows(state: &AppState) -> Result<(), CanvasError> {
    let dir = state.layout.workflows_dir();
    let files = list_workflows(&dir).await?;
    if files.is_empty() {
        println!("no saved workflows in {}", dir.path().display());
    }
    for file in files {
        match load_workflow(&file).await {
            Ok(workflow) => println!(
                "{}  '{}' ({} nodes, saved {})",
                file.path().display(),
                workflow.name,
                workflow.nodes.len(),
                workflow.timestamp.format("%Y-%m-%d %H:%M")
            ),
            Err(e) => println!("{}  {} {}", file.path().display(), "unreadable:".red(), e),
        }
    }
    Ok(())
}

async fn upload(state: &AppState, path: &str) -> Result<(), CanvasError> {
    let content = File::new(path).read_string().await?;
    let filename = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("data.csv");

    let response = upload_csv(&state.http_client, &state.local_storage, &content, filename).await?;
    println!(
        "{} {}: {} rows x {} columns",
        "uploaded".green().bold(),
        filename,
        response.shape.0,
        response.shape.1
    );
    println!("     columns: {}", response.columns.join(", "));
    Ok(())
}

async fn notebook(state: &AppState, action: &str) -> Result<(), CanvasError> {
    let client = &state.http_client;
    let output = match action {
        "start" => serde_json::to_string_pretty(&client.start_notebook().await?)?,
        "stop" => serde_json::to_string_pretty(&client.stop_notebook().await?)?,
        "status" => serde_json::to_string_pretty(&client.notebook_status().await?)?,
        "check-files" => serde_json::to_string_pretty(&client.check_notebook_files().await?)?,
        "cleanup" => serde_json::to_string_pretty(&client.cleanup_notebook().await?)?,
        other => {
            return Err(CanvasError::ConfigError(format!(
                "unknown notebook action '{}'",
                other
            )))
        }
    };
    println!("{}", output);
    Ok(())
}

async fn download(
    state: &AppState,
    execution_id: &str,
    cli_args: &HashMap<String, String>,
) -> Result<(), CanvasError> {
    let node_id = cli_args
        .get("node")
        .ok_or_else(|| CanvasError::ConfigError("--node=<id> is required".to_string()))?;
    let format = cli_args.get("format").cloned().unwrap_or_else(|| "csv".to_string());
    let filename = cli_args
        .get("filename")
        .cloned()
        .unwrap_or_else(|| format!("{}-results.{}", node_id, format));

    let query = DownloadQuery {
        execution_id: execution_id.to_string(),
        filename,
        format,
        node_id: node_id.clone(),
    };
    let file = download_results(&state.http_client, &state.layout.downloads_dir(), &query).await?;
    println!("{} {}", "saved".green().bold(), file.path().display());
    Ok(())
}
