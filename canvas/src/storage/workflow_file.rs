//! Workflow save and load
//!
//! Loading checks only the file's shape: valid JSON with the workflow
//! fields present. Graph rules are not re-checked.

use tracing::info;

use crate::errors::CanvasError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::workflow::Workflow;

/// Write a workflow as pretty-printed JSON
pub async fn save_workflow(file: &File, workflow: &Workflow) -> Result<(), CanvasError> {
    file.write_json(workflow).await?;
    info!(
        "Saved workflow '{}' ({} nodes, {} connections) to {}",
        workflow.name,
        workflow.nodes.len(),
        workflow.connections.len(),
        file.path().display()
    );
    Ok(())
}

/// Read a workflow file
pub async fn load_workflow(file: &File) -> Result<Workflow, CanvasError> {
    let contents = file.read_string().await?;
    parse_workflow(&contents)
}

/// Parse workflow JSON. Any shape problem is reported as `MalformedWorkflow`.
pub fn parse_workflow(contents: &str) -> Result<Workflow, CanvasError> {
    serde_json::from_str(contents).map_err(|e| CanvasError::MalformedWorkflow(e.to_string()))
}

/// Workflow files saved in a directory, sorted by file name
pub async fn list_workflows(dir: &Dir) -> Result<Vec<File>, CanvasError> {
    dir.list_files("json").await
}

/// File name for saving a workflow: its name, sanitized, with `.json`
pub fn workflow_file_name(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "workflow.json".to_string()
    } else {
        format!("{}.json", stem)
    }
}
