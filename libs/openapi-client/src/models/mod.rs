//! API models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Data-science library a chained function belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    Pandas,
    Numpy,
    Matplotlib,
}

impl Library {
    pub fn as_str(&self) -> &'static str {
        match self {
            Library::Pandas => "pandas",
            Library::Numpy => "numpy",
            Library::Matplotlib => "matplotlib",
        }
    }
}

/// One step of a function chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub library: Library,
    pub function: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Input data attached to an execution request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    pub csv_content: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Execution request for `POST /eda-execute/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub node_id: String,
    pub workflow_type: String,
    pub function_chain: Vec<FunctionCall>,
    pub input_data: InputData,
    pub generate_download_link: bool,
    pub colab_optimized: bool,
}

/// Results of one library's chain. A chain counts as successful unless the
/// backend says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryResults {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plots: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl Default for LibraryResults {
    fn default() -> Self {
        Self {
            success: true,
            error: None,
            results: Vec::new(),
            plots: Vec::new(),
            tables: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Execution response from `POST /eda-execute/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pandas_results: Option<LibraryResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numpy_results: Option<LibraryResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matplotlib_results: Option<LibraryResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutionResponse {
    /// Library results present in the response, in chain order
    pub fn library_results(&self) -> Vec<(Library, &LibraryResults)> {
        [
            (Library::Pandas, self.pandas_results.as_ref()),
            (Library::Numpy, self.numpy_results.as_ref()),
            (Library::Matplotlib, self.matplotlib_results.as_ref()),
        ]
        .into_iter()
        .filter_map(|(library, results)| results.map(|r| (library, r)))
        .collect()
    }
}

/// CSV upload request for `POST /data/upload-csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadCsvRequest {
    pub csv_content: String,
    pub filename: String,
}

/// CSV upload response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadCsvResponse {
    /// (rows, columns)
    pub shape: (u64, u64),
    pub columns: Vec<String>,
    #[serde(default)]
    pub summary: Value,
}

/// Notebook server status, returned by every `/notebook/*` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /notebook/check-files`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookFiles {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request for `POST /transform/merge` and `POST /transform/split`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub node_id: String,
    /// CSV contents, one per input port in port order
    pub inputs: Vec<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Transform response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformResponse {
    pub success: bool,
    /// CSV contents, one per output port in port order
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
