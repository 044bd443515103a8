//! Function chains
//!
//! A chain is the ordered list of library calls a node asks the backend to
//! run. It lives in the node's parameters under `functionChain`.

use openapi_client::models::{FunctionCall, Library};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::CanvasError;
use crate::models::workflow::Node;

/// Parameter key holding a node's chain
pub const FUNCTION_CHAIN_KEY: &str = "functionChain";

/// Ordered list of library calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionChain {
    calls: Vec<FunctionCall>,
}

impl FunctionChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call, builder style
    pub fn with(mut self, library: Library, function: &str, parameters: Map<String, Value>) -> Self {
        self.push(library, function, parameters);
        self
    }

    pub fn push(&mut self, library: Library, function: &str, parameters: Map<String, Value>) {
        self.calls.push(FunctionCall {
            library,
            function: function.to_string(),
            parameters,
        });
    }

    pub fn remove(&mut self, index: usize) -> Option<FunctionCall> {
        (index < self.calls.len()).then(|| self.calls.remove(index))
    }

    /// Move a call to a new position. Out-of-range indices are ignored.
    pub fn move_call(&mut self, from: usize, to: usize) {
        if from >= self.calls.len() || to >= self.calls.len() {
            return;
        }
        let call = self.calls.remove(from);
        self.calls.insert(to, call);
    }

    pub fn calls(&self) -> &[FunctionCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Libraries used by the chain, in first-use order
    pub fn libraries(&self) -> Vec<Library> {
        let mut libraries = Vec::new();
        for call in &self.calls {
            if !libraries.contains(&call.library) {
                libraries.push(call.library);
            }
        }
        libraries
    }

    /// Read the chain stored on a node. A node without one has an empty chain.
    pub fn from_node(node: &Node) -> Result<Self, CanvasError> {
        match node.parameters.get(FUNCTION_CHAIN_KEY) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(Self::new()),
        }
    }

    /// The chain as a node parameter value
    pub fn to_parameter(&self) -> Result<Value, CanvasError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn into_calls(self) -> Vec<FunctionCall> {
        self.calls
    }
}
