//! Workflow graph: the in-memory store and its connection rules

pub mod store;
pub mod validation;

use std::collections::BTreeMap;

use crate::models::workflow::Node;

/// Nodes keyed by id
pub type NodeMap = BTreeMap<String, Node>;
