//! Civic Canvas Library
//!
//! Workflow graph store, connection validation and the client side of
//! remote data-science execution for the civic data trust canvas.

pub mod app;
pub mod errors;
pub mod exec;
pub mod filesys;
pub mod graph;
pub mod http;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;
