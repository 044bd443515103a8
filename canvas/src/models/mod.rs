//! Data models

pub mod library;
pub mod workflow;
