//! On-disk state

pub mod layout;
pub mod local;
pub mod settings;
pub mod workflow_file;
