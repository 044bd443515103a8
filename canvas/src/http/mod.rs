//! Backend API client

pub mod client;
pub mod data;
pub mod execution;
pub mod notebook;
pub mod transform;
