//! Remote execution: function chains, the orchestrator, transforms, uploads
//! and downloads

pub mod chain;
pub mod files;
pub mod orchestrator;
pub mod transform;
