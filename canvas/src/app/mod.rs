//! Application wiring for the command line tool

pub mod options;
pub mod state;
