//! Wire models for the civic canvas execution API

pub mod models;
