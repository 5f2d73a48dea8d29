//! CLI command implementations.

pub mod analyze;
pub mod common;
pub mod config;
