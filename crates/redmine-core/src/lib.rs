//! Core traits, types, and error handling for redmine-mcp-tools.
//!
//! This crate provides the foundational abstractions shared by the Redmine
//! client, the MCP server and the CLI.

pub mod config;
pub mod error;
pub mod tracker;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use tracker::IssueTracker;
pub use types::*;
