//! Redmine provider implementation for redmine-mcp-tools.
//!
//! This crate talks to the Redmine REST API (tickets, projects and wiki
//! pages) and implements [`redmine_core::IssueTracker`].

mod client;
mod types;

pub use client::RedmineClient;

/// Header carrying the Redmine API key.
pub const API_KEY_HEADER: &str = "X-Redmine-API-Key";
