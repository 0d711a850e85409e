//! Redmine domain types shared by the client and the MCP server.
//!
//! Field names follow the Redmine REST API so the client can deserialize
//! responses directly. Everything Redmine may omit is optional.

use serde::{Deserialize, Serialize};

/// Reference to another Redmine entity (`{"id": 1, "name": "Bug"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// Redmine issue ("ticket").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_ratio: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
}

/// Redmine project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
}

/// Parent reference of a wiki page (`{"title": "Index"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiParent {
    pub title: String,
}

/// Entry of a project's wiki index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WikiPageSummary {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<WikiParent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
}

/// Full wiki page with its text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WikiPage {
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
}

/// Input for creating a ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub project_id: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u64>,
}
