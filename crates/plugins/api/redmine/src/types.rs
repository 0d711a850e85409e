//! Redmine API response and request envelopes.
//!
//! Redmine wraps every payload in a single-key object (`{"issue": {...}}`).
//! These types strip that wrapper; the payloads themselves are the unified
//! types from `redmine-core`.

use redmine_core::{NewTicket, Project, Ticket, WikiPage, WikiPageSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TicketEnvelope {
    pub issue: Ticket,
}

#[derive(Debug, Serialize)]
pub struct CreateTicketRequest<'a> {
    pub issue: &'a NewTicket,
}

#[derive(Debug, Deserialize)]
pub struct ProjectsPage {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct WikiIndex {
    #[serde(default)]
    pub wiki_pages: Vec<WikiPageSummary>,
}

#[derive(Debug, Deserialize)]
pub struct WikiPageEnvelope {
    pub wiki_page: WikiPage,
}
