//! Issue tracker trait consumed by the MCP tool handlers.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{NewTicket, Project, Ticket, WikiPage, WikiPageSummary};

/// External issue tracker (Redmine).
///
/// Implementations hold only immutable configuration, so a single instance
/// is shared across concurrent calls. No call is retried.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetch a single ticket by id.
    async fn get_ticket(&self, id: &str) -> Result<Ticket>;

    /// List all visible projects.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Resolve a project name to its id.
    async fn project_id_by_name(&self, name: &str) -> Result<String>;

    /// Create a ticket and return it as stored.
    async fn create_ticket(&self, input: NewTicket) -> Result<Ticket>;

    /// List the wiki index of a project.
    async fn list_wiki_pages(&self, project_id: &str) -> Result<Vec<WikiPageSummary>>;

    /// Fetch a single wiki page of a project.
    async fn get_wiki_page(&self, project_id: &str, page_name: &str) -> Result<WikiPage>;
}
