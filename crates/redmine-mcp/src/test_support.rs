//! Shared test fixtures.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use redmine_core::{IssueTracker, NewTicket, Project, Result, Ticket, WikiPage, WikiPageSummary};

use crate::server::Dispatcher;
use crate::tools::ToolRegistry;

mock! {
    pub Tracker {}

    #[async_trait]
    impl IssueTracker for Tracker {
        async fn get_ticket(&self, id: &str) -> Result<Ticket>;
        async fn list_projects(&self) -> Result<Vec<Project>>;
        async fn project_id_by_name(&self, name: &str) -> Result<String>;
        async fn create_ticket(&self, input: NewTicket) -> Result<Ticket>;
        async fn list_wiki_pages(&self, project_id: &str) -> Result<Vec<WikiPageSummary>>;
        async fn get_wiki_page(&self, project_id: &str, page_name: &str) -> Result<WikiPage>;
    }
}

/// Dispatcher over the default catalogue and the given mock.
pub fn dispatcher(tracker: MockTracker) -> Dispatcher {
    Dispatcher::new(Arc::new(ToolRegistry::new()), Arc::new(tracker))
}
