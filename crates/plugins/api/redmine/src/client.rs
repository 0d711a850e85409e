//! Redmine API client implementation.

use async_trait::async_trait;
use redmine_core::{
    Error, IssueTracker, NewTicket, Project, Result, Ticket, WikiPage, WikiPageSummary,
};
use tracing::{debug, warn};

use crate::types::{
    CreateTicketRequest, ProjectsPage, TicketEnvelope, WikiIndex, WikiPageEnvelope,
};
use crate::API_KEY_HEADER;

/// Page size used when listing projects.
const PROJECTS_PAGE_SIZE: usize = 100;

/// Redmine API client.
pub struct RedmineClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RedmineClient {
    /// Create a new client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(url = %base_url, "Redmine client configured");
        Self {
            base_url,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build request with common headers.
    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");

        if self.api_key.is_empty() {
            builder
        } else {
            builder.header(API_KEY_HEADER, &self.api_key)
        }
    }

    /// Build an API URL from path segments. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid Redmine URL '{}': {}", self.base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Redmine URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Make an authenticated GET request with typed deserialization.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: reqwest::Url) -> Result<T> {
        debug!(url = %url, "Redmine GET request");

        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: reqwest::Url,
        body: &B,
    ) -> Result<T> {
        debug!(url = %url, "Redmine POST request");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(status = status_code, body = %message, "Redmine API error response");
            return Err(Error::from_status(status_code, message));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }
}

/// Pick the project matching `name`: exact name, then identifier, then
/// case-insensitive name.
fn find_project<'a>(projects: &'a [Project], name: &str) -> Option<&'a Project> {
    projects
        .iter()
        .find(|p| p.name == name)
        .or_else(|| projects.iter().find(|p| p.identifier == name))
        .or_else(|| projects.iter().find(|p| p.name.eq_ignore_ascii_case(name)))
}

#[async_trait]
impl IssueTracker for RedmineClient {
    async fn get_ticket(&self, id: &str) -> Result<Ticket> {
        let file = format!("{}.json", id);
        let url = self.endpoint(&["issues", &file])?;
        let envelope: TicketEnvelope = self.get(url).await?;
        Ok(envelope.issue)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        let mut offset = 0;

        loop {
            let mut url = self.endpoint(&["projects.json"])?;
            url.query_pairs_mut()
                .append_pair("limit", &PROJECTS_PAGE_SIZE.to_string())
                .append_pair("offset", &offset.to_string());

            let page: ProjectsPage = self.get(url).await?;
            let fetched = page.projects.len();
            projects.extend(page.projects);
            offset += fetched;

            let total = page.total_count.unwrap_or(offset);
            if fetched == 0 || offset >= total {
                break;
            }
        }

        debug!(count = projects.len(), "Fetched projects");
        Ok(projects)
    }

    async fn project_id_by_name(&self, name: &str) -> Result<String> {
        let projects = self.list_projects().await?;
        find_project(&projects, name)
            .map(|p| p.id.to_string())
            .ok_or_else(|| Error::NotFound(format!("No project found matching name '{}'", name)))
    }

    async fn create_ticket(&self, input: NewTicket) -> Result<Ticket> {
        let url = self.endpoint(&["issues.json"])?;
        let envelope: TicketEnvelope = self
            .post(url, &CreateTicketRequest { issue: &input })
            .await?;
        Ok(envelope.issue)
    }

    async fn list_wiki_pages(&self, project_id: &str) -> Result<Vec<WikiPageSummary>> {
        let url = self.endpoint(&["projects", project_id, "wiki", "index.json"])?;
        let index: WikiIndex = self.get(url).await?;
        Ok(index.wiki_pages)
    }

    async fn get_wiki_page(&self, project_id: &str, page_name: &str) -> Result<WikiPage> {
        let file = format!("{}.json", page_name);
        let url = self.endpoint(&["projects", project_id, "wiki", &file])?;
        let envelope: WikiPageEnvelope = self.get(url).await?;
        Ok(envelope.wiki_page)
    }
}
