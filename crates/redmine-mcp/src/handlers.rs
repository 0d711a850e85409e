//! Tool handlers for MCP server.
//!
//! A `tools/call` runs in two phases. [`ToolCall::parse`] checks every
//! required argument and builds a typed call; only then does
//! [`ToolHandler::execute`] talk to the issue tracker.

use std::sync::Arc;

use redmine_core::{IssueTracker, NewTicket};
use serde_json::{Map, Value};

use crate::error::DispatchError;
use crate::format;
use crate::protocol::ToolCallResult;
use crate::tools::ToolKind;

const TICKET_ID_MISSING: &str = "ticket id not specified";
const SUBJECT_MISSING: &str = "subject (title) not specified";
const PROJECT_MISSING: &str = "project_id or project_name is required";
const WIKI_PAGE_MISSING: &str = "wiki page name not specified";

/// Arguments of a `tools/call` request.
///
/// Keys are snake_case; the camelCase spelling is accepted as an alias.
#[derive(Debug, Clone, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Take `arguments` from the call params. Absent or null means empty.
    pub fn from_params(params: &Map<String, Value>) -> Result<Self, DispatchError> {
        match params.get("arguments") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(arguments)) => Ok(Self(arguments.clone())),
            Some(_) => Err(DispatchError::invalid_params("arguments must be an object")),
        }
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        self.0
            .get(key)
            .or_else(|| self.0.get(&camel_case(key)))
            .filter(|value| !value.is_null())
    }

    /// Non-empty string value. Numbers are rendered as decimal strings.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Optional numeric id given as a number or a numeric string.
    pub fn id(&self, key: &str) -> Result<Option<u64>, DispatchError> {
        let Some(value) = self.lookup(key) else {
            return Ok(None);
        };

        let id = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };

        id.map(Some).ok_or_else(|| {
            DispatchError::invalid_params(format!("{} must be a positive integer", key))
        })
    }

    fn require(&self, key: &str, missing: &str) -> Result<String, DispatchError> {
        self.text(key)
            .ok_or_else(|| DispatchError::invalid_params(missing))
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// `ticket_id` -> `ticketId`
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Project addressed either directly or by display name.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectRef {
    Id(String),
    Name(String),
}

impl ProjectRef {
    fn from_arguments(args: &Arguments) -> Result<Self, DispatchError> {
        if let Some(id) = args.text("project_id") {
            return Ok(ProjectRef::Id(id));
        }
        if let Some(name) = args.text("project_name") {
            return Ok(ProjectRef::Name(name));
        }
        Err(DispatchError::invalid_params(PROJECT_MISSING))
    }
}

/// A tool call whose required arguments are all present.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    GetTicket {
        ticket_id: String,
    },
    ListProjects,
    CreateTicket {
        project: ProjectRef,
        subject: String,
        description: Option<String>,
        tracker_id: Option<u64>,
        priority_id: Option<u64>,
        assigned_to_id: Option<u64>,
    },
    GetWikiPages {
        project: ProjectRef,
    },
    GetWikiPage {
        project: ProjectRef,
        page_name: String,
    },
}

impl ToolCall {
    /// Check arguments in order and stop at the first missing one.
    pub fn parse(kind: ToolKind, args: &Arguments) -> Result<Self, DispatchError> {
        match kind {
            ToolKind::GetTicket => Ok(ToolCall::GetTicket {
                ticket_id: args.require("ticket_id", TICKET_ID_MISSING)?,
            }),
            ToolKind::ListProjects => Ok(ToolCall::ListProjects),
            ToolKind::CreateTicket => {
                let subject = args.require("subject", SUBJECT_MISSING)?;
                let project = ProjectRef::from_arguments(args)?;
                Ok(ToolCall::CreateTicket {
                    project,
                    subject,
                    description: args.text("description"),
                    tracker_id: args.id("tracker_id")?,
                    priority_id: args.id("priority_id")?,
                    assigned_to_id: args.id("assigned_to_id")?,
                })
            }
            ToolKind::GetWikiPages => Ok(ToolCall::GetWikiPages {
                project: ProjectRef::from_arguments(args)?,
            }),
            ToolKind::GetWikiPage => {
                let page_name = args.require("wiki_page_name", WIKI_PAGE_MISSING)?;
                let project = ProjectRef::from_arguments(args)?;
                Ok(ToolCall::GetWikiPage { project, page_name })
            }
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::GetTicket { .. } => ToolKind::GetTicket,
            ToolCall::ListProjects => ToolKind::ListProjects,
            ToolCall::CreateTicket { .. } => ToolKind::CreateTicket,
            ToolCall::GetWikiPages { .. } => ToolKind::GetWikiPages,
            ToolCall::GetWikiPage { .. } => ToolKind::GetWikiPage,
        }
    }
}

/// Tool handler that executes tools against the issue tracker.
#[derive(Clone)]
pub struct ToolHandler {
    tracker: Arc<dyn IssueTracker>,
}

impl ToolHandler {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    /// Execute a validated call.
    pub async fn execute(&self, call: ToolCall) -> Result<ToolCallResult, DispatchError> {
        let text = match call {
            ToolCall::GetTicket { ticket_id } => {
                let ticket = self.tracker.get_ticket(&ticket_id).await?;
                format::ticket_to_markdown(&ticket)
            }
            ToolCall::ListProjects => {
                let projects = self.tracker.list_projects().await?;
                tracing::debug!(count = projects.len(), "Listed projects");
                format::projects_to_markdown(&projects)
            }
            ToolCall::CreateTicket {
                project,
                subject,
                description,
                tracker_id,
                priority_id,
                assigned_to_id,
            } => {
                let project_id = self.resolve_project(project).await?;
                let ticket = self
                    .tracker
                    .create_ticket(NewTicket {
                        project_id,
                        subject,
                        description,
                        tracker_id,
                        priority_id,
                        assigned_to_id,
                    })
                    .await?;
                tracing::info!(ticket_id = ticket.id, "Created ticket");
                format::created_ticket_to_markdown(&ticket)
            }
            ToolCall::GetWikiPages { project } => {
                let project_id = self.resolve_project(project).await?;
                let pages = self.tracker.list_wiki_pages(&project_id).await?;
                format::wiki_pages_to_markdown(&project_id, &pages)
            }
            ToolCall::GetWikiPage { project, page_name } => {
                let project_id = self.resolve_project(project).await?;
                let page = self.tracker.get_wiki_page(&project_id, &page_name).await?;
                format::wiki_page_to_markdown(&project_id, &page)
            }
        };

        Ok(ToolCallResult::text(text))
    }

    async fn resolve_project(&self, project: ProjectRef) -> Result<String, DispatchError> {
        match project {
            ProjectRef::Id(id) => Ok(id),
            ProjectRef::Name(name) => {
                let id = self.tracker.project_id_by_name(&name).await?;
                tracing::debug!(project_name = %name, project_id = %id, "Resolved project");
                Ok(id)
            }
        }
    }
}
