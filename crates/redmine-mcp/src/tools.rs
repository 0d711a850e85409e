//! MCP tool definitions.
//!
//! The catalogue is fixed at build time. [`ToolKind`] is the closed set the
//! dispatcher routes on; [`ToolRegistry`] is the ordered list served by
//! `tools/list`.

use serde_json::{json, Value};

use crate::protocol::ToolDefinition;

/// Tools the server can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GetTicket,
    ListProjects,
    CreateTicket,
    GetWikiPages,
    GetWikiPage,
}

impl ToolKind {
    /// Catalogue order.
    pub const ALL: [ToolKind; 5] = [
        ToolKind::GetTicket,
        ToolKind::ListProjects,
        ToolKind::CreateTicket,
        ToolKind::GetWikiPages,
        ToolKind::GetWikiPage,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ToolKind::GetTicket => "get_redmine_ticket",
            ToolKind::ListProjects => "list_redmine_projects",
            ToolKind::CreateTicket => "create_redmine_ticket",
            ToolKind::GetWikiPages => "get_redmine_wiki_pages",
            ToolKind::GetWikiPage => "get_redmine_wiki_page",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            ToolKind::GetTicket => "Get a Redmine ticket by its id",
            ToolKind::ListProjects => "List all Redmine projects visible to the API key",
            ToolKind::CreateTicket => {
                "Create a Redmine ticket in a project given by id or by name"
            }
            ToolKind::GetWikiPages => "List the wiki pages of a Redmine project",
            ToolKind::GetWikiPage => "Get the content of a Redmine wiki page",
        }
    }

    fn input_schema(self) -> Value {
        match self {
            ToolKind::GetTicket => json!({
                "type": "object",
                "properties": {
                    "ticket_id": {
                        "type": "string",
                        "description": "Ticket id, e.g. \"123\""
                    }
                },
                "required": ["ticket_id"]
            }),
            ToolKind::ListProjects => json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            ToolKind::CreateTicket => json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "project_name": project_name_property(),
                    "subject": {
                        "type": "string",
                        "description": "Ticket title"
                    },
                    "description": {
                        "type": "string",
                        "description": "Ticket body"
                    },
                    "tracker_id": {
                        "type": "integer",
                        "description": "Tracker id (bug, feature, ...)"
                    },
                    "priority_id": {
                        "type": "integer",
                        "description": "Priority id"
                    },
                    "assigned_to_id": {
                        "type": "integer",
                        "description": "Id of the user the ticket is assigned to"
                    }
                },
                "required": ["subject"],
                "anyOf": project_any_of()
            }),
            ToolKind::GetWikiPages => json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "project_name": project_name_property()
                },
                "required": [],
                "anyOf": project_any_of()
            }),
            ToolKind::GetWikiPage => json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_property(),
                    "project_name": project_name_property(),
                    "wiki_page_name": {
                        "type": "string",
                        "description": "Wiki page title, e.g. \"HomePage\""
                    }
                },
                "required": ["wiki_page_name"],
                "anyOf": project_any_of()
            }),
        }
    }

    /// Definition served by `tools/list`.
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

fn project_id_property() -> Value {
    json!({
        "type": "string",
        "description": "Project id or identifier"
    })
}

fn project_name_property() -> Value {
    json!({
        "type": "string",
        "description": "Project name, resolved to an id before the call"
    })
}

fn project_any_of() -> Value {
    json!([
        { "required": ["project_id"] },
        { "required": ["project_name"] }
    ])
}

/// Immutable, ordered tool catalogue.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: ToolKind::ALL.into_iter().map(ToolKind::definition).collect(),
        }
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Map a registered name onto its executable kind.
    pub fn resolve(&self, name: &str) -> Option<ToolKind> {
        self.get(name).and_then(|tool| ToolKind::from_name(&tool.name))
    }

    /// Unconditionally required argument names from a tool's schema.
    pub fn required_arguments(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(|tool| tool.input_schema.get("required"))
            .and_then(Value::as_array)
            .map(|required| {
                required
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_order() {
        let registry = ToolRegistry::new();
        let names: Vec<&str> = registry.tools().iter().map(|t| t.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "get_redmine_ticket",
                "list_redmine_projects",
                "create_redmine_ticket",
                "get_redmine_wiki_pages",
                "get_redmine_wiki_page",
            ]
        );
    }

    #[test]
    fn test_names_are_unique() {
        let registry = ToolRegistry::new();
        let unique: HashSet<&str> = registry.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(unique.len(), registry.tools().len());
    }

    #[test]
    fn test_registry_and_kinds_in_lockstep() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.tools().len(), ToolKind::ALL.len());

        for kind in ToolKind::ALL {
            assert_eq!(registry.resolve(kind.name()), Some(kind));
        }
        assert_eq!(registry.resolve("unknown_tool"), None);
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in ToolRegistry::new().tools() {
            let schema = &tool.input_schema;
            assert_eq!(schema["type"], "object", "{}", tool.name);
            assert!(schema["properties"].is_object(), "{}", tool.name);
            assert!(schema["required"].is_array(), "{}", tool.name);
            assert!(!tool.description.is_empty());

            for name in ToolRegistry::new().required_arguments(&tool.name) {
                assert!(
                    schema["properties"].get(&name).is_some(),
                    "{} requires undeclared {}",
                    tool.name,
                    name
                );
            }
        }
    }

    #[test]
    fn test_definition_serializes_input_schema_camel_case() {
        let json = serde_json::to_value(ToolKind::GetTicket.definition()).unwrap();
        assert!(json.get("inputSchema").is_some());
        assert!(json.get("input_schema").is_none());
    }

    #[test]
    fn test_required_arguments() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.required_arguments("get_redmine_ticket"), vec!["ticket_id"]);
        assert_eq!(registry.required_arguments("create_redmine_ticket"), vec!["subject"]);
        assert!(registry.required_arguments("list_redmine_projects").is_empty());
        assert!(registry.required_arguments("nope").is_empty());
    }
}
