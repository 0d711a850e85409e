//! Markdown rendering of Redmine payloads for tool results.

use redmine_core::{NamedRef, Project, Ticket, WikiPage, WikiPageSummary};

// ============================================================================
// Tickets
// ============================================================================

/// Render a single ticket.
pub fn ticket_to_markdown(ticket: &Ticket) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Ticket #{}: {}\n\n", ticket.id, ticket.subject));

    let header = join_fields(&[
        ("Project", ticket.project.as_ref().map(name_of)),
        ("Tracker", ticket.tracker.as_ref().map(name_of)),
        ("Status", ticket.status.as_ref().map(name_of)),
        ("Priority", ticket.priority.as_ref().map(name_of)),
    ]);
    push_line(&mut output, header);

    let people = join_fields(&[
        ("Author", ticket.author.as_ref().map(name_of)),
        ("Assignee", ticket.assigned_to.as_ref().map(name_of)),
    ]);
    push_line(&mut output, people);

    let schedule = join_fields(&[
        ("Start", ticket.start_date.clone()),
        ("Due", ticket.due_date.clone()),
        ("Done", ticket.done_ratio.map(|ratio| format!("{}%", ratio))),
    ]);
    push_line(&mut output, schedule);

    let timestamps = join_fields(&[
        ("Created", ticket.created_on.clone()),
        ("Updated", ticket.updated_on.clone()),
    ]);
    push_line(&mut output, timestamps);

    if let Some(description) = ticket.description.as_deref().filter(|d| !d.trim().is_empty()) {
        output.push_str("\n## Description\n\n");
        output.push_str(description.trim_end());
        output.push('\n');
    }

    output
}

/// Render a freshly created ticket.
pub fn created_ticket_to_markdown(ticket: &Ticket) -> String {
    format!(
        "Created ticket #{}: {}\n\n{}",
        ticket.id,
        ticket.subject,
        ticket_to_markdown(ticket)
    )
}

// ============================================================================
// Projects
// ============================================================================

/// Render the project list.
pub fn projects_to_markdown(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects found.".to_string();
    }

    let mut output = format!("# Projects ({})\n\n", projects.len());

    for project in projects {
        output.push_str(&format!(
            "- **{}** (`{}`, id {})",
            project.name, project.identifier, project.id
        ));
        if let Some(description) = project
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            output.push_str(&format!(": {}", first_line(description)));
        }
        output.push('\n');
    }

    output
}

// ============================================================================
// Wiki
// ============================================================================

/// Render the wiki index of a project.
pub fn wiki_pages_to_markdown(project_id: &str, pages: &[WikiPageSummary]) -> String {
    if pages.is_empty() {
        return format!("Project {} has no wiki pages.", project_id);
    }

    let mut output = format!("# Wiki pages of project {}\n\n", project_id);

    for page in pages {
        output.push_str(&format!("- {}", page.title));

        let details = join_fields(&[
            ("Parent", page.parent.as_ref().map(|parent| parent.title.clone())),
            ("Version", page.version.map(|v| v.to_string())),
            ("Updated", page.updated_on.clone()),
        ]);
        if let Some(details) = details {
            output.push_str(&format!(" ({})", details));
        }
        output.push('\n');
    }

    output
}

/// Render one wiki page with its content.
pub fn wiki_page_to_markdown(project_id: &str, page: &WikiPage) -> String {
    let mut output = format!("# Wiki page \"{}\"\n\n", page.title);

    output.push_str(&format!("Project: {}\n", project_id));

    let meta = join_fields(&[
        ("Version", page.version.map(|v| v.to_string())),
        ("Author", page.author.as_ref().map(name_of)),
        ("Updated", page.updated_on.clone()),
    ]);
    push_line(&mut output, meta);

    if let Some(comments) = page.comments.as_deref().filter(|c| !c.is_empty()) {
        output.push_str(&format!("**Comment:** {}\n", comments));
    }

    output.push_str("\n---\n\n");
    output.push_str(page.text.trim_end());
    output.push('\n');

    output
}

// ============================================================================
// Helpers
// ============================================================================

fn name_of(named: &NamedRef) -> String {
    named.name.clone()
}

/// `**Key:** value | **Key:** value` for the fields that are present.
fn join_fields(fields: &[(&str, Option<String>)]) -> Option<String> {
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(|value| format!("**{}:** {}", label, value))
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

fn push_line(output: &mut String, line: Option<String>) {
    if let Some(line) = line {
        output.push_str(&line);
        output.push('\n');
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
