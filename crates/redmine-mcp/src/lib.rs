//! MCP (Model Context Protocol) server for redmine-mcp-tools.
//!
//! This crate implements the JSON-RPC dispatch layer that exposes Redmine
//! tickets, projects and wiki pages to AI assistants, together with the
//! stdio and HTTP transports that carry it.

pub mod error;
pub mod format;
pub mod handlers;
pub mod http;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use error::{DispatchError, ErrorCode};
pub use server::{Dispatcher, Outcome};
pub use tools::{ToolKind, ToolRegistry};
pub use transport::StdioTransport;
