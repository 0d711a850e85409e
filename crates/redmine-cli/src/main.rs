//! redmine-mcp CLI - MCP server for Redmine.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use redmine_api::RedmineClient;
use redmine_core::Config;
use redmine_mcp::protocol::ServerInfo;
use redmine_mcp::{http, Dispatcher, StdioTransport, ToolRegistry};
use tracing_subscriber::EnvFilter;

/// Keys shown by `config show`, in display order.
const CONFIG_KEYS: [&str; 5] = [
    "redmine.url",
    "redmine.api_key",
    "server.bind",
    "server.port",
    "server.vendor",
];

#[derive(Parser, Debug)]
#[command(name = "redmine-mcp")]
#[command(author, version, about = "MCP server exposing Redmine to AI assistants", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve MCP over stdin/stdout
    Stdio,

    /// Serve MCP over HTTP (`/rpc`, `/rpc/stream`, `/health`)
    Serve {
        /// Address to bind to
        #[arg(short, long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print a single value (e.g. `redmine.url`)
    Get { key: String },

    /// Store a value (e.g. `redmine.api_key abc123`)
    Set { key: String, value: String },

    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the stdio protocol, so logs go to stderr.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command {
        Commands::Stdio => {
            let config = Config::load_from(&config_path)?.with_env();
            let dispatcher = build_dispatcher(&config);
            StdioTransport::stdio()
                .serve(&dispatcher)
                .await
                .context("stdio transport failed")?;
        }
        Commands::Serve { bind, port } => {
            let mut config = Config::load_from(&config_path)?.with_env();
            apply_overrides(&mut config, bind, port);

            let addr = listen_addr(&config)?;
            let dispatcher = build_dispatcher(&config);
            http::serve(dispatcher, addr)
                .await
                .with_context(|| format!("HTTP server on {} failed", addr))?;
        }
        Commands::Config { command } => handle_config(command, &config_path)?,
    }

    Ok(())
}

fn build_dispatcher(config: &Config) -> Dispatcher {
    if !config.has_api_key() {
        tracing::warn!("No Redmine API key configured; requests are sent anonymously");
    }
    tracing::info!(url = %config.redmine.url, "Using Redmine");

    let client = RedmineClient::with_base_url(&config.redmine.url, &config.redmine.api_key);
    Dispatcher::new(Arc::new(ToolRegistry::new()), Arc::new(client))
        .with_server_info(ServerInfo::new(&config.server.vendor))
}

/// Command-line flags win over file and environment.
fn apply_overrides(config: &mut Config, bind: Option<String>, port: Option<u16>) {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
}

fn listen_addr(config: &Config) -> anyhow::Result<SocketAddr> {
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    addr.parse()
        .with_context(|| format!("Invalid listen address: {}", addr))
}

fn handle_config(command: ConfigCommands, path: &Path) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = Config::load_from(path)?.with_env();
            println!("# {}", path.display());
            for key in CONFIG_KEYS {
                let value = config.get(key)?;
                println!("{} = {}", key, display_value(key, value.as_deref()));
            }
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_from(path)?.with_env();
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => anyhow::bail!("{} is not set", key),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_from(path)?;
            config.set(&key, &value)?;
            config.save_to(path)?;
            println!("Set {}", key);
        }
        ConfigCommands::Path => println!("{}", path.display()),
    }

    Ok(())
}

/// Mask secrets for display.
fn display_value(key: &str, value: Option<&str>) -> String {
    match value {
        None => "(not set)".to_string(),
        Some(value) if key.ends_with("api_key") => mask(value),
        Some(value) => value.to_string(),
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
