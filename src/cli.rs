//! Command-line interface for tabshelf.
//!
//! The binary is offline tooling for the workspace store: every subcommand
//! is turned into a router message and served by a [`WorkspaceService`] over
//! the JSON file store, with an in-memory platform that has no open windows.

use crate::platform::memory::MemoryPlatform;
use crate::router::{Response, Router, spawn_message_loop};
use crate::service::{ServiceSettings, WorkspaceService};
use crate::store::FileStore;
use crate::workspace::{WorkspaceId, WorkspaceRecord};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabshelf_config::{Config, LogLevel};

/// tabshelf - save browser windows as named workspaces
#[derive(Debug, Parser)]
#[command(name = "tabshelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log verbosity (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,

    /// Workspace store file (defaults to the configured store path)
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Config file to load instead of the default one
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// List saved workspaces in display order
    List,

    /// Export the whole store as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Replace the store with previously exported JSON
    Import {
        /// File produced by `export`
        file: PathBuf,
    },

    /// Give a workspace a custom title
    Rename { id: WorkspaceId, title: String },

    /// Delete a saved workspace
    Remove { id: WorkspaceId },

    /// Set the display order; unlisted workspaces keep their relative order
    Reorder {
        #[arg(required = true)]
        ids: Vec<WorkspaceId>,
    },

    /// Print the config file location
    ConfigPath,
}

fn parse_log_level(value: &str) -> std::result::Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| {
        let names: Vec<&str> = LogLevel::all().iter().map(|l| l.display_name()).collect();
        format!("unknown log level '{value}' (expected one of: {})", names.join(", "))
    })
}

/// Load the config named on the command line, or the default one.
pub fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

impl Commands {
    /// The router message for this subcommand, if it needs the store.
    fn to_message(&self) -> Result<Option<Value>> {
        let message = match self {
            Commands::List => json!({"action": "getState"}),
            Commands::Export { .. } => json!({"action": "exportWorkspaces"}),
            Commands::Import { file } => {
                let data = read_json(file)?;
                json!({"action": "importWorkspaces", "data": data})
            }
            Commands::Rename { id, title } => {
                json!({"action": "renameWorkspace", "workspaceId": id, "newTitle": title})
            }
            Commands::Remove { id } => json!({"action": "unsaveWorkspace", "workspaceId": id}),
            Commands::Reorder { ids } => json!({"action": "updateOrder", "newOrder": ids}),
            Commands::ConfigPath => return Ok(None),
        };
        Ok(Some(message))
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("{:?} is not valid JSON", path))
}

/// Run one subcommand against the store.
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let Some(message) = cli.command.to_message()? else {
        println!("{}", Config::config_path().display());
        return Ok(());
    };

    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| config.resolved_store_path());
    crate::debug_info!("cli", "Using store {:?}", store_path);

    let response = send(&store_path, &config, message).await;
    if !response.success {
        bail!(
            "{}",
            response.error.as_deref().unwrap_or("request failed")
        );
    }

    match &cli.command {
        Commands::List => print_list(&response)?,
        Commands::Export { output } => write_export(&response, output.as_deref())?,
        Commands::Import { file } => println!("Imported workspaces from {}", file.display()),
        Commands::Rename { id, title } => println!("Renamed workspace {id} to {title:?}"),
        Commands::Remove { id } => println!("Removed workspace {id}"),
        Commands::Reorder { ids } => println!("Reordered {} workspace(s)", ids.len()),
        Commands::ConfigPath => {}
    }
    Ok(())
}

/// Serve a single message through the router's message channel.
async fn send(store_path: &Path, config: &Config, message: Value) -> Response {
    let service = WorkspaceService::new(
        Arc::new(MemoryPlatform::new()),
        FileStore::new(store_path),
        ServiceSettings::from(config),
    );
    let (handle, task) = spawn_message_loop(Router::new(Arc::new(service)), 1);

    let response = handle.request(message).await;
    drop(handle);
    if let Err(e) = task.await {
        crate::debug_error!("cli", "Message loop ended abnormally: {}", e);
    }
    response
}

fn print_list(response: &Response) -> Result<()> {
    let saved = response.get("saved").cloned().unwrap_or(Value::Null);
    let records: Vec<WorkspaceRecord> =
        serde_json::from_value(saved).context("Unexpected getState payload")?;

    if records.is_empty() {
        println!("No saved workspaces.");
        return Ok(());
    }
    for record in records {
        let open = match record.window_id {
            Some(window_id) => format!("  (window {window_id})"),
            None => String::new(),
        };
        println!(
            "{:>4}  {}  [{} tabs]{}",
            record.id,
            record.title,
            record.tabs.len(),
            open
        );
    }
    Ok(())
}

fn write_export(response: &Response, output: Option<&Path>) -> Result<()> {
    let data = response.get("data").context("Export response has no data")?;
    let json = serde_json::to_string_pretty(data).context("Failed to encode export")?;

    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write export to {:?}", path))?;
            crate::debug_log!("cli", "Exported store to {:?}", path);
            println!("Exported workspaces to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
