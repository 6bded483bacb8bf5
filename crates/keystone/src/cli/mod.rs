//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for keystone using clap's
//! derive API. Entity arguments are written as `type:id`.
//!
//! # Commands
//!
//! - `init`: Initialize a new keystone repository
//! - `dep`: Add, check, remove, purge, re-kind and list dependencies
//! - `chain`: Show every edge reachable from an entity
//! - `validate-chain`: Check a whole chain for scheduling conflicts
//! - `critical-path`: Show the longest dependency path from an entity
//! - `tree`: Render the dependency tree of an entity
//! - `graph`: Show the named nodes and edges around an entity
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! keystone dep add task:T1 task:T2 --kind finish-to-start
//! keystone dep check project:P1 program:PG1 --kind ss
//! keystone chain task:T1
//! keystone --json critical-path task:T1
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{DepAction, DepArgs, EntityArgs, InitArgs};
pub use types::{DependencyKindArg, DirectionArg};
pub use validators::{validate_dependency_id, validate_entity, validate_prefix};

use crate::app::App;
use crate::output::OutputMode;
use execute::user_error;

/// Keystone - cross-entity dependency tracking
///
/// Records "depends on" edges between programs, projects, usecases, user
/// stories, tasks and subtasks. Edges are stored in
/// `.keystone/dependencies.jsonl`; entity names and dates are read from
/// `.keystone/entities.jsonl`.
#[derive(Parser, Debug)]
#[command(name = "keystone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new keystone repository
    ///
    /// Creates the `.keystone/` directory with configuration and empty data
    /// files. Run this once in your project root.
    Init(InitArgs),

    /// Manage dependencies between entities
    Dep(DepArgs),

    /// Show every dependency reachable from an entity
    Chain(EntityArgs),

    /// Check a dependency chain for scheduling conflicts
    ///
    /// Exits non-zero when any edge in the chain violates its kind.
    ValidateChain(EntityArgs),

    /// Show the longest dependency path starting at an entity
    CriticalPath(EntityArgs),

    /// Render the dependency tree of an entity, with its direct dependents
    Tree(EntityArgs),

    /// Show the chain of an entity as named nodes and edges
    Graph(EntityArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(args).await,
            Some(Commands::Dep(args)) => {
                let app = open_app().await?;
                execute::execute_dep(&app, args, output_mode).await
            }
            Some(Commands::Chain(args)) => {
                let app = open_app().await?;
                execute::execute_chain(&app, args, output_mode).await
            }
            Some(Commands::ValidateChain(args)) => {
                let app = open_app().await?;
                execute::execute_validate_chain(&app, args, output_mode).await
            }
            Some(Commands::CriticalPath(args)) => {
                let app = open_app().await?;
                execute::execute_critical_path(&app, args, output_mode).await
            }
            Some(Commands::Tree(args)) => {
                let app = open_app().await?;
                execute::execute_tree(&app, args, output_mode).await
            }
            Some(Commands::Graph(args)) => {
                let app = open_app().await?;
                execute::execute_graph(&app, args, output_mode).await
            }
            None => {
                println!("Keystone dependency tracking");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}

async fn open_app() -> Result<App> {
    let current_dir = std::env::current_dir()?;
    App::from_directory(&current_dir).await.map_err(user_error)
}
