//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::{anyhow, bail, Result};

use super::args::{DepAction, DepArgs, EntityArgs, InitArgs};
use crate::app::App;
use crate::domain::EdgeDirection;
use crate::output::{self, OutputMode};

/// Convert an engine error into what the user gets to see.
///
/// Rejections and lookup failures carry their own message. Infrastructure
/// failures are logged with full detail and reported with a generic message.
pub fn user_error(err: crate::Error) -> anyhow::Error {
    if matches!(
        err,
        crate::Error::Storage(_) | crate::Error::Io(_) | crate::Error::Json(_)
    ) {
        tracing::error!(error = %err, "Operation failed");
    }
    anyhow!(err.user_message())
}

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;

    if !args.quiet {
        println!(
            "Initializing keystone repository{}...",
            args.prefix
                .as_ref()
                .map(|p| format!(" with prefix '{}'", p))
                .unwrap_or_default()
        );
    }

    let result = init::init(&current_dir, args.prefix.as_deref())
        .await
        .map_err(user_error)?;

    if !args.quiet {
        println!("Initialized keystone in {}", result.keystone_dir.display());
        println!("  Config: {}", result.config_file.display());
        println!("  Dependencies: {}", result.dependencies_file.display());
        println!("  Entities: {}", result.entities_file.display());
        println!("  Edge prefix: {}", result.prefix);
    }

    Ok(())
}

/// Execute the dep command
pub async fn execute_dep(app: &App, args: &DepArgs, output_mode: OutputMode) -> Result<()> {
    let engine = app.engine();

    match &args.action {
        DepAction::Add { from, to, kind } => {
            let edge = engine
                .create(from, to, (*kind).into())
                .await
                .map_err(user_error)?;

            if output_mode == OutputMode::Text {
                print!("Added dependency: ");
            }
            output::print_edge(&edge, output_mode)?;
        }
        DepAction::Check { from, to, kind } => {
            let report = engine
                .validate(from, to, (*kind).into())
                .await
                .map_err(user_error)?;

            output::print_validation(&report, output_mode)?;
            if !report.is_valid() {
                bail!("{} check(s) failed for {} -> {}", report.rejections.len(), from, to);
            }
        }
        DepAction::Remove { id } => {
            let edge = engine.delete(id).await.map_err(user_error)?;

            match output_mode {
                OutputMode::Json => {
                    output::print_json(&serde_json::json!({
                        "action": "remove",
                        "removed": edge,
                    }))?;
                }
                OutputMode::Text => {
                    print!("Removed dependency: ");
                    output::print_edge(&edge, output_mode)?;
                }
            }
        }
        DepAction::Purge(EntityArgs { entity }) => {
            let removed = engine
                .delete_all_for_entity(entity)
                .await
                .map_err(user_error)?;

            match output_mode {
                OutputMode::Json => {
                    output::print_json(&serde_json::json!({
                        "action": "purge",
                        "entity": entity,
                        "removed": removed,
                    }))?;
                }
                OutputMode::Text => {
                    output::print_message(&format!(
                        "Removed {} dependency edge(s) touching {}",
                        removed, entity
                    ))?;
                }
            }
        }
        DepAction::SetKind { id, kind } => {
            let edge = engine
                .update_kind(id, (*kind).into())
                .await
                .map_err(user_error)?;

            if output_mode == OutputMode::Text {
                print!("Updated dependency: ");
            }
            output::print_edge(&edge, output_mode)?;
        }
        DepAction::List { entity, direction } => {
            let direction = EdgeDirection::from(*direction);
            let edges = engine
                .dependencies(entity, direction)
                .await
                .map_err(user_error)?;

            let empty_message = match direction {
                EdgeDirection::Outgoing => format!("{} has no dependencies", entity),
                EdgeDirection::Incoming => format!("Nothing depends on {}", entity),
                EdgeDirection::Both => format!("No dependency edges touch {}", entity),
            };
            output::print_edges(&edges, &empty_message, output_mode)?;
        }
    }

    Ok(())
}

/// Execute the chain command
pub async fn execute_chain(app: &App, args: &EntityArgs, output_mode: OutputMode) -> Result<()> {
    let edges = app.engine().chain(&args.entity).await.map_err(user_error)?;
    output::print_edges(
        &edges,
        &format!("{} has no dependencies", args.entity),
        output_mode,
    )?;
    Ok(())
}

/// Execute the validate-chain command
pub async fn execute_validate_chain(
    app: &App,
    args: &EntityArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let violations = app
        .engine()
        .validate_chain(&args.entity)
        .await
        .map_err(user_error)?;

    output::print_violations(&violations, output_mode)?;
    if !violations.is_empty() {
        bail!(
            "{} scheduling conflict(s) in the chain of {}",
            violations.len(),
            args.entity
        );
    }
    Ok(())
}

/// Execute the critical-path command
pub async fn execute_critical_path(
    app: &App,
    args: &EntityArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let path = app
        .engine()
        .critical_path(&args.entity)
        .await
        .map_err(user_error)?;
    output::print_critical_path(&path, output_mode)?;
    Ok(())
}

/// Execute the tree command
pub async fn execute_tree(app: &App, args: &EntityArgs, output_mode: OutputMode) -> Result<()> {
    let view = app
        .engine()
        .graph_view(&args.entity)
        .await
        .map_err(user_error)?;
    output::print_dependency_tree(&view.tree, output_mode)?;
    Ok(())
}

/// Execute the graph command
pub async fn execute_graph(app: &App, args: &EntityArgs, output_mode: OutputMode) -> Result<()> {
    let view = app
        .engine()
        .graph_view(&args.entity)
        .await
        .map_err(user_error)?;
    output::print_graph(&view, output_mode)?;
    Ok(())
}
