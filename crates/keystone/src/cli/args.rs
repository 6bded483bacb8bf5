//! CLI argument structs.

use clap::{Args, Subcommand};

use super::types::{DependencyKindArg, DirectionArg};
use super::validators::{validate_dependency_id, validate_entity, validate_prefix};
use crate::domain::{DependencyId, EntityRef};

/// Arguments for the init command
#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Prefix for edge IDs (e.g., "dep" creates IDs like "dep-k3x9")
    #[arg(short, long, value_parser = validate_prefix)]
    pub prefix: Option<String>,

    /// Suppress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for commands that act on a single entity
#[derive(Args, Debug, Clone)]
pub struct EntityArgs {
    /// Entity reference as `type:id` (e.g., task:T1, user_story:US-7)
    #[arg(value_parser = validate_entity)]
    pub entity: EntityRef,
}

/// Arguments for the dep command
#[derive(Args, Debug, Clone)]
pub struct DepArgs {
    /// Dependency subcommand
    #[command(subcommand)]
    pub action: DepAction,
}

/// Dependency management actions
#[derive(Subcommand, Debug, Clone)]
pub enum DepAction {
    /// Add a dependency: FROM depends on TO
    Add {
        /// Dependent entity
        #[arg(value_parser = validate_entity)]
        from: EntityRef,

        /// Entity being depended on
        #[arg(value_parser = validate_entity)]
        to: EntityRef,

        /// Dependency kind
        #[arg(short, long, value_enum, default_value_t = DependencyKindArg::FinishToStart)]
        kind: DependencyKindArg,
    },

    /// Check whether a dependency could be added, without adding it
    ///
    /// Reports every failing check. Exits non-zero when the dependency
    /// would be rejected.
    Check {
        /// Dependent entity
        #[arg(value_parser = validate_entity)]
        from: EntityRef,

        /// Entity being depended on
        #[arg(value_parser = validate_entity)]
        to: EntityRef,

        /// Dependency kind
        #[arg(short, long, value_enum, default_value_t = DependencyKindArg::FinishToStart)]
        kind: DependencyKindArg,
    },

    /// Remove a dependency by ID
    Remove {
        /// Dependency ID (e.g., dep-k3x9)
        #[arg(value_parser = validate_dependency_id)]
        id: DependencyId,
    },

    /// Remove every dependency that touches an entity
    Purge(EntityArgs),

    /// Change the kind of an existing dependency
    SetKind {
        /// Dependency ID (e.g., dep-k3x9)
        #[arg(value_parser = validate_dependency_id)]
        id: DependencyId,

        /// New dependency kind
        #[arg(value_enum)]
        kind: DependencyKindArg,
    },

    /// List direct dependencies of an entity
    List {
        /// Entity reference as `type:id`
        #[arg(value_parser = validate_entity)]
        entity: EntityRef,

        /// Which edges to show
        #[arg(short, long, value_enum, default_value = "outgoing")]
        direction: DirectionArg,
    },
}
