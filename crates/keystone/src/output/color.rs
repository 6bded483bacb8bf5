//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success:        green   (created edges, clean validation)
//!   - Warning:        yellow  (scheduling violations, dependency kinds)
//!   - Error:          red     (rejections)
//!   - Info/Reference: cyan    (edge IDs, root tree node)
//!   - Muted:          dimmed  (field labels, connectors, display names)
//!   - Emphasis:       bold    (section headers)

use crate::domain::{DependencyKind, EntityRef, EntityType};
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Colorize an edge ID (cyan).
pub(crate) fn colorize_id(id: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return id.to_string();
    }
    id.cyan().to_string()
}

/// Colorize an entity reference: the type by hierarchy level, the id bold.
pub(crate) fn colorize_entity(entity: &EntityRef, config: &OutputConfig) -> String {
    if !config.use_colors {
        return entity.to_string();
    }
    let type_str = entity.entity_type.as_str();
    let type_colored = match entity.entity_type {
        EntityType::Program => type_str.magenta(),
        EntityType::Project => type_str.blue(),
        EntityType::Usecase | EntityType::UserStory => type_str.green(),
        EntityType::Task | EntityType::Subtask => type_str.white(),
    };
    format!("{}:{}", type_colored, entity.entity_id.bold())
}

/// Dependency kind in parentheses, e.g. `(finish-to-start)`.
pub(crate) fn colorize_kind(kind: DependencyKind, config: &OutputConfig) -> String {
    let text = format!("({kind})");
    if !config.use_colors {
        return text;
    }
    text.yellow().to_string()
}

/// Apply dimmed style to text (for labels/field names).
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Apply bold style to text (for section headers).
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Arrow between the two ends of an edge.
pub(crate) fn arrow(config: &OutputConfig) -> String {
    let arrow = if config.use_ascii { "->" } else { "→" };
    dimmed(arrow, config)
}
