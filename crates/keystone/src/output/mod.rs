//! Output formatting for CLI commands.
//!
//! Every command prints either human-readable text or pretty JSON for
//! programmatic use.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers
//! - [`tree`]: Dependency tree rendering with ASCII/Unicode connectors

pub mod color;
pub mod tree;

use crate::domain::DependencyEdge;
use crate::engine::{GraphView, ValidationReport};
use crate::graph::CriticalPath;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, success, warning};
pub use tree::print_dependency_tree;

use color::{arrow, bold, colorize_entity, colorize_id, colorize_kind, dimmed};

// ============================================================================
// Output Configuration
// ============================================================================

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use ASCII-only connectors instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with explicit values.
    pub fn new(use_ascii: bool, use_colors: bool) -> Self {
        Self {
            use_ascii,
            use_colors,
        }
    }

    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `KEYSTONE_ASCII`: Set to "1" or "true" for ASCII-only connectors (default: false)
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `KEYSTONE_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        let use_ascii = match env::var("KEYSTONE_ASCII") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Ok(v) => {
                tracing::warn!(
                    env_var = "KEYSTONE_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            Err(_) => false,
        };

        // Respect NO_COLOR standard (https://no-color.org/)
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("KEYSTONE_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

// ============================================================================
// Public Dispatch Functions
// ============================================================================

/// Print a single edge
pub fn print_edge(edge: &DependencyEdge, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_edge_line(&mut handle, edge, &config),
        OutputMode::Json => write_json(&mut handle, edge),
    }
}

/// Print a list of edges, with `empty_message` when there are none
pub fn print_edges(edges: &[DependencyEdge], empty_message: &str, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_edges_text(&mut handle, edges, empty_message, &config),
        OutputMode::Json => write_json(&mut handle, edges),
    }
}

/// Print the result of a dry-run validation
pub fn print_validation(report: &ValidationReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_validation_text(&mut handle, report, &config),
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({
                "valid": report.is_valid(),
                "reasons": report.reasons(),
            }),
        ),
    }
}

/// Print scheduling violations found over a chain
pub fn print_violations(violations: &[String], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_violations_text(&mut handle, violations, &config),
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({
                "valid": violations.is_empty(),
                "violations": violations,
            }),
        ),
    }
}

/// Print a critical path
pub fn print_critical_path(path: &CriticalPath, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_critical_path_text(&mut handle, path, &config),
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({
                "root": path.root,
                "length": path.len(),
                "entities": path.entities(),
                "edges": path.edges,
            }),
        ),
    }
}

/// Print a graph view as a node and edge listing
///
/// In JSON the `tree` field nests each entity's dependencies once. An
/// entity reached again carries `"repeated": true` and an empty
/// `dependencies` list; its subtree is under its first occurrence.
pub fn print_graph(view: &GraphView, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_graph_text(&mut handle, view, &config),
        OutputMode::Json => write_json(&mut handle, view),
    }
}

/// Print a simple message
pub fn print_message(msg: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", msg)
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{}", json)
}

// ============================================================================
// Text Formatting
// ============================================================================

fn write_edge_line<W: Write>(w: &mut W, edge: &DependencyEdge, config: &OutputConfig) -> io::Result<()> {
    writeln!(
        w,
        "{}  {} {} {} {}",
        colorize_id(edge.id.as_str(), config),
        colorize_entity(&edge.from, config),
        arrow(config),
        colorize_entity(&edge.to, config),
        colorize_kind(edge.kind, config),
    )
}

fn write_edges_text<W: Write>(
    w: &mut W,
    edges: &[DependencyEdge],
    empty_message: &str,
    config: &OutputConfig,
) -> io::Result<()> {
    if edges.is_empty() {
        return writeln!(w, "{}", empty_message);
    }

    writeln!(w, "{}", bold(&format!("{} dependency edge(s):", edges.len()), config))?;
    for edge in edges {
        write!(w, "  ")?;
        write_edge_line(w, edge, config)?;
    }
    Ok(())
}

fn write_validation_text<W: Write>(
    w: &mut W,
    report: &ValidationReport,
    config: &OutputConfig,
) -> io::Result<()> {
    if report.is_valid() {
        return writeln!(w, "{}", success("Dependency can be created.", config));
    }

    writeln!(w, "{}", error("Dependency would be rejected:", config))?;
    for reason in report.reasons() {
        writeln!(w, "  - {}", reason)?;
    }
    Ok(())
}

fn write_violations_text<W: Write>(
    w: &mut W,
    violations: &[String],
    config: &OutputConfig,
) -> io::Result<()> {
    if violations.is_empty() {
        return writeln!(w, "{}", success("No scheduling conflicts in chain.", config));
    }

    writeln!(
        w,
        "{}",
        warning(&format!("{} scheduling conflict(s):", violations.len()), config)
    )?;
    for violation in violations {
        writeln!(w, "  - {}", violation)?;
    }
    Ok(())
}

fn write_critical_path_text<W: Write>(
    w: &mut W,
    path: &CriticalPath,
    config: &OutputConfig,
) -> io::Result<()> {
    if path.is_empty() {
        return writeln!(
            w,
            "{} has no dependencies.",
            colorize_entity(&path.root, config)
        );
    }

    writeln!(
        w,
        "{} {} edge(s)",
        bold("Critical path:", config),
        path.len()
    )?;

    let separator = format!(" {} ", arrow(config));
    let entities: Vec<String> = path
        .entities()
        .into_iter()
        .map(|entity| colorize_entity(entity, config))
        .collect();
    writeln!(w, "  {}", entities.join(&separator))?;

    for edge in &path.edges {
        write!(w, "  ")?;
        write_edge_line(w, edge, config)?;
    }
    Ok(())
}

fn write_graph_text<W: Write>(w: &mut W, view: &GraphView, config: &OutputConfig) -> io::Result<()> {
    writeln!(w, "{}", bold(&format!("Nodes ({}):", view.nodes.len()), config))?;
    for node in &view.nodes {
        let marker = if node.is_root {
            if config.use_ascii { "*" } else { "◆" }
        } else {
            " "
        };
        writeln!(
            w,
            "  {} {} {}",
            marker,
            colorize_entity(&node.entity, config),
            dimmed(&node.name, config)
        )?;
    }

    writeln!(w)?;
    writeln!(w, "{}", bold(&format!("Edges ({}):", view.edges.len()), config))?;
    for edge in &view.edges {
        write!(w, "  ")?;
        write_edge_line(w, edge, config)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyKind, EntityRef, EntityType};
    use crate::engine::{DependencyTree, GraphNode, TreeNode};
    use crate::error::Rejection;
    use chrono::Utc;

    fn plain() -> OutputConfig {
        OutputConfig::new(true, false)
    }

    fn edge(id: &str, from: &str, to: &str) -> DependencyEdge {
        DependencyEdge {
            id: id.into(),
            from: EntityRef::task(from),
            to: EntityRef::task(to),
            kind: DependencyKind::FinishToStart,
            created_at: Utc::now(),
        }
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_edge_line() {
        let out = render(|w| write_edge_line(w, &edge("dep-a1", "A", "B"), &plain()));
        assert_eq!(out, "dep-a1  task:A -> task:B (finish-to-start)\n");
    }

    #[test]
    fn test_empty_edge_list_prints_message() {
        let out = render(|w| write_edges_text(w, &[], "No dependencies.", &plain()));
        assert_eq!(out, "No dependencies.\n");
    }

    #[test]
    fn test_validation_lists_every_reason() {
        let report = ValidationReport {
            rejections: vec![
                Rejection::SchedulingConflict("late".to_string()),
                Rejection::DuplicateEdge {
                    from: EntityRef::task("A"),
                    to: EntityRef::task("B"),
                },
            ],
        };
        let out = render(|w| write_validation_text(w, &report, &plain()));
        assert!(out.starts_with("Dependency would be rejected:"));
        assert!(out.contains("  - Scheduling conflict: late\n"));
        assert!(out.contains("  - Dependency already exists: task:A -> task:B\n"));
    }

    #[test]
    fn test_critical_path_text() {
        let path = CriticalPath {
            root: EntityRef::task("A"),
            edges: vec![edge("dep-1", "A", "B"), edge("dep-2", "B", "C")],
        };
        let out = render(|w| write_critical_path_text(w, &path, &plain()));
        assert!(out.starts_with("Critical path: 2 edge(s)\n"));
        assert!(out.contains("  task:A -> task:B -> task:C\n"));

        let empty = CriticalPath {
            root: EntityRef::task("Z"),
            edges: Vec::new(),
        };
        let out = render(|w| write_critical_path_text(w, &empty, &plain()));
        assert_eq!(out, "task:Z has no dependencies.\n");
    }

    #[test]
    fn test_graph_text_marks_root() {
        let root = EntityRef::new(EntityType::Project, "P1");
        let view = GraphView {
            root: root.clone(),
            nodes: vec![
                GraphNode {
                    entity: root.clone(),
                    name: "Platform".to_string(),
                    is_root: true,
                },
                GraphNode {
                    entity: EntityRef::task("T1"),
                    name: "Unknown".to_string(),
                    is_root: false,
                },
            ],
            edges: Vec::new(),
            tree: DependencyTree {
                root: TreeNode {
                    entity: root,
                    name: "Platform".to_string(),
                    dependency_id: None,
                    kind: None,
                    repeated: false,
                    dependencies: Vec::new(),
                },
                dependents: Vec::new(),
            },
        };

        let out = render(|w| write_graph_text(w, &view, &plain()));
        assert!(out.contains("  * project:P1 Platform\n"));
        assert!(out.contains("    task:T1 Unknown\n"));
        assert!(out.contains("Edges (0):"));
    }
}
