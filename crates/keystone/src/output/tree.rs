//! Dependency tree rendering for `keystone tree` output.

use std::io::{self, Write};

use colored::Colorize;

use super::color::{bold, colorize_entity, colorize_id, colorize_kind, dimmed};
use super::{write_json, OutputConfig, OutputMode};
use crate::engine::{DependencyTree, TreeNode};

/// Print a dependency tree with ASCII/Unicode connectors.
///
/// Renders a tree like:
/// ```text
/// ◆ task:T1 Write docs
/// ├── task:T2 Review (finish-to-start)
/// │   └── project:P1 Platform (start-to-start)
/// └── task:T3 Unknown (finish-to-finish)
///
/// Dependents:
/// └── task:T9 Release (finish-to-start)
/// ```
pub fn print_dependency_tree(tree: &DependencyTree, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_tree_text(&mut handle, tree, &config),
        OutputMode::Json => write_json(&mut handle, tree),
    }
}

fn write_tree_text<W: Write>(w: &mut W, tree: &DependencyTree, config: &OutputConfig) -> io::Result<()> {
    let root_icon = if config.use_ascii { "*" } else { "◆" };
    let root_icon_str = if config.use_colors {
        root_icon.cyan().bold().to_string()
    } else {
        root_icon.to_string()
    };

    writeln!(
        w,
        "{} {} {}",
        root_icon_str,
        colorize_entity(&tree.root.entity, config),
        tree.root.name
    )?;
    write_children(w, &tree.root.dependencies, &[], config)?;

    if !tree.dependents.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", bold("Dependents:", config))?;
        write_children(w, &tree.dependents, &[], config)?;
    }

    Ok(())
}

/// Recursively render tree children with proper connector lines.
///
/// `prefix_segments` tracks which ancestor levels still have siblings below,
/// used to draw the vertical continuation lines (`│`).
fn write_children<W: Write>(
    w: &mut W,
    children: &[TreeNode],
    prefix_segments: &[bool],
    config: &OutputConfig,
) -> io::Result<()> {
    let (branch, corner, pipe, space) = if config.use_ascii {
        ("|-- ", "`-- ", "|   ", "    ")
    } else {
        ("├── ", "└── ", "│   ", "    ")
    };

    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;

        let mut prefix = String::new();
        for &has_more in prefix_segments {
            prefix.push_str(&dimmed(if has_more { pipe } else { space }, config));
        }
        let connector = dimmed(if is_last { corner } else { branch }, config);

        let kind_str = child
            .kind
            .map(|kind| format!(" {}", colorize_kind(kind, config)))
            .unwrap_or_default();
        let id_str = child
            .dependency_id
            .as_ref()
            .map(|id| format!(" {}", colorize_id(id.as_str(), config)))
            .unwrap_or_default();
        let repeated_str = if child.repeated {
            format!(" {}", dimmed("[see above]", config))
        } else {
            String::new()
        };

        writeln!(
            w,
            "{}{}{} {}{}{}{}",
            prefix,
            connector,
            colorize_entity(&child.entity, config),
            child.name,
            kind_str,
            id_str,
            repeated_str
        )?;

        if !child.dependencies.is_empty() {
            let mut next_segments = prefix_segments.to_vec();
            next_segments.push(!is_last);
            write_children(w, &child.dependencies, &next_segments, config)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyKind, EntityRef};

    fn node(id: &str, kind: Option<DependencyKind>, dependencies: Vec<TreeNode>) -> TreeNode {
        TreeNode {
            entity: EntityRef::task(id),
            name: format!("Task {id}"),
            dependency_id: kind.map(|_| format!("dep-{}", id.to_lowercase()).into()),
            kind,
            repeated: false,
            dependencies,
        }
    }

    fn render(tree: &DependencyTree, config: &OutputConfig) -> String {
        let mut buf = Vec::new();
        write_tree_text(&mut buf, tree, config).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_ascii_tree_with_dependents() {
        let fs = Some(DependencyKind::FinishToStart);
        let mut repeated = node("D", fs, Vec::new());
        repeated.repeated = true;

        let tree = DependencyTree {
            root: node(
                "A",
                None,
                vec![
                    node("B", fs, vec![node("D", fs, Vec::new())]),
                    node("C", fs, vec![repeated]),
                ],
            ),
            dependents: vec![node("X", fs, Vec::new())],
        };

        let out = render(&tree, &OutputConfig::new(true, false));
        let expected = "\
* task:A Task A
|-- task:B Task B (finish-to-start) dep-b
|   `-- task:D Task D (finish-to-start) dep-d
`-- task:C Task C (finish-to-start) dep-c
    `-- task:D Task D (finish-to-start) dep-d [see above]

Dependents:
`-- task:X Task X (finish-to-start) dep-x
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_unicode_leaf_root() {
        let tree = DependencyTree {
            root: node("A", None, Vec::new()),
            dependents: Vec::new(),
        };
        let out = render(&tree, &OutputConfig::new(false, false));
        assert_eq!(out, "◆ task:A Task A\n");
    }
}
