//! JSONL persistence for in-memory storage.
//!
//! Each line of the data file is one serialized [`DependencyEdge`]. Lines are
//! replayed in file order, so the file order is also the insertion order
//! seen by listings after a reload.

use super::inner::InMemoryStorageInner;
use crate::domain::{DependencyEdge, DependencyId};
use crate::error::{Error, Rejection, Result, StorageError};
use crate::storage::DependencyStore;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

/// Warnings that can occur during JSONL file loading.
///
/// These are non-fatal: the offending line is skipped and loading carries
/// on. Callers should log or report them, since they point at a file that
/// was edited by hand or merged badly.
///
/// **Example:**
/// ```no_run
/// # use keystone::storage::in_memory::{load_from_jsonl, LoadWarning};
/// # use std::path::Path;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let (storage, warnings) = load_from_jsonl(
///     Path::new(".keystone/dependencies.jsonl"),
///     "dep".to_string(),
/// ).await?;
///
/// for warning in warnings {
///     match warning {
///         LoadWarning::MalformedJson { line_number, error } => {
///             eprintln!("Skipped malformed JSON at line {}: {}", line_number, error);
///         }
///         LoadWarning::SkippedEdge { line_number, id, reason } => {
///             eprintln!("Skipped {} at line {}: {}", id, line_number, reason);
///         }
///         LoadWarning::DuplicateId { line_number, id } => {
///             eprintln!("Skipped duplicate ID {} at line {}", id, line_number);
///         }
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A line that couldn't be parsed as an edge.
    ///
    /// **Effect**: The line is skipped entirely.
    MalformedJson { line_number: usize, error: String },

    /// A well-formed edge that breaks a graph invariant (self-dependency,
    /// cycle or duplicate pair) given the lines before it.
    ///
    /// **Effect**: The edge is skipped; earlier edges win.
    SkippedEdge {
        line_number: usize,
        id: DependencyId,
        reason: Rejection,
    },

    /// An edge whose ID was already used by an earlier line.
    DuplicateId { line_number: usize, id: DependencyId },
}

/// Parse a JSONL file into a fresh storage inner.
pub(crate) async fn load_inner(
    path: &Path,
    prefix: String,
) -> Result<(InMemoryStorageInner, Vec<LoadWarning>)> {
    let file = File::open(path).await.map_err(Error::Io)?;
    let mut lines = BufReader::new(file).lines();

    let mut inner = InMemoryStorageInner::new(prefix);
    let mut warnings = Vec::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await.map_err(Error::Io)? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let edge: DependencyEdge = match serde_json::from_str(&line) {
            Ok(edge) => edge,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        if inner.edge_map.contains_key(&edge.id) {
            warnings.push(LoadWarning::DuplicateId {
                line_number,
                id: edge.id,
            });
            continue;
        }

        if let Err(reason) = inner.check_new_edge(&edge.from, &edge.to) {
            warnings.push(LoadWarning::SkippedEdge {
                line_number,
                id: edge.id,
                reason,
            });
            continue;
        }

        inner.add_edge(edge);
    }

    Ok((inner, warnings))
}

/// Load storage from a JSONL file.
///
/// # Error Handling
///
/// - **Malformed JSON**: Skips the line and adds a warning
/// - **Invalid edges**: Skips the edge and adds a warning
/// - **Missing or unreadable file**: Returns `Error::Io`
///
/// # Returns
///
/// Returns a tuple of `(storage, warnings)` where warnings contains all non-fatal
/// issues encountered during loading.
pub async fn load_from_jsonl(
    path: &Path,
    prefix: String,
) -> Result<(Box<dyn DependencyStore>, Vec<LoadWarning>)> {
    let (inner, warnings) = load_inner(path, prefix).await?;
    Ok((Box::new(Arc::new(Mutex::new(inner))), warnings))
}

/// Save storage to a JSONL file with atomic writes.
///
/// Writes to a temporary file next to `path`, then renames it over the
/// target. If the process dies midway, the original file is untouched.
pub async fn save_to_jsonl(storage: &dyn DependencyStore, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let file = File::create(&temp_path).await.map_err(Error::Io)?;
    let mut writer = BufWriter::new(file);

    // Insertion order, so that reloading reproduces listing order
    let edges = storage.export_all().await?;

    for edge in &edges {
        let json = serde_json::to_string(edge).map_err(StorageError::Serialization)?;
        writer.write_all(json.as_bytes()).await.map_err(Error::Io)?;
        writer.write_all(b"\n").await.map_err(Error::Io)?;
    }

    writer.flush().await.map_err(Error::Io)?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(Error::Io)?;

    Ok(())
}
