//! In-memory storage backend using HashMap and petgraph.
//!
//! All edges are held in RAM and **lost when the process exits** unless the
//! store is wrapped by the JSONL backend (see [`load_from_jsonl`] and
//! [`save_to_jsonl`]).
//!
//! # Architecture
//!
//! - `petgraph::StableDiGraph<EntityRef, StoredEdge>` for the dependency graph;
//!   stable indices survive edge and node removal
//! - `HashMap<EntityRef, NodeIndex>` for mapping entities to graph nodes
//! - `HashMap<DependencyId, EdgeIndex>` for O(1) lookups by edge ID
//! - A monotonically increasing sequence number per edge, so listings keep
//!   insertion order even after indices are reused
//!
//! ## Edge Direction Convention
//!
//! Edge source is the dependent (`from`), edge target is the dependency
//! (`to`). If task T1 depends on project P1, the edge is `T1 -> P1`.
//!
//! # Thread Safety
//!
//! The storage is wrapped in `Arc<Mutex<InMemoryStorageInner>>`. Every
//! operation holds the lock for its whole duration, so `insert` performs its
//! duplicate and cycle checks and the write as one atomic step.
//!
//! # Performance Characteristics
//!
//! - Insert: O(V + E) for the cycle check
//! - Get / update kind / delete by ID: O(1)
//! - Delete all for entity: O(d) where d is the entity's degree
//! - Outgoing / incoming: O(d log d)

mod inner;
mod jsonl;
mod trait_impl;

use crate::storage::DependencyStore;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) use inner::InMemoryStorageInner;
pub(crate) use jsonl::load_inner;

// Re-export public API
pub use jsonl::{load_from_jsonl, save_to_jsonl, LoadWarning};

/// Thread-safe in-memory storage.
///
/// Implements [`DependencyStore`] via the trait implementation in
/// `trait_impl.rs`.
pub(crate) type InMemoryStorage = Arc<Mutex<InMemoryStorageInner>>;

/// Create a new in-memory storage instance.
///
/// # Arguments
///
/// * `prefix` - The prefix for edge IDs (e.g., "dep")
///
/// # Example
///
/// ```
/// use keystone::storage::in_memory::new_in_memory_storage;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let storage = new_in_memory_storage("dep".to_string());
///     // Use storage...
/// }
/// ```
pub fn new_in_memory_storage(prefix: String) -> Box<dyn DependencyStore> {
    Box::new(Arc::new(Mutex::new(InMemoryStorageInner::new(prefix))))
}
