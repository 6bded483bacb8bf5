//! Storage abstraction layer for dependency edges.
//!
//! This module provides the core storage trait and factory for creating
//! storage backends:
//!
//! - **In-memory**: Fast, ephemeral storage backed by a petgraph graph
//! - **JSONL**: The in-memory store persisted to a JSON Lines file
//! - **PostgreSQL**: Relational backend (not yet implemented)
//!
//! # Architecture
//!
//! The store is an async trait so that in-memory and truly async backends
//! share one interface. All methods take `&self`; implementations use
//! interior mutability so a single store can be shared by concurrent
//! request handlers.
//!
//! # Atomic insert
//!
//! [`DependencyStore::insert`] must re-check the self-dependency, cycle and
//! duplicate rules under the same lock (or transaction) that performs the
//! write. Callers validate first to produce good error messages, but only
//! the store can close the window between that read and the write.
//!
//! # Example
//!
//! ```no_run
//! use keystone::domain::{DependencyKind, EntityRef, NewDependency};
//! use keystone::storage::{create_storage, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = create_storage(StorageBackend::InMemory, "dep".to_string()).await?;
//!
//!     let edge = storage
//!         .insert(NewDependency::new(
//!             EntityRef::task("T1"),
//!             EntityRef::task("T2"),
//!             DependencyKind::FinishToStart,
//!         ))
//!         .await?;
//!     println!("Created dependency: {}", edge.id);
//!
//!     Ok(())
//! }
//! ```

use crate::domain::{DependencyEdge, DependencyId, DependencyKind, EntityRef, NewDependency};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

// Storage backend implementations
pub mod in_memory;

/// Core storage trait for dependency edges.
///
/// Edges point from the dependent (`from`) to the dependency (`to`).
///
/// # Error Handling
///
/// - `Rejected(..)`: `insert` refused the edge (self, cycle or duplicate)
/// - `DependencyNotFound`: no edge with the requested ID
/// - `Storage` / `Io`: the backend failed; always fatal to the operation
#[async_trait]
pub trait DependencyStore: Send + Sync {
    /// Persist a new edge and return it with its generated ID.
    ///
    /// # Implementation Requirements
    ///
    /// Implementations **MUST** reject, atomically with the write:
    /// - `from == to` with `Rejection::SelfDependency`
    /// - an edge closing a cycle with `Rejection::CircularDependency`
    /// - an existing `(from, to)` pair with `Rejection::DuplicateEdge`
    async fn insert(&self, new: NewDependency) -> Result<DependencyEdge>;

    /// Get an edge by ID. Returns `None` if it doesn't exist.
    async fn get(&self, id: &DependencyId) -> Result<Option<DependencyEdge>>;

    /// Change the kind of an existing edge in place.
    ///
    /// Endpoints are unchanged, so no cycle check is needed.
    ///
    /// # Errors
    ///
    /// Returns `Error::DependencyNotFound` if the edge doesn't exist.
    async fn update_kind(&self, id: &DependencyId, kind: DependencyKind)
        -> Result<DependencyEdge>;

    /// Delete an edge, returning it.
    ///
    /// # Errors
    ///
    /// Returns `Error::DependencyNotFound` if the edge doesn't exist.
    async fn delete(&self, id: &DependencyId) -> Result<DependencyEdge>;

    /// Delete every edge where `entity` is either endpoint.
    ///
    /// Returns the number of edges removed; zero is not an error.
    async fn delete_all_for_entity(&self, entity: &EntityRef) -> Result<usize>;

    /// Edges where `entity` is the dependent, in insertion order.
    async fn outgoing(&self, entity: &EntityRef) -> Result<Vec<DependencyEdge>>;

    /// Edges where `entity` is the dependency, in insertion order.
    async fn incoming(&self, entity: &EntityRef) -> Result<Vec<DependencyEdge>>;

    /// Returns `true` if an edge `from -> to` exists, whatever its kind.
    async fn exists(&self, from: &EntityRef, to: &EntityRef) -> Result<bool>;

    /// Bulk-load previously exported edges, keeping their IDs.
    ///
    /// Edges that would violate the graph invariants are skipped and
    /// logged. Returns the number of edges imported.
    async fn import_edges(&self, edges: Vec<DependencyEdge>) -> Result<usize>;

    /// All edges, in insertion order.
    async fn export_all(&self) -> Result<Vec<DependencyEdge>>;

    /// Save changes to persistent storage.
    ///
    /// For in-memory storage this is a no-op; the JSONL backend writes the
    /// whole edge set atomically.
    async fn save(&self) -> Result<()>;

    /// Reload state from persistent storage, discarding in-memory changes.
    ///
    /// Used to restore consistency when `save()` fails after a mutation.
    async fn reload(&self) -> Result<()>;
}

/// Storage backend configuration.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),

    /// PostgreSQL database
    PostgreSQL(String),
}

impl StorageBackend {
    /// Returns the data file path for file-based backends.
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Jsonl(path) => Some(path),
            StorageBackend::InMemory | StorageBackend::PostgreSQL(_) => None,
        }
    }
}

/// In-memory store whose `save()` writes all edges to a JSONL file.
struct JsonlBackedStorage {
    inner: in_memory::InMemoryStorage,
    path: PathBuf,
    prefix: String,
    // Serializes writers of the shared temp file.
    save_lock: Mutex<()>,
}

#[async_trait]
impl DependencyStore for JsonlBackedStorage {
    async fn insert(&self, new: NewDependency) -> Result<DependencyEdge> {
        self.inner.insert(new).await
    }

    async fn get(&self, id: &DependencyId) -> Result<Option<DependencyEdge>> {
        self.inner.get(id).await
    }

    async fn update_kind(
        &self,
        id: &DependencyId,
        kind: DependencyKind,
    ) -> Result<DependencyEdge> {
        self.inner.update_kind(id, kind).await
    }

    async fn delete(&self, id: &DependencyId) -> Result<DependencyEdge> {
        self.inner.delete(id).await
    }

    async fn delete_all_for_entity(&self, entity: &EntityRef) -> Result<usize> {
        self.inner.delete_all_for_entity(entity).await
    }

    async fn outgoing(&self, entity: &EntityRef) -> Result<Vec<DependencyEdge>> {
        self.inner.outgoing(entity).await
    }

    async fn incoming(&self, entity: &EntityRef) -> Result<Vec<DependencyEdge>> {
        self.inner.incoming(entity).await
    }

    async fn exists(&self, from: &EntityRef, to: &EntityRef) -> Result<bool> {
        self.inner.exists(from, to).await
    }

    async fn import_edges(&self, edges: Vec<DependencyEdge>) -> Result<usize> {
        self.inner.import_edges(edges).await
    }

    async fn export_all(&self) -> Result<Vec<DependencyEdge>> {
        self.inner.export_all().await
    }

    async fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;
        in_memory::save_to_jsonl(&self.inner, &self.path).await
    }

    async fn reload(&self) -> Result<()> {
        let fresh = if self.path.exists() {
            let (inner, warnings) = in_memory::load_inner(&self.path, self.prefix.clone()).await?;
            for warning in &warnings {
                tracing::warn!(warning = ?warning, "JSONL reload warning");
            }
            inner
        } else {
            in_memory::InMemoryStorageInner::new(self.prefix.clone())
        };

        *self.inner.lock().await = fresh;
        Ok(())
    }
}

/// Create a storage instance for the given backend.
///
/// # Arguments
///
/// * `backend` - The storage backend to use
/// * `prefix` - The prefix for generated edge IDs (e.g., "dep")
///
/// # Errors
///
/// - `Error::Io` if the JSONL file cannot be read
/// - `Error::Storage` for unsupported backends
pub async fn create_storage(
    backend: StorageBackend,
    prefix: String,
) -> Result<Box<dyn DependencyStore>> {
    match backend {
        StorageBackend::InMemory => Ok(in_memory::new_in_memory_storage(prefix)),
        StorageBackend::Jsonl(path) => {
            let inner = if path.exists() {
                let (inner, warnings) = in_memory::load_inner(&path, prefix.clone()).await?;
                for warning in &warnings {
                    tracing::warn!(warning = ?warning, "JSONL load warning");
                }
                inner
            } else {
                in_memory::InMemoryStorageInner::new(prefix.clone())
            };
            Ok(Box::new(JsonlBackedStorage {
                inner: Arc::new(Mutex::new(inner)),
                path,
                prefix,
                save_lock: Mutex::new(()),
            }))
        }
        StorageBackend::PostgreSQL(_conn_str) => Err(crate::error::StorageError::Unavailable(
            "PostgreSQL storage backend not yet implemented".to_string(),
        )
        .into()),
    }
}

// ========== Test Utilities ==========

/// A store whose every operation fails with `StorageError::Unavailable`.
///
/// Useful for checking that callers surface infrastructure failures as
/// fatal errors rather than rejections. Available under `#[cfg(test)]` or
/// the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct FailingStorage;

#[cfg(any(test, feature = "test-util"))]
impl FailingStorage {
    /// Create a new FailingStorage instance.
    pub fn new() -> Self {
        Self
    }

    fn unavailable<T>() -> Result<T> {
        Err(crate::error::StorageError::Unavailable("store offline".to_string()).into())
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl DependencyStore for FailingStorage {
    async fn insert(&self, _new: NewDependency) -> Result<DependencyEdge> {
        Self::unavailable()
    }

    async fn get(&self, _id: &DependencyId) -> Result<Option<DependencyEdge>> {
        Self::unavailable()
    }

    async fn update_kind(
        &self,
        _id: &DependencyId,
        _kind: DependencyKind,
    ) -> Result<DependencyEdge> {
        Self::unavailable()
    }

    async fn delete(&self, _id: &DependencyId) -> Result<DependencyEdge> {
        Self::unavailable()
    }

    async fn delete_all_for_entity(&self, _entity: &EntityRef) -> Result<usize> {
        Self::unavailable()
    }

    async fn outgoing(&self, _entity: &EntityRef) -> Result<Vec<DependencyEdge>> {
        Self::unavailable()
    }

    async fn incoming(&self, _entity: &EntityRef) -> Result<Vec<DependencyEdge>> {
        Self::unavailable()
    }

    async fn exists(&self, _from: &EntityRef, _to: &EntityRef) -> Result<bool> {
        Self::unavailable()
    }

    async fn import_edges(&self, _edges: Vec<DependencyEdge>) -> Result<usize> {
        Self::unavailable()
    }

    async fn export_all(&self) -> Result<Vec<DependencyEdge>> {
        Self::unavailable()
    }

    async fn save(&self) -> Result<()> {
        Self::unavailable()
    }

    async fn reload(&self) -> Result<()> {
        Self::unavailable()
    }
}
