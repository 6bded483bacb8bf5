//! Application context for CLI command execution.
//!
//! This module provides the `App` struct that loads configuration, builds
//! the storage backend and entity catalog, and wires them into a
//! [`DependencyEngine`].
//!
//! # Example
//!
//! ```no_run
//! use keystone::app::App;
//! use keystone::domain::EntityRef;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let entity: EntityRef = "task:T1".parse().map_err(anyhow::Error::msg)?;
//!     let edges = app.engine().chain(&entity).await?;
//!     println!("{} edges", edges.len());
//!     Ok(())
//! }
//! ```

use crate::catalog::EntityCatalog;
use crate::commands::init::find_keystone_root;
use crate::config::{KeystoneConfig, CONFIG_FILE_NAME, KEYSTONE_DIR_NAME};
use crate::engine::DependencyEngine;
use crate::error::{ConfigError, Result};
use crate::storage::create_storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Application context for CLI operations.
#[derive(Debug)]
pub struct App {
    engine: DependencyEngine,

    /// Path to the keystone directory (.keystone)
    keystone_dir: PathBuf,

    config: KeystoneConfig,
}

impl App {
    /// Create an App instance from the given working directory.
    ///
    /// Searches up the directory tree to find a `.keystone/` directory,
    /// loads configuration, and initializes storage and the entity catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No keystone repository is found in the directory tree
    /// - Configuration cannot be loaded
    /// - Storage initialization fails
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_keystone_root(working_dir).ok_or(ConfigError::NotInitialized)?;

        let keystone_dir = root_dir.join(KEYSTONE_DIR_NAME);
        let config = KeystoneConfig::load(&keystone_dir.join(CONFIG_FILE_NAME)).await?;

        let backend = config.backend(&root_dir)?;
        let store = create_storage(backend, config.edge_prefix.clone()).await?;
        let catalog = EntityCatalog::load(&root_dir.join(&config.entities_file)).await?;

        debug!(
            root = %root_dir.display(),
            backend = %config.storage.backend,
            entities = catalog.len(),
            "Opened keystone repository"
        );

        let engine =
            DependencyEngine::with_lookup(Arc::from(store), catalog, config.engine_settings());

        Ok(Self {
            engine,
            keystone_dir,
            config,
        })
    }

    /// The dependency engine.
    pub fn engine(&self) -> &DependencyEngine {
        &self.engine
    }

    /// Loaded configuration.
    pub fn config(&self) -> &KeystoneConfig {
        &self.config
    }

    /// Get the path to the keystone directory.
    pub fn keystone_dir(&self) -> &Path {
        &self.keystone_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use crate::domain::{DependencyKind, EntityRef};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_app_from_initialized_directory() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), Some("test")).await.unwrap();

        let app = App::from_directory(temp_dir.path()).await.unwrap();

        assert_eq!(app.config().edge_prefix, "test");
        assert!(app.keystone_dir().ends_with(".keystone"));
    }

    #[tokio::test]
    async fn test_app_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), Some("proj")).await.unwrap();

        let sub_dir = temp_dir.path().join("src").join("lib");
        std::fs::create_dir_all(&sub_dir).unwrap();

        let app = App::from_directory(&sub_dir).await.unwrap();
        assert_eq!(app.config().edge_prefix, "proj");
    }

    #[tokio::test]
    async fn test_app_from_uninitialized_directory() {
        let temp_dir = TempDir::new().unwrap();

        let err = App::from_directory(temp_dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("Not a keystone repository"));
    }

    #[tokio::test]
    async fn test_edges_persist_between_app_instances() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), None).await.unwrap();

        let app = App::from_directory(temp_dir.path()).await.unwrap();
        let edge = app
            .engine()
            .create(
                &EntityRef::task("T1"),
                &EntityRef::task("T2"),
                DependencyKind::FinishToStart,
            )
            .await
            .unwrap();
        drop(app);

        let reopened = App::from_directory(temp_dir.path()).await.unwrap();
        let chain = reopened.engine().chain(&EntityRef::task("T1")).await.unwrap();
        assert_eq!(chain, vec![edge]);
    }
}
