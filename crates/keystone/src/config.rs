//! Configuration for a keystone repository.
//!
//! Stored as YAML in `.keystone/config.yaml`:
//!
//! ```yaml
//! edge-prefix: dep
//! storage:
//!   backend: jsonl
//!   data_file: .keystone/dependencies.jsonl
//! entities_file: .keystone/entities.jsonl
//! limits:
//!   max_depth: 256
//!   max_edges: 10000
//! revalidate_on_kind_change: false
//! ```

use crate::engine::EngineSettings;
use crate::error::{ConfigError, Result};
use crate::graph::TraversalLimits;
use crate::id_generation::DEFAULT_EDGE_PREFIX;
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Name of the keystone directory
pub const KEYSTONE_DIR_NAME: &str = ".keystone";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the dependencies data file
pub const DEPENDENCIES_FILE_NAME: &str = "dependencies.jsonl";

/// Name of the entity export file
pub const ENTITIES_FILE_NAME: &str = "entities.jsonl";

/// Minimum prefix length
pub const MIN_PREFIX_LENGTH: usize = 2;

/// Maximum prefix length
pub const MAX_PREFIX_LENGTH: usize = 20;

/// Ephemeral storage, nothing written to disk
pub const BACKEND_MEMORY: &str = "memory";

/// In-memory storage saved to `data_file`
pub const BACKEND_JSONL: &str = "jsonl";

/// Relational storage, `data_file` holds the connection string
pub const BACKEND_POSTGRESQL: &str = "postgresql";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeystoneConfig {
    /// Edge ID prefix (e.g., "dep" for "dep-k3x9")
    #[serde(rename = "edge-prefix", default = "default_prefix")]
    pub edge_prefix: String,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Path to the hierarchy export used for dates and names
    #[serde(default = "default_entities_file")]
    pub entities_file: String,

    /// Traversal ceilings
    #[serde(default)]
    pub limits: TraversalLimits,

    /// Re-run the scheduling check when an edge's kind changes
    #[serde(default)]
    pub revalidate_on_kind_change: bool,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage backend type: "memory", "jsonl" or "postgresql"
    pub backend: String,

    /// Path to the data file, relative to the repository root
    pub data_file: String,
}

fn default_prefix() -> String {
    DEFAULT_EDGE_PREFIX.to_string()
}

fn default_entities_file() -> String {
    format!("{KEYSTONE_DIR_NAME}/{ENTITIES_FILE_NAME}")
}

impl KeystoneConfig {
    /// Create a new configuration with the given edge prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            edge_prefix: prefix.to_string(),
            storage: StorageConfig {
                backend: BACKEND_JSONL.to_string(),
                data_file: format!("{KEYSTONE_DIR_NAME}/{DEPENDENCIES_FILE_NAME}"),
            },
            entities_file: default_entities_file(),
            limits: TraversalLimits::default(),
            revalidate_on_kind_change: false,
        }
    }

    /// Load and validate configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Yaml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::Yaml(e.to_string()))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check every value, reporting the first invalid one.
    pub fn validate(&self) -> Result<()> {
        validate_prefix(&self.edge_prefix)?;

        match self.storage.backend.as_str() {
            BACKEND_MEMORY | BACKEND_JSONL | BACKEND_POSTGRESQL => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown storage backend '{other}'. Expected memory, jsonl or postgresql"
                ))
                .into());
            }
        }

        if self.storage.backend != BACKEND_MEMORY && self.storage.data_file.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.data_file cannot be empty".to_string()).into());
        }

        if self.limits.max_depth == Some(0) {
            return Err(ConfigError::Invalid("limits.max_depth must be at least 1".to_string()).into());
        }
        if self.limits.max_edges == Some(0) {
            return Err(ConfigError::Invalid("limits.max_edges must be at least 1".to_string()).into());
        }

        Ok(())
    }

    /// Storage backend, with file paths resolved against `root_dir`.
    pub fn backend(&self, root_dir: &Path) -> Result<StorageBackend> {
        match self.storage.backend.as_str() {
            BACKEND_MEMORY => Ok(StorageBackend::InMemory),
            BACKEND_JSONL => Ok(StorageBackend::Jsonl(root_dir.join(&self.storage.data_file))),
            BACKEND_POSTGRESQL => Ok(StorageBackend::PostgreSQL(self.storage.data_file.clone())),
            other => Err(ConfigError::Invalid(format!("Unknown storage backend '{other}'")).into()),
        }
    }

    /// Engine settings derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            limits: self.limits,
            revalidate_on_kind_change: self.revalidate_on_kind_change,
        }
    }
}

impl Default for KeystoneConfig {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_PREFIX)
    }
}

/// Validate edge ID prefix format.
///
/// Requirements:
/// - 2-20 characters
/// - Alphanumeric only (letters and digits)
///
/// Note: Expects pre-trimmed input.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() < MIN_PREFIX_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "Prefix must be at least {MIN_PREFIX_LENGTH} characters"
        ))
        .into());
    }

    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "Prefix cannot exceed {MAX_PREFIX_LENGTH} characters"
        ))
        .into());
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Invalid(
            "Prefix must contain only alphanumeric characters".to_string(),
        )
        .into());
    }

    Ok(())
}
