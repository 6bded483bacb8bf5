//! Implementation of the `init` command.
//!
//! This module handles initialization of a new keystone repository, creating
//! the `.keystone/` directory structure with configuration and data files.

use crate::config::{
    validate_prefix, KeystoneConfig, CONFIG_FILE_NAME, DEPENDENCIES_FILE_NAME,
    ENTITIES_FILE_NAME, KEYSTONE_DIR_NAME,
};
use crate::error::{ConfigError, Result};
use crate::id_generation::DEFAULT_EDGE_PREFIX;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Name of the gitignore file within .keystone
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the keystone root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created keystone directory
    pub keystone_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created dependencies file
    pub dependencies_file: PathBuf,
    /// Path to the created entities file
    pub entities_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
    /// The prefix used for edge IDs
    pub prefix: String,
}

/// Initialize a new keystone repository in the given directory.
///
/// # Arguments
///
/// * `base_dir` - The base directory where `.keystone/` will be created
/// * `prefix` - Optional edge ID prefix (defaults to "dep")
///
/// # Errors
///
/// Returns an error if:
/// - The `.keystone/` directory already exists
/// - The prefix is invalid
/// - File system operations fail
pub async fn init(base_dir: &Path, prefix: Option<&str>) -> Result<InitResult> {
    let prefix = prefix.unwrap_or(DEFAULT_EDGE_PREFIX).trim();
    validate_prefix(prefix)?;

    let keystone_dir = base_dir.join(KEYSTONE_DIR_NAME);
    if keystone_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(KEYSTONE_DIR_NAME.to_string()).into());
    }

    fs::create_dir_all(&keystone_dir).await?;

    let config_file = keystone_dir.join(CONFIG_FILE_NAME);
    KeystoneConfig::new(prefix).save(&config_file).await?;

    let dependencies_file = keystone_dir.join(DEPENDENCIES_FILE_NAME);
    fs::write(&dependencies_file, "").await?;

    let entities_file = keystone_dir.join(ENTITIES_FILE_NAME);
    fs::write(&entities_file, "").await?;

    let gitignore_file = keystone_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_content = "\
# Keystone scratch files
# dependencies.jsonl should be tracked; entities.jsonl is a generated export
*.tmp
entities.jsonl
";
    fs::write(&gitignore_file, gitignore_content).await?;

    info!(dir = %keystone_dir.display(), prefix, "Initialized keystone repository");

    Ok(InitResult {
        keystone_dir,
        config_file,
        dependencies_file,
        entities_file,
        gitignore_file,
        prefix: prefix.to_string(),
    })
}

/// Returns `true` if the `.keystone/` directory exists.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(KEYSTONE_DIR_NAME).exists()
}

/// Find the keystone root directory by searching up the directory tree.
///
/// Starts from the given directory and walks parent directories until a
/// `.keystone/` directory is found, the filesystem root is reached, or
/// [`MAX_TRAVERSAL_DEPTH`] levels were checked.
pub fn find_keystone_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(KEYSTONE_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_directory_structure() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), None).await.unwrap();

        assert!(result.keystone_dir.exists());
        assert!(result.config_file.exists());
        assert!(result.dependencies_file.exists());
        assert!(result.entities_file.exists());
        assert!(result.gitignore_file.exists());
        assert_eq!(result.prefix, DEFAULT_EDGE_PREFIX);
    }

    #[tokio::test]
    async fn test_init_with_custom_prefix() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), Some(" link ")).await.unwrap();
        assert_eq!(result.prefix, "link");

        let config = KeystoneConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config.edge_prefix, "link");
    }

    #[tokio::test]
    async fn test_init_fails_if_already_initialized() {
        let temp_dir = TempDir::new().unwrap();

        init(temp_dir.path(), None).await.unwrap();
        let err = init(temp_dir.path(), None).await.unwrap_err();

        assert!(err.to_string().to_lowercase().contains("already initialized"));
    }

    #[tokio::test]
    async fn test_init_fails_with_invalid_prefix() {
        let temp_dir = TempDir::new().unwrap();

        let err = init(temp_dir.path(), Some("a")).await.unwrap_err();
        assert!(err.to_string().contains("at least 2"));
        assert!(!is_initialized(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_init_creates_empty_data_files() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), None).await.unwrap();

        for path in [&result.dependencies_file, &result.entities_file] {
            let content = tokio::fs::read_to_string(path).await.unwrap();
            assert!(content.is_empty());
        }
    }

    #[test]
    fn test_find_keystone_root_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(KEYSTONE_DIR_NAME)).unwrap();

        let sub_dir = temp_dir.path().join("sub").join("nested");
        std::fs::create_dir_all(&sub_dir).unwrap();

        assert_eq!(
            find_keystone_root(&sub_dir),
            Some(temp_dir.path().to_path_buf())
        );
        assert!(is_initialized(temp_dir.path()));
    }

    #[test]
    fn test_find_keystone_root_not_found() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_keystone_root(temp_dir.path()).is_none());
    }
}
