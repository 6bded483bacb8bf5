//! Error types for keystone operations.
//!
//! Validation failures are modelled separately from infrastructure failures:
//! a [`Rejection`] explains why an edge was refused and leaves the graph
//! untouched, while the remaining [`Error`] variants mean the operation
//! could not be carried out at all.

use crate::domain::{DependencyId, EntityRef};
use std::io;
use thiserror::Error;

/// Generic message shown to users for non-rejection failures.
pub const TRY_AGAIN_MESSAGE: &str = "The dependency store is unavailable. Please try again.";

/// Structured reason for refusing a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// An entity cannot depend on itself
    #[error("{entity} cannot depend on itself")]
    SelfDependency {
        /// The entity named on both ends
        entity: EntityRef,
    },

    /// The edge would close a cycle in the dependency graph
    #[error("Circular dependency: {from} -> {to} would create a cycle")]
    CircularDependency {
        /// The dependent entity
        from: EntityRef,
        /// The entity being depended upon
        to: EntityRef,
    },

    /// An edge between the same two entities already exists
    #[error("Dependency already exists: {from} -> {to}")]
    DuplicateEdge {
        /// The dependent entity
        from: EntityRef,
        /// The entity being depended upon
        to: EntityRef,
    },

    /// The entities' date ranges violate the dependency kind
    #[error("Scheduling conflict: {0}")]
    SchedulingConflict(String),
}

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Backend cannot be reached or is not implemented
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Edge ID generation failed
    #[error("ID generation failed: {0}")]
    IdGeneration(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.keystone/` directory was found
    #[error("Not a keystone repository (or any parent). Run 'keystone init' first.")]
    NotInitialized,

    /// `.keystone/` already exists
    #[error("Keystone is already initialized in this directory. Found existing '{0}'")]
    AlreadyInitialized(String),

    /// A configuration value is invalid
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The YAML file could not be parsed or written
    #[error("YAML error: {0}")]
    Yaml(String),
}

/// The error type for keystone operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The edge was refused by validation
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// No edge with the given ID exists
    #[error("Dependency not found: {0}")]
    DependencyNotFound(DependencyId),

    /// A traversal grew past a configured ceiling
    #[error("Traversal limit exceeded: {limit} of {value}")]
    TraversalLimitExceeded {
        /// Which ceiling was hit ("depth" or "edges")
        limit: &'static str,
        /// The configured ceiling
        value: usize,
    },

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error occurred
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this is a validation rejection rather than a failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Rejected(_))
    }

    /// Returns the rejection, if this error is one.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Error::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    /// Message suitable for end users.
    ///
    /// Rejections and input errors carry their reason; infrastructure
    /// failures collapse to [`TRY_AGAIN_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            Error::Rejected(_)
            | Error::DependencyNotFound(_)
            | Error::TraversalLimitExceeded { .. }
            | Error::Config(_) => self.to_string(),
            Error::Storage(_) | Error::Io(_) | Error::Json(_) => TRY_AGAIN_MESSAGE.to_string(),
        }
    }
}

/// A specialized Result type for keystone operations.
pub type Result<T> = std::result::Result<T, Error>;
