//! Hash-based ID generation for dependency edges.
//!
//! Edge IDs have the form `{prefix}-{hash}` (e.g. `dep-k3x9`), where the hash
//! is a base36 encoding of a SHA256 digest over the edge endpoints, its kind,
//! the current timestamp and a collision nonce. The hash length grows with
//! the number of stored edges (4-6 characters).
//!
//! # Example
//!
//! ```
//! use keystone::domain::{DependencyKind, EntityRef};
//! use keystone::id_generation::IdGenerator;
//!
//! let mut generator = IdGenerator::new("dep", 0);
//! let id = generator
//!     .generate(&EntityRef::task("T1"), &EntityRef::task("T2"), DependencyKind::FinishToStart)
//!     .unwrap();
//! assert!(id.starts_with("dep-"));
//! ```

use crate::domain::{DependencyKind, EntityRef};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Default prefix for dependency edge IDs.
pub const DEFAULT_EDGE_PREFIX: &str = "dep";

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;
const MAX_ID_LENGTH: usize = 6;

/// Errors that can occur during ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique ID after exhausting all nonces and length increases
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Nonces tried at the longest length
        attempts: u32,
    },

    /// Invalid length parameter
    #[error("Length must be greater than 0")]
    InvalidLength,
}

/// Hash-based edge ID generator with collision detection.
///
/// Holds the set of IDs already in use; callers register loaded IDs with
/// [`IdGenerator::register_id`] and release deleted ones with
/// [`IdGenerator::release_id`].
#[derive(Debug)]
pub struct IdGenerator {
    prefix: String,
    edge_count: usize,
    existing_ids: HashSet<String>,
}

impl IdGenerator {
    /// Create a generator for a store currently holding `edge_count` edges.
    pub fn new(prefix: impl Into<String>, edge_count: usize) -> Self {
        Self {
            prefix: prefix.into(),
            edge_count,
            existing_ids: HashSet::new(),
        }
    }

    /// Register an existing ID to prevent collisions
    pub fn register_id(&mut self, id: impl Into<String>) {
        self.existing_ids.insert(id.into());
        self.edge_count = self.edge_count.max(self.existing_ids.len());
    }

    /// Forget an ID after its edge was deleted.
    pub fn release_id(&mut self, id: &str) {
        if self.existing_ids.remove(id) {
            self.edge_count = self.edge_count.saturating_sub(1);
        }
    }

    /// Generate a new unique ID for an edge.
    ///
    /// # Errors
    ///
    /// Returns an error if every nonce collides at the maximum length.
    pub fn generate(
        &mut self,
        from: &EntityRef,
        to: &EntityRef,
        kind: DependencyKind,
    ) -> Result<String, IdGenerationError> {
        let mut id_length = self.adaptive_length();

        loop {
            for nonce in 0..MAX_NONCE {
                let id = self.hash_id(from, to, kind, nonce, id_length)?;
                if !self.existing_ids.contains(&id) {
                    if nonce > 0 {
                        debug!(nonce, id_length, "Generated unique edge ID after collision retries");
                    }
                    self.existing_ids.insert(id.clone());
                    self.edge_count += 1;
                    return Ok(id);
                }
            }

            if id_length >= MAX_ID_LENGTH {
                return Err(IdGenerationError::CollisionExhausted {
                    attempts: MAX_NONCE,
                });
            }

            warn!(
                id_length,
                max_nonce = MAX_NONCE,
                "All nonces exhausted, increasing edge ID length to {}",
                id_length + 1
            );
            id_length += 1;
        }
    }

    fn hash_id(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: DependencyKind,
        nonce: u32,
        length: usize,
    ) -> Result<String, IdGenerationError> {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let content = format!("{from}|{to}|{kind}|{timestamp}|{nonce}");

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let hash_bytes = hasher.finalize();

        let hash_str = encode_base36(&hash_bytes[..8], length)?;
        Ok(format!("{}-{}", self.prefix, hash_str))
    }

    /// - 0-500 edges: 4 chars
    /// - 501-1,500: 5 chars
    /// - 1,500+: 6 chars
    fn adaptive_length(&self) -> usize {
        match self.edge_count {
            0..=500 => 4,
            501..=1500 => 5,
            _ => 6,
        }
    }
}

/// Encode up to 8 bytes as a fixed-length base36 string.
fn encode_base36(bytes: &[u8], length: usize) -> Result<String, IdGenerationError> {
    if length == 0 {
        return Err(IdGenerationError::InvalidLength);
    }

    let mut num: u64 = 0;
    for &byte in bytes {
        num = num.wrapping_shl(8).wrapping_add(u64::from(byte));
    }

    let mut result = Vec::with_capacity(length);
    let mut n = num;
    while result.len() < length {
        result.push(BASE36_CHARS[(n % 36) as usize] as char);
        n /= 36;
    }
    result.reverse();

    Ok(result.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs() -> (EntityRef, EntityRef) {
        (EntityRef::task("A"), EntityRef::task("B"))
    }

    #[test]
    fn test_generate_has_prefix_and_length() {
        let (from, to) = refs();
        let mut generator = IdGenerator::new("dep", 0);
        let id = generator
            .generate(&from, &to, DependencyKind::FinishToStart)
            .unwrap();
        assert!(id.starts_with("dep-"));
        assert_eq!(id.len(), "dep-".len() + 4);
        assert!(id[4..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_is_unique() {
        let (from, to) = refs();
        let mut generator = IdGenerator::new("dep", 0);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let id = generator
                .generate(&from, &to, DependencyKind::StartToStart)
                .unwrap();
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn test_adaptive_length_grows() {
        assert_eq!(IdGenerator::new("dep", 10).adaptive_length(), 4);
        assert_eq!(IdGenerator::new("dep", 800).adaptive_length(), 5);
        assert_eq!(IdGenerator::new("dep", 5000).adaptive_length(), 6);
    }

    #[test]
    fn test_release_id_allows_reuse_tracking() {
        let mut generator = IdGenerator::new("dep", 0);
        generator.register_id("dep-aaaa");
        assert!(generator.existing_ids.contains("dep-aaaa"));
        generator.release_id("dep-aaaa");
        assert!(!generator.existing_ids.contains("dep-aaaa"));
        assert_eq!(generator.edge_count, 0);
    }

    #[test]
    fn test_encode_base36_rejects_zero_length() {
        assert!(matches!(
            encode_base36(&[1, 2, 3], 0),
            Err(IdGenerationError::InvalidLength)
        ));
    }
}
