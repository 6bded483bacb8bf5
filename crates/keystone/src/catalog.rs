//! Entity lookups: scheduled dates and display names.
//!
//! The hierarchy itself (programs down to subtasks) is owned by another
//! system. Keystone reads an export of it, one [`EntityRecord`] per line of
//! a JSONL file, and answers the two questions the engine asks about an
//! entity: when is it scheduled, and what is it called.

use crate::domain::{DateRange, EntityRef, EntityType};
use crate::error::{Error, Result};
use crate::schedule::DateProvider;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Display name used for entities that cannot be resolved.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Source of human-readable entity names.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Display name of `entity`, or [`UNKNOWN_NAME`] if it can't be found.
    async fn display_name(&self, entity: &EntityRef) -> Result<String>;
}

/// One exported hierarchy entity.
///
/// Which date fields are meaningful depends on the type: tasks and subtasks
/// carry a `due_date`, everything above them an `end_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_type: EntityType,
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl EntityRecord {
    /// Reference to this record.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.id.clone())
    }

    /// Scheduled dates, using the end field that applies to this type.
    pub fn date_range(&self) -> DateRange {
        let end = match self.entity_type {
            EntityType::Task | EntityType::Subtask => self.due_date,
            EntityType::Program
            | EntityType::Project
            | EntityType::Usecase
            | EntityType::UserStory => self.end_date,
        };
        DateRange {
            start: self.start_date,
            end,
        }
    }
}

/// In-memory entity lookup table.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    records: HashMap<EntityRef, EntityRecord>,
}

impl EntityCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from records; later records replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = EntityRecord>) -> Self {
        let mut catalog = Self::new();
        for record in records {
            catalog.insert(record);
        }
        catalog
    }

    /// Add or replace a record.
    pub fn insert(&mut self, record: EntityRecord) {
        self.records.insert(record.entity_ref(), record);
    }

    /// Look up a record.
    pub fn get(&self, entity: &EntityRef) -> Option<&EntityRecord> {
        self.records.get(entity)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the catalog holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load a catalog from a JSONL export.
    ///
    /// A missing file yields an empty catalog. Lines that fail to parse are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file exists but cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Entity file not found, using empty catalog");
            return Ok(Self::new());
        }

        let file = File::open(path).await.map_err(Error::Io)?;
        let mut lines = BufReader::new(file).lines();

        let mut catalog = Self::new();
        let mut line_number = 0usize;
        while let Some(line) = lines.next_line().await.map_err(Error::Io)? {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EntityRecord>(&line) {
                Ok(record) => catalog.insert(record),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        line_number,
                        error = %e,
                        "Skipping malformed entity record"
                    );
                }
            }
        }

        debug!(path = %path.display(), entities = catalog.len(), "Loaded entity catalog");
        Ok(catalog)
    }
}

#[async_trait]
impl DateProvider for EntityCatalog {
    async fn date_range(&self, entity: &EntityRef) -> Result<DateRange> {
        Ok(self
            .get(entity)
            .map(EntityRecord::date_range)
            .unwrap_or_default())
    }
}

#[async_trait]
impl NameResolver for EntityCatalog {
    async fn display_name(&self, entity: &EntityRef) -> Result<String> {
        Ok(self
            .get(entity)
            .map(|record| record.name.clone())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()))
    }
}
