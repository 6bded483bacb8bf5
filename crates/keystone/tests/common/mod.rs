//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use keystone::catalog::{EntityCatalog, EntityRecord};
use keystone::domain::{EntityRef, EntityType};
use keystone::engine::{DependencyEngine, EngineSettings};
use keystone::storage::in_memory::new_in_memory_storage;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

/// Run the keystone binary in the specified directory
pub fn run_keystone_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_keystone"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("KEYSTONE_ASCII", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute keystone binary")
}

/// Parse a `YYYY-MM-DD` date
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

/// A task record scheduled between `start` and `due`
pub fn task_record(id: &str, start: &str, due: &str) -> EntityRecord {
    EntityRecord {
        entity_type: EntityType::Task,
        id: id.to_string(),
        name: format!("Task {id}"),
        start_date: Some(date(start)),
        end_date: None,
        due_date: Some(date(due)),
    }
}

/// A project record scheduled between `start` and `end`
pub fn project_record(id: &str, start: &str, end: &str) -> EntityRecord {
    EntityRecord {
        entity_type: EntityType::Project,
        id: id.to_string(),
        name: format!("Project {id}"),
        start_date: Some(date(start)),
        end_date: Some(date(end)),
        due_date: None,
    }
}

/// Engine over a fresh in-memory store and the given entity records
pub fn engine_with(records: Vec<EntityRecord>) -> DependencyEngine {
    let store = new_in_memory_storage("dep".to_string());
    DependencyEngine::with_lookup(
        Arc::from(store),
        EntityCatalog::from_records(records),
        EngineSettings::default(),
    )
}

/// Engine with no scheduled entities
pub fn empty_engine() -> DependencyEngine {
    engine_with(Vec::new())
}

/// Shorthand for a task reference
pub fn task(id: &str) -> EntityRef {
    EntityRef::task(id)
}
