//! Domain types for the dependency graph engine.
//!
//! Entities live in an external project hierarchy (programs, projects, use
//! cases, user stories, tasks, subtasks). The engine only sees them as
//! `(type, id)` references and stores typed, directed edges between them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of hierarchy entity that can take part in a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Top-level program
    Program,

    /// Project within a program
    Project,

    /// Use case within a project
    Usecase,

    /// User story within a use case
    UserStory,

    /// Task within a user story
    Task,

    /// Subtask within a task
    Subtask,
}

impl EntityType {
    /// All entity types, in hierarchy order.
    pub const ALL: [EntityType; 6] = [
        EntityType::Program,
        EntityType::Project,
        EntityType::Usecase,
        EntityType::UserStory,
        EntityType::Task,
        EntityType::Subtask,
    ];

    /// Canonical lowercase name used in `type:id` references.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Program => "program",
            EntityType::Project => "project",
            EntityType::Usecase => "usecase",
            EntityType::UserStory => "user_story",
            EntityType::Task => "task",
            EntityType::Subtask => "subtask",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    /// Case-insensitive; `_`, `-` and spaces are ignored so `UserStory`,
    /// `user_story` and `user-story` all parse to the same variant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "program" => Ok(EntityType::Program),
            "project" => Ok(EntityType::Project),
            "usecase" => Ok(EntityType::Usecase),
            "userstory" => Ok(EntityType::UserStory),
            "task" => Ok(EntityType::Task),
            "subtask" => Ok(EntityType::Subtask),
            _ => Err(format!(
                "Unknown entity type '{}'. Expected one of: program, project, usecase, user_story, task, subtask",
                s.trim()
            )),
        }
    }
}

/// Reference to a node in the project hierarchy.
///
/// Equality and hashing use the `(entity_type, entity_id)` pair. The text
/// form is `type:id`, e.g. `task:T1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// Type of the referenced entity
    pub entity_type: EntityType,

    /// Opaque identifier, unique within its type
    pub entity_id: String,
}

impl EntityRef {
    /// Create a new entity reference
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    /// Shorthand for a task reference.
    pub fn task(entity_id: impl Into<String>) -> Self {
        Self::new(EntityType::Task, entity_id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

impl FromStr for EntityRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (type_part, id_part) = s.split_once(':').ok_or_else(|| {
            format!("Invalid entity reference '{s}'. Expected format: type:id (e.g. task:T1)")
        })?;

        let entity_type = type_part.parse::<EntityType>()?;
        let entity_id = id_part.trim();
        if entity_id.is_empty() {
            return Err(format!("Entity id cannot be empty in '{s}'"));
        }

        Ok(Self::new(entity_type, entity_id))
    }
}

/// Temporal constraint carried by a dependency edge.
///
/// Borrowed from project-scheduling terminology; the first word refers to
/// the dependency target (`to`), the second to the dependent (`from`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// `from` starts no earlier than `to` finishes
    #[default]
    FinishToStart,

    /// `from` starts no earlier than `to` starts
    StartToStart,

    /// `from` finishes no earlier than `to` finishes
    FinishToFinish,

    /// `from` finishes no earlier than `to` starts
    StartToFinish,
}

impl DependencyKind {
    /// Kebab-case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::FinishToStart => "finish-to-start",
            DependencyKind::StartToStart => "start-to-start",
            DependencyKind::FinishToFinish => "finish-to-finish",
            DependencyKind::StartToFinish => "start-to-finish",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "finish-to-start" | "fs" => Ok(DependencyKind::FinishToStart),
            "start-to-start" | "ss" => Ok(DependencyKind::StartToStart),
            "finish-to-finish" | "ff" => Ok(DependencyKind::FinishToFinish),
            "start-to-finish" | "sf" => Ok(DependencyKind::StartToFinish),
            _ => Err(format!(
                "Unknown dependency kind '{}'. Expected finish-to-start, start-to-start, finish-to-finish or start-to-finish",
                s.trim()
            )),
        }
    }
}

/// Unique identifier for a dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyId(pub String);

impl DependencyId {
    /// Create a new dependency ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DependencyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DependencyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A persisted dependency: `from` depends on `to`.
///
/// `from` cannot be considered ready until the constraint implied by `kind`
/// against `to` is satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Edge identifier
    pub id: DependencyId,

    /// The dependent entity
    pub from: EntityRef,

    /// The entity being depended upon
    pub to: EntityRef,

    /// Temporal constraint between the two
    pub kind: DependencyKind,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --[{}]--> {}", self.from, self.kind, self.to)
    }
}

/// Data for creating a new dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDependency {
    /// The dependent entity
    pub from: EntityRef,

    /// The entity being depended upon
    pub to: EntityRef,

    /// Temporal constraint between the two
    pub kind: DependencyKind,
}

impl NewDependency {
    /// Create a new dependency request
    pub fn new(from: EntityRef, to: EntityRef, kind: DependencyKind) -> Self {
        Self { from, to, kind }
    }
}

/// Scheduled dates of an entity. `None` means unscheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    /// Scheduled start
    pub start: Option<NaiveDate>,

    /// Scheduled end (or due date)
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Create a fully scheduled range
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A range with no known dates.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Returns `true` if neither date is known.
    pub fn is_unknown(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Which edges to return when listing the dependencies of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    /// Edges where the entity is the dependent
    #[default]
    Outgoing,

    /// Edges where the entity is depended upon
    Incoming,

    /// Both directions
    Both,
}
