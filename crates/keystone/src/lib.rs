//! Keystone - cross-entity dependency graph engine.
//!
//! Tracks "depends on" edges between entities of a project hierarchy
//! (programs, projects, usecases, user stories, tasks, subtasks). Every new
//! edge is checked for self-dependency, cycles, scheduling conflicts and
//! duplicates before it is stored.
//!
//! The crate provides both a CLI application and a library; the library
//! entry point is [`engine::DependencyEngine`].

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod catalog;
pub mod domain;
pub mod engine;
pub mod error;
pub mod graph;
pub mod id_generation;
pub mod schedule;
pub mod storage;

// Public CLI module (needed by binary)
pub mod app;
pub mod cli;
pub mod output;

// Command implementations
pub mod commands;

pub mod config;

pub use error::{Error, Result};
