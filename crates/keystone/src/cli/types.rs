//! CLI value enums and domain type conversions.
//!
//! This module contains the value enums used for CLI argument parsing
//! and their conversions to/from domain types.

use clap::ValueEnum;

use crate::domain::{DependencyKind, EdgeDirection};

/// Dependency kind for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyKindArg {
    /// `from` starts after `to` finishes
    #[default]
    #[value(name = "finish-to-start", alias = "fs")]
    FinishToStart,
    /// `from` starts after `to` starts
    #[value(name = "start-to-start", alias = "ss")]
    StartToStart,
    /// `from` finishes after `to` finishes
    #[value(name = "finish-to-finish", alias = "ff")]
    FinishToFinish,
    /// `from` finishes after `to` starts
    #[value(name = "start-to-finish", alias = "sf")]
    StartToFinish,
}

impl std::fmt::Display for DependencyKindArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DependencyKind::from(*self))
    }
}

impl From<DependencyKindArg> for DependencyKind {
    fn from(arg: DependencyKindArg) -> Self {
        match arg {
            DependencyKindArg::FinishToStart => DependencyKind::FinishToStart,
            DependencyKindArg::StartToStart => DependencyKind::StartToStart,
            DependencyKindArg::FinishToFinish => DependencyKind::FinishToFinish,
            DependencyKindArg::StartToFinish => DependencyKind::StartToFinish,
        }
    }
}

/// Edge direction for `dep list`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionArg {
    /// What the entity depends on
    #[default]
    Outgoing,
    /// What depends on the entity
    Incoming,
    /// Both
    Both,
}

impl From<DirectionArg> for EdgeDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Outgoing => EdgeDirection::Outgoing,
            DirectionArg::Incoming => EdgeDirection::Incoming,
            DirectionArg::Both => EdgeDirection::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::fs(DependencyKindArg::FinishToStart, DependencyKind::FinishToStart)]
    #[case::ss(DependencyKindArg::StartToStart, DependencyKind::StartToStart)]
    #[case::ff(DependencyKindArg::FinishToFinish, DependencyKind::FinishToFinish)]
    #[case::sf(DependencyKindArg::StartToFinish, DependencyKind::StartToFinish)]
    fn test_kind_conversion_and_display(#[case] arg: DependencyKindArg, #[case] kind: DependencyKind) {
        assert_eq!(DependencyKind::from(arg), kind);
        assert_eq!(arg.to_string(), kind.as_str());
    }

    #[test]
    fn test_kind_aliases_parse() {
        assert_eq!(
            DependencyKindArg::from_str("ss", true).unwrap(),
            DependencyKindArg::StartToStart
        );
        assert_eq!(
            DependencyKindArg::from_str("start-to-finish", true).unwrap(),
            DependencyKindArg::StartToFinish
        );
    }
}
