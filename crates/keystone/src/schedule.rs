//! Scheduling conflict validation.
//!
//! A dependency kind constrains the dates of its two endpoints. The rules
//! compare one date of the dependent (`from`) with one date of the
//! dependency (`to`):
//!
//! | kind             | violated when          |
//! |------------------|------------------------|
//! | finish-to-start  | `from.start < to.end`   |
//! | start-to-start   | `from.start < to.start` |
//! | finish-to-finish | `from.end < to.end`     |
//! | start-to-finish  | `from.end < to.start`   |
//!
//! Equal dates satisfy every rule. When either compared date is missing the
//! edge is treated as unscheduled and never conflicts.

use crate::domain::{DateRange, DependencyKind, EntityRef};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

/// Source of scheduled dates for hierarchy entities.
///
/// Implementations return [`DateRange::unknown`] for entities they cannot
/// find; a missing entity is not an error.
#[async_trait]
pub trait DateProvider: Send + Sync {
    /// Scheduled dates of `entity`.
    async fn date_range(&self, entity: &EntityRef) -> Result<DateRange>;
}

/// Which end of a date range a rule looks at.
#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

impl Bound {
    fn of(self, range: &DateRange) -> Option<NaiveDate> {
        match self {
            Bound::Start => range.start,
            Bound::End => range.end,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Bound::Start => "starts",
            Bound::End => "finishes",
        }
    }
}

/// The `(from, to)` bounds compared by each kind.
fn bounds(kind: DependencyKind) -> (Bound, Bound) {
    match kind {
        DependencyKind::FinishToStart => (Bound::Start, Bound::End),
        DependencyKind::StartToStart => (Bound::Start, Bound::Start),
        DependencyKind::FinishToFinish => (Bound::End, Bound::End),
        DependencyKind::StartToFinish => (Bound::End, Bound::Start),
    }
}

/// Check whether `from -> to` with `kind` violates the endpoints' dates.
///
/// Returns a message naming both compared dates, or `None` when the rule
/// holds or a required date is missing.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use keystone::domain::{DateRange, DependencyKind, EntityRef, EntityType};
/// use keystone::schedule::scheduling_conflict;
///
/// let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
/// let task = EntityRef::task("T1");
/// let project = EntityRef::new(EntityType::Project, "P1");
///
/// let message = scheduling_conflict(
///     &task,
///     &DateRange::new(day(10), day(25)),
///     &project,
///     &DateRange::new(day(1), day(20)),
///     DependencyKind::FinishToStart,
/// );
/// assert_eq!(
///     message.as_deref(),
///     Some("task:T1 starts 2025-01-10, before project:P1 finishes 2025-01-20 (finish-to-start)")
/// );
/// ```
pub fn scheduling_conflict(
    from: &EntityRef,
    from_range: &DateRange,
    to: &EntityRef,
    to_range: &DateRange,
    kind: DependencyKind,
) -> Option<String> {
    let (from_bound, to_bound) = bounds(kind);
    let from_date = from_bound.of(from_range)?;
    let to_date = to_bound.of(to_range)?;

    if from_date >= to_date {
        return None;
    }

    Some(format!(
        "{from} {} {from_date}, before {to} {} {to_date} ({kind})",
        from_bound.verb(),
        to_bound.verb(),
    ))
}

/// Fetch both endpoints' dates and check the edge.
///
/// # Errors
///
/// Propagates failures of the date provider itself.
pub async fn check_edge(
    provider: &dyn DateProvider,
    from: &EntityRef,
    to: &EntityRef,
    kind: DependencyKind,
) -> Result<Option<String>> {
    let from_range = provider.date_range(from).await?;
    let to_range = provider.date_range(to).await?;

    let conflict = scheduling_conflict(from, &from_range, to, &to_range, kind);
    if let Some(message) = &conflict {
        debug!(from = %from, to = %to, kind = %kind, reason = %message, "Scheduling conflict");
    }
    Ok(conflict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityType;
    use rstest::rstest;
    use std::collections::HashMap;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(date(start), date(end))
    }

    fn conflict(kind: DependencyKind, from: DateRange, to: DateRange) -> Option<String> {
        scheduling_conflict(
            &EntityRef::task("T1"),
            &from,
            &EntityRef::new(EntityType::Project, "P1"),
            &to,
            kind,
        )
    }

    #[rstest]
    #[case::fs_after(DependencyKind::FinishToStart, range("2025-02-01", "2025-02-10"), false)]
    #[case::fs_overlap(DependencyKind::FinishToStart, range("2025-01-10", "2025-01-20"), true)]
    #[case::fs_equal(DependencyKind::FinishToStart, range("2025-01-20", "2025-01-30"), false)]
    #[case::ss_before(DependencyKind::StartToStart, range("2024-12-31", "2025-01-30"), true)]
    #[case::ss_equal(DependencyKind::StartToStart, range("2025-01-01", "2025-01-02"), false)]
    #[case::ff_before(DependencyKind::FinishToFinish, range("2025-01-01", "2025-01-19"), true)]
    #[case::ff_equal(DependencyKind::FinishToFinish, range("2025-01-01", "2025-01-20"), false)]
    #[case::sf_before(DependencyKind::StartToFinish, range("2024-12-01", "2024-12-31"), true)]
    #[case::sf_equal(DependencyKind::StartToFinish, range("2024-12-01", "2025-01-01"), false)]
    fn test_rules_against_january_target(
        #[case] kind: DependencyKind,
        #[case] from: DateRange,
        #[case] expected: bool,
    ) {
        let to = range("2025-01-01", "2025-01-20");
        assert_eq!(conflict(kind, from, to).is_some(), expected);
    }

    #[rstest]
    #[case::missing_from_start(
        DependencyKind::FinishToStart,
        DateRange { start: None, end: Some(date("2025-01-02")) },
        range("2025-01-01", "2025-01-20")
    )]
    #[case::missing_to_end(
        DependencyKind::FinishToStart,
        range("2024-01-01", "2024-01-02"),
        DateRange { start: Some(date("2025-01-01")), end: None }
    )]
    #[case::both_unknown(
        DependencyKind::StartToStart,
        DateRange::unknown(),
        DateRange::unknown()
    )]
    fn test_missing_dates_never_conflict(
        #[case] kind: DependencyKind,
        #[case] from: DateRange,
        #[case] to: DateRange,
    ) {
        assert_eq!(conflict(kind, from, to), None);
    }

    #[test]
    fn test_message_names_compared_dates() {
        let message = conflict(
            DependencyKind::FinishToFinish,
            range("2025-01-01", "2025-01-15"),
            range("2025-01-01", "2025-01-20"),
        )
        .unwrap();
        assert_eq!(
            message,
            "task:T1 finishes 2025-01-15, before project:P1 finishes 2025-01-20 (finish-to-finish)"
        );
    }

    struct FixedDates(HashMap<EntityRef, DateRange>);

    #[async_trait]
    impl DateProvider for FixedDates {
        async fn date_range(&self, entity: &EntityRef) -> Result<DateRange> {
            Ok(self.0.get(entity).copied().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_check_edge_uses_provider_dates() {
        let provider = FixedDates(HashMap::from([
            (EntityRef::task("T1"), range("2025-01-10", "2025-01-20")),
            (EntityRef::task("T2"), range("2025-01-01", "2025-01-20")),
        ]));

        let t1 = EntityRef::task("T1");
        let t2 = EntityRef::task("T2");

        let found = check_edge(&provider, &t1, &t2, DependencyKind::FinishToStart)
            .await
            .unwrap();
        assert!(found.is_some());

        // Unknown entity means unknown dates
        let unknown = EntityRef::task("T9");
        let none = check_edge(&provider, &t1, &unknown, DependencyKind::FinishToStart)
            .await
            .unwrap();
        assert_eq!(none, None);
    }
}
