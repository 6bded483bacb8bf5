//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

use crate::domain::{DependencyId, EntityRef};

/// Validate edge ID prefix format.
///
/// Delegates to [`crate::config::validate_prefix`] so the rules live in one
/// place.
pub fn validate_prefix(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    crate::config::validate_prefix(trimmed).map_err(|e| e.to_string())?;
    Ok(trimmed.to_string())
}

/// Parse an entity reference written as `type:id`.
pub fn validate_entity(s: &str) -> Result<EntityRef, String> {
    s.parse::<EntityRef>()
}

/// Validate a dependency edge ID.
///
/// Expected format: `prefix-suffix` with an alphanumeric prefix and suffix,
/// e.g. `dep-k3x9`.
pub fn validate_dependency_id(s: &str) -> Result<DependencyId, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Dependency ID cannot be empty".to_string());
    }

    let Some((prefix, suffix)) = s.split_once('-') else {
        return Err(format!(
            "Invalid dependency ID format: '{}'. Expected format: prefix-suffix (e.g., dep-k3x9)",
            s
        ));
    };

    validate_prefix(prefix).map_err(|e| format!("Invalid dependency ID prefix in '{s}': {e}"))?;

    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Dependency ID suffix must be non-empty and alphanumeric".to_string());
    }

    Ok(DependencyId::new(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityType;
    use rstest::rstest;

    #[rstest]
    #[case::task("task:T1", EntityType::Task, "T1")]
    #[case::user_story("user-story:US-7", EntityType::UserStory, "US-7")]
    #[case::padded(" project:P1 ", EntityType::Project, "P1")]
    fn test_validate_entity_valid(
        #[case] input: &str,
        #[case] entity_type: EntityType,
        #[case] id: &str,
    ) {
        assert_eq!(validate_entity(input).unwrap(), EntityRef::new(entity_type, id));
    }

    #[rstest]
    #[case::no_colon("T1", "Expected format")]
    #[case::empty_id("task:", "cannot be empty")]
    #[case::bad_type("epic:E1", "Unknown entity type")]
    fn test_validate_entity_invalid(#[case] input: &str, #[case] expected: &str) {
        let err = validate_entity(input).unwrap_err();
        assert!(err.contains(expected), "got: {err}");
    }

    #[rstest]
    #[case::simple("dep-k3x9")]
    #[case::custom_prefix("link-00ab")]
    fn test_validate_dependency_id_valid(#[case] input: &str) {
        assert_eq!(validate_dependency_id(input).unwrap().as_str(), input);
    }

    #[rstest]
    #[case::empty("")]
    #[case::no_hyphen("depk3x9")]
    #[case::short_prefix("d-k3x9")]
    #[case::empty_suffix("dep-")]
    #[case::bad_suffix("dep-k3_9")]
    fn test_validate_dependency_id_invalid(#[case] input: &str) {
        assert!(validate_dependency_id(input).is_err());
    }
}
