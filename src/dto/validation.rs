//! Validation helpers for player input.

use validator::ValidationError;

/// Longest accepted team name, in characters.
pub const MAX_TEAM_NAME_CHARS: usize = 40;

/// Validates that a team name is non-blank and at most [`MAX_TEAM_NAME_CHARS`] characters.
///
/// Surrounding whitespace is ignored.
pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("team_name_blank");
        err.message = Some("Team name must not be empty".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_TEAM_NAME_CHARS {
        let mut err = ValidationError::new("team_name_length");
        err.message = Some(
            format!("Team name must be at most {MAX_TEAM_NAME_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("team_name_format");
        err.message = Some("Team name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_name_valid() {
        assert!(validate_team_name("The Beatles").is_ok());
        assert!(validate_team_name("  padded  ").is_ok());
        assert!(validate_team_name(&"é".repeat(40)).is_ok());
    }

    #[test]
    fn test_validate_team_name_invalid_length() {
        assert!(validate_team_name("").is_err());
        assert!(validate_team_name("   ").is_err());
        assert!(validate_team_name(&"x".repeat(41)).is_err());
    }

    #[test]
    fn test_validate_team_name_invalid_format() {
        assert!(validate_team_name("tab\tname").is_err());
    }
}
