use validator::{Validate, ValidationErrors};

use crate::dto::validation::validate_team_name;

/// Team name entered during setup.
#[derive(Debug, Clone)]
pub struct TeamInput {
    /// Display name as typed; trimmed before use.
    pub name: String,
}

impl TeamInput {
    /// Wrap a raw name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.name.trim()
    }
}

impl Validate for TeamInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_team_name(&self.name) {
            errors.add("name", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
