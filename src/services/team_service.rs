use tracing::info;
use validator::Validate;

use crate::{
    dao::session_repository::SessionRepository,
    dto::team::TeamInput,
    error::GameError,
    state::game::Team,
};

/// Registered teams in turn order.
pub fn list_teams(repository: &SessionRepository) -> Vec<Team> {
    repository.load_roster()
}

/// Register a team at the end of the turn order.
pub fn add_team(repository: &SessionRepository, input: TeamInput) -> Result<Vec<Team>, GameError> {
    input.validate()?;
    ensure_roster_editable(repository)?;

    let name = input.trimmed();
    let mut teams = repository.load_roster();
    if teams.iter().any(|team| team.same_name(name)) {
        return Err(GameError::InvalidInput(format!(
            "team `{name}` is already registered"
        )));
    }

    teams.push(Team::new(name));
    repository.save_roster(&teams)?;
    info!(team = %name, count = teams.len(), "team added");
    Ok(teams)
}

/// Remove a team, matching its name case-insensitively.
pub fn remove_team(repository: &SessionRepository, name: &str) -> Result<Vec<Team>, GameError> {
    ensure_roster_editable(repository)?;

    let mut teams = repository.load_roster();
    let Some(index) = teams.iter().position(|team| team.same_name(name)) else {
        return Err(GameError::InvalidInput(format!(
            "team `{}` is not registered",
            name.trim()
        )));
    };

    let removed = teams.remove(index);
    repository.save_roster(&teams)?;
    info!(team = %removed.name, count = teams.len(), "team removed");
    Ok(teams)
}

fn ensure_roster_editable(repository: &SessionRepository) -> Result<(), GameError> {
    if repository.has_session() {
        return Err(GameError::InvalidState(
            "teams cannot change once a game has started; reset first".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{dao::kv_store::MemoryStore, state::game::fixtures};

    fn repository() -> SessionRepository {
        SessionRepository::new(Arc::new(MemoryStore::new()))
    }

    fn names(teams: &[Team]) -> Vec<&str> {
        teams.iter().map(|team| team.name.as_str()).collect()
    }

    #[test]
    fn teams_keep_insertion_order() {
        let repository = repository();
        add_team(&repository, TeamInput::new("  Rockers ")).unwrap();
        let teams = add_team(&repository, TeamInput::new("Crooners")).unwrap();
        assert_eq!(names(&teams), ["Rockers", "Crooners"]);
        assert_eq!(list_teams(&repository), teams);
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let repository = repository();
        add_team(&repository, TeamInput::new("Rockers")).unwrap();
        let err = add_team(&repository, TeamInput::new("rockers ")).unwrap_err();
        assert!(matches!(err, GameError::InvalidInput(_)));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let repository = repository();
        assert!(matches!(
            add_team(&repository, TeamInput::new("   ")),
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            add_team(&repository, TeamInput::new("x".repeat(41))),
            Err(GameError::InvalidInput(_))
        ));
    }

    #[test]
    fn removal_matches_case_insensitively() {
        let repository = repository();
        add_team(&repository, TeamInput::new("Rockers")).unwrap();
        add_team(&repository, TeamInput::new("Crooners")).unwrap();

        let teams = remove_team(&repository, "ROCKERS").unwrap();
        assert_eq!(names(&teams), ["Crooners"]);
        assert!(remove_team(&repository, "Rockers").is_err());
    }

    #[test]
    fn roster_is_frozen_while_a_session_exists() {
        let repository = repository();
        add_team(&repository, TeamInput::new("Rockers")).unwrap();
        repository
            .save_session(&fixtures::session(&["Rockers"], &[1990]))
            .unwrap();

        assert!(matches!(
            add_team(&repository, TeamInput::new("Crooners")),
            Err(GameError::InvalidState(_))
        ));
        assert!(matches!(
            remove_team(&repository, "Rockers"),
            Err(GameError::InvalidState(_))
        ));
    }
}
