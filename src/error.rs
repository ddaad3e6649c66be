use std::fmt;

use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    dto::outcome::Redirect,
    provider::ProviderError,
    state::{AbortError, ApplyError, PlanError},
};

/// Setup step that must be completed before a session can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    /// At least one team must be registered.
    Teams,
    /// A playlist must have been selected.
    Playlist,
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prerequisite::Teams => f.write_str("teams"),
            Prerequisite::Playlist => f.write_str("playlist"),
        }
    }
}

/// Errors returned by game operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// Setup is incomplete.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(Prerequisite),
    /// No track is left in the session's playlist.
    #[error("playlist exhausted")]
    PlaylistExhausted,
    /// The streaming service needs the user to log in.
    #[error("authentication required")]
    AuthenticationRequired,
    /// Invalid input provided by the player.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The streaming service failed.
    #[error("provider error")]
    Provider(#[source] ProviderError),
    /// The persistent store failed.
    #[error("storage unavailable")]
    Storage(#[source] StorageError),
}

impl GameError {
    /// Screen the player should be sent to, for errors that are really navigation.
    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            GameError::MissingPrerequisite(Prerequisite::Teams) => Some(Redirect::TeamSetup),
            GameError::MissingPrerequisite(Prerequisite::Playlist) => {
                Some(Redirect::PlaylistSelection)
            }
            GameError::PlaylistExhausted => Some(Redirect::PlaylistReselection),
            _ => None,
        }
    }
}

impl From<StorageError> for GameError {
    fn from(err: StorageError) -> Self {
        GameError::Storage(err)
    }
}

impl From<ProviderError> for GameError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unauthenticated => GameError::AuthenticationRequired,
            other => GameError::Provider(other),
        }
    }
}

impl From<ValidationErrors> for GameError {
    fn from(err: ValidationErrors) -> Self {
        GameError::InvalidInput(format!("validation failed: {}", err))
    }
}

impl From<PlanError> for GameError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                GameError::InvalidState("state transition already pending".into())
            }
            PlanError::InvalidTransition(invalid) => GameError::InvalidState(invalid.to_string()),
        }
    }
}

impl From<ApplyError> for GameError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => GameError::InvalidState("no transition is pending".into()),
            ApplyError::IdMismatch { .. } => {
                GameError::InvalidState("pending transition does not match".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => GameError::InvalidState(format!(
                "state changed during transition (expected {expected:?}, got {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => GameError::InvalidState(format!(
                "state version mismatch during transition (expected {expected}, got {actual})"
            )),
        }
    }
}

impl From<AbortError> for GameError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => GameError::InvalidState("no pending transition".into()),
            AbortError::IdMismatch { .. } => {
                GameError::InvalidState("transition plan does not match".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prerequisites_redirect_to_setup_screens() {
        assert_eq!(
            GameError::MissingPrerequisite(Prerequisite::Teams).redirect(),
            Some(Redirect::TeamSetup)
        );
        assert_eq!(
            GameError::MissingPrerequisite(Prerequisite::Playlist).redirect(),
            Some(Redirect::PlaylistSelection)
        );
        assert_eq!(GameError::AuthenticationRequired.redirect(), None);
    }

    #[test]
    fn unauthenticated_provider_maps_to_authentication_required() {
        assert!(matches!(
            GameError::from(ProviderError::Unauthenticated),
            GameError::AuthenticationRequired
        ));
        assert!(matches!(
            GameError::from(ProviderError::NoActiveDevice),
            GameError::Provider(_)
        ));
    }
}
