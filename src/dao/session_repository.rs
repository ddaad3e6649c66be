use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{
    dao::{
        models::{
            PlayedTracksEntity, PlaylistEntity, RosterEntity, SESSION_SCHEMA_VERSION,
            SessionEntity,
        },
        storage::{KeyValueStore, StorageError, StorageResult},
    },
    state::game::{Playlist, SessionState, Team},
};

/// Streaming-service credentials. Survives a reset.
pub const AUTH_TOKENS_KEY: &str = "auth_tokens";
/// Team names registered during setup.
pub const ROSTER_KEY: &str = "team_roster";
/// Shuffled playlist chosen for the next or current session.
pub const SELECTED_PLAYLIST_KEY: &str = "selected_playlist";
/// The versioned session record.
pub const SESSION_KEY: &str = "session";
/// Track ids already presented on this device.
pub const PLAYED_TRACKS_KEY: &str = "played_tracks";

/// Typed access to the game data held in a [`KeyValueStore`].
///
/// Reads never fail: absent or malformed values come back as `None`/defaults.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SessionRepository {
    /// Wrap a store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Registered teams in turn order; empty when none were saved.
    pub fn load_roster(&self) -> Vec<Team> {
        self.read::<RosterEntity>(ROSTER_KEY)
            .map(|roster| roster.teams.into_iter().map(Team::new).collect())
            .unwrap_or_default()
    }

    /// Replace the registered teams.
    pub fn save_roster(&self, teams: &[Team]) -> StorageResult<()> {
        let roster = RosterEntity {
            teams: teams.iter().map(|team| team.name.clone()).collect(),
        };
        self.write(ROSTER_KEY, &roster)
    }

    /// Playlist selected for play, already shuffled.
    pub fn load_selected_playlist(&self) -> Option<Playlist> {
        self.read::<PlaylistEntity>(SELECTED_PLAYLIST_KEY)
            .map(Into::into)
    }

    /// Persist the playlist selected for play.
    pub fn save_selected_playlist(&self, playlist: Playlist) -> StorageResult<()> {
        self.write(SELECTED_PLAYLIST_KEY, &PlaylistEntity::from(playlist))
    }

    /// Load the session record, discarding records written with another schema version.
    pub fn load_session(&self) -> Option<SessionState> {
        let entity = self.read::<SessionEntity>(SESSION_KEY)?;
        if entity.version != SESSION_SCHEMA_VERSION {
            warn!(
                found = entity.version,
                expected = SESSION_SCHEMA_VERSION,
                "ignoring session record with unsupported schema version"
            );
            return None;
        }
        Some(entity.into())
    }

    /// Whether a usable session record exists.
    pub fn has_session(&self) -> bool {
        self.load_session().is_some()
    }

    /// Persist the whole session record in one write.
    pub fn save_session(&self, session: &SessionState) -> StorageResult<()> {
        self.write(SESSION_KEY, &SessionEntity::from(session.clone()))
    }

    /// Track ids presented on this device so far.
    pub fn load_played_tracks(&self) -> IndexSet<String> {
        self.read::<PlayedTracksEntity>(PLAYED_TRACKS_KEY)
            .map(|played| played.track_ids)
            .unwrap_or_default()
    }

    /// Replace the played-track set.
    pub fn save_played_tracks(&self, track_ids: IndexSet<String>) -> StorageResult<()> {
        self.write(PLAYED_TRACKS_KEY, &PlayedTracksEntity { track_ids })
    }

    /// Wipe every game value, keeping only the streaming-service credentials.
    pub fn clear_all_except_auth(&self) -> StorageResult<()> {
        let auth = self.store.get(AUTH_TOKENS_KEY);
        self.store.clear()?;
        if let Some(auth) = auth {
            self.store.set(AUTH_TOKENS_KEY, auth)?;
        }
        Ok(())
    }

    fn read<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "discarding malformed stored value");
                None
            }
        }
    }

    fn write<T>(&self, key: &str, value: &T) -> StorageResult<()>
    where
        T: ?Sized + Serialize,
    {
        let payload = serde_json::to_string(value).map_err(|source| {
            StorageError::unavailable(format!("failed to encode `{key}`"), source)
        })?;
        self.store.set(key, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::kv_store::MemoryStore,
        state::game::{AnswerOutcome, Answer, PendingAnswer, fixtures},
    };

    fn repository() -> (Arc<MemoryStore>, SessionRepository) {
        let store = Arc::new(MemoryStore::new());
        let repository = SessionRepository::new(store.clone());
        (store, repository)
    }

    #[test]
    fn session_round_trips_through_the_store() {
        let (_, repository) = repository();
        let mut session = fixtures::session(&["A", "B"], &[1990, 2005]);
        session.current_track = session.playlist_track().cloned();
        session.record_pending(AnswerOutcome {
            answer: Answer::Before,
            correct: true,
            release_year: 1990,
            comparison_year: 2000,
        });

        repository.save_session(&session).unwrap();
        assert_eq!(repository.load_session(), Some(session));
    }

    #[test]
    fn malformed_values_read_as_absent() {
        let (store, repository) = repository();
        store.set(ROSTER_KEY, "[not json".into()).unwrap();
        store.set(SESSION_KEY, "42".into()).unwrap();
        store.set(PLAYED_TRACKS_KEY, "{}".into()).unwrap();

        assert!(repository.load_roster().is_empty());
        assert!(repository.load_session().is_none());
        assert!(repository.load_played_tracks().is_empty());
    }

    #[test]
    fn malformed_optional_section_keeps_the_record() {
        let (store, repository) = repository();
        let mut session = fixtures::session(&["A"], &[1990]);
        session.pending_answer = Some(PendingAnswer {
            outcome: AnswerOutcome {
                answer: Answer::After,
                correct: false,
                release_year: 1990,
                comparison_year: 2000,
            },
            scored: true,
        });
        repository.save_session(&session).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&store.get(SESSION_KEY).unwrap()).unwrap();
        raw["pending_answer"] = serde_json::json!("garbage");
        raw["scores"] = serde_json::json!([1, 2, 3]);
        store.set(SESSION_KEY, raw.to_string()).unwrap();

        let loaded = repository.load_session().unwrap();
        assert_eq!(loaded.pending_answer, None);
        assert!(loaded.scores.is_empty());
        assert_eq!(loaded.playlist, session.playlist);
    }

    #[test]
    fn unknown_schema_version_is_ignored() {
        let (store, repository) = repository();
        repository
            .save_session(&fixtures::session(&["A"], &[1990]))
            .unwrap();
        let mut raw: serde_json::Value =
            serde_json::from_str(&store.get(SESSION_KEY).unwrap()).unwrap();
        raw["version"] = serde_json::json!(SESSION_SCHEMA_VERSION + 1);
        store.set(SESSION_KEY, raw.to_string()).unwrap();

        assert!(!repository.has_session());
    }

    #[test]
    fn clearing_keeps_credentials() {
        let (store, repository) = repository();
        store.set(AUTH_TOKENS_KEY, "{\"token\":1}".into()).unwrap();
        repository.save_roster(&[Team::new("A")]).unwrap();
        repository
            .save_played_tracks(IndexSet::from(["t0".to_string()]))
            .unwrap();

        repository.clear_all_except_auth().unwrap();
        assert_eq!(store.keys(), [AUTH_TOKENS_KEY]);
    }
}
