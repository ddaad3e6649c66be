use std::time::SystemTime;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};
use uuid::Uuid;

use crate::state::game::{
    Answer, AnswerOutcome, HistoryEntry, PendingAnswer, Playlist, SessionState, Team, Track,
};

/// Schema version written into every session record.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Track metadata as persisted (selected playlist, cached current track).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackEntity {
    /// Streaming-service track identifier.
    pub id: String,
    /// Track title.
    pub name: String,
    /// Credited artists.
    pub artists: Vec<String>,
    /// Album name.
    pub album: String,
    /// Release year of the album.
    pub release_year: i32,
    /// Optional preview URL.
    #[serde(default)]
    pub preview_url: Option<String>,
    /// Optional artwork URL.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Playlist as stored under the selected-playlist key and inside session records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistEntity {
    /// Streaming-service playlist identifier.
    pub id: String,
    /// Playlist title.
    pub name: String,
    /// Owner display name.
    pub owner: String,
    /// Cover image.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Tracks in play order (already shuffled).
    pub tracks: Vec<TrackEntity>,
}

/// Team names registered during setup, in turn order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntity {
    /// Team display names.
    pub teams: Vec<String>,
}

/// Every track id presented on this device, across sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayedTracksEntity {
    /// Track ids in first-played order.
    pub track_ids: IndexSet<String>,
}

/// History line of a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntryEntity {
    /// Track identifier.
    pub track_id: String,
    /// Track title.
    pub track_name: String,
    /// Artists joined for display.
    pub artist_name: String,
    /// Release year used for judging.
    pub release_year: i32,
    /// Whether the answer was correct.
    pub correct: bool,
}

/// Judged answer awaiting acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingAnswerEntity {
    /// Submitted answer.
    pub answer: Answer,
    /// Judgement.
    pub correct: bool,
    /// Release year of the judged track.
    pub release_year: i32,
    /// Comparison year at judgement time.
    pub comparison_year: i32,
    /// Whether the score/history update was applied.
    pub scored: bool,
}

/// Versioned session record, written atomically under a single key.
///
/// Optional sections fall back to their defaults when malformed instead of voiding
/// the whole record.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Schema version, see [`SESSION_SCHEMA_VERSION`].
    pub version: u32,
    /// Session identifier.
    pub id: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last update timestamp.
    pub updated_at: SystemTime,
    /// Team names in turn order.
    pub teams: Vec<String>,
    /// Score per team name.
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub scores: IndexMap<String, u32>,
    /// Index of the active team.
    #[serde(default)]
    pub active_team_index: usize,
    /// Shuffled playlist of the session.
    pub playlist: PlaylistEntity,
    /// Cursor into the playlist.
    #[serde(default)]
    pub track_index: usize,
    /// Current comparison year.
    pub comparison_year: i32,
    /// Answer awaiting acknowledgement.
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub pending_answer: Option<PendingAnswerEntity>,
    /// Cached metadata of the current track.
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub current_track: Option<TrackEntity>,
    /// History per team name.
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub track_history: IndexMap<String, Vec<HistoryEntryEntity>>,
    /// Winning team, once decided.
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub winner: Option<String>,
}

impl From<TrackEntity> for Track {
    fn from(value: TrackEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            artists: value.artists,
            album: value.album,
            release_year: value.release_year,
            preview_url: value.preview_url,
            image_url: value.image_url,
        }
    }
}

impl From<Track> for TrackEntity {
    fn from(value: Track) -> Self {
        Self {
            id: value.id,
            name: value.name,
            artists: value.artists,
            album: value.album,
            release_year: value.release_year,
            preview_url: value.preview_url,
            image_url: value.image_url,
        }
    }
}

impl From<PlaylistEntity> for Playlist {
    fn from(value: PlaylistEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner: value.owner,
            image_url: value.image_url,
            tracks: value.tracks.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Playlist> for PlaylistEntity {
    fn from(value: Playlist) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner: value.owner,
            image_url: value.image_url,
            tracks: value.tracks.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<HistoryEntryEntity> for HistoryEntry {
    fn from(value: HistoryEntryEntity) -> Self {
        Self {
            track_id: value.track_id,
            track_name: value.track_name,
            artist_name: value.artist_name,
            release_year: value.release_year,
            correct: value.correct,
        }
    }
}

impl From<HistoryEntry> for HistoryEntryEntity {
    fn from(value: HistoryEntry) -> Self {
        Self {
            track_id: value.track_id,
            track_name: value.track_name,
            artist_name: value.artist_name,
            release_year: value.release_year,
            correct: value.correct,
        }
    }
}

impl From<PendingAnswerEntity> for PendingAnswer {
    fn from(value: PendingAnswerEntity) -> Self {
        Self {
            outcome: AnswerOutcome {
                answer: value.answer,
                correct: value.correct,
                release_year: value.release_year,
                comparison_year: value.comparison_year,
            },
            scored: value.scored,
        }
    }
}

impl From<PendingAnswer> for PendingAnswerEntity {
    fn from(value: PendingAnswer) -> Self {
        Self {
            answer: value.outcome.answer,
            correct: value.outcome.correct,
            release_year: value.outcome.release_year,
            comparison_year: value.outcome.comparison_year,
            scored: value.scored,
        }
    }
}

impl From<SessionEntity> for SessionState {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            teams: value.teams.into_iter().map(Team::new).collect(),
            scores: value.scores,
            active_team_index: value.active_team_index,
            playlist: value.playlist.into(),
            track_index: value.track_index,
            comparison_year: value.comparison_year,
            pending_answer: value.pending_answer.map(Into::into),
            current_track: value.current_track.map(Into::into),
            track_history: value
                .track_history
                .into_iter()
                .map(|(team, entries)| (team, entries.into_iter().map(Into::into).collect()))
                .collect(),
            winner: value.winner,
        }
    }
}

impl From<SessionState> for SessionEntity {
    fn from(value: SessionState) -> Self {
        Self {
            version: SESSION_SCHEMA_VERSION,
            id: value.id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            teams: value.teams.into_iter().map(|team| team.name).collect(),
            scores: value.scores,
            active_team_index: value.active_team_index,
            playlist: value.playlist.into(),
            track_index: value.track_index,
            comparison_year: value.comparison_year,
            pending_answer: value.pending_answer.map(Into::into),
            current_track: value.current_track.map(Into::into),
            track_history: value
                .track_history
                .into_iter()
                .map(|(team, entries)| (team, entries.into_iter().map(Into::into).collect()))
                .collect(),
            winner: value.winner,
        }
    }
}
