//! Named outcomes returned to the presentation layer after each game operation.

use std::fmt;

use serde::Serialize;

use crate::{
    dto::leaderboard::LeaderboardView,
    state::game::{Answer, AnswerOutcome, SessionState, Track},
};

/// Screen the presentation layer should switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    /// Register teams.
    TeamSetup,
    /// Choose a playlist.
    PlaylistSelection,
    /// Show the winner.
    Victory,
    /// The playlist ran out; choose another one to keep playing.
    PlaylistReselection,
}

/// Whether the current track is audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    /// Playback was started for this question.
    Started,
    /// The track was already played on this device; playback was not restarted.
    AlreadyPlayed,
    /// Playback could not be started.
    Failed,
}

/// Step of a track load that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    /// Fetching full metadata.
    Metadata,
    /// Starting playback.
    Playback,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Metadata => f.write_str("metadata"),
            LoadStage::Playback => f.write_str("playback"),
        }
    }
}

/// Non-fatal failure while loading a track. The question is still presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackLoadFailed {
    /// Track that failed to load.
    pub track_id: String,
    /// Failing step.
    pub stage: LoadStage,
    /// Human readable cause.
    pub reason: String,
}

/// Result of the latest track load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Playback state after the load.
    pub playback: PlaybackStatus,
    /// Failures encountered; empty on success.
    pub failures: Vec<TrackLoadFailed>,
}

impl Default for LoadReport {
    fn default() -> Self {
        Self {
            playback: PlaybackStatus::AlreadyPlayed,
            failures: Vec::new(),
        }
    }
}

/// Track details shown to players. The release year stays hidden until the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackView {
    /// Track identifier.
    pub id: String,
    /// Track title.
    pub name: String,
    /// Artists joined for display.
    pub artists: String,
    /// Album title.
    pub album: String,
    /// Artwork.
    pub image_url: Option<String>,
    /// Preview clip.
    pub preview_url: Option<String>,
}

impl From<&Track> for TrackView {
    fn from(value: &Track) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
            artists: value.artist_line(),
            album: value.album.clone(),
            image_url: value.image_url.clone(),
            preview_url: value.preview_url.clone(),
        }
    }
}

/// The active team has to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    /// Team whose turn it is.
    pub team: String,
    /// Year to answer before/after against.
    pub comparison_year: i32,
    /// 1-based position in the playlist.
    pub track_number: usize,
    /// Number of tracks in the playlist.
    pub track_count: usize,
    /// The track being played.
    pub track: TrackView,
    /// Playback state.
    pub playback: PlaybackStatus,
    /// Problems hit while loading the track.
    pub load_failures: Vec<TrackLoadFailed>,
}

impl QuestionView {
    /// Build the question for the cached current track, if one is cached.
    pub fn from_session(session: &SessionState, report: &LoadReport) -> Option<Self> {
        let track = session.current_track.as_ref()?;
        Some(Self {
            team: session.active_team()?.name.clone(),
            comparison_year: session.comparison_year,
            track_number: session.track_index + 1,
            track_count: session.playlist.tracks.len(),
            track: track.into(),
            playback: report.playback,
            load_failures: report.failures.clone(),
        })
    }
}

/// The judged answer of the active team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    /// Team that answered.
    pub team: String,
    /// The judged track.
    pub track: TrackView,
    /// What the team answered.
    pub answer: Answer,
    /// Judgement.
    pub correct: bool,
    /// Revealed release year.
    pub release_year: i32,
    /// Year the answer was judged against.
    pub comparison_year: i32,
    /// Team score after the answer.
    pub score: u32,
}

impl ResultView {
    /// Build the result screen for `outcome` on the cached current track.
    pub fn from_session(session: &SessionState, outcome: &AnswerOutcome) -> Option<Self> {
        let team = session.active_team()?.name.clone();
        let track = session.current_track.as_ref()?;
        Some(Self {
            score: session.score_of(&team),
            team,
            track: track.into(),
            answer: outcome.answer,
            correct: outcome.correct,
            release_year: outcome.release_year,
            comparison_year: outcome.comparison_year,
        })
    }
}

/// Final screen once a team reached the winning score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VictoryView {
    /// Winning team.
    pub winner: String,
    /// Its final score.
    pub score: u32,
    /// Final standings.
    pub leaderboard: LeaderboardView,
}

impl VictoryView {
    /// Build the victory screen for `winner`.
    pub fn from_session(session: &SessionState, winner: &str) -> Self {
        Self {
            winner: winner.to_string(),
            score: session.score_of(winner),
            leaderboard: LeaderboardView::from_session(session),
        }
    }
}

/// Outcome of a game operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "view", rename_all = "snake_case")]
pub enum GameOutcome {
    /// A question is waiting for an answer.
    Question(QuestionView),
    /// An answer was judged.
    Result(ResultView),
    /// A team won.
    Won(VictoryView),
    /// No track left; standings so far.
    PlaylistExhausted(LeaderboardView),
}

impl GameOutcome {
    /// Screen to switch to, for outcomes that leave the game screen.
    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            GameOutcome::Won(_) => Some(Redirect::Victory),
            GameOutcome::PlaylistExhausted(_) => Some(Redirect::PlaylistReselection),
            GameOutcome::Question(_) | GameOutcome::Result(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::fixtures;

    #[test]
    fn question_hides_release_year_and_counts_from_one() {
        let mut session = fixtures::session(&["A", "B"], &[1990, 2005]);
        session.current_track = session.playlist_track().cloned();

        let view = QuestionView::from_session(&session, &LoadReport::default()).unwrap();
        assert_eq!(view.team, "A");
        assert_eq!(view.track_number, 1);
        assert_eq!(view.track_count, 2);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["track"].get("release_year").is_none());
    }

    #[test]
    fn question_requires_a_cached_track() {
        let session = fixtures::session(&["A"], &[1990]);
        assert!(QuestionView::from_session(&session, &LoadReport::default()).is_none());
    }

    #[test]
    fn terminal_outcomes_redirect() {
        let session = fixtures::session(&["A"], &[1990]);
        let won = GameOutcome::Won(VictoryView::from_session(&session, "A"));
        assert_eq!(won.redirect(), Some(Redirect::Victory));
        assert_eq!(
            GameOutcome::PlaylistExhausted(LeaderboardView::default()).redirect(),
            Some(Redirect::PlaylistReselection)
        );
    }
}
