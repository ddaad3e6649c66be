use std::{fmt, str::FromStr, time::SystemTime};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A participating team, identified by its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Display name, unique (case-insensitively) within a roster.
    pub name: String,
}

impl Team {
    /// Build a team from its display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Case-insensitive name comparison used for roster uniqueness.
    pub fn same_name(&self, other: &str) -> bool {
        self.name.to_lowercase() == other.trim().to_lowercase()
    }
}

/// Metadata for a single track, either from a playlist listing or a full fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Streaming-service track identifier.
    pub id: String,
    /// Track title.
    pub name: String,
    /// Credited artists, in display order.
    pub artists: Vec<String>,
    /// Album the track was released on.
    pub album: String,
    /// Release year of the album.
    pub release_year: i32,
    /// Optional 30s preview.
    pub preview_url: Option<String>,
    /// Largest album artwork, when the service returned any.
    pub image_url: Option<String>,
}

impl Track {
    /// Artists joined the way they are shown to players.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// A playlist as selected for a session. Track order is the play order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    /// Streaming-service playlist identifier.
    pub id: String,
    /// Playlist title.
    pub name: String,
    /// Display name of the playlist owner.
    pub owner: String,
    /// Cover image.
    pub image_url: Option<String>,
    /// Tracks in play order.
    pub tracks: Vec<Track>,
}

/// The two guesses a team can make about the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    /// Released in or before the comparison year.
    Before,
    /// Released in or after the comparison year.
    After,
}

impl Answer {
    /// Judge the answer. A release year equal to the comparison year is correct for both.
    pub fn is_correct(self, release_year: i32, comparison_year: i32) -> bool {
        match self {
            Answer::Before => release_year <= comparison_year,
            Answer::After => release_year >= comparison_year,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Before => f.write_str("before"),
            Answer::After => f.write_str("after"),
        }
    }
}

impl FromStr for Answer {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "before" | "b" => Ok(Answer::Before),
            "after" | "a" => Ok(Answer::After),
            other => Err(format!("unknown answer `{other}` (expected before/after)")),
        }
    }
}

/// Judgement of one submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// What the team answered.
    pub answer: Answer,
    /// Whether the answer was judged correct.
    pub correct: bool,
    /// Release year of the judged track.
    pub release_year: i32,
    /// Reference year the track was judged against.
    pub comparison_year: i32,
}

/// An answer that was judged but whose result screen has not been acknowledged yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAnswer {
    /// The recorded judgement.
    pub outcome: AnswerOutcome,
    /// Whether the score and history update for this answer has been applied.
    pub scored: bool,
}

/// One line in a team's track history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Track identifier.
    pub track_id: String,
    /// Track title.
    pub track_name: String,
    /// Artists joined for display.
    pub artist_name: String,
    /// Release year the answer was judged on.
    pub release_year: i32,
    /// Whether the team answered correctly.
    pub correct: bool,
}

/// Aggregated state of an in-progress session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Identifier of this play-through.
    pub id: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last mutation timestamp.
    pub updated_at: SystemTime,
    /// Teams in turn order.
    pub teams: Vec<Team>,
    /// Score per team name.
    pub scores: IndexMap<String, u32>,
    /// Index into `teams` of the team whose turn it is.
    pub active_team_index: usize,
    /// Shuffled playlist fixed for the session.
    pub playlist: Playlist,
    /// Cursor into `playlist.tracks`.
    pub track_index: usize,
    /// Year the current track is judged against.
    pub comparison_year: i32,
    /// Answer awaiting acknowledgement, kept to survive restarts.
    pub pending_answer: Option<PendingAnswer>,
    /// Cached metadata of the track at `track_index`.
    pub current_track: Option<Track>,
    /// Append-only answer history per team name.
    pub track_history: IndexMap<String, Vec<HistoryEntry>>,
    /// Team that reached the winning score, if any.
    pub winner: Option<String>,
}

impl SessionState {
    /// Start a fresh session: every team at zero, first team to play, first track.
    pub fn new(teams: Vec<Team>, playlist: Playlist, comparison_year: i32) -> Self {
        let timestamp = SystemTime::now();
        let scores = teams.iter().map(|team| (team.name.clone(), 0)).collect();

        Self {
            id: Uuid::new_v4(),
            created_at: timestamp,
            updated_at: timestamp,
            teams,
            scores,
            active_team_index: 0,
            playlist,
            track_index: 0,
            comparison_year,
            pending_answer: None,
            current_track: None,
            track_history: IndexMap::new(),
            winner: None,
        }
    }

    /// Team whose turn it is.
    pub fn active_team(&self) -> Option<&Team> {
        self.teams.get(self.active_team_index)
    }

    /// Score of a team; missing entries count as zero.
    pub fn score_of(&self, team: &str) -> u32 {
        self.scores.get(team).copied().unwrap_or(0)
    }

    /// Playlist entry under the cursor.
    pub fn playlist_track(&self) -> Option<&Track> {
        self.playlist.tracks.get(self.track_index)
    }

    /// True once the cursor has moved past the last track, or the playlist is empty.
    pub fn is_exhausted(&self) -> bool {
        self.track_index >= self.playlist.tracks.len()
    }

    /// Switch to a newly selected playlist, restarting the track cursor.
    ///
    /// Teams, scores, history and the active team carry over.
    pub fn adopt_playlist(&mut self, playlist: Playlist) {
        self.playlist = playlist;
        self.track_index = 0;
        self.pending_answer = None;
        self.current_track = None;
        self.touch();
    }

    /// Repair inconsistencies left by stale or partially written state.
    ///
    /// Returns `true` when anything was changed.
    pub fn heal(&mut self) -> bool {
        let mut changed = false;

        for team in &self.teams {
            if !self.scores.contains_key(&team.name) {
                warn!(team = %team.name, "score missing for team; starting at zero");
                self.scores.insert(team.name.clone(), 0);
                changed = true;
            }
        }

        if self.track_index > self.playlist.tracks.len() {
            warn!(
                track_index = self.track_index,
                tracks = self.playlist.tracks.len(),
                "track cursor past the end of the playlist; restarting at zero"
            );
            self.track_index = 0;
            self.pending_answer = None;
            self.current_track = None;
            changed = true;
        }

        if !self.teams.is_empty() && self.active_team_index >= self.teams.len() {
            self.active_team_index %= self.teams.len();
            changed = true;
        }

        if changed {
            self.touch();
        }
        changed
    }

    /// Judge an answer against the cached current track.
    pub fn judge(&self, answer: Answer) -> Option<AnswerOutcome> {
        let track = self.current_track.as_ref()?;
        Some(AnswerOutcome {
            answer,
            correct: answer.is_correct(track.release_year, self.comparison_year),
            release_year: track.release_year,
            comparison_year: self.comparison_year,
        })
    }

    /// Team that would win if `outcome` were scored for the active team now.
    pub fn winner_after(&self, outcome: &AnswerOutcome, win_score: u32) -> Option<String> {
        let team = self.active_team()?;
        (outcome.correct && self.score_of(&team.name) + 1 >= win_score).then(|| team.name.clone())
    }

    /// Cache full metadata of the track under the cursor.
    pub fn cache_track(&mut self, track: Track) {
        self.current_track = Some(track);
        self.touch();
    }

    /// Record a judged answer before any score is touched.
    pub fn record_pending(&mut self, outcome: AnswerOutcome) {
        self.pending_answer = Some(PendingAnswer {
            outcome,
            scored: false,
        });
        self.touch();
    }

    /// Apply the score and history update of the pending answer, at most once.
    ///
    /// Sets `winner` when a correct answer brings the active team to `win_score`.
    pub fn apply_pending(&mut self, win_score: u32) -> Option<AnswerOutcome> {
        let pending = self.pending_answer?;
        if pending.scored {
            return Some(pending.outcome);
        }

        let team = self.active_team()?.name.clone();
        let track = self.current_track.as_ref()?;
        let outcome = pending.outcome;

        let entry = HistoryEntry {
            track_id: track.id.clone(),
            track_name: track.name.clone(),
            artist_name: track.artist_line(),
            release_year: outcome.release_year,
            correct: outcome.correct,
        };
        let winning = self.winner_after(&outcome, win_score);

        if outcome.correct {
            *self.scores.entry(team.clone()).or_insert(0) += 1;
        }
        self.track_history.entry(team).or_default().push(entry);
        if self.winner.is_none() {
            self.winner = winning;
        }

        self.pending_answer = Some(PendingAnswer {
            scored: true,
            ..pending
        });
        self.touch();
        Some(outcome)
    }

    /// Move on after a resolved question.
    ///
    /// The resolved track's year becomes the new comparison year whatever the outcome.
    pub fn advance_turn(&mut self) {
        let resolved_year = self
            .pending_answer
            .take()
            .map(|pending| pending.outcome.release_year)
            .or_else(|| self.current_track.as_ref().map(|track| track.release_year));
        if let Some(year) = resolved_year {
            self.comparison_year = year;
        }

        self.track_index += 1;
        if !self.teams.is_empty() {
            self.active_team_index = (self.active_team_index + 1) % self.teams.len();
        }
        self.current_track = None;
        self.touch();
    }

    /// Drop the current track without judging it. Turn and comparison year stay put.
    pub fn skip_track(&mut self) {
        self.track_index += 1;
        self.current_track = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}

/// Extract the year from a `YYYY`, `YYYY-MM` or `YYYY-MM-DD` release date.
pub fn release_year_from_date(date: &str) -> Option<i32> {
    let year = date.trim().get(..4)?;
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn track(id: &str, release_year: i32) -> Track {
        Track {
            id: id.into(),
            name: format!("Song {id}"),
            artists: vec![format!("Artist {id}"), "Guest".into()],
            album: format!("Album {id}"),
            release_year,
            preview_url: None,
            image_url: None,
        }
    }

    pub fn playlist(years: &[i32]) -> Playlist {
        Playlist {
            id: "pl1".into(),
            name: "Party".into(),
            owner: "dj".into(),
            image_url: None,
            tracks: years
                .iter()
                .enumerate()
                .map(|(index, year)| track(&format!("t{index}"), *year))
                .collect(),
        }
    }

    pub fn session(teams: &[&str], years: &[i32]) -> SessionState {
        SessionState::new(
            teams.iter().map(|name| Team::new(*name)).collect(),
            playlist(years),
            2000,
        )
    }
}
