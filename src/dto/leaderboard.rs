use serde::Serialize;

use crate::{
    dto::format_system_time,
    state::game::{HistoryEntry, SessionState, Team},
};

/// One answered track in a team's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLine {
    /// Track title.
    pub track_name: String,
    /// Artists joined for display.
    pub artist_name: String,
    /// Release year revealed after the answer.
    pub release_year: i32,
    /// Whether the team answered correctly.
    pub correct: bool,
}

impl From<&HistoryEntry> for HistoryLine {
    fn from(value: &HistoryEntry) -> Self {
        Self {
            track_name: value.track_name.clone(),
            artist_name: value.artist_name.clone(),
            release_year: value.release_year,
            correct: value.correct,
        }
    }
}

/// A team's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based rank; tied teams share a rank.
    pub rank: usize,
    /// Team display name.
    pub team: String,
    /// Current score.
    pub score: u32,
    /// Answered tracks in order.
    pub history: Vec<HistoryLine>,
}

/// Teams ranked by descending score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeaderboardView {
    /// Standings, best first; ties keep turn order.
    pub entries: Vec<LeaderboardEntry>,
    /// Winning team, once decided.
    pub winner: Option<String>,
    /// When the session was last saved (RFC 3339).
    pub updated_at: Option<String>,
}

impl LeaderboardView {
    /// Rank the teams of a session.
    pub fn from_session(session: &SessionState) -> Self {
        let mut view = Self::rank(&session.teams, |team| {
            let score = session.score_of(&team.name);
            let history = session
                .track_history
                .get(&team.name)
                .map(|entries| entries.iter().map(HistoryLine::from).collect())
                .unwrap_or_default();
            (score, history)
        });
        view.winner = session.winner.clone();
        view.updated_at = Some(format_system_time(session.updated_at));
        view
    }

    /// Standings of a roster that has not played yet.
    pub fn from_roster(teams: &[Team]) -> Self {
        Self::rank(teams, |_| (0, Vec::new()))
    }

    fn rank<F>(teams: &[Team], mut standing: F) -> Self
    where
        F: FnMut(&Team) -> (u32, Vec<HistoryLine>),
    {
        let mut entries: Vec<LeaderboardEntry> = teams
            .iter()
            .map(|team| {
                let (score, history) = standing(team);
                LeaderboardEntry {
                    rank: 0,
                    team: team.name.clone(),
                    score,
                    history,
                }
            })
            .collect();
        // `sort_by` is stable, so tied teams stay in turn order.
        entries.sort_by(|a, b| b.score.cmp(&a.score));

        for index in 0..entries.len() {
            entries[index].rank = if index > 0 && entries[index - 1].score == entries[index].score {
                entries[index - 1].rank
            } else {
                index + 1
            };
        }

        Self {
            entries,
            winner: None,
            updated_at: None,
        }
    }
}
