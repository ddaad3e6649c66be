use std::fmt;

use serde::Serialize;

use crate::state::state_machine::SessionPhase;

/// Coarse phase shown to players, without the answer details.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// No session loaded.
    Idle,
    /// Waiting for the active team's answer.
    Question,
    /// Showing the judged answer.
    Result,
    /// A team won.
    Won,
    /// The playlist ran out.
    Exhausted,
}

impl From<&SessionPhase> for VisiblePhase {
    fn from(value: &SessionPhase) -> Self {
        match value {
            SessionPhase::Idle => VisiblePhase::Idle,
            SessionPhase::AwaitingAnswer => VisiblePhase::Question,
            SessionPhase::ShowingResult(_) => VisiblePhase::Result,
            SessionPhase::Won { .. } => VisiblePhase::Won,
            SessionPhase::PlaylistExhausted => VisiblePhase::Exhausted,
        }
    }
}

impl fmt::Display for VisiblePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VisiblePhase::Idle => "setup",
            VisiblePhase::Question => "question",
            VisiblePhase::Result => "result",
            VisiblePhase::Won => "victory",
            VisiblePhase::Exhausted => "exhausted",
        };
        f.write_str(label)
    }
}
