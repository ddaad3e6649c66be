use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::state::game::AnswerOutcome;

/// High-level phases a session can be in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session is loaded; teams and playlists can be managed.
    Idle,
    /// A track is loaded and the active team has not answered yet.
    AwaitingAnswer,
    /// The active team answered; the result is shown until `next`.
    ShowingResult(AnswerOutcome),
    /// A team reached the winning score. Terminal until reset.
    Won {
        /// Name of the winning team.
        winner: String,
    },
    /// Every track of the playlist was used before anyone won.
    PlaylistExhausted,
}

impl SessionPhase {
    /// Whether no further gameplay transition is possible without a reset or new playlist.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Won { .. } | SessionPhase::PlaylistExhausted)
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was loaded and its current track is ready to be asked.
    Begin,
    /// A session was loaded mid-question, with an answer already recorded.
    Resume(AnswerOutcome),
    /// The active team answered without reaching the winning score.
    SubmitAnswer(AnswerOutcome),
    /// A team reached the winning score (on submit or while resuming).
    Win {
        /// Name of the winning team.
        winner: String,
    },
    /// Move to the next track after a result.
    NextTrack,
    /// Re-fetch metadata and playback for the current question.
    RetryTrack,
    /// Abandon the current question without judging it.
    SkipTrack,
    /// The track cursor reached the end of the playlist.
    Exhaust,
    /// Unload an exhausted session so it can be reloaded with a new playlist.
    Unload,
    /// Drop the session entirely and return to idle.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already in flight and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: SessionPhase,
    /// Phase the state machine will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: SessionPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Target phase of the in-flight transition, if any.
    pub pending: Option<SessionPhase>,
}

/// State machine implementing the question/result cycle of a session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase.clone()
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase.clone(),
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to.clone()),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event.clone())
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase.clone(),
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase.clone(),
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase.clone())
    }

    /// Abort a planned transition without applying it, leaving the phase untouched.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase.clone(), event) {
            (SessionPhase::Idle, SessionEvent::Begin) => SessionPhase::AwaitingAnswer,
            (SessionPhase::Idle, SessionEvent::Resume(outcome)) => {
                SessionPhase::ShowingResult(outcome)
            }
            (SessionPhase::AwaitingAnswer, SessionEvent::SubmitAnswer(outcome)) => {
                SessionPhase::ShowingResult(outcome)
            }
            (SessionPhase::Idle | SessionPhase::AwaitingAnswer, SessionEvent::Win { winner }) => {
                SessionPhase::Won { winner }
            }
            (SessionPhase::ShowingResult(_), SessionEvent::NextTrack) => {
                SessionPhase::AwaitingAnswer
            }
            (SessionPhase::AwaitingAnswer, SessionEvent::RetryTrack) => {
                SessionPhase::AwaitingAnswer
            }
            (SessionPhase::AwaitingAnswer, SessionEvent::SkipTrack) => {
                SessionPhase::AwaitingAnswer
            }
            (
                SessionPhase::Idle | SessionPhase::AwaitingAnswer | SessionPhase::ShowingResult(_),
                SessionEvent::Exhaust,
            ) => SessionPhase::PlaylistExhausted,
            (SessionPhase::PlaylistExhausted, SessionEvent::Unload) => SessionPhase::Idle,
            (_, SessionEvent::Reset) => SessionPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
