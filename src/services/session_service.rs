use tracing::{debug, info, warn};

use crate::{
    dto::{
        leaderboard::LeaderboardView,
        outcome::{GameOutcome, QuestionView, Redirect, ResultView, VictoryView},
    },
    error::{GameError, Prerequisite},
    services::track_loader::load_current_track,
    state::{
        GameEngine, TransitionGuard,
        game::{Answer, SessionState},
        state_machine::{SessionEvent, SessionPhase},
        transitions::run_transition_with_broadcast,
    },
};

/// Load or create the session and enter the phase it was left in.
///
/// Requires registered teams and a selected playlist. Calling it while a session is
/// already in play returns the current view.
pub async fn bootstrap(engine: &GameEngine) -> Result<GameOutcome, GameError> {
    let gate = engine.lock_transitions().await;

    match engine.phase().await {
        SessionPhase::Idle => {}
        SessionPhase::PlaylistExhausted => {
            if !new_playlist_selected(engine).await {
                return render(engine).await;
            }
            run_transition_with_broadcast(engine, &gate, SessionEvent::Unload, move || async move {
                engine.install_session(None).await;
                Ok(())
            })
            .await?;
        }
        _ => return render(engine).await,
    }

    let session = prepare_session(engine)?;
    start(engine, &gate, session).await
}

/// Judge the active team's answer for the current track.
///
/// The pending answer is persisted before the score changes. Answering again while the
/// result is shown returns the same result without scoring twice.
pub async fn submit_answer(engine: &GameEngine, answer: Answer) -> Result<GameOutcome, GameError> {
    let gate = engine.lock_transitions().await;

    match engine.phase().await {
        SessionPhase::AwaitingAnswer => {}
        SessionPhase::ShowingResult(_) | SessionPhase::Won { .. } => {
            debug!(%answer, "ignoring repeated answer");
            return render(engine).await;
        }
        other => {
            return Err(GameError::InvalidState(format!(
                "cannot answer while {other:?}"
            )));
        }
    }

    let win_score = engine.config().win_score;
    let (outcome, winner) = engine
        .with_session(|session| {
            let outcome = session.judge(answer)?;
            Some((outcome, session.winner_after(&outcome, win_score)))
        })
        .await
        .flatten()
        .ok_or_else(|| GameError::InvalidState("no track loaded".into()))?;

    let event = match winner.clone() {
        Some(winner) => SessionEvent::Win { winner },
        None => SessionEvent::SubmitAnswer(outcome),
    };

    run_transition_with_broadcast(engine, &gate, event, move || async move {
        engine
            .update_session(|session| session.record_pending(outcome))
            .await?;
        engine
            .update_session(|session| {
                session.apply_pending(win_score);
            })
            .await
    })
    .await?;

    debug!(
        answer = %outcome.answer,
        correct = outcome.correct,
        release_year = outcome.release_year,
        comparison_year = outcome.comparison_year,
        "answer judged"
    );
    if let Some(winner) = winner {
        info!(%winner, "team reached the winning score");
    }

    render(engine).await
}

/// Leave the result screen: the resolved year becomes the comparison year, the next team
/// plays and the next track is loaded.
pub async fn next(engine: &GameEngine) -> Result<GameOutcome, GameError> {
    let gate = engine.lock_transitions().await;
    let phase = engine.phase().await;
    if !matches!(phase, SessionPhase::ShowingResult(_)) {
        return Err(GameError::InvalidState(format!(
            "no result to move on from while {phase:?}"
        )));
    }
    let exhausted = last_track(engine).await?;
    if !exhausted {
        ensure_authenticated(engine)?;
    }

    let event = if exhausted {
        SessionEvent::Exhaust
    } else {
        SessionEvent::NextTrack
    };

    let previous = loaded_session(engine).await?;
    let moved = run_transition_with_broadcast(engine, &gate, event, move || async move {
        engine.update_session(SessionState::advance_turn).await?;
        if !exhausted {
            load_current_track(engine, false).await?;
        }
        Ok(())
    })
    .await;
    restore_on_failure(engine, previous, moved).await?;

    if exhausted {
        info!("playlist exhausted");
    }
    render(engine).await
}

/// Fetch metadata and restart playback for the current question.
pub async fn retry_track(engine: &GameEngine) -> Result<GameOutcome, GameError> {
    let gate = engine.lock_transitions().await;
    let phase = engine.phase().await;
    if phase != SessionPhase::AwaitingAnswer {
        return Err(GameError::InvalidState(format!(
            "no question to retry while {phase:?}"
        )));
    }
    ensure_authenticated(engine)?;

    let previous = loaded_session(engine).await?;
    let retried =
        run_transition_with_broadcast(engine, &gate, SessionEvent::RetryTrack, move || async move {
            load_current_track(engine, true).await
        })
        .await;
    restore_on_failure(engine, previous, retried).await?;

    render(engine).await
}

/// Drop the current question unanswered. The turn and the comparison year stay put.
pub async fn skip_track(engine: &GameEngine) -> Result<GameOutcome, GameError> {
    let gate = engine.lock_transitions().await;
    let phase = engine.phase().await;
    if phase != SessionPhase::AwaitingAnswer {
        return Err(GameError::InvalidState(format!(
            "only an unanswered track can be skipped, not while {phase:?}"
        )));
    }

    let exhausted = last_track(engine).await?;
    if !exhausted {
        ensure_authenticated(engine)?;
    }
    let event = if exhausted {
        SessionEvent::Exhaust
    } else {
        SessionEvent::SkipTrack
    };

    let previous = loaded_session(engine).await?;
    let skipped = run_transition_with_broadcast(engine, &gate, event, move || async move {
        engine.update_session(SessionState::skip_track).await?;
        if !exhausted {
            load_current_track(engine, false).await?;
        }
        Ok(())
    })
    .await;
    restore_on_failure(engine, previous, skipped).await?;

    render(engine).await
}

/// Forget everything except the streaming-service credentials and return to team setup.
pub async fn reset(engine: &GameEngine) -> Result<Redirect, GameError> {
    let gate = engine.lock_transitions().await;

    run_transition_with_broadcast(engine, &gate, SessionEvent::Reset, move || async move {
        engine.repository().clear_all_except_auth()?;
        engine.install_session(None).await;
        engine.set_last_load(Default::default()).await;
        Ok(())
    })
    .await?;

    info!("game reset");
    Ok(Redirect::TeamSetup)
}

/// Project the current phase without changing anything.
pub async fn current_view(engine: &GameEngine) -> Result<GameOutcome, GameError> {
    let _gate = engine.lock_transitions().await;
    render(engine).await
}

async fn render(engine: &GameEngine) -> Result<GameOutcome, GameError> {
    let phase = engine.phase().await;
    let report = engine.last_load().await;

    let outcome = engine
        .with_session(|session| match &phase {
            SessionPhase::Idle => None,
            SessionPhase::AwaitingAnswer => {
                QuestionView::from_session(session, &report).map(GameOutcome::Question)
            }
            SessionPhase::ShowingResult(outcome) => {
                ResultView::from_session(session, outcome).map(GameOutcome::Result)
            }
            SessionPhase::Won { winner } => Some(GameOutcome::Won(VictoryView::from_session(
                session, winner,
            ))),
            SessionPhase::PlaylistExhausted => Some(GameOutcome::PlaylistExhausted(
                LeaderboardView::from_session(session),
            )),
        })
        .await
        .flatten();

    outcome.ok_or_else(|| GameError::InvalidState(format!("nothing to show while {phase:?}")))
}

/// Whether the cursor is on the last track, so moving on exhausts the playlist.
async fn last_track(engine: &GameEngine) -> Result<bool, GameError> {
    engine
        .with_session(|session| session.track_index + 1 >= session.playlist.tracks.len())
        .await
        .ok_or_else(|| GameError::InvalidState("no session loaded".into()))
}

async fn loaded_session(engine: &GameEngine) -> Result<SessionState, GameError> {
    engine
        .session()
        .await
        .ok_or_else(|| GameError::InvalidState("no session loaded".into()))
}

fn ensure_authenticated(engine: &GameEngine) -> Result<(), GameError> {
    if engine.provider().is_authenticated() {
        Ok(())
    } else {
        Err(GameError::AuthenticationRequired)
    }
}

/// Put back the session a failed transition started from, in memory and in the store.
///
/// The phase is already unchanged after an aborted plan; the record must match it.
async fn restore_on_failure<T>(
    engine: &GameEngine,
    previous: SessionState,
    outcome: Result<T, GameError>,
) -> Result<T, GameError> {
    if outcome.is_err() {
        if let Err(err) = engine.repository().save_session(&previous) {
            warn!(session_id = %previous.id, error = %err, "failed to restore session record");
        }
        engine.install_session(Some(previous)).await;
    }
    outcome
}

async fn new_playlist_selected(engine: &GameEngine) -> bool {
    let Some(selected) = engine.repository().load_selected_playlist() else {
        return false;
    };
    engine
        .with_session(|session| session.playlist != selected)
        .await
        .unwrap_or(true)
}

/// Read prerequisites and the stored record, returning a healed session to start from.
fn prepare_session(engine: &GameEngine) -> Result<SessionState, GameError> {
    let repository = engine.repository();

    let teams = repository.load_roster();
    if teams.is_empty() {
        return Err(GameError::MissingPrerequisite(Prerequisite::Teams));
    }
    let Some(selected) = repository.load_selected_playlist() else {
        return Err(GameError::MissingPrerequisite(Prerequisite::Playlist));
    };

    let mut session = match repository.load_session() {
        Some(session) if session.teams.is_empty() => {
            warn!(session_id = %session.id, "stored session has no teams; starting over");
            SessionState::new(teams, selected, engine.config().default_comparison_year)
        }
        Some(mut session) => {
            if session.playlist != selected {
                if session.is_exhausted() {
                    info!(
                        session_id = %session.id,
                        playlist_id = %selected.id,
                        "adopting newly selected playlist"
                    );
                    session.adopt_playlist(selected);
                } else {
                    warn!(
                        session_id = %session.id,
                        playlist_id = %selected.id,
                        "ignoring playlist selected while the game is in progress"
                    );
                }
            }
            info!(
                session_id = %session.id,
                track_index = session.track_index,
                "resuming session"
            );
            session
        }
        None => {
            let session =
                SessionState::new(teams, selected, engine.config().default_comparison_year);
            info!(session_id = %session.id, teams = session.teams.len(), "starting new session");
            session
        }
    };

    session.heal();
    if session.pending_answer.is_some() && session.current_track.is_none() {
        warn!(session_id = %session.id, "pending answer without cached track; discarding it");
        session.pending_answer = None;
    }

    repository.save_session(&session)?;
    Ok(session)
}

/// Install a prepared session and enter the phase its record describes.
async fn start(
    engine: &GameEngine,
    gate: &TransitionGuard<'_>,
    mut session: SessionState,
) -> Result<GameOutcome, GameError> {
    if session.pending_answer.is_some_and(|pending| !pending.scored) {
        session.apply_pending(engine.config().win_score);
        engine.repository().save_session(&session)?;
        debug!(session_id = %session.id, "applied score of an interrupted answer");
    }

    let event = if let Some(winner) = session.winner.clone() {
        SessionEvent::Win { winner }
    } else if session.is_exhausted() {
        SessionEvent::Exhaust
    } else if let Some(pending) = session.pending_answer {
        SessionEvent::Resume(pending.outcome)
    } else {
        ensure_authenticated(engine)?;
        SessionEvent::Begin
    };
    let load = matches!(event, SessionEvent::Begin);

    let started = run_transition_with_broadcast(engine, gate, event, move || async move {
        engine.install_session(Some(session)).await;
        if load {
            load_current_track(engine, false).await?;
        }
        Ok(())
    })
    .await;
    if let Err(err) = started {
        engine.install_session(None).await;
        return Err(err);
    }

    render(engine).await
}
