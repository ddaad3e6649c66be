use tracing::debug;

use crate::{
    dto::phase::VisiblePhase,
    error::GameError,
    state::{GameEngine, TransitionGuard, state_machine::SessionEvent},
};

/// Execute a planned state-machine transition, then publish the resulting phase to watchers.
pub async fn run_transition_with_broadcast<F, Fut, T>(
    engine: &GameEngine,
    gate: &TransitionGuard<'_>,
    event: SessionEvent,
    work: F,
) -> Result<T, GameError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, GameError>>,
{
    let (res, next) = engine.run_transition(gate, event, work).await?;
    debug!(phase = %VisiblePhase::from(&next), "phase changed");
    engine.publish_phase(&next);
    Ok(res)
}
