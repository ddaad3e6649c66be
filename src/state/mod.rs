pub mod game;
pub mod state_machine;
pub mod transitions;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock, watch};
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::{session_repository::SessionRepository, storage::KeyValueStore},
    dto::outcome::LoadReport,
    error::GameError,
    provider::TrackProvider,
    state::{game::SessionState, state_machine::SessionPhase},
};

pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::state_machine::{SessionEvent, SessionStateMachine};

/// Shared handle to the engine.
pub type SharedEngine = Arc<GameEngine>;

/// Proof that the caller holds the transition gate.
pub type TransitionGuard<'a> = MutexGuard<'a, ()>;

/// Owns the loaded session, its state machine and the collaborators operations need.
pub struct GameEngine {
    config: AppConfig,
    repository: SessionRepository,
    provider: Arc<dyn TrackProvider>,
    machine: RwLock<SessionStateMachine>,
    session: RwLock<Option<SessionState>>,
    last_load: RwLock<LoadReport>,
    phase: watch::Sender<SessionPhase>,
    transition_gate: Mutex<()>,
}

impl GameEngine {
    /// Construct an idle engine wrapped in an [`Arc`].
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn TrackProvider>,
    ) -> SharedEngine {
        let (phase_tx, _rx) = watch::channel(SessionPhase::Idle);
        Arc::new(Self {
            config,
            repository: SessionRepository::new(store),
            provider,
            machine: RwLock::new(SessionStateMachine::new()),
            session: RwLock::new(None),
            last_load: RwLock::new(LoadReport::default()),
            phase: phase_tx,
            transition_gate: Mutex::new(()),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Typed access to the persistent store.
    pub fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    /// Streaming-service provider.
    pub fn provider(&self) -> &dyn TrackProvider {
        self.provider.as_ref()
    }

    /// Serialize game operations. Hold the guard for the whole operation.
    pub async fn lock_transitions(&self) -> TransitionGuard<'_> {
        self.transition_gate.lock().await
    }

    /// Current phase of the state machine.
    pub async fn phase(&self) -> SessionPhase {
        self.machine.read().await.phase()
    }

    /// Snapshot of the state machine.
    pub async fn snapshot(&self) -> Snapshot {
        self.machine.read().await.snapshot()
    }

    /// Subscribe to phase changes.
    pub fn phase_watcher(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    pub(crate) fn publish_phase(&self, phase: &SessionPhase) {
        self.phase.send_replace(phase.clone());
    }

    /// Copy of the loaded session, if any.
    pub async fn session(&self) -> Option<SessionState> {
        self.session.read().await.clone()
    }

    /// Read from the loaded session without cloning it.
    pub async fn with_session<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&SessionState) -> R,
    {
        self.session.read().await.as_ref().map(f)
    }

    /// Mutate the loaded session and persist it.
    ///
    /// The change becomes visible only once the store accepted it.
    pub async fn update_session<F, R>(&self, f: F) -> Result<R, GameError>
    where
        F: FnOnce(&mut SessionState) -> R,
    {
        let mut guard = self.session.write().await;
        let current = guard
            .as_ref()
            .ok_or_else(|| GameError::InvalidState("no session loaded".into()))?;

        let mut next = current.clone();
        let value = f(&mut next);
        self.repository.save_session(&next)?;
        *guard = Some(next);
        Ok(value)
    }

    /// Replace the loaded session without touching the store.
    pub async fn install_session(&self, session: Option<SessionState>) {
        *self.session.write().await = session;
    }

    /// Report of the latest track load.
    pub async fn last_load(&self) -> LoadReport {
        self.last_load.read().await.clone()
    }

    pub(crate) async fn set_last_load(&self, report: LoadReport) {
        *self.last_load.write().await = report;
    }

    /// Plan a transition to the state machine, returning the plan.
    async fn plan_transition(&self, event: SessionEvent) -> Result<Plan, PlanError> {
        let mut sm = self.machine.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let mut sm = self.machine.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition.
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.machine.write().await;
        sm.abort(plan_id)
    }

    /// Plan `event`, run `work`, then apply the plan, or abort it when `work` fails.
    ///
    /// Callers must hold the transition gate for the whole operation.
    pub async fn run_transition<F, Fut, T>(
        &self,
        _gate: &TransitionGuard<'_>,
        event: SessionEvent,
        work: F,
    ) -> Result<(T, SessionPhase), GameError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, GameError>>,
    {
        let Plan { id: plan_id, .. } = self.plan_transition(event.clone()).await?;

        match work().await {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                Err(err)
            }
        }
    }
}
