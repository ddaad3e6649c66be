use crate::{
    dao::session_repository::SessionRepository, dto::leaderboard::LeaderboardView,
    state::GameEngine,
};

/// Standings of the loaded session, or of whatever the store holds when none is loaded.
pub async fn leaderboard(engine: &GameEngine) -> LeaderboardView {
    match engine.with_session(LeaderboardView::from_session).await {
        Some(view) => view,
        None => stored_leaderboard(engine.repository()),
    }
}

/// Standings read straight from the store: the session record if any, else the roster.
pub fn stored_leaderboard(repository: &SessionRepository) -> LeaderboardView {
    match repository.load_session() {
        Some(session) => LeaderboardView::from_session(&session),
        None => LeaderboardView::from_roster(&repository.load_roster()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::kv_store::MemoryStore,
        provider::InMemoryTrackProvider,
        state::game::{HistoryEntry, Team, fixtures},
    };

    fn engine() -> crate::state::SharedEngine {
        GameEngine::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(InMemoryTrackProvider::new()),
        )
    }

    fn entry(correct: bool) -> HistoryEntry {
        HistoryEntry {
            track_id: "t0".into(),
            track_name: "Song".into(),
            artist_name: "Artist".into(),
            release_year: 1990,
            correct,
        }
    }

    #[tokio::test]
    async fn ranks_by_score_keeping_turn_order_on_ties() {
        let engine = engine();
        let mut session = fixtures::session(&["A", "B", "C", "D"], &[1990]);
        session.scores.insert("B".into(), 3);
        session.scores.insert("C".into(), 1);
        session.scores.insert("D".into(), 3);
        session.scores.shift_remove("A");
        session
            .track_history
            .insert("B".into(), vec![entry(true), entry(false)]);
        engine.install_session(Some(session)).await;

        let view = leaderboard(&engine).await;
        let order: Vec<_> = view
            .entries
            .iter()
            .map(|entry| (entry.team.as_str(), entry.score, entry.rank))
            .collect();
        assert_eq!(order, [("B", 3, 1), ("D", 3, 1), ("C", 1, 3), ("A", 0, 4)]);
        assert_eq!(view.entries[0].history.len(), 2);
        assert!(view.entries[1].history.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_the_store() {
        let engine = engine();
        assert!(leaderboard(&engine).await.entries.is_empty());

        engine
            .repository()
            .save_roster(&[Team::new("A"), Team::new("B")])
            .unwrap();
        let view = leaderboard(&engine).await;
        assert_eq!(view.entries.len(), 2);
        assert!(view.entries.iter().all(|entry| entry.score == 0 && entry.rank == 1));

        let mut session = fixtures::session(&["A", "B"], &[1990]);
        session.scores.insert("B".into(), 2);
        engine.repository().save_session(&session).unwrap();
        assert_eq!(leaderboard(&engine).await.entries[0].team, "B");
    }
}
