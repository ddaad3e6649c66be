//! End-to-end game flow over the offline provider and an in-memory store.

use std::sync::Arc;

use beatdate::{
    config::AppConfig,
    dao::kv_store::MemoryStore,
    dto::{
        outcome::{GameOutcome, QuestionView, Redirect, ResultView},
        team::TeamInput,
    },
    provider::InMemoryTrackProvider,
    services::{leaderboard_service, playlist_service, session_service, team_service},
    state::{GameEngine, SharedEngine, game::Answer},
};
use rand::{SeedableRng, rngs::StdRng};

const LIBRARY: &str = r#"{
    "playlists": [{
        "id": "decades",
        "name": "Decades",
        "owner": "dj",
        "tracks": [
            {"id": "t1990", "name": "Nineties", "artists": ["One"], "album": "A", "release_year": 1990},
            {"id": "t2005", "name": "Noughties", "artists": ["Two"], "album": "B", "release_year": 2005},
            {"id": "t2010", "name": "Tens", "artists": ["Three"], "album": "C", "release_year": 2010}
        ]
    }]
}"#;

fn setup() -> (Arc<MemoryStore>, InMemoryTrackProvider, SharedEngine) {
    let store = Arc::new(MemoryStore::new());
    let provider = InMemoryTrackProvider::from_json(LIBRARY).unwrap();
    let engine = GameEngine::new(
        AppConfig::default(),
        store.clone(),
        Arc::new(provider.clone()),
    );
    (store, provider, engine)
}

fn question(outcome: GameOutcome) -> QuestionView {
    match outcome {
        GameOutcome::Question(view) => view,
        other => panic!("expected a question, got {other:?}"),
    }
}

fn result(outcome: GameOutcome) -> ResultView {
    match outcome {
        GameOutcome::Result(view) => view,
        other => panic!("expected a result, got {other:?}"),
    }
}

#[tokio::test]
async fn three_turns_carry_the_comparison_year() {
    let (_, provider, engine) = setup();
    let repository = engine.repository();
    team_service::add_team(repository, TeamInput::new("A")).unwrap();
    team_service::add_team(repository, TeamInput::new("B")).unwrap();
    // Selected without shuffling to keep the play order fixed.
    let playlist = playlist_service::load_playlist(engine.provider(), "decades")
        .await
        .unwrap();
    repository.save_selected_playlist(playlist).unwrap();

    let turn = question(session_service::bootstrap(&engine).await.unwrap());
    assert_eq!((turn.team.as_str(), turn.comparison_year), ("A", 2000));
    let judged = result(session_service::submit_answer(&engine, Answer::Before).await.unwrap());
    assert!(judged.correct);

    let turn = question(session_service::next(&engine).await.unwrap());
    assert_eq!((turn.team.as_str(), turn.comparison_year), ("B", 1990));
    let judged = result(session_service::submit_answer(&engine, Answer::Before).await.unwrap());
    assert!(!judged.correct);

    let turn = question(session_service::next(&engine).await.unwrap());
    assert_eq!((turn.team.as_str(), turn.comparison_year), ("A", 2005));
    let judged = result(session_service::submit_answer(&engine, Answer::After).await.unwrap());
    assert!(judged.correct);
    assert_eq!(judged.score, 2);

    let board = leaderboard_service::leaderboard(&engine).await;
    let standings: Vec<_> = board
        .entries
        .iter()
        .map(|entry| (entry.team.as_str(), entry.score))
        .collect();
    assert_eq!(standings, [("A", 2), ("B", 0)]);
    let a_history: Vec<_> = board.entries[0]
        .history
        .iter()
        .map(|line| (line.release_year, line.correct))
        .collect();
    assert_eq!(a_history, [(1990, true), (2010, true)]);
    assert_eq!(board.entries[1].history.len(), 1);
    assert!(!board.entries[1].history[0].correct);

    assert_eq!(provider.played(), ["t1990", "t2005", "t2010"]);

    let end = session_service::next(&engine).await.unwrap();
    assert_eq!(end.redirect(), Some(Redirect::PlaylistReselection));
}

#[tokio::test]
async fn restart_resumes_from_the_store() {
    let (store, provider, engine) = setup();
    let repository = engine.repository();
    team_service::add_team(repository, TeamInput::new("Rockers")).unwrap();
    team_service::add_team(repository, TeamInput::new("Crooners")).unwrap();
    let playlist = playlist_service::load_playlist(engine.provider(), "spotify:playlist:decades")
        .await
        .unwrap();
    playlist_service::use_playlist(repository, playlist, &mut StdRng::seed_from_u64(3)).unwrap();

    let first = question(session_service::bootstrap(&engine).await.unwrap());
    let answered = result(session_service::submit_answer(&engine, Answer::After).await.unwrap());

    let restarted = GameEngine::new(AppConfig::default(), store, Arc::new(provider.clone()));
    let resumed = result(session_service::bootstrap(&restarted).await.unwrap());
    assert_eq!(resumed, answered);

    let second = question(session_service::next(&restarted).await.unwrap());
    assert_eq!(second.team, "Crooners");
    assert_eq!(second.track_number, first.track_number + 1);
    assert_eq!(second.comparison_year, answered.release_year);

    assert!(team_service::add_team(restarted.repository(), TeamInput::new("Late")).is_err());
    assert_eq!(
        session_service::reset(&restarted).await.unwrap(),
        Redirect::TeamSetup
    );
    let err = session_service::bootstrap(&restarted).await.unwrap_err();
    assert_eq!(err.redirect(), Some(Redirect::TeamSetup));
}
