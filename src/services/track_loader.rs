use tracing::{debug, warn};

use crate::{
    dto::outcome::{LoadReport, LoadStage, PlaybackStatus, TrackLoadFailed},
    error::GameError,
    state::GameEngine,
};

/// Load the track under the session cursor: cache its metadata, then start playback.
///
/// Provider failures never abort the load; they are reported in the returned
/// [`LoadReport`]. When metadata cannot be fetched, the playlist entry is cached instead.
/// Playback only starts for tracks not yet played on this device, unless `force_playback`.
pub async fn load_current_track(
    engine: &GameEngine,
    force_playback: bool,
) -> Result<LoadReport, GameError> {
    let entry = engine
        .with_session(|session| session.playlist_track().cloned())
        .await
        .ok_or_else(|| GameError::InvalidState("no session loaded".into()))?
        .ok_or(GameError::PlaylistExhausted)?;
    let track_id = entry.id.clone();
    let provider = engine.provider();
    let mut failures = Vec::new();

    let track = match provider.fetch_track(&track_id).await {
        Ok(track) => track,
        Err(err) => {
            warn!(track_id = %track_id, error = %err, "metadata fetch failed; using playlist entry");
            failures.push(TrackLoadFailed {
                track_id: track_id.clone(),
                stage: LoadStage::Metadata,
                reason: err.to_string(),
            });
            entry
        }
    };
    engine
        .update_session(|session| session.cache_track(track))
        .await?;

    let repository = engine.repository();
    let mut played = repository.load_played_tracks();
    let first_play = played.insert(track_id.clone());
    if first_play {
        repository.save_played_tracks(played)?;
    }

    let playback = if first_play || force_playback {
        match provider.start_playback(&track_id).await {
            Ok(()) => PlaybackStatus::Started,
            Err(err) => {
                warn!(track_id = %track_id, error = %err, "playback failed");
                failures.push(TrackLoadFailed {
                    track_id: track_id.clone(),
                    stage: LoadStage::Playback,
                    reason: err.to_string(),
                });
                PlaybackStatus::Failed
            }
        }
    } else {
        debug!(track_id = %track_id, "track already played on this device; not restarting playback");
        PlaybackStatus::AlreadyPlayed
    };

    let report = LoadReport { playback, failures };
    engine.set_last_load(report.clone()).await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexSet;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::kv_store::MemoryStore,
        provider::InMemoryTrackProvider,
        state::{SharedEngine, game::fixtures},
    };

    async fn engine_with(years: &[i32]) -> (InMemoryTrackProvider, SharedEngine) {
        let session = fixtures::session(&["A", "B"], years);
        let provider = InMemoryTrackProvider::new();
        provider.insert_playlist(session.playlist.clone());
        let engine = GameEngine::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(provider.clone()),
        );
        engine.install_session(Some(session)).await;
        (provider, engine)
    }

    #[tokio::test]
    async fn first_load_caches_metadata_and_plays() {
        let (provider, engine) = engine_with(&[1990]).await;

        let report = load_current_track(&engine, false).await.unwrap();
        assert_eq!(report.playback, PlaybackStatus::Started);
        assert!(report.failures.is_empty());
        assert_eq!(provider.played(), ["t0"]);
        assert_eq!(
            engine.repository().load_played_tracks(),
            IndexSet::from(["t0".to_string()])
        );
        let stored = engine.repository().load_session().unwrap();
        assert_eq!(stored.current_track.unwrap().id, "t0");
    }

    #[tokio::test]
    async fn already_played_tracks_are_not_restarted_unless_forced() {
        let (provider, engine) = engine_with(&[1990]).await;
        engine
            .repository()
            .save_played_tracks(IndexSet::from(["t0".to_string()]))
            .unwrap();

        let report = load_current_track(&engine, false).await.unwrap();
        assert_eq!(report.playback, PlaybackStatus::AlreadyPlayed);
        assert!(provider.played().is_empty());

        let report = load_current_track(&engine, true).await.unwrap();
        assert_eq!(report.playback, PlaybackStatus::Started);
        assert_eq!(provider.played(), ["t0"]);
    }

    #[tokio::test]
    async fn metadata_failure_falls_back_to_playlist_entry() {
        let (provider, engine) = engine_with(&[1990]).await;
        provider.set_metadata_failure(true);

        let report = load_current_track(&engine, false).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, LoadStage::Metadata);
        assert_eq!(report.playback, PlaybackStatus::Started);
        let cached = engine
            .with_session(|session| session.current_track.clone())
            .await
            .flatten()
            .unwrap();
        assert_eq!(cached.release_year, 1990);
    }

    #[tokio::test]
    async fn playback_failure_is_reported_not_raised() {
        let (provider, engine) = engine_with(&[1990]).await;
        provider.set_playback_failure(true);

        let report = load_current_track(&engine, false).await.unwrap();
        assert_eq!(report.playback, PlaybackStatus::Failed);
        assert_eq!(report.failures[0].stage, LoadStage::Playback);
        assert_eq!(engine.last_load().await, report);
    }
}
