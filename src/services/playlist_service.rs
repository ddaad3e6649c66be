use rand::{Rng, seq::SliceRandom};
use tracing::{info, warn};

use crate::{
    dao::session_repository::SessionRepository,
    error::GameError,
    provider::TrackProvider,
    state::game::Playlist,
};

const URI_PREFIX: &str = "spotify:playlist:";
const URL_SEGMENT: &str = "playlist/";

/// Extract a playlist id from a share URL, a `spotify:playlist:` URI or a bare id.
pub fn extract_playlist_id(input: &str) -> Result<String, GameError> {
    let input = input.trim();

    let (candidate, bare) = if let Some(rest) = input.strip_prefix(URI_PREFIX) {
        (rest, false)
    } else if let Some(position) = input.find(URL_SEGMENT) {
        (&input[position + URL_SEGMENT.len()..], false)
    } else {
        (input, true)
    };

    // Links carry query strings and trailing segments after the id.
    let id: String = candidate
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    if id.is_empty() || (bare && id.len() != input.len()) {
        return Err(GameError::InvalidInput(format!(
            "`{input}` is not a playlist link or id"
        )));
    }
    Ok(id)
}

/// Fetch a playlist for preview, in the service's order.
pub async fn load_playlist(
    provider: &dyn TrackProvider,
    input: &str,
) -> Result<Playlist, GameError> {
    let playlist_id = extract_playlist_id(input)?;
    if !provider.is_authenticated() {
        return Err(GameError::AuthenticationRequired);
    }

    let playlist = provider.fetch_playlist(&playlist_id).await?;
    if playlist.tracks.is_empty() {
        warn!(playlist_id = %playlist.id, "playlist has no playable tracks");
    }
    Ok(playlist)
}

/// Shuffle a playlist once and store it as the selection for the next bootstrap.
///
/// A playlist is fixed for the life of a game; a new one is accepted only before the
/// first bootstrap or once the current playlist is exhausted.
pub fn use_playlist<R>(
    repository: &SessionRepository,
    mut playlist: Playlist,
    rng: &mut R,
) -> Result<Playlist, GameError>
where
    R: Rng + ?Sized,
{
    ensure_playlist_replaceable(repository)?;

    playlist.tracks.shuffle(rng);
    repository.save_selected_playlist(playlist.clone())?;
    info!(
        playlist_id = %playlist.id,
        tracks = playlist.tracks.len(),
        "playlist selected"
    );
    Ok(playlist)
}

fn ensure_playlist_replaceable(repository: &SessionRepository) -> Result<(), GameError> {
    if repository
        .load_session()
        .is_some_and(|session| !session.is_exhausted())
    {
        return Err(GameError::InvalidState(
            "the playlist cannot change while a game is in progress; reset first".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        dao::kv_store::MemoryStore, provider::InMemoryTrackProvider, state::game::fixtures,
    };

    #[test]
    fn extracts_ids_from_links_uris_and_bare_ids() {
        assert_eq!(
            extract_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc")
                .unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(
            extract_playlist_id("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(
            extract_playlist_id(" 37i9dQZF1DXcBWIGoYBM5M ").unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
    }

    #[test]
    fn rejects_other_input() {
        assert!(extract_playlist_id("").is_err());
        assert!(extract_playlist_id("https://open.spotify.com/album/").is_err());
        assert!(extract_playlist_id("not a playlist").is_err());
    }

    #[test]
    fn shuffle_preserves_the_tracks() {
        let repository = SessionRepository::new(Arc::new(MemoryStore::new()));
        let playlist = fixtures::playlist(&[1960, 1970, 1980, 1990, 2000, 2010, 2020]);
        let mut rng = StdRng::seed_from_u64(7);

        let shuffled = use_playlist(&repository, playlist.clone(), &mut rng).unwrap();

        let mut before: Vec<_> = playlist.tracks.iter().map(|track| &track.id).collect();
        let mut after: Vec<_> = shuffled.tracks.iter().map(|track| &track.id).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        assert_eq!(repository.load_selected_playlist(), Some(shuffled));
    }

    #[test]
    fn selection_is_locked_while_a_game_is_running() {
        let repository = SessionRepository::new(Arc::new(MemoryStore::new()));
        let mut session = fixtures::session(&["A"], &[1990, 2005]);
        repository.save_session(&session).unwrap();
        let replacement = fixtures::playlist(&[1970]);
        let mut rng = StdRng::seed_from_u64(1);

        let err = use_playlist(&repository, replacement.clone(), &mut rng).unwrap_err();
        assert!(matches!(err, GameError::InvalidState(_)));
        assert_eq!(repository.load_selected_playlist(), None);

        session.track_index = session.playlist.tracks.len();
        repository.save_session(&session).unwrap();
        assert!(use_playlist(&repository, replacement, &mut rng).is_ok());
    }

    #[tokio::test]
    async fn loading_requires_authentication() {
        let provider = InMemoryTrackProvider::new();
        provider.insert_playlist(fixtures::playlist(&[1990]));

        let playlist = load_playlist(&provider, "spotify:playlist:pl1").await.unwrap();
        assert_eq!(playlist.tracks.len(), 1);

        provider.set_authenticated(false);
        assert!(matches!(
            load_playlist(&provider, "pl1").await,
            Err(GameError::AuthenticationRequired)
        ));
    }
}
