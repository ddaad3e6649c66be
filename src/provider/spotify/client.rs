use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    dao::storage::KeyValueStore,
    provider::{ProviderError, ProviderResult, TrackProvider},
    state::game::{Playlist, Track},
};

use super::{
    config::SpotifyConfig,
    error::{SpotifyError, SpotifyResult},
    models::{ErrorEnvelope, Page, PlayRequest, PlaylistItem, PlaylistObject, TrackObject},
    tokens::SpotifyTokens,
};

/// Page size requested when listing playlist tracks.
const PLAYLIST_PAGE_SIZE: usize = 100;

/// [`TrackProvider`] talking to the Spotify Web API with the stored access token.
#[derive(Clone)]
pub struct SpotifyProvider {
    client: Client,
    api_base: Arc<str>,
    store: Arc<dyn KeyValueStore>,
}

impl SpotifyProvider {
    /// Build a provider reading its credentials from `store`.
    pub fn new(config: SpotifyConfig, store: Arc<dyn KeyValueStore>) -> SpotifyResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| SpotifyError::ClientBuilder { source })?;

        Ok(Self {
            client,
            api_base: Arc::from(config.api_base),
            store,
        })
    }

    fn access_token(&self) -> SpotifyResult<String> {
        SpotifyTokens::load(self.store.as_ref())
            .filter(SpotifyTokens::is_valid)
            .map(|tokens| tokens.access_token)
            .ok_or(SpotifyError::MissingToken)
    }

    /// Build a request for an API path or for an absolute pagination URL.
    fn request(&self, method: Method, path: &str) -> SpotifyResult<reqwest::RequestBuilder> {
        let token = self.access_token()?;
        let url = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.api_base, path)
        };
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn get_json<T>(&self, path: &str) -> SpotifyResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, path)?
            .send()
            .await
            .map_err(|source| SpotifyError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(status_error(path, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|source| SpotifyError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    async fn put_json<T>(&self, path: &str, body: &T) -> SpotifyResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, path)?
            .json(body)
            .send()
            .await
            .map_err(|source| SpotifyError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(path, response).await)
        }
    }

    async fn load_playlist(&self, playlist_id: &str) -> SpotifyResult<Playlist> {
        let header: PlaylistObject = self.get_json(&format!("/playlists/{playlist_id}")).await?;

        let mut items = Vec::new();
        let mut next = Some(format!(
            "/playlists/{playlist_id}/tracks?limit={PLAYLIST_PAGE_SIZE}"
        ));
        while let Some(path) = next {
            let page: Page<PlaylistItem> = self.get_json(&path).await?;
            debug!(playlist_id, items = page.items.len(), "fetched playlist page");
            items.extend(page.items);
            next = page.next;
        }

        Ok(header.into_playlist(items))
    }
}

/// Turn a non-success response into an error, keeping Spotify's `error.reason` when present.
async fn status_error(path: &str, response: Response) -> SpotifyError {
    let status = response.status();
    let reason = response
        .json::<ErrorEnvelope>()
        .await
        .ok()
        .and_then(|envelope| envelope.error.reason);

    SpotifyError::RequestStatus {
        path: path.to_string(),
        status,
        reason,
    }
}

impl TrackProvider for SpotifyProvider {
    fn is_authenticated(&self) -> bool {
        self.access_token().is_ok()
    }

    fn fetch_track(&self, track_id: &str) -> BoxFuture<'static, ProviderResult<Track>> {
        let provider = self.clone();
        let track_id = track_id.to_string();
        Box::pin(async move {
            let object: TrackObject = provider.get_json(&format!("/tracks/{track_id}")).await?;
            object.into_track().ok_or_else(|| {
                ProviderError::Malformed(format!("track `{track_id}` is not a playable track with a release date"))
            })
        })
    }

    fn start_playback(&self, track_id: &str) -> BoxFuture<'static, ProviderResult<()>> {
        let provider = self.clone();
        let body = PlayRequest::single(track_id);
        Box::pin(async move {
            provider.put_json("/me/player/play", &body).await?;
            Ok(())
        })
    }

    fn fetch_playlist(&self, playlist_id: &str) -> BoxFuture<'static, ProviderResult<Playlist>> {
        let provider = self.clone();
        let playlist_id = playlist_id.to_string();
        Box::pin(async move { Ok(provider.load_playlist(&playlist_id).await?) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::kv_store::MemoryStore;

    fn provider(store: Arc<MemoryStore>) -> SpotifyProvider {
        SpotifyProvider::new(SpotifyConfig::new("http://127.0.0.1:9/v1/"), store).unwrap()
    }

    #[test]
    fn authentication_follows_stored_token() {
        let store = Arc::new(MemoryStore::new());
        let provider = provider(store.clone());
        assert!(!provider.is_authenticated());

        SpotifyTokens::new("token", Duration::from_secs(60))
            .save(store.as_ref())
            .unwrap();
        assert!(provider.is_authenticated());
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let provider = provider(Arc::new(MemoryStore::new()));
        assert!(matches!(
            provider.fetch_track("abc").await,
            Err(ProviderError::Unauthenticated)
        ));
    }
}
