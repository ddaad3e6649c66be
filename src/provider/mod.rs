//! Track metadata and playback sources consumed by the game engine.

mod memory;
#[cfg(feature = "spotify")]
pub mod spotify;

use futures::future::BoxFuture;
use std::error::Error;
use thiserror::Error;

use crate::state::game::{Playlist, Track};

pub use memory::{InMemoryTrackProvider, LibraryFile};

/// Default root of the Spotify Web API.
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Result alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures reported by a track provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested track or playlist does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Human readable description of the missing resource.
        resource: String,
    },
    /// No valid credentials are available for the service.
    #[error("not authenticated with the streaming service")]
    Unauthenticated,
    /// Playback was requested but the account has no active player.
    #[error("no active playback device")]
    NoActiveDevice,
    /// The service could not be reached or answered with an unexpected status.
    #[error("network error: {message}")]
    Network {
        /// What was being requested.
        message: String,
        /// Underlying failure, when there is one.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    /// The service answered with data that cannot be used.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Network failure without an underlying error value.
    pub fn network(message: impl Into<String>) -> Self {
        ProviderError::Network {
            message: message.into(),
            source: None,
        }
    }
}

/// Abstraction over the streaming service supplying metadata and playback.
pub trait TrackProvider: Send + Sync {
    /// Whether usable credentials are currently available.
    fn is_authenticated(&self) -> bool;
    /// Fetch full metadata of a track.
    fn fetch_track(&self, track_id: &str) -> BoxFuture<'static, ProviderResult<Track>>;
    /// Start playing a track on the user's active device.
    fn start_playback(&self, track_id: &str) -> BoxFuture<'static, ProviderResult<()>>;
    /// Fetch a playlist with all of its tracks, in the service's order.
    fn fetch_playlist(&self, playlist_id: &str) -> BoxFuture<'static, ProviderResult<Playlist>>;
}
