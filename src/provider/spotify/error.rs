//! Error types shared by the Spotify provider.

use reqwest::StatusCode;
use thiserror::Error;

use crate::provider::ProviderError;

/// Convenient result alias returning [`SpotifyError`] failures.
pub type SpotifyResult<T> = Result<T, SpotifyError>;

/// Player error reason Spotify returns when no device is available.
const NO_ACTIVE_DEVICE: &str = "NO_ACTIVE_DEVICE";

/// Failures that can occur while talking to the Spotify Web API.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build Spotify client")]
    ClientBuilder {
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
    /// No unexpired access token is stored.
    #[error("no valid Spotify access token")]
    MissingToken,
    /// A request could not be sent.
    #[error("failed to send Spotify request to `{path}`")]
    RequestSend {
        /// Requested path.
        path: String,
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
    /// Spotify answered with an unexpected status code.
    #[error("unexpected Spotify response status {status} for `{path}`")]
    RequestStatus {
        /// Requested path.
        path: String,
        /// Status returned.
        status: StatusCode,
        /// `error.reason` from the response body, when present.
        reason: Option<String>,
    },
    /// Response payload could not be parsed.
    #[error("failed to decode Spotify response for `{path}`")]
    DecodeResponse {
        /// Requested path.
        path: String,
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
}

impl From<SpotifyError> for ProviderError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::MissingToken => ProviderError::Unauthenticated,
            SpotifyError::RequestStatus { status, .. } if status == StatusCode::UNAUTHORIZED => {
                ProviderError::Unauthenticated
            }
            SpotifyError::RequestStatus {
                status,
                reason: Some(ref reason),
                ..
            } if status == StatusCode::NOT_FOUND && reason == NO_ACTIVE_DEVICE => {
                ProviderError::NoActiveDevice
            }
            SpotifyError::RequestStatus { path, status, .. } if status == StatusCode::NOT_FOUND => {
                ProviderError::NotFound { resource: path }
            }
            other @ SpotifyError::DecodeResponse { .. } => {
                ProviderError::Malformed(other.to_string())
            }
            other @ (SpotifyError::ClientBuilder { .. } | SpotifyError::RequestSend { .. }) => {
                ProviderError::Network {
                    message: other.to_string(),
                    source: Some(Box::new(other)),
                }
            }
            other @ SpotifyError::RequestStatus { .. } => ProviderError::network(other.to_string()),
        }
    }
}
