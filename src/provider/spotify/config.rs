use crate::provider::SPOTIFY_API_BASE;

/// Runtime configuration describing how to reach the Spotify Web API.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    /// API root without trailing slash, e.g. `https://api.spotify.com/v1`.
    pub api_base: String,
}

impl SpotifyConfig {
    /// Construct a configuration from an explicit API root.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self::new(SPOTIFY_API_BASE)
    }
}
