//! Spotify Web API implementation of [`TrackProvider`](crate::provider::TrackProvider).

mod client;
mod config;
mod error;
mod models;
mod tokens;

pub use client::SpotifyProvider;
pub use config::SpotifyConfig;
pub use error::{SpotifyError, SpotifyResult};
pub use tokens::SpotifyTokens;
