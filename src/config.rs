//! Application-level configuration loading.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::provider::SPOTIFY_API_BASE;

/// Default location on disk where the game looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BEATDATE_CONFIG_PATH";

const DEFAULT_WIN_SCORE: u32 = 10;
const DEFAULT_COMPARISON_YEAR: i32 = 2000;
const DEFAULT_STORE_PATH: &str = "data/store.json";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Score a team must reach to win.
    pub win_score: u32,
    /// Comparison year used for the first question of a session.
    pub default_comparison_year: i32,
    /// JSON file backing the persistent store.
    pub store_path: PathBuf,
    /// Root of the streaming-service Web API.
    pub spotify_api_base: String,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        win_score = config.win_score,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            win_score: DEFAULT_WIN_SCORE,
            default_comparison_year: DEFAULT_COMPARISON_YEAR,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            spotify_api_base: SPOTIFY_API_BASE.to_string(),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_file(contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("beatdate-config-{}.json", Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = env::temp_dir().join(format!("beatdate-absent-{}.json", Uuid::new_v4()));
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_file(r#"{"win_score": 3}"#);
        let config = AppConfig::load_from(&path);
        assert_eq!(config.win_score, 3);
        assert_eq!(config.default_comparison_year, 2000);
        assert_eq!(config.store_path, PathBuf::from("data/store.json"));
        fs::remove_file(path).unwrap();
    }

    #[cfg(feature = "spotify")]
    #[test]
    fn default_api_base_matches_the_client_default() {
        use crate::provider::spotify::SpotifyConfig;

        assert_eq!(
            AppConfig::default().spotify_api_base,
            SpotifyConfig::default().api_base
        );
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let path = temp_file("{win_score: ");
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
        fs::remove_file(path).unwrap();
    }
}
