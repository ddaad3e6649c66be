/// Standings projection.
pub mod leaderboard_service;
/// Playlist parsing, loading and selection.
pub mod playlist_service;
/// Game session lifecycle and turn flow.
pub mod session_service;
/// Team roster management.
pub mod team_service;
/// Track metadata and playback loading.
pub mod track_loader;
