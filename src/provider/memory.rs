use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use futures::future::{self, BoxFuture};
use serde::Deserialize;

use crate::{
    dao::models::PlaylistEntity,
    provider::{ProviderError, ProviderResult, TrackProvider},
    state::game::{Playlist, Track},
};

/// JSON library used to seed an [`InMemoryTrackProvider`] for offline play.
#[derive(Debug, Deserialize)]
pub struct LibraryFile {
    /// Playlists available offline; their tracks become fetchable too.
    pub playlists: Vec<PlaylistEntity>,
}

/// Provider backed by in-process data. Playback is only recorded.
///
/// Failure switches let callers simulate an unreachable service or a missing device.
#[derive(Clone)]
pub struct InMemoryTrackProvider {
    inner: Arc<Inner>,
}

struct Inner {
    tracks: RwLock<HashMap<String, Track>>,
    playlists: RwLock<HashMap<String, Playlist>>,
    authenticated: AtomicBool,
    fail_metadata: AtomicBool,
    fail_playback: AtomicBool,
    metadata_requests: AtomicUsize,
    playback_log: Mutex<Vec<String>>,
}

impl InMemoryTrackProvider {
    /// Empty, authenticated provider.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tracks: RwLock::new(HashMap::new()),
                playlists: RwLock::new(HashMap::new()),
                authenticated: AtomicBool::new(true),
                fail_metadata: AtomicBool::new(false),
                fail_playback: AtomicBool::new(false),
                metadata_requests: AtomicUsize::new(0),
                playback_log: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Build a provider from a parsed library file.
    pub fn from_library(library: LibraryFile) -> Self {
        let provider = Self::new();
        for playlist in library.playlists {
            provider.insert_playlist(playlist.into());
        }
        provider
    }

    /// Parse a JSON library (`{"playlists": [...]}`).
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<LibraryFile>(contents).map(Self::from_library)
    }

    /// Register a playlist and all of its tracks.
    pub fn insert_playlist(&self, playlist: Playlist) {
        for track in &playlist.tracks {
            self.insert_track(track.clone());
        }
        write(&self.inner.playlists).insert(playlist.id.clone(), playlist);
    }

    /// Register or replace a single track.
    pub fn insert_track(&self, track: Track) {
        write(&self.inner.tracks).insert(track.id.clone(), track);
    }

    /// Toggle whether credentials are considered valid.
    pub fn set_authenticated(&self, value: bool) {
        self.inner.authenticated.store(value, Ordering::SeqCst);
    }

    /// Make every metadata fetch fail with a network error.
    pub fn set_metadata_failure(&self, value: bool) {
        self.inner.fail_metadata.store(value, Ordering::SeqCst);
    }

    /// Make every playback request fail with [`ProviderError::NoActiveDevice`].
    pub fn set_playback_failure(&self, value: bool) {
        self.inner.fail_playback.store(value, Ordering::SeqCst);
    }

    /// Number of metadata fetches attempted so far.
    pub fn metadata_requests(&self) -> usize {
        self.inner.metadata_requests.load(Ordering::SeqCst)
    }

    /// Track ids whose playback was started, in order.
    pub fn played(&self) -> Vec<String> {
        self.inner
            .playback_log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn authenticated(&self) -> bool {
        self.inner.authenticated.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryTrackProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackProvider for InMemoryTrackProvider {
    fn is_authenticated(&self) -> bool {
        self.authenticated()
    }

    fn fetch_track(&self, track_id: &str) -> BoxFuture<'static, ProviderResult<Track>> {
        self.inner.metadata_requests.fetch_add(1, Ordering::SeqCst);

        let result = if !self.authenticated() {
            Err(ProviderError::Unauthenticated)
        } else if self.inner.fail_metadata.load(Ordering::SeqCst) {
            Err(ProviderError::network(format!("fetching track `{track_id}`")))
        } else {
            read(&self.inner.tracks)
                .get(track_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound {
                    resource: format!("track `{track_id}`"),
                })
        };
        Box::pin(future::ready(result))
    }

    fn start_playback(&self, track_id: &str) -> BoxFuture<'static, ProviderResult<()>> {
        let result = if !self.authenticated() {
            Err(ProviderError::Unauthenticated)
        } else if self.inner.fail_playback.load(Ordering::SeqCst) {
            Err(ProviderError::NoActiveDevice)
        } else {
            self.inner
                .playback_log
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(track_id.to_owned());
            Ok(())
        };
        Box::pin(future::ready(result))
    }

    fn fetch_playlist(&self, playlist_id: &str) -> BoxFuture<'static, ProviderResult<Playlist>> {
        let result = if !self.authenticated() {
            Err(ProviderError::Unauthenticated)
        } else {
            read(&self.inner.playlists)
                .get(playlist_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound {
                    resource: format!("playlist `{playlist_id}`"),
                })
        };
        Box::pin(future::ready(result))
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
