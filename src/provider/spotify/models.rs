use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};
use tracing::warn;

use crate::state::game::{Playlist, Track, release_year_from_date};

#[derive(Debug, Deserialize)]
pub(super) struct TrackObject {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// `track` or `episode`; playlists may mix both.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    /// Absent on podcast episodes.
    #[serde(default)]
    pub album: Option<AlbumObject>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ArtistObject {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct AlbumObject {
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageObject {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct OwnerObject {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Playlist header; its tracks are fetched page by page.
#[derive(Debug, Deserialize)]
pub(super) struct PlaylistObject {
    pub id: String,
    pub name: String,
    pub owner: OwnerObject,
    #[serde(default)]
    pub images: Option<Vec<ImageObject>>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct PlaylistItem {
    /// Null for removed or unavailable tracks, and for entries that do not decode as one.
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Page<T> {
    pub items: Vec<T>,
    /// Absolute URL of the next page.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    pub error: ErrorObject,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorObject {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct PlayRequest {
    pub uris: Vec<String>,
}

impl PlayRequest {
    pub fn single(track_id: &str) -> Self {
        Self {
            uris: vec![format!("spotify:track:{track_id}")],
        }
    }
}

impl TrackObject {
    /// Convert to a domain track. Episodes, and tracks without an id or a usable release
    /// date, are unplayable.
    pub fn into_track(self) -> Option<Track> {
        if self.kind.as_deref().is_some_and(|kind| kind != "track") {
            warn!(item = %self.name, kind = ?self.kind, "skipping playlist item that is not a track");
            return None;
        }
        let Some(id) = self.id else {
            warn!(track = %self.name, "skipping track without id");
            return None;
        };
        let Some(album) = self.album else {
            warn!(track_id = %id, "skipping track without an album");
            return None;
        };
        let Some(release_year) = album.release_date.as_deref().and_then(release_year_from_date)
        else {
            warn!(track_id = %id, "skipping track without a release date");
            return None;
        };

        Some(Track {
            id,
            name: self.name,
            artists: self.artists.into_iter().map(|artist| artist.name).collect(),
            album: album.name,
            release_year,
            preview_url: self.preview_url,
            image_url: album.images.into_iter().next().map(|image| image.url),
        })
    }
}

impl PlaylistObject {
    pub fn into_playlist(self, items: Vec<PlaylistItem>) -> Playlist {
        Playlist {
            id: self.id,
            name: self.name,
            owner: self.owner.display_name.unwrap_or(self.owner.id),
            image_url: self
                .images
                .and_then(|images| images.into_iter().next())
                .map(|image| image.url),
            tracks: items
                .into_iter()
                .filter_map(|item| item.track)
                .filter_map(TrackObject::into_track)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = r#"{
        "id": "4uLU6hMCjMI75M1A2tKUQC",
        "name": "Never Gonna Give You Up",
        "artists": [{"name": "Rick Astley"}],
        "album": {
            "name": "Whenever You Need Somebody",
            "release_date": "1987-11-12",
            "images": [{"url": "https://i.scdn.co/large"}, {"url": "https://i.scdn.co/small"}]
        },
        "preview_url": null
    }"#;

    #[test]
    fn converts_track_objects() {
        let object: TrackObject = serde_json::from_str(TRACK).unwrap();
        let track = object.into_track().unwrap();
        assert_eq!(track.release_year, 1987);
        assert_eq!(track.artist_line(), "Rick Astley");
        assert_eq!(track.image_url.as_deref(), Some("https://i.scdn.co/large"));
    }

    #[test]
    fn playlist_drops_unplayable_items() {
        let header: PlaylistObject = serde_json::from_str(
            r#"{"id": "pl", "name": "Mix", "owner": {"id": "u1", "display_name": null}, "images": null}"#,
        )
        .unwrap();
        let page: Page<PlaylistItem> = serde_json::from_str(&format!(
            r#"{{
                "items": [
                    {{"track": {TRACK}}},
                    {{"track": null}},
                    {{"track": {{"id": "x", "name": "Undated", "album": {{"name": "?", "release_date": ""}}}}}},
                    {{"track": {{"id": null, "name": "Local file", "album": {{"name": "?", "release_date": "2001"}}}}}}
                ],
                "next": null
            }}"#
        ))
        .unwrap();

        let playlist = header.into_playlist(page.items);
        assert_eq!(playlist.owner, "u1");
        assert_eq!(playlist.image_url, None);
        assert_eq!(playlist.tracks.len(), 1);
        assert_eq!(playlist.tracks[0].id, "4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn episodes_and_odd_items_do_not_fail_the_page() {
        let page: Page<PlaylistItem> = serde_json::from_str(&format!(
            r#"{{
                "items": [
                    {{"track": {TRACK}}},
                    {{"track": {{"type": "episode", "id": "ep1", "name": "Talk", "release_date": "2020-01-01", "show": {{"name": "Pod"}}}}}},
                    {{"track": {{"type": "episode", "id": "ep2", "name": "Talk", "album": {{"name": "Pod", "release_date": "2020"}}}}}},
                    {{"track": 42}}
                ],
                "next": null
            }}"#
        ))
        .unwrap();
        assert_eq!(page.items.len(), 4);
        assert!(page.items[3].track.is_none());

        let header: PlaylistObject = serde_json::from_str(
            r#"{"id": "pl", "name": "Mix", "owner": {"id": "u1", "display_name": "Uno"}}"#,
        )
        .unwrap();
        let playlist = header.into_playlist(page.items);
        assert_eq!(playlist.owner, "Uno");
        let ids: Vec<_> = playlist.tracks.iter().map(|track| track.id.as_str()).collect();
        assert_eq!(ids, ["4uLU6hMCjMI75M1A2tKUQC"]);
    }

    #[test]
    fn play_request_uses_track_uri() {
        let body = serde_json::to_value(PlayRequest::single("abc")).unwrap();
        assert_eq!(body, serde_json::json!({"uris": ["spotify:track:abc"]}));
    }
}
