//! Catalog records and the per-route shapes built from them.
//!
//! Every loader result is serialized to the key-value store as JSON, so each
//! type here round-trips through serde without loss.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistLink {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub cover: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub cover: Option<String>,
}

/// Listening statistics recorded for a single user and song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Interaction {
    pub play_count: i64,
    pub is_liked: bool,
}

/// A song with its aggregated play count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSummary {
    pub id: String,
    pub name: String,
    /// Duration in seconds.
    pub length: i32,
    pub play_count: i64,
}

impl SongSummary {
    pub fn from_interactions(
        id: String,
        name: String,
        length: i32,
        interactions: &[Interaction],
    ) -> Self {
        Self {
            id,
            name,
            length,
            play_count: interactions.iter().map(|i| i.play_count).sum(),
        }
    }
}

/// The library owner shown in the layout sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryOwner {
    pub name: String,
    pub playlists: Vec<PlaylistLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeOverview {
    pub artists: Vec<ArtistSummary>,
    pub albums: Vec<AlbumSummary>,
    pub playlists: Vec<PlaylistSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumIndex {
    pub albums: Vec<AlbumSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistIndex {
    pub artists: Vec<ArtistSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistIndex {
    pub playlists: Vec<PlaylistSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumDetail {
    pub id: String,
    pub name: String,
    pub cover: Option<String>,
    pub artists: Vec<ArtistRef>,
    pub songs: Vec<SongSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistAlbum {
    pub id: String,
    pub name: String,
    pub cover: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistDetail {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
    pub albums: Vec<ArtistAlbum>,
    /// At most five songs, most-interacted first.
    pub top_songs: Vec<SongSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub id: String,
    pub name: String,
    pub length: i32,
    pub album: Option<AlbumRef>,
    pub artist: ArtistRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistDetail {
    pub id: String,
    pub name: String,
    pub cover: Option<String>,
    pub owner: String,
    pub songs: Vec<PlaylistTrack>,
}

/// Playlists listed beside the signed-in library page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySidebar {
    pub playlists: Vec<PlaylistSummary>,
}

pub const TOP_SONGS_LIMIT: usize = 5;
pub const HOME_ARTISTS_LIMIT: u32 = 5;
pub const HOME_ALBUMS_LIMIT: u32 = 5;
pub const HOME_PLAYLISTS_LIMIT: u32 = 10;
pub const SIDEBAR_PLAYLISTS_LIMIT: u32 = 5;

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn song_summary_sums_play_counts() {
        let interactions = [
            Interaction {
                play_count: 3,
                is_liked: true,
            },
            Interaction {
                play_count: 4,
                is_liked: false,
            },
        ];
        let song = SongSummary::from_interactions("s1".into(), "Intro".into(), 93, &interactions);
        assert_eq!(song.play_count, 7);
    }

    #[test]
    fn artist_album_dates_serialize_as_rfc3339() {
        let album = ArtistAlbum {
            id: "A1".into(),
            name: "First".into(),
            cover: None,
            created_at: datetime!(2021-03-04 05:06:07 UTC),
        };
        let json = serde_json::to_string(&album).expect("serialize");
        assert!(json.contains("\"2021-03-04T05:06:07Z\""));
        let back: ArtistAlbum = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, album);
    }
}
