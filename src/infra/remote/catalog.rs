//! Catalog reads against the hosted backend's REST interface.
//!
//! Responses use the backend's table and column names (`Album`, `createdAt`,
//! `_AlbumToArtist`, ...). Rows are decoded into private serde types and
//! narrowed into the same domain shapes the Postgres adapter produces.

use async_trait::async_trait;
use serde::Deserialize;
use time::{
    OffsetDateTime, PrimitiveDateTime,
    format_description::well_known::{Iso8601, Rfc3339},
};

use crate::application::repos::{CatalogRepo, RepoError};
use crate::domain::entities::{
    AlbumDetail, AlbumRef, AlbumSummary, ArtistAlbum, ArtistDetail, ArtistRef, ArtistSummary,
    HomeOverview, Interaction, LibraryOwner, PlaylistDetail, PlaylistLink, PlaylistSummary,
    PlaylistTrack, SongSummary, TOP_SONGS_LIMIT,
};

use super::client::{BackendClient, Filter};

const OWNER_COLUMNS: &str = "name, Playlist (id, name)";
const ARTIST_COLUMNS: &str = "id, name, picture";
const COVER_COLUMNS: &str = "id, name, cover";
const ALBUM_DETAIL_COLUMNS: &str =
    "id, name, cover, Song (id, name, length, Interaction (playCount)), _AlbumToArtist (Artist (id, name))";
const ARTIST_DETAIL_COLUMNS: &str =
    "id, name, picture, _AlbumToArtist (Album (id, name, cover, createdAt)), Song (id, name, length, Interaction (playCount))";
const PLAYLIST_DETAIL_COLUMNS: &str =
    "id, name, cover, User (name), _PlaylistToSong (Song (id, name, length, Album (id, name), Artist (id, name)))";

#[derive(Deserialize)]
struct NamedRow {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ArtistRow {
    id: String,
    name: String,
    picture: Option<String>,
}

impl From<ArtistRow> for ArtistSummary {
    fn from(row: ArtistRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            picture: row.picture,
        }
    }
}

#[derive(Deserialize)]
struct CoverRow {
    id: String,
    name: String,
    cover: Option<String>,
}

impl From<CoverRow> for AlbumSummary {
    fn from(row: CoverRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            cover: row.cover,
        }
    }
}

impl From<CoverRow> for PlaylistSummary {
    fn from(row: CoverRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            cover: row.cover,
        }
    }
}

#[derive(Deserialize)]
struct OwnerRow {
    name: String,
    #[serde(rename = "Playlist", default)]
    playlists: Vec<NamedRow>,
}

#[derive(Deserialize)]
struct InteractionRow {
    #[serde(rename = "playCount")]
    play_count: i64,
    #[serde(rename = "isLiked", default)]
    is_liked: bool,
}

#[derive(Deserialize)]
struct SongRow {
    id: String,
    name: String,
    length: f64,
    #[serde(rename = "Interaction", default)]
    interactions: Vec<InteractionRow>,
}

impl From<SongRow> for SongSummary {
    fn from(row: SongRow) -> Self {
        let interactions: Vec<Interaction> = row
            .interactions
            .into_iter()
            .map(|i| Interaction {
                play_count: i.play_count,
                is_liked: i.is_liked,
            })
            .collect();
        SongSummary::from_interactions(row.id, row.name, seconds(row.length), &interactions)
    }
}

#[derive(Deserialize)]
struct ArtistLink {
    #[serde(rename = "Artist")]
    artist: NamedRow,
}

#[derive(Deserialize)]
struct AlbumDetailRow {
    id: String,
    name: String,
    cover: Option<String>,
    #[serde(rename = "Song", default)]
    songs: Vec<SongRow>,
    #[serde(rename = "_AlbumToArtist", default)]
    artists: Vec<ArtistLink>,
}

#[derive(Deserialize)]
struct ArtistAlbumRow {
    id: String,
    name: String,
    cover: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: String,
}

#[derive(Deserialize)]
struct AlbumLink {
    #[serde(rename = "Album")]
    album: ArtistAlbumRow,
}

#[derive(Deserialize)]
struct ArtistDetailRow {
    id: String,
    name: String,
    picture: Option<String>,
    #[serde(rename = "_AlbumToArtist", default)]
    albums: Vec<AlbumLink>,
    #[serde(rename = "Song", default)]
    songs: Vec<SongRow>,
}

#[derive(Deserialize)]
struct OwnerNameRow {
    name: String,
}

#[derive(Deserialize)]
struct TrackRow {
    id: String,
    name: String,
    length: f64,
    #[serde(rename = "Album")]
    album: Option<NamedRow>,
    #[serde(rename = "Artist")]
    artist: NamedRow,
}

#[derive(Deserialize)]
struct PlaylistEntry {
    #[serde(rename = "Song")]
    song: TrackRow,
}

#[derive(Deserialize)]
struct PlaylistDetailRow {
    id: String,
    name: String,
    cover: Option<String>,
    #[serde(rename = "User")]
    user: Option<OwnerNameRow>,
    #[serde(rename = "_PlaylistToSong", default)]
    entries: Vec<PlaylistEntry>,
}

/// Song lengths may arrive as fractional seconds.
fn seconds(length: f64) -> i32 {
    if !length.is_finite() || length <= 0.0 {
        return 0;
    }
    length.round().min(f64::from(i32::MAX)) as i32
}

/// Accepts RFC 3339 and the offset-less ISO 8601 form the backend emits for
/// `timestamp` columns, which are stored in UTC.
fn parse_timestamp(value: &str) -> Result<OffsetDateTime, RepoError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .or_else(|_| PrimitiveDateTime::parse(value, &Iso8601::DEFAULT).map(|dt| dt.assume_utc()))
        .map_err(|err| RepoError::Decode(format!("timestamp `{value}`: {err}")))
}

/// Songs with the most interactions first, ties broken by id.
fn top_songs(mut songs: Vec<SongRow>) -> Vec<SongSummary> {
    songs.sort_by(|a, b| {
        b.interactions
            .len()
            .cmp(&a.interactions.len())
            .then_with(|| a.id.cmp(&b.id))
    });
    songs
        .into_iter()
        .take(TOP_SONGS_LIMIT)
        .map(SongSummary::from)
        .collect()
}

impl TryFrom<ArtistDetailRow> for ArtistDetail {
    type Error = RepoError;

    fn try_from(row: ArtistDetailRow) -> Result<Self, Self::Error> {
        let mut albums = row
            .albums
            .into_iter()
            .map(|link| {
                Ok(ArtistAlbum {
                    created_at: parse_timestamp(&link.album.created_at)?,
                    id: link.album.id,
                    name: link.album.name,
                    cover: link.album.cover,
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;
        albums.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(Self {
            id: row.id,
            name: row.name,
            picture: row.picture,
            albums,
            top_songs: top_songs(row.songs),
        })
    }
}

impl From<AlbumDetailRow> for AlbumDetail {
    fn from(row: AlbumDetailRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            cover: row.cover,
            artists: row
                .artists
                .into_iter()
                .map(|link| ArtistRef {
                    id: link.artist.id,
                    name: link.artist.name,
                })
                .collect(),
            songs: row.songs.into_iter().map(SongSummary::from).collect(),
        }
    }
}

impl TryFrom<PlaylistDetailRow> for PlaylistDetail {
    type Error = RepoError;

    fn try_from(row: PlaylistDetailRow) -> Result<Self, Self::Error> {
        let owner = row
            .user
            .ok_or_else(|| RepoError::Decode(format!("playlist `{}` has no owner", row.id)))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            cover: row.cover,
            owner: owner.name,
            songs: row
                .entries
                .into_iter()
                .map(|entry| {
                    let song = entry.song;
                    PlaylistTrack {
                        id: song.id,
                        name: song.name,
                        length: seconds(song.length),
                        album: song.album.map(|album| AlbumRef {
                            id: album.id,
                            name: album.name,
                        }),
                        artist: ArtistRef {
                            id: song.artist.id,
                            name: song.artist.name,
                        },
                    }
                })
                .collect(),
        })
    }
}

#[derive(Clone)]
pub struct HostedCatalog {
    client: BackendClient,
}

impl HostedCatalog {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn first<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        id: &str,
    ) -> Result<Option<T>, RepoError> {
        let rows: Vec<T> = self
            .client
            .select(table, columns, &[Filter::eq("id", id)], Some(1))
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl CatalogRepo for HostedCatalog {
    async fn library_owner(&self) -> Result<Option<LibraryOwner>, RepoError> {
        let rows: Vec<OwnerRow> = self.client.select("User", OWNER_COLUMNS, &[], Some(1)).await?;
        Ok(rows.into_iter().next().map(|row| LibraryOwner {
            name: row.name,
            playlists: row
                .playlists
                .into_iter()
                .map(|p| PlaylistLink {
                    id: p.id,
                    name: p.name,
                })
                .collect(),
        }))
    }

    async fn home_overview(
        &self,
        artists: u32,
        albums: u32,
        playlists: u32,
    ) -> Result<HomeOverview, RepoError> {
        let (artist_rows, album_rows, playlist_rows) = tokio::try_join!(
            self.client
                .select::<ArtistRow>("Artist", ARTIST_COLUMNS, &[], Some(artists)),
            self.client
                .select::<CoverRow>("Album", COVER_COLUMNS, &[], Some(albums)),
            self.client
                .select::<CoverRow>("Playlist", COVER_COLUMNS, &[], Some(playlists)),
        )?;

        Ok(HomeOverview {
            artists: artist_rows.into_iter().map(Into::into).collect(),
            albums: album_rows.into_iter().map(Into::into).collect(),
            playlists: playlist_rows.into_iter().map(Into::into).collect(),
        })
    }

    async fn list_albums(&self) -> Result<Vec<AlbumSummary>, RepoError> {
        let rows: Vec<CoverRow> = self.client.select("Album", COVER_COLUMNS, &[], None).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_album(&self, id: &str) -> Result<Option<AlbumDetail>, RepoError> {
        let row: Option<AlbumDetailRow> = self.first("Album", ALBUM_DETAIL_COLUMNS, id).await?;
        Ok(row.map(AlbumDetail::from))
    }

    async fn list_artists(&self) -> Result<Vec<ArtistSummary>, RepoError> {
        let rows: Vec<ArtistRow> = self
            .client
            .select("Artist", ARTIST_COLUMNS, &[], None)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_artist(&self, id: &str) -> Result<Option<ArtistDetail>, RepoError> {
        let row: Option<ArtistDetailRow> = self.first("Artist", ARTIST_DETAIL_COLUMNS, id).await?;
        row.map(ArtistDetail::try_from).transpose()
    }

    async fn list_playlists(&self, limit: Option<u32>) -> Result<Vec<PlaylistSummary>, RepoError> {
        let rows: Vec<CoverRow> = self
            .client
            .select("Playlist", COVER_COLUMNS, &[], limit)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_playlist(&self, id: &str) -> Result<Option<PlaylistDetail>, RepoError> {
        let row: Option<PlaylistDetailRow> =
            self.first("Playlist", PLAYLIST_DETAIL_COLUMNS, id).await?;
        row.map(PlaylistDetail::try_from).transpose()
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        let _: Vec<NamedRow> = self.client.select("Artist", "id, name", &[], Some(1)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn album_detail_sums_interactions_and_flattens_artists() {
        let row: AlbumDetailRow = serde_json::from_str(
            r#"{
                "id": "A1",
                "name": "Northern Lines",
                "cover": "https://img.example/a1.jpg",
                "Song": [
                    {"id": "S1", "name": "Opening", "length": 185.4,
                     "Interaction": [{"playCount": 3}, {"playCount": 9}]}
                ],
                "_AlbumToArtist": [{"Artist": {"id": "R1", "name": "Ana"}}]
            }"#,
        )
        .expect("decode");

        let detail = AlbumDetail::from(row);
        assert_eq!(detail.artists[0].name, "Ana");
        assert_eq!(detail.songs[0].length, 185);
        assert_eq!(detail.songs[0].play_count, 12);
    }

    #[test]
    fn artist_top_songs_rank_by_interaction_count() {
        let songs = (0..7)
            .map(|n| SongRow {
                id: format!("S{n}"),
                name: format!("Song {n}"),
                length: 60.0,
                interactions: (0..n)
                    .map(|_| InteractionRow {
                        play_count: 1,
                        is_liked: false,
                    })
                    .collect(),
            })
            .collect();

        let ranked: Vec<String> = top_songs(songs).into_iter().map(|s| s.id).collect();
        assert_eq!(ranked, vec!["S6", "S5", "S4", "S3", "S2"]);
    }

    #[test]
    fn timestamps_without_offset_are_utc() {
        assert_eq!(
            parse_timestamp("2021-12-01T10:00:00.123").expect("naive"),
            datetime!(2021-12-01 10:00:00.123 UTC)
        );
        assert_eq!(
            parse_timestamp("2021-12-01T10:00:00+02:00").expect("rfc3339"),
            datetime!(2021-12-01 08:00:00 UTC)
        );
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(RepoError::Decode(_))
        ));
    }

    #[test]
    fn playlist_without_owner_is_a_decode_error() {
        let row: PlaylistDetailRow = serde_json::from_str(
            r#"{"id": "P1", "name": "Morning", "cover": null, "User": null, "_PlaylistToSong": []}"#,
        )
        .expect("decode");
        assert!(matches!(
            PlaylistDetail::try_from(row),
            Err(RepoError::Decode(_))
        ));
    }

    #[test]
    fn playlist_tracks_keep_optional_album() {
        let row: PlaylistDetailRow = serde_json::from_str(
            r#"{
                "id": "P1", "name": "Morning", "cover": null,
                "User": {"name": "Ana"},
                "_PlaylistToSong": [
                    {"Song": {"id": "S1", "name": "Loose", "length": 61,
                              "Album": null, "Artist": {"id": "R1", "name": "Ana"}}}
                ]
            }"#,
        )
        .expect("decode");
        let detail = PlaylistDetail::try_from(row).expect("playlist");
        assert_eq!(detail.owner, "Ana");
        assert_eq!(detail.songs[0].album, None);
        assert_eq!(detail.songs[0].length, 61);
    }

    #[test]
    fn negative_or_nan_lengths_clamp_to_zero() {
        assert_eq!(seconds(-3.0), 0);
        assert_eq!(seconds(f64::NAN), 0);
        assert_eq!(seconds(59.6), 60);
    }
}
