use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::application::repos::{CatalogRepo, RepoError};
use crate::domain::entities::{
    AlbumDetail, AlbumRef, AlbumSummary, ArtistAlbum, ArtistDetail, ArtistRef, ArtistSummary,
    HomeOverview, LibraryOwner, PlaylistDetail, PlaylistLink, PlaylistSummary, PlaylistTrack,
    SongSummary, TOP_SONGS_LIMIT,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(FromRow)]
struct OwnerRow {
    id: String,
    name: String,
}

#[derive(FromRow)]
struct LinkRow {
    id: String,
    name: String,
}

#[derive(FromRow)]
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

#[derive(FromRow)]
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

#[derive(FromRow)]
struct SongRow {
    id: String,
    name: String,
    length: i32,
    play_count: i64,
}

impl From<SongRow> for SongSummary {
    fn from(row: SongRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            length: row.length,
            play_count: row.play_count,
        }
    }
}

#[derive(FromRow)]
struct ArtistAlbumRow {
    id: String,
    name: String,
    cover: Option<String>,
    created_at: OffsetDateTime,
}

#[derive(FromRow)]
struct PlaylistHeaderRow {
    id: String,
    name: String,
    cover: Option<String>,
    owner: String,
}

#[derive(FromRow)]
struct TrackRow {
    id: String,
    name: String,
    length: i32,
    album_id: Option<String>,
    album_name: Option<String>,
    artist_id: String,
    artist_name: String,
}

impl From<TrackRow> for PlaylistTrack {
    fn from(row: TrackRow) -> Self {
        let album = match (row.album_id, row.album_name) {
            (Some(id), Some(name)) => Some(AlbumRef { id, name }),
            _ => None,
        };
        Self {
            id: row.id,
            name: row.name,
            length: row.length,
            album,
            artist: ArtistRef {
                id: row.artist_id,
                name: row.artist_name,
            },
        }
    }
}

impl PostgresRepositories {
    async fn playlist_rows(&self, limit: Option<u32>) -> Result<Vec<CoverRow>, RepoError> {
        sqlx::query_as::<_, CoverRow>(
            "SELECT id, name, cover FROM playlists ORDER BY name, id LIMIT $1",
        )
        .bind(limit.map(i64::from))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn album_songs(&self, album_id: &str) -> Result<Vec<SongSummary>, RepoError> {
        let rows = sqlx::query_as::<_, SongRow>(
            r#"
            SELECT s.id, s.name, s.length,
                   COALESCE(SUM(i.play_count), 0)::BIGINT AS play_count
            FROM songs s
            LEFT JOIN interactions i ON i.song_id = s.id
            WHERE s.album_id = $1
            GROUP BY s.id
            ORDER BY s.name, s.id
            "#,
        )
        .bind(album_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SongSummary::from).collect())
    }
}

#[async_trait]
impl CatalogRepo for PostgresRepositories {
    async fn library_owner(&self) -> Result<Option<LibraryOwner>, RepoError> {
        let owner = sqlx::query_as::<_, OwnerRow>("SELECT id, name FROM users ORDER BY id LIMIT 1")
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let Some(owner) = owner else {
            return Ok(None);
        };

        let playlists = sqlx::query_as::<_, LinkRow>(
            "SELECT id, name FROM playlists WHERE user_id = $1 ORDER BY name, id",
        )
        .bind(&owner.id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(Some(LibraryOwner {
            name: owner.name,
            playlists: playlists
                .into_iter()
                .map(|row| PlaylistLink {
                    id: row.id,
                    name: row.name,
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
        let artist_rows = sqlx::query_as::<_, ArtistRow>(
            "SELECT id, name, picture FROM artists ORDER BY name, id LIMIT $1",
        )
        .bind(i64::from(artists))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let album_rows = sqlx::query_as::<_, CoverRow>(
            "SELECT id, name, cover FROM albums ORDER BY created_at DESC, id LIMIT $1",
        )
        .bind(i64::from(albums))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let playlist_rows = self.playlist_rows(Some(playlists)).await?;

        Ok(HomeOverview {
            artists: artist_rows.into_iter().map(Into::into).collect(),
            albums: album_rows.into_iter().map(Into::into).collect(),
            playlists: playlist_rows.into_iter().map(Into::into).collect(),
        })
    }

    async fn list_albums(&self) -> Result<Vec<AlbumSummary>, RepoError> {
        let rows =
            sqlx::query_as::<_, CoverRow>("SELECT id, name, cover FROM albums ORDER BY name, id")
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_album(&self, id: &str) -> Result<Option<AlbumDetail>, RepoError> {
        let album =
            sqlx::query_as::<_, CoverRow>("SELECT id, name, cover FROM albums WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        let Some(album) = album else {
            return Ok(None);
        };

        let artists = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT ar.id, ar.name
            FROM album_artists aa
            INNER JOIN artists ar ON ar.id = aa.artist_id
            WHERE aa.album_id = $1
            ORDER BY ar.name, ar.id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let songs = self.album_songs(id).await?;

        Ok(Some(AlbumDetail {
            id: album.id,
            name: album.name,
            cover: album.cover,
            artists: artists
                .into_iter()
                .map(|row| ArtistRef {
                    id: row.id,
                    name: row.name,
                })
                .collect(),
            songs,
        }))
    }

    async fn list_artists(&self) -> Result<Vec<ArtistSummary>, RepoError> {
        let rows = sqlx::query_as::<_, ArtistRow>(
            "SELECT id, name, picture FROM artists ORDER BY name, id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_artist(&self, id: &str) -> Result<Option<ArtistDetail>, RepoError> {
        let artist =
            sqlx::query_as::<_, ArtistRow>("SELECT id, name, picture FROM artists WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        let Some(artist) = artist else {
            return Ok(None);
        };

        let albums = sqlx::query_as::<_, ArtistAlbumRow>(
            r#"
            SELECT al.id, al.name, al.cover, al.created_at
            FROM album_artists aa
            INNER JOIN albums al ON al.id = aa.album_id
            WHERE aa.artist_id = $1
            ORDER BY al.created_at DESC, al.id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        // Ranked by how many interactions a song has, not by summed plays.
        let top_songs = sqlx::query_as::<_, SongRow>(
            r#"
            SELECT s.id, s.name, s.length,
                   COALESCE(SUM(i.play_count), 0)::BIGINT AS play_count
            FROM songs s
            LEFT JOIN interactions i ON i.song_id = s.id
            WHERE s.artist_id = $1
            GROUP BY s.id
            ORDER BY COUNT(i.id) DESC, s.id
            LIMIT $2
            "#,
        )
        .bind(id)
        .bind(TOP_SONGS_LIMIT as i64)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(Some(ArtistDetail {
            id: artist.id,
            name: artist.name,
            picture: artist.picture,
            albums: albums
                .into_iter()
                .map(|row| ArtistAlbum {
                    id: row.id,
                    name: row.name,
                    cover: row.cover,
                    created_at: row.created_at,
                })
                .collect(),
            top_songs: top_songs.into_iter().map(Into::into).collect(),
        }))
    }

    async fn list_playlists(&self, limit: Option<u32>) -> Result<Vec<PlaylistSummary>, RepoError> {
        let rows = self.playlist_rows(limit).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_playlist(&self, id: &str) -> Result<Option<PlaylistDetail>, RepoError> {
        let header = sqlx::query_as::<_, PlaylistHeaderRow>(
            r#"
            SELECT p.id, p.name, p.cover, u.name AS owner
            FROM playlists p
            INNER JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let tracks = sqlx::query_as::<_, TrackRow>(
            r#"
            SELECT s.id, s.name, s.length,
                   al.id AS album_id, al.name AS album_name,
                   ar.id AS artist_id, ar.name AS artist_name
            FROM playlist_songs ps
            INNER JOIN songs s ON s.id = ps.song_id
            INNER JOIN artists ar ON ar.id = s.artist_id
            LEFT JOIN albums al ON al.id = s.album_id
            WHERE ps.playlist_id = $1
            ORDER BY ps.position, s.id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(Some(PlaylistDetail {
            id: header.id,
            name: header.name,
            cover: header.cover,
            owner: header.owner,
            songs: tracks.into_iter().map(Into::into).collect(),
        }))
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
