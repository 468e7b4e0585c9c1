//! Per-route catalog loaders.
//!
//! Each method pairs a [`CacheKey`] with a repository fetch and hands both to
//! the [`ContentLoader`]. Missing records surface as [`DomainError::NotFound`]
//! from inside the fetch, so a not-found result is never written to the store.

use std::sync::Arc;

use thiserror::Error;

use crate::application::loader::{CacheKey, ContentLoader};
use crate::application::repos::{CatalogRepo, RepoError};
use crate::domain::entities::{
    AlbumDetail, AlbumIndex, ArtistDetail, ArtistIndex, HOME_ALBUMS_LIMIT, HOME_ARTISTS_LIMIT,
    HOME_PLAYLISTS_LIMIT, HomeOverview, LibraryOwner, LibrarySidebar, PlaylistDetail,
    PlaylistIndex, SIDEBAR_PLAYLISTS_LIMIT,
};
use crate::domain::error::DomainError;

const MAX_ID_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepo>,
    loader: ContentLoader,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepo>, loader: ContentLoader) -> Self {
        Self { repo, loader }
    }

    /// Sidebar data for the shared layout: the library owner and their playlists.
    pub async fn layout(&self, cacheable: bool) -> Result<Option<LibraryOwner>, CatalogError> {
        self.loader
            .load(&CacheKey::Root, cacheable, || async {
                Ok::<_, CatalogError>(self.repo.library_owner().await?)
            })
            .await
    }

    pub async fn home(&self, cacheable: bool) -> Result<HomeOverview, CatalogError> {
        self.loader
            .load(&CacheKey::Home, cacheable, || async {
                let overview = self
                    .repo
                    .home_overview(HOME_ARTISTS_LIMIT, HOME_ALBUMS_LIMIT, HOME_PLAYLISTS_LIMIT)
                    .await?;
                Ok::<_, CatalogError>(overview)
            })
            .await
    }

    pub async fn albums(&self, cacheable: bool) -> Result<AlbumIndex, CatalogError> {
        self.loader
            .load(&CacheKey::AlbumIndex, cacheable, || async {
                let albums = self.repo.list_albums().await?;
                Ok::<_, CatalogError>(AlbumIndex { albums })
            })
            .await
    }

    pub async fn album(&self, id: &str, cacheable: bool) -> Result<AlbumDetail, CatalogError> {
        validate_id("album", id)?;
        self.loader
            .load(&CacheKey::Album(id.to_string()), cacheable, || async {
                found("album", id, self.repo.find_album(id).await?)
            })
            .await
    }

    pub async fn artists(&self, cacheable: bool) -> Result<ArtistIndex, CatalogError> {
        self.loader
            .load(&CacheKey::ArtistIndex, cacheable, || async {
                let artists = self.repo.list_artists().await?;
                Ok::<_, CatalogError>(ArtistIndex { artists })
            })
            .await
    }

    pub async fn artist(&self, id: &str, cacheable: bool) -> Result<ArtistDetail, CatalogError> {
        validate_id("artist", id)?;
        self.loader
            .load(&CacheKey::Artist(id.to_string()), cacheable, || async {
                found("artist", id, self.repo.find_artist(id).await?)
            })
            .await
    }

    pub async fn playlists(&self, cacheable: bool) -> Result<PlaylistIndex, CatalogError> {
        self.loader
            .load(&CacheKey::PlaylistIndex, cacheable, || async {
                let playlists = self.repo.list_playlists(None).await?;
                Ok::<_, CatalogError>(PlaylistIndex { playlists })
            })
            .await
    }

    pub async fn playlist(
        &self,
        id: &str,
        cacheable: bool,
    ) -> Result<PlaylistDetail, CatalogError> {
        validate_id("playlist", id)?;
        self.loader
            .load(&CacheKey::Playlist(id.to_string()), cacheable, || async {
                found("playlist", id, self.repo.find_playlist(id).await?)
            })
            .await
    }

    /// Playlists shown beside the signed-in library page. Never includes the user.
    pub async fn library_sidebar(&self, cacheable: bool) -> Result<LibrarySidebar, CatalogError> {
        self.loader
            .load(&CacheKey::MainIndex, cacheable, || async {
                let playlists = self
                    .repo
                    .list_playlists(Some(SIDEBAR_PLAYLISTS_LIMIT))
                    .await?;
                Ok::<_, CatalogError>(LibrarySidebar { playlists })
            })
            .await
    }

    pub async fn health_check(&self) -> Result<(), RepoError> {
        self.repo.health_check().await
    }
}

fn found<T>(entity: &'static str, id: &str, value: Option<T>) -> Result<T, CatalogError> {
    value.ok_or_else(|| DomainError::not_found(entity, id).into())
}

/// Ids become part of cache keys and upstream queries; keep them to a safe alphabet.
fn validate_id(entity: &'static str, id: &str) -> Result<(), DomainError> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(DomainError::validation(format!(
            "{entity} id must be between 1 and {MAX_ID_LEN} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DomainError::validation(format!(
            "{entity} id contains unsupported characters"
        )));
    }
    Ok(())
}
