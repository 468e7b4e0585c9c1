//! Repository traits describing catalog data sources.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    AlbumDetail, AlbumSummary, ArtistDetail, ArtistSummary, HomeOverview, LibraryOwner,
    PlaylistDetail, PlaylistSummary,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("unexpected data shape: {0}")]
    Decode(String),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Read-only access to the music catalog.
///
/// Implemented by the Postgres adapter and by the hosted-backend adapter;
/// exactly one of them is wired in at startup.
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// The first user in the catalog together with their playlists.
    async fn library_owner(&self) -> Result<Option<LibraryOwner>, RepoError>;

    async fn home_overview(
        &self,
        artists: u32,
        albums: u32,
        playlists: u32,
    ) -> Result<HomeOverview, RepoError>;

    async fn list_albums(&self) -> Result<Vec<AlbumSummary>, RepoError>;

    async fn find_album(&self, id: &str) -> Result<Option<AlbumDetail>, RepoError>;

    async fn list_artists(&self) -> Result<Vec<ArtistSummary>, RepoError>;

    async fn find_artist(&self, id: &str) -> Result<Option<ArtistDetail>, RepoError>;

    async fn list_playlists(&self, limit: Option<u32>) -> Result<Vec<PlaylistSummary>, RepoError>;

    async fn find_playlist(&self, id: &str) -> Result<Option<PlaylistDetail>, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}
