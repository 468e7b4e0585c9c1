use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::error::{ErrorReport, HttpError};
use crate::domain::entities::{
    AlbumDetail, AlbumIndex, ArtistDetail, ArtistIndex, HomeOverview, LibrarySidebar,
    PlaylistDetail, PlaylistIndex, SongSummary,
};
use crate::domain::session::AuthUser;
use crate::presentation::format;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome.with_title("Not Found"), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Render the error page for `err`, keeping its diagnostic report on the response.
pub fn render_error_response(chrome: LayoutChrome, err: HttpError) -> Response {
    let status = err.status();
    let content = ErrorPageView::from_status(status, err.public_message());
    let view = LayoutContext::new(chrome.with_title("Error"), content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    err.into_report().attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

/// The library owner's playlists listed beside every page.
#[derive(Clone)]
pub struct SidebarView {
    pub owner: String,
    pub playlists: Vec<NavigationLinkView>,
}

#[derive(Clone, Copy)]
pub struct SessionView {
    pub signed_in: bool,
    pub cacheable: bool,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub sidebar: Option<SidebarView>,
    pub session: SessionView,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    /// Prefix the document title: `"Northern Lines | Albums | Spindle"`.
    pub fn with_title(self, page: &str) -> Self {
        let title = format!("{page} | {}", self.meta.title);
        Self {
            meta: PageMetaView { title, ..self.meta },
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub sidebar: Option<SidebarView>,
    pub session: SessionView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            sidebar: chrome.sidebar,
            session: chrome.session,
            meta: chrome.meta,
            content,
        }
    }
}

/// A linked tile with an optional image, used by every index page.
#[derive(Clone)]
pub struct CardView {
    pub href: String,
    pub title: String,
    pub image: Option<String>,
    pub caption: Option<String>,
}

#[derive(Clone)]
pub struct SongRowView {
    pub position: usize,
    pub name: String,
    pub plays: String,
    pub duration: String,
    pub album: Option<NavigationLinkView>,
    pub artist: Option<NavigationLinkView>,
}

impl SongRowView {
    fn from_summary(position: usize, song: &SongSummary) -> Self {
        Self {
            position,
            name: song.name.clone(),
            plays: format::count(song.play_count),
            duration: format::duration_short(i64::from(song.length)),
            album: None,
            artist: None,
        }
    }
}

pub struct HomeView {
    pub artists: Vec<CardView>,
    pub albums: Vec<CardView>,
    pub playlists: Vec<CardView>,
}

impl From<HomeOverview> for HomeView {
    fn from(home: HomeOverview) -> Self {
        Self {
            artists: home
                .artists
                .into_iter()
                .map(|a| card(format!("/artist/{}", a.id), a.name, a.picture))
                .collect(),
            albums: home
                .albums
                .into_iter()
                .map(|a| card(format!("/album/{}", a.id), a.name, a.cover))
                .collect(),
            playlists: home
                .playlists
                .into_iter()
                .map(|p| card(format!("/playlist/{}", p.id), p.name, p.cover))
                .collect(),
        }
    }
}

/// Any of the three catalog index pages.
pub struct IndexView {
    pub heading: &'static str,
    pub cards: Vec<CardView>,
}

impl From<AlbumIndex> for IndexView {
    fn from(index: AlbumIndex) -> Self {
        Self {
            heading: "Albums",
            cards: index
                .albums
                .into_iter()
                .map(|a| card(format!("/album/{}", a.id), a.name, a.cover))
                .collect(),
        }
    }
}

impl From<ArtistIndex> for IndexView {
    fn from(index: ArtistIndex) -> Self {
        Self {
            heading: "Artists",
            cards: index
                .artists
                .into_iter()
                .map(|a| card(format!("/artist/{}", a.id), a.name, a.picture))
                .collect(),
        }
    }
}

impl From<PlaylistIndex> for IndexView {
    fn from(index: PlaylistIndex) -> Self {
        Self {
            heading: "Playlists",
            cards: index
                .playlists
                .into_iter()
                .map(|p| card(format!("/playlist/{}", p.id), p.name, p.cover))
                .collect(),
        }
    }
}

pub struct AlbumView {
    pub name: String,
    pub cover: Option<String>,
    pub artists: Vec<NavigationLinkView>,
    pub songs: Vec<SongRowView>,
    pub total: String,
}

impl From<AlbumDetail> for AlbumView {
    fn from(album: AlbumDetail) -> Self {
        let total: i64 = album.songs.iter().map(|s| i64::from(s.length)).sum();
        Self {
            songs: album
                .songs
                .iter()
                .enumerate()
                .map(|(i, song)| SongRowView::from_summary(i + 1, song))
                .collect(),
            artists: album
                .artists
                .into_iter()
                .map(|a| NavigationLinkView {
                    href: format!("/artist/{}", a.id),
                    label: a.name,
                })
                .collect(),
            name: album.name,
            cover: album.cover,
            total: format::duration_long(total),
        }
    }
}

pub struct ArtistView {
    pub name: String,
    pub picture: Option<String>,
    pub top_songs: Vec<SongRowView>,
    pub albums: Vec<CardView>,
}

impl From<ArtistDetail> for ArtistView {
    fn from(artist: ArtistDetail) -> Self {
        Self {
            name: artist.name,
            picture: artist.picture,
            top_songs: artist
                .top_songs
                .iter()
                .enumerate()
                .map(|(i, song)| SongRowView::from_summary(i + 1, song))
                .collect(),
            albums: artist
                .albums
                .into_iter()
                .map(|a| CardView {
                    href: format!("/album/{}", a.id),
                    title: a.name,
                    image: a.cover,
                    caption: Some(format::date(a.created_at)),
                })
                .collect(),
        }
    }
}

pub struct PlaylistView {
    pub name: String,
    pub cover: Option<String>,
    pub owner: String,
    pub song_count: usize,
    pub total: String,
    pub songs: Vec<SongRowView>,
}

impl From<PlaylistDetail> for PlaylistView {
    fn from(playlist: PlaylistDetail) -> Self {
        let total: i64 = playlist.songs.iter().map(|s| i64::from(s.length)).sum();
        Self {
            name: playlist.name,
            cover: playlist.cover,
            owner: playlist.owner,
            song_count: playlist.songs.len(),
            total: format::duration_long(total),
            songs: playlist
                .songs
                .into_iter()
                .enumerate()
                .map(|(i, track)| SongRowView {
                    position: i + 1,
                    name: track.name,
                    plays: String::new(),
                    duration: format::duration_short(i64::from(track.length)),
                    album: track.album.map(|album| NavigationLinkView {
                        href: format!("/album/{}", album.id),
                        label: album.name,
                    }),
                    artist: Some(NavigationLinkView {
                        href: format!("/artist/{}", track.artist.id),
                        label: track.artist.name,
                    }),
                })
                .collect(),
        }
    }
}

pub struct SignInView {
    pub provider: String,
    pub provider_href: Option<String>,
    pub signed_in_as: Option<String>,
}

pub struct LibraryView {
    pub user: String,
    pub playlists: Vec<CardView>,
}

impl LibraryView {
    pub fn new(user: &AuthUser, sidebar: LibrarySidebar) -> Self {
        Self {
            user: user.display_name().to_string(),
            playlists: sidebar
                .playlists
                .into_iter()
                .map(|p| card(format!("/playlist/{}", p.id), p.name, p.cover))
                .collect(),
        }
    }
}

fn card(href: String, title: String, image: Option<String>) -> CardView {
    CardView {
        href,
        title,
        image,
        caption: None,
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub view: LayoutContext<HomeView>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

#[derive(Template)]
#[template(path = "album.html")]
pub struct AlbumTemplate {
    pub view: LayoutContext<AlbumView>,
}

#[derive(Template)]
#[template(path = "artist.html")]
pub struct ArtistTemplate {
    pub view: LayoutContext<ArtistView>,
}

#[derive(Template)]
#[template(path = "playlist.html")]
pub struct PlaylistTemplate {
    pub view: LayoutContext<PlaylistView>,
}

#[derive(Template)]
#[template(path = "signin.html")]
pub struct SignInTemplate {
    pub view: LayoutContext<SignInView>,
}

#[derive(Template)]
#[template(path = "library.html")]
pub struct LibraryTemplate {
    pub view: LayoutContext<LibraryView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn from_status(status: StatusCode, message: &str) -> Self {
        if status == StatusCode::NOT_FOUND {
            return Self::not_found();
        }
        Self {
            title: status
                .canonical_reason()
                .unwrap_or("Something went wrong")
                .to_string(),
            message: message.to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
