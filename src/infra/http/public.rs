use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{FromRef, Path, State},
    http::{
        HeaderMap, StatusCode,
        header::{HOST, REFERER},
    },
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::{
    application::{
        auth::{AuthError, AuthService},
        catalog::{CatalogError, CatalogService},
        chrome::ChromeService,
        error::{ErrorReport, HttpError},
    },
    domain::session::{Preferences, SessionCookie},
    presentation::views::{
        AlbumTemplate, AlbumView, ArtistTemplate, ArtistView, HomeTemplate, HomeView,
        IndexTemplate, IndexView, LayoutChrome, LayoutContext, LibraryTemplate, LibraryView,
        PlaylistTemplate, PlaylistView, SignInTemplate, SignInView, render_error_response,
        render_not_found_response, render_template_response,
    },
};

use super::{
    cookies::CookieCodec,
    health_response,
    middleware::{log_responses, set_request_context},
    repo_error_to_http,
    session::RequestCookies,
};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Arc<CatalogService>,
    pub auth: Arc<AuthService>,
    pub chrome: Arc<ChromeService>,
    pub cookies: CookieCodec,
}

impl FromRef<HttpState> for CookieCodec {
    fn from_ref(state: &HttpState) -> Self {
        state.cookies.clone()
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/album", get(album_index))
        .route("/album/{id}", get(album_detail))
        .route("/artist", get(artist_index))
        .route("/artist/{id}", get(artist_detail))
        .route("/playlist", get(playlist_index))
        .route("/playlist/{id}", get(playlist_detail))
        .route("/me", get(library))
        .route("/signin", get(sign_in_page))
        .route("/signout", get(sign_out))
        .route("/auth/signin", post(sign_in_action))
        .route("/preferences", post(update_preferences))
        .route("/_health", get(health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn load_chrome(
    state: &HttpState,
    cookies: &RequestCookies,
    title: &str,
) -> Result<LayoutChrome, Response> {
    state
        .chrome
        .load(cookies.visitor())
        .await
        .map(|chrome| chrome.with_title(title))
        .map_err(IntoResponse::into_response)
}

async fn home(State(state): State<HttpState>, cookies: RequestCookies) -> Response {
    let chrome = match load_chrome(&state, &cookies, "Home").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.catalog.home(cookies.cacheable()).await {
        Ok(home) => render_template_response(
            HomeTemplate {
                view: LayoutContext::new(chrome, HomeView::from(home)),
            },
            StatusCode::OK,
        ),
        Err(err) => catalog_error_to_response(err, chrome),
    }
}

async fn album_index(State(state): State<HttpState>, cookies: RequestCookies) -> Response {
    let chrome = match load_chrome(&state, &cookies, "Albums").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.catalog.albums(cookies.cacheable()).await {
        Ok(index) => render_index(chrome, IndexView::from(index)),
        Err(err) => catalog_error_to_response(err, chrome),
    }
}

async fn album_detail(
    State(state): State<HttpState>,
    cookies: RequestCookies,
    Path(id): Path<String>,
) -> Response {
    let chrome = match load_chrome(&state, &cookies, "Albums").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.catalog.album(&id, cookies.cacheable()).await {
        Ok(album) => {
            let chrome = chrome.with_title(&album.name);
            render_template_response(
                AlbumTemplate {
                    view: LayoutContext::new(chrome, AlbumView::from(album)),
                },
                StatusCode::OK,
            )
        }
        Err(err) => catalog_error_to_response(err, chrome),
    }
}

async fn artist_index(State(state): State<HttpState>, cookies: RequestCookies) -> Response {
    let chrome = match load_chrome(&state, &cookies, "Artists").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.catalog.artists(cookies.cacheable()).await {
        Ok(index) => render_index(chrome, IndexView::from(index)),
        Err(err) => catalog_error_to_response(err, chrome),
    }
}

async fn artist_detail(
    State(state): State<HttpState>,
    cookies: RequestCookies,
    Path(id): Path<String>,
) -> Response {
    let chrome = match load_chrome(&state, &cookies, "Artists").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.catalog.artist(&id, cookies.cacheable()).await {
        Ok(artist) => {
            let chrome = chrome.with_title(&artist.name);
            render_template_response(
                ArtistTemplate {
                    view: LayoutContext::new(chrome, ArtistView::from(artist)),
                },
                StatusCode::OK,
            )
        }
        Err(err) => catalog_error_to_response(err, chrome),
    }
}

async fn playlist_index(State(state): State<HttpState>, cookies: RequestCookies) -> Response {
    let chrome = match load_chrome(&state, &cookies, "Playlists").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.catalog.playlists(cookies.cacheable()).await {
        Ok(index) => render_index(chrome, IndexView::from(index)),
        Err(err) => catalog_error_to_response(err, chrome),
    }
}

async fn playlist_detail(
    State(state): State<HttpState>,
    cookies: RequestCookies,
    Path(id): Path<String>,
) -> Response {
    let chrome = match load_chrome(&state, &cookies, "Playlists").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.catalog.playlist(&id, cookies.cacheable()).await {
        Ok(playlist) => {
            let chrome = chrome.with_title(&playlist.name);
            render_template_response(
                PlaylistTemplate {
                    view: LayoutContext::new(chrome, PlaylistView::from(playlist)),
                },
                StatusCode::OK,
            )
        }
        Err(err) => catalog_error_to_response(err, chrome),
    }
}

/// The signed-in library page. Only the shared playlist sidebar is cached.
async fn library(State(state): State<HttpState>, cookies: RequestCookies) -> Response {
    let user = match state.auth.require_user(&cookies.session).await {
        Ok(user) => user,
        Err(AuthError::Unauthorized) => return redirect_to_sign_in(),
        Err(err) => return HttpError::from(err).into_response(),
    };

    let chrome = match load_chrome(&state, &cookies, "Library").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    match state.catalog.library_sidebar(cookies.cacheable()).await {
        Ok(sidebar) => render_template_response(
            LibraryTemplate {
                view: LayoutContext::new(chrome, LibraryView::new(&user, sidebar)),
            },
            StatusCode::OK,
        ),
        Err(err) => catalog_error_to_response(err, chrome),
    }
}

async fn sign_in_page(State(state): State<HttpState>, cookies: RequestCookies) -> Response {
    let chrome = match load_chrome(&state, &cookies, "Sign in").await {
        Ok(chrome) => chrome,
        Err(response) => return response,
    };

    let signed_in_as = match state.auth.current_user(&cookies.session).await {
        Ok(user) => user.map(|user| user.display_name().to_string()),
        Err(err) => {
            warn!(
                target = "spindle::http::auth",
                error = %err,
                "session lookup failed on sign-in page"
            );
            None
        }
    };

    let content = SignInView {
        provider: state.auth.oauth_provider().to_string(),
        provider_href: state.auth.sign_in_link().map(String::from),
        signed_in_as,
    };
    render_template_response(
        SignInTemplate {
            view: LayoutContext::new(chrome, content),
        },
        StatusCode::OK,
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SignInForm {
    access_token: Option<String>,
}

async fn sign_in_action(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Response {
    let token = form.access_token.unwrap_or_default();
    match state.auth.sign_in(&token).await {
        Ok(session) => (jar.add(state.cookies.encode(&session)), "ok").into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn sign_out(State(state): State<HttpState>, jar: CookieJar) -> Response {
    (
        jar.add(state.cookies.clear::<SessionCookie>()),
        Redirect::to("/"),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PreferencesForm {
    cacheable: Option<String>,
}

async fn update_preferences(
    State(state): State<HttpState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<PreferencesForm>,
) -> Response {
    let preferences = Preferences {
        cacheable: form.cacheable.as_deref().is_some_and(is_truthy),
    };
    (
        jar.add(state.cookies.encode(&preferences)),
        Redirect::to(&redirect_target(&headers)),
    )
        .into_response()
}

async fn health(State(state): State<HttpState>) -> Response {
    health_response(state.catalog.health_check().await)
}

async fn fallback(State(state): State<HttpState>, cookies: RequestCookies) -> Response {
    match state.chrome.load(cookies.visitor()).await {
        Ok(chrome) => render_not_found_response(chrome),
        Err(err) => err.into_response(),
    }
}

fn render_index(chrome: LayoutChrome, content: IndexView) -> Response {
    render_template_response(
        IndexTemplate {
            view: LayoutContext::new(chrome, content),
        },
        StatusCode::OK,
    )
}

fn catalog_error_to_response(err: CatalogError, chrome: LayoutChrome) -> Response {
    match err {
        CatalogError::Domain(err) => {
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_error(
                "infra::http::catalog_error_to_response",
                StatusCode::NOT_FOUND,
                &err,
            )
            .attach(&mut response);
            response
        }
        CatalogError::Repo(err) => render_error_response(chrome, repo_error_to_http(SOURCE, err)),
    }
}

fn redirect_to_sign_in() -> Response {
    Redirect::to("/signin").into_response()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "true" | "on" | "1")
}

/// Send the visitor back where the form was posted from, if that was this site.
fn redirect_target(headers: &HeaderMap) -> String {
    let Some(referer) = headers.get(REFERER).and_then(|v| v.to_str().ok()) else {
        return "/".to_string();
    };

    if referer.starts_with('/') && !referer.starts_with("//") {
        return referer.to_string();
    }

    let host = headers.get(HOST).and_then(|v| v.to_str().ok());
    match (Url::parse(referer), host) {
        (Ok(url), Some(host)) if authority(&url).as_deref() == Some(host) => {
            let mut target = url.path().to_string();
            if let Some(query) = url.query() {
                target.push('?');
                target.push_str(query);
            }
            target
        }
        _ => "/".to_string(),
    }
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
