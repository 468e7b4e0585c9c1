use std::sync::Arc;

use axum::http::StatusCode;

use crate::application::catalog::{CatalogError, CatalogService};
use crate::application::error::HttpError;
use crate::domain::entities::LibraryOwner;
use crate::presentation::views::{
    BrandView, LayoutChrome, NavigationLinkView, NavigationView, PageMetaView, SessionView,
    SidebarView,
};

const SOURCE: &str = "application::chrome::ChromeService";
const BRAND_TITLE: &str = "Spindle";

/// What the layout needs to know about the visitor, taken from cookies only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Visitor {
    pub signed_in: bool,
    pub cacheable: bool,
}

#[derive(Clone)]
pub struct ChromeService {
    catalog: Arc<CatalogService>,
}

impl ChromeService {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }

    pub async fn load(&self, visitor: Visitor) -> Result<LayoutChrome, HttpError> {
        let owner = self
            .catalog
            .layout(visitor.cacheable)
            .await
            .map_err(layout_failure)?;

        Ok(LayoutChrome {
            brand: BrandView {
                title: BRAND_TITLE.to_string(),
                href: "/".to_string(),
            },
            navigation: navigation(visitor.signed_in),
            sidebar: owner.map(sidebar),
            session: SessionView {
                signed_in: visitor.signed_in,
                cacheable: visitor.cacheable,
            },
            meta: PageMetaView {
                title: BRAND_TITLE.to_string(),
                description: "Browse artists, albums and playlists.".to_string(),
            },
        })
    }
}

fn navigation(signed_in: bool) -> NavigationView {
    let mut entries = vec![
        link("Home", "/"),
        link("Albums", "/album"),
        link("Artists", "/artist"),
        link("Playlists", "/playlist"),
    ];
    if signed_in {
        entries.push(link("Library", "/me"));
        entries.push(link("Sign out", "/signout"));
    } else {
        entries.push(link("Sign in", "/signin"));
    }
    NavigationView { entries }
}

fn link(label: &str, href: &str) -> NavigationLinkView {
    NavigationLinkView {
        label: label.to_string(),
        href: href.to_string(),
    }
}

fn sidebar(owner: LibraryOwner) -> SidebarView {
    SidebarView {
        owner: owner.name,
        playlists: owner
            .playlists
            .into_iter()
            .map(|playlist| NavigationLinkView {
                href: format!("/playlist/{}", playlist.id),
                label: playlist.name,
            })
            .collect(),
    }
}

fn layout_failure(err: CatalogError) -> HttpError {
    HttpError::from_error(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load page layout",
        &err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PlaylistLink;

    #[test]
    fn navigation_depends_on_session() {
        let anonymous: Vec<_> = navigation(false)
            .entries
            .into_iter()
            .map(|entry| entry.href)
            .collect();
        assert_eq!(anonymous.last().map(String::as_str), Some("/signin"));
        assert!(!anonymous.iter().any(|href| href == "/me"));

        let signed_in: Vec<_> = navigation(true)
            .entries
            .into_iter()
            .map(|entry| entry.href)
            .collect();
        assert!(signed_in.iter().any(|href| href == "/me"));
        assert!(signed_in.iter().any(|href| href == "/signout"));
    }

    #[test]
    fn sidebar_links_point_at_playlists() {
        let view = sidebar(LibraryOwner {
            name: "Ana".into(),
            playlists: vec![PlaylistLink {
                id: "P1".into(),
                name: "Morning".into(),
            }],
        });
        assert_eq!(view.owner, "Ana");
        assert_eq!(view.playlists[0].href, "/playlist/P1");
        assert_eq!(view.playlists[0].label, "Morning");
    }
}
