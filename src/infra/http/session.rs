use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::application::chrome::Visitor;
use crate::domain::session::{Preferences, SessionCookie};

use super::cookies::CookieCodec;

/// The decoded `user-prefs` and `supabase-user` cookies of a request.
///
/// Extraction never rejects: missing or tampered cookies fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies {
    pub preferences: Preferences,
    pub session: SessionCookie,
}

impl RequestCookies {
    pub fn cacheable(&self) -> bool {
        self.preferences.cacheable
    }

    pub fn visitor(&self) -> Visitor {
        Visitor {
            signed_in: self.session.token().is_some(),
            cacheable: self.preferences.cacheable,
        }
    }
}

impl<S> FromRequestParts<S> for RequestCookies
where
    S: Send + Sync,
    CookieCodec: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = CookieCodec::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Self {
            preferences: codec.decode(&jar),
            session: codec.decode(&jar),
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, header::COOKIE};

    use super::*;
    use crate::config::CookieSettings;

    #[tokio::test]
    async fn decodes_both_cookies_from_one_header() {
        let codec = CookieCodec::new(CookieSettings::default());
        let prefs = codec.encode_value(&Preferences { cacheable: true });
        let session = codec.encode_value(&SessionCookie::with_token("tok"));

        let request = Request::builder()
            .header(COOKIE, format!("user-prefs={prefs}; supabase-user={session}"))
            .body(())
            .expect("request");
        let (mut parts, ()) = request.into_parts();

        let cookies = RequestCookies::from_request_parts(&mut parts, &codec)
            .await
            .expect("infallible");
        assert!(cookies.cacheable());
        assert_eq!(cookies.session.token(), Some("tok"));
        let visitor = cookies.visitor();
        assert!(visitor.signed_in && visitor.cacheable);
    }

    #[tokio::test]
    async fn missing_cookies_are_defaults() {
        let codec = CookieCodec::new(CookieSettings::default());
        let (mut parts, ()) = Request::builder()
            .body(())
            .expect("request")
            .into_parts();

        let cookies = RequestCookies::from_request_parts(&mut parts, &codec)
            .await
            .expect("infallible");
        assert!(!cookies.cacheable());
        assert_eq!(cookies.session.token(), None);
    }
}
