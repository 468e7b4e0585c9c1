//! Session handling around a hosted identity provider.
//!
//! The application never issues tokens itself. A client obtains an access
//! token from the provider's OAuth flow, posts it back, and the token is kept
//! in the session cookie once the provider confirms it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::domain::session::{AuthUser, SessionCookie};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("sign in required")]
    Unauthorized,
    #[error("identity provider is not configured")]
    NotConfigured,
    #[error("identity provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to a user. Rejected tokens yield `Ok(None)`.
    async fn user_for_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError>;

    /// Where to send a browser to start an OAuth sign-in.
    fn authorize_url(&self, provider: &str, redirect_to: Option<&str>) -> Result<Url, AuthError>;
}

/// Stand-in used when no hosted backend is configured: nobody can sign in.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIdentity;

#[async_trait]
impl IdentityProvider for DisabledIdentity {
    async fn user_for_token(&self, _token: &str) -> Result<Option<AuthUser>, AuthError> {
        Ok(None)
    }

    fn authorize_url(&self, _provider: &str, _redirect_to: Option<&str>) -> Result<Url, AuthError> {
        Err(AuthError::NotConfigured)
    }
}

#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    oauth_provider: String,
    oauth_redirect: Option<String>,
}

impl AuthService {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        oauth_provider: impl Into<String>,
        oauth_redirect: Option<String>,
    ) -> Self {
        Self {
            provider,
            oauth_provider: oauth_provider.into(),
            oauth_redirect,
        }
    }

    /// Validate `token` with the provider and return the session to store.
    pub async fn sign_in(&self, token: &str) -> Result<SessionCookie, AuthError> {
        let Some(token) = bearer_token(token) else {
            warn!("sign-in token is blank or malformed");
            return Err(AuthError::Unauthorized);
        };

        match self.provider.user_for_token(token).await? {
            Some(user) => {
                info!(user_id = %user.id, "session established");
                Ok(SessionCookie::with_token(token))
            }
            None => {
                warn!("sign-in token rejected by identity provider");
                Err(AuthError::Unauthorized)
            }
        }
    }

    pub async fn current_user(
        &self,
        session: &SessionCookie,
    ) -> Result<Option<AuthUser>, AuthError> {
        match session.token().and_then(bearer_token) {
            Some(token) => self.provider.user_for_token(token).await,
            None => Ok(None),
        }
    }

    pub async fn require_user(&self, session: &SessionCookie) -> Result<AuthUser, AuthError> {
        self.current_user(session)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    /// The provider link shown on the sign-in page, if sign-in is possible at all.
    pub fn sign_in_link(&self) -> Option<Url> {
        self.provider
            .authorize_url(&self.oauth_provider, self.oauth_redirect.as_deref())
            .ok()
    }

    pub fn oauth_provider(&self) -> &str {
        &self.oauth_provider
    }
}

/// A trimmed token that can travel in an `Authorization` header.
fn bearer_token(token: &str) -> Option<&str> {
    let token = token.trim();
    let usable = !token.is_empty() && token.bytes().all(|b| b.is_ascii_graphic());
    usable.then_some(token)
}
