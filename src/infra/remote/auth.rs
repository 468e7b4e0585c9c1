use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::application::auth::{AuthError, IdentityProvider};
use crate::application::repos::RepoError;
use crate::domain::session::AuthUser;

use super::client::BackendClient;

const USER_PATH: &str = "auth/v1/user";
const AUTHORIZE_PATH: &str = "auth/v1/authorize";

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
}

/// Identity lookups against the hosted backend's auth endpoints.
#[derive(Clone)]
pub struct HostedIdentity {
    client: BackendClient,
}

impl HostedIdentity {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentity {
    async fn user_for_token(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let url = self
            .client
            .url(USER_PATH)
            .map_err(|err| AuthError::Provider(err.to_string()))?;
        let request = match self
            .client
            .authorize(self.client.client().get(url), Some(token))
        {
            Ok(request) => request,
            // A token that cannot form a header is one the provider would reject.
            Err(RepoError::InvalidInput { .. }) => return Ok(None),
            Err(err) => return Err(AuthError::Provider(err.to_string())),
        };
        let response = request
            .send()
            .await
            .map_err(|err| AuthError::Provider(err.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            status if !status.is_success() => {
                return Err(AuthError::Provider(format!("user lookup returned {status}")));
            }
            _ => {}
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|err| AuthError::Provider(err.to_string()))?;
        Ok(Some(AuthUser {
            id: user.id,
            email: user.email,
        }))
    }

    fn authorize_url(&self, provider: &str, redirect_to: Option<&str>) -> Result<Url, AuthError> {
        let mut url = self
            .client
            .url(AUTHORIZE_PATH)
            .map_err(|err| AuthError::Provider(err.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("provider", provider);
            if let Some(redirect) = redirect_to {
                query.append_pair("redirect_to", redirect);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn authorize_url_targets_backend_auth_endpoint() {
        let base = Url::parse("https://project.example.co").expect("url");
        let client = BackendClient::new(&base, None, Duration::from_secs(5)).expect("client");
        let identity = HostedIdentity::new(client);

        let url = identity
            .authorize_url("google", Some("https://music.example/signin"))
            .expect("authorize url");

        assert_eq!(url.path(), "/auth/v1/authorize");
        assert_eq!(
            url.query(),
            Some("provider=google&redirect_to=https%3A%2F%2Fmusic.example%2Fsignin")
        );
    }

    #[tokio::test]
    async fn unencodable_token_is_rejected_without_a_request() {
        // Nothing listens on the discard port; the lookup must not get that far.
        let base = Url::parse("http://127.0.0.1:9").expect("url");
        let client = BackendClient::new(&base, None, Duration::from_secs(1)).expect("client");
        let identity = HostedIdentity::new(client);

        let user = identity
            .user_for_token("abc\u{1}def")
            .await
            .expect("malformed token is a rejection, not a provider error");
        assert_eq!(user, None);
    }
}
