use std::time::Duration;

use reqwest::{
    Client, RequestBuilder, Response, StatusCode, Url,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::de::DeserializeOwned;

use crate::application::repos::RepoError;
use crate::infra::error::InfraError;

const API_KEY_HEADER: &str = "apikey";
const REST_PREFIX: &str = "rest/v1/";

/// A column filter in the backend's `column=op.value` query syntax.
#[derive(Debug, Clone)]
pub struct Filter {
    column: &'static str,
    expression: String,
}

impl Filter {
    pub fn eq(column: &'static str, value: &str) -> Self {
        Self {
            column,
            expression: format!("eq.{value}"),
        }
    }
}

/// Thin HTTP client for the hosted backend's REST and auth endpoints.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl BackendClient {
    pub fn new(
        base: &Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let base = base
            .join("/")
            .map_err(|err| InfraError::configuration(format!("backend url: {err}")))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::backend(err.to_string()))?;
        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("spindle/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }

    pub fn select_url(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        limit: Option<u32>,
    ) -> Result<Url, RepoError> {
        let mut url = self
            .url(&format!("{REST_PREFIX}{table}"))
            .map_err(|err| RepoError::InvalidInput {
                message: err.to_string(),
            })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", columns);
            for filter in filters {
                query.append_pair(filter.column, &filter.expression);
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    /// Run a select against `table`, embedding related tables through `columns`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        limit: Option<u32>,
    ) -> Result<Vec<T>, RepoError> {
        let url = self.select_url(table, columns, filters, limit)?;
        let request = self.authorize(self.client.get(url), self.api_key.as_deref())?;
        let response = request.send().await.map_err(map_transport_error)?;
        decode_rows(response).await
    }

    /// Attach the project key and a bearer token. The bearer defaults to the project key.
    pub fn authorize(
        &self,
        request: RequestBuilder,
        bearer: Option<&str>,
    ) -> Result<RequestBuilder, RepoError> {
        let mut request = request;
        if let Some(key) = self.api_key.as_deref() {
            request = request.header(API_KEY_HEADER, header_value(key)?);
        }
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }
        Ok(request)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn header_value(value: &str) -> Result<HeaderValue, RepoError> {
    HeaderValue::from_str(value).map_err(|err| RepoError::InvalidInput {
        message: err.to_string(),
    })
}

pub(crate) fn map_transport_error(err: reqwest::Error) -> RepoError {
    if err.is_timeout() {
        RepoError::Timeout
    } else if err.is_decode() {
        RepoError::Decode(err.to_string())
    } else {
        RepoError::Upstream(err.to_string())
    }
}

async fn decode_rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, RepoError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        let body = String::from_utf8_lossy(&bytes);
        return Err(match status {
            StatusCode::BAD_REQUEST => RepoError::InvalidInput {
                message: format!("status {status} body {body}"),
            },
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => RepoError::Timeout,
            _ => RepoError::Upstream(format!("status {status} body {body}")),
        });
    }
    serde_json::from_slice(&bytes).map_err(|err| RepoError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BackendClient {
        let base = Url::parse("https://project.example.co/some/path").expect("url");
        BackendClient::new(&base, Some("anon-key".into()), Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn select_url_encodes_embedding_and_filters() {
        let url = client()
            .select_url(
                "Playlist",
                "name, cover, User (name)",
                &[Filter::eq("id", "P1")],
                Some(1),
            )
            .expect("url");

        assert_eq!(url.path(), "/rest/v1/Playlist");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "name, cover, User (name)".to_string()),
                ("id".to_string(), "eq.P1".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn select_url_without_limit_has_no_limit_param() {
        let url = client()
            .select_url("Artist", "id, name, picture", &[], None)
            .expect("url");
        assert!(!url.query().unwrap_or_default().contains("limit="));
    }

    #[test]
    fn user_agent_names_the_crate() {
        assert!(BackendClient::user_agent().starts_with("spindle/"));
    }
}
