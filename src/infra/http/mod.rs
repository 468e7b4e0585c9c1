pub mod cookies;
mod middleware;
mod public;
mod session;

pub use cookies::CookieCodec;
pub use middleware::RequestContext;
pub use public::{HttpState, build_router};
pub use session::RequestCookies;

use crate::application::error::ErrorReport;
use crate::application::error::HttpError;
use crate::application::repos::RepoError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

fn health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Catalog timeout",
            "Catalog timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
        RepoError::Upstream(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Catalog backend error",
            message,
        ),
        RepoError::Decode(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected catalog data",
            message,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_errors_map_to_statuses() {
        let cases = [
            (RepoError::NotFound, StatusCode::NOT_FOUND),
            (
                RepoError::InvalidInput {
                    message: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (RepoError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
            (
                RepoError::Persistence("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RepoError::Upstream("502".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RepoError::Decode("shape".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(repo_error_to_http("tests", err).status(), status);
        }
    }

    #[test]
    fn failed_health_check_is_unavailable() {
        let response = health_response(Err(RepoError::Timeout));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.extensions().get::<ErrorReport>().is_some());
        assert_eq!(health_response(Ok(())).status(), StatusCode::NO_CONTENT);
    }
}
