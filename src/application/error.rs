use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{application::auth::AuthError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn public_message(&self) -> &'static str {
        self.public_message
    }

    pub fn into_report(self) -> ErrorReport {
        self.report
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<AuthError> for HttpError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthorized => HttpError::new(
                "application::error::auth",
                StatusCode::UNAUTHORIZED,
                "Sign in required",
                "access token missing or rejected",
            ),
            AuthError::NotConfigured => HttpError::new(
                "application::error::auth",
                StatusCode::SERVICE_UNAVAILABLE,
                "Sign-in is not available",
                "no identity provider configured",
            ),
            AuthError::Provider(_) => HttpError::from_error(
                "application::error::auth",
                StatusCode::SERVICE_UNAVAILABLE,
                "Sign-in is temporarily unavailable",
                &error,
            ),
        }
    }
}

/// A failure that stops the process before or while serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_source_chain() {
        let inner = std::io::Error::other("socket closed");
        let outer = InfraError::from(inner);
        let report = ErrorReport::from_error("test", StatusCode::BAD_GATEWAY, &outer);

        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[0], "io error: socket closed");
        assert_eq!(report.messages[1], "socket closed");
    }

    #[test]
    fn http_error_attaches_report_to_response() {
        let response = HttpError::new(
            "test::source",
            StatusCode::NOT_FOUND,
            "Resource not found",
            "album `A9` not found",
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "test::source");
        assert_eq!(report.messages, vec!["album `A9` not found".to_string()]);
    }

    #[test]
    fn app_error_displays_infra_cause_verbatim() {
        let cause = InfraError::configuration("database url is not configured");
        let expected = cause.to_string();
        let err = AppError::from(cause);
        assert_eq!(err.to_string(), expected);
        assert!(matches!(err, AppError::Infra(InfraError::Configuration { .. })));

        let err = AppError::unexpected("server error: bind failed");
        assert_eq!(err.to_string(), "unexpected error: server error: bind failed");
    }

    #[test]
    fn auth_errors_keep_provider_detail_out_of_public_message() {
        let err = HttpError::from(AuthError::Provider("upstream 502".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.public_message(), "Sign-in is temporarily unavailable");
        let report = err.into_report();
        assert!(report.messages[0].contains("upstream 502"));

        let rejected = HttpError::from(AuthError::Unauthorized);
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    }
}
