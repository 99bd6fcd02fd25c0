use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::repos::RepoError, domain::error::DomainError, infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
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
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Failures of the cached read path. Cache trouble never shows up here; it
/// degrades to a store read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{entity} `{slug}` not found")]
    NotFound { entity: &'static str, slug: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ReadError {
    pub fn not_found(entity: &'static str, slug: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            slug: slug.into(),
        }
    }
}

impl From<ReadError> for HttpError {
    fn from(error: ReadError) -> Self {
        const SOURCE: &str = "application::error::read_error_to_http_error";
        match &error {
            ReadError::NotFound { .. } | ReadError::Repo(RepoError::NotFound) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Resource not found", &error)
            }
            ReadError::Repo(_) => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
                &error,
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Domain(DomainError::Validation { .. } | DomainError::Slug(_))
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Infra(InfraError::Database { .. } | InfraError::Cache(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Infra(
                InfraError::Configuration { .. } | InfraError::Telemetry(_) | InfraError::Io(_),
            )
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                "Resource not found"
            }
            AppError::Domain(DomainError::Validation { .. } | DomainError::Slug(_))
            | AppError::Validation(_) => "Request could not be processed",
            AppError::Infra(InfraError::Database { .. } | InfraError::Cache(_)) => {
                "Service temporarily unavailable"
            }
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_errors_map_to_not_found_and_unavailable() {
        let not_found: HttpError = ReadError::not_found("post", "missing").into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let timeout: HttpError = ReadError::Repo(RepoError::Timeout).into();
        assert_eq!(timeout.status(), StatusCode::SERVICE_UNAVAILABLE);

        let broken: HttpError = ReadError::Repo(RepoError::from_persistence("closed")).into();
        assert_eq!(broken.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_report_collects_source_chain() {
        let error = AppError::from(DomainError::validation("title must not be empty"));
        let report = ErrorReport::from_error("test", StatusCode::BAD_REQUEST, &error);
        assert_eq!(report.messages[0], "domain validation failed: title must not be empty");
    }

    #[test]
    fn app_error_response_carries_report() {
        let response = AppError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
