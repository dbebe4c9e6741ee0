use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::newsletter::{DirectoryError, NewsletterError},
    cache::CacheError,
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
    pub request_id: Option<String>,
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
            request_id: None,
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
            request_id: None,
        }
    }

    /// Tag the report with the id of the request that produced it. An id
    /// already on the report is kept.
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        if self.request_id.is_none() {
            self.request_id = request_id;
        }
        self
    }

    /// Outermost message of the chain.
    pub fn detail(&self) -> &str {
        self.messages
            .first()
            .map(String::as_str)
            .unwrap_or("no diagnostic available")
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

impl From<NewsletterError> for HttpError {
    fn from(error: NewsletterError) -> Self {
        const SOURCE: &str = "application::newsletter::subscribe";
        match &error {
            NewsletterError::InvalidEmail => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid email address",
                &error,
            ),
            NewsletterError::Directory(DirectoryError::NotConfigured) => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Newsletter signup is unavailable",
                &error,
            ),
            NewsletterError::Directory(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Newsletter signup failed",
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
    #[error(transparent)]
    Render(#[from] CacheError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(_) => StatusCode::BAD_REQUEST,
            AppError::Infra(_) | AppError::Render(_) | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(_) => "Request could not be processed",
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Infra(InfraError::Manifest { .. }) => "Asset manifest unavailable",
            AppError::Render(_) => "Page rendering failed",
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
    use std::{io, sync::Arc};

    use super::*;

    #[test]
    fn serialization_errors_are_client_errors() {
        let error = AppError::from(DomainError::serialization("not an object"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert!(report.messages[0].contains("not an object"));
    }

    #[test]
    fn request_id_is_recorded_once() {
        let report = ErrorReport::from_message("infra::assets", StatusCode::NOT_FOUND, "missing")
            .with_request_id(Some("first".into()))
            .with_request_id(Some("second".into()));
        assert_eq!(report.request_id.as_deref(), Some("first"));
        assert_eq!(report.detail(), "missing");

        let untagged = ErrorReport::from_error(
            "infra::assets",
            StatusCode::INTERNAL_SERVER_ERROR,
            &io::Error::other("disk"),
        )
        .with_request_id(None);
        assert_eq!(untagged.request_id, None);
        assert_eq!(untagged.detail(), "disk");
    }

    #[test]
    fn render_failures_are_server_errors() {
        let error = AppError::from(CacheError::Render(Arc::new(io::Error::other("boom"))));
        assert_eq!(error.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn newsletter_errors_map_to_statuses() {
        let cases = [
            (NewsletterError::InvalidEmail, StatusCode::BAD_REQUEST),
            (
                NewsletterError::Directory(DirectoryError::NotConfigured),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                NewsletterError::Directory(DirectoryError::Transport("reset".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(HttpError::from(error).status(), status);
        }
    }
}
