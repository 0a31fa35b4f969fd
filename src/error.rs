use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::reports::ReportError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Unavailable(&'static str),

    #[error("Internal Server Error: {0}")]
    Internal(&'static str),

    #[error("Query execution error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Internal Server Error: {0}")]
    Mailbox(#[from] actix::MailboxError),

    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_)
            | ApiError::Store(_)
            | ApiError::Mailbox(_)
            | ApiError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
            // internals stay in the log
            let reason = status.canonical_reason().unwrap_or("Internal Server Error");
            return HttpResponse::build(status).body(reason);
        }
        HttpResponse::build(status).body(self.to_string())
    }
}
