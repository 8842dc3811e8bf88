use config::ConfigError;
use tokio::task::JoinError;
use elasticsearch::Error as ElasticsearchError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use tantivy::TantivyError;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Elasticsearch error: {0}")]
    Elasticsearch(#[from] ElasticsearchError),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("{service} responded with status {status}")]
    Upstream { service: &'static str, status: u16 },

    #[error("Malformed response from {service}: {detail}")]
    MalformedResponse { service: &'static str, detail: String },

    #[error("Intent with name {0} not supported")]
    UnsupportedIntent(String),

    #[error("Channel send error")]
    SendError,

    #[error("Generic error: {0}")]
    Generic(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Failures worth redelivering the triggering event for.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Elasticsearch(_) | AppError::Http(_) | AppError::Io(_) => true,
            AppError::Upstream { status, .. } => *status >= 500 || *status == 409 || *status == 429,
            _ => false,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": self.to_string(),
            }))
    }

    fn status_code(&self) -> StatusCode {
        if self.is_transient() {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        match *self {
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedIntent(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } | AppError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for AppError {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        AppError::SendError
    }
}
