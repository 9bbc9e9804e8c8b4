use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use log::error;
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = DriveError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Upload exceeds the limit of {0} bytes")]
    PayloadTooLarge(usize),

    #[error("MISSKEY API configuration is missing")]
    MissingConfig,

    /// Upstream answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Internal(String),

    #[error("Failed to process directory {segment}: {source}")]
    Directory {
        segment: String,
        #[source]
        source: Box<DriveError>,
    },
}

impl DriveError {
    pub fn in_directory(segment: &str, source: Self) -> Self {
        Self::Directory {
            segment: segment.to_owned(),
            source: Box::new(source),
        }
    }
}

impl ResponseError for DriveError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MissingConfig
            | Self::Api { .. }
            | Self::Request(_)
            | Self::InvalidResponse(_)
            | Self::Internal(_)
            | Self::Directory { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Api { status, message } => error!("Upstream answered {status}: {message}"),
            Self::BadRequest(_) | Self::NotFound(_) | Self::PayloadTooLarge(_) => {}
            _ => error!("{self}"),
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
