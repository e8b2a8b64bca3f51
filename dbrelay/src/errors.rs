use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The endpoint only accepts uploads and pre-flight requests
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Required deployment configuration is missing
    #[error("{message}")]
    ServerMisconfigured { message: String },

    /// Invalid request data, or the source file could not be fetched
    #[error("{message}")]
    BadRequest { message: String },

    /// Request body exceeds the configured limit
    #[error("Request body is too large")]
    PayloadTooLarge,

    /// Dropbox rejected the upload
    #[error("{message}")]
    UploadFailed { message: String, details: String },

    /// Anything else, with full context chain
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::ServerMisconfigured { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UploadFailed { .. } => StatusCode::BAD_REQUEST,
            Error::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body
    pub fn user_message(&self) -> String {
        match self {
            Error::Unexpected(err) => {
                let message = err.to_string();
                if message.is_empty() {
                    "Unexpected error".to_string()
                } else {
                    message
                }
            }
            other => other.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let details = match self {
            Error::UploadFailed { details, .. } => Some(details.clone()),
            _ => None,
        };
        ErrorBody {
            error: self.user_message(),
            details,
        }
    }
}

impl From<BytesRejection> for Error {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge
        } else {
            Error::BadRequest {
                message: rejection.body_text(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Unexpected(err.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(err.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Unexpected(_) => {
                tracing::error!("Unexpected relay error: {:#}", self);
            }
            Error::ServerMisconfigured { .. } => {
                tracing::warn!("Server misconfigured: {}", self);
            }
            Error::UploadFailed { details, .. } => {
                tracing::warn!(details = %details, "Upstream rejected upload: {}", self);
            }
            Error::MethodNotAllowed | Error::BadRequest { .. } | Error::PayloadTooLarge => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Type alias for relay operation results
pub type Result<T> = std::result::Result<T, Error>;
