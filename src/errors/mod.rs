/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Source could not be opened or resolved
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Bound exceeded before a usable payload arrived
    #[error("Timed out after {0:?}")]
    AcquisitionTimeout(Duration),

    /// Payload retrieved but not a valid image
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// Inference service answered with a non-success status
    #[error("Upstream rejected request ({status}): {message}")]
    UpstreamRejected { status: u16, message: String },

    /// Inference answered but carried no usable structured object
    #[error("Malformed result: {0}")]
    MalformedResult(String),

    /// Required secret absent
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("External API error: {0}")]
    ExternalApi(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            ApiError::AcquisitionTimeout(_) => "ACQUISITION_TIMEOUT",
            ApiError::DecodeFailure(_) => "DECODE_FAILURE",
            ApiError::UpstreamRejected { status, .. } => match status {
                401 | 403 => "UPSTREAM_AUTH",
                429 => "UPSTREAM_429",
                500..=599 => "UPSTREAM_5XX",
                _ => "UPSTREAM_REJECTED",
            },
            ApiError::MalformedResult(_) => "MALFORMED_RESULT",
            ApiError::MissingCredential(_) => "MISSING_CREDENTIAL",
            ApiError::ExternalApi(_) => "UPSTREAM_ERROR",
            ApiError::Io(_) => "IO_ERROR",
            ApiError::Image(_) => "IMAGE_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::AcquisitionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::SourceUnavailable(_)
            | ApiError::DecodeFailure(_)
            | ApiError::UpstreamRejected { .. }
            | ApiError::MalformedResult(_)
            | ApiError::ExternalApi(_) => StatusCode::BAD_GATEWAY,
            ApiError::MissingCredential(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Io(_) | ApiError::Image(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background job failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        tracing::warn!(status = %status, code = self.code(), message = %self, "Request error");

        (status, Json(error_response)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_codes_follow_status() {
        let err = ApiError::UpstreamRejected {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.code(), "UPSTREAM_5XX");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = ApiError::UpstreamRejected {
            status: 401,
            message: "bad key".to_string(),
        };
        assert_eq!(err.code(), "UPSTREAM_AUTH");
    }

    #[test]
    fn test_missing_credential_message_names_variable() {
        let err = ApiError::MissingCredential("ANTHROPIC_API_KEY");
        assert_eq!(
            err.to_string(),
            "Missing credential: ANTHROPIC_API_KEY is not set"
        );
    }

    #[test]
    fn test_timeout_message_carries_bound() {
        let err = ApiError::AcquisitionTimeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Timed out after 5s");
    }
}
