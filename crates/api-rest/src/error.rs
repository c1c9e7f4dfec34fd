//! Gateway errors and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tonic::{Code, Status};

use crate::models::ErrorResponse;

/// Detail returned for every 5xx response; the cause is only logged.
pub const INTERNAL_DETAIL: &str = "Internal server error";

/// Failure of a gateway request, rendered as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Status> for GatewayError {
    fn from(status: Status) -> Self {
        let detail = status.message().to_owned();
        match status.code() {
            Code::InvalidArgument => Self::BadRequest(detail),
            Code::NotFound => Self::NotFound(detail),
            Code::AlreadyExists => Self::Conflict(detail),
            code => Self::Internal(format!("backend returned {code:?}: {detail}")),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match self {
            Self::Internal(cause) => {
                tracing::error!("request failed: {cause}");
                INTERNAL_DETAIL.to_owned()
            }
            Self::BadRequest(detail) | Self::NotFound(detail) | Self::Conflict(detail) => detail,
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_codes_map_to_http_statuses() {
        let cases = [
            (Status::invalid_argument("bad"), StatusCode::BAD_REQUEST),
            (Status::not_found("gone"), StatusCode::NOT_FOUND),
            (Status::already_exists("dup"), StatusCode::CONFLICT),
            (Status::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
            (Status::unavailable("down"), StatusCode::INTERNAL_SERVER_ERROR),
            (Status::unknown("?"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (status, expected) in cases {
            assert_eq!(GatewayError::from(status).status_code(), expected);
        }
    }

    #[test]
    fn internal_detail_is_generic() {
        let response = GatewayError::from(Status::unavailable("tcp connect error")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
