use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tbaproto::hub::ErrorResp;

/// Everything a hub operation can refuse with.
///
/// The message is shown to the caller as-is (as `{"error": ..}` on the JSON
/// endpoints, as plain text on `/command`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Ambiguous(String),
    Conflict(String),
    Upstream(String),
}

impl HubError {
    pub fn status(&self) -> StatusCode {
        match self {
            HubError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // Secret mismatches have always been answered with 403.
            HubError::Unauthorized(_) | HubError::Forbidden(_) => StatusCode::FORBIDDEN,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::Ambiguous(_) => StatusCode::MULTIPLE_CHOICES,
            HubError::Conflict(_) => StatusCode::CONFLICT,
            HubError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HubError::BadRequest(m)
            | HubError::Unauthorized(m)
            | HubError::Forbidden(m)
            | HubError::NotFound(m)
            | HubError::Ambiguous(m)
            | HubError::Conflict(m)
            | HubError::Upstream(m) => m,
        }
    }

    pub fn into_text_response(self) -> Response {
        (self.status(), self.message().to_string()).into_response()
    }
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            HubError::BadRequest(_) => "bad request",
            HubError::Unauthorized(_) => "unauthorized",
            HubError::Forbidden(_) => "forbidden",
            HubError::NotFound(_) => "not found",
            HubError::Ambiguous(_) => "ambiguous",
            HubError::Conflict(_) => "conflict",
            HubError::Upstream(_) => "upstream",
        };
        write!(f, "{kind}: {}", self.message())
    }
}

impl std::error::Error for HubError {}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResp {
            error: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn bad_request(msg: impl Into<String>) -> HubError {
    HubError::BadRequest(msg.into())
}

pub fn conflict(msg: impl Into<String>) -> HubError {
    HubError::Conflict(msg.into())
}

pub fn forbidden(msg: impl Into<String>) -> HubError {
    HubError::Forbidden(msg.into())
}
