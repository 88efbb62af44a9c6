use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

pub type Payload<T> = Result<T, Error>;

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFound {
            message: format!("Invalid path: {}", path),
        }),
    )
}

/// Every failure the service can surface. Serialized as
/// `{"error": "<Kind>", "message": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    ValidationError { message: String },
    InvalidIdentifier { message: String },
    InvalidState { message: String },
    StateAlreadyUsed { message: String },
    UpstreamAuthError { message: String },
    NotFound { message: String },
    StorageUnavailable { message: String },
    StoragePartialFailure { stage: &'static str, message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn validation<S: Into<String>>(msg: S) -> Error {
        Error::ValidationError {
            message: msg.into(),
        }
    }

    pub fn upstream<S: Into<String>>(msg: S) -> Error {
        Error::UpstreamAuthError {
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::ValidationError { .. }
            | Error::InvalidIdentifier { .. }
            | Error::InvalidState { .. }
            | Error::StateAlreadyUsed { .. }
            | Error::UpstreamAuthError { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::StoragePartialFailure { .. } | Error::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            log::error!("request failed: {:?}", self);
        }
        (self.status(), Json(self)).into_response()
    }
}

impl From<uuid::Error> for Error {
    fn from(id: uuid::Error) -> Self {
        Self::InvalidIdentifier {
            message: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError {
            kind: "SerializationError",
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamAuthError {
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError {
            kind: "Unknown",
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(Error::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::upstream("x").status(), StatusCode::BAD_REQUEST);
        let id: Error = uuid::Uuid::parse_str("nope").unwrap_err().into();
        assert!(matches!(id, Error::InvalidIdentifier { .. }));
        assert_eq!(id.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn body_is_tagged_by_kind() {
        let body = serde_json::to_value(Error::StateAlreadyUsed {
            message: "State token has already been used".into(),
        })
        .unwrap();
        assert_eq!(body["error"], "StateAlreadyUsed");
        assert_eq!(body["message"], "State token has already been used");
    }

    #[test]
    fn storage_errors_are_server_side() {
        let err = Error::StoragePartialFailure {
            stage: "students",
            message: "down".into(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = Error::StorageUnavailable {
            message: "down".into(),
        };
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
