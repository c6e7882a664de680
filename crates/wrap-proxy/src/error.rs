//! Gateway error type and its HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::id::IdError;
use crate::proxy::FetchError;
use crate::resource::{ResourceName, UnknownResource};
use crate::userdata::UserDataError;

#[derive(Debug, thiserror::Error)]
pub enum WrapError {
    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    UserData(#[from] UserDataError),

    #[error(transparent)]
    UnknownResource(#[from] UnknownResource),

    #[error("{resource} does not accept extra arguments")]
    UnexpectedExtra { resource: ResourceName },

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl WrapError {
    pub fn status(&self) -> StatusCode {
        match self {
            WrapError::Id(_) | WrapError::UserData(_) => StatusCode::BAD_REQUEST,
            WrapError::UnknownResource(_)
            | WrapError::UnexpectedExtra { .. }
            | WrapError::NotFound => StatusCode::NOT_FOUND,
            WrapError::Fetch(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            WrapError::Fetch(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message shown to the client. Fetch failures stay generic so the
    /// response does not reveal which upstream failed or where it lives.
    fn public_message(&self) -> String {
        match self {
            WrapError::Fetch(e) if e.is_timeout() => "upstream timeout".to_string(),
            WrapError::Fetch(_) => "upstream request failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for WrapError {
    fn into_response(self) -> Response {
        (
            self.status(),
            axum::Json(serde_json::json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}
