//! Response envelope
//!
//! Every JSON body produced by the HTTP layer has the shape
//! `{"message": ..., "code": ..., "data": ...}`. `code` is omitted when unset
//! and `data` is `null` when there is nothing to return.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use repokit::responses::Envelope;
//!
//! async fn list_users(State(state): State<AppState>) -> Result<Envelope<Vec<UserDto>>, Error> {
//!     let users = state.users().find_all(&Context::background()).await?;
//!     Ok(Envelope::success(users))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// JSON envelope with an attached status code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Human-readable outcome
    pub message: String,

    /// Machine-readable outcome code
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,

    /// Payload
    pub data: Option<T>,

    #[serde(skip)]
    status: StatusCode,
}

impl<T> Envelope<T> {
    /// 200 OK carrying `data`
    pub fn success(data: T) -> Self {
        Self {
            message: "Success".to_string(),
            code: None,
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    /// Envelope without payload
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            data: None,
            status,
        }
    }

    /// Attach an outcome code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Override the status code
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Status code the envelope is sent with
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T> IntoResponse for Envelope<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
