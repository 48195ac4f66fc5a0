//! Request-level authentication errors.

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Why the gate refused a request.
///
/// Missing and invalid credentials are terminal: the caller gets a 401 and
/// no handler runs. Tokens are not refreshable in-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Protected route, no bearer credential
    MissingCredential,
    /// Bearer credential present but not valid (bad token or bad subject)
    InvalidCredential,
    /// A handler asked for the identity but the gate never ran
    IdentityUnavailable,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::IdentityUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "Authentication required"),
            Self::InvalidCredential => write!(f, "Invalid token"),
            Self::IdentityUnavailable => write!(f, "Server error"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}
