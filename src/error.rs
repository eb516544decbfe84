use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::gate::Route;

/// PortalError
///
/// The portal's failure taxonomy. None of these is fatal: every variant maps to a
/// response that hands control back to an interactive screen.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortalError {
    /// Malformed input rejected at the boundary. No state mutation was attempted.
    #[error("{0}")]
    Validation(String),
    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// The caller is authenticated but not allowed. `redirect` is where the screen goes next.
    #[error("{message}")]
    Forbidden {
        message: String,
        redirect: Option<Route>,
    },
    #[error("{0}")]
    NotFound(String),
    /// The managed backend (identity, rows or storage) rejected or failed the request.
    #[error("{0}")]
    Backend(String),
}

pub type PortalResult<T> = Result<T, PortalError>;

const GENERIC_BACKEND_MESSAGE: &str = "Something went wrong. Please try again.";
const GENERIC_VALIDATION_MESSAGE: &str = "Please check the form and try again.";
const GENERIC_UNAUTHORIZED_MESSAGE: &str = "Please sign in to continue.";
const GENERIC_FORBIDDEN_MESSAGE: &str = "You don't have permission to do that.";
const GENERIC_NOT_FOUND_MESSAGE: &str = "Not found.";

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        PortalError::Forbidden {
            message: message.into(),
            redirect: None,
        }
    }

    /// Non-admin reaching an admin-only surface: reported, then sent home.
    pub fn admin_required() -> Self {
        PortalError::Forbidden {
            message: "Access denied. Admin privileges required.".to_string(),
            redirect: Some(Route::Welcome),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        PortalError::Backend(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::Forbidden { .. } => StatusCode::FORBIDDEN,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PortalError::Validation(_) => "validation",
            PortalError::Unauthorized(_) => "unauthorized",
            PortalError::Forbidden { .. } => "forbidden",
            PortalError::NotFound(_) => "not_found",
            PortalError::Backend(_) => "backend",
        }
    }

    /// The text shown to the user. A blank message never reaches the toast: it falls
    /// back to a generic one for its kind.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if !message.trim().is_empty() {
            return message;
        }
        match self {
            PortalError::Validation(_) => GENERIC_VALIDATION_MESSAGE,
            PortalError::Unauthorized(_) => GENERIC_UNAUTHORIZED_MESSAGE,
            PortalError::Forbidden { .. } => GENERIC_FORBIDDEN_MESSAGE,
            PortalError::NotFound(_) => GENERIC_NOT_FOUND_MESSAGE,
            PortalError::Backend(_) => GENERIC_BACKEND_MESSAGE,
        }
        .to_string()
    }
}

impl From<sqlx::Error> for PortalError {
    fn from(err: sqlx::Error) -> Self {
        PortalError::Backend(err.to_string())
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        PortalError::Backend(err.to_string())
    }
}

/// ErrorBody
///
/// JSON shape of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// Screen the client should navigate to after surfacing the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let redirect = match &self {
            PortalError::Forbidden { redirect, .. } => redirect.map(|route| route.path().to_string()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.user_message(),
            redirect,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_backend_message_uses_fallback() {
        let err = PortalError::backend("  ");
        assert_eq!(err.user_message(), GENERIC_BACKEND_MESSAGE);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn blank_messages_never_reach_the_user() {
        let blank = [
            PortalError::Validation(String::new()),
            PortalError::Unauthorized(String::new()),
            PortalError::forbidden(" "),
            PortalError::NotFound(String::new()),
        ];
        for err in blank {
            assert!(!err.user_message().trim().is_empty(), "{err:?}");
        }
        assert_eq!(
            PortalError::Unauthorized(String::new()).user_message(),
            GENERIC_UNAUTHORIZED_MESSAGE
        );
        assert_eq!(PortalError::validation("Passwords do not match").user_message(), "Passwords do not match");
    }

    #[test]
    fn admin_required_redirects_home() {
        match PortalError::admin_required() {
            PortalError::Forbidden { redirect, .. } => assert_eq!(redirect, Some(Route::Welcome)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
