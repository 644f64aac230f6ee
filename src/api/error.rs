use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::domain::validation::ValidationError;
use crate::hierarchy::HierarchyError;
use crate::services::{AccountError, RegistrationError, TokenError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::ValidationError(err.0)
    }
}

impl From<HierarchyError> for ApiError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::DuplicateEdge { .. } => ApiError::Conflict(err.to_string()),
            HierarchyError::DanglingParent { .. } => ApiError::ValidationError(err.to_string()),
            HierarchyError::Storage(e) => ApiError::DatabaseError(e.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Internal(msg) => ApiError::InternalError(msg),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Conflict(msg) => ApiError::Conflict(msg),
            AccountError::NotFound => ApiError::NotFound("Account not found".to_string()),
            AccountError::Database(msg) => ApiError::DatabaseError(msg),
            AccountError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(msg) => ApiError::ValidationError(msg),
            RegistrationError::Conflict(msg) => ApiError::Conflict(msg),
            RegistrationError::UnknownParent(_)
            | RegistrationError::RegistrationNotFound
            | RegistrationError::RegistrationExpired
            | RegistrationError::EmailMismatch
            | RegistrationError::InvalidOtp => ApiError::ValidationError(err.to_string()),
            RegistrationError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            RegistrationError::AccountInactive | RegistrationError::EmailNotVerified => {
                ApiError::Forbidden(err.to_string())
            }
            RegistrationError::NotFound => ApiError::NotFound(err.to_string()),
            RegistrationError::Token(e) => e.into(),
            RegistrationError::Hierarchy(e) => e.into(),
            RegistrationError::Database(msg) => ApiError::DatabaseError(msg),
            RegistrationError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn hierarchy_errors_map_to_statuses() {
        let dup = HierarchyError::DuplicateEdge {
            descendant: AccountId::new(1),
        };
        assert_eq!(status_of(dup.into()), StatusCode::CONFLICT);

        let dangling = HierarchyError::DanglingParent {
            parent: AccountId::new(2),
        };
        assert_eq!(status_of(dangling.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn registration_errors_map_to_statuses() {
        assert_eq!(
            status_of(RegistrationError::InvalidOtp.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RegistrationError::UnknownParent("X".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RegistrationError::Conflict("taken".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(RegistrationError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(RegistrationError::EmailNotVerified.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(RegistrationError::Token(TokenError::Expired).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(RegistrationError::Database("locked".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
