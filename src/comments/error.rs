use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use super::model::{MAX_CONTENT_CHARS, MAX_NICKNAME_CHARS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Policy,
    NotFound,
    Authorization,
    Storage,
}

/// Everything the comment operations can refuse with. Returned, never panicked.
#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Nicknames can be at most {} characters", MAX_NICKNAME_CHARS)]
    NicknameTooLong,

    #[error("Comments can be at most {} characters", MAX_CONTENT_CHARS)]
    ContentTooLong,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid parent comment")]
    InvalidParent,

    #[error("This nickname cannot be used")]
    Blacklisted,

    #[error("This nickname is already in use")]
    DuplicateNickname,

    #[error("Too many comments, please try again in a moment")]
    FloodControl,

    #[error("Comment not found")]
    NotFound,

    #[error("Password does not match")]
    PasswordMismatch,

    #[error("Administrator access required")]
    AdminOnly,

    #[error("Storage failure: {message} ({code})")]
    Storage { code: String, message: String },
}

impl CommentError {
    pub fn kind(&self) -> ErrorKind {
        use CommentError::*;
        match self {
            NicknameTooLong | ContentTooLong | MissingFields | InvalidParent => ErrorKind::Validation,
            Blacklisted | DuplicateNickname | FloodControl => ErrorKind::Policy,
            NotFound => ErrorKind::NotFound,
            PasswordMismatch | AdminOnly => ErrorKind::Authorization,
            Storage { .. } => ErrorKind::Storage,
        }
    }

    fn status(&self) -> StatusCode {
        use CommentError::*;
        match self {
            NicknameTooLong | ContentTooLong | MissingFields | InvalidParent => StatusCode::BAD_REQUEST,
            Blacklisted => StatusCode::FORBIDDEN,
            DuplicateNickname => StatusCode::CONFLICT,
            FloodControl => StatusCode::TOO_MANY_REQUESTS,
            NotFound => StatusCode::NOT_FOUND,
            PasswordMismatch | AdminOnly => StatusCode::FORBIDDEN,
            Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CommentError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => CommentError::Storage {
                code: db_err.code().map(|code| code.into_owned()).unwrap_or_else(|| "unknown".to_owned()),
                message: db_err.message().to_owned(),
            },
            _ => CommentError::Storage {
                code: "internal".to_owned(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for CommentError {
    fn into_response(self) -> Response {
        if self.kind() == ErrorKind::Storage {
            tracing::error!(error = %self, "comment storage failure");
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(CommentError::NicknameTooLong.kind(), ErrorKind::Validation);
        assert_eq!(CommentError::FloodControl.kind(), ErrorKind::Policy);
        assert_eq!(CommentError::PasswordMismatch.kind(), ErrorKind::Authorization);
        assert_eq!(CommentError::NotFound.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_storage_message_carries_code() {
        let err = CommentError::Storage { code: "2067".to_owned(), message: "UNIQUE constraint failed".to_owned() };
        assert_eq!(err.to_string(), "Storage failure: UNIQUE constraint failed (2067)");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_flood_control_is_too_many_requests() {
        assert_eq!(CommentError::FloodControl.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
