use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt::Display;

pub type AppResult<T> = Result<T, AppError>;

/// Request-terminating failure carrying the HTTP status and the exact JSON
/// body the endpoint contract expects. The body key (`error`, `message`,
/// `errors`) varies per endpoint and is part of the public API, so handlers
/// pick the shape explicitly instead of going through one normalized format.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug)]
enum ErrorBody {
    Error(String),
    Message(String),
    Errors(Vec<String>),
    MessageWithDetails { message: String, details: String },
}

impl AppError {
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Error(message.into()),
        }
    }

    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Message(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(StatusCode::NOT_FOUND, message)
    }

    pub fn validation(messages: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody::Errors(messages),
        }
    }

    /// 500 with a fixed contextual message plus the underlying detail.
    pub fn internal<E: Display>(message: impl Into<String>, error: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody::MessageWithDetails {
                message: message.into(),
                details: error.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self.body {
            ErrorBody::Error(error) => json!({ "error": error }),
            ErrorBody::Message(message) => json!({ "message": message }),
            ErrorBody::Errors(errors) => json!({ "errors": errors }),
            ErrorBody::MessageWithDetails { message, details } => {
                json!({ "message": message, "details": details })
            }
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found("resource not found"),
            _ => AppError::error(StatusCode::INTERNAL_SERVER_ERROR, "Erro interno."),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal("Erro interno.", value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal("Erro interno.", value)
    }
}
