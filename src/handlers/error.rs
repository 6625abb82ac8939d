// src/handlers/error.rs
use std::fmt;
use warp::reject::Reject;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApiErrorKind {
    InvalidInput,
    Model,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError {
            kind: ApiErrorKind::InvalidInput,
            message: message.into(),
        }
    }

    pub fn model_error(message: impl Into<String>) -> Self {
        ApiError {
            kind: ApiErrorKind::Model,
            message: message.into(),
        }
    }

    pub fn status(&self) -> warp::http::StatusCode {
        match self.kind {
            ApiErrorKind::InvalidInput => warp::http::StatusCode::BAD_REQUEST,
            ApiErrorKind::Model => warp::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}
