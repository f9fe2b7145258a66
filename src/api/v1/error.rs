use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        ApiErrorCode::BadRequest
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::NotFound
    } else {
        ApiErrorCode::internal(format!("Unhandled rejection: {:?}", err))
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("no authorization header")]
    NoAuthHeader,
    #[error("invalid authorization header")]
    InvalidAuthHeader,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("token is expired")]
    TokenExpired,
    #[error("user is unauthorized")]
    Unauthorized,
    #[error("maximum logged in users")]
    MaxLoggedIn,
    #[error("bad request")]
    BadRequest,
    #[error("not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::NoAuthHeader
            | ApiErrorCode::InvalidAuthHeader
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidRefreshToken => StatusCode::FORBIDDEN,
            ApiErrorCode::TokenExpired | ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::MaxLoggedIn => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl ApiErrorCode {
    /// The refresh endpoint answers a forged or garbled refresh token with
    /// 403; bearer-authenticated routes answer a bad access token with 400.
    pub fn from_refresh(error: AuthError) -> ApiErrorCode {
        match error {
            AuthError::BadToken => ApiErrorCode::InvalidRefreshToken,
            other => ApiErrorCode::from(other),
        }
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        if error.is_internal() {
            return ApiErrorCode::internal(error);
        }
        match error {
            AuthError::BadToken => ApiErrorCode::InvalidToken,
            AuthError::TokenExpired => ApiErrorCode::TokenExpired,
            AuthError::UserUnauthorized => ApiErrorCode::Unauthorized,
            AuthError::MaxLoggedIn => ApiErrorCode::MaxLoggedIn,
            AuthError::Store(_) | AuthError::InternalError(_) => ApiErrorCode::InternalError,
        }
    }
}
