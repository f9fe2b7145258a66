use super::error::*;
use crate::application_port::{TokenService, VerifiedSession};
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: UserId,
    pub session_id: SessionId,
}

pub async fn current_session(
    session: VerifiedSession,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = SessionResponse {
        user_id: session.user_id,
        session_id: session.session_id,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let pair = token_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from_refresh)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(pair)))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

pub async fn logout(
    session: VerifiedSession,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    token_service
        .logout(session.user_id, &session.session_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(StatusResponse {
        status: "success",
    })))
}
