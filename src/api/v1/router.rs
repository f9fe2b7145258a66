use super::error::*;
use super::handler;
use crate::application_port::{TokenService, VerifiedSession};
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let session = warp::get()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(with_verification(server.token_service.clone()))
        .and_then(handler::current_session);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.token_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_verification(server.token_service.clone()))
        .and(with(server.token_service.clone()))
        .and_then(handler::logout);

    session.or(refresh).or(logout)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Accepts exactly `Bearer <token>`.
fn bearer_token(header: Option<String>) -> Result<String, ApiErrorCode> {
    let header = header.ok_or(ApiErrorCode::NoAuthHeader)?;
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(ApiErrorCode::InvalidAuthHeader),
    }
}

fn with_verification(
    token_service: Arc<dyn TokenService>,
) -> impl Filter<Extract = (VerifiedSession,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let token_service = token_service.clone();
        async move {
            let token = bearer_token(header).map_err(reject::custom)?;
            let session = token_service
                .verify_access(&token)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)?;
            Ok::<_, warp::Rejection>(session)
        }
    })
}
