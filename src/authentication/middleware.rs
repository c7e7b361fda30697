use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::error::ApiError;

use super::jwt::{verify_jwt_session, SessionData};

/// Session token from `Authorization: Token <jwt>` (or `Bearer`), falling back to the
/// `session` cookie.
pub fn extract_token(header: Option<String>, cookie: Option<String>) -> Option<String> {
    header
        .and_then(|value| {
            let token = value
                .strip_prefix("Token ")
                .or_else(|| value.strip_prefix("Bearer "))?;
            Some(token.trim().to_owned())
        })
        .or(cookie)
        .filter(|token| !token.is_empty())
}

async fn authorize(
    secret: Arc<str>,
    header: Option<String>,
    cookie: Option<String>,
) -> Result<SessionData, Rejection> {
    let token = extract_token(header, cookie).ok_or_else(|| {
        warp::reject::custom(ApiError::Unauthorized(
            "Authentication credentials were not provided",
        ))
    })?;

    verify_jwt_session(&token, secret.as_bytes())
        .map(SessionData::from)
        .map_err(|_| warp::reject::custom(ApiError::Unauthorized("Invalid or expired token")))
}

async fn authorize_optional(
    secret: Arc<str>,
    header: Option<String>,
    cookie: Option<String>,
) -> Result<Option<SessionData>, Rejection> {
    let session = extract_token(header, cookie)
        .and_then(|token| verify_jwt_session(&token, secret.as_bytes()).ok())
        .map(SessionData::from);

    Ok(session)
}

fn credentials(
    secret: Arc<str>,
) -> impl Filter<Extract = (Arc<str>, Option<String>, Option<String>), Error = Rejection> + Clone {
    warp::any()
        .map(move || secret.clone())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::cookie::optional::<String>("session"))
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    credentials(secret).and_then(authorize)
}

pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    credentials(secret).and_then(authorize_optional)
}
