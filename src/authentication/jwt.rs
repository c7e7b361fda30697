use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::error::ApiError;
use crate::database::schema::User;
use crate::schema::{UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, role: UserRole, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            username,
            user_role: role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(self) {
            return Err(
                HtmlError::Unauthorized.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            is_admin: value.user_role == UserRole::Admin,
            user_role: value.user_role,
        }
    }
}

fn signing_key(secret: &[u8]) -> Option<Hmac<Sha256>> {
    Hmac::new_from_slice(secret).ok()
}

pub fn generate_jwt_session(
    user: &User,
    secret: &[u8],
    lifetime_hours: i64,
) -> Result<String, ApiError> {
    let key = signing_key(secret).ok_or(ApiError::Internal("Invalid session key"))?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role.to_owned(),
        lifetime_hours,
    );

    claims.sign_with_key(&key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        ApiError::Internal("Could not create a session")
    })
}

pub fn verify_jwt_session(token: &str, secret: &[u8]) -> Result<JwtSessionData, potion::Error> {
    let key = signing_key(secret)
        .ok_or_else(|| HtmlError::InternalServerError.new("Invalid session key"))?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))?;

    if session.is_expired() {
        return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
    }

    Ok(session)
}
