use super::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload carried by both access and refresh tokens.
///
/// Field names on the wire are kept stable (`uuid`, `user_id`, `iat`, `exp`)
/// so tokens minted by earlier deployments still decode.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "uuid")]
    pub session_id: SessionId,
    pub user_id: UserId,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub access_expires_at: DateTime<Utc>,
    pub access_issued_at: DateTime<Utc>,
    pub refresh_token: RefreshToken,
    pub refresh_expires_at: DateTime<Utc>,
    pub refresh_issued_at: DateTime<Utc>,
    pub session_id: SessionId,
}
