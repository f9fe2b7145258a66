use super::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque per-issuance identifier shared by the access and refresh token of one login.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// A fresh random identifier. Storage slots are never reused, so every
    /// issuance and every rotation must go through here.
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store key layout for one session:
///
/// - `a:<user_id>:<session_id>` lives as long as the access token
/// - `r:<user_id>:<session_id>` lives as long as the refresh token
pub struct SessionKeys;

impl SessionKeys {
    pub fn access(user_id: UserId, session_id: &SessionId) -> String {
        format!("a:{}:{}", user_id, session_id)
    }

    pub fn refresh(user_id: UserId, session_id: &SessionId) -> String {
        format!("r:{}:{}", user_id, session_id)
    }

    /// Pattern matching every refresh key of a user, used by the session limiter.
    pub fn refresh_pattern(user_id: UserId) -> String {
        format!("r:{}:*", user_id)
    }
}
