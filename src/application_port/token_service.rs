use crate::domain_model::*;
use crate::domain_port::SessionStoreError;
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token")]
    BadToken,
    #[error("token is expired")]
    TokenExpired,
    #[error("user is unauthorized")]
    UserUnauthorized,
    #[error("maximum logged in users")]
    MaxLoggedIn,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Failures the caller cannot act on, reported upward as a server fault.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Store(_) | AuthError::InternalError(_))
    }
}

impl From<SessionStoreError> for AuthError {
    fn from(err: SessionStoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

/// Both halves of one HMAC secret.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn from_secret(secret: &[u8]) -> Self {
        SigningKey {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// Signs and parses the compact token encoding of [`Claims`].
pub trait TokenCodec: Send + Sync {
    fn sign(&self, claims: &Claims, key: &SigningKey) -> Result<String, AuthError>;

    /// Fails with `TokenExpired` once `exp` has passed on this process's clock,
    /// and with `BadToken` for anything else that does not verify.
    fn parse(&self, token: &str, key: &SigningKey) -> Result<Claims, AuthError>;
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VerifiedSession {
    pub user_id: UserId,
    pub session_id: SessionId,
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    /// Start a new session for a user who already passed the credential check.
    async fn issue_new_pair(&self, user_id: UserId) -> Result<TokenPair, AuthError>;

    async fn verify_access(&self, access_token: &str) -> Result<VerifiedSession, AuthError>;

    /// Rotate: revoke the session behind `refresh_token` and mint a new one.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    async fn logout(&self, user_id: UserId, session_id: &SessionId) -> Result<(), AuthError>;
}
