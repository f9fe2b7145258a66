use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::bail;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub max_logged_in: usize,
    pub access_key: SigningKey,
    pub refresh_key: SigningKey,
}

impl TokenConfig {
    pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60); // 15 minutes
    pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60); // 7 days
    pub const DEFAULT_MAX_LOGGED_IN: usize = 6;
    /// Upper bound for either lifetime; keeps `iat + ttl` well inside the
    /// timestamp range a token can carry.
    pub const MAX_TTL: Duration = Duration::from_secs(10 * 366 * 24 * 60 * 60); // ~10 years

    pub fn try_new(
        access_ttl: Duration,
        refresh_ttl: Duration,
        max_logged_in: usize,
        access_secret: &[u8],
        refresh_secret: &[u8],
    ) -> anyhow::Result<Self> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            bail!("token signing secrets must not be empty");
        }
        if access_secret == refresh_secret {
            bail!("access and refresh tokens must be signed with different secrets");
        }
        if access_ttl.as_secs() == 0 || refresh_ttl.as_secs() == 0 {
            bail!("token lifetimes must be at least one second");
        }
        if access_ttl > Self::MAX_TTL || refresh_ttl > Self::MAX_TTL {
            bail!(
                "token lifetimes must not exceed {} seconds",
                Self::MAX_TTL.as_secs()
            );
        }
        if max_logged_in == 0 {
            bail!("max_logged_in must be at least 1");
        }

        Ok(TokenConfig {
            access_ttl,
            refresh_ttl,
            max_logged_in,
            access_key: SigningKey::from_secret(access_secret),
            refresh_key: SigningKey::from_secret(refresh_secret),
        })
    }
}

pub struct RealTokenService {
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    cfg: TokenConfig,
}

/// Everything minted for one session before it is persisted.
struct MintedPair {
    pair: TokenPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl RealTokenService {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        cfg: TokenConfig,
    ) -> Self {
        Self {
            token_codec,
            session_store,
            cfg,
        }
    }

    fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| AuthError::InternalError(format!("timestamp out of range: {}", secs)))
    }

    fn claims_for(
        user_id: UserId,
        session_id: &SessionId,
        issued_at: i64,
        ttl: Duration,
    ) -> Result<Claims, AuthError> {
        let expires_at = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| issued_at.checked_add(secs))
            .ok_or_else(|| {
                AuthError::InternalError(format!("token lifetime out of range: {}s", ttl.as_secs()))
            })?;

        Ok(Claims {
            session_id: session_id.clone(),
            user_id,
            issued_at,
            expires_at,
        })
    }

    fn mint(&self, user_id: UserId) -> Result<MintedPair, AuthError> {
        let session_id = SessionId::generate();
        let issued_at = Utc::now().timestamp();

        let access = Self::claims_for(user_id, &session_id, issued_at, self.cfg.access_ttl)?;
        let refresh = Self::claims_for(user_id, &session_id, issued_at, self.cfg.refresh_ttl)?;

        let access_token = self.token_codec.sign(&access, &self.cfg.access_key)?;
        let refresh_token = self.token_codec.sign(&refresh, &self.cfg.refresh_key)?;

        Ok(MintedPair {
            access_ttl: self.cfg.access_ttl,
            refresh_ttl: self.cfg.refresh_ttl,
            pair: TokenPair {
                access_token: AccessToken(access_token),
                access_expires_at: Self::timestamp(access.expires_at)?,
                access_issued_at: Self::timestamp(access.issued_at)?,
                refresh_token: RefreshToken(refresh_token),
                refresh_expires_at: Self::timestamp(refresh.expires_at)?,
                refresh_issued_at: Self::timestamp(refresh.issued_at)?,
                session_id,
            },
        })
    }

    /// Check-then-act: two concurrent logins may both pass before either writes.
    async fn check_session_limit(&self, user_id: UserId) -> Result<(), AuthError> {
        let pattern = SessionKeys::refresh_pattern(user_id);
        let live = self
            .session_store
            .count_by_prefix(&pattern)
            .await
            .map_err(|e| store_failure("count_by_prefix", e))?;

        if live >= self.cfg.max_logged_in {
            info!(%user_id, live, max = self.cfg.max_logged_in, "session limit reached");
            return Err(AuthError::MaxLoggedIn);
        }
        Ok(())
    }

    async fn revoke(&self, user_id: UserId, session_id: &SessionId) -> Result<(), AuthError> {
        let keys = [
            SessionKeys::access(user_id, session_id),
            SessionKeys::refresh(user_id, session_id),
        ];
        self.session_store
            .delete(&keys)
            .await
            .map_err(|e| store_failure("delete", e))
    }
}

fn store_failure(op: &'static str, err: SessionStoreError) -> AuthError {
    warn!(op, error = %err, "session store call failed");
    AuthError::from(err)
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn issue_new_pair(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        let minted = self.mint(user_id)?;

        self.check_session_limit(user_id).await?;

        let session_id = &minted.pair.session_id;
        self.session_store
            .set_pair_with_expiry(
                &SessionKeys::access(user_id, session_id),
                minted.access_ttl,
                &SessionKeys::refresh(user_id, session_id),
                minted.refresh_ttl,
            )
            .await
            .map_err(|e| store_failure("set_pair_with_expiry", e))?;

        debug!(%user_id, %session_id, "session issued");
        Ok(minted.pair)
    }

    async fn verify_access(&self, access_token: &str) -> Result<VerifiedSession, AuthError> {
        let claims = self.token_codec.parse(access_token, &self.cfg.access_key)?;

        let key = SessionKeys::access(claims.user_id, &claims.session_id);
        let live = self
            .session_store
            .exists(&key)
            .await
            .map_err(|e| store_failure("exists", e))?;
        if !live {
            debug!(user_id = %claims.user_id, session_id = %claims.session_id, "access session not found");
            return Err(AuthError::UserUnauthorized);
        }

        Ok(VerifiedSession {
            user_id: claims.user_id,
            session_id: claims.session_id,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .token_codec
            .parse(refresh_token, &self.cfg.refresh_key)?;
        let user_id = claims.user_id;

        let key = SessionKeys::refresh(user_id, &claims.session_id);
        let live = self
            .session_store
            .exists(&key)
            .await
            .map_err(|e| store_failure("exists", e))?;
        if !live {
            info!(%user_id, session_id = %claims.session_id, "refresh of a session that is no longer live");
            return Err(AuthError::UserUnauthorized);
        }

        // Revoke first: a failure past this point leaves the user logged out of
        // this session, never holding two live ones.
        self.revoke(user_id, &claims.session_id).await?;
        debug!(%user_id, session_id = %claims.session_id, "session rotated away");

        self.issue_new_pair(user_id).await
    }

    async fn logout(&self, user_id: UserId, session_id: &SessionId) -> Result<(), AuthError> {
        self.revoke(user_id, session_id).await?;
        debug!(%user_id, %session_id, "session logged out");
        Ok(())
    }
}
