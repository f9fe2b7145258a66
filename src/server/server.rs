use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub token_service: Arc<dyn TokenService>,
}

impl Server {
    pub fn new(token_service: Arc<dyn TokenService>) -> Self {
        Self { token_service }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let token = &settings.token;
        let token_config = TokenConfig::try_new(
            Duration::from_secs(token.access_ttl_secs),
            Duration::from_secs(token.refresh_ttl_secs),
            token.max_logged_in,
            token.access_key.as_bytes(),
            token.refresh_key.as_bytes(),
        )?;

        let store = &settings.session_store;
        let session_store: Arc<dyn SessionStore> = match store.backend.as_str() {
            "memory" => Arc::new(MemorySessionStore::new()),
            "redis" => {
                let redis_url = store
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("session_store.redis_url is required"))?;
                let redis_client = redis::Client::open(redis_url)?;
                let mut redis_manager = redis_client.get_connection_manager().await?;

                let pong: String = redis::cmd("PING").query_async(&mut redis_manager).await?;
                debug!(%pong, "redis reachable");

                Arc::new(RedisSessionStore::new(
                    redis_client,
                    redis_manager,
                    store.key_prefix.clone(),
                    Duration::from_millis(store.call_timeout_ms),
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown session store backend: {}", other)),
        };

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new());
        let token_service: Arc<dyn TokenService> = Arc::new(RealTokenService::new(
            token_codec,
            session_store,
            token_config,
        ));

        info!(backend = %store.backend, "token service ready");

        Ok(Self::new(token_service))
    }
}
