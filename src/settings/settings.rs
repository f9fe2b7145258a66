use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub session_store: Store,
    pub token: Token,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    // TLS is enabled only when both paths are set
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "redis"
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

#[derive(Deserialize)]
pub struct Token {
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_max_logged_in")]
    pub max_logged_in: usize,
    pub access_key: String,
    pub refresh_key: String,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("max_logged_in", &self.max_logged_in)
            .field("access_key", &"<redacted>")
            .field("refresh_key", &"<redacted>")
            .finish()
    }
}

fn default_call_timeout_ms() -> u64 {
    3000
}

fn default_access_ttl_secs() -> u64 {
    15 * 60
}

fn default_refresh_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_logged_in() -> usize {
    6
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides look like `SESSIONKEEPER__TOKEN__ACCESS_KEY`.
const ENV_PREFIX: &str = "SESSIONKEEPER";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_settings_parse() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        assert_eq!(settings.session_store.backend, "memory");
        assert_eq!(settings.token.access_ttl_secs, 900);
        assert_eq!(settings.token.refresh_ttl_secs, 604800);
        assert_eq!(settings.token.max_logged_in, 6);
        assert_ne!(settings.token.access_key, settings.token.refresh_key);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("settings/does-not-exist.toml")).is_err());
    }

    #[test]
    fn secrets_are_not_printed() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        let printed = format!("{:?}", settings);
        assert!(!printed.contains(&settings.token.access_key));
        assert!(!printed.contains(&settings.token.refresh_key));
    }
}
