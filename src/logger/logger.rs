use crate::settings::Log;
use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const BOOTSTRAP_FILTER: &str = "info";

/// Parses `RUST_LOG`-style directives. Unlike `EnvFilter::new`, a bad
/// directive is an error instead of being dropped.
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::builder()
        .parse(directives)
        .with_context(|| format!("invalid log filter {:?}", directives))
}

/// Global subscriber whose filter is swapped once settings are known.
pub struct Logger {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// Installs the subscriber. A valid `RUST_LOG` replaces the `info`
    /// default until [`Logger::apply`] runs.
    pub fn install() -> Self {
        let initial = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .and_then(|directives| parse_filter(&directives).ok())
            .unwrap_or_else(|| EnvFilter::new(BOOTSTRAP_FILTER));
        let (layer, filter) = reload::Layer::new(initial);

        tracing_subscriber::registry()
            .with(layer)
            .with(fmt::layer().with_target(true))
            .init();

        Logger { filter }
    }

    /// Switches to the `[log] filter` from settings.
    pub fn apply(&self, log: &Log) -> Result<()> {
        self.set_filter(&log.filter)
    }

    /// On error the previous filter stays in effect.
    pub fn set_filter(&self, directives: &str) -> Result<()> {
        let filter = parse_filter(directives)?;
        self.filter
            .reload(filter)
            .context("log subscriber has been dropped")
    }

    pub fn current_filter(&self) -> Option<String> {
        self.filter.with_current(|filter| filter.to_string()).ok()
    }
}
