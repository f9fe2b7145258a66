//! Settings are loaded from a TOML file and overlaid with `SESSIONKEEPER__*`
//! environment variables. See `bin/settings_demo.rs` for a manual check.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
