//! Logging setup. Installing the subscriber is process-wide, so only filter
//! parsing is unit tested; `bin/logger_demo.rs` exercises the reload by hand.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
