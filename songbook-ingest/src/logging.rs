//! Tracing subscriber setup
//!
//! The subscriber is installed before the root folder and TOML file are
//! resolved so their warnings reach stderr. The level from the TOML file is
//! applied afterwards through a reload handle. `RUST_LOG`, when set and
//! valid, wins over both.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Level used until the configured one is known
pub const BOOTSTRAP_LEVEL: &str = "info";

/// Handle to the installed filter
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogHandle {
    /// Switch to the configured level; no-op when `RUST_LOG` governs
    pub fn apply_level(&self, level: &str) {
        if self.from_env {
            return;
        }

        if let Err(e) = self.handle.reload(EnvFilter::new(level)) {
            tracing::warn!(level, error = %e, "Could not apply configured log level");
        }
    }
}

/// Install the global subscriber with `RUST_LOG` or `level`
pub fn init(level: Option<&str>) -> LogHandle {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, from_env) = initial_filter(rust_log.as_deref(), level.unwrap_or(BOOTSTRAP_LEVEL));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    LogHandle { handle, from_env }
}

/// Filter from `RUST_LOG` when it parses, otherwise from `level`
fn initial_filter(rust_log: Option<&str>, level: &str) -> (EnvFilter, bool) {
    match rust_log.filter(|s| !s.trim().is_empty()) {
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => (filter, true),
            Err(_) => (EnvFilter::new(level), false),
        },
        None => (EnvFilter::new(level), false),
    }
}
