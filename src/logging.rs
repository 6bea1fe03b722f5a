//! Tracing setup.
//!
//! The filter sits behind a reload layer so debug logging can be switched on
//! and off while the bridge runs.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::config::LoggingConfig;

struct ReloadableFilter {
    handle: reload::Handle<EnvFilter, Registry>,
    base: String,
}

static FILTER: OnceLock<ReloadableFilter> = OnceLock::new();
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Filter directives for a configured level: this crate at `level`,
/// dependencies at warn.
pub fn default_directives(level: &str) -> String {
    format!("signin_bridge={level},warn")
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let base = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => directives,
        _ => default_directives(&config.level),
    };
    let (filter, handle) = reload::Layer::new(EnvFilter::try_new(&base)?);

    let json = config.json.then(|| fmt::layer().json().with_target(true));
    let plain = (!config.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()?;

    if FILTER.set(ReloadableFilter { handle, base }).is_err() {
        warn!("Tracing filter handle already installed");
    }
    if config.debug {
        set_debug_logging(true);
    }
    Ok(())
}

/// Raise this crate to `debug`, or restore the initial filter.
pub fn set_debug_logging(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);

    let Some(filter) = FILTER.get() else {
        debug!(enabled, "Tracing not initialized, recording debug flag only");
        return;
    };
    let directives = if enabled {
        format!("{},signin_bridge=debug", filter.base)
    } else {
        filter.base.clone()
    };
    match EnvFilter::try_new(&directives) {
        Ok(next) => {
            if let Err(err) = filter.handle.reload(next) {
                warn!(%err, "Failed to reload tracing filter");
                return;
            }
            info!(enabled, "Debug logging toggled");
        }
        Err(err) => warn!(%err, %directives, "Invalid tracing filter"),
    }
}

pub fn is_debug_logging() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}
