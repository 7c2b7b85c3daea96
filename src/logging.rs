use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

/// Level used until the configuration has been loaded
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Handle for swapping the active level filter after startup
pub type LogLevelHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Level filter that can be replaced at runtime, seeded from `RUST_LOG`
/// when set
pub fn reloadable_filter() -> (
    reload::Layer<EnvFilter, tracing_subscriber::Registry>,
    LogLevelHandle,
) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    reload::Layer::new(filter)
}

/// Install the global subscriber so configuration loading is already logged
pub fn init_logging() -> LogLevelHandle {
    let (filter, handle) = reloadable_filter();
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    handle
}

/// Switch to the configured level
pub fn apply_log_level(handle: &LogLevelHandle, level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e))?;
    handle.reload(filter)?;
    Ok(())
}

/// Log categories for better visual distinction
pub mod log_cat {
    pub const REGISTRY: &str = "⏱️";
    pub const TIMER: &str = "🔄";
    pub const REPORT: &str = "📊";
    pub const CONFIG: &str = "⚙️";
    pub const ERROR: &str = "❌";
    pub const SUCCESS: &str = "✅";
}

/// Registry lifecycle logs
pub fn log_registry_initialized(capacity: usize) {
    info!(
        "{} Registry initialized (capacity: {})",
        log_cat::REGISTRY,
        capacity
    );
}

pub fn log_registry_reset(dropped_entries: usize) {
    info!(
        "{} Registry re-initialized, released {} timers",
        log_cat::REGISTRY,
        dropped_entries
    );
}

pub fn log_registry_cleanup(entries: usize, total_elapsed: f64) {
    info!(
        "{} Registry cleaned up: {} timers, {:.6}s recorded",
        log_cat::REGISTRY,
        entries,
        total_elapsed
    );
}

pub fn log_registry_grown(from: usize, to: usize) {
    debug!("{} Timer storage grown: {} → {}", log_cat::REGISTRY, from, to);
}

/// Timer related logs
pub fn log_timer_started(name: &str, call_count: u64) {
    debug!("{} start {} (call #{})", log_cat::TIMER, name, call_count);
}

pub fn log_timer_stopped(name: &str, elapsed: f64) {
    debug!("{} stop {} ({:.6}s)", log_cat::TIMER, name, elapsed);
}

pub fn log_timer_rejected(operation: &str, name: &str, reason: &str) {
    warn!(
        "{} {} Rejected {} of {:?}: {}",
        log_cat::TIMER,
        log_cat::ERROR,
        operation,
        name,
        reason
    );
}

/// Report related logs
pub fn log_report_written(path: &str, functions: usize) {
    info!(
        "{} {} Report written: {} ({} functions)",
        log_cat::REPORT,
        log_cat::SUCCESS,
        path,
        functions
    );
}

pub fn log_report_error(path: &str, error: &str) {
    error!(
        "{} {} Report failed: {} - {}",
        log_cat::REPORT,
        log_cat::ERROR,
        path,
        error
    );
}

/// Configuration related logs
pub fn log_config_loaded(source: &str) {
    info!("{} Configuration loaded from {}", log_cat::CONFIG, source);
}

pub fn log_config_error(error: &str) {
    error!(
        "{} {} Configuration error: {}",
        log_cat::CONFIG,
        log_cat::ERROR,
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn configured_level_replaces_startup_filter() {
        let (filter, handle) = reload::Layer::new(EnvFilter::new(DEFAULT_LOG_LEVEL));
        let subscriber = tracing_subscriber::registry().with(filter);

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(Level::INFO));
            assert!(!tracing::enabled!(Level::DEBUG));

            apply_log_level(&handle, "debug").unwrap();
            assert!(tracing::enabled!(Level::DEBUG));

            apply_log_level(&handle, "error").unwrap();
            assert!(!tracing::enabled!(Level::WARN));
        });
    }

    #[test]
    fn invalid_level_is_rejected() {
        let (_filter, handle) = reload::Layer::new(EnvFilter::new(DEFAULT_LOG_LEVEL));
        assert!(apply_log_level(&handle, "khronos=loudest").is_err());
    }
}
