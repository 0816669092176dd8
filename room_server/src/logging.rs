//! Structured logging setup.
//!
//! The engine crate logs through the `log` facade; `init` installs a tracing
//! subscriber that also captures those records, so both end up on the same
//! console output with the same filter.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Initialize logging, honoring `RUST_LOG`.
///
/// # Example
///
/// ```no_run
/// room_server::logging::init();
/// tracing::info!("Server starting");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::debug!(filter = DEFAULT_FILTER, "logging initialized");
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Record a completed table command.
pub fn log_table_command(table_id: i64, command: &str, player_id: Option<i64>, ok: bool) {
    if ok {
        tracing::info!(table_id, command, player_id, "table command applied");
    } else {
        tracing::warn!(table_id, command, player_id, "table command rejected");
    }
}
