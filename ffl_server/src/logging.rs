//! Structured logging configuration.
//!
//! Sets up `tracing` with an env-driven filter and provides helpers that
//! record bracket events with consistent field names. Records emitted by the
//! bracket library through the `log` facade are forwarded to the same
//! subscriber.

use ffl_bracket::bracket::{BracketError, ErrorKind, RoundOutcome, TournamentId};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use ffl_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // `init` also installs the log-to-tracing bridge
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a bracket lifecycle event
///
/// # Example
///
/// ```
/// use ffl_server::logging::log_bracket_event;
/// use uuid::Uuid;
///
/// log_bracket_event("bracket_initialized", Uuid::new_v4(), "12 competitors seeded");
/// ```
pub fn log_bracket_event(event_type: &str, tournament_id: TournamentId, message: &str) {
    tracing::info!(
        event_type = event_type,
        tournament_id = %tournament_id,
        "BRACKET: {}",
        message
    );
}

/// Log the result of closing out a round
pub fn log_round_advanced(tournament_id: TournamentId, outcome: &RoundOutcome) {
    let upsets = outcome
        .matchup_results
        .iter()
        .filter(|result| result.is_upset)
        .count();
    let tiebreaks = outcome
        .matchup_results
        .iter()
        .filter(|result| result.tiebreak.is_some())
        .count();

    tracing::info!(
        tournament_id = %tournament_id,
        round = outcome.round.number(),
        advancing = outcome.advancing.len(),
        eliminated = outcome.eliminated.len(),
        upsets = upsets,
        tiebreaks = tiebreaks,
        tournament_complete = outcome.tournament_complete,
        "Round advanced"
    );
}

/// Log a failed bracket operation
///
/// Caller mistakes are logged at `debug`, transient conditions at `warn`
/// and everything that points at a server-side fault at `error`.
pub fn log_bracket_error(operation: &str, tournament_id: TournamentId, error: &BracketError) {
    match error.kind() {
        ErrorKind::Precondition | ErrorKind::NotFound | ErrorKind::Data => tracing::debug!(
            operation = operation,
            tournament_id = %tournament_id,
            error = %error,
            "Bracket request rejected"
        ),
        ErrorKind::NotReady => tracing::warn!(
            operation = operation,
            tournament_id = %tournament_id,
            error = %error,
            "Bracket not ready"
        ),
        ErrorKind::Invariant | ErrorKind::Storage => tracing::error!(
            operation = operation,
            tournament_id = %tournament_id,
            error = %error,
            retryable = error.is_retryable(),
            "Bracket operation failed"
        ),
    }
}

/// Log performance metric
///
/// # Example
///
/// ```
/// use ffl_server::logging::log_performance;
/// use std::time::Instant;
///
/// let start = Instant::now();
/// // ... do work ...
/// let duration = start.elapsed().as_millis() as u64;
/// log_performance("advance_round", duration, Some("round 2"));
/// ```
pub fn log_performance(operation: &str, duration_ms: u64, metadata: Option<&str>) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}
