//! Logging Setup

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install a human-readable global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Install a global subscriber emitting one JSON object per event
pub fn init_json_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .json()
        .with_max_level(level)
        .with_current_span(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
