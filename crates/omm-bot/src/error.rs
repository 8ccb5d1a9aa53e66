//! Application-level errors.

use thiserror::Error;

/// Top-level failures that abort startup or a whole run.
///
/// Per-cycle failures never surface here; the loop degrades to skipping
/// a side, a market or a cycle and keeps running.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid quote parameter: {0}")]
    Validation(#[from] omm_core::CoreError),

    #[error("store error: {0}")]
    Store(#[from] omm_store::StoreError),

    #[error("venue error: {0}")]
    Venue(#[from] omm_venue::VenueError),
}

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;
