use studybuddy_core::error::CoreError;

/// Errors surfaced by the status store, reconciler and dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),
}
