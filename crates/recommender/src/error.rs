//! Error types for the recommender crate.

use thiserror::Error;

/// Errors raised by fitting, querying, and metrics.
///
/// All variants are caller-input or precondition errors: none are transient,
/// and none leave partially-updated model state behind. Unseen identifiers in
/// query paths are deliberately *not* errors; they produce empty results or
/// bias-only predictions instead.
#[derive(Error, Debug)]
pub enum RecommendError {
    /// `fit` was called with an empty training set
    #[error("No training data")]
    NoTrainingData,

    /// A training observation had no user identifier
    #[error("Missing user_id")]
    MissingUserId,

    /// A training observation had no item identifier
    #[error("Missing item_id")]
    MissingItemId,

    /// Explicit-mode dataset contained an observation without a rating
    #[error("Missing rating")]
    MissingRating,

    /// A rating was NaN or infinite
    #[error("Rating must be a finite number, got {value}")]
    InvalidRating { value: f32 },

    /// A query method was invoked before the first successful `fit`
    #[error("Not fit")]
    NotFit,

    /// A user identifier passed to `user_item_combinations` is unknown
    #[error("Unknown user_id")]
    UnknownUserId,

    /// An item identifier passed to `user_item_combinations` is unknown
    #[error("Unknown item_id")]
    UnknownItemId,

    /// Window bounds that select nothing or start past the end
    #[error("Invalid window bounds: start {start}, end {end}")]
    InvalidWindow { start: usize, end: usize },

    /// `rmse` called with sequences of different lengths
    #[error("Size mismatch: {actual} actual vs {expected} expected")]
    SizeMismatch { actual: usize, expected: usize },

    /// The engine returned factor matrices that don't cover every indexed entity
    #[error("Engine returned {found} factor rows, expected {expected}")]
    FactorShapeMismatch { expected: usize, found: usize },

    /// The factorization engine itself failed
    #[error("Factorization failed: {0}")]
    Engine(#[from] mf_engine::EngineError),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, RecommendError>;
