//! # Recommender Crate
//!
//! Post-factorization serving layer for latent-factor recommendations.
//! Given (user, item, rating) observations, explicit or implicit, it
//! delegates factor learning to an [`mf_engine::FactorizationEngine`] and
//! answers four query types against the learned factors:
//!
//! - rating prediction ([`Recommender::predict`])
//! - top-N recommendations for a user ([`Recommender::user_recs`])
//! - top-N similar items ([`Recommender::item_recs`])
//! - top-N similar users ([`Recommender::similar_users`])
//!
//! ## Main Components
//!
//! - **types**: `Observation` and `Scored` result rows
//! - **index**: identifier-to-dense-index mapping and rated-pair tracking
//! - **scoring**: inner product, cosine similarity, cached norms
//! - **ranker**: stable descending top-k with deterministic tie-break
//! - **recommender**: the facade owning all fitted state
//! - **metrics**: RMSE for evaluation
//! - **error**: error types for fitting and querying
//!
//! ## Example Usage
//!
//! ```ignore
//! use mf_engine::SgdEngine;
//! use recommender::{Observation, Recommender};
//!
//! let observations = vec![
//!     Observation::rated(1, "Star Wars (1977)", 5.0),
//!     Observation::rated(2, "Star Wars (1977)", 3.0),
//! ];
//!
//! let mut recommender = Recommender::new(SgdEngine::new());
//! recommender.fit(&observations, None)?;
//!
//! let recs = recommender.user_recs(&1, Some(5), None)?;
//! let similar = recommender.item_recs(&"Star Wars (1977)", Some(5))?;
//! ```

// Public modules
pub mod error;
pub mod index;
pub mod metrics;
pub mod ranker;
pub mod recommender;
pub mod scoring;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{RecommendError, Result};
pub use recommender::{DEFAULT_COUNT, Recommender};
pub use types::{Observation, Scored};
