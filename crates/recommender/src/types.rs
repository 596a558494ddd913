//! Core domain types for the serving layer.

use serde::{Deserialize, Serialize};

/// A single (user, item) interaction, with an optional explicit rating.
///
/// Identifiers are optional so malformed training rows can be rejected with
/// a precise error instead of failing to construct at all; the convenience
/// constructors always populate both. A dataset is implicit iff *no*
/// observation in it carries a rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<U, I> {
    pub user_id: Option<U>,
    pub item_id: Option<I>,
    pub rating: Option<f32>,
}

impl<U, I> Observation<U, I> {
    /// An interaction without a rating (implicit feedback, or a predict query)
    pub fn implicit(user_id: U, item_id: I) -> Self {
        Self {
            user_id: Some(user_id),
            item_id: Some(item_id),
            rating: None,
        }
    }

    /// An explicitly rated interaction
    pub fn rated(user_id: U, item_id: I, rating: f32) -> Self {
        Self {
            user_id: Some(user_id),
            item_id: Some(item_id),
            rating: Some(rating),
        }
    }
}

/// One ranked result: an identifier and its score.
///
/// The score is an inner product (recommendations, clamped to the observed
/// rating range in explicit mode) or a cosine similarity (similar items /
/// users).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored<K> {
    pub id: K,
    pub score: f32,
}
