//! The recommender facade.
//!
//! Owns all fitted state (identifier indexes, rated pairs, factor matrices,
//! global bias, rating bounds, norm caches) and orchestrates fit, predict,
//! and the ranking queries. State is built completely and then swapped in,
//! so a failed fit leaves the previous model untouched and every query sees
//! one consistent generation of matrices.

use crate::error::{RecommendError, Result};
use crate::index::{IdIndex, RatedSet};
use crate::ranker::top_k;
use crate::scoring::{NormCache, cosine_similarity, inner_product};
use crate::types::{Observation, Scored};
use mf_engine::{
    FactorMatrix, FactorizationEngine, FitConfig, Loss, TripletMatrix, UNKNOWN_INDEX,
};
use std::collections::HashSet;
use std::hash::Hash;
use tracing::{debug, instrument};

/// Default number of results for recommendation and similarity queries
pub const DEFAULT_COUNT: usize = 5;

/// Everything produced by one successful fit, replaced wholesale by the next
struct Fitted<U, I> {
    users: IdIndex<U>,
    items: IdIndex<I>,
    rated: RatedSet,
    user_factors: FactorMatrix,
    item_factors: FactorMatrix,
    global_mean: f32,
    /// Observed (min, max) rating; `None` in implicit mode, where no
    /// clamping is ever applied
    bounds: Option<(f32, f32)>,
    user_norms: NormCache,
    item_norms: NormCache,
}

impl<U, I> Fitted<U, I> {
    fn clamp(&self, score: f32) -> f32 {
        match self.bounds {
            Some((min, max)) => score.clamp(min, max),
            None => score,
        }
    }
}

/// Latent-factor recommender: learns user/item factor vectors through a
/// [`FactorizationEngine`] and serves predictions, top-N recommendations,
/// and similarity queries against them.
///
/// Generic over the user and item identifier types, which only need to be
/// hashable and comparable; integers, strings, and opaque tokens all work.
///
/// ## Example
/// ```ignore
/// use mf_engine::SgdEngine;
/// use recommender::{Observation, Recommender};
///
/// let mut recommender = Recommender::new(SgdEngine::new()).with_factors(20);
/// recommender.fit(&observations, None)?;
///
/// let recs = recommender.user_recs(&user_id, Some(5), None)?;
/// ```
pub struct Recommender<U, I> {
    factors: usize,
    epochs: usize,
    /// `None` means verbose exactly when a validation set is supplied
    verbose: Option<bool>,
    engine: Box<dyn FactorizationEngine>,
    fitted: Option<Fitted<U, I>>,
}

impl<U, I> Recommender<U, I>
where
    U: Eq + Hash + Clone,
    I: Eq + Hash + Clone,
{
    /// Create an unfit recommender around a factorization engine.
    ///
    /// Defaults: 8 factors, 20 epochs, verbose only when fitting with a
    /// validation set.
    pub fn new(engine: impl FactorizationEngine + 'static) -> Self {
        Self {
            factors: 8,
            epochs: 20,
            verbose: None,
            engine: Box::new(engine),
            fitted: None,
        }
    }

    /// Configure the latent factor count (default: 8)
    pub fn with_factors(mut self, factors: usize) -> Self {
        self.factors = factors;
        self
    }

    /// Configure the training epoch count (default: 20)
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Force engine verbosity on or off
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Fit the model on a training set, optionally evaluating against a
    /// validation set each epoch.
    ///
    /// The dataset is implicit iff no training observation carries a rating;
    /// a single rated observation forces explicit mode for the entire set,
    /// and unrated siblings then fail with [`RecommendError::MissingRating`].
    ///
    /// Replaces all model state on success. On error, the previously fitted
    /// state (if any) remains fully intact.
    #[instrument(skip_all, fields(observations = train.len()))]
    pub fn fit(
        &mut self,
        train: &[Observation<U, I>],
        validation: Option<&[Observation<U, I>]>,
    ) -> Result<()> {
        if train.is_empty() {
            return Err(RecommendError::NoTrainingData);
        }

        let implicit = train.iter().all(|obs| obs.rating.is_none());
        if !implicit {
            check_ratings(train)?;
            if let Some(validation) = validation {
                check_ratings(validation)?;
            }
        }

        // Build both identifier indexes, the rated set, the training
        // triplets, and the rating bounds in a single pass.
        let mut users = IdIndex::new();
        let mut items = IdIndex::new();
        let mut rated = RatedSet::new();
        let mut input = TripletMatrix::new();
        let mut min_rating = f32::INFINITY;
        let mut max_rating = f32::NEG_INFINITY;

        for obs in train {
            let Some(user_id) = obs.user_id.as_ref() else {
                return Err(RecommendError::MissingUserId);
            };
            let Some(item_id) = obs.item_id.as_ref() else {
                return Err(RecommendError::MissingItemId);
            };
            let u = users.get_or_assign(user_id);
            let i = items.get_or_assign(item_id);
            rated.insert(u, i);

            let value = if implicit {
                1.0
            } else {
                // check_ratings already rejected missing ratings
                let rating = obs.rating.ok_or(RecommendError::MissingRating)?;
                min_rating = min_rating.min(rating);
                max_rating = max_rating.max(rating);
                rating
            };
            input.push(u as i32, i as i32, value);
        }

        let bounds = if implicit {
            None
        } else {
            Some((min_rating, max_rating))
        };

        // Validation rows may reference entities the training set never
        // saw; those map to the sentinel index the engine is required to
        // tolerate rather than failing the whole fit.
        let eval = validation.map(|observations| {
            let mut eval = TripletMatrix::new();
            for obs in observations {
                let u = obs
                    .user_id
                    .as_ref()
                    .and_then(|id| users.lookup(id))
                    .map_or(UNKNOWN_INDEX, |u| u as i32);
                let i = obs
                    .item_id
                    .as_ref()
                    .and_then(|id| items.lookup(id))
                    .map_or(UNKNOWN_INDEX, |i| i as i32);
                let value = match obs.rating {
                    Some(rating) if !implicit => rating,
                    _ => 1.0,
                };
                eval.push(u, i, value);
            }
            eval
        });

        let config = FitConfig {
            loss: if implicit {
                Loss::OneClassL2
            } else {
                Loss::RealL2
            },
            factors: self.factors,
            iterations: self.epochs,
            quiet: !self.verbose.unwrap_or(validation.is_some()),
        };

        debug!(
            "fitting {} users x {} items, {} observations, {:?}",
            users.len(),
            items.len(),
            input.len(),
            config.loss
        );
        let model = self.engine.fit(&input, eval.as_ref(), &config)?;

        if model.user_factors.n_rows() != users.len() {
            return Err(RecommendError::FactorShapeMismatch {
                expected: users.len(),
                found: model.user_factors.n_rows(),
            });
        }
        if model.item_factors.n_rows() != items.len() {
            return Err(RecommendError::FactorShapeMismatch {
                expected: items.len(),
                found: model.item_factors.n_rows(),
            });
        }

        self.fitted = Some(Fitted {
            users,
            items,
            rated,
            user_factors: model.user_factors,
            item_factors: model.item_factors,
            global_mean: model.bias,
            bounds,
            user_norms: NormCache::new(),
            item_norms: NormCache::new(),
        });
        Ok(())
    }

    /// Predict a score for each (user, item) query.
    ///
    /// Known pairs score by inner product, clamped to the observed rating
    /// range in explicit mode. Queries with an unseen (or missing) user or
    /// item return exactly [`global_mean`], never a clamped or contextually
    /// wrong score.
    ///
    /// [`global_mean`]: Recommender::global_mean
    pub fn predict(&self, queries: &[Observation<U, I>]) -> Result<Vec<f32>> {
        let fitted = self.fitted()?;
        Ok(queries
            .iter()
            .map(|obs| {
                let u = obs.user_id.as_ref().and_then(|id| fitted.users.lookup(id));
                let i = obs.item_id.as_ref().and_then(|id| fitted.items.lookup(id));
                match (u, i) {
                    (Some(u), Some(i)) => fitted.clamp(inner_product(
                        fitted.user_factors.row(u),
                        fitted.item_factors.row(i),
                    )),
                    _ => fitted.global_mean,
                }
            })
            .collect())
    }

    /// Top-N item recommendations for a user, best first.
    ///
    /// Returns empty for an unseen user. With `item_ids`, candidates are
    /// restricted to the given identifiers that exist in the item index
    /// (unknown ones silently dropped; none known returns empty) and
    /// rated-item filtering is disabled: the caller asked for scores on
    /// exactly those items. Without `item_ids`, every known item is a
    /// candidate and items the user rated during training are skipped
    /// without consuming a result slot.
    ///
    /// `count: None` returns all eligible results.
    pub fn user_recs(
        &self,
        user_id: &U,
        count: Option<usize>,
        item_ids: Option<&[I]>,
    ) -> Result<Vec<Scored<I>>> {
        let fitted = self.fitted()?;
        let Some(u) = fitted.users.lookup(user_id) else {
            return Ok(Vec::new());
        };
        let user_row = fitted.user_factors.row(u);

        let (candidates, excluded): (Vec<usize>, Option<&HashSet<usize>>) = match item_ids {
            Some(ids) => {
                let known: Vec<usize> =
                    ids.iter().filter_map(|id| fitted.items.lookup(id)).collect();
                if known.is_empty() {
                    return Ok(Vec::new());
                }
                (known, None)
            }
            None => ((0..fitted.items.len()).collect(), fitted.rated.items(u)),
        };

        // Rank on raw inner products; clamping happens on the surviving
        // results so out-of-range scores still order distinctly.
        let scores: Vec<f32> = candidates
            .iter()
            .map(|&i| inner_product(fitted.item_factors.row(i), user_row))
            .collect();

        // Over-fetch past the requested count so items removed by the
        // rated filter below don't leave the result short.
        let excluded_len = excluded.map_or(0, HashSet::len);
        let ranked = top_k(&scores, count.map(|c| c + excluded_len));

        let mut results = Vec::new();
        for position in ranked {
            let item_index = candidates[position];
            if excluded.is_some_and(|set| set.contains(&item_index)) {
                continue;
            }
            results.push(Scored {
                id: fitted.items.key(item_index).clone(),
                score: fitted.clamp(scores[position]),
            });
            if count.is_some_and(|c| results.len() == c) {
                break;
            }
        }
        Ok(results)
    }

    /// Top-N most similar items by cosine similarity, best first.
    ///
    /// The queried item never appears in its own results; unseen items
    /// return empty.
    pub fn item_recs(&self, item_id: &I, count: Option<usize>) -> Result<Vec<Scored<I>>> {
        let fitted = self.fitted()?;
        Ok(similar_to(
            &fitted.items,
            &fitted.item_factors,
            &fitted.item_norms,
            item_id,
            count,
        ))
    }

    /// Top-N most similar users by cosine similarity, best first.
    pub fn similar_users(&self, user_id: &U, count: Option<usize>) -> Result<Vec<Scored<U>>> {
        let fitted = self.fitted()?;
        Ok(similar_to(
            &fitted.users,
            &fitted.user_factors,
            &fitted.user_norms,
            user_id,
            count,
        ))
    }

    /// User identifiers in first-seen order; empty before the first fit
    pub fn user_ids(&self) -> &[U] {
        self.fitted.as_ref().map_or(&[], |f| f.users.keys())
    }

    /// Item identifiers in first-seen order; empty before the first fit
    pub fn item_ids(&self) -> &[I] {
        self.fitted.as_ref().map_or(&[], |f| f.items.keys())
    }

    /// Global rating/interaction baseline reported by the engine
    pub fn global_mean(&self) -> Result<f32> {
        Ok(self.fitted()?.global_mean)
    }

    /// The user's factor vector, or `None` for an unseen identifier
    pub fn user_factors(&self, user_id: &U) -> Result<Option<&[f32]>> {
        let fitted = self.fitted()?;
        Ok(fitted
            .users
            .lookup(user_id)
            .map(|u| fitted.user_factors.row(u)))
    }

    /// The item's factor vector, or `None` for an unseen identifier
    pub fn item_factors(&self, item_id: &I) -> Result<Option<&[f32]>> {
        let fitted = self.fitted()?;
        Ok(fitted
            .items
            .lookup(item_id)
            .map(|i| fitted.item_factors.row(i)))
    }

    /// A `[start, end)` window over the cartesian product of known user ids
    /// and known item ids, row-major (outer loop over users).
    ///
    /// Either side can be fixed to a single known identifier; fixing both
    /// returns that single pair directly, without windowing. `end` defaults
    /// to, and is clamped to, the total combination count.
    ///
    /// Unknown fixed identifiers and windows that select nothing are errors.
    pub fn user_item_combinations(
        &self,
        start: usize,
        end: Option<usize>,
        user_id: Option<&U>,
        item_id: Option<&I>,
    ) -> Result<Vec<(U, I)>> {
        let fitted = self.fitted()?;
        let user = user_id
            .map(|id| {
                fitted
                    .users
                    .lookup(id)
                    .ok_or(RecommendError::UnknownUserId)
            })
            .transpose()?;
        let item = item_id
            .map(|id| {
                fitted
                    .items
                    .lookup(id)
                    .ok_or(RecommendError::UnknownItemId)
            })
            .transpose()?;

        if let (Some(u), Some(i)) = (user, item) {
            return Ok(vec![(
                fitted.users.key(u).clone(),
                fitted.items.key(i).clone(),
            )]);
        }

        let user_axis: Vec<usize> = match user {
            Some(u) => vec![u],
            None => (0..fitted.users.len()).collect(),
        };
        let item_axis: Vec<usize> = match item {
            Some(i) => vec![i],
            None => (0..fitted.items.len()).collect(),
        };

        let total = user_axis.len() * item_axis.len();
        let end = end.unwrap_or(total).min(total);
        if start >= total || start >= end {
            return Err(RecommendError::InvalidWindow { start, end });
        }

        let mut combinations = Vec::with_capacity(end - start);
        for position in start..end {
            let u = user_axis[position / item_axis.len()];
            let i = item_axis[position % item_axis.len()];
            combinations.push((
                fitted.users.key(u).clone(),
                fitted.items.key(i).clone(),
            ));
        }
        Ok(combinations)
    }

    fn fitted(&self) -> Result<&Fitted<U, I>> {
        self.fitted.as_ref().ok_or(RecommendError::NotFit)
    }
}

/// Explicit-mode datasets must carry a finite rating on every observation
fn check_ratings<U, I>(observations: &[Observation<U, I>]) -> Result<()> {
    for obs in observations {
        if obs.rating.is_none() {
            return Err(RecommendError::MissingRating);
        }
    }
    for obs in observations {
        if let Some(rating) = obs.rating {
            if !rating.is_finite() {
                return Err(RecommendError::InvalidRating { value: rating });
            }
        }
    }
    Ok(())
}

/// Cosine-similarity ranking shared by `item_recs` and `similar_users`
fn similar_to<K: Eq + Hash + Clone>(
    index: &IdIndex<K>,
    factors: &FactorMatrix,
    cache: &NormCache,
    id: &K,
    count: Option<usize>,
) -> Vec<Scored<K>> {
    let Some(target) = index.lookup(id) else {
        return Vec::new();
    };
    let norms = cache.get_or_compute(factors);
    let target_row = factors.row(target);

    let scores: Vec<f32> = factors
        .rows()
        .enumerate()
        .map(|(i, row)| cosine_similarity(row, target_row, norms[i], norms[target]))
        .collect();

    // One extra slot: the queried entity is still in the ranking and gets
    // removed below. Other entities can tie with its self-similarity score,
    // so the match is by index, never by score.
    let ranked = top_k(&scores, count.map(|c| c + 1));

    let mut results = Vec::new();
    for i in ranked {
        if i == target {
            continue;
        }
        results.push(Scored {
            id: index.key(i).clone(),
            score: scores[i],
        });
    }
    if let Some(count) = count {
        results.truncate(count);
    }
    results
}
