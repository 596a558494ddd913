//! Reference stochastic gradient descent engine.
//!
//! Biased-free matrix factorization trained with plain SGD:
//! - `RealL2` fits `p_u . q_i` directly to the observed rating and reports
//!   the training mean as the global bias
//! - `OneClassL2` fits observed cells toward 1.0 and a few sampled
//!   unobserved cells toward 0.0, reporting a zero bias
//!
//! Factor initialization and negative sampling are seeded, so two fits with
//! identical inputs produce identical models.

use crate::{
    EngineError, FactorModel, FactorMatrix, FactorizationEngine, FitConfig, Loss, Result,
    TripletMatrix,
};
use rand::prelude::*;
use tracing::info;

/// SGD-based matrix factorization engine
pub struct SgdEngine {
    learning_rate: f32,
    regularization: f32,
    /// Unobserved cells sampled per observed cell in one-class mode
    negative_samples: usize,
    seed: u64,
}

impl SgdEngine {
    pub fn new() -> Self {
        Self {
            learning_rate: 0.05,
            regularization: 0.01,
            negative_samples: 3,
            seed: 42,
        }
    }

    /// Configure the SGD step size (default: 0.05)
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Configure the L2 regularization strength (default: 0.01)
    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    /// Configure negatives sampled per positive in one-class mode (default: 3)
    pub fn with_negative_samples(mut self, negative_samples: usize) -> Self {
        self.negative_samples = negative_samples;
        self
    }

    /// Configure the RNG seed for initialization and sampling (default: 42)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SgdEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FactorizationEngine for SgdEngine {
    fn fit(
        &self,
        train: &TripletMatrix,
        validation: Option<&TripletMatrix>,
        config: &FitConfig,
    ) -> Result<FactorModel> {
        if config.factors == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "factor count must be at least 1".to_string(),
            });
        }
        if train.is_empty() {
            return Err(EngineError::EmptyTrainingSet);
        }

        let k = config.factors;
        let n_users = train.n_rows();
        let n_items = train.n_cols();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut user_data = random_factors(n_users, k, &mut rng);
        let mut item_data = random_factors(n_items, k, &mut rng);

        let bias = match config.loss {
            Loss::RealL2 => {
                let sum: f32 = train.entries().iter().map(|t| t.value).sum();
                sum / train.len() as f32
            }
            Loss::OneClassL2 => 0.0,
        };

        let lr = self.learning_rate;
        let reg = self.regularization;

        for epoch in 0..config.iterations {
            let mut squared_error = 0.0f64;

            for t in train.entries() {
                // Training sets are built from dense indices, but be tolerant
                if t.row < 0 || t.col < 0 {
                    continue;
                }
                let u = t.row as usize * k;
                let i = t.col as usize * k;

                let err = t.value - dot(&user_data[u..u + k], &item_data[i..i + k]);
                squared_error += (err as f64).powi(2);
                for f in 0..k {
                    let pu = user_data[u + f];
                    let qi = item_data[i + f];
                    user_data[u + f] += lr * (err * qi - reg * pu);
                    item_data[i + f] += lr * (err * pu - reg * qi);
                }

                if config.loss == Loss::OneClassL2 {
                    for _ in 0..self.negative_samples {
                        let j = rng.random_range(0..n_items);
                        if j == t.col as usize {
                            continue;
                        }
                        let jo = j * k;
                        let err = -dot(&user_data[u..u + k], &item_data[jo..jo + k]);
                        for f in 0..k {
                            let pu = user_data[u + f];
                            let qj = item_data[jo + f];
                            user_data[u + f] += lr * (err * qj - reg * pu);
                            item_data[jo + f] += lr * (err * pu - reg * qj);
                        }
                    }
                }
            }

            if !config.quiet {
                let train_rmse = (squared_error / train.len() as f64).sqrt();
                match validation {
                    Some(eval) => {
                        let val_rmse =
                            validation_rmse(eval, &user_data, &item_data, k, n_users, n_items);
                        info!(
                            "epoch {}/{}: train rmse {:.4}, validation rmse {:.4}",
                            epoch + 1,
                            config.iterations,
                            train_rmse,
                            val_rmse
                        );
                    }
                    None => info!(
                        "epoch {}/{}: train rmse {:.4}",
                        epoch + 1,
                        config.iterations,
                        train_rmse
                    ),
                }
            }
        }

        Ok(FactorModel {
            bias,
            user_factors: FactorMatrix::from_vec(user_data, k),
            item_factors: FactorMatrix::from_vec(item_data, k),
        })
    }
}

/// Uniform factors in `[0, 1/sqrt(k))` so initial inner products are small
fn random_factors(n: usize, k: usize, rng: &mut StdRng) -> Vec<f32> {
    let scale = 1.0 / (k as f32).sqrt();
    (0..n * k).map(|_| rng.random::<f32>() * scale).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// RMSE over validation cells, skipping sentinel and out-of-range rows
fn validation_rmse(
    eval: &TripletMatrix,
    user_data: &[f32],
    item_data: &[f32],
    k: usize,
    n_users: usize,
    n_items: usize,
) -> f64 {
    let mut squared_error = 0.0f64;
    let mut count = 0usize;
    for t in eval.entries() {
        if t.row < 0 || t.col < 0 {
            continue;
        }
        let (u, i) = (t.row as usize, t.col as usize);
        if u >= n_users || i >= n_items {
            continue;
        }
        let err = t.value - dot(&user_data[u * k..(u + 1) * k], &item_data[i * k..(i + 1) * k]);
        squared_error += (err as f64).powi(2);
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        (squared_error / count as f64).sqrt()
    }
}
