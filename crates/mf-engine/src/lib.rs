//! Matrix factorization engine boundary.
//!
//! This crate defines the narrow interface between the serving layer and the
//! numeric engine that actually learns latent factors. It handles:
//! - The sparse triplet format the engine consumes (`TripletMatrix`)
//! - Loss and hyperparameter selection (`Loss`, `FitConfig`)
//! - The trained output contract (`FactorModel`, `FactorMatrix`)
//! - The `FactorizationEngine` trait any conforming optimizer implements
//!
//! A reference stochastic-gradient-descent engine lives in [`sgd`]. The
//! serving layer must not assume anything beyond the trait contract, so
//! swapping in another optimizer is a one-line change for callers.

use thiserror::Error;

pub mod sgd;

pub use sgd::SgdEngine;

/// Sentinel index for validation rows that reference a user or item the
/// training set never saw. Engines must tolerate such rows (skip them)
/// rather than fail.
pub const UNKNOWN_INDEX: i32 = -1;

/// Errors that can occur inside a factorization engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// A hyperparameter combination the engine cannot train with
    #[error("Invalid engine config: {reason}")]
    InvalidConfig { reason: String },

    /// The training matrix contained no usable entries
    #[error("Empty training set")]
    EmptyTrainingSet,
}

/// Convenience alias for Results in this crate
pub type Result<T> = std::result::Result<T, EngineError>;

/// Loss function selecting between explicit and implicit feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    /// Squared error against real-valued ratings (explicit feedback)
    RealL2,
    /// One-class squared error over observed interactions (implicit feedback)
    OneClassL2,
}

/// Hyperparameters passed to an engine for one training run
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub loss: Loss,
    /// Length of each latent factor vector
    pub factors: usize,
    /// Number of training epochs
    pub iterations: usize,
    /// Suppress per-epoch progress logging
    pub quiet: bool,
}

/// One sparse training cell: `(row, col) -> value`
///
/// Rows are user indices and columns are item indices. `row` / `col` may be
/// [`UNKNOWN_INDEX`] in validation matrices only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triplet {
    pub row: i32,
    pub col: i32,
    pub value: f32,
}

/// Sparse matrix in triplet (COO) form, built incrementally with [`push`].
///
/// Tracks the dense dimensions implied by the largest indices seen so far,
/// ignoring sentinel entries.
///
/// [`push`]: TripletMatrix::push
#[derive(Debug, Clone, Default)]
pub struct TripletMatrix {
    entries: Vec<Triplet>,
    n_rows: usize,
    n_cols: usize,
}

impl TripletMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one cell. Negative indices are kept (validation sentinel) but
    /// do not grow the matrix dimensions.
    pub fn push(&mut self, row: i32, col: i32, value: f32) {
        if row >= 0 {
            self.n_rows = self.n_rows.max(row as usize + 1);
        }
        if col >= 0 {
            self.n_cols = self.n_cols.max(col as usize + 1);
        }
        self.entries.push(Triplet { row, col, value });
    }

    pub fn entries(&self) -> &[Triplet] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rows implied by the largest non-sentinel row index
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns implied by the largest non-sentinel column index
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }
}

/// Dense row-major factor matrix: one fixed-length factor vector per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorMatrix {
    data: Vec<f32>,
    factors: usize,
}

impl FactorMatrix {
    /// Create a zeroed matrix with `rows` vectors of length `factors`
    pub fn zeros(rows: usize, factors: usize) -> Self {
        Self {
            data: vec![0.0; rows * factors],
            factors,
        }
    }

    /// Wrap an existing row-major buffer. `data.len()` must be a multiple of
    /// `factors`.
    pub fn from_vec(data: Vec<f32>, factors: usize) -> Self {
        debug_assert!(factors > 0 && data.len() % factors == 0);
        Self { data, factors }
    }

    pub fn n_rows(&self) -> usize {
        if self.factors == 0 {
            0
        } else {
            self.data.len() / self.factors
        }
    }

    pub fn factors(&self) -> usize {
        self.factors
    }

    /// Borrow the factor vector for one entity
    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.factors..(index + 1) * self.factors]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.data[index * self.factors..(index + 1) * self.factors]
    }

    /// Iterate over all factor vectors in row order
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.factors)
    }
}

/// Everything a trained engine hands back to the serving layer
#[derive(Debug, Clone)]
pub struct FactorModel {
    /// Overall rating/interaction baseline
    pub bias: f32,
    pub user_factors: FactorMatrix,
    pub item_factors: FactorMatrix,
}

/// Contract for an external matrix factorization optimizer.
///
/// Implementations receive the training triplets, an optional validation set
/// (which may contain [`UNKNOWN_INDEX`] rows that must be tolerated), and the
/// hyperparameters, and return factor matrices covering every non-sentinel
/// index in the training set plus a global bias.
pub trait FactorizationEngine: Send + Sync {
    fn fit(
        &self,
        train: &TripletMatrix,
        validation: Option<&TripletMatrix>,
        config: &FitConfig,
    ) -> Result<FactorModel>;
}
