//! # MovieLens Crate
//!
//! Loads the MovieLens 100K dataset from a local directory into the
//! observation format the recommender consumes. Items are keyed by their
//! human-readable title rather than their numeric id, so query results read
//! as movie names.
//!
//! Expects a directory containing the ml-100k files `u.item` and `u.data`
//! (download and unpack the archive from grouplens.org once; no network
//! access happens here).
//!
//! ## Example Usage
//!
//! ```ignore
//! use movielens::load_ratings;
//! use std::path::Path;
//!
//! let observations = load_ratings(Path::new("data/ml-100k"))?;
//! assert_eq!(observations.len(), 100_000);
//! ```

pub mod error;
pub mod parser;

pub use error::{DatasetError, Result};
pub use parser::{parse_items, parse_ratings};

use recommender::Observation;
use std::path::Path;
use tracing::info;

/// Load MovieLens 100K ratings as explicit observations keyed by
/// `(user_id: u32, item title: String)`.
pub fn load_ratings(data_dir: &Path) -> Result<Vec<Observation<u32, String>>> {
    let item_path = data_dir.join("u.item");
    let data_path = data_dir.join("u.data");

    // The two files are independent until the join below, so parse them in
    // parallel.
    let (items, ratings) = rayon::join(
        || parse_items(&item_path),
        || parse_ratings(&data_path),
    );
    let items = items?;
    let ratings = ratings?;

    let mut observations = Vec::with_capacity(ratings.len());
    for (user_id, item_id, rating) in ratings {
        let title = items
            .get(&item_id)
            .ok_or(DatasetError::UnknownItem { id: item_id })?;
        observations.push(Observation::rated(user_id, title.clone(), rating));
    }

    info!(
        "loaded {} ratings over {} items from {:?}",
        observations.len(),
        items.len(),
        data_dir
    );
    Ok(observations)
}
