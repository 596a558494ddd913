//! Integration tests for the full fit/query lifecycle.
//!
//! Most tests run the real SGD engine on small datasets; behaviors that
//! depend on tied scores use a constant-factors stub engine so the tie is
//! exact rather than accidental.

use mf_engine::{
    EngineError, FactorMatrix, FactorModel, FactorizationEngine, FitConfig, SgdEngine,
    TripletMatrix,
};
use recommender::{Observation, RecommendError, Recommender};

/// Stub engine producing all-ones factors: every pair of entities ties on
/// both inner product and cosine similarity.
struct OnesEngine;

impl FactorizationEngine for OnesEngine {
    fn fit(
        &self,
        train: &TripletMatrix,
        _validation: Option<&TripletMatrix>,
        config: &FitConfig,
    ) -> Result<FactorModel, EngineError> {
        let k = config.factors;
        Ok(FactorModel {
            bias: 0.0,
            user_factors: FactorMatrix::from_vec(vec![1.0; train.n_rows() * k], k),
            item_factors: FactorMatrix::from_vec(vec![1.0; train.n_cols() * k], k),
        })
    }
}

/// Stub engine whose item rows grow with the item index, so raw scores
/// are distinct and can land outside the observed rating range.
struct IndexScaledEngine;

impl FactorizationEngine for IndexScaledEngine {
    fn fit(
        &self,
        train: &TripletMatrix,
        _validation: Option<&TripletMatrix>,
        _config: &FitConfig,
    ) -> Result<FactorModel, EngineError> {
        let items = (0..train.n_cols()).map(|i| (i + 6) as f32).collect();
        Ok(FactorModel {
            bias: 0.0,
            user_factors: FactorMatrix::from_vec(vec![1.0; train.n_rows()], 1),
            item_factors: FactorMatrix::from_vec(items, 1),
        })
    }
}

fn implicit_observations(pairs: &[(u32, &str)]) -> Vec<Observation<u32, String>> {
    pairs
        .iter()
        .map(|&(u, i)| Observation::implicit(u, i.to_string()))
        .collect()
}

fn explicit_observations(rows: &[(u32, &str, f32)]) -> Vec<Observation<u32, String>> {
    rows.iter()
        .map(|&(u, i, r)| Observation::rated(u, i.to_string(), r))
        .collect()
}

#[test]
fn test_user_recs_excludes_rated_items() {
    let observations = implicit_observations(&[
        (1, "A"),
        (1, "B"),
        (1, "C"),
        (1, "D"),
        (2, "C"),
        (2, "D"),
        (2, "E"),
        (2, "F"),
    ]);
    let mut recommender = Recommender::new(SgdEngine::new()).with_factors(4);
    recommender.fit(&observations, None).unwrap();

    // User 1 rated A-D, so of the six known items only E and F are
    // eligible, whatever the engine scored them.
    let mut recs: Vec<String> = recommender
        .user_recs(&1, Some(5), None)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    recs.sort();
    assert_eq!(recs, vec!["E", "F"]);

    let mut recs: Vec<String> = recommender
        .user_recs(&2, Some(5), None)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    recs.sort();
    assert_eq!(recs, vec!["A", "B"]);
}

#[test]
fn test_item_recs_stable_order_on_tied_scores() {
    let observations = implicit_observations(&[(1, "A"), (1, "B"), (2, "C")]);
    let mut recommender = Recommender::new(OnesEngine).with_factors(8);
    recommender.fit(&observations, None).unwrap();

    // Every item ties at similarity 1.0, so results follow first-seen item
    // order with A itself removed.
    let recs: Vec<String> = recommender
        .item_recs(&"A".to_string(), Some(5))
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(recs, vec!["B", "C"]);
}

#[test]
fn test_item_recs_unseen_item_is_empty() {
    let observations = implicit_observations(&[(1, "A"), (2, "B")]);
    let mut recommender = Recommender::new(SgdEngine::new());
    recommender.fit(&observations, None).unwrap();

    assert!(
        recommender
            .item_recs(&"missing".to_string(), Some(5))
            .unwrap()
            .is_empty()
    );
    assert!(recommender.similar_users(&99, Some(5)).unwrap().is_empty());
}

#[test]
fn test_ids_in_first_seen_order() {
    let observations = implicit_observations(&[(1, "A"), (1, "B"), (2, "B")]);
    let mut recommender = Recommender::new(SgdEngine::new());
    recommender.fit(&observations, None).unwrap();

    assert_eq!(recommender.user_ids(), &[1, 2]);
    assert_eq!(recommender.item_ids(), &["A", "B"]);
}

#[test]
fn test_factor_accessors() {
    let observations = implicit_observations(&[(1, "A"), (1, "B"), (2, "B")]);
    let mut recommender = Recommender::new(SgdEngine::new()).with_factors(20);
    recommender.fit(&observations, None).unwrap();

    assert_eq!(recommender.user_factors(&1).unwrap().unwrap().len(), 20);
    assert_eq!(
        recommender
            .item_factors(&"A".to_string())
            .unwrap()
            .unwrap()
            .len(),
        20
    );

    assert!(recommender.user_factors(&3).unwrap().is_none());
    assert!(recommender.item_factors(&"C".to_string()).unwrap().is_none());
}

#[test]
fn test_global_mean_explicit_and_implicit() {
    let explicit = explicit_observations(&[(1, "A", 5.0), (2, "A", 3.0)]);
    let mut recommender = Recommender::new(SgdEngine::new());
    recommender.fit(&explicit, None).unwrap();
    assert!((recommender.global_mean().unwrap() - 4.0).abs() < 1e-6);

    let implicit = implicit_observations(&[(1, "A"), (2, "A")]);
    recommender.fit(&implicit, None).unwrap();
    assert_eq!(recommender.global_mean().unwrap(), 0.0);
}

#[test]
fn test_predict_cold_start_returns_global_mean() {
    let observations = explicit_observations(&[(1, "A", 5.0), (2, "B", 1.0)]);
    let mut recommender = Recommender::new(SgdEngine::new());
    recommender.fit(&observations, None).unwrap();

    let mean = recommender.global_mean().unwrap();
    let queries = vec![
        Observation::implicit(999, "A".to_string()),
        Observation::implicit(1, "unknown".to_string()),
        Observation::implicit(999, "unknown".to_string()),
    ];
    let predictions = recommender.predict(&queries).unwrap();
    assert_eq!(predictions, vec![mean, mean, mean]);
}

#[test]
fn test_predict_consistent_with_user_recs_scores() {
    let observations = explicit_observations(&[
        (1, "A", 5.0),
        (1, "B", 3.0),
        (2, "A", 4.0),
        (2, "C", 2.0),
        (3, "B", 1.0),
    ]);
    let mut recommender = Recommender::new(SgdEngine::new()).with_factors(8);
    recommender.fit(&observations, None).unwrap();

    for obs in &observations {
        let user_id = obs.user_id.unwrap();
        let item_id = obs.item_id.clone().unwrap();

        let via_recs = recommender
            .user_recs(&user_id, Some(1), Some(std::slice::from_ref(&item_id)))
            .unwrap()[0]
            .score;
        let via_predict = recommender.predict(std::slice::from_ref(obs)).unwrap()[0];
        assert!(
            (via_recs - via_predict).abs() < 1e-5,
            "scores diverge: {} vs {}",
            via_recs,
            via_predict
        );
    }
}

#[test]
fn test_explicit_scores_clamped_to_observed_range() {
    let observations = explicit_observations(&[
        (1, "A", 2.0),
        (1, "B", 4.0),
        (2, "A", 3.0),
        (2, "C", 5.0),
        (3, "B", 2.0),
    ]);
    let mut recommender = Recommender::new(SgdEngine::new()).with_epochs(50);
    recommender.fit(&observations, None).unwrap();

    let predictions = recommender.predict(&observations).unwrap();
    for prediction in predictions {
        assert!((2.0..=5.0).contains(&prediction));
    }

    for user in [1u32, 2, 3] {
        for rec in recommender.user_recs(&user, None, None).unwrap() {
            assert!((2.0..=5.0).contains(&rec.score));
        }
    }
}

#[test]
fn test_user_recs_rank_on_raw_scores_before_clamping() {
    // A scores 6.0 raw and B scores 7.0 raw while the observed rating
    // range is [2, 5]. Ranking runs on the raw inner products, so B wins
    // even though both report a clamped score of 5.0.
    let observations = explicit_observations(&[(1, "A", 2.0), (1, "B", 5.0)]);
    let mut recommender = Recommender::new(IndexScaledEngine);
    recommender.fit(&observations, None).unwrap();

    let recs = recommender
        .user_recs(&1, Some(1), Some(&["A".to_string(), "B".to_string()][..]))
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].id, "B");
    assert_eq!(recs[0].score, 5.0);

    let both = recommender
        .user_recs(&1, None, Some(&["A".to_string(), "B".to_string()][..]))
        .unwrap();
    let ids: Vec<&str> = both.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A"]);
    assert!(both.iter().all(|r| r.score == 5.0));
}

#[test]
fn test_user_recs_respects_count() {
    let pairs: Vec<(u32, String)> = (0..20).map(|i| (1u32, format!("item-{i}"))).collect();
    let observations: Vec<Observation<u32, String>> = pairs
        .iter()
        .map(|(u, i)| Observation::implicit(*u, i.clone()))
        .chain(std::iter::once(Observation::implicit(
            2,
            "item-0".to_string(),
        )))
        .collect();

    let mut recommender = Recommender::new(SgdEngine::new());
    recommender.fit(&observations, None).unwrap();

    // User 2 rated one item; 19 remain eligible but only 3 were asked for
    assert_eq!(recommender.user_recs(&2, Some(3), None).unwrap().len(), 3);
    assert_eq!(recommender.user_recs(&2, None, None).unwrap().len(), 19);
}

#[test]
fn test_user_recs_unseen_user_is_empty() {
    let observations = explicit_observations(&[(1, "A", 5.0), (1, "B", 3.0)]);
    let mut recommender = Recommender::new(SgdEngine::new());
    recommender.fit(&observations, None).unwrap();

    assert!(recommender.user_recs(&1000, Some(5), None).unwrap().is_empty());
}

#[test]
fn test_user_recs_unknown_item_ids_are_dropped() {
    let observations = explicit_observations(&[(1, "A", 5.0), (1, "B", 3.0)]);
    let mut recommender = Recommender::new(SgdEngine::new());
    recommender.fit(&observations, None).unwrap();

    // No listed id exists: empty without error
    assert!(
        recommender
            .user_recs(&1, Some(5), Some(&["X".to_string(), "Y".to_string()][..]))
            .unwrap()
            .is_empty()
    );

    // Known ids survive the restriction, unknown ones vanish silently
    let recs = recommender
        .user_recs(&1, Some(5), Some(&["B".to_string(), "X".to_string()][..]))
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].id, "B");
}

#[test]
fn test_user_recs_item_ids_skip_rated_filtering() {
    // The restricted path deliberately returns items the user already
    // rated: the caller asked for scores on exactly those items.
    let observations = explicit_observations(&[(1, "A", 5.0), (1, "B", 3.0)]);
    let mut recommender = Recommender::new(SgdEngine::new());
    recommender.fit(&observations, None).unwrap();

    let recs = recommender
        .user_recs(&1, Some(5), Some(&["A".to_string()][..]))
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].id, "A");
}

#[test]
fn test_refit_replaces_all_state() {
    let mut recommender = Recommender::new(SgdEngine::new());

    let first = implicit_observations(&[(1, "A"), (2, "B")]);
    recommender.fit(&first, None).unwrap();
    assert_eq!(recommender.user_ids(), &[1, 2]);

    let second = implicit_observations(&[(7, "X"), (8, "Y"), (9, "Z")]);
    recommender.fit(&second, None).unwrap();

    assert_eq!(recommender.user_ids(), &[7, 8, 9]);
    assert_eq!(recommender.item_ids(), &["X", "Y", "Z"]);
    assert!(recommender.user_recs(&1, Some(5), None).unwrap().is_empty());
    assert!(
        recommender
            .item_recs(&"A".to_string(), Some(5))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_fit_with_validation_set_tolerates_unseen_entities() {
    let train = explicit_observations(&[(1, "A", 5.0), (2, "B", 3.0)]);
    // Validation references a user and an item the training set never saw
    let validation = explicit_observations(&[(1, "A", 4.0), (99, "Z", 2.0)]);

    let mut recommender = Recommender::new(SgdEngine::new()).with_verbose(false);
    recommender.fit(&train, Some(&validation)).unwrap();
    assert_eq!(recommender.user_ids(), &[1, 2]);
}

#[test]
fn test_explicit_validation_set_requires_ratings() {
    let train = explicit_observations(&[(1, "A", 5.0)]);
    let validation = vec![Observation::implicit(1, "A".to_string())];

    let mut recommender = Recommender::new(SgdEngine::new());
    assert!(matches!(
        recommender.fit(&train, Some(&validation)),
        Err(RecommendError::MissingRating)
    ));
}

#[test]
fn test_predict_rmse_on_training_data_is_reasonable() {
    // Dense 4x4 explicit matrix: after enough epochs the factors should
    // reconstruct training ratings well.
    let mut rows = Vec::new();
    let ratings = [
        [5.0, 4.0, 1.0, 2.0],
        [4.0, 5.0, 2.0, 1.0],
        [1.0, 2.0, 5.0, 4.0],
        [2.0, 1.0, 4.0, 5.0],
    ];
    for (u, row) in ratings.iter().enumerate() {
        for (i, &value) in row.iter().enumerate() {
            rows.push((u as u32, ["A", "B", "C", "D"][i], value));
        }
    }
    let observations = explicit_observations(&rows);

    let mut recommender = Recommender::new(SgdEngine::new())
        .with_factors(4)
        .with_epochs(200);
    recommender.fit(&observations, None).unwrap();

    let predictions = recommender.predict(&observations).unwrap();
    let actual: Vec<f32> = observations.iter().map(|o| o.rating.unwrap()).collect();
    let error = recommender::metrics::rmse(&predictions, &actual).unwrap();
    assert!(error < 1.0, "training rmse too high: {}", error);
}
