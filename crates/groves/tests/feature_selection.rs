//! Feature elimination end to end with real groves.

use std::collections::HashSet;

use groves::testing::{additive_regression, binary_classification, SIGNAL_ATTRS};
use groves::{FeatureEliminator, Grove, ModelReader, PerfMetric, SelectionParams, TrainConfig, Verbosity};

fn config(metric: PerfMetric) -> TrainConfig {
    TrainConfig::builder()
        .train_path("train.dta")
        .valid_path("valid.dta")
        .attr_path("data.attr")
        .min_alpha(0.1)
        .max_tig(2)
        .bag_n(3)
        .metric(metric)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap()
}

fn params() -> SelectionParams {
    SelectionParams {
        repeat_n: 4,
        ..SelectionParams::default()
    }
}

#[test]
fn signal_attributes_survive_elimination() {
    let mut data = additive_regression(200, 80, 11);
    let initial: HashSet<usize> = data.active_attrs().into_iter().collect();
    let config = config(PerfMetric::Rmse);

    let result = FeatureEliminator::new(&config, params()).run::<Grove>(&mut data).unwrap();

    for attr in SIGNAL_ATTRS {
        assert!(result.attrs.contains(&attr), "signal attribute {attr} was removed");
    }
    assert!(result.attrs.iter().all(|a| initial.contains(a)));
    assert_eq!(result.attrs, data.active_attrs());
    assert_eq!(result.importance.len(), result.attrs.len());

    let eliminated: HashSet<usize> = result.eliminated.iter().copied().collect();
    assert_eq!(eliminated.len(), result.eliminated.len(), "an attribute was removed twice");
    assert!(result.eliminated.iter().all(|a| !result.attrs.contains(a)));
    assert_eq!(result.attrs.len() + result.eliminated.len(), initial.len());
}

#[test]
fn roc_mode_keeps_signal_attributes() {
    let mut data = binary_classification(200, 80, 5);
    let config = config(PerfMetric::Roc);
    let result = FeatureEliminator::new(&config, params()).run::<Grove>(&mut data).unwrap();
    for attr in SIGNAL_ATTRS {
        assert!(result.attrs.contains(&attr));
    }
    assert!(result.distribution.mean > 0.5);
}

#[test]
fn baseline_model_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.bin");
    let config = TrainConfig::builder()
        .train_path("train.dta")
        .valid_path("valid.dta")
        .attr_path("data.attr")
        .model_path(model_path.clone())
        .min_alpha(0.1)
        .max_tig(2)
        .bag_n(3)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap();
    let mut data = additive_regression(150, 50, 2);
    FeatureEliminator::new(&config, params()).run::<Grove>(&mut data).unwrap();

    let mut reader = ModelReader::open(&model_path).unwrap();
    assert_eq!(reader.header().max_tig, 2);
    let members = reader.for_each_member::<Grove, _>(|grove| assert!(grove.n_trees() <= 2)).unwrap();
    assert_eq!(members, 3);
}
