use ndarray::Array2;
use rand::prelude::*;

use crate::data::Dataset;

/// Attributes that carry signal in the synthetic datasets; the rest are noise.
pub const SIGNAL_ATTRS: [usize; 2] = [0, 1];

/// Uniform `[0, 1)` features in feature-major layout.
fn uniform_features(rng: &mut StdRng, n_attrs: usize, rows: usize) -> Array2<f64> {
    Array2::from_shape_simple_fn((n_attrs, rows), || rng.r#gen::<f64>())
}

fn attr_names(n_attrs: usize) -> Vec<String> {
    (0..n_attrs).map(|a| format!("x{a}")).collect()
}

/// Regression data with 5 attributes: `y = 2 x0 + 3 x1^2 + noise`.
///
/// `x2..x4` are pure noise.
pub fn additive_regression(train_n: usize, valid_n: usize, seed: u64) -> Dataset {
    const N_ATTRS: usize = 5;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut make = |rows: usize| {
        let features = uniform_features(&mut rng, N_ATTRS, rows);
        let targets: Vec<f64> = (0..rows)
            .map(|r| {
                let x0 = features[[0, r]];
                let x1 = features[[1, r]];
                2.0 * x0 + 3.0 * x1 * x1 + (rng.r#gen::<f64>() - 0.5) * 0.1
            })
            .collect();
        (features, targets)
    };
    let (train, train_targets) = make(train_n);
    let (valid, valid_targets) = make(valid_n);

    Dataset::new(train, train_targets, valid, valid_targets, attr_names(N_ATTRS), seed)
        .unwrap_or_else(|err| panic!("synthetic dataset is valid: {err}"))
}

/// Binary classification data with 4 attributes: `y = [x0 + x1 > 1]`
/// with 5% of labels flipped.
pub fn binary_classification(train_n: usize, valid_n: usize, seed: u64) -> Dataset {
    const N_ATTRS: usize = 4;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut make = |rows: usize| {
        let features = uniform_features(&mut rng, N_ATTRS, rows);
        let targets: Vec<f64> = (0..rows)
            .map(|r| {
                let positive = features[[0, r]] + features[[1, r]] > 1.0;
                let flip = rng.r#gen::<f64>() < 0.05;
                if positive != flip {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        (features, targets)
    };
    let (train, train_targets) = make(train_n);
    let (valid, valid_targets) = make(valid_n);

    Dataset::new(train, train_targets, valid, valid_targets, attr_names(N_ATTRS), seed)
        .unwrap_or_else(|err| panic!("synthetic dataset is valid: {err}"))
}
