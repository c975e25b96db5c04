//! Dataset container.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

use crate::utils::sort_f64;

/// Partition a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSet {
    Train,
    Valid,
    /// Synthetic rows added for effect analysis.
    Test,
}

/// Errors raised while building or querying a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("{what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("missing value in {set:?} set at row {row}, attribute {attr}")]
    MissingValue { set: DataSet, row: usize, attr: usize },
    #[error("missing target in {set:?} set at row {row}")]
    MissingTarget { set: DataSet, row: usize },
    #[error("train set is empty")]
    EmptyTrain,
    #[error("attribute id {0} is out of range")]
    UnknownAttr(usize),
}

/// One quantile center with the number of training values it represents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantile {
    pub count: usize,
    pub value: f64,
}

/// Train/validation/test data with attribute activation and bagging state.
///
/// Feature matrices are feature-major: `[n_attrs, n_rows]`.
///
/// # Example
///
/// ```
/// use groves::data::{DataSet, Dataset};
/// use ndarray::array;
///
/// let train = array![[1.0, 2.0, 3.0], [0.5, 0.5, 1.5]];
/// let valid = array![[2.5], [1.0]];
/// let mut ds = Dataset::new(
///     train,
///     vec![1.0, 2.0, 3.0],
///     valid,
///     vec![2.5],
///     vec!["x".into(), "y".into()],
///     7,
/// )
/// .unwrap();
///
/// ds.ignore_attr(1);
/// assert_eq!(ds.active_attrs(), vec![0]);
/// assert_eq!(ds.targets(DataSet::Valid), &[2.5]);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    train: Array2<f64>,
    valid: Array2<f64>,
    test: Array2<f64>,

    train_targets: Vec<f64>,
    valid_targets: Vec<f64>,
    test_targets: Vec<f64>,

    attr_names: Vec<String>,
    active: Vec<bool>,

    bag: Vec<usize>,
    out_of_bag: Vec<usize>,
    rng: Xoshiro256PlusPlus,
}

impl Dataset {
    /// Create a dataset from feature-major train and validation matrices.
    ///
    /// All attributes start active. The initial bag is the full training set
    /// with an empty out-of-bag set; call [`Dataset::new_bag`] to resample.
    ///
    /// # Errors
    ///
    /// Fails on shape mismatches, an empty training set, or NaN features/targets.
    pub fn new(
        train: Array2<f64>,
        train_targets: Vec<f64>,
        valid: Array2<f64>,
        valid_targets: Vec<f64>,
        attr_names: Vec<String>,
        seed: u64,
    ) -> Result<Self, DatasetError> {
        let n_attrs = attr_names.len();
        check_partition(DataSet::Train, train.view(), &train_targets, n_attrs)?;
        check_partition(DataSet::Valid, valid.view(), &valid_targets, n_attrs)?;
        if train.ncols() == 0 {
            return Err(DatasetError::EmptyTrain);
        }

        let train_n = train.ncols();
        Ok(Self {
            train,
            valid,
            test: Array2::zeros((n_attrs, 0)),
            train_targets,
            valid_targets,
            test_targets: Vec::new(),
            active: vec![true; n_attrs],
            attr_names,
            bag: (0..train_n).collect(),
            out_of_bag: Vec::new(),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn n_attrs(&self) -> usize {
        self.attr_names.len()
    }

    /// Number of rows in a partition.
    #[inline]
    pub fn n_rows(&self, set: DataSet) -> usize {
        self.features(set).ncols()
    }

    #[inline]
    pub fn train_n(&self) -> usize {
        self.train.ncols()
    }

    /// Feature-major view of a partition: `[n_attrs, n_rows]`.
    pub fn features(&self, set: DataSet) -> ArrayView2<'_, f64> {
        match set {
            DataSet::Train => self.train.view(),
            DataSet::Valid => self.valid.view(),
            DataSet::Test => self.test.view(),
        }
    }

    /// Target values of a partition. Synthetic test rows carry NaN targets.
    pub fn targets(&self, set: DataSet) -> &[f64] {
        match set {
            DataSet::Train => &self.train_targets,
            DataSet::Valid => &self.valid_targets,
            DataSet::Test => &self.test_targets,
        }
    }

    #[inline]
    pub fn value(&self, row: usize, attr: usize, set: DataSet) -> f64 {
        self.features(set)[[attr, row]]
    }

    /// Values of one attribute across a partition.
    pub fn attr_values(&self, attr: usize, set: DataSet) -> ArrayView1<'_, f64> {
        self.features(set).index_axis_move(Axis(0), attr)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn attr_name(&self, attr: usize) -> &str {
        &self.attr_names[attr]
    }

    /// Look up an attribute id by name.
    pub fn attr_id(&self, name: &str) -> Option<usize> {
        self.attr_names.iter().position(|n| n == name)
    }

    #[inline]
    pub fn is_active(&self, attr: usize) -> bool {
        self.active.get(attr).copied().unwrap_or(false)
    }

    /// Active attribute ids in insertion order.
    pub fn active_attrs(&self) -> Vec<usize> {
        (0..self.n_attrs()).filter(|&a| self.active[a]).collect()
    }

    pub fn ignore_attr(&mut self, attr: usize) {
        self.active[attr] = false;
    }

    pub fn use_attr(&mut self, attr: usize) {
        self.active[attr] = true;
    }

    /// Fail with [`DatasetError::UnknownAttr`] for ids past the last attribute.
    pub fn check_attr(&self, attr: usize) -> Result<(), DatasetError> {
        if attr < self.n_attrs() {
            Ok(())
        } else {
            Err(DatasetError::UnknownAttr(attr))
        }
    }

    // =========================================================================
    // Bagging
    // =========================================================================

    /// Draw a new bootstrap bag of `train_n` rows with replacement.
    ///
    /// The bag is kept sorted; rows never drawn form the out-of-bag set.
    pub fn new_bag(&mut self) {
        let n = self.train_n();
        let mut drawn = vec![false; n];
        self.bag.clear();
        for _ in 0..n {
            let row = self.rng.gen_range(0..n);
            drawn[row] = true;
            self.bag.push(row);
        }
        self.bag.sort_unstable();
        self.out_of_bag = (0..n).filter(|&r| !drawn[r]).collect();
    }

    /// Training rows of the current bag (with repetitions).
    pub fn bag(&self) -> &[usize] {
        &self.bag
    }

    /// Training rows not drawn into the current bag.
    pub fn out_of_bag(&self) -> &[usize] {
        &self.out_of_bag
    }

    // =========================================================================
    // Quantiles and values
    // =========================================================================

    /// Quantile centers of an attribute over the training set.
    ///
    /// With at most `n` distinct values every distinct value is returned with its
    /// count. Otherwise the sorted values are cut into `n` equal groups whose
    /// medians become the centers; groups with equal centers are merged.
    pub fn quantiles(&self, attr: usize, n: usize) -> Vec<Quantile> {
        let mut values = self.attr_values(attr, DataSet::Train).to_vec();
        sort_f64(&mut values);
        let n = n.max(1);

        let distinct = distinct_counts(&values);
        if distinct.len() <= n {
            return distinct;
        }

        let total = values.len();
        let mut out: Vec<Quantile> = Vec::with_capacity(n);
        for group in 0..n {
            let start = group * total / n;
            let end = (group + 1) * total / n;
            if end <= start {
                continue;
            }
            let center = values[start + (end - start - 1) / 2];
            match out.last_mut() {
                Some(last) if last.value == center => last.count += end - start,
                _ => out.push(Quantile {
                    count: end - start,
                    value: center,
                }),
            }
        }
        out
    }

    /// Sorted values of an attribute over the train and validation sets.
    pub fn values(&self, attr: usize) -> Vec<f64> {
        let mut values: Vec<f64> = self
            .attr_values(attr, DataSet::Train)
            .iter()
            .chain(self.attr_values(attr, DataSet::Valid).iter())
            .copied()
            .collect();
        sort_f64(&mut values);
        values
    }

    /// `(attr1, attr2)` value pairs of every train and validation row.
    pub fn pair_values(&self, attr1: usize, attr2: usize) -> Vec<(f64, f64)> {
        [DataSet::Train, DataSet::Valid]
            .into_iter()
            .flat_map(|set| {
                let a = self.attr_values(attr1, set);
                let b = self.attr_values(attr2, set);
                a.into_iter().zip(b).map(|(x, y)| (*x, *y)).collect::<Vec<_>>()
            })
            .collect()
    }

    // =========================================================================
    // Synthetic rows
    // =========================================================================

    /// Append a synthetic row to the test partition and return its row id.
    ///
    /// The row starts with every attribute missing; `overrides` set
    /// `(attr, value)` pairs.
    pub fn add_test_item(&mut self, overrides: &[(usize, f64)]) -> Result<usize, DatasetError> {
        let mut row = Array1::from_elem(self.n_attrs(), f64::NAN);
        for &(attr, value) in overrides {
            self.check_attr(attr)?;
            row[attr] = value;
        }
        self.test
            .push_column(row.view())
            .map_err(|_| DatasetError::ShapeMismatch {
                what: "test row length",
                expected: self.n_attrs(),
                got: row.len(),
            })?;
        self.test_targets.push(f64::NAN);
        Ok(self.test_targets.len() - 1)
    }

    /// Drop every synthetic row.
    pub fn clear_test(&mut self) {
        self.test = Array2::zeros((self.n_attrs(), 0));
        self.test_targets.clear();
    }
}

fn check_partition(
    set: DataSet,
    features: ArrayView2<'_, f64>,
    targets: &[f64],
    n_attrs: usize,
) -> Result<(), DatasetError> {
    if features.nrows() != n_attrs {
        return Err(DatasetError::ShapeMismatch {
            what: "attribute count",
            expected: n_attrs,
            got: features.nrows(),
        });
    }
    if features.ncols() != targets.len() {
        return Err(DatasetError::ShapeMismatch {
            what: "target count",
            expected: features.ncols(),
            got: targets.len(),
        });
    }
    if let Some(row) = targets.iter().position(|t| t.is_nan()) {
        return Err(DatasetError::MissingTarget { set, row });
    }
    for ((attr, row), value) in features.indexed_iter() {
        if value.is_nan() {
            return Err(DatasetError::MissingValue { set, row, attr });
        }
    }
    Ok(())
}

/// Run-length encode sorted values.
fn distinct_counts(sorted: &[f64]) -> Vec<Quantile> {
    let mut out: Vec<Quantile> = Vec::new();
    for &value in sorted {
        match out.last_mut() {
            Some(last) if last.value == value => last.count += 1,
            _ => out.push(Quantile { count: 1, value }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small() -> Dataset {
        let train = array![
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            [0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        ];
        let valid = array![[7.0, 8.0], [0.0, 1.0]];
        Dataset::new(
            train,
            vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
            valid,
            vec![1.0, 0.0],
            vec!["a".into(), "b".into()],
            42,
        )
        .unwrap()
    }

    #[test]
    fn test_shape_validation() {
        let result = Dataset::new(
            array![[1.0, 2.0]],
            vec![1.0],
            array![[1.0]],
            vec![1.0],
            vec!["a".into()],
            0,
        );
        assert!(matches!(result, Err(DatasetError::ShapeMismatch { .. })));

        let result = Dataset::new(
            array![[1.0, f64::NAN]],
            vec![1.0, 2.0],
            array![[1.0]],
            vec![1.0],
            vec!["a".into()],
            0,
        );
        assert_eq!(
            result.unwrap_err(),
            DatasetError::MissingValue {
                set: DataSet::Train,
                row: 1,
                attr: 0
            }
        );
    }

    #[test]
    fn test_empty_train_rejected() {
        let result = Dataset::new(
            Array2::zeros((1, 0)),
            vec![],
            array![[1.0]],
            vec![1.0],
            vec!["a".into()],
            0,
        );
        assert_eq!(result.unwrap_err(), DatasetError::EmptyTrain);
    }

    #[test]
    fn test_attribute_toggling() {
        let mut ds = small();
        assert_eq!(ds.active_attrs(), vec![0, 1]);
        ds.ignore_attr(0);
        assert!(!ds.is_active(0));
        assert_eq!(ds.active_attrs(), vec![1]);
        ds.use_attr(0);
        assert_eq!(ds.active_attrs(), vec![0, 1]);
        assert!(!ds.is_active(5));
        assert_eq!(ds.attr_id("b"), Some(1));
        assert_eq!(ds.attr_id("c"), None);
    }

    #[test]
    fn test_new_bag_partitions_rows() {
        let mut ds = small();
        ds.new_bag();
        assert_eq!(ds.bag().len(), ds.train_n());
        for row in ds.out_of_bag() {
            assert!(!ds.bag().contains(row));
        }
        for row in 0..ds.train_n() {
            assert!(ds.bag().contains(&row) || ds.out_of_bag().contains(&row));
        }
    }

    #[test]
    fn test_new_bag_is_seeded() {
        let mut a = small();
        let mut b = small();
        for _ in 0..3 {
            a.new_bag();
            b.new_bag();
            assert_eq!(a.bag(), b.bag());
        }
    }

    #[test]
    fn test_quantiles_distinct_values() {
        let ds = small();
        let q = ds.quantiles(1, 5);
        assert_eq!(
            q,
            vec![
                Quantile { count: 2, value: 0.0 },
                Quantile { count: 4, value: 1.0 }
            ]
        );
    }

    #[test]
    fn test_quantiles_grouped() {
        let ds = small();
        // groups [1, 2], [3, 4], [5, 6] with lower medians
        let q = ds.quantiles(0, 3);
        let values: Vec<f64> = q.iter().map(|q| q.value).collect();
        assert_eq!(values, vec![1.0, 3.0, 5.0]);
        assert_eq!(q.iter().map(|q| q.count).sum::<usize>(), 6);
    }

    #[test]
    fn test_quantiles_merge_equal_centers() {
        let train = array![[1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0]];
        let ds = Dataset::new(
            train,
            vec![0.0; 8],
            array![[1.0]],
            vec![0.0],
            vec!["a".into()],
            0,
        )
        .unwrap();
        let q = ds.quantiles(0, 3);
        // groups [1, 1], [1, 1, 1], [2, 3, 4] -> centers 1, 1, 3
        assert_eq!(
            q,
            vec![
                Quantile { count: 5, value: 1.0 },
                Quantile { count: 3, value: 3.0 }
            ]
        );
    }

    #[test]
    fn test_values_and_pairs() {
        let ds = small();
        assert_eq!(ds.values(0), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let pairs = ds.pair_values(0, 1);
        assert_eq!(pairs.len(), 8);
        assert_eq!(pairs[7], (8.0, 1.0));
    }

    #[test]
    fn test_add_test_item() {
        let mut ds = small();
        let row = ds.add_test_item(&[(1, 0.5)]).unwrap();
        assert_eq!(row, 0);
        assert!(ds.value(row, 0, DataSet::Test).is_nan());
        assert_eq!(ds.value(row, 1, DataSet::Test), 0.5);
        let row = ds.add_test_item(&[]).unwrap();
        assert_eq!(row, 1);
        assert_eq!(ds.n_rows(DataSet::Test), 2);

        assert_eq!(ds.add_test_item(&[(9, 1.0)]), Err(DatasetError::UnknownAttr(9)));

        ds.clear_test();
        assert_eq!(ds.n_rows(DataSet::Test), 0);
    }
}
