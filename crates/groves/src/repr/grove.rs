//! Additive grove: a sum of regression trees.

use serde::{Deserialize, Serialize};

use crate::data::{DataSet, Dataset};

use super::tree::RegressionTree;

/// Additive model whose prediction is the sum of its trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grove {
    trees: Vec<RegressionTree>,
}

impl Grove {
    pub fn new(trees: Vec<RegressionTree>) -> Self {
        Self { trees }
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Prediction for one row of a dataset partition.
    pub fn predict_row(&self, data: &Dataset, row: usize, set: DataSet) -> f64 {
        self.trees.iter().map(|t| t.predict_row(data, row, set)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn prediction_is_sum_of_trees() {
        let data = Dataset::new(
            array![[1.0]],
            vec![0.0],
            array![[1.0]],
            vec![0.0],
            vec!["x".into()],
            0,
        )
        .unwrap();
        let grove = Grove::new(vec![RegressionTree::constant(1.5), RegressionTree::constant(-0.5)]);
        assert_eq!(grove.n_trees(), 2);
        assert_eq!(grove.predict_row(&data, 0, DataSet::Train), 1.0);
        assert_eq!(Grove::default().predict_row(&data, 0, DataSet::Valid), 0.0);
    }
}
