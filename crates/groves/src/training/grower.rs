//! Least-squares regression tree grower.
//!
//! Grows one tree on `(row, target)` pairs from the training partition. Only
//! active attributes are considered; a split is accepted only if each child
//! keeps at least `min_count` rows (counting bag repetitions).

use crate::data::{DataSet, Dataset};
use crate::repr::{NodeId, RegressionTree};
use crate::utils::Parallelism;

/// Splits must reduce the squared error by more than this.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    attr: usize,
    threshold: f64,
    gain: f64,
}

/// Tree grower bound to a dataset and a fixed attribute set.
pub(crate) struct TreeGrower<'a> {
    data: &'a Dataset,
    attrs: Vec<usize>,
    parallelism: Parallelism,
}

impl<'a> TreeGrower<'a> {
    pub fn new(data: &'a Dataset, attrs: Vec<usize>, parallelism: Parallelism) -> Self {
        Self {
            data,
            attrs,
            parallelism,
        }
    }

    /// Minimum child size for `alpha` on a bag of `n` rows; never below 1.
    pub fn min_count(alpha: f64, n: usize) -> usize {
        ((alpha * n as f64).ceil() as usize).max(1)
    }

    /// Grow a tree fitting `targets[i]` at training row `rows[i]`.
    pub fn grow(&self, rows: &[usize], targets: &[f64], min_count: usize) -> RegressionTree {
        debug_assert_eq!(rows.len(), targets.len());
        let mut tree = RegressionTree::empty();
        let positions: Vec<usize> = (0..rows.len()).collect();
        self.build(&mut tree, rows, targets, positions, min_count);
        tree
    }

    fn build(
        &self,
        tree: &mut RegressionTree,
        rows: &[usize],
        targets: &[f64],
        positions: Vec<usize>,
        min_count: usize,
    ) -> NodeId {
        let n = positions.len();
        let mean = if n == 0 {
            0.0
        } else {
            positions.iter().map(|&p| targets[p]).sum::<f64>() / n as f64
        };
        if n < 2 * min_count {
            return tree.push_leaf(mean);
        }

        let Some(split) = self.best_split(rows, targets, &positions, min_count) else {
            return tree.push_leaf(mean);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = positions
            .into_iter()
            .partition(|&p| self.value(rows[p], split.attr) <= split.threshold);
        let left_share = left.len() as f64 / n as f64;

        let node = tree.push_split(split.attr, split.threshold, left_share);
        let left_id = self.build(tree, rows, targets, left, min_count);
        let right_id = self.build(tree, rows, targets, right, min_count);
        tree.set_children(node, left_id, right_id);
        node
    }

    /// Best split across attributes; ties keep the earliest attribute.
    fn best_split(
        &self,
        rows: &[usize],
        targets: &[f64],
        positions: &[usize],
        min_count: usize,
    ) -> Option<SplitCandidate> {
        let candidates = self.parallelism.maybe_par_map(self.attrs.clone(), |attr| {
            self.best_split_for_attr(attr, rows, targets, positions, min_count)
        });
        candidates
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, cand| match best {
                Some(b) if b.gain >= cand.gain => Some(b),
                _ => Some(cand),
            })
    }

    fn best_split_for_attr(
        &self,
        attr: usize,
        rows: &[usize],
        targets: &[f64],
        positions: &[usize],
        min_count: usize,
    ) -> Option<SplitCandidate> {
        let mut pairs: Vec<(f64, f64)> = positions
            .iter()
            .map(|&p| (self.value(rows[p], attr), targets[p]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let total: f64 = pairs.iter().map(|p| p.1).sum();
        let base = total * total / n as f64;

        let mut best: Option<SplitCandidate> = None;
        let mut left_sum = 0.0;
        for i in 0..n.saturating_sub(1) {
            left_sum += pairs[i].1;
            let n_left = i + 1;
            let n_right = n - n_left;
            if pairs[i].0 == pairs[i + 1].0 || n_left < min_count || n_right < min_count {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64 - base;
            if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    attr,
                    threshold: pairs[i].0,
                    gain,
                });
            }
        }
        best
    }

    #[inline]
    fn value(&self, row: usize, attr: usize) -> f64 {
        self.data.value(row, attr, DataSet::Train)
    }
}
