//! Regression tree storage (SoA) and traversal.
//!
//! Trees are built by the grower in [`crate::training`] and are immutable
//! afterwards. Node `0` is the root.

use serde::{Deserialize, Serialize};

use crate::data::{DataSet, Dataset};

use super::NodeId;

/// Binary regression tree stored as parallel node arrays.
///
/// A numeric split sends `value <= threshold` left. A missing (NaN) value
/// descends both children and blends their predictions by `left_share`, the
/// fraction of training rows that went left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    split_attrs: Vec<u32>,
    thresholds: Vec<f64>,
    left_children: Vec<NodeId>,
    right_children: Vec<NodeId>,
    left_shares: Vec<f64>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f64>,
}

impl RegressionTree {
    /// A single-leaf tree predicting `value` everywhere.
    pub fn constant(value: f64) -> Self {
        let mut tree = Self::empty();
        tree.push_leaf(value);
        tree
    }

    pub(crate) fn empty() -> Self {
        Self {
            split_attrs: Vec::new(),
            thresholds: Vec::new(),
            left_children: Vec::new(),
            right_children: Vec::new(),
            left_shares: Vec::new(),
            is_leaf: Vec::new(),
            leaf_values: Vec::new(),
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Append a leaf and return its id.
    pub(crate) fn push_leaf(&mut self, value: f64) -> NodeId {
        self.push_node(true, 0, f64::NAN, 0.0, value)
    }

    /// Append a split node whose children are attached later with [`Self::set_children`].
    pub(crate) fn push_split(&mut self, attr: usize, threshold: f64, left_share: f64) -> NodeId {
        self.push_node(false, attr as u32, threshold, left_share, 0.0)
    }

    pub(crate) fn set_children(&mut self, node: NodeId, left: NodeId, right: NodeId) {
        self.left_children[node as usize] = left;
        self.right_children[node as usize] = right;
    }

    fn push_node(&mut self, leaf: bool, attr: u32, threshold: f64, left_share: f64, value: f64) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.is_leaf.push(leaf);
        self.split_attrs.push(attr);
        self.thresholds.push(threshold);
        self.left_shares.push(left_share);
        self.leaf_values.push(value);
        self.left_children.push(0);
        self.right_children.push(0);
        id
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&leaf| leaf).count()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    /// Attributes used by any split.
    pub fn split_attrs(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_nodes())
            .filter(|&node| !self.is_leaf[node])
            .map(|node| self.split_attrs[node] as usize)
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Predict from an attribute lookup.
    pub fn predict<F: Fn(usize) -> f64>(&self, value_of: &F) -> f64 {
        self.predict_from(0, value_of)
    }

    /// Predict one row of a dataset partition.
    #[inline]
    pub fn predict_row(&self, data: &Dataset, row: usize, set: DataSet) -> f64 {
        self.predict(&|attr| data.value(row, attr, set))
    }

    fn predict_from<F: Fn(usize) -> f64>(&self, start: NodeId, value_of: &F) -> f64 {
        let mut node = start as usize;
        while !self.is_leaf[node] {
            let value = value_of(self.split_attrs[node] as usize);
            if value.is_nan() {
                let share = self.left_shares[node];
                return share * self.predict_from(self.left_children[node], value_of)
                    + (1.0 - share) * self.predict_from(self.right_children[node], value_of);
            }
            node = if value <= self.thresholds[node] {
                self.left_children[node] as usize
            } else {
                self.right_children[node] as usize
            };
        }
        self.leaf_values[node]
    }
}
