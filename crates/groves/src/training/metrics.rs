//! Performance metrics for bagged ensembles.
//!
//! Two metrics are supported, selected by [`PerfMetric`]:
//!
//! - [`PerfMetric::Rmse`]: root mean squared error, lower is better
//! - [`PerfMetric::Roc`]: probabilistic area under the ROC curve, higher is better

use std::cmp::Ordering;

/// Metric used to score an ensemble on the validation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerfMetric {
    /// Root Mean Squared Error.
    #[default]
    Rmse,
    /// Area under the ROC curve; targets may be any value in `[0, 1]`.
    Roc,
}

impl PerfMetric {
    /// Compute the metric for `predictions` against `targets`.
    pub fn compute(self, predictions: &[f64], targets: &[f64]) -> f64 {
        match self {
            Self::Rmse => rmse(predictions, targets),
            Self::Roc => roc(predictions, targets),
        }
    }

    /// Whether higher values indicate better performance.
    pub fn higher_is_better(self) -> bool {
        matches!(self, Self::Roc)
    }

    /// The best value the metric can reach.
    pub fn optimum(self) -> f64 {
        match self {
            Self::Rmse => 0.0,
            Self::Roc => 1.0,
        }
    }

    /// Returns true if `value` is strictly better than `other`.
    pub fn is_better(self, value: f64, other: f64) -> bool {
        if self.higher_is_better() {
            value > other
        } else {
            value < other
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rmse => "rmse",
            Self::Roc => "roc",
        }
    }
}

impl std::fmt::Display for PerfMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Root mean squared error. Returns 0 for empty input.
pub fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    debug_assert_eq!(predictions.len(), targets.len());
    let n = predictions.len();
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t) * (p - t))
        .sum();
    (sum_sq / n as f64).sqrt()
}

/// Probabilistic ROC area.
///
/// Each target `t` in `[0, 1]` counts as weight `t` of a positive and `1 - t`
/// of a negative example; pairs of an example with itself are excluded. For
/// 0/1 targets this is the standard rank-based AUC with ties scored as one half.
///
/// Returns 0.5 when there are no positive/negative pairs.
pub fn roc(predictions: &[f64], targets: &[f64]) -> f64 {
    debug_assert_eq!(predictions.len(), targets.len());
    let n = predictions.len();

    let total_pos: f64 = targets.iter().sum();
    let total_neg: f64 = targets.iter().map(|t| 1.0 - t).sum();
    let self_pairs: f64 = targets.iter().map(|t| t * (1.0 - t)).sum();
    let pairs = total_pos * total_neg - self_pairs;
    if pairs <= 0.0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        predictions[a]
            .partial_cmp(&predictions[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut neg_below = 0.0;
    let mut area = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && predictions[order[j]] == predictions[order[i]] {
            j += 1;
        }

        let (mut pos, mut neg, mut own) = (0.0, 0.0, 0.0);
        for &idx in &order[i..j] {
            let t = targets[idx];
            pos += t;
            neg += 1.0 - t;
            own += t * (1.0 - t);
        }
        // ties count one half
        area += pos * neg_below + 0.5 * (pos * neg - own);
        neg_below += neg;

        i = j;
    }

    area / pairs
}
