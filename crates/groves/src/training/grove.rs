//! Grove training by backfitting.
//!
//! A grove is trained on the dataset's current bag. Every tree is repeatedly
//! refit to the residual of all the others until the bag RMSE stops moving.
//! The (alpha, TiG) grid is walked from the simplest cell (coarsest alpha,
//! one tree) to the requested one; [`TrainMode`] picks the path.

use std::io::{Read, Write};

use crate::config::TrainMode;
use crate::data::{DataSet, Dataset};
use crate::grid::{alpha_count, grid_alpha, tig_count, tig_value};
use crate::io::{read_block, write_block, ModelError};
use crate::repr::{Grove, RegressionTree};
use crate::utils::Parallelism;

use super::grower::TreeGrower;
use super::member::{EnsembleMember, MemberParams};
use super::metrics::rmse;

/// Backfitting stops once the relative RMSE change falls below this.
const CONVERGENCE: f64 = 0.001;

/// Upper bound on backfitting rounds per stage.
const MAX_ROUNDS: usize = 20;

// =============================================================================
// Grove state
// =============================================================================

/// Trees of a grove in training with their fitted values on the bag.
#[derive(Debug, Clone)]
struct GroveState {
    trees: Vec<RegressionTree>,
    /// `fits[t][i]`: prediction of tree `t` at bag position `i`.
    fits: Vec<Vec<f64>>,
    /// Sum of `fits` over trees.
    total: Vec<f64>,
}

impl GroveState {
    fn new(n: usize) -> Self {
        Self {
            trees: Vec::new(),
            fits: Vec::new(),
            total: vec![0.0; n],
        }
    }

    fn into_grove(self) -> Grove {
        Grove::new(self.trees)
    }
}

// =============================================================================
// GroveTrainer
// =============================================================================

/// Trains one [`Grove`] on the current bag of a dataset.
pub struct GroveTrainer<'a> {
    data: &'a Dataset,
    params: MemberParams,
    grower: TreeGrower<'a>,
    rows: Vec<usize>,
    targets: Vec<f64>,
    oob: Vec<usize>,
}

impl<'a> GroveTrainer<'a> {
    pub fn new(data: &'a Dataset, params: &MemberParams, parallelism: Parallelism) -> Self {
        let rows = data.bag().to_vec();
        let train_targets = data.targets(DataSet::Train);
        let targets = rows.iter().map(|&r| train_targets[r]).collect();
        Self {
            data,
            params: *params,
            grower: TreeGrower::new(data, data.active_attrs(), parallelism),
            rows,
            targets,
            oob: data.out_of_bag().to_vec(),
        }
    }

    /// Alpha values visited on the way to `params.alpha`, coarsest first.
    fn alpha_schedule(&self) -> Vec<f64> {
        let n = alpha_count(self.params.alpha, self.rows.len());
        (0..n).map(|i| grid_alpha(i, n, self.params.alpha)).collect()
    }

    /// TiG values visited on the way to `params.max_tig`.
    fn tig_schedule(&self) -> Vec<usize> {
        (0..tig_count(self.params.max_tig.max(1))).map(tig_value).collect()
    }

    pub fn train(&self) -> Grove {
        match self.params.mode {
            TrainMode::Layered => self.train_layered(MAX_ROUNDS),
            TrainMode::Fast => self.train_layered(1),
            TrainMode::Slow => self.train_slow(),
        }
        .into_grove()
    }

    fn train_layered(&self, rounds: usize) -> GroveState {
        let alphas = self.alpha_schedule();
        let mut state = GroveState::new(self.rows.len());

        for tig in self.tig_schedule() {
            self.add_trees(&mut state, tig, alphas[0]);
            self.backfit(&mut state, alphas[0], rounds);
        }
        for &alpha in &alphas[1..] {
            self.backfit(&mut state, alpha, rounds);
        }
        state
    }

    /// Every cell starts from the better of "one more tree step" and "one finer alpha step".
    fn train_slow(&self) -> GroveState {
        let alphas = self.alpha_schedule();
        let mut prev: Vec<GroveState> = Vec::new();

        for (t, tig) in self.tig_schedule().into_iter().enumerate() {
            let mut row: Vec<GroveState> = Vec::with_capacity(alphas.len());
            for (a, &alpha) in alphas.iter().enumerate() {
                let mut candidates = Vec::with_capacity(2);
                if t > 0 {
                    let mut grown = prev[a].clone();
                    self.add_trees(&mut grown, tig, alpha);
                    self.backfit(&mut grown, alpha, MAX_ROUNDS);
                    candidates.push(grown);
                }
                if a > 0 {
                    let mut refined = row[a - 1].clone();
                    self.backfit(&mut refined, alpha, MAX_ROUNDS);
                    candidates.push(refined);
                }
                if candidates.is_empty() {
                    let mut first = GroveState::new(self.rows.len());
                    self.add_trees(&mut first, tig, alpha);
                    self.backfit(&mut first, alpha, MAX_ROUNDS);
                    candidates.push(first);
                }
                row.push(self.pick_best(candidates));
            }
            prev = row;
        }

        prev.pop().unwrap_or_else(|| GroveState::new(self.rows.len()))
    }

    /// Candidate with the lowest out-of-bag RMSE; the first wins ties.
    fn pick_best(&self, candidates: Vec<GroveState>) -> GroveState {
        let mut best: Option<(f64, GroveState)> = None;
        for state in candidates {
            let score = self.holdout_rmse(&state);
            if best.as_ref().map_or(true, |(b, _)| score < *b) {
                best = Some((score, state));
            }
        }
        match best {
            Some((_, state)) => state,
            None => GroveState::new(self.rows.len()),
        }
    }

    /// RMSE on out-of-bag rows, or on the bag when every row was drawn.
    fn holdout_rmse(&self, state: &GroveState) -> f64 {
        if self.oob.is_empty() {
            return rmse(&state.total, &self.targets);
        }
        let train_targets = self.data.targets(DataSet::Train);
        let (preds, targets): (Vec<f64>, Vec<f64>) = self
            .oob
            .iter()
            .map(|&row| {
                let pred = state
                    .trees
                    .iter()
                    .map(|t| t.predict_row(self.data, row, DataSet::Train))
                    .sum::<f64>();
                (pred, train_targets[row])
            })
            .unzip();
        rmse(&preds, &targets)
    }

    /// Grow new trees on the current residual until the grove holds `tig` trees.
    fn add_trees(&self, state: &mut GroveState, tig: usize, alpha: f64) {
        let min_count = TreeGrower::min_count(alpha, self.rows.len());
        while state.trees.len() < tig {
            let residual: Vec<f64> = self.targets.iter().zip(&state.total).map(|(y, f)| y - f).collect();
            let tree = self.grower.grow(&self.rows, &residual, min_count);
            let fit = self.fit_values(&tree);
            for (sum, f) in state.total.iter_mut().zip(&fit) {
                *sum += f;
            }
            state.trees.push(tree);
            state.fits.push(fit);
        }
    }

    /// Refit every tree to the residual of the others until convergence.
    fn backfit(&self, state: &mut GroveState, alpha: f64, rounds: usize) {
        let min_count = TreeGrower::min_count(alpha, self.rows.len());
        let mut prev = rmse(&state.total, &self.targets);

        for _ in 0..rounds {
            for t in 0..state.trees.len() {
                let residual: Vec<f64> = self
                    .targets
                    .iter()
                    .zip(&state.total)
                    .zip(&state.fits[t])
                    .map(|((y, total), own)| y - (total - own))
                    .collect();
                let tree = self.grower.grow(&self.rows, &residual, min_count);
                let fit = self.fit_values(&tree);
                for ((sum, old), new) in state.total.iter_mut().zip(&state.fits[t]).zip(&fit) {
                    *sum += new - old;
                }
                state.trees[t] = tree;
                state.fits[t] = fit;
            }

            let current = rmse(&state.total, &self.targets);
            let converged = (prev - current).abs() <= CONVERGENCE * prev;
            prev = current;
            if converged {
                break;
            }
        }
    }

    fn fit_values(&self, tree: &RegressionTree) -> Vec<f64> {
        self.rows
            .iter()
            .map(|&row| tree.predict_row(self.data, row, DataSet::Train))
            .collect()
    }
}

// =============================================================================
// EnsembleMember
// =============================================================================

impl EnsembleMember for Grove {
    fn train(data: &Dataset, params: &MemberParams, parallelism: Parallelism) -> Self {
        GroveTrainer::new(data, params, parallelism).train()
    }

    fn predict(&self, data: &Dataset, row: usize, set: DataSet) -> f64 {
        self.predict_row(data, row, set)
    }

    fn save(&self, writer: &mut dyn Write) -> Result<(), ModelError> {
        write_block(writer, self)
    }

    fn load(reader: &mut dyn Read, _params: &MemberParams) -> Result<Self, ModelError> {
        read_block(reader)
    }
}
