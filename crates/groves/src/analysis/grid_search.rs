//! Best grid point selection and tuning recommendations.
//!
//! The analyzer reads the final bagging iteration of a [`PerformanceSurface`],
//! picks the best (alpha, TiG) cell and decides whether the next run should
//! widen the grid, bag longer, or simply save the best model.

use std::fmt;

use crate::config::TrainConfig;
use crate::error::GroveError;
use crate::grid::{alpha_count, grid_alpha, tig_count, tig_value, GridIndex};
use crate::training::{PerfMetric, TrainingLogger};
use crate::utils::mean_std;

use super::surface::PerformanceSurface;

/// Bag count added when more bagging is recommended.
pub const BAG_INCREMENT: usize = 40;

// =============================================================================
// BagConvergence
// =============================================================================

/// Plateau test on a bagging curve.
///
/// The last `window` points are compared with the `window` points before
/// them. Bagging has not converged if the shift of the mean plus the spread of
/// the recent window exceeds `tolerance` relative to the earlier mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BagConvergence {
    pub window: usize,
    pub tolerance: f64,
}

impl Default for BagConvergence {
    fn default() -> Self {
        Self {
            window: 5,
            tolerance: 0.002,
        }
    }
}

impl BagConvergence {
    /// True if the curve has not plateaued yet.
    pub fn more_bagging(&self, curve: &[f64]) -> bool {
        let window = self.window.max(1);
        if curve.len() < 2 * window {
            return true;
        }
        let recent = &curve[curve.len() - window..];
        let earlier = &curve[curve.len() - 2 * window..curve.len() - window];
        let (earlier_mean, _) = mean_std(earlier);
        let (recent_mean, recent_std) = mean_std(recent);
        (earlier_mean - recent_mean).abs() + recent_std > self.tolerance * earlier_mean.abs()
    }
}

// =============================================================================
// Results
// =============================================================================

/// Best cell of the searched grid region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestPoint {
    pub index: GridIndex,
    pub alpha: f64,
    pub tig: usize,
    pub performance: f64,
}

/// What the next run should do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recommendation {
    /// Widen the search; `None` fields keep their current value.
    Expand {
        alpha: Option<f64>,
        tig: Option<usize>,
        bag_n: Option<usize>,
    },
    /// The grid is adequate; save the model at the best point.
    Save { alpha: f64, tig: usize },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expand { alpha, tig, bag_n } => {
                f.write_str("expand the search")?;
                if let Some(alpha) = alpha {
                    write!(f, " alpha={}", crate::grid::format_alpha(*alpha))?;
                }
                if let Some(tig) = tig {
                    write!(f, " tig={tig}")?;
                }
                if let Some(bag_n) = bag_n {
                    write!(f, " bag_n={bag_n}")?;
                }
                Ok(())
            }
            Self::Save { alpha, tig } => {
                write!(f, "save the model alpha={} tig={tig}", crate::grid::format_alpha(*alpha))
            }
        }
    }
}

/// Result of [`GridSearchAnalyzer::analyze`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAnalysis {
    pub best: BestPoint,
    pub recommendation: Recommendation,
    /// Whether a bagging curve near the best point is still moving.
    pub more_bagging: bool,
}

// =============================================================================
// GridSearchAnalyzer
// =============================================================================

/// Picks the best grid point of a finished grid run.
#[derive(Debug, Clone)]
pub struct GridSearchAnalyzer {
    min_alpha: f64,
    max_tig: usize,
    bag_n: usize,
    train_n: usize,
    convergence: BagConvergence,
    logger: TrainingLogger,
}

impl GridSearchAnalyzer {
    /// `config` should already be adjusted to the training set size.
    pub fn new(config: &TrainConfig, train_n: usize) -> Self {
        Self {
            min_alpha: config.min_alpha,
            max_tig: config.max_tig,
            bag_n: config.bag_n,
            train_n,
            convergence: BagConvergence::default(),
            logger: TrainingLogger::new(config.verbosity),
        }
    }

    pub fn with_convergence(mut self, convergence: BagConvergence) -> Self {
        self.convergence = convergence;
        self
    }

    /// Number of alpha steps of the analysed grid.
    pub fn alpha_n(&self) -> usize {
        alpha_count(self.min_alpha, self.train_n)
    }

    /// Number of TiG steps of the analysed grid.
    pub fn tig_n(&self) -> usize {
        tig_count(self.max_tig)
    }

    /// Alpha reported for a grid column.
    pub fn alpha_at(&self, alpha_idx: usize) -> f64 {
        grid_alpha(alpha_idx, self.alpha_n(), self.min_alpha)
    }

    /// Locate the best cell at or beyond `origin` and derive a recommendation.
    ///
    /// Cells are scanned TiG-major. A later cell replaces the current best if
    /// it scores strictly better, or equally with strictly lower
    /// `2^alpha_idx × tig`; otherwise the first cell found wins.
    ///
    /// # Errors
    ///
    /// [`GroveError::EmptySurface`] if the surface has no iterations and
    /// [`GroveError::OriginOutsideGrid`] if `origin` is not a cell of it.
    pub fn analyze(&self, surface: &PerformanceSurface, origin: GridIndex) -> Result<GridAnalysis, GroveError> {
        let metric = surface.metric();
        let alpha_n = surface.alpha_n();
        let tig_n = surface.tig_n();
        if surface.bag_n() == 0 {
            return Err(GroveError::EmptySurface);
        }
        if origin.tig_idx >= tig_n || origin.alpha_idx >= alpha_n {
            return Err(GroveError::OriginOutsideGrid {
                alpha_idx: origin.alpha_idx,
                tig_idx: origin.tig_idx,
                alpha_n,
                tig_n,
            });
        }

        let mut best_idx = origin;
        let mut best_perf = surface.final_value(origin, metric);
        for tig_idx in origin.tig_idx..tig_n {
            for alpha_idx in origin.alpha_idx..alpha_n {
                let idx = GridIndex::new(alpha_idx, tig_idx);
                let perf = surface.final_value(idx, metric);
                let better = metric.is_better(perf, best_perf)
                    || (perf == best_perf && idx.complexity() < best_idx.complexity());
                if better {
                    best_idx = idx;
                    best_perf = perf;
                }
            }
        }

        let best = BestPoint {
            index: best_idx,
            alpha: grid_alpha(best_idx.alpha_idx, alpha_n, self.min_alpha),
            tig: tig_value(best_idx.tig_idx),
            performance: best_perf,
        };

        // convergence is judged on RMSE curves whatever the metric
        let more_bagging = self
            .convergence
            .more_bagging(&surface.curve(best_idx, PerfMetric::Rmse))
            || {
                let harder = GridIndex::new(
                    (best_idx.alpha_idx + 1).min(alpha_n - 1),
                    (best_idx.tig_idx + 1).min(tig_n - 1),
                );
                self.convergence.more_bagging(&surface.curve(harder, PerfMetric::Rmse))
            };

        let recommendation = self.recommend(metric, &best, (alpha_n, tig_n), more_bagging);
        self.logger.log_best(&best, metric.name());
        self.logger.log_recommendation(&recommendation);

        Ok(GridAnalysis {
            best,
            recommendation,
            more_bagging,
        })
    }

    fn recommend(
        &self,
        metric: PerfMetric,
        best: &BestPoint,
        (alpha_n, tig_n): (usize, usize),
        more_bagging: bool,
    ) -> Recommendation {
        let on_alpha_edge = best.index.alpha_idx + 1 == alpha_n && self.min_alpha != 0.0;
        let on_tig_edge = best.index.tig_idx + 1 == tig_n;
        let optimal = best.performance == metric.optimum();

        if optimal || !(on_alpha_edge || on_tig_edge || more_bagging) {
            return Recommendation::Save {
                alpha: best.alpha,
                tig: best.tig,
            };
        }

        let alpha = on_alpha_edge.then(|| {
            let alpha = self.min_alpha * 0.1;
            if 1.0 / self.train_n.max(1) as f64 >= alpha {
                0.0
            } else {
                alpha
            }
        });
        Recommendation::Expand {
            alpha,
            tig: on_tig_edge.then(|| tig_value(tig_n)),
            bag_n: more_bagging.then_some(self.bag_n + BAG_INCREMENT),
        }
    }
}
