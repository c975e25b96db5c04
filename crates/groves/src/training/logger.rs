//! Structured training output.
//!
//! [`TrainingLogger`] gates messages on a [`Verbosity`] level and forwards them
//! as `tracing` events, so the embedding application decides where they go.

use crate::analysis::{BestPoint, Recommendation};
use crate::grid::format_alpha;

use super::distribution::Distribution;

/// Verbosity level for training output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Errors and warnings only.
    #[default]
    Warning,
    /// Progress and important information.
    Info,
    /// Detailed debugging information.
    Debug,
}

/// Outcome of testing one attribute during feature elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDecision {
    Eliminate,
    Keep,
}

/// Logger for the bagging, selection and analysis stages.
#[derive(Debug, Clone, Copy)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    pub fn warn(&self, message: &str) {
        if self.enabled(Verbosity::Warning) {
            tracing::warn!("{message}");
        }
    }

    pub fn info(&self, message: &str) {
        if self.enabled(Verbosity::Info) {
            tracing::info!("{message}");
        }
    }

    pub fn log_bag(&self, bag_no: usize, bag_n: usize) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(iteration = bag_no + 1, total = bag_n, "bagging iteration");
        }
    }

    pub fn log_repeat(&self, repeat_no: usize, repeat_n: usize) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(model = repeat_no + 1, total = repeat_n, "training model for distribution estimate");
        }
    }

    pub fn log_distribution(&self, distribution: &Distribution, band_sigmas: f64) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(
                mean = distribution.mean,
                std = distribution.std,
                threshold = distribution.std * band_sigmas,
                "estimated performance distribution"
            );
        }
    }

    pub fn log_attr(&self, name: &str, performance: f64, importance: f64, decision: AttrDecision, reused: bool) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(
                attr = name,
                performance,
                importance,
                reused,
                decision = ?decision,
                "tested attribute"
            );
        }
    }

    pub fn log_reestimate(&self) {
        if self.enabled(Verbosity::Info) {
            tracing::info!("significant improvement of performance, re-estimating distribution");
        }
    }

    pub fn log_selection(&self, names: &[&str]) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(attrs = ?names, "resulting set of attributes");
        }
    }

    pub fn log_best(&self, best: &BestPoint, metric_name: &str) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(
                alpha = %format_alpha(best.alpha),
                tig = best.tig,
                metric = metric_name,
                performance = best.performance,
                "best model"
            );
        }
    }

    pub fn log_recommendation(&self, recommendation: &Recommendation) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(%recommendation, "recommendation");
        }
    }
}

impl Default for TrainingLogger {
    fn default() -> Self {
        Self::new(Verbosity::default())
    }
}
