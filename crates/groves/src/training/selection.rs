//! Backward feature elimination.
//!
//! The performance distribution of repeated bagged training on the current
//! attribute set serves as the null hypothesis. An attribute is removed when a
//! model trained without it stays inside the `band_sigmas` band of that
//! distribution, i.e. when it is statistically no worse.
//!
//! Active attributes are scanned as a ring in reverse insertion order. A lap
//! that completes without removals proves every cached score was measured on
//! the current attribute set, so the next pass can reuse them.

use crate::config::TrainConfig;
use crate::data::Dataset;
use crate::error::GroveError;
use crate::io::{ModelHeader, ModelWriter};
use crate::utils::{run_with_threads, Parallelism};

use super::bagging::BaggedTrainer;
use super::distribution::{Distribution, DistributionEstimator};
use super::logger::{AttrDecision, TrainingLogger};
use super::member::EnsembleMember;
use super::metrics::PerfMetric;

// =============================================================================
// Parameters
// =============================================================================

/// Parameters of the elimination test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionParams {
    /// Bagged ensembles trained per distribution estimate. Default: 10.
    pub repeat_n: usize,
    /// Half-width of the noise band in standard deviations. Default: 3.0.
    pub band_sigmas: f64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            repeat_n: 10,
            band_sigmas: 3.0,
        }
    }
}

impl SelectionParams {
    /// True if removing an attribute left performance `perf` inside the noise band.
    pub fn is_noise(&self, metric: PerfMetric, perf: f64, dist: &Distribution) -> bool {
        let band = self.band_sigmas * dist.std;
        match metric {
            PerfMetric::Rmse => perf <= dist.mean + band,
            PerfMetric::Roc => perf >= dist.mean - band,
        }
    }

    /// True if removing an attribute improved performance beyond the band.
    pub fn is_strong_improvement(&self, metric: PerfMetric, perf: f64, dist: &Distribution) -> bool {
        let band = self.band_sigmas * dist.std;
        match metric {
            PerfMetric::Rmse => perf <= dist.mean - band,
            PerfMetric::Roc => perf >= dist.mean + band,
        }
    }
}

/// Performance loss caused by removing an attribute; larger is more important.
pub fn importance(metric: PerfMetric, perf: f64, dist: &Distribution) -> f64 {
    match metric {
        PerfMetric::Rmse => perf - dist.mean,
        PerfMetric::Roc => dist.mean - perf,
    }
}

// =============================================================================
// Attribute ring
// =============================================================================

/// Active attributes in insertion order with a cursor that walks backwards
/// and wraps from the first attribute to the last.
#[derive(Debug, Clone)]
struct AttrRing {
    attrs: Vec<usize>,
    cursor: usize,
}

impl AttrRing {
    fn new(attrs: Vec<usize>) -> Self {
        let cursor = attrs.len().saturating_sub(1);
        Self { attrs, cursor }
    }

    fn rewind(&mut self) {
        self.cursor = self.attrs.len().saturating_sub(1);
    }

    fn current(&self) -> Option<usize> {
        self.attrs.get(self.cursor).copied()
    }

    fn advance(&mut self) {
        self.cursor = match self.cursor {
            0 => self.attrs.len().saturating_sub(1),
            c => c - 1,
        };
    }

    /// Remove the current attribute; the cursor moves on to the next one.
    fn remove_current(&mut self) {
        self.attrs.remove(self.cursor);
        self.advance();
        if self.cursor >= self.attrs.len() {
            self.rewind();
        }
    }

    fn attrs(&self) -> &[usize] {
        &self.attrs
    }
}

// =============================================================================
// Result
// =============================================================================

/// Outcome of feature elimination.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    /// Surviving attribute ids in insertion order.
    pub attrs: Vec<usize>,
    /// Importance of each surviving attribute, parallel to `attrs`.
    pub importance: Vec<f64>,
    /// Last performance distribution estimate.
    pub distribution: Distribution,
    /// Removed attribute ids in removal order.
    pub eliminated: Vec<usize>,
}

impl SelectionResult {
    /// `(attr, importance)` pairs, most important first.
    pub fn ranked(&self) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = self.attrs.iter().copied().zip(self.importance.iter().copied()).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

// =============================================================================
// FeatureEliminator
// =============================================================================

/// Removes attributes whose contribution cannot be told apart from noise.
#[derive(Debug, Clone)]
pub struct FeatureEliminator<'a> {
    config: &'a TrainConfig,
    params: SelectionParams,
    logger: TrainingLogger,
}

impl<'a> FeatureEliminator<'a> {
    pub fn new(config: &'a TrainConfig, params: SelectionParams) -> Self {
        Self {
            config,
            params,
            logger: TrainingLogger::new(config.verbosity),
        }
    }

    /// Run elimination over the dataset's active attributes.
    ///
    /// Removed attributes stay ignored in `data` afterwards. When the config has
    /// a model path, every distribution estimate overwrites it with a fresh
    /// baseline ensemble.
    pub fn run<M: EnsembleMember>(&self, data: &mut Dataset) -> Result<SelectionResult, GroveError> {
        run_with_threads(self.config.thread_count(), |parallelism| {
            self.run_with::<M>(data, parallelism)
        })
    }

    fn run_with<M: EnsembleMember>(
        &self,
        data: &mut Dataset,
        parallelism: Parallelism,
    ) -> Result<SelectionResult, GroveError> {
        let metric = self.config.metric;
        let trainer = BaggedTrainer::new(self.config, parallelism);
        let estimator = DistributionEstimator::new(trainer, self.params.repeat_n)?;

        let mut ring = AttrRing::new(data.active_attrs());
        let mut cache = vec![f64::NAN; data.n_attrs()];
        let mut cache_valid = false;
        let mut eliminated = Vec::new();

        loop {
            let distribution = self.estimate_baseline::<M>(&estimator, data)?;
            self.logger.log_distribution(&distribution, self.params.band_sigmas);

            let mut removed = false;
            let mut first_survivor: Option<usize> = None;
            ring.rewind();

            while let Some(attr) = ring.current() {
                if first_survivor == Some(attr) {
                    cache_valid = true;
                    break;
                }

                data.ignore_attr(attr);
                let reused = cache_valid;
                let perf = if reused {
                    cache[attr]
                } else {
                    let perf = trainer.train_unsaved::<M>(data)?.performance;
                    cache[attr] = perf;
                    perf
                };
                let imp = importance(metric, perf, &distribution);

                if self.params.is_noise(metric, perf, &distribution) {
                    self.logger
                        .log_attr(data.attr_name(attr), perf, imp, AttrDecision::Eliminate, reused);
                    ring.remove_current();
                    eliminated.push(attr);
                    removed = true;
                    first_survivor = None;
                    cache_valid = false;

                    if self.params.is_strong_improvement(metric, perf, &distribution) {
                        self.logger.log_reestimate();
                        break;
                    }
                } else {
                    self.logger
                        .log_attr(data.attr_name(attr), perf, imp, AttrDecision::Keep, reused);
                    data.use_attr(attr);
                    first_survivor.get_or_insert(attr);
                    ring.advance();
                }
            }

            if !removed {
                let attrs = ring.attrs().to_vec();
                let names: Vec<&str> = attrs.iter().map(|&a| data.attr_name(a)).collect();
                self.logger.log_selection(&names);

                let scores = attrs.iter().map(|&a| importance(metric, cache[a], &distribution)).collect();
                return Ok(SelectionResult {
                    attrs,
                    importance: scores,
                    distribution,
                    eliminated,
                });
            }
        }
    }

    fn estimate_baseline<M: EnsembleMember>(
        &self,
        estimator: &DistributionEstimator<'_>,
        data: &mut Dataset,
    ) -> Result<Distribution, GroveError> {
        match &self.config.model_path {
            Some(path) => {
                let header = ModelHeader::new(self.config.mode, self.config.max_tig, self.config.min_alpha);
                let mut writer = ModelWriter::create(path, header)?;
                estimator.estimate::<M, _>(data, Some(&mut writer))
            }
            None => estimator.estimate::<M, std::io::Sink>(data, None),
        }
    }
}
