//! Performance distribution of repeated bagged training.

use std::io::Write;

use crate::config::ConfigError;
use crate::data::Dataset;
use crate::error::GroveError;
use crate::io::ModelWriter;
use crate::utils::mean_std;

use super::bagging::BaggedTrainer;
use super::logger::TrainingLogger;
use super::member::EnsembleMember;

/// Mean and population standard deviation of repeated ensemble scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub mean: f64,
    pub std: f64,
    /// Individual scores in training order.
    pub samples: Vec<f64>,
}

impl Distribution {
    pub fn from_samples(samples: Vec<f64>) -> Self {
        let (mean, std) = mean_std(&samples);
        Self { mean, std, samples }
    }
}

/// Repeats bagged training to estimate the spread of its performance.
#[derive(Debug, Clone, Copy)]
pub struct DistributionEstimator<'a> {
    trainer: BaggedTrainer<'a>,
    repeat_n: usize,
    logger: TrainingLogger,
}

impl<'a> DistributionEstimator<'a> {
    /// # Errors
    ///
    /// [`ConfigError::InvalidRepeatN`] if `repeat_n` is 0.
    pub fn new(trainer: BaggedTrainer<'a>, repeat_n: usize) -> Result<Self, ConfigError> {
        if repeat_n == 0 {
            return Err(ConfigError::InvalidRepeatN);
        }
        Ok(Self {
            logger: TrainingLogger::new(trainer.config().verbosity),
            trainer,
            repeat_n,
        })
    }

    /// Train `repeat_n` independent ensembles under the current attribute set.
    ///
    /// Only the last ensemble is written to `sink`.
    pub fn estimate<M, W>(
        &self,
        data: &mut Dataset,
        mut sink: Option<&mut ModelWriter<W>>,
    ) -> Result<Distribution, GroveError>
    where
        M: EnsembleMember,
        W: Write,
    {
        let mut samples = Vec::with_capacity(self.repeat_n);
        for repeat_no in 0..self.repeat_n {
            self.logger.log_repeat(repeat_no, self.repeat_n);
            let last = repeat_no + 1 == self.repeat_n;
            let result = if last {
                self.trainer.train::<M, W>(data, sink.as_deref_mut())?
            } else {
                self.trainer.train::<M, W>(data, None)?
            };
            samples.push(result.performance);
        }
        Ok(Distribution::from_samples(samples))
    }
}
