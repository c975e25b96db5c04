//! Bagged ensemble training.

use std::io::Write;

use crate::config::TrainConfig;
use crate::data::{DataSet, Dataset};
use crate::error::GroveError;
use crate::io::ModelWriter;
use crate::utils::Parallelism;

use super::logger::TrainingLogger;
use super::member::{EnsembleMember, MemberParams};

/// Outcome of one bagged training run.
#[derive(Debug, Clone, PartialEq)]
pub struct BaggingResult {
    /// Validation performance of the full ensemble.
    pub performance: f64,
    /// Averaged ensemble prediction for every validation row.
    pub predictions: Vec<f64>,
    /// `curve[b]`: validation performance of the first `b + 1` members.
    pub curve: Vec<f64>,
}

/// Trains `bag_n` members on bootstrap bags and averages their predictions.
#[derive(Debug, Clone, Copy)]
pub struct BaggedTrainer<'a> {
    config: &'a TrainConfig,
    params: MemberParams,
    logger: TrainingLogger,
    parallelism: Parallelism,
}

impl<'a> BaggedTrainer<'a> {
    pub fn new(config: &'a TrainConfig, parallelism: Parallelism) -> Self {
        Self {
            config,
            params: MemberParams::from_config(config),
            logger: TrainingLogger::new(config.verbosity),
            parallelism,
        }
    }

    pub fn config(&self) -> &TrainConfig {
        self.config
    }

    /// Train a bagged ensemble under the dataset's active attributes.
    ///
    /// Each member is appended to `sink` right after it is trained. The
    /// dataset's bag is resampled once per member.
    pub fn train<M, W>(
        &self,
        data: &mut Dataset,
        mut sink: Option<&mut ModelWriter<W>>,
    ) -> Result<BaggingResult, GroveError>
    where
        M: EnsembleMember,
        W: Write,
    {
        let bag_n = self.config.bag_n;
        let valid_n = data.n_rows(DataSet::Valid);
        let targets = data.targets(DataSet::Valid).to_vec();

        let mut sums = vec![0.0; valid_n];
        let mut averaged = vec![0.0; valid_n];
        let mut curve = Vec::with_capacity(bag_n);

        for bag_no in 0..bag_n {
            self.logger.log_bag(bag_no, bag_n);
            data.new_bag();
            let member = M::train(data, &self.params, self.parallelism);

            for (row, sum) in sums.iter_mut().enumerate() {
                *sum += member.predict(data, row, DataSet::Valid);
            }
            if let Some(writer) = sink.as_deref_mut() {
                writer.write_member(&member)?;
            }

            let denom = (bag_no + 1) as f64;
            for (avg, sum) in averaged.iter_mut().zip(&sums) {
                *avg = sum / denom;
            }
            curve.push(self.config.metric.compute(&averaged, &targets));
        }

        let performance = curve.last().copied().unwrap_or(f64::NAN);
        Ok(BaggingResult {
            performance,
            predictions: averaged,
            curve,
        })
    }

    /// Train without persisting members.
    pub fn train_unsaved<M: EnsembleMember>(&self, data: &mut Dataset) -> Result<BaggingResult, GroveError> {
        self.train::<M, std::io::Sink>(data, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ModelHeader, ModelReader};
    use crate::repr::Grove;
    use crate::testing::{additive_regression, MeanMember};
    use crate::training::PerfMetric;
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    fn config(bag_n: usize, metric: PerfMetric) -> TrainConfig {
        TrainConfig::builder()
            .train_path("train")
            .valid_path("valid")
            .attr_path("attr")
            .min_alpha(0.1)
            .max_tig(2)
            .bag_n(bag_n)
            .metric(metric)
            .verbosity(crate::training::Verbosity::Silent)
            .build()
            .unwrap()
    }

    #[test]
    fn predictions_cover_validation_set() {
        let mut data = additive_regression(120, 30, 3);
        let config = config(3, PerfMetric::Rmse);
        let result = BaggedTrainer::new(&config, Parallelism::Sequential)
            .train_unsaved::<Grove>(&mut data)
            .unwrap();
        assert_eq!(result.predictions.len(), 30);
        assert_eq!(result.curve.len(), 3);
        assert_eq!(result.performance, result.curve[2]);
    }

    #[test]
    fn performance_matches_metric_of_predictions() {
        let mut data = additive_regression(80, 25, 9);
        let config = config(4, PerfMetric::Rmse);
        let result = BaggedTrainer::new(&config, Parallelism::Sequential)
            .train_unsaved::<MeanMember>(&mut data)
            .unwrap();
        let expected = PerfMetric::Rmse.compute(&result.predictions, data.targets(DataSet::Valid));
        assert_abs_diff_eq!(result.performance, expected, epsilon = 1e-12);
    }

    #[test]
    fn members_are_streamed_to_sink() {
        let mut data = additive_regression(60, 10, 4);
        let config = config(5, PerfMetric::Rmse);
        let header = ModelHeader::new(config.mode, config.max_tig, config.min_alpha);
        let mut writer = ModelWriter::new(Vec::new(), header).unwrap();

        BaggedTrainer::new(&config, Parallelism::Sequential)
            .train::<Grove, _>(&mut data, Some(&mut writer))
            .unwrap();
        assert_eq!(writer.members(), 5);

        let mut reader = ModelReader::new(Cursor::new(writer.into_inner())).unwrap();
        let count = reader.for_each_member::<Grove, _>(|_| {}).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn saved_ensemble_reproduces_predictions() {
        let mut data = additive_regression(60, 12, 8);
        let config = config(3, PerfMetric::Rmse);
        let header = ModelHeader::new(config.mode, config.max_tig, config.min_alpha);
        let mut writer = ModelWriter::new(Vec::new(), header).unwrap();
        let result = BaggedTrainer::new(&config, Parallelism::Sequential)
            .train::<Grove, _>(&mut data, Some(&mut writer))
            .unwrap();

        let mut sums = vec![0.0; 12];
        let mut reader = ModelReader::new(Cursor::new(writer.into_inner())).unwrap();
        let n = reader
            .for_each_member::<Grove, _>(|member| {
                for (row, sum) in sums.iter_mut().enumerate() {
                    *sum += member.predict(&data, row, DataSet::Valid);
                }
            })
            .unwrap();
        for (sum, pred) in sums.iter().zip(&result.predictions) {
            assert_abs_diff_eq!(sum / n as f64, *pred, epsilon = 1e-12);
        }
    }

    #[test]
    fn roc_mode_scores_in_unit_interval() {
        let mut data = crate::testing::binary_classification(100, 40, 2);
        let config = config(2, PerfMetric::Roc);
        let result = BaggedTrainer::new(&config, Parallelism::Sequential)
            .train_unsaved::<Grove>(&mut data)
            .unwrap();
        assert!((0.0..=1.0).contains(&result.performance));
    }
}
