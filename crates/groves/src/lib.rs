//! groves: bagged Additive Groves for Rust.
//!
//! Additive Groves are additive models of small regression trees, trained by
//! backfitting and bagged over bootstrap samples. Besides training, the crate
//! provides the analysis tooling around a model.
//!
//! # Key Types
//!
//! - [`TrainConfig`] - Validated run configuration (bon builder)
//! - [`Dataset`] - Feature-major train/validation data with bagging state
//! - [`BaggedTrainer`] / [`DistributionEstimator`] - Bagging and score spread
//! - [`FeatureEliminator`] - Backward attribute elimination
//! - [`GridSearchAnalyzer`] - Best (alpha, TiG) point and tuning advice
//! - [`EffectAnalyzer`] - Partial dependence and joint effects
//!
//! # Training
//!
//! ```no_run
//! use groves::{BaggedTrainer, Dataset, Grove, TrainConfig, Parallelism};
//! # fn load() -> Dataset { unimplemented!() }
//!
//! let config = TrainConfig::builder()
//!     .train_path("train.dta")
//!     .valid_path("valid.dta")
//!     .attr_path("data.attr")
//!     .min_alpha(0.1)
//!     .max_tig(6)
//!     .build()?;
//! let mut data = load();
//! let result = BaggedTrainer::new(&config, Parallelism::Sequential).train_unsaved::<Grove>(&mut data)?;
//! println!("validation rmse {}", result.performance);
//! # Ok::<(), groves::GroveError>(())
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod explainability;
pub mod grid;
pub mod io;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use analysis::{BagConvergence, BestPoint, GridAnalysis, GridSearchAnalyzer, PerformanceSurface, Recommendation};
pub use config::{ConfigError, TrainConfig, TrainMode};
pub use data::{DataSet, Dataset, DatasetError, Quantile};
pub use error::{GroveError, Result};
pub use explainability::{EffectAnalyzer, EffectCurve, EffectPoint, JointEffect};
pub use grid::GridIndex;
pub use io::{ModelError, ModelHeader, ModelReader, ModelWriter};
pub use repr::{Grove, RegressionTree};
pub use training::{
    BaggedTrainer, BaggingResult, Distribution, DistributionEstimator, EnsembleMember, FeatureEliminator, PerfMetric,
    SelectionParams, SelectionResult, TrainingLogger, Verbosity,
};
pub use utils::{run_with_threads, Parallelism};
