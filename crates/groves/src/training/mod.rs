//! Training infrastructure for bagged Additive Groves.
//!
//! This module provides:
//! - [`EnsembleMember`]: the base-learner contract, implemented by [`crate::repr::Grove`]
//! - [`BaggedTrainer`]: bootstrap bagging with streamed persistence
//! - [`DistributionEstimator`]: spread of repeated bagged scores
//! - [`FeatureEliminator`]: backward attribute elimination
//! - [`PerfMetric`]: RMSE and probabilistic ROC
//! - [`TrainingLogger`]: verbosity-gated `tracing` output

mod bagging;
mod distribution;
mod grove;
mod grower;
mod logger;
mod member;
mod metrics;
mod selection;

pub use bagging::{BaggedTrainer, BaggingResult};
pub use distribution::{Distribution, DistributionEstimator};
pub use grove::GroveTrainer;
pub use logger::{AttrDecision, TrainingLogger, Verbosity};
pub use member::{EnsembleMember, MemberParams};
pub use metrics::{rmse, roc, PerfMetric};
pub use selection::{importance, FeatureEliminator, SelectionParams, SelectionResult};
