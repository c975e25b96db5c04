//! Contract between the bagging layer and its base learner.

use std::io::{Read, Write};

use crate::config::{TrainConfig, TrainMode};
use crate::data::{DataSet, Dataset};
use crate::io::ModelError;
use crate::utils::Parallelism;

/// Hyperparameters a single ensemble member is trained with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberParams {
    /// Minimum fraction of the bag a leaf must hold.
    pub alpha: f64,
    /// Maximum number of trees in one member.
    pub max_tig: usize,
    pub mode: TrainMode,
}

impl MemberParams {
    pub fn from_config(config: &TrainConfig) -> Self {
        Self {
            alpha: config.min_alpha,
            max_tig: config.max_tig,
            mode: config.mode,
        }
    }
}

/// One trained member of a bagged ensemble.
///
/// `train` reads the dataset's current bag and active attributes; it may fan
/// work out over the rayon pool when `parallelism` allows it and must join
/// before returning.
pub trait EnsembleMember: Sized {
    fn train(data: &Dataset, params: &MemberParams, parallelism: Parallelism) -> Self;

    fn predict(&self, data: &Dataset, row: usize, set: DataSet) -> f64;

    /// Append this member as one self-delimiting block.
    fn save(&self, writer: &mut dyn Write) -> Result<(), ModelError>;

    /// Read one block written by [`EnsembleMember::save`].
    fn load(reader: &mut dyn Read, params: &MemberParams) -> Result<Self, ModelError>;
}
