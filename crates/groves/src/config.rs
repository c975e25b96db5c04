//! Training configuration with builder pattern.
//!
//! [`TrainConfig`] is built once by the driver and then passed by reference
//! into every component. The builder (via `bon`) validates at build time.
//!
//! # Example
//!
//! ```
//! use groves::config::{TrainConfig, TrainMode};
//! use groves::training::PerfMetric;
//!
//! let config = TrainConfig::builder()
//!     .train_path("train.tsv")
//!     .valid_path("valid.tsv")
//!     .attr_path("data.attr")
//!     .min_alpha(0.01)
//!     .max_tig(8)
//!     .bag_n(60)
//!     .metric(PerfMetric::Roc)
//!     .mode(TrainMode::Layered)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.seed, 1);
//! ```

use std::num::NonZeroUsize;
use std::path::PathBuf;

use bon::Builder;
use thiserror::Error;

use crate::grid::{adjust_alpha, adjust_tig, format_alpha};
use crate::training::{PerfMetric, TrainingLogger, Verbosity};

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Alpha must lie in `[0, 1]`.
    #[error("alpha value {0} is out of [0;1] range")]
    AlphaOutOfRange(f64),
    /// TiG must be at least 1.
    #[error("TiG value is less than 1")]
    InvalidTiG,
    /// At least one bagging iteration is required.
    #[error("number of bagging iterations must be at least 1")]
    InvalidBagN,
    /// At least one repetition is required to estimate a distribution.
    #[error("number of repetitions must be at least 1")]
    InvalidRepeatN,
    /// Train and validation sets must differ.
    #[error("train set should be different from the validation set")]
    TrainEqualsValid,
    /// The model file name is empty.
    #[error("model file name is empty")]
    EmptyModelPath,
}

// =============================================================================
// TrainMode
// =============================================================================

/// Path a grove takes through the (alpha, TiG) grid while it is trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrainMode {
    /// Grow the tree count at the coarsest alpha, then refine alpha.
    #[default]
    Layered,
    /// Layered path with a single backfitting round per stage.
    Fast,
    /// Each grid cell starts from the better of its two predecessors.
    Slow,
}

impl TrainMode {
    /// Tag stored in the model stream header.
    pub fn tag(self) -> u32 {
        match self {
            Self::Slow => 0,
            Self::Fast => 1,
            Self::Layered => 2,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Slow),
            1 => Some(Self::Fast),
            2 => Some(Self::Layered),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Layered => "layered",
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }
}

// =============================================================================
// TrainConfig
// =============================================================================

/// Configuration shared by bagging, feature selection and grid analysis.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct TrainConfig {
    // === Inputs ===
    /// Training set file.
    #[builder(into)]
    pub train_path: PathBuf,

    /// Validation set file.
    #[builder(into)]
    pub valid_path: PathBuf,

    /// Attribute description file.
    #[builder(into)]
    pub attr_path: PathBuf,

    /// Where the ensemble is saved. `None` disables persistence.
    #[builder(into)]
    pub model_path: Option<PathBuf>,

    // === Grid ===
    /// Smallest alpha (minimum leaf weight fraction) of the grid.
    pub min_alpha: f64,

    /// Largest number of trees in a grove.
    pub max_tig: usize,

    /// Number of bagging iterations. Default: 60.
    #[builder(default = 60)]
    pub bag_n: usize,

    // === Training ===
    /// Validation metric. Default: RMSE.
    #[builder(default)]
    pub metric: PerfMetric,

    /// Grove training path. Default: layered.
    #[builder(default)]
    pub mode: TrainMode,

    /// Seed of the bagging random source. Default: 1.
    #[builder(default = 1)]
    pub seed: u64,

    // === Resources ===
    /// Number of threads. `None` uses all available cores.
    pub n_threads: Option<NonZeroUsize>,

    // === Logging ===
    /// Verbosity level. Default: `Warning`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: train_config_builder::IsComplete> TrainConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `min_alpha` outside `[0, 1]`
    /// - `max_tig < 1` or `bag_n < 1`
    /// - train path equal to validation path
    /// - empty model path
    pub fn build(self) -> Result<TrainConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl TrainConfig {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_alpha) {
            return Err(ConfigError::AlphaOutOfRange(self.min_alpha));
        }
        if self.max_tig < 1 {
            return Err(ConfigError::InvalidTiG);
        }
        if self.bag_n < 1 {
            return Err(ConfigError::InvalidBagN);
        }
        if self.train_path == self.valid_path {
            return Err(ConfigError::TrainEqualsValid);
        }
        if matches!(&self.model_path, Some(path) if path.as_os_str().is_empty()) {
            return Err(ConfigError::EmptyModelPath);
        }
        Ok(())
    }

    /// Thread count in `run_with_threads` semantics (0 = auto).
    pub fn thread_count(&self) -> usize {
        self.n_threads.map_or(0, NonZeroUsize::get)
    }

    /// Snap `min_alpha` and `max_tig` onto the grid for a training set of `train_n` rows.
    ///
    /// Every change is reported as a warning.
    pub fn adjust_to(&mut self, train_n: usize, logger: &TrainingLogger) {
        let alpha = adjust_alpha(self.min_alpha, train_n);
        if alpha != self.min_alpha {
            if alpha == 0.0 {
                logger.warn("due to small train set size value of alpha was changed to 0");
            } else {
                logger.warn(&format!(
                    "alpha value was rounded to the closest valid value {}",
                    format_alpha(alpha)
                ));
            }
            self.min_alpha = alpha;
        }

        let tig = adjust_tig(self.max_tig);
        if tig != self.max_tig {
            logger.warn(&format!("TiG value was rounded to the closest smaller valid value {tig}"));
            self.max_tig = tig;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
