//! Crate-level error type.
//!
//! Every failure aborts the current operation; nothing is retried. The caller
//! maps [`GroveError`] variants to user-facing messages and exit codes.

use thiserror::Error;

use crate::config::ConfigError;
use crate::data::DatasetError;
use crate::io::ModelError;

/// Errors produced by training and analysis operations.
#[derive(Debug, Error)]
pub enum GroveError {
    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Saved model stream is corrupt or incompatible.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Dataset construction or lookup failed.
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// A fixed attribute name does not resolve to an active attribute.
    #[error("attribute {0:?} is not an active attribute")]
    InactiveAttribute(String),

    /// A performance surface without any bagging iteration was analysed.
    #[error("performance surface has no iterations")]
    EmptySurface,

    /// Grid search origin does not address a cell of the surface.
    #[error("search origin (alpha {alpha_idx}, tig {tig_idx}) outside a {alpha_n}x{tig_n} grid")]
    OriginOutsideGrid {
        alpha_idx: usize,
        tig_idx: usize,
        alpha_n: usize,
        tig_n: usize,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for crate operations.
pub type Result<T, E = GroveError> = std::result::Result<T, E>;
