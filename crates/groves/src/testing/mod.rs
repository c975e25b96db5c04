//! Test fixtures shared by unit and integration tests.
//!
//! Seeded synthetic datasets with known signal and noise attributes, and a
//! trivial ensemble member for exercising the orchestration layer quickly.

mod data;
mod members;

pub use data::{additive_regression, binary_classification, SIGNAL_ATTRS};
pub use members::{MeanMember, PenaltyMember, SlopeMember};
