//! In-memory data for training and analysis.
//!
//! [`Dataset`] holds the train, validation and synthetic test partitions in
//! feature-major layout (`[n_attrs, n_rows]`), the active-attribute mask and the
//! current bootstrap bag.
//!
//! # Missing Values
//!
//! Missing values are represented as `f64::NAN`. They are rejected in train and
//! validation data but are how synthetic test rows leave attributes unset.

mod dataset;

pub use dataset::{DataSet, Dataset, DatasetError, Quantile};
