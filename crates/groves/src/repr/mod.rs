//! Canonical model representations.

/// Node identifier: an index into the tree's node arrays.
pub type NodeId = u32;

pub mod grove;
pub mod tree;

pub use grove::Grove;
pub use tree::RegressionTree;
