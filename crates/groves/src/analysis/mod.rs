//! Analysis of finished grid runs.

mod grid_search;
mod surface;

pub use grid_search::{BagConvergence, BestPoint, GridAnalysis, GridSearchAnalyzer, Recommendation, BAG_INCREMENT};
pub use surface::PerformanceSurface;
