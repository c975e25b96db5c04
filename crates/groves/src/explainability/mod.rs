//! Model explainability.
//!
//! - [`EffectAnalyzer`]: partial dependence curves and joint effect tables of a
//!   saved ensemble
//! - [`DensityTable`]: how much data lies around each joint-effect cell

mod density;
mod effects;

pub use density::{DensityAxis, DensityBlock, DensityTable};
pub use effects::{EffectAnalyzer, EffectCurve, EffectPoint, JointEffect};
