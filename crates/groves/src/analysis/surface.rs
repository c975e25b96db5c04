//! Performance surfaces over the (TiG, alpha) grid.

use std::io::{Read, Write};

use ndarray::{s, Array2, Array3, ArrayView2, Axis};

use crate::grid::GridIndex;
use crate::io::{read_array_into, write_array};
use crate::training::PerfMetric;

/// Validation performance per grid cell and bagging iteration.
///
/// Indexed `[tig_idx][alpha_idx][iteration]`. RMSE is always recorded; ROC
/// only for runs scored by ROC. Iteration `b` holds the score of the first
/// `b + 1` bags, and iterations are only ever appended.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSurface {
    tig_n: usize,
    alpha_n: usize,
    rmse: Vec<Array2<f64>>,
    roc: Option<Vec<Array2<f64>>>,
}

impl PerformanceSurface {
    /// Empty surface for a `tig_n × alpha_n` grid.
    pub fn new(tig_n: usize, alpha_n: usize, metric: PerfMetric) -> Self {
        Self {
            tig_n,
            alpha_n,
            rmse: Vec::new(),
            roc: metric.higher_is_better().then(Vec::new),
        }
    }

    /// Build from `[tig][alpha][iteration]` arrays.
    pub fn from_arrays(rmse: &Array3<f64>, roc: Option<&Array3<f64>>) -> Self {
        let (tig_n, alpha_n, _) = rmse.dim();
        let split = |a: &Array3<f64>| -> Vec<Array2<f64>> {
            a.axis_iter(Axis(2)).map(|m| m.to_owned()).collect()
        };
        Self {
            tig_n,
            alpha_n,
            rmse: split(rmse),
            roc: roc.map(split),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn tig_n(&self) -> usize {
        self.tig_n
    }

    pub fn alpha_n(&self) -> usize {
        self.alpha_n
    }

    /// Number of bagging iterations recorded so far.
    pub fn bag_n(&self) -> usize {
        self.rmse.len()
    }

    /// Metric used to pick the best cell: ROC when recorded, RMSE otherwise.
    pub fn metric(&self) -> PerfMetric {
        if self.roc.is_some() {
            PerfMetric::Roc
        } else {
            PerfMetric::Rmse
        }
    }

    fn layers(&self, metric: PerfMetric) -> &[Array2<f64>] {
        match (metric, &self.roc) {
            (PerfMetric::Roc, Some(roc)) => roc,
            _ => &self.rmse,
        }
    }

    /// Score of a cell after `iteration + 1` bags.
    pub fn value(&self, idx: GridIndex, iteration: usize, metric: PerfMetric) -> f64 {
        self.layers(metric)[iteration][[idx.tig_idx, idx.alpha_idx]]
    }

    /// Score of a cell after the last recorded iteration.
    pub fn final_value(&self, idx: GridIndex, metric: PerfMetric) -> f64 {
        self.value(idx, self.bag_n() - 1, metric)
    }

    /// Bagging curve of a cell.
    pub fn curve(&self, idx: GridIndex, metric: PerfMetric) -> Vec<f64> {
        self.layers(metric)
            .iter()
            .map(|m| m[[idx.tig_idx, idx.alpha_idx]])
            .collect()
    }

    /// Scores of one iteration as a `[tig][alpha]` matrix.
    pub fn iteration(&self, iteration: usize, metric: PerfMetric) -> ArrayView2<'_, f64> {
        self.layers(metric)[iteration].view()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append the scores of one more bagging iteration.
    ///
    /// # Panics
    ///
    /// If a matrix is not `tig_n × alpha_n`, or `roc` presence does not match
    /// the surface.
    pub fn push_iteration(&mut self, rmse: ArrayView2<'_, f64>, roc: Option<ArrayView2<'_, f64>>) {
        let shape = [self.tig_n, self.alpha_n];
        assert_eq!(rmse.shape(), shape, "rmse layer shape");
        self.rmse.push(rmse.to_owned());
        match (&mut self.roc, roc) {
            (Some(layers), Some(roc)) => {
                assert_eq!(roc.shape(), shape, "roc layer shape");
                layers.push(roc.to_owned());
            }
            (None, None) => {}
            _ => panic!("roc layer presence does not match the surface"),
        }
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Stack layers into a `[tig][alpha][iteration]` array.
    pub fn to_array3(&self, metric: PerfMetric) -> Array3<f64> {
        let layers = self.layers(metric);
        let mut out = Array3::zeros((self.tig_n, self.alpha_n, layers.len()));
        for (b, layer) in layers.iter().enumerate() {
            out.slice_mut(s![.., .., b]).assign(layer);
        }
        out
    }

    /// Write RMSE (then ROC, if present) as fixed-width binary arrays.
    pub fn write_to(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        write_array(writer, &self.to_array3(PerfMetric::Rmse))?;
        if self.roc.is_some() {
            write_array(writer, &self.to_array3(PerfMetric::Roc))?;
        }
        Ok(())
    }

    /// Read a surface written by [`PerformanceSurface::write_to`].
    pub fn read_from(
        reader: &mut dyn Read,
        tig_n: usize,
        alpha_n: usize,
        bag_n: usize,
        metric: PerfMetric,
    ) -> std::io::Result<Self> {
        let mut rmse = Array3::zeros((tig_n, alpha_n, bag_n));
        read_array_into(reader, &mut rmse)?;
        let roc = if metric.higher_is_better() {
            let mut roc = Array3::zeros((tig_n, alpha_n, bag_n));
            read_array_into(reader, &mut roc)?;
            Some(roc)
        } else {
            None
        };
        Ok(Self::from_arrays(&rmse, roc.as_ref()))
    }
}
