//! Data density around joint-effect quantile points.
//!
//! Each attribute axis is cut into blocks centred on small quantiles of the
//! pooled train and validation values. A block is the triple
//! `(lower, center, upper)`; adjacent blocks share a border. The outermost
//! half-quantiles fall outside every block and are not counted.

use ndarray::Array2;

/// One block of a density axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityBlock {
    pub lower: f64,
    pub center: f64,
    pub upper: f64,
    lower_closed: bool,
    upper_closed: bool,
}

impl DensityBlock {
    fn contains(&self, v: f64) -> bool {
        let above = v > self.lower || (self.lower_closed && v == self.lower);
        let below = v < self.upper || (self.upper_closed && v == self.upper);
        above && below
    }
}

/// Blocks of one attribute, ordered by value.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityAxis {
    blocks: Vec<DensityBlock>,
}

impl DensityAxis {
    /// Build the axis from sorted values for `quant_n` requested quantiles.
    ///
    /// `2 * quant_n + 1` small quantiles are taken at equal rank distances;
    /// every odd one is a block center. Consecutive blocks with the same
    /// center are merged. Returns `None` for empty input or `quant_n == 0`.
    pub fn new(sorted: &[f64], quant_n: usize) -> Option<Self> {
        if sorted.is_empty() || quant_n == 0 {
            return None;
        }
        let squant_n = 2 * quant_n + 1;
        let last = sorted.len() - 1;
        let small: Vec<f64> = (0..squant_n).map(|k| sorted[last * (k + 1) / (squant_n + 1)]).collect();

        let mut blocks: Vec<DensityBlock> = Vec::with_capacity(quant_n);
        for q in 0..quant_n {
            let (lower, center, upper) = (small[2 * q], small[2 * q + 1], small[2 * q + 2]);
            match blocks.last_mut() {
                Some(prev) if prev.center == center => prev.upper = upper,
                _ => blocks.push(DensityBlock {
                    lower,
                    center,
                    upper,
                    lower_closed: true,
                    upper_closed: false,
                }),
            }
        }

        // a shared border goes to the lower block only when it is that block's center
        for b in 0..blocks.len() - 1 {
            if blocks[b].center == blocks[b].upper {
                blocks[b].upper_closed = true;
                blocks[b + 1].lower_closed = false;
            }
        }
        if let Some(last) = blocks.last_mut() {
            last.upper_closed = true;
        }
        Some(Self { blocks })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[DensityBlock] {
        &self.blocks
    }

    /// Lower border of every block followed by the upper border of the last.
    pub fn borders(&self) -> Vec<f64> {
        let mut borders: Vec<f64> = self.blocks.iter().map(|b| b.lower).collect();
        borders.extend(self.blocks.last().map(|b| b.upper));
        borders
    }

    /// Index of the block containing `v`, `None` outside the axis (or NaN).
    pub fn block_of(&self, v: f64) -> Option<usize> {
        self.blocks.iter().position(|b| b.contains(v))
    }
}

/// Proportion of points per pair of blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityTable {
    pub rows: DensityAxis,
    pub cols: DensityAxis,
    /// `[row block][col block]`, normalized by the total number of points.
    pub proportions: Array2<f64>,
}

impl DensityTable {
    /// Classify `points` into the blocks of the two axes.
    pub fn estimate(rows: DensityAxis, cols: DensityAxis, points: &[(f64, f64)]) -> Self {
        let mut proportions = Array2::zeros((rows.len(), cols.len()));
        for &(v1, v2) in points {
            if let (Some(b1), Some(b2)) = (rows.block_of(v1), cols.block_of(v2)) {
                proportions[[b1, b2]] += 1.0;
            }
        }
        if !points.is_empty() {
            proportions /= points.len() as f64;
        }
        Self {
            rows,
            cols,
            proportions,
        }
    }
}
