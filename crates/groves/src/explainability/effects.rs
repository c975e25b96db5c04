//! Partial dependence and joint effects of a saved ensemble.
//!
//! Synthetic rows are appended to the test partition of the dataset: every
//! attribute missing except the ones being queried. The saved ensemble is
//! streamed member by member and the predictions at those rows are averaged,
//! so any number of attributes (or pairs) costs a single pass over the model.

use std::io::BufRead;

use ndarray::Array2;

use crate::data::{DataSet, Dataset, Quantile};
use crate::error::GroveError;
use crate::io::{ModelError, ModelReader};
use crate::training::EnsembleMember;

use super::density::{DensityAxis, DensityTable};

// =============================================================================
// Results
// =============================================================================

/// One point of a partial dependence curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectPoint {
    /// Training rows represented by the quantile.
    pub count: usize,
    /// Quantile center.
    pub value: f64,
    /// Average ensemble prediction with the attribute fixed to `value`.
    pub effect: f64,
}

/// Partial dependence of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectCurve {
    pub attr: usize,
    pub points: Vec<EffectPoint>,
}

/// Joint effect of an attribute pair.
#[derive(Debug, Clone, PartialEq)]
pub struct JointEffect {
    pub attrs: (usize, usize),
    /// Quantiles of the first attribute (table rows).
    pub rows: Vec<Quantile>,
    /// Quantiles of the second attribute (table columns).
    pub cols: Vec<Quantile>,
    /// `[row][col]` average predictions.
    pub effects: Array2<f64>,
    /// Data density around the quantile points; `None` without observed values.
    pub density: Option<DensityTable>,
}

// =============================================================================
// EffectAnalyzer
// =============================================================================

/// Computes effects of a saved ensemble over a dataset.
///
/// Synthetic rows stay in the dataset's test partition afterwards.
#[derive(Debug)]
pub struct EffectAnalyzer<'a> {
    data: &'a mut Dataset,
}

impl<'a> EffectAnalyzer<'a> {
    pub fn new(data: &'a mut Dataset) -> Self {
        Self { data }
    }

    /// Partial dependence of every attribute in `attrs` on `quant_n` quantiles.
    ///
    /// # Errors
    ///
    /// Unknown attribute ids, a corrupt model stream, or a stream without members.
    pub fn partial_dependence<M, R>(
        &mut self,
        model: &mut ModelReader<R>,
        attrs: &[usize],
        quant_n: usize,
    ) -> Result<Vec<EffectCurve>, GroveError>
    where
        M: EnsembleMember,
        R: BufRead,
    {
        let mut plans = Vec::with_capacity(attrs.len());
        let mut rows = Vec::new();
        for &attr in attrs {
            self.data.check_attr(attr)?;
            let quantiles = self.data.quantiles(attr, quant_n);
            let first = rows.len();
            for q in &quantiles {
                rows.push(self.data.add_test_item(&[(attr, q.value)])?);
            }
            plans.push((attr, quantiles, first));
        }

        let effects = self.average_predictions::<M, R>(model, &rows)?;

        Ok(plans
            .into_iter()
            .map(|(attr, quantiles, first)| EffectCurve {
                attr,
                points: quantiles
                    .iter()
                    .zip(&effects[first..])
                    .map(|(q, &effect)| EffectPoint {
                        count: q.count,
                        value: q.value,
                        effect,
                    })
                    .collect(),
            })
            .collect())
    }

    /// Joint effects of attribute pairs on a `quant_n.0 × quant_n.1` quantile grid.
    ///
    /// `fixed` pins further attributes, by name, to a value in every synthetic row.
    ///
    /// # Errors
    ///
    /// [`GroveError::InactiveAttribute`] for a fixed name that is unknown or not
    /// active, plus everything [`EffectAnalyzer::partial_dependence`] reports.
    pub fn joint_effects<M, R>(
        &mut self,
        model: &mut ModelReader<R>,
        pairs: &[(usize, usize)],
        quant_n: (usize, usize),
        fixed: &[(&str, f64)],
    ) -> Result<Vec<JointEffect>, GroveError>
    where
        M: EnsembleMember,
        R: BufRead,
    {
        let fixed = self.resolve_fixed(fixed)?;

        let mut plans = Vec::with_capacity(pairs.len());
        let mut rows = Vec::new();
        for &(attr1, attr2) in pairs {
            self.data.check_attr(attr1)?;
            self.data.check_attr(attr2)?;
            let q1 = self.data.quantiles(attr1, quant_n.0);
            let q2 = self.data.quantiles(attr2, quant_n.1);
            let first = rows.len();
            for a in &q1 {
                for b in &q2 {
                    let mut overrides = fixed.clone();
                    overrides.push((attr1, a.value));
                    overrides.push((attr2, b.value));
                    rows.push(self.data.add_test_item(&overrides)?);
                }
            }
            plans.push((attr1, attr2, q1, q2, first));
        }

        let predictions = self.average_predictions::<M, R>(model, &rows)?;

        let mut out = Vec::with_capacity(plans.len());
        for (attr1, attr2, q1, q2, first) in plans {
            let cols = q2.len();
            let effects = Array2::from_shape_fn((q1.len(), cols), |(i, j)| predictions[first + i * cols + j]);
            let density = self.density(attr1, attr2, quant_n);
            out.push(JointEffect {
                attrs: (attr1, attr2),
                rows: q1,
                cols: q2,
                effects,
                density,
            });
        }
        Ok(out)
    }

    fn resolve_fixed(&self, fixed: &[(&str, f64)]) -> Result<Vec<(usize, f64)>, GroveError> {
        fixed
            .iter()
            .map(|&(name, value)| match self.data.attr_id(name) {
                Some(attr) if self.data.is_active(attr) => Ok((attr, value)),
                _ => Err(GroveError::InactiveAttribute(name.to_string())),
            })
            .collect()
    }

    fn density(&self, attr1: usize, attr2: usize, quant_n: (usize, usize)) -> Option<DensityTable> {
        let rows = DensityAxis::new(&self.data.values(attr1), quant_n.0)?;
        let cols = DensityAxis::new(&self.data.values(attr2), quant_n.1)?;
        Some(DensityTable::estimate(rows, cols, &self.data.pair_values(attr1, attr2)))
    }

    /// Stream the ensemble and average member predictions at test `rows`.
    fn average_predictions<M, R>(&self, model: &mut ModelReader<R>, rows: &[usize]) -> Result<Vec<f64>, ModelError>
    where
        M: EnsembleMember,
        R: BufRead,
    {
        let data: &Dataset = &*self.data;
        let mut sums = vec![0.0; rows.len()];
        let members = model.for_each_member::<M, _>(|member| {
            for (sum, &row) in sums.iter_mut().zip(rows) {
                *sum += member.predict(data, row, DataSet::Test);
            }
        })?;
        if members == 0 {
            return Err(ModelError::Empty);
        }
        tracing::debug!(members, rows = rows.len(), "averaged ensemble predictions");

        let n = members as f64;
        sums.iter_mut().for_each(|s| *s /= n);
        Ok(sums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainMode;
    use crate::io::{ModelHeader, ModelWriter};
    use crate::testing::SlopeMember;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::io::Cursor;

    fn dataset() -> Dataset {
        // 2 attrs x 8 rows, feature-major
        let train = array![
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]
        ];
        let valid = array![[1.5, 2.5], [0.0, 1.0]];
        Dataset::new(
            train,
            vec![0.0; 8],
            valid,
            vec![0.0; 2],
            vec!["x".into(), "flag".into()],
            7,
        )
        .unwrap()
    }

    fn model(slopes: &[f64]) -> ModelReader<Cursor<Vec<u8>>> {
        let header = ModelHeader::new(TrainMode::Layered, 1, 0.1);
        let mut writer = ModelWriter::new(Vec::new(), header).unwrap();
        for &slope in slopes {
            writer.write_member(&SlopeMember { slope }).unwrap();
        }
        ModelReader::new(Cursor::new(writer.into_inner())).unwrap()
    }

    #[test]
    fn partial_dependence_averages_members() {
        let mut data = dataset();
        let mut analyzer = EffectAnalyzer::new(&mut data);
        let curves = analyzer
            .partial_dependence::<SlopeMember, _>(&mut model(&[1.0, 3.0]), &[0, 1], 8)
            .unwrap();
        assert_eq!(curves.len(), 2);

        let x = &curves[0];
        assert_eq!(x.points.len(), 8);
        for p in &x.points {
            assert_eq!(p.count, 1);
            assert_abs_diff_eq!(p.effect, 2.0 * p.value, epsilon = 1e-12);
        }

        // members only look at attribute 0, which is missing here
        let flag = &curves[1];
        assert_eq!(flag.points.len(), 2);
        assert_eq!(flag.points[0].count, 4);
        assert!(flag.points.iter().all(|p| p.effect == 0.0));
    }

    #[test]
    fn joint_effect_grid_and_density() {
        let mut data = dataset();
        let mut analyzer = EffectAnalyzer::new(&mut data);
        let joint = analyzer
            .joint_effects::<SlopeMember, _>(&mut model(&[2.0]), &[(0, 1)], (4, 2), &[])
            .unwrap();
        let joint = &joint[0];
        assert_eq!(joint.effects.dim(), (joint.rows.len(), joint.cols.len()));
        for (i, q) in joint.rows.iter().enumerate() {
            for j in 0..joint.cols.len() {
                assert_abs_diff_eq!(joint.effects[[i, j]], 2.0 * q.value, epsilon = 1e-12);
            }
        }
        let density = joint.density.as_ref().unwrap();
        let total = density.proportions.sum();
        assert!(total > 0.0 && total <= 1.0 + 1e-12);
    }

    #[test]
    fn fixed_attributes_must_be_active() {
        let mut data = dataset();
        data.ignore_attr(1);
        let mut analyzer = EffectAnalyzer::new(&mut data);
        let err = analyzer
            .joint_effects::<SlopeMember, _>(&mut model(&[1.0]), &[(0, 0)], (2, 2), &[("flag", 1.0)])
            .unwrap_err();
        assert!(matches!(err, GroveError::InactiveAttribute(name) if name == "flag"));

        let err = analyzer
            .joint_effects::<SlopeMember, _>(&mut model(&[1.0]), &[(0, 0)], (2, 2), &[("nope", 1.0)])
            .unwrap_err();
        assert!(matches!(err, GroveError::InactiveAttribute(_)));
    }

    #[test]
    fn fixed_attributes_reach_synthetic_rows() {
        let mut data = dataset();
        let mut analyzer = EffectAnalyzer::new(&mut data);
        let joint = analyzer
            .joint_effects::<SlopeMember, _>(&mut model(&[1.0]), &[(1, 1)], (2, 2), &[("x", 3.0)])
            .unwrap();
        assert!(joint[0].effects.iter().all(|&e| e == 3.0));
    }

    #[test]
    fn empty_model_is_an_error() {
        let mut data = dataset();
        let mut analyzer = EffectAnalyzer::new(&mut data);
        let err = analyzer
            .partial_dependence::<SlopeMember, _>(&mut model(&[]), &[0], 4)
            .unwrap_err();
        assert!(matches!(err, GroveError::Model(ModelError::Empty)));
    }
}
