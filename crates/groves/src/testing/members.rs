use std::io::{Read, Write};

use crate::data::{DataSet, Dataset};
use crate::io::{read_block, write_block, ModelError};
use crate::training::{EnsembleMember, MemberParams};
use crate::utils::Parallelism;

/// Member that predicts the mean target of its bag everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanMember {
    pub value: f64,
}

impl EnsembleMember for MeanMember {
    fn train(data: &Dataset, _params: &MemberParams, _parallelism: Parallelism) -> Self {
        let targets = data.targets(DataSet::Train);
        let bag = data.bag();
        let value = bag.iter().map(|&r| targets[r]).sum::<f64>() / bag.len().max(1) as f64;
        Self { value }
    }

    fn predict(&self, _data: &Dataset, _row: usize, _set: DataSet) -> f64 {
        self.value
    }

    fn save(&self, writer: &mut dyn Write) -> Result<(), ModelError> {
        write_block(writer, &self.value)
    }

    fn load(reader: &mut dyn Read, _params: &MemberParams) -> Result<Self, ModelError> {
        Ok(Self { value: read_block(reader)? })
    }
}

/// Member predicting `slope × x0`, with a missing `x0` contributing nothing.
///
/// Training fits the slope by least squares through the origin on the bag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeMember {
    pub slope: f64,
}

impl EnsembleMember for SlopeMember {
    fn train(data: &Dataset, _params: &MemberParams, _parallelism: Parallelism) -> Self {
        let targets = data.targets(DataSet::Train);
        let (xy, xx) = data.bag().iter().fold((0.0, 0.0), |(xy, xx), &r| {
            let x = data.value(r, 0, DataSet::Train);
            (xy + x * targets[r], xx + x * x)
        });
        let slope = if xx > 0.0 { xy / xx } else { 0.0 };
        Self { slope }
    }

    fn predict(&self, data: &Dataset, row: usize, set: DataSet) -> f64 {
        let x = data.value(row, 0, set);
        if x.is_nan() {
            0.0
        } else {
            self.slope * x
        }
    }

    fn save(&self, writer: &mut dyn Write) -> Result<(), ModelError> {
        write_block(writer, &self.slope)
    }

    fn load(reader: &mut dyn Read, _params: &MemberParams) -> Result<Self, ModelError> {
        Ok(Self { slope: read_block(reader)? })
    }
}

/// Member that predicts the true target shifted by a penalty per ignored attribute.
///
/// Validation RMSE equals the summed penalties of the inactive attributes
/// exactly, with zero spread across repeats. Training looks at nothing but
/// the active set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyMember {
    pub offset: f64,
}

impl PenaltyMember {
    /// `(attr, penalty)` pairs; attributes not listed cost nothing.
    pub const PENALTIES: [(usize, f64); 2] = [(0, 0.3), (2, 0.01)];
}

impl EnsembleMember for PenaltyMember {
    fn train(data: &Dataset, _params: &MemberParams, _parallelism: Parallelism) -> Self {
        let offset = Self::PENALTIES
            .iter()
            .filter(|&&(attr, _)| !data.is_active(attr))
            .map(|&(_, penalty)| penalty)
            .sum();
        Self { offset }
    }

    fn predict(&self, data: &Dataset, row: usize, set: DataSet) -> f64 {
        data.targets(set)[row] + self.offset
    }

    fn save(&self, writer: &mut dyn Write) -> Result<(), ModelError> {
        write_block(writer, &self.offset)
    }

    fn load(reader: &mut dyn Read, _params: &MemberParams) -> Result<Self, ModelError> {
        Ok(Self { offset: read_block(reader)? })
    }
}
