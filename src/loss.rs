use crate::error::{Result, RnnError};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

const CROSS_ENTROPY_EPSILON: f64 = 1e-7;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum LossFunction {
    /// Sum of squared differences over every time step and unit.
    Squared,
    /// Binary cross-entropy; outputs are expected to be probabilities.
    BinaryCrossEntropy,
}

impl Default for LossFunction {
    fn default() -> Self {
        LossFunction::Squared
    }
}

impl LossFunction {
    /// Loss of `output` against `label` as a one-element tensor.
    pub fn loss<B: Backend>(
        &self,
        label: Tensor<B, 2>,
        output: Tensor<B, 2>,
    ) -> Result<Tensor<B, 1>> {
        let [label_rows, label_cols] = label.dims();
        let [output_rows, output_cols] = output.dims();
        if label_rows != output_rows {
            return Err(RnnError::ShapeMismatch {
                context: "loss time steps",
                expected: label_rows,
                actual: output_rows,
            });
        }
        if label_cols != output_cols {
            return Err(RnnError::ShapeMismatch {
                context: "loss output width",
                expected: label_cols,
                actual: output_cols,
            });
        }

        let total = match self {
            LossFunction::Squared => {
                let diff = label - output;
                (diff.clone() * diff).sum()
            }
            LossFunction::BinaryCrossEntropy => {
                // Outside the clamp the derivative is zero, like a hard clip.
                let p = output.clamp(CROSS_ENTROPY_EPSILON, 1.0 - CROSS_ENTROPY_EPSILON);
                let not_label = label.clone().neg().add_scalar(1.0);
                let not_p = p.clone().neg().add_scalar(1.0);
                (label * p.log() + not_label * not_p.log()).sum().neg()
            }
        };
        Ok(total)
    }
}
