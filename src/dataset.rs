use crate::error::{Result, RnnError};
use crate::tensor::{self, Matrix};
use rand::Rng;

/// Shortest and (exclusive) longest generated parity sequence.
pub const PARITY_MIN_LEN: usize = 3;
pub const PARITY_MAX_LEN: usize = 10;

/// Training examples paired with labels. Each example is a `time x feature` matrix and its label
/// spans the same number of time steps.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    examples: Vec<Matrix>,
    labels: Vec<Matrix>,
}

impl Dataset {
    pub fn new(examples: Vec<Matrix>, labels: Vec<Matrix>) -> Result<Self> {
        if examples.len() != labels.len() {
            return Err(RnnError::DatasetMismatch {
                examples: examples.len(),
                labels: labels.len(),
            });
        }
        for (example, label) in examples.iter().zip(labels.iter()) {
            let [example_steps, _] = example.dims();
            let [label_steps, _] = label.dims();
            if example_steps != label_steps {
                return Err(RnnError::ShapeMismatch {
                    context: "label time steps",
                    expected: example_steps,
                    actual: label_steps,
                });
            }
        }
        Ok(Dataset { examples, labels })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[Matrix] {
        &self.examples
    }

    pub fn labels(&self) -> &[Matrix] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Matrix, &Matrix)> {
        self.examples.iter().zip(self.labels.iter())
    }
}

/// Running parity (cumulative sum mod 2) of a bit sequence.
pub fn parity_labels(bits: &[f64]) -> Vec<f64> {
    bits.iter()
        .scan(0.0, |acc, bit| {
            *acc = (*acc + bit) % 2.0;
            Some(*acc)
        })
        .collect()
}

/// Generates `num` random bit sequences, each `N x 1` with `N` in `[3, 10)`, labelled with their
/// running parity.
pub fn generate_parity_data<R: Rng + ?Sized>(num: usize, rng: &mut R) -> Dataset {
    let mut examples = Vec::with_capacity(num);
    let mut labels = Vec::with_capacity(num);
    for _ in 0..num {
        let n: usize = rng.random_range(PARITY_MIN_LEN..PARITY_MAX_LEN);
        let bits: Vec<f64> = (0..n).map(|_| rng.random_range(0..2) as f64).collect();
        let parity = parity_labels(&bits);
        examples.push(tensor::column(bits));
        labels.push(tensor::column(parity));
    }
    Dataset { examples, labels }
}
