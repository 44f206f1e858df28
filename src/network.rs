use crate::dataset::Dataset;
use crate::error::{Result, RnnError};
use crate::loss::LossFunction;
use crate::rnn::{BaseLayer, Layer, Shared};
use crate::scan::scan;
use crate::tensor::{self, Cpu, CpuAutodiff, Matrix};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use rayon::prelude::*;

/// A stack of layers, each unrolled over the whole sequence before the next one runs, plus the
/// loss used to train it.
#[derive(Clone, Debug)]
pub struct RecurrentNetwork {
    layers: Vec<Box<dyn Layer>>,
    loss: LossFunction,
}

/// Average loss and per-step accuracy (outputs rounded to the nearest integer) over a dataset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
}

fn scalar<B: Backend>(value: Tensor<B, 1>) -> f64 {
    value.into_scalar().elem::<f64>()
}

/// Runs `layers` in order over `example` (`time x feature`).
///
/// Each layer starts from its `initial_state()` and is scanned over the time axis of the previous
/// layer's output sequence.
pub fn forward_across_time<B, L>(layers: &[Box<L>], example: Tensor<B, 2>) -> Result<Tensor<B, 2>>
where
    B: Backend,
    L: BaseLayer<B> + ?Sized,
{
    let [steps, _] = example.dims();
    if steps == 0 {
        return Err(RnnError::EmptySequence);
    }

    let device = example.device();
    let mut previous_layer = example;
    for layer in layers.iter() {
        let [_, width] = previous_layer.dims();
        if let Some(n_in) = layer.input_size() {
            if width != n_in {
                return Err(RnnError::ShapeMismatch {
                    context: "layer input width",
                    expected: n_in,
                    actual: width,
                });
            }
        }
        let hidden_state = layer.initial_state(&device);
        let results = scan(previous_layer, hidden_state, |prev_layer, prev_state| {
            layer.forward_time(prev_layer, prev_state)
        })?;
        previous_layer = results.outputs;
    }
    Ok(previous_layer)
}

impl RecurrentNetwork {
    pub fn new(layers: Vec<Box<dyn Layer>>, loss: LossFunction) -> Self {
        RecurrentNetwork { layers, loss }
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn loss_function(&self) -> LossFunction {
        self.loss
    }

    /// All trainable parameters, layer by layer.
    pub fn params(&self) -> Vec<&Shared<Cpu>> {
        self.layers.iter().flat_map(|l| l.params()).collect()
    }

    pub fn num_parameters(&self) -> usize {
        self.params().iter().map(|p| p.len()).sum()
    }

    pub fn forward_across_time(&self, example: &Matrix) -> Result<Matrix> {
        forward_across_time(&self.layers, example.clone())
    }

    pub fn predict(&self, example: &Matrix) -> Result<Matrix> {
        self.forward_across_time(example)
    }

    /// Prediction function bound to the current parameters.
    pub fn predictor(&self) -> impl Fn(&Matrix) -> Result<Matrix> + '_ {
        move |example: &Matrix| self.predict(example)
    }

    /// Sum of the loss over all `(data[i], labels[i])` pairs.
    pub fn prepare_objective(&self, data: &[Matrix], labels: &[Matrix]) -> Result<Objective> {
        Objective::new(Dataset::new(data.to_vec(), labels.to_vec())?)
    }

    /// All parameters flattened into one vector, in `params()` order.
    pub fn parameter_values(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.num_parameters());
        for p in self.params() {
            out.extend(p.values());
        }
        out
    }

    /// Overwrites every parameter from a vector laid out like `parameter_values()`.
    pub fn set_from_vec(&mut self, values: &[f64]) -> Result<()> {
        let expected = self.num_parameters();
        if values.len() != expected {
            return Err(RnnError::ParameterCount {
                expected,
                actual: values.len(),
            });
        }
        let mut rest = values;
        for layer in self.layers.iter_mut() {
            for p in layer.params_mut() {
                let (chunk, tail) = rest.split_at(p.len());
                p.set_values(chunk.to_vec())?;
                rest = tail;
            }
        }
        Ok(())
    }

    /// Average loss and rounded per-step accuracy. Examples are evaluated in parallel.
    pub fn evaluate(&self, dataset: &Dataset) -> Result<Evaluation> {
        if dataset.is_empty() {
            return Err(RnnError::EmptyObjective);
        }
        let per_example: Vec<(f64, usize, usize)> = dataset
            .examples()
            .par_iter()
            .zip(dataset.labels().par_iter())
            .map(|(example, label)| -> Result<(f64, usize, usize)> {
                let output = self.predict(example)?;
                let loss = scalar(self.loss.loss(label.clone(), output.clone())?);
                let label = tensor::values(label);
                let correct = tensor::values(&output)
                    .iter()
                    .zip(label.iter())
                    .filter(|(o, y)| o.round() == **y)
                    .count();
                Ok((loss, correct, label.len()))
            })
            .collect::<Result<Vec<_>>>()?;

        let (loss, correct, total) = per_example
            .iter()
            .fold((0.0, 0, 0), |(l, c, t), (el, ec, et)| (l + el, c + ec, t + et));
        Ok(Evaluation {
            loss: loss / dataset.len() as f64,
            accuracy: if total == 0 {
                0.0
            } else {
                correct as f64 / total as f64
            },
        })
    }
}

/// A training objective: the summed loss of a network over a fixed dataset.
///
/// It holds the data, not the parameters; evaluate it against the network's current state.
#[derive(Clone, Debug)]
pub struct Objective {
    dataset: Dataset,
}

impl Objective {
    pub fn new(dataset: Dataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(RnnError::EmptyObjective);
        }
        Ok(Objective { dataset })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn value(&self, network: &RecurrentNetwork) -> Result<f64> {
        let mut total = 0.0;
        for (example, label) in self.dataset.iter() {
            let output = network.forward_across_time(example)?;
            total += scalar(network.loss.loss(label.clone(), output)?);
        }
        Ok(total)
    }

    /// Objective value and its gradient with respect to every parameter, in the order of
    /// `RecurrentNetwork::parameter_values()`.
    ///
    /// The network is copied onto the autodiff backend with gradient-tracking parameters, the
    /// summed loss is built over every example and one backward pass collects the gradients.
    pub fn value_and_gradient(&self, network: &RecurrentNetwork) -> Result<(f64, Vec<f64>)> {
        let layers: Vec<Box<dyn BaseLayer<CpuAutodiff>>> =
            network.layers.iter().map(|layer| layer.reversible()).collect();

        let mut objective = Tensor::<CpuAutodiff, 1>::zeros([1], &Default::default());
        for (example, label) in self.dataset.iter() {
            let output = forward_across_time(&layers, tensor::lift(example))?;
            objective = objective + network.loss.loss(tensor::lift(label), output)?;
        }

        let grads = objective.backward();
        let mut gradient = Vec::with_capacity(network.num_parameters());
        for layer in layers.iter() {
            for p in layer.params() {
                match p.value().grad(&grads) {
                    Some(g) => gradient.extend(tensor::values(&g)),
                    // The parameter does not reach the loss.
                    None => gradient.extend(std::iter::repeat(0.0).take(p.len())),
                }
            }
        }
        Ok((scalar(objective), gradient))
    }
}
