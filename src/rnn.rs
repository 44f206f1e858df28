use crate::error::Result;
use crate::tensor::{self, Cpu, CpuAutodiff};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

static LAYER_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Hands out sequential layer ids. They are only used to name parameters.
pub fn next_layer_id() -> usize {
    LAYER_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A named, trainable parameter matrix.
#[derive(Clone, Debug)]
pub struct Shared<B: Backend> {
    name: String,
    value: Tensor<B, 2>,
}

impl<B: Backend> Shared<B> {
    pub fn new<S: Into<String>>(name: S, value: Tensor<B, 2>) -> Self {
        Shared {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Tensor<B, 2> {
        &self.value
    }

    pub fn dims(&self) -> [usize; 2] {
        self.value.dims()
    }

    pub fn len(&self) -> usize {
        let [rows, cols] = self.dims();
        rows * cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<f64> {
        tensor::values(&self.value)
    }

    /// Replaces the entries, keeping the shape.
    pub fn set_values(&mut self, values: Vec<f64>) -> Result<()> {
        let [rows, cols] = self.dims();
        self.value = tensor::matrix(rows, cols, values, &self.value.device())?;
        Ok(())
    }
}

impl Shared<Cpu> {
    /// Copy of this parameter that records gradients.
    pub fn reversible(&self) -> Shared<CpuAutodiff> {
        Shared {
            name: self.name.clone(),
            value: tensor::lift(&self.value).require_grad(),
        }
    }
}

/// Per-timestep contract every layer satisfies.
///
/// A forward pass over a sequence starts from `initial_state()` and calls `forward_time()` once
/// per time step, feeding the returned state into the next call. Activations and states are
/// `1 x width` rows.
pub trait BaseLayer<B: Backend> {
    fn layer_id(&self) -> usize;

    /// Runs one layer for one time step. Returns `(next_layer, next_state)`.
    fn forward_time(
        &self,
        prev_layer: Tensor<B, 2>,
        prev_state: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>);

    fn initial_state(&self, device: &B::Device) -> Tensor<B, 2>;

    /// Trainable parameters.
    fn params(&self) -> Vec<&Shared<B>> {
        vec![]
    }

    /// Width of the activations this layer consumes. `None` if it takes any width.
    fn input_size(&self) -> Option<usize>;

    /// Width of the activations this layer produces. `None` if it matches the input.
    fn output_size(&self) -> Option<usize>;
}

/// A layer as stored in a `RecurrentNetwork`, on the `Cpu` backend.
pub trait Layer: BaseLayer<Cpu> + Send + Sync + fmt::Debug {
    /// Copy of this layer whose parameters record gradients. Parameter order is the same as
    /// `params()`.
    fn reversible(&self) -> Box<dyn BaseLayer<CpuAutodiff>>;

    fn params_mut(&mut self) -> Vec<&mut Shared<Cpu>>;

    fn boxed_clone(&self) -> Box<dyn Layer>;
}

impl Clone for Box<dyn Layer> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Zero-width state of stateless layers.
pub fn empty_state<B: Backend>(device: &B::Device) -> Tensor<B, 2> {
    Tensor::zeros([1, 0], device)
}

/// A stateless transform.
///
/// Wrap it in `FeedForward` to use it where a `BaseLayer` is expected.
pub trait FeedForwardLayer<B: Backend> {
    fn layer_id(&self) -> usize;

    fn forward(&self, prev_layer: Tensor<B, 2>) -> Tensor<B, 2>;

    fn params(&self) -> Vec<&Shared<B>> {
        vec![]
    }

    fn input_size(&self) -> Option<usize>;
    fn output_size(&self) -> Option<usize>;
}

/// Adapter running a `FeedForwardLayer` as a per-timestep layer. Its state is empty and ignored.
#[derive(Clone, Debug)]
pub struct FeedForward<L>(pub L);

impl<L> FeedForward<L> {
    pub fn inner(&self) -> &L {
        &self.0
    }

    pub fn into_inner(self) -> L {
        self.0
    }
}

impl<B: Backend, L: FeedForwardLayer<B>> BaseLayer<B> for FeedForward<L> {
    fn layer_id(&self) -> usize {
        self.0.layer_id()
    }

    fn forward_time(
        &self,
        prev_layer: Tensor<B, 2>,
        prev_state: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        (self.0.forward(prev_layer), prev_state)
    }

    fn initial_state(&self, device: &B::Device) -> Tensor<B, 2> {
        empty_state(device)
    }

    fn params(&self) -> Vec<&Shared<B>> {
        self.0.params()
    }

    fn input_size(&self) -> Option<usize> {
        self.0.input_size()
    }

    fn output_size(&self) -> Option<usize> {
        self.0.output_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{from_rows, values};

    #[derive(Debug)]
    struct Doubler {
        id: usize,
    }

    impl<B: Backend> FeedForwardLayer<B> for Doubler {
        fn layer_id(&self) -> usize {
            self.id
        }

        fn forward(&self, prev_layer: Tensor<B, 2>) -> Tensor<B, 2> {
            prev_layer.mul_scalar(2.0)
        }

        fn input_size(&self) -> Option<usize> {
            None
        }

        fn output_size(&self) -> Option<usize> {
            None
        }
    }

    #[test]
    fn layer_ids_are_sequential() {
        let a = next_layer_id();
        let b = next_layer_id();
        assert!(b > a);
    }

    #[test]
    fn feed_forward_adapter_ignores_state() {
        let layer = FeedForward(Doubler { id: 7 });
        let base: &dyn BaseLayer<Cpu> = &layer;
        let device = Default::default();
        assert_eq!(base.initial_state(&device).dims(), [1, 0]);
        let x = from_rows(vec![vec![1.0, -2.0]]).unwrap();
        let (out, state) = base.forward_time(x, base.initial_state(&device));
        assert_eq!(values(&out), vec![2.0, -4.0]);
        assert_eq!(state.dims(), [1, 0]);
        assert_eq!(base.layer_id(), 7);
        assert!(base.params().is_empty());
    }

    #[test]
    fn shared_reversible_keeps_name_and_values() {
        let p = Shared::new("w", from_rows(vec![vec![0.5, -0.5]]).unwrap());
        let r = p.reversible();
        assert_eq!(r.name(), "w");
        assert_eq!(r.values(), p.values());
        assert_eq!(r.dims(), [1, 2]);
    }

    #[test]
    fn set_values_keeps_shape() {
        let mut p = Shared::new("w", from_rows(vec![vec![0.0, 0.0], vec![0.0, 0.0]]).unwrap());
        p.set_values(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(p.dims(), [2, 2]);
        assert_eq!(p.values(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(p.set_values(vec![1.0]).is_err());
    }
}
