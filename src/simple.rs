use crate::activation::Activation;
use crate::rnn::*;
use crate::tensor::{self, Cpu, CpuAutodiff};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::Rng;

/// Feedforward inner product layer: `x . W + b`.
#[derive(Clone, Debug)]
pub struct FFIPLayer<B: Backend> {
    layer_id: usize,
    w: Shared<B>,
    b: Shared<B>,
}

impl FFIPLayer<Cpu> {
    pub fn new<R: Rng + ?Sized>(n_in: usize, n_out: usize, rng: &mut R) -> Self {
        let layer_id = next_layer_id();
        FFIPLayer {
            layer_id,
            w: Shared::new(
                format!("ff_ip_w_{}", layer_id),
                tensor::randn(n_in, n_out, rng),
            ),
            b: Shared::new(format!("b_ip{}", layer_id), tensor::randn(1, n_out, rng)),
        }
    }

    pub fn reversible(&self) -> FFIPLayer<CpuAutodiff> {
        FFIPLayer {
            layer_id: self.layer_id,
            w: self.w.reversible(),
            b: self.b.reversible(),
        }
    }
}

impl<B: Backend> FeedForwardLayer<B> for FFIPLayer<B> {
    fn layer_id(&self) -> usize {
        self.layer_id
    }

    fn forward(&self, prev_layer: Tensor<B, 2>) -> Tensor<B, 2> {
        prev_layer.matmul(self.w.value().clone()) + self.b.value().clone()
    }

    fn params(&self) -> Vec<&Shared<B>> {
        vec![&self.w, &self.b]
    }

    fn input_size(&self) -> Option<usize> {
        Some(self.w.dims()[0])
    }

    fn output_size(&self) -> Option<usize> {
        Some(self.w.dims()[1])
    }
}

impl Layer for FeedForward<FFIPLayer<Cpu>> {
    fn reversible(&self) -> Box<dyn BaseLayer<CpuAutodiff>> {
        Box::new(FeedForward(self.0.reversible()))
    }

    fn params_mut(&mut self) -> Vec<&mut Shared<Cpu>> {
        vec![&mut self.0.w, &mut self.0.b]
    }

    fn boxed_clone(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}

/// Applies an activation function to the current activations.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivationLayer {
    layer_id: usize,
    act: Activation,
}

impl ActivationLayer {
    pub fn new(act: Activation) -> Self {
        ActivationLayer {
            layer_id: next_layer_id(),
            act,
        }
    }

    pub fn activation(&self) -> Activation {
        self.act
    }
}

impl<B: Backend> FeedForwardLayer<B> for ActivationLayer {
    fn layer_id(&self) -> usize {
        self.layer_id
    }

    fn forward(&self, prev_layer: Tensor<B, 2>) -> Tensor<B, 2> {
        self.act.apply(prev_layer)
    }

    fn input_size(&self) -> Option<usize> {
        None
    }

    fn output_size(&self) -> Option<usize> {
        None
    }
}

impl Layer for FeedForward<ActivationLayer> {
    fn reversible(&self) -> Box<dyn BaseLayer<CpuAutodiff>> {
        Box::new(self.clone())
    }

    fn params_mut(&mut self) -> Vec<&mut Shared<Cpu>> {
        vec![]
    }

    fn boxed_clone(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}

/// Recurrent inner product layer.
///
/// ```text
/// state'  = W_r . state
/// output  = act(x . W_ff + state')
/// ```
///
/// The output is also the next state. There is no bias.
#[derive(Clone, Debug)]
pub struct RNNIPLayer<B: Backend> {
    layer_id: usize,
    n_out: usize,
    w_ff: Shared<B>,
    w_r: Shared<B>,
    act: Activation,
}

impl RNNIPLayer<Cpu> {
    pub fn new<R: Rng + ?Sized>(n_in: usize, n_out: usize, act: Activation, rng: &mut R) -> Self {
        let layer_id = next_layer_id();
        RNNIPLayer {
            layer_id,
            n_out,
            w_ff: Shared::new(
                format!("rnn_ip_wff_{}", layer_id),
                tensor::randn(n_in, n_out, rng),
            ),
            w_r: Shared::new(
                format!("rnn_ip_wr_{}", layer_id),
                tensor::randn(n_out, n_out, rng),
            ),
            act,
        }
    }

    pub fn reversible(&self) -> RNNIPLayer<CpuAutodiff> {
        RNNIPLayer {
            layer_id: self.layer_id,
            n_out: self.n_out,
            w_ff: self.w_ff.reversible(),
            w_r: self.w_r.reversible(),
            act: self.act,
        }
    }
}

impl<B: Backend> RNNIPLayer<B> {
    pub fn activation(&self) -> Activation {
        self.act
    }
}

impl<B: Backend> BaseLayer<B> for RNNIPLayer<B> {
    fn layer_id(&self) -> usize {
        self.layer_id
    }

    fn forward_time(
        &self,
        prev_layer: Tensor<B, 2>,
        prev_state: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        // The state is a row, so W_r . s is s . W_r^T.
        let new_state = prev_state.matmul(self.w_r.value().clone().transpose());
        let output = self
            .act
            .apply(prev_layer.matmul(self.w_ff.value().clone()) + new_state);
        (output.clone(), output)
    }

    fn initial_state(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([1, self.n_out], device)
    }

    fn params(&self) -> Vec<&Shared<B>> {
        vec![&self.w_ff, &self.w_r]
    }

    fn input_size(&self) -> Option<usize> {
        Some(self.w_ff.dims()[0])
    }

    fn output_size(&self) -> Option<usize> {
        Some(self.n_out)
    }
}

impl Layer for RNNIPLayer<Cpu> {
    fn reversible(&self) -> Box<dyn BaseLayer<CpuAutodiff>> {
        Box::new(RNNIPLayer::reversible(self))
    }

    fn params_mut(&mut self) -> Vec<&mut Shared<Cpu>> {
        vec![&mut self.w_ff, &mut self.w_r]
    }

    fn boxed_clone(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
