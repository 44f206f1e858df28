/*
 * LSTM layer with input, forget and output gates (no peepholes).
 *
 * The pre-activations of all four blocks come from one affine map of the input and the previous
 * hidden output:
 *
 *   z = x . W_x + h . W_h + b          (4 * n_out entries)
 *
 * laid out as [candidate | input gate | forget gate | output gate]. Then
 *
 *   c' = sigmoid(z_f) * c + sigmoid(z_i) * tanh(z_g)
 *   h' = sigmoid(z_o) * tanh(c')
 *
 * The carried state is [h; c]; the layer output is h.
 */

use crate::rnn::*;
use crate::tensor::{self, Cpu, CpuAutodiff};
use burn::tensor::backend::Backend;
use burn::tensor::{activation, Tensor};
use rand::Rng;

#[derive(Clone, Debug)]
pub struct LSTMLayer<B: Backend> {
    layer_id: usize,
    n_out: usize,
    w_x: Shared<B>,
    w_h: Shared<B>,
    b: Shared<B>,
}

impl LSTMLayer<Cpu> {
    pub fn new<R: Rng + ?Sized>(n_in: usize, n_out: usize, rng: &mut R) -> Self {
        let layer_id = next_layer_id();
        let scale = 1.0 / ((n_in + n_out) as f64).sqrt();

        let w_x = tensor::randn(n_in, 4 * n_out, rng).mul_scalar(scale);
        let w_h = tensor::randn(n_out, 4 * n_out, rng).mul_scalar(scale);

        // Start with the forget gate open.
        let mut bias = vec![0.0; 4 * n_out];
        for v in bias[2 * n_out..3 * n_out].iter_mut() {
            *v = 1.0;
        }
        let b = tensor::row(bias);

        LSTMLayer {
            layer_id,
            n_out,
            w_x: Shared::new(format!("lstm_wx_{}", layer_id), w_x),
            w_h: Shared::new(format!("lstm_wh_{}", layer_id), w_h),
            b: Shared::new(format!("lstm_b_{}", layer_id), b),
        }
    }

    pub fn reversible(&self) -> LSTMLayer<CpuAutodiff> {
        LSTMLayer {
            layer_id: self.layer_id,
            n_out: self.n_out,
            w_x: self.w_x.reversible(),
            w_h: self.w_h.reversible(),
            b: self.b.reversible(),
        }
    }
}

impl<B: Backend> BaseLayer<B> for LSTMLayer<B> {
    fn layer_id(&self) -> usize {
        self.layer_id
    }

    fn forward_time(
        &self,
        prev_layer: Tensor<B, 2>,
        prev_state: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let n = self.n_out;
        assert_eq!(prev_state.dims()[1], 2 * n);
        let h = prev_state.clone().narrow(1, 0, n);
        let c = prev_state.narrow(1, n, n);

        let z = prev_layer.matmul(self.w_x.value().clone())
            + h.matmul(self.w_h.value().clone())
            + self.b.value().clone();

        let block = |k: usize| z.clone().narrow(1, k * n, n);
        let candidate = block(0).tanh();
        let input_gate = activation::sigmoid(block(1));
        let forget_gate = activation::sigmoid(block(2));
        let output_gate = activation::sigmoid(block(3));

        let cell = forget_gate * c + input_gate * candidate;
        let hidden = output_gate * cell.clone().tanh();
        let state = Tensor::cat(vec![hidden.clone(), cell], 1);
        (hidden, state)
    }

    fn initial_state(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([1, 2 * self.n_out], device)
    }

    fn params(&self) -> Vec<&Shared<B>> {
        vec![&self.w_x, &self.w_h, &self.b]
    }

    fn input_size(&self) -> Option<usize> {
        Some(self.w_x.dims()[0])
    }

    fn output_size(&self) -> Option<usize> {
        Some(self.n_out)
    }
}

impl Layer for LSTMLayer<Cpu> {
    fn reversible(&self) -> Box<dyn BaseLayer<CpuAutodiff>> {
        Box::new(LSTMLayer::reversible(self))
    }

    fn params_mut(&mut self) -> Vec<&mut Shared<Cpu>> {
        vec![&mut self.w_x, &mut self.w_h, &mut self.b]
    }

    fn boxed_clone(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
