use burn::tensor::backend::Backend;
use burn::tensor::{activation, Tensor};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, PartialOrd, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    Tanh,
    /// Logistic sigmoid.
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    /// Normalizes each row; not elementwise.
    Softmax,
}

impl Activation {
    pub fn apply<B: Backend>(&self, xs: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Activation::Identity => xs,
            Activation::Tanh => xs.tanh(),
            Activation::Sigmoid => activation::sigmoid(xs),
            Activation::ReLU => activation::relu(xs),
            Activation::Softmax => activation::softmax(xs, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{from_rows, lift, values, CpuAutodiff};
    use burn::tensor::Tensor;

    #[test]
    fn elementwise_activations() {
        let xs = from_rows(vec![vec![-1.0, 0.0, 2.0]]).unwrap();
        assert_eq!(values(&Activation::Identity.apply(xs.clone())), vec![-1.0, 0.0, 2.0]);
        assert_eq!(values(&Activation::ReLU.apply(xs.clone())), vec![0.0, 0.0, 2.0]);
        let s = values(&Activation::Sigmoid.apply(xs.clone()));
        assert!((s[1] - 0.5).abs() < 1e-12);
        let t = values(&Activation::Tanh.apply(xs));
        assert!((t[2] - 2.0_f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn softmax_sums_to_one_and_is_shift_invariant() {
        let a = values(&Activation::Softmax.apply(from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap()));
        let b = values(
            &Activation::Softmax.apply(from_rows(vec![vec![1001.0, 1002.0, 1003.0]]).unwrap()),
        );
        let total: f64 = a.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn softmax_gradient() {
        // d softmax_0 / d x_0 = s0 (1 - s0), d softmax_0 / d x_1 = -s0 s1
        let xs: Tensor<CpuAutodiff, 2> =
            lift(&from_rows(vec![vec![0.3, -0.7]]).unwrap()).require_grad();
        let out = Activation::Softmax.apply(xs.clone());
        let s0 = out.clone().narrow(1, 0, 1).sum();
        let grads = s0.backward();
        let s = values(&out);
        let g = values(&xs.grad(&grads).unwrap());
        assert!((g[0] - s[0] * (1.0 - s[0])).abs() < 1e-9);
        assert!((g[1] + s[0] * s[1]).abs() < 1e-9);
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&Activation::Sigmoid).unwrap();
        assert_eq!(json, "\"sigmoid\"");
        let back: Activation = serde_json::from_str("\"relu\"").unwrap();
        assert_eq!(back, Activation::ReLU);
    }
}
