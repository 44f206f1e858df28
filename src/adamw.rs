use crate::train::Optimizer;

/// Hyperparameters of `AdamW`, built by chaining setters onto `new()`.
#[derive(Clone, Debug, Copy, PartialEq, PartialOrd)]
pub struct AdamWConfiguration {
    pub(crate) beta1: f64,
    pub(crate) beta2: f64,
    pub(crate) epsilon: f64,
    pub(crate) learning_rate: f64,
    pub(crate) weight_decay: f64,
    pub(crate) gradient_clip: f64,
}

impl AdamWConfiguration {
    /// beta1 0.9, beta2 0.999, epsilon 1e-8, learning rate 0.001, no weight decay and no
    /// clipping.
    pub fn new() -> Self {
        AdamWConfiguration {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            learning_rate: 0.001,
            weight_decay: 0.0,
            gradient_clip: f64::INFINITY,
        }
    }

    /// Largest absolute change applied to a single parameter in one step.
    pub fn gradient_clip(self, gradient_clip: f64) -> Self {
        Self {
            gradient_clip,
            ..self
        }
    }

    /// Step size applied to the bias-corrected moment ratio.
    pub fn learning_rate(self, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..self
        }
    }

    /// Decoupled decay: every step also subtracts `learning_rate * weight_decay * p`.
    pub fn weight_decay(self, weight_decay: f64) -> Self {
        Self {
            weight_decay,
            ..self
        }
    }

    /// Decay rate of the running gradient mean.
    pub fn beta1(self, beta1: f64) -> Self {
        Self { beta1, ..self }
    }

    /// Decay rate of the running squared gradient mean.
    pub fn beta2(self, beta2: f64) -> Self {
        Self { beta2, ..self }
    }

    /// Added to the denominator so parameters with no gradient history don't divide by zero.
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }
}

impl Default for AdamWConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

/// AdamW state: first and second moment estimates for every parameter. The moment vectors are
/// sized on the first update.
#[derive(Clone, Debug)]
pub struct AdamW {
    config: AdamWConfiguration,
    first_moment: Vec<f64>,
    second_moment: Vec<f64>,
    iteration: i32,
}

impl AdamW {
    pub fn new(config: AdamWConfiguration) -> Self {
        AdamW {
            config,
            first_moment: vec![],
            second_moment: vec![],
            iteration: 0,
        }
    }

    pub fn configuration(&self) -> &AdamWConfiguration {
        &self.config
    }

    pub fn iteration(&self) -> i32 {
        self.iteration
    }
}

impl Optimizer for AdamW {
    fn update(&mut self, params: &mut [f64], gradient: &[f64]) {
        assert_eq!(params.len(), gradient.len());
        if self.first_moment.len() != params.len() {
            self.first_moment = vec![0.0; params.len()];
            self.second_moment = vec![0.0; params.len()];
            self.iteration = 0;
        }
        self.iteration += 1;

        let c = &self.config;
        let m_correction = 1.0 - c.beta1.powi(self.iteration);
        let v_correction = 1.0 - c.beta2.powi(self.iteration);

        for idx in 0..params.len() {
            let g = gradient[idx];
            self.first_moment[idx] = c.beta1 * self.first_moment[idx] + (1.0 - c.beta1) * g;
            self.second_moment[idx] =
                c.beta2 * self.second_moment[idx] + (1.0 - c.beta2) * g * g;

            let m_hat = self.first_moment[idx] / m_correction;
            let v_hat = self.second_moment[idx] / v_correction;

            let delta = c.learning_rate * m_hat / (v_hat.sqrt() + c.epsilon)
                + c.learning_rate * c.weight_decay * params[idx];
            let delta = delta.max(-c.gradient_clip).min(c.gradient_clip);
            params[idx] -= delta;
        }
    }
}
