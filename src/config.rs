use crate::activation::Activation;
use crate::adamw::{AdamW, AdamWConfiguration};
use crate::error::{Result, RnnError};
use crate::loss::LossFunction;
use crate::network::RecurrentNetwork;
use crate::simple::RNNIPLayer;
use crate::stop_condition::StopCondition;
use crate::train::{GradientDescent, Optimizer};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[serde(rename = "gd")]
    GradientDescent,
    #[serde(rename = "adamw")]
    AdamW,
}

impl Default for OptimizerKind {
    fn default() -> Self {
        OptimizerKind::GradientDescent
    }
}

/// Settings of a parity training run. Every field has a default, so a JSON file only needs to
/// name the fields it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfiguration {
    pub learning_rate: f64,
    pub epochs: usize,
    pub report_every: usize,
    pub seed: u64,
    pub train_examples: usize,
    pub test_examples: usize,
    pub hidden_size: usize,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub loss: LossFunction,
    pub optimizer: OptimizerKind,
    pub target_loss: Option<f64>,
    pub plateau_window: Option<usize>,
}

impl Default for TrainingConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingConfiguration {
    pub fn new() -> Self {
        TrainingConfiguration {
            learning_rate: 0.1,
            epochs: 800,
            report_every: 5,
            seed: 10,
            train_examples: 5,
            test_examples: 2,
            hidden_size: 2,
            hidden_activation: Activation::Tanh,
            output_activation: Activation::Sigmoid,
            loss: LossFunction::Squared,
            optimizer: OptimizerKind::GradientDescent,
            target_loss: None,
            plateau_window: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TrainingConfiguration = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn learning_rate(self, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..self
        }
    }

    pub fn epochs(self, epochs: usize) -> Self {
        Self { epochs, ..self }
    }

    pub fn report_every(self, report_every: usize) -> Self {
        Self {
            report_every,
            ..self
        }
    }

    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn hidden_size(self, hidden_size: usize) -> Self {
        Self {
            hidden_size,
            ..self
        }
    }

    pub fn loss(self, loss: LossFunction) -> Self {
        Self { loss, ..self }
    }

    pub fn optimizer(self, optimizer: OptimizerKind) -> Self {
        Self { optimizer, ..self }
    }

    pub fn target_loss(self, target_loss: f64) -> Self {
        Self {
            target_loss: Some(target_loss),
            ..self
        }
    }

    pub fn plateau_window(self, plateau_window: usize) -> Self {
        Self {
            plateau_window: Some(plateau_window),
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(RnnError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(RnnError::Config("epochs must be at least 1".to_string()));
        }
        if self.hidden_size == 0 {
            return Err(RnnError::Config("hidden_size must be at least 1".to_string()));
        }
        if self.train_examples == 0 {
            return Err(RnnError::Config(
                "train_examples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stop_condition(&self) -> StopCondition {
        let mut stop = StopCondition::new(self.epochs);
        if let Some(target) = self.target_loss {
            stop = stop.target_loss(target);
        }
        if let Some(window) = self.plateau_window {
            stop = stop.plateau_window(window);
        }
        stop
    }

    pub fn build_optimizer(&self) -> Box<dyn Optimizer> {
        match self.optimizer {
            OptimizerKind::GradientDescent => Box::new(GradientDescent::new(self.learning_rate)),
            OptimizerKind::AdamW => Box::new(AdamW::new(
                AdamWConfiguration::new().learning_rate(self.learning_rate),
            )),
        }
    }

    /// `RNNIPLayer(1, hidden) -> RNNIPLayer(hidden, 1)`, one input bit and one output per step.
    pub fn build_network<R: Rng + ?Sized>(&self, rng: &mut R) -> RecurrentNetwork {
        RecurrentNetwork::new(
            vec![
                Box::new(RNNIPLayer::new(
                    1,
                    self.hidden_size,
                    self.hidden_activation,
                    rng,
                )),
                Box::new(RNNIPLayer::new(
                    self.hidden_size,
                    1,
                    self.output_activation,
                    rng,
                )),
            ],
            self.loss,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_json_is_default() {
        let config = TrainingConfiguration::from_json_str("{}").unwrap();
        assert_eq!(config, TrainingConfiguration::default());
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.epochs, 800);
        assert_eq!(config.optimizer, OptimizerKind::GradientDescent);
    }

    #[test]
    fn partial_json_overrides() {
        let config = TrainingConfiguration::from_json_str(
            r#"{"epochs": 10, "optimizer": "adamw", "loss": "binary_cross_entropy",
                "hidden_activation": "relu", "target_loss": 0.05}"#,
        )
        .unwrap();
        assert_eq!(config.epochs, 10);
        assert_eq!(config.optimizer, OptimizerKind::AdamW);
        assert_eq!(config.loss, LossFunction::BinaryCrossEntropy);
        assert_eq!(config.hidden_activation, Activation::ReLU);
        assert_eq!(config.target_loss, Some(0.05));
        assert_eq!(config.seed, 10);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(TrainingConfiguration::from_json_str(r#"{"epochs": 0}"#).is_err());
        assert!(TrainingConfiguration::from_json_str(r#"{"learning_rate": -1.0}"#).is_err());
        assert!(TrainingConfiguration::from_json_str(r#"{"optimizer": "sgd"}"#).is_err());
        assert!(TrainingConfiguration::from_json_str("not json").is_err());
        assert!(TrainingConfiguration::from_json_file("/nonexistent/config.json").is_err());
    }

    #[test]
    fn builder_and_stop_condition() {
        let config = TrainingConfiguration::new()
            .epochs(20)
            .target_loss(0.5)
            .plateau_window(4);
        let stop = config.stop_condition();
        assert_eq!(stop.max_epochs(), 20);
        assert!(stop.check(&[0.4]).is_some());
    }

    #[test]
    fn builds_parity_network() {
        let config = TrainingConfiguration::new().hidden_size(3);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let net = config.build_network(&mut rng);
        // 1x3 + 3x3 + 3x1 + 1x1
        assert_eq!(net.num_parameters(), 3 + 9 + 3 + 1);
        assert_eq!(net.loss_function(), LossFunction::Squared);
    }
}
