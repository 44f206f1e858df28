use crate::error::{Result, RnnError};
use crate::network::{Objective, RecurrentNetwork};
use crate::stop_condition::{StopCondition, StopReason};
use crate::tensor::Matrix;
use tracing::{debug, info, warn};

/// Something that can be flattened into a parameter vector and rebuilt from one.
///
/// `to_vec` also returns whatever `from_vec` needs besides the numbers (the layout).
pub trait Vectorizable: Sized {
    type Context;

    fn to_vec(&self) -> (Vec<f64>, Self::Context);
    fn from_vec(vec: &[f64], ctx: &Self::Context) -> Result<Self>;
}

/// The context is a copy of the network itself: layer types, shapes and activations.
impl Vectorizable for RecurrentNetwork {
    type Context = RecurrentNetwork;

    fn to_vec(&self) -> (Vec<f64>, Self::Context) {
        (self.parameter_values(), self.clone())
    }

    fn from_vec(vec: &[f64], ctx: &Self::Context) -> Result<Self> {
        let mut network = ctx.clone();
        network.set_from_vec(vec)?;
        Ok(network)
    }
}

/// Something with a flat parameter vector and a differentiable objective.
pub trait Trainable: Vectorizable {
    type Args;

    /// Objective value and its gradient, in `to_vec()` order.
    fn objective(&self, args: &Self::Args) -> Result<(f64, Vec<f64>)>;
}

impl Trainable for RecurrentNetwork {
    type Args = Objective;

    fn objective(&self, args: &Objective) -> Result<(f64, Vec<f64>)> {
        args.value_and_gradient(self)
    }
}

pub trait Optimizer {
    fn update(&mut self, params: &mut [f64], gradient: &[f64]);
}

/// Plain gradient descent: `p <- p - eta * g`.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct GradientDescent {
    pub eta: f64,
}

impl GradientDescent {
    pub fn new(eta: f64) -> Self {
        GradientDescent { eta }
    }
}

impl Optimizer for GradientDescent {
    fn update(&mut self, params: &mut [f64], gradient: &[f64]) {
        assert_eq!(params.len(), gradient.len());
        for (p, g) in params.iter_mut().zip(gradient.iter()) {
            *p -= self.eta * g;
        }
    }
}

/// One optimization step. Returns the objective as it was before the update.
pub fn step<T, O>(trainable: &mut T, args: &T::Args, optimizer: &mut O) -> Result<f64>
where
    T: Trainable,
    O: Optimizer + ?Sized,
{
    let (value, gradient) = trainable.objective(args)?;
    let (mut params, ctx) = trainable.to_vec();
    if gradient.len() != params.len() {
        return Err(RnnError::ParameterCount {
            expected: params.len(),
            actual: gradient.len(),
        });
    }
    optimizer.update(&mut params, &gradient);
    *trainable = T::from_vec(&params, &ctx)?;
    Ok(value)
}

/// Gradient descent step function with learning rate `eta`; the data is passed on every call.
pub fn train_gd<T: Trainable>(eta: f64) -> impl FnMut(&mut T, &T::Args) -> Result<f64> {
    let mut optimizer = GradientDescent::new(eta);
    move |trainable: &mut T, args: &T::Args| step(trainable, args, &mut optimizer)
}

/// Gradient descent step function with the training data baked in.
///
/// The data is validated here, so a mismatched dataset fails before any training happens.
pub fn train_gd_host(
    network: &RecurrentNetwork,
    data: &[Matrix],
    labels: &[Matrix],
    eta: f64,
) -> Result<impl FnMut(&mut RecurrentNetwork) -> Result<f64>> {
    let objective = network.prepare_objective(data, labels)?;
    for p in network.params() {
        let [rows, cols] = p.dims();
        debug!("Parameter {} {}x{}", p.name(), rows, cols);
    }
    let mut train = train_gd::<RecurrentNetwork>(eta);
    Ok(move |network: &mut RecurrentNetwork| train(network, &objective))
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub epochs: usize,
    pub final_loss: f64,
    pub losses: Vec<f64>,
    pub stop_reason: StopReason,
}

/// Repeats `step` until `stop` says otherwise. Logs the loss every `report_every` epochs
/// (never if 0).
pub fn fit<T, O>(
    trainable: &mut T,
    args: &T::Args,
    optimizer: &mut O,
    stop: &StopCondition,
    report_every: usize,
) -> Result<TrainingReport>
where
    T: Trainable,
    O: Optimizer + ?Sized,
{
    fit_steps(
        trainable,
        |trainable: &mut T| step(trainable, args, &mut *optimizer),
        stop,
        report_every,
    )
}

/// Like `fit`, for a ready-made step function such as the one `train_gd_host` returns.
pub fn fit_steps<T, F>(
    trainable: &mut T,
    mut train: F,
    stop: &StopCondition,
    report_every: usize,
) -> Result<TrainingReport>
where
    T: ?Sized,
    F: FnMut(&mut T) -> Result<f64>,
{
    let mut losses = Vec::new();
    loop {
        let loss = train(trainable)?;
        let epoch = losses.len();
        losses.push(loss);
        if report_every > 0 && epoch % report_every == 0 {
            info!("Epoch {}: loss {}", epoch, loss);
        }

        if let Some(stop_reason) = stop.check(&losses) {
            if stop_reason == StopReason::Diverged {
                warn!("Stopping after {} epochs: {}", losses.len(), stop_reason);
            } else {
                info!("Stopping after {} epochs: {}", losses.len(), stop_reason);
            }
            return Ok(TrainingReport {
                epochs: losses.len(),
                final_loss: loss,
                losses,
                stop_reason,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::dataset::generate_parity_data;
    use crate::loss::LossFunction;
    use crate::simple::RNNIPLayer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn parity_network(rng: &mut StdRng) -> RecurrentNetwork {
        RecurrentNetwork::new(
            vec![
                Box::new(RNNIPLayer::new(1, 2, Activation::Tanh, rng)),
                Box::new(RNNIPLayer::new(2, 1, Activation::Sigmoid, rng)),
            ],
            LossFunction::Squared,
        )
    }

    // Minimize (x - 3)^2.
    struct Parabola {
        x: f64,
    }

    impl Vectorizable for Parabola {
        type Context = ();

        fn to_vec(&self) -> (Vec<f64>, ()) {
            (vec![self.x], ())
        }

        fn from_vec(vec: &[f64], _ctx: &()) -> Result<Self> {
            Ok(Parabola { x: vec[0] })
        }
    }

    impl Trainable for Parabola {
        type Args = f64;

        fn objective(&self, target: &f64) -> Result<(f64, Vec<f64>)> {
            let d = self.x - target;
            Ok((d * d, vec![2.0 * d]))
        }
    }

    #[test]
    fn gd_step_matches_formula() {
        let mut p = Parabola { x: 0.0 };
        let mut train = train_gd::<Parabola>(0.25);
        let before = train(&mut p, &3.0).unwrap();
        assert_eq!(before, 9.0);
        // 0 - 0.25 * 2 * (0 - 3)
        assert_eq!(p.x, 1.5);
    }

    #[test]
    fn gd_step_updates_network_parameters() {
        let mut rng = StdRng::seed_from_u64(20);
        let mut net = parity_network(&mut rng);
        let data = generate_parity_data(3, &mut rng);
        let obj = net
            .prepare_objective(data.examples(), data.labels())
            .unwrap();
        let before = net.parameter_values();
        let (_, gradient) = obj.value_and_gradient(&net).unwrap();

        let mut train = train_gd::<RecurrentNetwork>(0.1);
        train(&mut net, &obj).unwrap();
        let after = net.parameter_values();
        for ((new, old), g) in after.iter().zip(before.iter()).zip(gradient.iter()) {
            assert!((new - (old - 0.1 * g)).abs() < 1e-12);
        }
    }

    #[test]
    fn host_training_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut net = parity_network(&mut rng);
        let data = generate_parity_data(5, &mut rng);
        let mut train = train_gd_host(&net, data.examples(), data.labels(), 0.01).unwrap();
        let first = train(&mut net).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = train(&mut net).unwrap();
        }
        assert!(last < first);
    }

    #[test]
    fn host_training_rejects_bad_data() {
        let mut rng = StdRng::seed_from_u64(10);
        let net = parity_network(&mut rng);
        let data = generate_parity_data(2, &mut rng);
        assert!(train_gd_host(&net, data.examples(), &data.labels()[1..], 0.1).is_err());
        assert!(train_gd_host(&net, &[], &[], 0.1).is_err());
    }

    #[test]
    fn fit_stops_on_target() {
        let mut p = Parabola { x: 0.0 };
        let stop = StopCondition::new(1000).target_loss(1e-6);
        let report = fit(&mut p, &3.0, &mut GradientDescent::new(0.1), &stop, 0).unwrap();
        assert_eq!(report.stop_reason, StopReason::TargetReached);
        assert!(report.epochs < 1000);
        assert_eq!(report.losses.len(), report.epochs);
        assert!((p.x - 3.0).abs() < 1e-2);
    }

    #[test]
    fn fit_stops_at_max_epochs() {
        let mut p = Parabola { x: 0.0 };
        let stop = StopCondition::new(7);
        let report = fit(&mut p, &3.0, &mut GradientDescent::new(0.01), &stop, 2).unwrap();
        assert_eq!(report.stop_reason, StopReason::MaxEpochs);
        assert_eq!(report.epochs, 7);
    }

    #[test]
    fn network_vectorizes_and_rebuilds() {
        let mut rng = StdRng::seed_from_u64(21);
        let net = parity_network(&mut rng);
        let (vec, ctx) = net.to_vec();
        assert_eq!(vec.len(), net.num_parameters());

        let doubled: Vec<f64> = vec.iter().map(|v| 2.0 * v).collect();
        let rebuilt = RecurrentNetwork::from_vec(&doubled, &ctx).unwrap();
        assert_eq!(rebuilt.parameter_values(), doubled);
        assert_eq!(rebuilt.to_vec().0, doubled);
        // The original keeps its parameters.
        assert_eq!(net.parameter_values(), vec);
        assert!(RecurrentNetwork::from_vec(&vec[1..], &ctx).is_err());
    }

    #[test]
    fn fit_steps_drives_a_host_step_function() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut net = parity_network(&mut rng);
        let data = generate_parity_data(5, &mut rng);
        let train = train_gd_host(&net, data.examples(), data.labels(), 0.01).unwrap();
        let report = fit_steps(&mut net, train, &StopCondition::new(12), 5).unwrap();
        assert_eq!(report.stop_reason, StopReason::MaxEpochs);
        assert_eq!(report.epochs, 12);
        assert_eq!(report.losses.len(), 12);
        assert_eq!(report.final_loss, report.losses[11]);
    }

    #[test]
    fn fit_steps_reports_divergence() {
        let mut x = 1.0_f64;
        let report = fit_steps(
            &mut x,
            |x: &mut f64| {
                *x *= 1e200;
                Ok(*x)
            },
            &StopCondition::new(100),
            0,
        )
        .unwrap();
        assert_eq!(report.stop_reason, StopReason::Diverged);
        assert_eq!(report.epochs, 2);
    }

    #[test]
    fn fit_notices_divergence() {
        let mut p = Parabola { x: 0.0 };
        let stop = StopCondition::new(100_000);
        let report = fit(&mut p, &3.0, &mut GradientDescent::new(10.0), &stop, 0).unwrap();
        assert_eq!(report.stop_reason, StopReason::Diverged);
    }
}
