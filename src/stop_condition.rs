use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use std::fmt;

// Slopes this small relative to the level of the series are rounding noise.
const FLAT_SLOPE: f64 = 1e-12;

// Slope of the least squares line through (0, y0), (1, y1), ... and the variance of that slope
// estimate. Both x and y are centred first so a constant series gives a slope of exactly zero.
fn slope_and_variance(series: &[f64]) -> (f64, f64) {
    assert!(series.len() >= 3);

    let n = series.len() as f64;
    let xmean = (n - 1.0) / 2.0;
    let ymean = series.iter().sum::<f64>() / n;

    let (sxx, sxy) = series
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxx, sxy), (idx, y)| {
            let dx = idx as f64 - xmean;
            (sxx + dx * dx, sxy + dx * (y - ymean))
        });

    let mut b = sxy / sxx;
    if b.abs() <= FLAT_SLOPE * (1.0 + ymean.abs()) {
        b = 0.0;
    }

    let residual: f64 = series
        .iter()
        .enumerate()
        .map(|(idx, y)| {
            let e = (y - ymean) - b * (idx as f64 - xmean);
            e * e
        })
        .sum::<f64>()
        / (n - 2.0);

    (b, residual / sxx)
}

/// Probability that the series is going down, i.e. that the slope of a line fitted to it is
/// negative. Returns 0.5 when there are fewer than 3 points or the series is flat.
pub fn series_is_trending_down(series: &[f64]) -> f64 {
    if series.len() < 3 {
        return 0.5;
    }

    let (m, var) = slope_and_variance(series);
    if m == 0.0 {
        return 0.5;
    }
    if var == 0.0 {
        // Perfect line
        return if m < 0.0 { 1.0 } else { 0.0 };
    }

    0.5 * (1.0 + erf(-m / (var.sqrt() * 2.0_f64.sqrt())))
}

#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxEpochs,
    TargetReached,
    Plateau,
    Diverged,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            StopReason::MaxEpochs => "maximum number of epochs reached",
            StopReason::TargetReached => "target loss reached",
            StopReason::Plateau => "loss stopped going down",
            StopReason::Diverged => "loss is not finite",
        };
        write!(f, "{}", text)
    }
}

/// When to stop a training loop, given the losses recorded so far.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopCondition {
    pub(crate) max_epochs: usize,
    pub(crate) target_loss: Option<f64>,
    pub(crate) plateau_window: Option<usize>,
    pub(crate) plateau_probability: f64,
}

impl StopCondition {
    pub fn new(max_epochs: usize) -> Self {
        StopCondition {
            max_epochs,
            target_loss: None,
            plateau_window: None,
            plateau_probability: 0.5,
        }
    }

    pub fn target_loss(self, target_loss: f64) -> Self {
        Self {
            target_loss: Some(target_loss),
            ..self
        }
    }

    /// Stop when the last `window` losses are trending down with probability at most
    /// `plateau_probability`. A perfectly flat window counts as a plateau.
    pub fn plateau_window(self, window: usize) -> Self {
        Self {
            plateau_window: Some(window.max(3)),
            ..self
        }
    }

    pub fn plateau_probability(self, plateau_probability: f64) -> Self {
        Self {
            plateau_probability,
            ..self
        }
    }

    pub fn max_epochs(&self) -> usize {
        self.max_epochs
    }

    pub fn check(&self, losses: &[f64]) -> Option<StopReason> {
        if let Some(last) = losses.last() {
            if !last.is_finite() {
                return Some(StopReason::Diverged);
            }
            if let Some(target) = self.target_loss {
                if *last <= target {
                    return Some(StopReason::TargetReached);
                }
            }
        }
        if let Some(window) = self.plateau_window {
            if losses.len() >= window {
                let recent = &losses[losses.len() - window..];
                if series_is_trending_down(recent) <= self.plateau_probability {
                    return Some(StopReason::Plateau);
                }
            }
        }
        if losses.len() >= self.max_epochs {
            return Some(StopReason::MaxEpochs);
        }
        None
    }
}
