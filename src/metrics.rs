// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use core::fmt;

use thiserror::Error;

use crate::trajectory::Trajectory;

/// Slack when deciding whether a sample falls inside the steady-state window.
const WINDOW_TIME_TOLERANCE: f64 = 1e-9;

/// Errors raised when validating a [`MetricsConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MetricsConfigError {
    /// Rise thresholds must satisfy `0 <= lower < upper <= 1`.
    #[error("rise thresholds must satisfy 0 <= lower < upper <= 1")]
    InvalidRiseThresholds,

    /// The settling band is zero, negative or not finite.
    #[error("settling band must be positive and finite")]
    InvalidSettlingBand,

    /// The steady-state averaging window is zero, negative or not finite.
    #[error("steady-state window must be positive and finite")]
    InvalidSteadyStateWindow,
}

/// Half-width of the band the error has to stay in for the response to count as settled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettlingBand {
    /// Fraction of the initial error magnitude `|target - x0|`.
    ///
    /// When the target equals the initial position the band has zero width, so only an exact
    /// return to the target counts as settled. Use [`SettlingBand::Absolute`] for responses
    /// that start on the target, e.g. with an initial velocity.
    Relative(f64),
    /// Fixed distance from the target.
    Absolute(f64),
}

impl SettlingBand {
    fn width(&self, displacement: f64) -> f64 {
        match *self {
            SettlingBand::Relative(fraction) => fraction * displacement.abs(),
            SettlingBand::Absolute(width) => width,
        }
    }

    fn value(&self) -> f64 {
        match *self {
            SettlingBand::Relative(value) | SettlingBand::Absolute(value) => value,
        }
    }
}

/// How the residual error at the end of the horizon is measured.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SteadyStatePolicy {
    /// `|target - position|` of the last sample.
    #[default]
    LastSample,
    /// Mean of `|target - position|` over the trailing window, in seconds.
    ///
    /// The magnitude is averaged, so an oscillation around the target does not cancel out as
    /// it would with the mean of the signed error.
    MeanOverWindow(f64),
}

/// Thresholds used by the [`MetricsAnalyzer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    rise_lower: f64,
    rise_upper: f64,
    settling_band: SettlingBand,
    steady_state: SteadyStatePolicy,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            rise_lower: 0.0,
            rise_upper: 0.9,
            settling_band: SettlingBand::Relative(0.02),
            steady_state: SteadyStatePolicy::LastSample,
        }
    }
}

impl MetricsConfig {
    /// Returns the `(lower, upper)` fractions of the displacement bounding the rise.
    pub fn rise_thresholds(&self) -> (f64, f64) {
        (self.rise_lower, self.rise_upper)
    }

    /// Returns the settling band.
    pub fn settling_band(&self) -> SettlingBand {
        self.settling_band
    }

    /// Returns the steady-state error policy.
    pub fn steady_state(&self) -> SteadyStatePolicy {
        self.steady_state
    }
}

/// Builder for [`MetricsConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsConfigBuilder {
    config: MetricsConfig,
}

impl MetricsConfigBuilder {
    /// Measures the rise from `lower` to `upper`, both fractions of the displacement. Use
    /// `(0.1, 0.9)` for the classic 10-90 % rise time.
    pub fn rise_thresholds(mut self, lower: f64, upper: f64) -> Self {
        self.config.rise_lower = lower;
        self.config.rise_upper = upper;
        self
    }

    /// Sets the settling band.
    pub fn settling_band(mut self, band: SettlingBand) -> Self {
        self.config.settling_band = band;
        self
    }

    /// Sets the steady-state error policy.
    pub fn steady_state(mut self, policy: SteadyStatePolicy) -> Self {
        self.config.steady_state = policy;
        self
    }

    /// Validates the accumulated values and produces the configuration.
    pub fn build(self) -> Result<MetricsConfig, MetricsConfigError> {
        let MetricsConfig {
            rise_lower,
            rise_upper,
            settling_band,
            steady_state,
        } = self.config;

        if !(0.0 <= rise_lower && rise_lower < rise_upper && rise_upper <= 1.0) {
            return Err(MetricsConfigError::InvalidRiseThresholds);
        }
        let band = settling_band.value();
        if !(band.is_finite() && band > 0.0) {
            return Err(MetricsConfigError::InvalidSettlingBand);
        }
        if let SteadyStatePolicy::MeanOverWindow(window) = steady_state {
            if !(window.is_finite() && window > 0.0) {
                return Err(MetricsConfigError::InvalidSteadyStateWindow);
            }
        }
        Ok(self.config)
    }
}

/// Step-response metrics of a trajectory.
///
/// Times are `None` when the response never got there within the simulated horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsReport {
    /// Seconds to travel the configured fraction of the way to the target.
    pub rise_time: Option<f64>,
    /// Peak excursion past the target, in percent of the initial displacement.
    pub overshoot_pct: f64,
    /// Time after which the error stays inside the settling band.
    pub settling_time: Option<f64>,
    /// Residual error at the end of the horizon.
    pub steady_state_error: f64,
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rise_time {
            Some(t) => writeln!(f, "Rise time:          {t:.2} s")?,
            None => writeln!(f, "Rise time:          not reached")?,
        }
        writeln!(f, "Overshoot:          {:.1} %", self.overshoot_pct)?;
        match self.settling_time {
            Some(t) => writeln!(f, "Settling time:      {t:.2} s")?,
            None => writeln!(f, "Settling time:      not settled")?,
        }
        write!(f, "Steady-state error: {:.4}", self.steady_state_error)
    }
}

/// Scores a trajectory against a constant target.
///
/// All metrics are direction-aware: positions are measured as progress along the signed
/// displacement from the initial position to the target, so a target below the start is
/// handled the same as one above it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsAnalyzer {
    config: MetricsConfig,
}

impl MetricsAnalyzer {
    /// Creates an analyzer with the given thresholds.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Returns the thresholds.
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Computes all four metrics.
    pub fn analyze(&self, trajectory: &Trajectory, target: f64) -> MetricsReport {
        MetricsReport {
            rise_time: self.rise_time(trajectory, target),
            overshoot_pct: self.overshoot_pct(trajectory, target),
            settling_time: self.settling_time(trajectory, target),
            steady_state_error: self.steady_state_error(trajectory, target),
        }
    }

    /// Time between first reaching the lower and the upper rise threshold.
    ///
    /// If the target equals the initial position there is nothing to rise through and the
    /// rise is complete at the first sample.
    pub fn rise_time(&self, trajectory: &Trajectory, target: f64) -> Option<f64> {
        let x0 = trajectory.first().position;
        let displacement = target - x0;
        if displacement == 0.0 {
            return Some(0.0);
        }

        let first_reaching = |fraction: f64| {
            trajectory
                .iter()
                .find(|s| (s.position - x0) / displacement >= fraction)
                .map(|s| s.time)
        };
        let start = first_reaching(self.config.rise_lower)?;
        let end = first_reaching(self.config.rise_upper)?;
        Some(end - start)
    }

    /// Percentage by which the peak overshoots the target, zero if it never passes it.
    pub fn overshoot_pct(&self, trajectory: &Trajectory, target: f64) -> f64 {
        let x0 = trajectory.first().position;
        let displacement = target - x0;
        if displacement == 0.0 {
            return 0.0;
        }

        let peak_progress = trajectory
            .iter()
            .map(|s| (s.position - x0) / displacement)
            .fold(f64::NEG_INFINITY, f64::max);
        (peak_progress - 1.0).max(0.0) * 100.0
    }

    /// Earliest sample time after which `|target - position|` stays inside the band through
    /// the end of the trajectory. `None` if the last sample is outside the band.
    ///
    /// A relative band is zero wide when the target equals the initial position, as in
    /// [`MetricsAnalyzer::rise_time`]; see [`SettlingBand::Relative`].
    pub fn settling_time(&self, trajectory: &Trajectory, target: f64) -> Option<f64> {
        let band = self
            .config
            .settling_band
            .width(target - trajectory.first().position);
        let samples = trajectory.samples();

        // Negated so that NaN positions count as outside the band
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        let last_outside = samples
            .iter()
            .rposition(|s| !((target - s.position).abs() <= band));
        match last_outside {
            None => Some(trajectory.first().time),
            Some(idx) => samples.get(idx + 1).map(|s| s.time),
        }
    }

    /// Residual `|target - position|` according to the steady-state policy.
    pub fn steady_state_error(&self, trajectory: &Trajectory, target: f64) -> f64 {
        match self.config.steady_state {
            SteadyStatePolicy::LastSample => (target - trajectory.final_position()).abs(),
            SteadyStatePolicy::MeanOverWindow(window) => {
                let start = trajectory.last().time - window;
                let (sum, count) = trajectory
                    .samples()
                    .iter()
                    .rev()
                    .take_while(|s| s.time + WINDOW_TIME_TOLERANCE >= start)
                    .fold((0.0, 0usize), |(sum, count), s| {
                        (sum + (target - s.position).abs(), count + 1)
                    });
                sum / count as f64
            }
        }
    }
}

/// Scores `trajectory` against `target` with the default thresholds: 0-90 % rise time, a
/// settling band of 2 % of the initial error, and the last sample's error as steady state.
pub fn analyze(trajectory: &Trajectory, target: f64) -> MetricsReport {
    MetricsAnalyzer::default().analyze(trajectory, target)
}
