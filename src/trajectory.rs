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

use thiserror::Error;

/// Slack for sample times that land just before the requested start through rounding.
const REBASE_TIME_TOLERANCE: f64 = 1e-9;

/// Errors raised when building a [`Trajectory`] from externally produced samples.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TrajectoryError {
    /// No samples were given.
    #[error("trajectory must contain at least one sample")]
    Empty,

    /// The first sample is not at time zero.
    #[error("trajectory must start at time 0, got {0}")]
    NonZeroStart(f64),

    /// The sample at `index` is not strictly later than its predecessor.
    #[error("sample {index} does not advance time")]
    NonIncreasingTime {
        /// Index of the offending sample.
        index: usize,
    },
}

/// State of the closed loop at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSample {
    /// Seconds since the start of the run.
    pub time: f64,
    /// Horizontal position of the ball.
    pub position: f64,
    /// Horizontal velocity of the ball.
    pub velocity: f64,
    /// `target - position`.
    pub error: f64,
    /// Control force that drove the plant into this state; zero for the first sample.
    pub control: f64,
    /// Target in force at this instant.
    pub target: f64,
}

/// Time-ordered, non-empty sequence of samples starting at time zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    samples: Vec<SimulationSample>,
}

impl Trajectory {
    /// Wraps samples produced by the simulator, which upholds the invariants itself.
    pub(crate) fn from_simulation(samples: Vec<SimulationSample>) -> Self {
        debug_assert!(!samples.is_empty());
        Self { samples }
    }

    /// Validates and wraps samples produced elsewhere, e.g. a recorded response.
    pub fn from_samples(samples: Vec<SimulationSample>) -> Result<Self, TrajectoryError> {
        let first = samples.first().ok_or(TrajectoryError::Empty)?;
        if first.time != 0.0 {
            return Err(TrajectoryError::NonZeroStart(first.time));
        }
        // Negated so that NaN times are rejected too
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        let stalled = samples.windows(2).position(|w| !(w[1].time > w[0].time));
        if let Some(index) = stalled {
            return Err(TrajectoryError::NonIncreasingTime { index: index + 1 });
        }
        Ok(Self { samples })
    }

    /// All samples in time order.
    pub fn samples(&self) -> &[SimulationSample] {
        &self.samples
    }

    /// Iterates the samples in time order.
    pub fn iter(&self) -> core::slice::Iter<'_, SimulationSample> {
        self.samples.iter()
    }

    /// Number of samples, always at least one.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sample at time zero.
    pub fn first(&self) -> &SimulationSample {
        &self.samples[0]
    }

    /// The sample at the end of the horizon.
    pub fn last(&self) -> &SimulationSample {
        &self.samples[self.samples.len() - 1]
    }

    /// Position at the end of the horizon.
    pub fn final_position(&self) -> f64 {
        self.last().position
    }

    /// Sample times, for plotting.
    pub fn times(&self) -> Vec<f64> {
        self.iter().map(|s| s.time).collect()
    }

    /// Positions, for plotting.
    pub fn positions(&self) -> Vec<f64> {
        self.iter().map(|s| s.position).collect()
    }

    /// Errors, for plotting.
    pub fn errors(&self) -> Vec<f64> {
        self.iter().map(|s| s.error).collect()
    }

    /// Control forces, for plotting.
    pub fn controls(&self) -> Vec<f64> {
        self.iter().map(|s| s.control).collect()
    }

    /// The part of the trajectory from `start` on, with times shifted so that it starts at
    /// zero. Useful to score the response to a target that steps mid-run. `None` if no sample
    /// is that late.
    pub fn rebased_from(&self, start: f64) -> Option<Trajectory> {
        let first_kept = self
            .samples
            .iter()
            .position(|s| s.time + REBASE_TIME_TOLERANCE >= start)?;
        let origin = self.samples[first_kept].time;
        let samples = self.samples[first_kept..]
            .iter()
            .map(|s| SimulationSample {
                time: s.time - origin,
                ..*s
            })
            .collect();
        Some(Self { samples })
    }

    /// Gives the samples back.
    pub fn into_samples(self) -> Vec<SimulationSample> {
        self.samples
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a SimulationSample;
    type IntoIter = core::slice::Iter<'a, SimulationSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
