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

use nalgebra as na;
use thiserror::Error;

use crate::pid::{PidConfig, PidConfigError, PidController, PidGains};
use crate::plant::{BallOnHill, Plant};
use crate::trajectory::{SimulationSample, Trajectory};

/// Absorbs rounding in `duration / dt`, e.g. `0.3 / 0.1 = 2.9999999999999996`.
const STEP_COUNT_TOLERANCE: f64 = 1e-9;

/// Largest number of steps a single run may take. The trajectory buffer is allocated up front,
/// so longer horizons are rejected when the configuration is built.
pub const MAX_STEPS: usize = 100_000_000;

/// Configuration errors, detected before the simulation starts.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SimulationError {
    /// The step size is zero, negative or not finite.
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),

    /// The duration is zero, negative or not finite.
    #[error("duration must be positive and finite, got {0}")]
    InvalidDuration(f64),

    /// A target value of the setpoint is not finite.
    #[error("target position must be finite")]
    NonFiniteTarget,

    /// The initial position or velocity is not finite.
    #[error("initial position and velocity must be finite")]
    NonFiniteInitialState,

    /// The switching time of a step setpoint is negative or not finite.
    #[error("setpoint step time must be non-negative and finite, got {0}")]
    InvalidStepTime(f64),

    /// `duration / dt` exceeds [`MAX_STEPS`] or is not finite.
    #[error("simulation would take {0} steps, more than the limit of {max}", max = MAX_STEPS)]
    TooManySteps(f64),

    /// The controller gains or options are invalid.
    #[error(transparent)]
    Gains(#[from] PidConfigError),
}

/// Target position as a function of time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setpoint {
    /// The same target for the whole run.
    Constant(f64),
    /// Holds `initial` until time `at`, then switches to `final_value`.
    Step {
        /// Target before the switch.
        initial: f64,
        /// Target from time `at` on.
        final_value: f64,
        /// Switching time in seconds.
        at: f64,
    },
}

impl Setpoint {
    /// Returns the target in force at `time`.
    pub fn target_at(&self, time: f64) -> f64 {
        match *self {
            Setpoint::Constant(target) => target,
            Setpoint::Step {
                initial,
                final_value,
                at,
            } => {
                if time < at {
                    initial
                } else {
                    final_value
                }
            }
        }
    }

    /// Returns the target the setpoint ends up at, i.e. the one to score the response against.
    pub fn final_target(&self) -> f64 {
        match *self {
            Setpoint::Constant(target) => target,
            Setpoint::Step { final_value, .. } => final_value,
        }
    }

    fn validate(&self) -> Result<(), SimulationError> {
        match *self {
            Setpoint::Constant(target) if !target.is_finite() => {
                Err(SimulationError::NonFiniteTarget)
            }
            Setpoint::Step {
                initial,
                final_value,
                ..
            } if !initial.is_finite() || !final_value.is_finite() => {
                Err(SimulationError::NonFiniteTarget)
            }
            Setpoint::Step { at, .. } if !at.is_finite() || at < 0.0 => {
                Err(SimulationError::InvalidStepTime(at))
            }
            _ => Ok(()),
        }
    }
}

/// Scheme used to advance the plant state over one step, holding the control constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integrator {
    /// Update velocity from the acceleration, then position from the new velocity.
    #[default]
    SemiImplicitEuler,
    /// Classic fourth-order Runge-Kutta on the state `[position, velocity]`.
    Rk4,
}

/// Validated parameters of a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pid: PidConfig<f64>,
    setpoint: Setpoint,
    initial_position: f64,
    initial_velocity: f64,
    dt: f64,
    duration: f64,
    integrator: Integrator,
}

impl SimulationConfig {
    /// Returns the controller configuration.
    pub fn pid(&self) -> &PidConfig<f64> {
        &self.pid
    }

    /// Returns the setpoint profile.
    pub fn setpoint(&self) -> Setpoint {
        self.setpoint
    }

    /// Returns the position at time zero.
    pub fn initial_position(&self) -> f64 {
        self.initial_position
    }

    /// Returns the velocity at time zero.
    pub fn initial_velocity(&self) -> f64 {
        self.initial_velocity
    }

    /// Returns the fixed step size in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the simulated horizon in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Returns the integration scheme.
    pub fn integrator(&self) -> Integrator {
        self.integrator
    }

    /// Number of integration steps, `floor(duration / dt)`. The trajectory holds one more
    /// sample than this.
    pub fn step_count(&self) -> usize {
        // Bounded by MAX_STEPS in `build`
        steps_in(self.duration, self.dt) as usize
    }
}

/// Builder for [`SimulationConfig`]. Everything is validated in
/// [`SimulationConfigBuilder::build`].
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfigBuilder {
    pid: PidConfig<f64>,
    gains: Option<PidGains<f64>>,
    setpoint: Setpoint,
    initial_position: f64,
    initial_velocity: f64,
    dt: f64,
    duration: f64,
    integrator: Integrator,
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        Self {
            pid: PidConfig::default(),
            gains: None,
            setpoint: Setpoint::Constant(0.0),
            initial_position: 0.0,
            initial_velocity: 0.0,
            dt: 0.01,
            duration: 10.0,
            integrator: Integrator::default(),
        }
    }
}

impl SimulationConfigBuilder {
    /// Uses a full controller configuration, options included.
    pub fn pid_config(mut self, pid: PidConfig<f64>) -> Self {
        self.pid = pid;
        self.gains = None;
        self
    }

    /// Overrides the controller gains. Checked in `build`.
    pub fn gains(mut self, gains: PidGains<f64>) -> Self {
        self.gains = Some(gains);
        self
    }

    /// Uses a constant target.
    pub fn target(self, target: f64) -> Self {
        self.setpoint(Setpoint::Constant(target))
    }

    /// Uses an arbitrary setpoint profile.
    pub fn setpoint(mut self, setpoint: Setpoint) -> Self {
        self.setpoint = setpoint;
        self
    }

    /// Sets the position at time zero.
    pub fn initial_position(mut self, position: f64) -> Self {
        self.initial_position = position;
        self
    }

    /// Sets the velocity at time zero.
    pub fn initial_velocity(mut self, velocity: f64) -> Self {
        self.initial_velocity = velocity;
        self
    }

    /// Sets the fixed step size in seconds.
    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Sets the simulated horizon in seconds.
    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the integration scheme.
    pub fn integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    /// Validates the accumulated values and produces the configuration.
    pub fn build(self) -> Result<SimulationConfig, SimulationError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimulationError::InvalidTimeStep(self.dt));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(SimulationError::InvalidDuration(self.duration));
        }
        let steps = steps_in(self.duration, self.dt);
        if !steps.is_finite() || steps > MAX_STEPS as f64 {
            return Err(SimulationError::TooManySteps(steps));
        }
        self.setpoint.validate()?;
        if !self.initial_position.is_finite() || !self.initial_velocity.is_finite() {
            return Err(SimulationError::NonFiniteInitialState);
        }

        let mut pid = self.pid;
        if let Some(gains) = self.gains {
            pid.set_gains(gains)?;
        }

        Ok(SimulationConfig {
            pid,
            setpoint: self.setpoint,
            initial_position: self.initial_position,
            initial_velocity: self.initial_velocity,
            dt: self.dt,
            duration: self.duration,
            integrator: self.integrator,
        })
    }
}

fn steps_in(duration: f64, dt: f64) -> f64 {
    (duration / dt + STEP_COUNT_TOLERANCE).floor()
}

/// One step of the classic fourth-order Runge-Kutta method for `x' = f(x)`.
pub fn rk4_step<const D: usize>(
    f: impl Fn(na::SVector<f64, D>) -> na::SVector<f64, D>,
    x0: na::SVector<f64, D>,
    dt: f64,
) -> na::SVector<f64, D> {
    let k1 = f(x0);
    let k2 = f(x0 + k1 * (dt / 2.0));
    let k3 = f(x0 + k2 * (dt / 2.0));
    let k4 = f(x0 + k3 * dt);
    x0 + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// Drives a plant with a PID controller over a fixed-step horizon.
///
/// The simulator itself is stateless: every call to [`Simulator::simulate`] builds a fresh
/// controller, so runs are independent and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simulator<P = BallOnHill> {
    plant: P,
}

impl<P: Plant> Simulator<P> {
    /// Creates a simulator for `plant`.
    pub fn new(plant: P) -> Self {
        Self { plant }
    }

    /// Returns the plant.
    pub fn plant(&self) -> &P {
        &self.plant
    }

    /// Runs the closed loop and records one sample per step plus the final state.
    ///
    /// Sample `k` is taken at time `k * dt` before the controller acts, so its `control` is
    /// the output computed on step `k - 1`, and zero for the first sample.
    pub fn simulate(&self, config: &SimulationConfig) -> Trajectory {
        let steps = config.step_count();
        let dt = config.dt;
        let _span = tracing::debug_span!("simulate", steps, dt).entered();

        let mut pid = PidController::new(config.pid);
        let mut samples = Vec::with_capacity(steps + 1);

        let mut position = config.initial_position;
        let mut velocity = config.initial_velocity;
        let mut control = 0.0;

        for k in 0..steps {
            let time = k as f64 * dt;
            let target = config.setpoint.target_at(time);
            samples.push(SimulationSample {
                time,
                position,
                velocity,
                error: target - position,
                control,
                target,
            });

            control = pid.compute(target, position, dt);
            (position, velocity) = self.advance(config.integrator, position, velocity, control, dt);
        }

        let time = steps as f64 * dt;
        let target = config.setpoint.target_at(time);
        samples.push(SimulationSample {
            time,
            position,
            velocity,
            error: target - position,
            control,
            target,
        });

        if position.is_finite() && velocity.is_finite() {
            tracing::debug!(
                final_position = position,
                final_velocity = velocity,
                "simulation finished"
            );
        } else {
            tracing::warn!(steps, dt, "simulation diverged to a non-finite state");
        }

        Trajectory::from_simulation(samples)
    }

    fn advance(
        &self,
        integrator: Integrator,
        position: f64,
        velocity: f64,
        control: f64,
        dt: f64,
    ) -> (f64, f64) {
        match integrator {
            Integrator::SemiImplicitEuler => {
                let acceleration = self.plant.acceleration(position, velocity, control);
                let velocity = velocity + acceleration * dt;
                (position + velocity * dt, velocity)
            }
            Integrator::Rk4 => {
                let x = rk4_step(
                    |x| self.plant.f(x, control),
                    na::vector![position, velocity],
                    dt,
                );
                (self.plant.h(x), x[1])
            }
        }
    }
}

/// Simulates the default [`BallOnHill`] tracking a constant `target`.
///
/// # Errors
/// [`SimulationError`] if `dt` or `duration` is not strictly positive, or if any gain, the
/// target or the initial state is not finite. No simulation is run in that case.
pub fn run(
    gains: PidGains<f64>,
    target: f64,
    initial_position: f64,
    initial_velocity: f64,
    dt: f64,
    duration: f64,
) -> Result<Trajectory, SimulationError> {
    let config = SimulationConfigBuilder::default()
        .gains(gains)
        .target(target)
        .initial_position(initial_position)
        .initial_velocity(initial_velocity)
        .dt(dt)
        .duration(duration)
        .build()?;
    Ok(Simulator::new(BallOnHill::default()).simulate(&config))
}
