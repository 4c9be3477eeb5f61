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

use num_traits::Float;
use thiserror::Error;

/// Errors raised when validating PID gains or options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PidConfigError {
    /// The proportional gain is NaN or infinite.
    #[error("proportional gain must be finite")]
    InvalidProportionalGain,

    /// The integral gain is NaN or infinite.
    #[error("integral gain must be finite")]
    InvalidIntegralGain,

    /// The derivative gain is NaN or infinite.
    #[error("derivative gain must be finite")]
    InvalidDerivativeGain,

    /// The integral limit is zero, negative or NaN.
    #[error("integral limit must be strictly positive")]
    InvalidIntegralLimit,
}

/// Proportional, integral and derivative gains, fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains<F> {
    /// Proportional gain.
    pub kp: F,
    /// Integral gain, applied to the time integral of the error.
    pub ki: F,
    /// Derivative gain, applied to the time derivative of the error.
    pub kd: F,
}

impl<F: Float> PidGains<F> {
    /// Bundles three gains together. Use [`PidGains::validate`] to check them.
    pub fn new(kp: F, ki: F, kd: F) -> Self {
        Self { kp, ki, kd }
    }

    /// All-zero gains; the controller then always outputs zero.
    pub fn zero() -> Self {
        Self::new(F::zero(), F::zero(), F::zero())
    }

    /// Checks that every gain is finite. Zero and negative gains are accepted.
    pub fn validate(&self) -> Result<(), PidConfigError> {
        if !self.kp.is_finite() {
            return Err(PidConfigError::InvalidProportionalGain);
        }
        if !self.ki.is_finite() {
            return Err(PidConfigError::InvalidIntegralGain);
        }
        if !self.kd.is_finite() {
            return Err(PidConfigError::InvalidDerivativeGain);
        }
        Ok(())
    }
}

/// Configuration of the PID controller.
///
/// The defaults give a pure proportional controller with unity gain. Both options are off by
/// default, so the integral accumulates without bound and the derivative acts on the error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidConfig<F> {
    gains: PidGains<F>,

    /// Symmetric bound on the accumulated integral error. `None` means unbounded, which leaves
    /// the controller exposed to integral windup.
    integral_limit: Option<F>,

    /// If true, the derivative term is the negative backward difference of the measured
    /// position instead of the backward difference of the error.
    use_derivative_on_measurement: bool,
}

impl<F: Float> Default for PidConfig<F> {
    fn default() -> Self {
        PidConfig {
            gains: PidGains::new(F::one(), F::zero(), F::zero()),
            integral_limit: None,
            use_derivative_on_measurement: false,
        }
    }
}

impl<F: Float> PidConfig<F> {
    /// Creates a configuration from validated gains, with all options off.
    pub fn from_gains(gains: PidGains<F>) -> Result<Self, PidConfigError> {
        let mut config = Self::default();
        config.set_gains(gains)?;
        Ok(config)
    }

    /// Returns the proportional gain.
    pub fn kp(&self) -> F {
        self.gains.kp
    }

    /// Returns the integral gain.
    pub fn ki(&self) -> F {
        self.gains.ki
    }

    /// Returns the derivative gain.
    pub fn kd(&self) -> F {
        self.gains.kd
    }

    /// Returns the three gains together.
    pub fn gains(&self) -> PidGains<F> {
        self.gains
    }

    /// Returns the bound on the accumulated integral error, if any.
    pub fn integral_limit(&self) -> Option<F> {
        self.integral_limit
    }

    /// Returns the flag indicating whether to apply the derivative on the measurement.
    pub fn use_derivative_on_measurement(&self) -> bool {
        self.use_derivative_on_measurement
    }

    /// Sets the proportional gain.
    ///
    /// # Errors
    /// [`PidConfigError::InvalidProportionalGain`] if `kp` is not finite. The previous value is
    /// kept in that case.
    pub fn set_kp(&mut self, kp: F) -> Result<(), PidConfigError> {
        if !kp.is_finite() {
            return Err(PidConfigError::InvalidProportionalGain);
        }
        self.gains.kp = kp;
        Ok(())
    }

    /// Sets the integral gain.
    ///
    /// # Errors
    /// [`PidConfigError::InvalidIntegralGain`] if `ki` is not finite.
    pub fn set_ki(&mut self, ki: F) -> Result<(), PidConfigError> {
        if !ki.is_finite() {
            return Err(PidConfigError::InvalidIntegralGain);
        }
        self.gains.ki = ki;
        Ok(())
    }

    /// Sets the derivative gain.
    ///
    /// # Errors
    /// [`PidConfigError::InvalidDerivativeGain`] if `kd` is not finite.
    pub fn set_kd(&mut self, kd: F) -> Result<(), PidConfigError> {
        if !kd.is_finite() {
            return Err(PidConfigError::InvalidDerivativeGain);
        }
        self.gains.kd = kd;
        Ok(())
    }

    /// Sets all three gains at once. Either all of them are applied or none is.
    pub fn set_gains(&mut self, gains: PidGains<F>) -> Result<(), PidConfigError> {
        gains.validate()?;
        self.gains = gains;
        Ok(())
    }

    /// Bounds the accumulated integral error to `[-limit, limit]`, or removes the bound with
    /// `None`. An infinite limit is accepted and behaves like no limit.
    ///
    /// # Errors
    /// [`PidConfigError::InvalidIntegralLimit`] if `limit` is zero, negative or NaN.
    pub fn set_integral_limit(&mut self, limit: Option<F>) -> Result<(), PidConfigError> {
        if let Some(limit) = limit {
            if limit.is_nan() || limit <= F::zero() {
                return Err(PidConfigError::InvalidIntegralLimit);
            }
        }
        self.integral_limit = limit;
        Ok(())
    }

    /// Sets whether to apply the derivative on the measurement.
    pub fn set_use_derivative_on_measurement(&mut self, use_derivative_on_measurement: bool) {
        self.use_derivative_on_measurement = use_derivative_on_measurement;
    }
}

/// Builder for [`PidConfig`]. Every value is validated in [`PidConfigBuilder::build`].
#[derive(Debug, Clone, Copy)]
pub struct PidConfigBuilder<F> {
    kp: F,
    ki: F,
    kd: F,
    integral_limit: Option<F>,
    use_derivative_on_measurement: bool,
}

impl<F: Float> Default for PidConfigBuilder<F> {
    fn default() -> Self {
        let config = PidConfig::<F>::default();
        Self {
            kp: config.kp(),
            ki: config.ki(),
            kd: config.kd(),
            integral_limit: config.integral_limit(),
            use_derivative_on_measurement: config.use_derivative_on_measurement(),
        }
    }
}

impl<F: Float> PidConfigBuilder<F> {
    /// Sets the proportional gain.
    pub fn kp(mut self, kp: F) -> Self {
        self.kp = kp;
        self
    }

    /// Sets the integral gain.
    pub fn ki(mut self, ki: F) -> Self {
        self.ki = ki;
        self
    }

    /// Sets the derivative gain.
    pub fn kd(mut self, kd: F) -> Self {
        self.kd = kd;
        self
    }

    /// Sets the three gains at once.
    pub fn gains(self, gains: PidGains<F>) -> Self {
        self.kp(gains.kp).ki(gains.ki).kd(gains.kd)
    }

    /// Bounds the accumulated integral error to `[-limit, limit]`.
    pub fn integral_limit(mut self, limit: F) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    /// Sets whether to apply the derivative on the measurement.
    pub fn use_derivative_on_measurement(mut self, flag: bool) -> Self {
        self.use_derivative_on_measurement = flag;
        self
    }

    /// Validates the accumulated values and produces the configuration.
    pub fn build(self) -> Result<PidConfig<F>, PidConfigError> {
        let mut config = PidConfig::default();
        config.set_kp(self.kp)?;
        config.set_ki(self.ki)?;
        config.set_kd(self.kd)?;
        config.set_integral_limit(self.integral_limit)?;
        config.set_use_derivative_on_measurement(self.use_derivative_on_measurement);
        Ok(config)
    }
}

/// Working variables of the PID controller.
///
/// A fresh context has zero integral error and zero previous error, so the derivative term of
/// the first computation sees the full initial error as a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidContext<F> {
    integral_error: F,
    previous_error: F,
    last_input: Option<F>,
    last_output: F,
}

impl<F: Float> Default for PidContext<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> PidContext<F> {
    /// Creates a zeroed context.
    pub fn new() -> Self {
        Self {
            integral_error: F::zero(),
            previous_error: F::zero(),
            last_input: None,
            last_output: F::zero(),
        }
    }

    /// Returns the accumulated integral of the error.
    pub fn integral_error(&self) -> F {
        self.integral_error
    }

    /// Returns the error seen by the last computation.
    pub fn previous_error(&self) -> F {
        self.previous_error
    }

    /// Returns the measured position seen by the last computation, `None` before the first one.
    pub fn last_input(&self) -> Option<F> {
        self.last_input
    }

    /// Returns the output of the last computation.
    pub fn output(&self) -> F {
        self.last_output
    }
}

/// A functional implementation of a PID controller.
///
/// The controller holds no mutable state: a [`PidContext`] is passed into and returned from
/// every call to [`FuncPidController::compute`], which makes the computation pure.
#[derive(Debug, Clone, Copy)]
pub struct FuncPidController<F> {
    config: PidConfig<F>,
}

impl<F: Float> FuncPidController<F> {
    /// Creates a controller with the given configuration.
    pub fn new(config: PidConfig<F>) -> Self {
        FuncPidController { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PidConfig<F> {
        &self.config
    }

    /// Returns the configuration for modification between runs.
    pub fn config_mut(&mut self) -> &mut PidConfig<F> {
        &mut self.config
    }

    /// Computes the control output that drives `position` towards `target`.
    ///
    /// A non-positive or NaN `dt` does not fail: the derivative term is skipped. The integral
    /// still accumulates `error * dt` for any finite `dt`, so a negative step unwinds it; only
    /// a NaN or infinite `dt` leaves it untouched.
    pub fn compute(
        &self,
        mut ctx: PidContext<F>,
        target: F,
        position: F,
        dt: F,
    ) -> (F, PidContext<F>) {
        let error = target - position;

        // A zero step adds nothing and a negative one unwinds the integral. A NaN or infinite
        // step would poison the integral for the rest of the run, so it is left as is.
        if dt.is_finite() {
            ctx.integral_error = ctx.integral_error + error * dt;
            if let Some(limit) = self.config.integral_limit {
                ctx.integral_error = ctx.integral_error.max(-limit).min(limit);
            }
        } else {
            tracing::debug!("non-finite step size; skipping integral update");
        }

        // NaN compares false here as well
        let valid_step = dt > F::zero();
        if !valid_step {
            tracing::debug!("degenerate step size; skipping derivative term");
        }
        let derivative = match (valid_step, self.config.use_derivative_on_measurement) {
            (false, _) => F::zero(),
            // Note reversed order of operands
            (true, true) => ctx
                .last_input
                .map_or(F::zero(), |last_input| (last_input - position) / dt),
            (true, false) => (error - ctx.previous_error) / dt,
        };

        let gains = self.config.gains;
        let output = gains.kp * error + gains.ki * ctx.integral_error + gains.kd * derivative;

        ctx.previous_error = error;
        ctx.last_input = Some(position);
        ctx.last_output = output;
        (output, ctx)
    }
}

/// A stateful implementation of a PID controller.
///
/// Wraps a [`FuncPidController`] and keeps the [`PidContext`] inline, so `compute` mutates the
/// controller. The state is only reset by constructing a new instance.
#[derive(Debug, Clone, Copy)]
pub struct PidController<F> {
    ctx: PidContext<F>,
    controller: FuncPidController<F>,
}

impl<F: Float> PidController<F> {
    /// Creates a controller with a zeroed context.
    pub fn new(config: PidConfig<F>) -> Self {
        Self {
            ctx: PidContext::new(),
            controller: FuncPidController::new(config),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PidConfig<F> {
        self.controller.config()
    }

    /// Returns the current working variables.
    pub fn context(&self) -> &PidContext<F> {
        &self.ctx
    }

    /// Computes the control output and advances the internal context.
    pub fn compute(&mut self, target: F, position: F, dt: F) -> F {
        let (output, ctx) = self.controller.compute(self.ctx, target, position, dt);
        self.ctx = ctx;
        output
    }
}
