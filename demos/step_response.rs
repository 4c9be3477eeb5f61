//! Step response of the ball on the hill under PID control.
//!
//! Run with `cargo run --example step_response -- --kp 50 --ki 10 --kd 5 --target 5`.
//! Set `RUST_LOG=debug` to see the simulator's events.
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

use std::process::ExitCode;

use ball_on_hill::metrics::{
    MetricsAnalyzer, MetricsConfig, MetricsConfigBuilder, SettlingBand, SteadyStatePolicy,
};
use ball_on_hill::pid::PidConfigBuilder;
use ball_on_hill::plant::BallOnHill;
use ball_on_hill::sim::{Integrator, Setpoint, SimulationConfigBuilder, Simulator};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Simulates a PID-controlled ball on a hill and prints its step-response metrics
#[derive(Parser, Debug)]
#[command(name = "step_response", version)]
struct Args {
    /// Proportional gain
    #[arg(long, default_value_t = 10.0)]
    kp: f64,

    /// Integral gain
    #[arg(long, default_value_t = 2.0)]
    ki: f64,

    /// Derivative gain
    #[arg(long, default_value_t = 5.0)]
    kd: f64,

    /// Target position
    #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
    target: f64,

    /// Position at time zero
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    initial_position: f64,

    /// Velocity at time zero
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    initial_velocity: f64,

    /// Fixed step size in seconds
    #[arg(long, default_value_t = 0.01)]
    dt: f64,

    /// Simulated horizon in seconds
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Bound on the accumulated integral error
    #[arg(long)]
    integral_limit: Option<f64>,

    /// Integrate with RK4 instead of semi-implicit Euler
    #[arg(long)]
    rk4: bool,

    /// Reproduce the classroom setup: the target steps from 0 to 0.3 at t = 5 s with the ball
    /// starting at 0.5, scored with a 10-90 % rise time, a 5 % band and the mean error over the
    /// last second
    #[arg(long)]
    original: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut pid = PidConfigBuilder::default()
        .kp(args.kp)
        .ki(args.ki)
        .kd(args.kd);
    if let Some(limit) = args.integral_limit {
        pid = pid.integral_limit(limit);
    }
    let pid = match pid.build() {
        Ok(pid) => pid,
        Err(err) => {
            eprintln!("Invalid gains: {err}");
            return ExitCode::FAILURE;
        }
    };

    let integrator = if args.rk4 {
        Integrator::Rk4
    } else {
        Integrator::SemiImplicitEuler
    };

    let (builder, metrics_config) = if args.original {
        let builder = SimulationConfigBuilder::default()
            .setpoint(Setpoint::Step {
                initial: 0.0,
                final_value: 0.3,
                at: 5.0,
            })
            .initial_position(0.5)
            .dt(0.1)
            .duration(12.0);
        let metrics_config = MetricsConfigBuilder::default()
            .rise_thresholds(0.1, 0.9)
            .settling_band(SettlingBand::Relative(0.05))
            .steady_state(SteadyStatePolicy::MeanOverWindow(1.0))
            .build();
        (builder, metrics_config)
    } else {
        let builder = SimulationConfigBuilder::default()
            .target(args.target)
            .initial_position(args.initial_position)
            .initial_velocity(args.initial_velocity)
            .dt(args.dt)
            .duration(args.duration);
        (builder, Ok(MetricsConfig::default()))
    };

    let config = match builder.pid_config(pid).integrator(integrator).build() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid simulation configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let metrics_config = match metrics_config {
        Ok(metrics_config) => metrics_config,
        Err(err) => {
            eprintln!("Invalid metrics configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let trajectory = Simulator::new(BallOnHill::default()).simulate(&config);

    // Score the response from the instant the target last changes
    let step_time = match config.setpoint() {
        Setpoint::Step { at, .. } => at,
        Setpoint::Constant(_) => 0.0,
    };
    let Some(response) = trajectory.rebased_from(step_time) else {
        eprintln!("The target never steps within the simulated horizon");
        return ExitCode::FAILURE;
    };
    let target = config.setpoint().final_target();
    let report = MetricsAnalyzer::new(metrics_config).analyze(&response, target);

    println!("--- PID PERFORMANCE METRICS ---");
    println!("{report}");
    println!(
        "Final position:     {:.4} (target {target})",
        trajectory.final_position()
    );
    ExitCode::SUCCESS
}
