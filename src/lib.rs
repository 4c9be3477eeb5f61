#![warn(missing_docs)]

//! # Ball-on-a-Hill PID Simulation
//!
//! This library simulates a ball rolling in a parabolic well while a PID controller tilts the
//! hill to push it to a target position, then scores the response with the classic
//! step-response metrics.
//!
//! ## Features
//!
//! - A second-order plant, `a = -5x - 0.5v + u`, behind a small [`plant::Plant`] trait.
//! - A discrete PID controller in functional and stateful flavours:
//!   - Fully validated gains; zero gains are allowed.
//!   - Unbounded integral by default, with an opt-in integral clamp against windup.
//!   - Optional derivative-on-measurement to mitigate derivative kick.
//!   - Graceful handling of a degenerate step size: the derivative term is skipped.
//! - A fixed-step simulator producing a [`trajectory::Trajectory`] of
//!   time, position, velocity, error, control and target, with semi-implicit Euler or RK4
//!   integration and constant or stepped setpoints.
//! - Rise time, overshoot, settling time and steady-state error, where unreached times are
//!   reported as `None` rather than a sentinel.
//!
//! ## Usage
//!
//! ### One-shot run
//!
//! ```rust
//! use ball_on_hill::metrics;
//! use ball_on_hill::pid::PidGains;
//! use ball_on_hill::sim;
//!
//! let gains = PidGains::new(50.0, 10.0, 5.0);
//! let trajectory = sim::run(gains, 5.0, 0.0, 0.0, 0.01, 10.0).expect("Invalid configuration");
//!
//! let report = metrics::analyze(&trajectory, 5.0);
//! assert!(report.steady_state_error < 0.1);
//! assert!(report.rise_time.is_some());
//! ```
//!
//! ### Configured run
//!
//! ```rust
//! use ball_on_hill::metrics::{MetricsAnalyzer, MetricsConfigBuilder, SettlingBand};
//! use ball_on_hill::pid::PidConfigBuilder;
//! use ball_on_hill::plant::BallOnHill;
//! use ball_on_hill::sim::{Integrator, SimulationConfigBuilder, Simulator};
//!
//! let pid = PidConfigBuilder::default()
//!     .kp(20.0)
//!     .ki(5.0)
//!     .kd(2.0)
//!     .integral_limit(10.0)
//!     .build()
//!     .expect("Invalid PID config");
//!
//! let config = SimulationConfigBuilder::default()
//!     .pid_config(pid)
//!     .target(-2.0)
//!     .initial_position(0.5)
//!     .dt(0.005)
//!     .duration(15.0)
//!     .integrator(Integrator::Rk4)
//!     .build()
//!     .expect("Invalid simulation config");
//!
//! let trajectory = Simulator::new(BallOnHill::default()).simulate(&config);
//! assert_eq!(trajectory.len(), config.step_count() + 1);
//!
//! let analyzer = MetricsAnalyzer::new(
//!     MetricsConfigBuilder::default()
//!         .rise_thresholds(0.1, 0.9)
//!         .settling_band(SettlingBand::Relative(0.05))
//!         .build()
//!         .expect("Invalid metrics config"),
//! );
//! println!("{}", analyzer.analyze(&trajectory, -2.0));
//! ```

/// The PID controller, its configuration and its working variables.
pub mod pid;

/// The controlled plant.
pub mod plant;

/// The fixed-step closed-loop simulator.
pub mod sim;

/// Recorded closed-loop responses.
pub mod trajectory;

/// Step-response metrics.
pub mod metrics;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
