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

use fixtures::test_pid;

use ball_on_hill::pid::{PidConfig, PidConfigBuilder, PidConfigError, PidGains};

mod test_pid_config {
    use super::test_pid::make_controller;
    use super::*;

    const NEW_GAIN: f64 = 10.0;
    // Only non-finite gains are invalid; zero and negative gains are accepted
    const INVALID_GAIN_VALUES: &[f64; 3] = &[f64::INFINITY, f64::NEG_INFINITY, f64::NAN];
    const UNUSUAL_VALID_GAIN_VALUES: &[f64; 2] = &[0.0, -1.0];

    #[test]
    fn test_default_gains() {
        let config = PidConfig::<f64>::default();
        assert_eq!(config.gains(), PidGains::new(1.0, 0.0, 0.0));
        assert_eq!(config.integral_limit(), None);
        assert!(!config.use_derivative_on_measurement());
    }

    #[test]
    fn test_get_and_set_kp() {
        let (mut pid, _) = make_controller();
        let config = pid.config_mut();

        assert!(config.set_kp(NEW_GAIN).is_ok());
        assert_eq!(config.kp(), NEW_GAIN);

        for it in INVALID_GAIN_VALUES {
            assert_eq!(
                config.set_kp(*it),
                Err(PidConfigError::InvalidProportionalGain)
            );

            // Failing to set kp should not change the value
            assert_eq!(config.kp(), NEW_GAIN);
        }

        for it in UNUSUAL_VALID_GAIN_VALUES {
            assert!(config.set_kp(*it).is_ok());
            assert_eq!(config.kp(), *it);
        }
    }

    #[test]
    fn test_get_and_set_ki() {
        let (mut pid, _) = make_controller();
        let config = pid.config_mut();

        assert!(config.set_ki(NEW_GAIN).is_ok());
        assert_eq!(config.ki(), NEW_GAIN);

        for it in INVALID_GAIN_VALUES {
            assert_eq!(config.set_ki(*it), Err(PidConfigError::InvalidIntegralGain));
            assert_eq!(config.ki(), NEW_GAIN);
        }

        for it in UNUSUAL_VALID_GAIN_VALUES {
            assert!(config.set_ki(*it).is_ok());
            assert_eq!(config.ki(), *it);
        }
    }

    #[test]
    fn test_get_and_set_kd() {
        let (mut pid, _) = make_controller();
        let config = pid.config_mut();

        assert!(config.set_kd(NEW_GAIN).is_ok());
        assert_eq!(config.kd(), NEW_GAIN);

        for it in INVALID_GAIN_VALUES {
            assert_eq!(
                config.set_kd(*it),
                Err(PidConfigError::InvalidDerivativeGain)
            );
            assert_eq!(config.kd(), NEW_GAIN);
        }

        for it in UNUSUAL_VALID_GAIN_VALUES {
            assert!(config.set_kd(*it).is_ok());
            assert_eq!(config.kd(), *it);
        }
    }

    #[test]
    fn test_set_gains_is_all_or_nothing() {
        let mut config = PidConfig::<f64>::default();
        assert_eq!(
            config.set_gains(PidGains::new(2.0, f64::NAN, 1.0)),
            Err(PidConfigError::InvalidIntegralGain)
        );
        assert_eq!(config.gains(), PidGains::new(1.0, 0.0, 0.0));

        assert!(config.set_gains(PidGains::new(2.0, 3.0, 4.0)).is_ok());
        assert_eq!(config.gains(), PidGains::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_build_gains() {
        let built_config = PidConfigBuilder::default().kp(2.0).ki(3.0).kd(4.0).build();
        assert!(built_config.is_ok());
        assert_eq!(built_config.unwrap().gains(), PidGains::new(2.0, 3.0, 4.0));

        for it in INVALID_GAIN_VALUES {
            assert_eq!(
                PidConfigBuilder::default().kp(*it).build().map(|_| ()),
                Err(PidConfigError::InvalidProportionalGain)
            );
            assert_eq!(
                PidConfigBuilder::default().ki(*it).build().map(|_| ()),
                Err(PidConfigError::InvalidIntegralGain)
            );
            assert_eq!(
                PidConfigBuilder::default().kd(*it).build().map(|_| ()),
                Err(PidConfigError::InvalidDerivativeGain)
            );
        }
    }

    // Zero, negative and NaN limits are invalid
    const INVALID_INTEGRAL_LIMITS: &[f64; 3] = &[0.0, -1.0, f64::NAN];

    #[test]
    fn test_get_and_set_integral_limit() {
        let mut config = PidConfig::<f64>::default();

        assert!(config.set_integral_limit(Some(5.0)).is_ok());
        assert_eq!(config.integral_limit(), Some(5.0));

        for it in INVALID_INTEGRAL_LIMITS {
            assert_eq!(
                config.set_integral_limit(Some(*it)),
                Err(PidConfigError::InvalidIntegralLimit)
            );
            assert_eq!(config.integral_limit(), Some(5.0));
            assert_eq!(
                PidConfigBuilder::default()
                    .integral_limit(*it)
                    .build()
                    .map(|_| ()),
                Err(PidConfigError::InvalidIntegralLimit)
            );
        }

        // An infinite limit is the same as no limit, but still accepted
        assert!(config.set_integral_limit(Some(f64::INFINITY)).is_ok());
        assert!(config.set_integral_limit(None).is_ok());
        assert_eq!(config.integral_limit(), None);
    }

    #[test]
    fn test_build_flags() {
        let built_config = PidConfigBuilder::<f64>::default()
            .use_derivative_on_measurement(true)
            .build();
        assert!(built_config.is_ok());
        assert!(built_config.unwrap().use_derivative_on_measurement());
    }
}

mod test_pid_qualitative_performance {
    use approx::assert_relative_eq;
    use ball_on_hill::pid::{FuncPidController, PidContext, PidController};

    use super::test_pid::{make_controller, make_stateful_controller};
    use super::*;

    const DT: f64 = 0.1;

    fn controller(kp: f64, ki: f64, kd: f64) -> FuncPidController<f64> {
        FuncPidController::new(
            PidConfigBuilder::default()
                .kp(kp)
                .ki(ki)
                .kd(kd)
                .build()
                .unwrap(),
        )
    }

    mod p_control {
        use super::*;

        #[test]
        fn test_pure_proportional_control() {
            let (pid, ctx) = make_controller();

            let (output, ctx) = pid.compute(ctx, 1.0, 0.5, DT);

            assert_eq!(output, 0.5); // Default kp = 1.0
            assert_eq!(ctx.output(), output);
            assert_eq!(ctx.previous_error(), 0.5);
        }

        #[test]
        fn test_zero_gains_give_zero_output() {
            let pid = controller(0.0, 0.0, 0.0);
            let mut ctx = PidContext::new();
            let mut output: f64;

            for (target, position) in [(1.0, 0.0), (-3.0, 2.0), (0.0, 0.0), (7.5, -1.0)] {
                (output, ctx) = pid.compute(ctx, target, position, DT);
                assert_eq!(output, 0.0);
            }
        }
    }

    mod i_control {
        use super::*;

        const N_STEPS: usize = 1000;
        const BASE_ERROR: f64 = 10.0;

        #[test]
        fn test_integral_accumulation() {
            let pid = controller(0.0, 2.0, 0.0);
            let mut ctx = PidContext::new();
            let mut output;

            let mut outputs = vec![];

            for _ in 0..10 {
                (output, ctx) = pid.compute(ctx, 1.0, 0.0, DT);
                outputs.push(output);
            }

            // Output should increase as integral accumulates
            assert!(outputs.windows(2).all(|w| w[1] > w[0]));
            assert_relative_eq!(ctx.integral_error(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(outputs[9], 2.0, epsilon = 1e-12);
        }

        #[test]
        fn test_integral_winds_up_without_limit() {
            let pid = controller(0.0, 1.0, 0.0);
            let mut ctx = PidContext::new();

            for _ in 0..N_STEPS {
                (_, ctx) = pid.compute(ctx, BASE_ERROR, 0.0, 0.01);
            }

            assert_relative_eq!(
                ctx.integral_error(),
                BASE_ERROR * N_STEPS as f64 * 0.01,
                max_relative = 1e-9
            );
        }

        #[test]
        fn test_integral_limit_and_recovery() {
            const LIMIT: f64 = 5.0;
            let pid = FuncPidController::new(
                PidConfigBuilder::default()
                    .kp(0.0)
                    .ki(1.0)
                    .integral_limit(LIMIT)
                    .build()
                    .unwrap(),
            );
            let mut ctx = PidContext::new();
            let mut output = 0.0;

            for _ in 0..N_STEPS {
                (output, ctx) = pid.compute(ctx, BASE_ERROR, 0.0, 0.01);
                assert!(ctx.integral_error() <= LIMIT);
            }
            assert_eq!(output, LIMIT);

            // An error of the opposite sign unwinds the clamped integral immediately
            (output, _) = pid.compute(ctx, -BASE_ERROR, 0.0, 0.01);
            assert!(output < LIMIT, "Expected reversal due to anti-windup");
        }
    }

    mod d_control {
        use super::*;

        #[test]
        fn test_derivative_kick_on_first_call() {
            let pid = controller(0.0, 0.0, 1.0);
            let ctx = PidContext::new();

            // The previous error starts at zero, so the whole initial error is a step
            let (output, ctx) = pid.compute(ctx, 1.0, 0.0, DT);
            assert_relative_eq!(output, 1.0 / DT);

            // A constant error has no derivative
            let (output, _) = pid.compute(ctx, 1.0, 0.0, DT);
            assert_eq!(output, 0.0);
        }

        #[test]
        fn test_derivative_kick_mitigation() {
            let mut pid = controller(0.0, 0.0, 1.0);
            pid.config_mut().set_use_derivative_on_measurement(true);
            let ctx = PidContext::new();
            assert_eq!(ctx.last_input(), None);

            // No previous measurement, so no derivative
            let (output, ctx) = pid.compute(ctx, 1.0, 0.0, DT);
            assert_eq!(output, 0.0);
            assert_eq!(ctx.last_input(), Some(0.0));

            // A target jump does not kick the derivative on measurement
            let (output, ctx) = pid.compute(ctx, 50.0, 0.0, DT);
            assert_eq!(output, 0.0);

            // Moving towards the target is damped
            let (output, ctx) = pid.compute(ctx, 50.0, 0.2, DT);
            assert_relative_eq!(output, -0.2 / DT, epsilon = 1e-12);
            assert_eq!(ctx.last_input(), Some(0.2));
        }

        #[test]
        fn test_derivative_boosting_and_damping() {
            let mut pid = controller(1.0, 0.0, 1.0);

            // An initial step to start storing error/input
            let (_, ctx) = pid.compute(PidContext::new(), 5.0, 0.0, DT);

            const NEW_TARGET: f64 = 10.0;

            let (output_derivative_on_error, _) = pid.compute(ctx, NEW_TARGET, 1.0, DT);

            pid.config_mut().set_use_derivative_on_measurement(true);
            let (output_derivative_on_measurement, _) = pid.compute(ctx, NEW_TARGET, 1.0, DT);

            assert!(pid.config_mut().set_kd(0.0).is_ok());
            let (output_no_derivative, _) = pid.compute(ctx, NEW_TARGET, 1.0, DT);

            // The growing error boosts the output
            assert!(output_derivative_on_error > output_no_derivative);

            // The ball moving towards the target dampens the output
            assert!(output_derivative_on_measurement < output_no_derivative);
        }
    }

    mod safety_and_lifecycle {
        use super::*;

        #[test]
        fn test_degenerate_step_skips_derivative() {
            let pid = controller(2.0, 1.0, 1.0);

            for dt in [0.0, -0.1, f64::NAN] {
                let (_, ctx) = pid.compute(PidContext::new(), 1.0, 0.0, DT);
                let integral_before = ctx.integral_error();

                let (output, ctx) = pid.compute(ctx, 3.0, 0.5, dt);

                // The integral follows error * dt unless the step is NaN
                let expected_integral = if dt.is_nan() {
                    integral_before
                } else {
                    integral_before + 2.5 * dt
                };

                // P-term plus I-term; no derivative, no division by zero
                assert!(output.is_finite(), "dt = {dt}");
                assert_relative_eq!(ctx.integral_error(), expected_integral);
                assert_relative_eq!(output, 2.0 * 2.5 + expected_integral);
                assert_eq!(ctx.previous_error(), 2.5);
            }
        }

        #[test]
        fn test_negative_step_unwinds_integral() {
            let mut pid = PidController::new(
                PidConfigBuilder::default()
                    .kp(0.0)
                    .ki(1.0)
                    .kd(0.0)
                    .build()
                    .unwrap(),
            );

            let output = pid.compute(1.0, 0.0, -0.1);
            assert_relative_eq!(pid.context().integral_error(), -0.1);
            assert_relative_eq!(output, -0.1);

            // A zero step leaves it where it is
            let output = pid.compute(1.0, 0.0, 0.0);
            assert_relative_eq!(pid.context().integral_error(), -0.1);
            assert_relative_eq!(output, -0.1);
        }

        #[test]
        fn test_matches_textbook_law() {
            let (kp, ki, kd) = (3.0, 0.7, 0.2);
            let pid = controller(kp, ki, kd);
            let mut ctx = PidContext::new();
            let mut output: f64;

            let mut integral = 0.0;
            let mut previous_error = 0.0;
            for (target, position) in [(1.5, 0.0), (1.5, 0.4), (1.0, 0.9), (-1.0, 0.2), (0.0, -2.3)]
            {
                (output, ctx) = pid.compute(ctx, target, position, DT);

                let error = target - position;
                integral += error * DT;
                let expected = kp * error + ki * integral + kd * (error - previous_error) / DT;
                previous_error = error;

                assert_relative_eq!(output, expected, epsilon = 1e-12);
                assert_eq!(ctx.output(), output);
            }
        }

        #[test]
        fn test_forwarding_to_stateful_pid_numerical_equivalence() {
            let gains = PidGains::new(4.0, 1.5, 0.3);
            let func_pid = FuncPidController::new(PidConfig::from_gains(gains).unwrap());
            let mut stateful_pid = make_stateful_controller(gains);
            let mut ctx = PidContext::new();
            let mut expected: f64;

            for i in 0..100 {
                let position = (i as f64 * 0.1).sin();
                (expected, ctx) = func_pid.compute(ctx, 1.0, position, DT);
                let result = stateful_pid.compute(1.0, position, DT);
                assert_eq!(result, expected);
            }
            assert_eq!(stateful_pid.context(), &ctx);
        }

        #[test]
        fn test_single_precision_controller() {
            let config = PidConfigBuilder::<f32>::default()
                .kp(2.0)
                .ki(1.0)
                .build()
                .unwrap();
            let mut pid = PidController::new(config);

            let output = pid.compute(1.0, 0.0, 0.5);
            assert_relative_eq!(output, 2.5f32);
        }
    }
}
