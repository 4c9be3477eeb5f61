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

/// A second-order plant driven by a scalar control force.
pub trait Plant {
    /// Returns the acceleration at the given position and velocity under `control`.
    fn acceleration(&self, position: f64, velocity: f64, control: f64) -> f64;

    /// Time derivative of the state `[position, velocity]`.
    fn f(&self, x: na::Vector2<f64>, u: f64) -> na::Vector2<f64> {
        na::vector![x[1], self.acceleration(x[0], x[1], u)]
    }

    /// Measured output of the plant, i.e. the position.
    fn h(&self, x: na::Vector2<f64>) -> f64 {
        x[0]
    }
}

/// A ball rolling in a parabolic well `y = x²`, with linear velocity damping. The control
/// input tilts the hill and acts as an external horizontal force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallOnHill {
    /// Restoring force per unit displacement.
    pub stiffness: f64,
    /// Damping force per unit velocity.
    pub damping: f64,
}

impl Default for BallOnHill {
    fn default() -> Self {
        Self {
            stiffness: 5.0,
            damping: 0.5,
        }
    }
}

impl BallOnHill {
    /// Height of the hill surface at `position`, for renderers.
    pub fn height(&self, position: f64) -> f64 {
        position * position
    }

    /// State-space matrices `(A, B)` of the plant:
    /// ┌    ┐   ┌           ┐┌   ┐   ┌   ┐
    /// │ x' │ = │  0    1   ││ x │ + │ 0 │ u
    /// │ v' │   │ -k   -c   ││ v │   │ 1 │
    /// └    ┘   └           ┘└   ┘   └   ┘
    pub fn state_space(&self) -> (na::Matrix2<f64>, na::Vector2<f64>) {
        let mat_a = na::Matrix2::new(0.0, 1.0, -self.stiffness, -self.damping);
        let mat_b = na::Vector2::new(0.0, 1.0);
        (mat_a, mat_b)
    }
}

impl Plant for BallOnHill {
    fn acceleration(&self, position: f64, velocity: f64, control: f64) -> f64 {
        -self.stiffness * position - self.damping * velocity + control
    }

    fn f(&self, x: na::Vector2<f64>, u: f64) -> na::Vector2<f64> {
        let (mat_a, mat_b) = self.state_space();
        mat_a * x + mat_b * u
    }
}

/// Acceleration of the default [`BallOnHill`]: `a = -5x - 0.5v + u`.
pub fn acceleration(position: f64, velocity: f64, control: f64) -> f64 {
    BallOnHill::default().acceleration(position, velocity, control)
}
