use super::{check_gyro, check_interval, initial_quaternion, usable_mag, Algorithm, Filter, FusionError};
use crate::math::{gyro_derivative, normalize_or_degenerate, Quaternion};
use glam::DVec3;

/// Gradient-descent orientation filter.
///
/// Each step integrates the gyro rate and subtracts `beta` times the
/// normalized gradient of the gravity (and magnetic field) alignment error.
#[derive(Debug, Clone)]
pub struct Madgwick {
    q: Quaternion,
    beta: f64,
    require_init: bool,
    initialised: bool,
}

impl Madgwick {
    pub fn new(beta: f64) -> Self {
        Self {
            q: Quaternion::IDENTITY,
            beta,
            require_init: false,
            initialised: true,
        }
    }

    /// Seed from the first usable sample rather than starting at identity.
    pub fn with_explicit_init(mut self, enabled: bool) -> Self {
        self.require_init = enabled;
        self.initialised = !enabled;
        self
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

/// Below this the gradient is rounding noise; normalizing it would produce an
/// arbitrary full-size step.
const GRADIENT_EPSILON: f64 = 1e-12;

/// Gradient of the objective function `J^T f` for the current estimate.
///
/// `a` and `m` must already be unit length.
fn objective_gradient(q: &Quaternion, a: DVec3, m: Option<DVec3>) -> Quaternion {
    let Quaternion { q0, q1, q2, q3 } = *q;

    // Gravity: predicted minus measured direction in the body frame.
    let f1 = 2.0 * (q1 * q3 - q0 * q2) - a.x;
    let f2 = 2.0 * (q0 * q1 + q2 * q3) - a.y;
    let f3 = 2.0 * (0.5 - q1 * q1 - q2 * q2) - a.z;

    let mut s = Quaternion::new(
        -2.0 * q2 * f1 + 2.0 * q1 * f2,
        2.0 * q3 * f1 + 2.0 * q0 * f2 - 4.0 * q1 * f3,
        -2.0 * q0 * f1 + 2.0 * q3 * f2 - 4.0 * q2 * f3,
        2.0 * q1 * f1 + 2.0 * q2 * f2,
    );

    if let Some(m) = m {
        // Reference field, flattened onto the north/down plane.
        let h = q.rotate(m);
        let bx = (h.x * h.x + h.y * h.y).sqrt();
        let bz = h.z;

        let fb1 = 2.0 * bx * (0.5 - q2 * q2 - q3 * q3) + 2.0 * bz * (q1 * q3 - q0 * q2) - m.x;
        let fb2 = 2.0 * bx * (q1 * q2 - q0 * q3) + 2.0 * bz * (q0 * q1 + q2 * q3) - m.y;
        let fb3 = 2.0 * bx * (q0 * q2 + q1 * q3) + 2.0 * bz * (0.5 - q1 * q1 - q2 * q2) - m.z;

        s = s + Quaternion::new(
            -2.0 * bz * q2 * fb1 + (-2.0 * bx * q3 + 2.0 * bz * q1) * fb2 + 2.0 * bx * q2 * fb3,
            2.0 * bz * q3 * fb1
                + (2.0 * bx * q2 + 2.0 * bz * q0) * fb2
                + (2.0 * bx * q3 - 4.0 * bz * q1) * fb3,
            (-4.0 * bx * q2 - 2.0 * bz * q0) * fb1
                + (2.0 * bx * q1 + 2.0 * bz * q3) * fb2
                + (2.0 * bx * q0 - 4.0 * bz * q2) * fb3,
            (-4.0 * bx * q3 + 2.0 * bz * q1) * fb1
                + (-2.0 * bx * q0 + 2.0 * bz * q2) * fb2
                + 2.0 * bx * q1 * fb3,
        );
    }

    s
}

impl Filter for Madgwick {
    fn update(
        &mut self,
        gyro: DVec3,
        accel: DVec3,
        mag: Option<DVec3>,
        dt: f64,
    ) -> Result<(), FusionError> {
        check_interval(dt)?;
        check_gyro(gyro)?;

        if !self.initialised && self.init(accel, mag).is_err() {
            tracing::trace!("Deferring initialisation, accelerometer unusable");
        }

        let mut q_dot = gyro_derivative(&self.q, gyro);

        match normalize_or_degenerate(accel) {
            Ok(a) => {
                let gradient = objective_gradient(&self.q, a, usable_mag(mag));
                // A vanishing gradient means the estimate is already aligned.
                if gradient.norm() > GRADIENT_EPSILON {
                    let step = gradient.normalized()?;
                    q_dot = q_dot + step.scale(-self.beta);
                }
            }
            Err(_) => tracing::trace!("Accelerometer unusable, gyro-only step"),
        }

        self.q = (self.q + q_dot.scale(dt)).normalized()?;
        Ok(())
    }

    fn quaternion(&self) -> Quaternion {
        self.q
    }

    fn init(&mut self, accel: DVec3, mag: Option<DVec3>) -> Result<(), FusionError> {
        self.q = initial_quaternion(accel, mag)?;
        self.initialised = true;
        Ok(())
    }

    fn is_initialised(&self) -> bool {
        self.initialised
    }

    fn reset(&mut self) {
        self.q = Quaternion::IDENTITY;
        self.initialised = !self.require_init;
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::GradientDescent
    }
}
