use super::{check_gyro, check_interval, initial_quaternion, usable_mag, Algorithm, Filter, FusionError};
use crate::math::{gyro_derivative, normalize_or_degenerate, Quaternion};
use glam::DVec3;

/// Complementary (PI feedback) orientation filter.
///
/// The cross product between measured and predicted reference directions is
/// fed back into the gyro rate through `kp` and an integral term through `ki`.
#[derive(Debug, Clone)]
pub struct Mahony {
    q: Quaternion,
    kp: f64,
    ki: f64,
    /// Accumulated `ki · e · dt` (rad/s). Always zero while `ki <= 0`.
    integral: DVec3,
    require_init: bool,
    initialised: bool,
}

impl Mahony {
    pub fn new(kp: f64, ki: f64) -> Self {
        Self {
            q: Quaternion::IDENTITY,
            kp,
            ki,
            integral: DVec3::ZERO,
            require_init: false,
            initialised: true,
        }
    }

    pub fn with_explicit_init(mut self, enabled: bool) -> Self {
        self.require_init = enabled;
        self.initialised = !enabled;
        self
    }

    pub fn integral(&self) -> DVec3 {
        self.integral
    }

    /// Alignment error between the measured and predicted directions.
    fn error(&self, a: DVec3, m: Option<DVec3>) -> DVec3 {
        let Quaternion { q0, q1, q2, q3 } = self.q;

        // Gravity as the current estimate expects to see it in the body frame.
        let v = DVec3::new(
            2.0 * (q1 * q3 - q0 * q2),
            2.0 * (q0 * q1 + q2 * q3),
            q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3,
        );
        let mut e = a.cross(v);

        if let Some(m) = m {
            let h = self.q.rotate(m);
            let b = DVec3::new((h.x * h.x + h.y * h.y).sqrt(), 0.0, h.z);
            let w = self.q.conjugate().rotate(b);
            e += m.cross(w);
        }

        e
    }
}

impl Filter for Mahony {
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

        let mut omega = gyro;

        match normalize_or_degenerate(accel) {
            Ok(a) => {
                let e = self.error(a, usable_mag(mag));
                if self.ki > 0.0 {
                    self.integral += e * (self.ki * dt);
                } else {
                    self.integral = DVec3::ZERO;
                }
                omega += e * self.kp + self.integral;
            }
            Err(_) => tracing::trace!("Accelerometer unusable, gyro-only step"),
        }

        let q_dot = gyro_derivative(&self.q, omega);
        self.q = (self.q + q_dot.scale(dt)).normalized()?;
        Ok(())
    }

    fn quaternion(&self) -> Quaternion {
        self.q
    }

    fn init(&mut self, accel: DVec3, mag: Option<DVec3>) -> Result<(), FusionError> {
        self.q = initial_quaternion(accel, mag)?;
        self.integral = DVec3::ZERO;
        self.initialised = true;
        Ok(())
    }

    fn is_initialised(&self) -> bool {
        self.initialised
    }

    fn reset(&mut self) {
        self.q = Quaternion::IDENTITY;
        self.integral = DVec3::ZERO;
        self.initialised = !self.require_init;
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::Complementary
    }
}
