//! Vector and quaternion helpers shared by both filter variants.

use crate::fusion::FusionError;
use glam::{DQuat, DVec3};
use std::ops::{Add, Mul};

/// Orientation quaternion, scalar first: `q0 + q1·i + q2·j + q3·k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub q0: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(1.0, 0.0, 0.0, 0.0);

    pub const fn new(q0: f64, q1: f64, q2: f64, q3: f64) -> Self {
        Self { q0, q1, q2, q3 }
    }

    /// Pure quaternion `(0, v)`.
    pub fn from_vector(v: DVec3) -> Self {
        Self::new(0.0, v.x, v.y, v.z)
    }

    /// Build from heading/pitch/roll (radians), rotating about Z, then Y, then X.
    ///
    /// This is the inverse of [`crate::orientation::euler_angles`] away from the
    /// ±90° pitch singularity.
    pub fn from_euler(heading: f64, pitch: f64, roll: f64) -> Self {
        let (sy, cy) = (heading * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sr, cr) = (roll * 0.5).sin_cos();

        Self::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }

    pub fn vector(&self) -> DVec3 {
        DVec3::new(self.q1, self.q2, self.q3)
    }

    pub fn norm_squared(&self) -> f64 {
        self.q0 * self.q0 + self.q1 * self.q1 + self.q2 * self.q2 + self.q3 * self.q3
    }

    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn scale(&self, s: f64) -> Self {
        Self::new(self.q0 * s, self.q1 * s, self.q2 * s, self.q3 * s)
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.q0, -self.q1, -self.q2, -self.q3)
    }

    /// Unit-norm copy. A zero or non-finite norm cannot be normalized.
    pub fn normalized(&self) -> Result<Self, FusionError> {
        let norm = self.norm();
        if !(norm > 0.0) || !norm.is_finite() {
            return Err(FusionError::DegenerateVector);
        }
        Ok(self.scale(1.0 / norm))
    }

    /// Rotate `v` from the body frame into the reference frame: `q ⊗ v ⊗ q*`.
    pub fn rotate(&self, v: DVec3) -> DVec3 {
        (*self * Self::from_vector(v) * self.conjugate()).vector()
    }

    pub fn is_finite(&self) -> bool {
        self.q0.is_finite() && self.q1.is_finite() && self.q2.is_finite() && self.q3.is_finite()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Hamilton product.
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, r: Quaternion) -> Quaternion {
        Quaternion::new(
            self.q0 * r.q0 - self.q1 * r.q1 - self.q2 * r.q2 - self.q3 * r.q3,
            self.q0 * r.q1 + self.q1 * r.q0 + self.q2 * r.q3 - self.q3 * r.q2,
            self.q0 * r.q2 - self.q1 * r.q3 + self.q2 * r.q0 + self.q3 * r.q1,
            self.q0 * r.q3 + self.q1 * r.q2 - self.q2 * r.q1 + self.q3 * r.q0,
        )
    }
}

impl Add for Quaternion {
    type Output = Quaternion;

    fn add(self, r: Quaternion) -> Quaternion {
        Quaternion::new(self.q0 + r.q0, self.q1 + r.q1, self.q2 + r.q2, self.q3 + r.q3)
    }
}

impl From<Quaternion> for DQuat {
    fn from(q: Quaternion) -> Self {
        DQuat::from_xyzw(q.q1, q.q2, q.q3, q.q0)
    }
}

impl From<DQuat> for Quaternion {
    fn from(q: DQuat) -> Self {
        Quaternion::new(q.w, q.x, q.y, q.z)
    }
}

/// Unit-length copy of `v`, or `DegenerateVector` when its norm is zero or not finite.
pub fn normalize_or_degenerate(v: DVec3) -> Result<DVec3, FusionError> {
    let norm = v.length();
    if !(norm > 0.0) || !norm.is_finite() {
        return Err(FusionError::DegenerateVector);
    }
    Ok(v / norm)
}

/// An all-zero reading means the sensor is absent or saturated to nothing.
pub fn is_zero(v: DVec3) -> bool {
    v.x == 0.0 && v.y == 0.0 && v.z == 0.0
}

/// Quaternion rate of change from a body-frame angular rate: `0.5 · q ⊗ (0, ω)`.
pub fn gyro_derivative(q: &Quaternion, gyro: DVec3) -> Quaternion {
    (*q * Quaternion::from_vector(gyro)).scale(0.5)
}
