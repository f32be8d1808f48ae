//! Orientation extraction from the filter quaternion.
//!
//! Pure functions only; nothing here holds state.

use crate::math::Quaternion;
use glam::DVec3;

/// Rotation about the reference Z, Y and X axes (radians).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerAngles {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl EulerAngles {
    pub fn new(heading: f64, pitch: f64, roll: f64) -> Self {
        Self {
            heading,
            pitch,
            roll,
        }
    }

    pub fn from_degrees(heading: f64, pitch: f64, roll: f64) -> Self {
        Self::new(heading.to_radians(), pitch.to_radians(), roll.to_radians())
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading.to_degrees()
    }

    pub fn pitch_deg(&self) -> f64 {
        self.pitch.to_degrees()
    }

    pub fn roll_deg(&self) -> f64 {
        self.roll.to_degrees()
    }
}

/// Rotation axis (unit length) and angle (radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAngle {
    pub axis: DVec3,
    pub angle: f64,
}

impl AxisAngle {
    /// Zero rotation. The axis is arbitrary but finite.
    pub const NONE: AxisAngle = AxisAngle {
        axis: DVec3::X,
        angle: 0.0,
    };
}

/// Below this `sin(angle/2)` the axis is numerically meaningless.
const AXIS_EPSILON: f64 = 1e-9;

/// Heading, pitch and roll of `q`.
///
/// The pitch `asin` argument is clamped to [-1, 1] so rounding near the poles
/// cannot produce NaN.
pub fn euler_angles(q: &Quaternion) -> EulerAngles {
    let Quaternion { q0, q1, q2, q3 } = *q;

    let heading = (2.0 * (q1 * q2 + q3 * q0)).atan2(q1 * q1 - q2 * q2 - q3 * q3 + q0 * q0);
    let pitch = -(2.0 * (q1 * q3 - q2 * q0)).clamp(-1.0, 1.0).asin();
    let roll = (2.0 * (q2 * q3 + q1 * q0)).atan2(-q1 * q1 - q2 * q2 + q3 * q3 + q0 * q0);

    EulerAngles {
        heading,
        pitch,
        roll,
    }
}

/// Axis-angle form of `q`. A rotation of zero (or a full turn) maps to [`AxisAngle::NONE`].
pub fn to_axis_angle(q: &Quaternion) -> AxisAngle {
    let q0 = q.q0.clamp(-1.0, 1.0);
    let s = (1.0 - q0 * q0).sqrt();
    if !(s > AXIS_EPSILON) {
        return AxisAngle::NONE;
    }

    AxisAngle {
        axis: q.vector() / s,
        angle: 2.0 * q0.acos(),
    }
}
