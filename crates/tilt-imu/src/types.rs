use crate::math::Quaternion;
use crate::orientation::{euler_angles, EulerAngles};
use glam::DVec3;

/// One inertial reading, already converted to engine units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Gyroscope angular velocity (rad/s).
    pub gyro: DVec3,
    /// Accelerometer reading. Only the direction is used.
    pub accel: DVec3,
    /// Magnetometer reading, if the device reports one.
    pub mag: Option<DVec3>,
}

impl Sample {
    pub fn imu(gyro: DVec3, accel: DVec3) -> Self {
        Self {
            gyro,
            accel,
            mag: None,
        }
    }

    pub fn marg(gyro: DVec3, accel: DVec3, mag: DVec3) -> Self {
        Self {
            gyro,
            accel,
            mag: Some(mag),
        }
    }
}

/// Fused orientation output, recomputed after every filter update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Body orientation as a unit quaternion (scalar first).
    pub quaternion: Quaternion,
    /// Heading/pitch/roll derived from `quaternion`.
    pub angles: EulerAngles,
}

impl Orientation {
    pub fn from_quaternion(quaternion: Quaternion) -> Self {
        Self {
            quaternion,
            angles: euler_angles(&quaternion),
        }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::from_quaternion(Quaternion::IDENTITY)
    }
}
