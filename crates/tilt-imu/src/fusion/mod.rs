//! Attitude filters and the sensor fusion front end.
//!
//! Two interchangeable algorithms sit behind the [`Filter`] trait: a
//! gradient-descent filter ([`Madgwick`]) and a complementary PI filter
//! ([`Mahony`]). The variant is picked once from a [`FilterConfig`]; callers
//! only see `update`/`quaternion`/`init`.

mod config;
mod madgwick;
mod mahony;

pub use config::{Algorithm, FilterConfig, Gains};
pub use madgwick::Madgwick;
pub use mahony::Mahony;

use crate::math::{is_zero, normalize_or_degenerate, Quaternion};
use crate::types::{Orientation, Sample};
use glam::DVec3;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    #[error("Sample interval must be positive and finite, got {0}")]
    InvalidSampleInterval(f64),
    #[error("Unrecognized filter algorithm {0:?}")]
    InvalidAlgorithmSelection(String),
    #[error("Gain {0} must be non-negative and finite, got {1}")]
    InvalidGain(&'static str, f64),
    #[error("Vector norm is zero where normalization was required")]
    DegenerateVector,
    #[error("Sample contains non-finite gyroscope values")]
    NonFiniteSample,
}

/// Capability shared by every attitude filter.
pub trait Filter: Send {
    /// Fold one sample into the estimate. `dt` is in seconds.
    ///
    /// A zero accelerometer (or one that cannot be normalized) skips the
    /// correction step; the gyro is still integrated. A zero or missing
    /// magnetometer falls back to the accelerometer-only path.
    fn update(
        &mut self,
        gyro: DVec3,
        accel: DVec3,
        mag: Option<DVec3>,
        dt: f64,
    ) -> Result<(), FusionError>;

    /// Current unit quaternion.
    fn quaternion(&self) -> Quaternion;

    /// Seed the estimate directly from a gravity (and optional field) reading.
    fn init(&mut self, accel: DVec3, mag: Option<DVec3>) -> Result<(), FusionError>;

    /// False only while explicit initialisation is pending.
    fn is_initialised(&self) -> bool;

    /// Back to the identity quaternion with a pending initialisation (if configured).
    fn reset(&mut self);

    fn algorithm(&self) -> Algorithm;
}

/// Build the filter selected by `config`.
pub fn create_filter(config: &FilterConfig) -> Result<Box<dyn Filter>, FusionError> {
    config.validate()?;
    let filter: Box<dyn Filter> = match config.gains {
        Gains::GradientDescent { beta } => {
            Box::new(Madgwick::new(beta).with_explicit_init(config.require_explicit_init))
        }
        Gains::Complementary { kp, ki } => {
            Box::new(Mahony::new(kp, ki).with_explicit_init(config.require_explicit_init))
        }
    };
    Ok(filter)
}

pub(crate) fn check_interval(dt: f64) -> Result<(), FusionError> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(FusionError::InvalidSampleInterval(dt));
    }
    Ok(())
}

pub(crate) fn check_gyro(gyro: DVec3) -> Result<(), FusionError> {
    if !gyro.is_finite() {
        return Err(FusionError::NonFiniteSample);
    }
    Ok(())
}

/// Magnetometer reading usable for the 9-axis path, if any.
pub(crate) fn usable_mag(mag: Option<DVec3>) -> Option<DVec3> {
    mag.filter(|m| !is_zero(*m))
        .and_then(|m| normalize_or_degenerate(m).ok())
}

/// Orientation implied by a single static reading.
///
/// Roll and pitch come from the gravity direction. Heading is the
/// tilt-compensated magnetic heading, or zero without a magnetometer.
pub fn initial_quaternion(accel: DVec3, mag: Option<DVec3>) -> Result<Quaternion, FusionError> {
    let a = normalize_or_degenerate(accel)?;
    let roll = a.y.atan2(a.z);
    let pitch = (-a.x).atan2((a.y * a.y + a.z * a.z).sqrt());

    let heading = match usable_mag(mag) {
        Some(m) => {
            let level = Quaternion::from_euler(0.0, pitch, roll).rotate(m);
            (-level.y).atan2(level.x)
        }
        None => 0.0,
    };

    Quaternion::from_euler(heading, pitch, roll).normalized()
}

/// Front end that owns one filter and turns samples into [`Orientation`]s.
pub struct SensorFusion {
    filter: Box<dyn Filter>,
    /// Nominal time between samples (seconds).
    sample_dt: f64,
    sample_count: u64,
}

impl SensorFusion {
    pub fn new(config: &FilterConfig) -> Result<Self, FusionError> {
        let filter = create_filter(config)?;
        tracing::info!(
            algorithm = ?filter.algorithm(),
            sample_interval_ms = config.sample_interval_ms,
            explicit_init = config.require_explicit_init,
            "Sensor fusion created"
        );
        Ok(Self {
            filter,
            sample_dt: config.sample_interval_ms / 1000.0,
            sample_count: 0,
        })
    }

    /// Process a sample taken `dt` seconds after the previous one.
    pub fn update(&mut self, sample: &Sample, dt: f64) -> Result<Orientation, FusionError> {
        let was_initialised = self.filter.is_initialised();
        self.filter
            .update(sample.gyro, sample.accel, sample.mag, dt)?;

        if !was_initialised && self.filter.is_initialised() {
            let orientation = self.orientation();
            tracing::info!(
                heading = orientation.angles.heading_deg(),
                pitch = orientation.angles.pitch_deg(),
                roll = orientation.angles.roll_deg(),
                "Orientation initialised from first sample"
            );
        }

        self.sample_count += 1;
        if self.sample_count % 1000 == 0 {
            tracing::debug!(sample_count = self.sample_count, "IMU samples fused");
        }

        Ok(self.orientation())
    }

    /// Process a sample arriving at the configured sample interval.
    pub fn update_nominal(&mut self, sample: &Sample) -> Result<Orientation, FusionError> {
        self.update(sample, self.sample_dt)
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_quaternion(self.filter.quaternion())
    }

    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.sample_count = 0;
        tracing::info!("Sensor fusion reset");
    }
}
