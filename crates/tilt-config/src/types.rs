use serde::{Deserialize, Serialize};
use tilt_imu::fusion::{Algorithm, FilterConfig, FusionError, Gains};
use tilt_imu::protocol::ScaleFactors;
use tilt_input::{GestureError, GestureThresholds};

/// Top-level settings. Every section falls back to its defaults when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fusion filter configuration.
    pub filter: FilterSettings,
    /// Tilt thresholds for the button mapping.
    pub gestures: GestureSettings,
    /// Where samples come from and how they are scaled.
    pub transport: TransportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// `madgwick` or `mahony`.
    pub algorithm: String,
    /// Nominal device sample rate.
    pub sample_rate_hz: f64,
    /// Madgwick step size. Higher = faster convergence, more noise.
    pub beta: f64,
    /// Mahony proportional gain.
    pub kp: f64,
    /// Mahony integral gain. 0 disables bias estimation.
    pub ki: f64,
    /// Seed the orientation from the first accelerometer reading.
    pub require_explicit_init: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::GradientDescent.to_string(),
            sample_rate_hz: FilterConfig::DEFAULT_RATE_HZ,
            beta: Gains::DEFAULT_BETA,
            kp: Gains::DEFAULT_KP,
            ki: Gains::DEFAULT_KI,
            require_explicit_init: true,
        }
    }
}

impl FilterSettings {
    /// Build a validated filter configuration. Only the gains belonging to the
    /// selected algorithm are used.
    pub fn to_filter_config(&self) -> Result<FilterConfig, FusionError> {
        let algorithm: Algorithm = self.algorithm.parse()?;
        let gains = match algorithm {
            Algorithm::GradientDescent => Gains::GradientDescent { beta: self.beta },
            Algorithm::Complementary => Gains::Complementary {
                kp: self.kp,
                ki: self.ki,
            },
        };
        let config = FilterConfig {
            require_explicit_init: self.require_explicit_init,
            ..FilterConfig::from_rate_hz(self.sample_rate_hz, gains)
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    pub roll_deg: f64,
    pub pitch_deg: f64,
    /// Enables UP/DOWN when set.
    pub vertical_pitch_deg: Option<f64>,
}

impl Default for GestureSettings {
    fn default() -> Self {
        let thresholds = GestureThresholds::default();
        Self {
            roll_deg: thresholds.roll_deg,
            pitch_deg: thresholds.pitch_deg,
            vertical_pitch_deg: thresholds.vertical_pitch_deg,
        }
    }
}

impl GestureSettings {
    pub fn to_thresholds(&self) -> Result<GestureThresholds, GestureError> {
        let thresholds = GestureThresholds {
            roll_deg: self.roll_deg,
            pitch_deg: self.pitch_deg,
            vertical_pitch_deg: self.vertical_pitch_deg,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// `host:port` of a serial-to-TCP bridge. `None` reads stdin.
    pub address: Option<String>,
    /// Accelerometer LSB per g.
    pub accel_lsb: f64,
    /// Gyro LSB per degree/second.
    pub gyro_lsb: f64,
    /// Fixed-point multiplier applied on the device.
    pub fixed_point: f64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        let scale = ScaleFactors::default();
        Self {
            address: None,
            accel_lsb: scale.accel_lsb,
            gyro_lsb: scale.gyro_lsb,
            fixed_point: scale.fixed_point,
        }
    }
}

impl TransportSettings {
    pub fn scale_factors(&self) -> ScaleFactors {
        ScaleFactors {
            accel_lsb: self.accel_lsb,
            gyro_lsb: self.gyro_lsb,
            fixed_point: self.fixed_point,
        }
    }
}
