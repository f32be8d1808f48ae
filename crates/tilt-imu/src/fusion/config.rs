use super::FusionError;
use std::fmt;
use std::str::FromStr;

/// Filter variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Madgwick-style normalized gradient step.
    GradientDescent,
    /// Mahony-style proportional/integral cross-product feedback.
    Complementary,
}

impl FromStr for Algorithm {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "madgwick" | "gradient-descent" | "gradient_descent" => Ok(Algorithm::GradientDescent),
            "mahony" | "complementary" => Ok(Algorithm::Complementary),
            _ => Err(FusionError::InvalidAlgorithmSelection(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::GradientDescent => f.write_str("madgwick"),
            Algorithm::Complementary => f.write_str("mahony"),
        }
    }
}

/// Gain parameters, tagged by the algorithm they belong to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gains {
    /// Smaller beta converges slower but smoother.
    GradientDescent { beta: f64 },
    /// `ki <= 0` disables (and clears) the integral term.
    Complementary { kp: f64, ki: f64 },
}

impl Gains {
    pub const DEFAULT_BETA: f64 = 0.4;
    pub const DEFAULT_KP: f64 = 0.5;
    pub const DEFAULT_KI: f64 = 0.0;

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Gains::GradientDescent { .. } => Algorithm::GradientDescent,
            Gains::Complementary { .. } => Algorithm::Complementary,
        }
    }

    pub fn default_for(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::GradientDescent => Gains::GradientDescent {
                beta: Self::DEFAULT_BETA,
            },
            Algorithm::Complementary => Gains::Complementary {
                kp: Self::DEFAULT_KP,
                ki: Self::DEFAULT_KI,
            },
        }
    }

    fn validate(&self) -> Result<(), FusionError> {
        let check = |name: &'static str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(FusionError::InvalidGain(name, value))
            }
        };
        match *self {
            Gains::GradientDescent { beta } => check("beta", beta),
            Gains::Complementary { kp, ki } => {
                check("kp", kp)?;
                // Negative ki is accepted: it disables the integrator.
                if ki.is_finite() {
                    Ok(())
                } else {
                    Err(FusionError::InvalidGain("ki", ki))
                }
            }
        }
    }
}

/// Immutable filter construction parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    /// Nominal time between samples in milliseconds.
    pub sample_interval_ms: f64,
    pub gains: Gains,
    /// Seed the quaternion from the first usable accel (+mag) sample instead
    /// of starting at identity.
    pub require_explicit_init: bool,
}

impl FilterConfig {
    /// Reference device rate.
    pub const DEFAULT_RATE_HZ: f64 = 52.0;

    pub fn from_rate_hz(rate_hz: f64, gains: Gains) -> Self {
        Self {
            sample_interval_ms: 1000.0 / rate_hz,
            gains,
            require_explicit_init: true,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.gains.algorithm()
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        if !(self.sample_interval_ms > 0.0) || !self.sample_interval_ms.is_finite() {
            return Err(FusionError::InvalidSampleInterval(self.sample_interval_ms));
        }
        self.gains.validate()
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::from_rate_hz(
            Self::DEFAULT_RATE_HZ,
            Gains::default_for(Algorithm::GradientDescent),
        )
    }
}
