//! Latency profiles for synthetic operations
//!
//! A profile describes how long each call should take:
//! - **Fixed**: the same latency every call
//! - **Uniform**: sampled uniformly between two bounds
//! - **Normal**: sampled from a normal distribution, floored at zero

use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{ModuleError, Result};

/// Serializable latency description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LatencyProfile {
    /// Constant latency
    Fixed {
        /// Latency of every call
        #[serde(with = "humantime_serde")]
        latency: Duration,
    },
    /// Uniformly distributed latency in `[min, max]`
    Uniform {
        /// Lower bound
        #[serde(with = "humantime_serde")]
        min: Duration,
        /// Upper bound
        #[serde(with = "humantime_serde")]
        max: Duration,
    },
    /// Normally distributed latency
    Normal {
        /// Mean latency
        #[serde(with = "humantime_serde")]
        mean: Duration,
        /// Standard deviation
        #[serde(with = "humantime_serde")]
        std_dev: Duration,
    },
}

impl Default for LatencyProfile {
    fn default() -> Self {
        LatencyProfile::Fixed {
            latency: Duration::ZERO,
        }
    }
}

impl LatencyProfile {
    /// Validate the parameters and build a sampler
    ///
    /// `operation` is only used to label errors.
    pub fn sampler(&self, operation: &str) -> Result<LatencySampler> {
        let invalid = |reason: String| ModuleError::InvalidLatency {
            operation: operation.to_string(),
            reason,
        };

        match *self {
            LatencyProfile::Fixed { latency } => Ok(LatencySampler::Fixed(latency)),
            LatencyProfile::Uniform { min, max } => {
                if min > max {
                    return Err(invalid(format!("min {min:?} exceeds max {max:?}")));
                }
                let (low, high) = (micros(min), micros(max));
                Ok(LatencySampler::Uniform(Uniform::new_inclusive(low, high)))
            }
            LatencyProfile::Normal { mean, std_dev } => {
                let distribution = Normal::new(micros(mean) as f64, micros(std_dev) as f64)
                    .map_err(|e| invalid(e.to_string()))?;
                Ok(LatencySampler::Normal(distribution))
            }
        }
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Validated, ready-to-sample form of a [`LatencyProfile`]
///
/// Distributions work in microseconds.
#[derive(Debug, Clone)]
pub enum LatencySampler {
    /// Constant latency
    Fixed(Duration),
    /// Uniform distribution over microseconds
    Uniform(Uniform<u64>),
    /// Normal distribution over microseconds
    Normal(Normal<f64>),
}

impl LatencySampler {
    /// Draw the latency of the next call
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match self {
            LatencySampler::Fixed(latency) => *latency,
            LatencySampler::Uniform(distribution) => {
                Duration::from_micros(distribution.sample(rng))
            }
            LatencySampler::Normal(distribution) => {
                let micros = distribution.sample(rng).max(0.0);
                Duration::from_micros(micros as u64)
            }
        }
    }
}
