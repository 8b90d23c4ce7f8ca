use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::*;
use crate::correlator::RetryPolicy;
use crate::transport::PortSettings;

/// Cached controller state, owned by the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Last setpoint written, `None` until one has been set
    pub setpoint: Option<f64>,
    pub output_enabled: bool,
}

/// PID tuning applied once at connect time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParameters {
    /// Proportional bandwidth in degrees C
    pub proportional_bandwidth: f64,
    pub integral_gain: f64,
    pub derivative_gain: f64,
}

impl Default for PidParameters {
    fn default() -> Self {
        PidParameters {
            proportional_bandwidth: PROPORTIONAL_BANDWIDTH,
            integral_gain: INTEGRAL_GAIN,
            derivative_gain: DERIVATIVE_GAIN,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TecConfig {
    pub baud_rate: u32,
    /// How long to wait for each response, in milliseconds
    pub response_timeout_ms: u64,
    /// Writes of one command before a NAK is reported as an error
    pub max_attempts: u32,
    /// Report `NotEnabled` instead of ignoring a set-temperature on a
    /// disabled output
    pub strict_state: bool,
    pub pid: PidParameters,
}

impl TecConfig {
    pub fn port_settings(&self) -> PortSettings {
        PortSettings::with_baud_rate(self.baud_rate)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            response_timeout: Duration::from_millis(self.response_timeout_ms),
        }
    }
}

impl Default for TecConfig {
    fn default() -> Self {
        TecConfig {
            baud_rate: BAUD_RATE,
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            max_attempts: MAX_SEND_ATTEMPTS,
            strict_state: false,
            pid: PidParameters::default(),
        }
    }
}

/// Point-in-time controller status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub timestamp: DateTime<Utc>,
    /// Measured input 1 temperature in degrees C
    pub temperature: f64,
    pub setpoint: Option<f64>,
    pub output_enabled: bool,
    /// Hysteresis in percent, when a setpoint exists
    pub hysteresis: Option<f64>,
    pub settled: Option<bool>,
}
