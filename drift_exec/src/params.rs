//! # Drift Executable Parameters
//!
//! This module provides parameters for the drift executable, and the configuration error shared by
//! every parameter set that is checked before the run starts.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::time::Duration;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ExecParams {

    /// Number of driving ticks to run for. Handshake sends do not count.
    pub max_ticks: u64,

    /// Optional wall-clock limit on the whole run, handshake included.
    ///
    /// Units: seconds
    #[serde(default)]
    pub max_duration_s: Option<f64>,

    /// Number of consecutive failed ticks tolerated before the run is aborted.
    pub max_consec_failures: u32,

    /// Period between neutral datagrams during the handshake.
    ///
    /// Units: milliseconds
    pub handshake_period_ms: u64,

    /// Write the per-tick archive to the session directory.
    #[serde(default = "default_archive")]
    pub archive: bool
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised when a parameter set is out of range. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Parameter {name} must be finite, found {value}")]
    NotFinite {
        name: &'static str,
        value: f64
    },

    #[error("Parameter {name} must be greater than zero, found {value}")]
    NotPositive {
        name: &'static str,
        value: f64
    },

    #[error("Parameter {name} must be in [{min}, {max}], found {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64
    },

    #[error(
        "Trigger speed ({trigger_ms} m/s) must be below the target speed ({target_ms} m/s) or the \
        launch will never end"
    )]
    TriggerNotBelowTarget {
        trigger_ms: f64,
        target_ms: f64
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExecParams {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ticks == 0 {
            return Err(ConfigError::NotPositive {
                name: "max_ticks",
                value: 0.0
            })
        }

        if let Some(d) = self.max_duration_s {
            check_positive("max_duration_s", d)?;
        }

        if self.handshake_period_ms == 0 {
            return Err(ConfigError::NotPositive {
                name: "handshake_period_ms",
                value: 0.0
            })
        }

        Ok(())
    }

    pub fn handshake_period(&self) -> Duration {
        Duration::from_millis(self.handshake_period_ms)
    }
}

impl Default for ExecParams {
    fn default() -> Self {
        Self {
            max_ticks: 1500,
            max_duration_s: None,
            max_consec_failures: 10,
            handshake_period_ms: 10,
            archive: default_archive()
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_archive() -> bool {
    true
}

/// Check that a parameter is finite.
pub fn check_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    }
    else {
        Err(ConfigError::NotFinite { name, value })
    }
}

/// Check that a parameter is finite and strictly positive.
pub fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(name, value)?;

    if value > 0.0 {
        Ok(())
    }
    else {
        Err(ConfigError::NotPositive { name, value })
    }
}

/// Check that a parameter is finite and within `[min, max]`.
pub fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    check_finite(name, value)?;

    if value >= min && value <= max {
        Ok(())
    }
    else {
        Err(ConfigError::OutOfRange { name, value, min, max })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exec_params_from_toml() {
        let params: ExecParams = toml::from_str(
            "max_ticks = 200\nmax_consec_failures = 3\nhandshake_period_ms = 5\n"
        ).unwrap();

        assert_eq!(params.max_ticks, 200);
        assert_eq!(params.max_duration_s, None);
        assert!(params.archive);
        assert_eq!(params.handshake_period(), Duration::from_millis(5));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_exec_params_validate() {
        let mut params = ExecParams::default();
        assert!(params.validate().is_ok());

        params.max_duration_s = Some(-1.0);
        assert_eq!(
            params.validate(),
            Err(ConfigError::NotPositive { name: "max_duration_s", value: -1.0 })
        );

        params.max_duration_s = None;
        params.max_ticks = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_checks() {
        assert!(check_finite("x", f64::NAN).is_err());
        assert!(check_positive("x", 0.0).is_err());
        assert!(check_positive("x", f64::INFINITY).is_err());
        assert!(check_range("x", 1.0, 0.0, 1.0).is_ok());
        assert_eq!(
            check_range("x", 1.5, 0.0, 1.0),
            Err(ConfigError::OutOfRange { name: "x", value: 1.5, min: 0.0, max: 1.0 })
        );
    }
}
