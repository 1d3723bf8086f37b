//! # Drift control laws
//!
//! Proportional throttle law on longitudinal speed, and the linear state feedback steering law
//! which holds the car at its drift equilibrium.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

pub const THROTTLE_MIN: f64 = 0.0;

pub const THROTTLE_MAX: f64 = 1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits applied to the throttle law output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleMode {
    /// Saturate to `[THROTTLE_MIN, THROTTLE_MAX]`.
    Clamped,

    /// Pass the raw law output straight to the simulator.
    Unclamped
}

/// Throttle controller, `k_v·(v_x* - v_x)`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThrottleCtrl {
    k_v: f64,
    target_v_x_ms: f64,
    mode: ThrottleMode
}

/// Steering controller, `δ₀ - k_y·(v_y* - v_y) - k_r·(ω* - ω)`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SteerCtrl {
    base_offset_rad: f64,
    k_y: f64,
    k_r: f64,
    target_v_y_ms: f64,
    target_yaw_rate_rads: f64
}

/// Output of the throttle controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleDemand {
    /// Law output before any limits.
    pub raw: f64,

    /// Demand to send.
    pub value: f64,

    /// True if `value` differs from `raw` because of the limits.
    pub limited: bool
}

/// The pair of controllers used by DriftCtrl.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DriftControllers {
    pub throttle: ThrottleCtrl,
    pub steer: SteerCtrl
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ThrottleMode {
    fn default() -> Self {
        ThrottleMode::Clamped
    }
}

impl ThrottleCtrl {
    pub fn new(k_v: f64, target_v_x_ms: f64, mode: ThrottleMode) -> Self {
        Self { k_v, target_v_x_ms, mode }
    }

    /// Get the throttle demand for the current longitudinal speed.
    pub fn get(&self, v_x_ms: f64) -> ThrottleDemand {
        let raw = self.k_v * (self.target_v_x_ms - v_x_ms);

        let value = match self.mode {
            ThrottleMode::Clamped => raw.max(THROTTLE_MIN).min(THROTTLE_MAX),
            ThrottleMode::Unclamped => raw
        };

        ThrottleDemand {
            raw,
            value,
            limited: value != raw
        }
    }
}

impl SteerCtrl {
    pub fn new(
        base_offset_rad: f64,
        k_y: f64,
        k_r: f64,
        target_v_y_ms: f64,
        target_yaw_rate_rads: f64
    ) -> Self {
        Self { base_offset_rad, k_y, k_r, target_v_y_ms, target_yaw_rate_rads }
    }

    /// Get the steering angle demand for the current lateral speed and yaw rate.
    ///
    /// Units: radians
    pub fn get(&self, v_y_ms: f64, yaw_rate_rads: f64) -> f64 {
        self.base_offset_rad
            - self.k_y * (self.target_v_y_ms - v_y_ms)
            - self.k_r * (self.target_yaw_rate_rads - yaw_rate_rads)
    }
}

impl DriftControllers {
    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            throttle: ThrottleCtrl::new(
                params.k_v, params.target_v_x_ms, params.throttle_mode
            ),
            steer: SteerCtrl::new(
                params.steer_base_offset_rad,
                params.k_y,
                params.k_r,
                params.target_v_y_ms,
                params.target_yaw_rate_rads
            )
        }
    }
}
