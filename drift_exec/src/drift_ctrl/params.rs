//! Parameters structure for DriftCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::ThrottleMode;
use crate::est::{FrontSlipConvention, Geometry};
use crate::params::{check_finite, check_positive, check_range, ConfigError};
use crate::tyre::TyreCoeffs;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drift control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Distance from the centre of mass to the front axle.
    ///
    /// Units: meters
    pub l_front_m: f64,

    /// Distance from the centre of mass to the rear axle.
    ///
    /// Units: meters
    pub l_rear_m: f64,

    /// Rolling radius of the rear wheels.
    ///
    /// Units: meters
    pub wheel_radius_rear_m: f64,

    /// Units: kilograms
    pub mass_kg: f64,

    // ---- TYRES ----

    pub tyre_front: TyreCoeffs,

    pub tyre_rear: TyreCoeffs,

    /// Sign convention for the front slip angle.
    #[serde(default)]
    pub front_slip_convention: FrontSlipConvention,

    // ---- TARGETS ----

    /// Longitudinal speed held by the throttle law.
    ///
    /// Units: meters/second
    pub target_v_x_ms: f64,

    /// Lateral speed of the drift equilibrium.
    ///
    /// Units: meters/second
    pub target_v_y_ms: f64,

    /// Yaw rate of the drift equilibrium.
    ///
    /// Units: radians/second
    pub target_yaw_rate_rads: f64,

    // ---- GAINS ----

    /// Throttle gain.
    ///
    /// Units: 1/(meters/second)
    pub k_v: f64,

    /// Steering gain on lateral speed error.
    ///
    /// Units: radians/(meters/second)
    pub k_y: f64,

    /// Steering gain on yaw rate error.
    ///
    /// Units: seconds
    pub k_r: f64,

    /// Steering angle held at the equilibrium.
    ///
    /// Units: radians
    pub steer_base_offset_rad: f64,

    /// Limits applied to the throttle law output.
    #[serde(default)]
    pub throttle_mode: ThrottleMode,

    // ---- PHASES ----

    /// Time spent sending neutral handshake datagrams before driving.
    ///
    /// Units: seconds
    pub handshake_warmup_s: f64,

    /// Fixed throttle used while launching. If not set the throttle law is used from the start.
    #[serde(default)]
    pub launch_throttle: Option<f64>,

    /// Longitudinal speed which, once exceeded, triggers the drift.
    ///
    /// Units: meters/second
    pub trigger_v_x_ms: f64,

    /// Number of ticks between the trigger and the start of drift steering.
    pub dwell_ticks: u32
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a physically sensible vehicle and controller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("l_front_m", self.l_front_m)?;
        check_positive("l_rear_m", self.l_rear_m)?;
        check_positive("wheel_radius_rear_m", self.wheel_radius_rear_m)?;
        check_positive("mass_kg", self.mass_kg)?;

        check_finite("tyre_front.b", self.tyre_front.b)?;
        check_finite("tyre_front.c", self.tyre_front.c)?;
        check_positive("tyre_front.d", self.tyre_front.d)?;
        check_finite("tyre_rear.b", self.tyre_rear.b)?;
        check_finite("tyre_rear.c", self.tyre_rear.c)?;
        check_positive("tyre_rear.d", self.tyre_rear.d)?;

        check_positive("target_v_x_ms", self.target_v_x_ms)?;
        check_finite("target_v_y_ms", self.target_v_y_ms)?;
        check_finite("target_yaw_rate_rads", self.target_yaw_rate_rads)?;

        check_positive("k_v", self.k_v)?;
        check_finite("k_y", self.k_y)?;
        check_finite("k_r", self.k_r)?;
        check_finite("steer_base_offset_rad", self.steer_base_offset_rad)?;

        check_range("handshake_warmup_s", self.handshake_warmup_s, 0.0, f64::MAX)?;
        if let Some(t) = self.launch_throttle {
            check_range("launch_throttle", t, 0.0, 1.0)?;
        }
        check_positive("trigger_v_x_ms", self.trigger_v_x_ms)?;
        if self.trigger_v_x_ms >= self.target_v_x_ms {
            return Err(ConfigError::TriggerNotBelowTarget {
                trigger_ms: self.trigger_v_x_ms,
                target_ms: self.target_v_x_ms
            })
        }
        check_positive("dwell_ticks", self.dwell_ticks as f64)?;

        Ok(())
    }

    /// The vehicle geometry used by the estimator.
    pub fn geometry(&self) -> Geometry {
        Geometry {
            l_front_m: self.l_front_m,
            l_rear_m: self.l_rear_m,
            wheel_radius_rear_m: self.wheel_radius_rear_m,
            front_slip_convention: self.front_slip_convention
        }
    }
}

/// The calibrated reference car: 1000 kg, 14 m/s drift at -7.86 m/s lateral speed.
impl Default for Params {
    fn default() -> Self {
        Self {
            l_front_m: 1.2865,
            l_rear_m: 1.2865,
            wheel_radius_rear_m: 0.4572,
            mass_kg: 1000.0,
            tyre_front: TyreCoeffs { b: 5.115, c: 0.1379, d: 47940.0 },
            tyre_rear: TyreCoeffs { b: 57.64, c: 0.03489, d: 131700.0 },
            front_slip_convention: FrontSlipConvention::SteerMinus,
            target_v_x_ms: 14.0,
            target_v_y_ms: -7.8594,
            target_yaw_rate_rads: 0.5049,
            k_v: 1.3,
            k_y: 0.096,
            k_r: -0.65,
            steer_base_offset_rad: -0.11,
            throttle_mode: ThrottleMode::Clamped,
            handshake_warmup_s: 20.0,
            launch_throttle: None,
            trigger_v_x_ms: 13.8,
            dwell_ticks: 50
        }
    }
}
