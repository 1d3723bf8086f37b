//! # State Estimator
//!
//! Converts raw world-frame telemetry into the body-frame quantities used by the controller and
//! by the tyre identification records.
//!
//! Body frame: X forward, Y left, yaw positive anticlockwise seen from above. The bicycle model
//! lumps each axle into a single wheel at `l_front_m` ahead of and `l_rear_m` behind the centre
//! of mass.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::sim::telemetry::TelemetryFrame;
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::clamp_away_from_zero;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Smallest magnitude of the rear wheel surface speed `ω·r` used in the slip ratio.
///
/// Units: meters/second
pub const MIN_WHEEL_SURFACE_SPEED_MS: f64 = 1e-3;

/// Smallest magnitude of the forward speed used in the slip angles.
///
/// Units: meters/second
pub const MIN_FORWARD_SPEED_MS: f64 = 0.1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Vehicle geometry needed by the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
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

    /// Sign convention for the front slip angle.
    pub front_slip_convention: FrontSlipConvention
}

/// Body-frame state estimated from one telemetry frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VehicleState {
    /// Longitudinal velocity.
    ///
    /// Units: meters/second, Frame: body
    pub v_x_ms: f64,

    /// Lateral velocity.
    ///
    /// Units: meters/second, Frame: body
    pub v_y_ms: f64,

    /// Yaw rate.
    ///
    /// Units: radians/second
    pub yaw_rate_rads: f64,

    /// Rear wheel slip ratio, `v_x / (ω·r)`.
    pub slip_ratio: f64,

    /// Units: radians
    pub slip_angle_front_rad: f64,

    /// Units: radians
    pub slip_angle_rear_rad: f64
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How the steering angle enters the front slip angle.
///
/// Calibration scripts disagree on this sign, so it is left selectable rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontSlipConvention {
    /// `δ - atan((ω·l_f + v_y) / v_x)`, as used by the equilibrium solver.
    SteerMinus,

    /// `δ + atan((ω·l_f + v_y) / v_x)`.
    SteerPlus
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for FrontSlipConvention {
    fn default() -> Self {
        FrontSlipConvention::SteerMinus
    }
}

impl VehicleState {
    /// True if every quantity in the state is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.v_x_ms,
            self.v_y_ms,
            self.yaw_rate_rads,
            self.slip_ratio,
            self.slip_angle_front_rad,
            self.slip_angle_rear_rad
        ].iter().all(|v| v.is_finite())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Estimate the body state from a telemetry frame.
///
/// `steer_rad` is the steering angle that was commanded for the tick the frame belongs to.
pub fn estimate(frame: &TelemetryFrame, steer_rad: f64, geometry: &Geometry) -> VehicleState {
    let (v_x_ms, v_y_ms) = to_body_frame(
        frame.vel_x_world_ms as f64,
        frame.vel_y_world_ms as f64,
        frame.yaw_rad as f64
    );
    let yaw_rate_rads = frame.yaw_rate_rads as f64;

    VehicleState {
        v_x_ms,
        v_y_ms,
        yaw_rate_rads,
        slip_ratio: slip_ratio(
            v_x_ms,
            frame.rear_wheel_spin_rads(),
            geometry.wheel_radius_rear_m
        ),
        slip_angle_front_rad: front_slip_angle(
            v_x_ms,
            v_y_ms,
            yaw_rate_rads,
            steer_rad,
            geometry.l_front_m,
            geometry.front_slip_convention
        ),
        slip_angle_rear_rad: rear_slip_angle(v_x_ms, v_y_ms, yaw_rate_rads, geometry.l_rear_m)
    }
}

/// Rotate a world-frame velocity into the body frame of a vehicle with heading `yaw_rad`.
pub fn to_body_frame(v_x_world_ms: f64, v_y_world_ms: f64, yaw_rad: f64) -> (f64, f64) {
    let v_body = Rotation2::new(-yaw_rad) * Vector2::new(v_x_world_ms, v_y_world_ms);

    (v_body[0], v_body[1])
}

/// Slip ratio of a wheel, `v_x / (ω·r)`.
///
/// The wheel surface speed is clamped to at least [`MIN_WHEEL_SURFACE_SPEED_MS`] in magnitude so
/// a stationary wheel yields a large but finite ratio.
pub fn slip_ratio(v_x_ms: f64, wheel_spin_rads: f64, wheel_radius_m: f64) -> f64 {
    v_x_ms / clamp_away_from_zero(wheel_spin_rads * wheel_radius_m, MIN_WHEEL_SURFACE_SPEED_MS)
}

/// Rear tyre slip angle, `atan((ω·l_r - v_y) / v_x)`.
pub fn rear_slip_angle(v_x_ms: f64, v_y_ms: f64, yaw_rate_rads: f64, l_rear_m: f64) -> f64 {
    ((yaw_rate_rads * l_rear_m - v_y_ms) / forward_speed(v_x_ms)).atan()
}

/// Front tyre slip angle for the given steering angle.
pub fn front_slip_angle(
    v_x_ms: f64,
    v_y_ms: f64,
    yaw_rate_rads: f64,
    steer_rad: f64,
    l_front_m: f64,
    convention: FrontSlipConvention
) -> f64 {
    let flow_rad = ((yaw_rate_rads * l_front_m + v_y_ms) / forward_speed(v_x_ms)).atan();

    match convention {
        FrontSlipConvention::SteerMinus => steer_rad - flow_rad,
        FrontSlipConvention::SteerPlus => steer_rad + flow_rad
    }
}

fn forward_speed(v_x_ms: f64) -> f64 {
    clamp_away_from_zero(v_x_ms, MIN_FORWARD_SPEED_MS)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn geometry() -> Geometry {
        Geometry {
            l_front_m: 1.2865,
            l_rear_m: 1.2865,
            wheel_radius_rear_m: 0.4572,
            front_slip_convention: FrontSlipConvention::SteerMinus
        }
    }

    #[test]
    fn test_body_frame_zero_yaw() {
        for &(vx, vy) in [(0.0, 0.0), (14.0, -7.86), (-3.5, 2.25), (1e6, -1e-6)].iter() {
            assert_eq!(to_body_frame(vx, vy, 0.0), (vx, vy));
        }
    }

    #[test]
    fn test_body_frame_quarter_turn() {
        // Facing world +Y, so moving along world +X is moving to the right of the car
        let (vx, vy) = to_body_frame(1.0, 0.0, FRAC_PI_2);
        assert_abs_diff_eq!(vx, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vy, -1.0, epsilon = 1e-12);

        let (vx, vy) = to_body_frame(0.0, 1.0, FRAC_PI_2);
        assert_abs_diff_eq!(vx, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vy, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_slip_ratio() {
        assert_abs_diff_eq!(slip_ratio(14.0, 35.0, 0.4), 1.0, epsilon = 1e-12);

        // Stationary or near-stationary wheels are guarded
        let kappa = slip_ratio(2.0, 0.0, 0.4572);
        assert!(kappa.is_finite());
        assert_abs_diff_eq!(kappa, 2.0 / MIN_WHEEL_SURFACE_SPEED_MS, epsilon = 1e-9);
        assert!(slip_ratio(2.0, -1e-9, 0.4572) < 0.0);
        assert_eq!(slip_ratio(0.0, 0.0, 0.4572), 0.0);
    }

    #[test]
    fn test_slip_angles_at_equilibrium() {
        // Drift equilibrium from the offline solver at 14 m/s with -0.11 rad of steer
        let (vx, vy, r, steer) = (14.0, -7.859404, 0.504893, -0.11);

        let alpha_r = rear_slip_angle(vx, vy, r, 1.2865);
        assert_abs_diff_eq!(alpha_r, ((r * 1.2865 - vy) / vx).atan(), epsilon = 1e-12);
        assert!(alpha_r > 0.5 && alpha_r < 0.6);

        let alpha_f = front_slip_angle(vx, vy, r, steer, 1.2865, FrontSlipConvention::SteerMinus);
        assert_abs_diff_eq!(alpha_f, steer - ((r * 1.2865 + vy) / vx).atan(), epsilon = 1e-12);

        let alpha_f_plus = front_slip_angle(vx, vy, r, steer, 1.2865, FrontSlipConvention::SteerPlus);
        assert_abs_diff_eq!(alpha_f + alpha_f_plus, 2.0 * steer, epsilon = 1e-12);
    }

    #[test]
    fn test_slip_angles_standstill_finite() {
        let alpha_r = rear_slip_angle(0.0, 0.0, 0.0, 1.2865);
        let alpha_f = front_slip_angle(0.0, 0.3, 0.0, 0.0, 1.2865, FrontSlipConvention::SteerMinus);
        assert_eq!(alpha_r, 0.0);
        assert!(alpha_f.is_finite());
        assert_abs_diff_eq!(alpha_f, -(0.3f64 / MIN_FORWARD_SPEED_MS).atan(), epsilon = 1e-12);
    }

    #[test]
    fn test_estimate() {
        let frame = TelemetryFrame {
            vel_x_world_ms: 0.0,
            vel_y_world_ms: 10.0,
            yaw_rad: FRAC_PI_2 as f32,
            yaw_rate_rads: 0.25,
            wheel_spin_rl_rads: 20.0,
            wheel_spin_rr_rads: 24.0,
            ..Default::default()
        };

        let state = estimate(&frame, 0.0, &geometry());
        assert_abs_diff_eq!(state.v_x_ms, 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(state.v_y_ms, 0.0, epsilon = 1e-5);
        assert_eq!(state.yaw_rate_rads, 0.25);
        assert_abs_diff_eq!(state.slip_ratio, state.v_x_ms / (22.0 * 0.4572), epsilon = 1e-12);
        assert!(state.is_finite());

        let stopped = estimate(&TelemetryFrame::default(), 0.0, &geometry());
        assert!(stopped.is_finite());
    }
}
