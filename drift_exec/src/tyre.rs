//! # Tyre model
//!
//! Pacejka "Magic Formula" lateral force model, and the steady-state axle forces implied by a
//! measured yaw rate. Comparing the two over a run is how the coefficients are identified.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::clamp_away_from_zero;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Smallest magnitude of `cos(δ)` used when resolving the front axle force.
const MIN_COS_STEER: f64 = 1e-3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Magic Formula coefficients for one axle, `F = D·sin(C·atan(B·α))`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TyreCoeffs {
    /// Stiffness factor.
    pub b: f64,

    /// Shape factor.
    pub c: f64,

    /// Peak factor.
    ///
    /// Units: newtons
    pub d: f64
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TyreCoeffs {
    /// Lateral force generated at the given slip angle.
    ///
    /// Units: newtons
    pub fn lateral_force_n(&self, slip_angle_rad: f64) -> f64 {
        self.d * (self.c * (self.b * slip_angle_rad).atan()).sin()
    }

    /// True if all three coefficients are finite.
    pub fn is_finite(&self) -> bool {
        self.b.is_finite() && self.c.is_finite() && self.d.is_finite()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Rear axle lateral force needed to hold a steady turn, `m·v_x·ω·l_f / (l_f + l_r)`.
pub fn rear_axle_force_n(
    mass_kg: f64,
    v_x_ms: f64,
    yaw_rate_rads: f64,
    l_front_m: f64,
    l_rear_m: f64
) -> f64 {
    mass_kg * v_x_ms * yaw_rate_rads * l_front_m / (l_front_m + l_rear_m)
}

/// Front axle lateral force needed to hold a steady turn,
/// `m·v_x·ω·l_r / ((l_f + l_r)·cos δ)`.
pub fn front_axle_force_n(
    mass_kg: f64,
    v_x_ms: f64,
    yaw_rate_rads: f64,
    l_front_m: f64,
    l_rear_m: f64,
    steer_rad: f64
) -> f64 {
    mass_kg * v_x_ms * yaw_rate_rads * l_rear_m
        / ((l_front_m + l_rear_m) * clamp_away_from_zero(steer_rad.cos(), MIN_COS_STEER))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    const REAR: TyreCoeffs = TyreCoeffs { b: 57.64, c: 0.03489, d: 131700.0 };
    const FRONT: TyreCoeffs = TyreCoeffs { b: 5.115, c: 0.1379, d: 47940.0 };

    #[test]
    fn test_magic_formula_odd() {
        for coeffs in [REAR, FRONT].iter() {
            assert_eq!(coeffs.lateral_force_n(0.0), 0.0);

            for &alpha in [0.01, 0.1, 0.55, 1.2, 10.0].iter() {
                assert_abs_diff_eq!(
                    coeffs.lateral_force_n(-alpha),
                    -coeffs.lateral_force_n(alpha),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_magic_formula_bounded() {
        let sharp = TyreCoeffs { b: 10.0, c: 1.0, d: 5000.0 };

        for coeffs in [REAR, FRONT, sharp].iter() {
            for i in -200..=200 {
                let alpha = i as f64 * 0.05;
                assert!(coeffs.lateral_force_n(alpha).abs() <= coeffs.d);
            }
        }

        // With C = 1 the curve approaches D as the slip grows
        assert_abs_diff_eq!(sharp.lateral_force_n(1e6), 5000.0, epsilon = 1e-3);
        assert!(sharp.lateral_force_n(0.1) < sharp.lateral_force_n(1.0));
    }

    #[test]
    fn test_axle_forces() {
        let (m, vx, r, l) = (1000.0, 14.0, 0.504893, 1.2865);

        // Equal lever arms split the centripetal force evenly
        let rear = rear_axle_force_n(m, vx, r, l, l);
        assert_abs_diff_eq!(rear, 0.5 * m * vx * r, epsilon = 1e-9);
        assert_abs_diff_eq!(front_axle_force_n(m, vx, r, l, l, 0.0), rear, epsilon = 1e-9);
        assert!(front_axle_force_n(m, vx, r, l, l, -0.11) > rear);

        let sideways = front_axle_force_n(m, vx, r, l, l, std::f64::consts::FRAC_PI_2);
        assert!(sideways.is_finite());
    }
}
