//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Push a value away from zero so that its magnitude is at least `min_abs`.
///
/// The sign of `value` is preserved, with zero treated as positive. Values already larger in
/// magnitude than `min_abs` are returned unchanged. A NaN `value` is mapped to `min_abs`.
pub fn clamp_away_from_zero<T>(value: T, min_abs: T) -> T
where
    T: Float
{
    if value.is_nan() {
        return min_abs
    }

    if value.abs() >= min_abs {
        value
    }
    else if value < T::zero() {
        -min_abs
    }
    else {
        min_abs
    }
}
