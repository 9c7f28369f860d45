//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Linearly interpolate between `a` and `b`, `t` is clamped into [0, 1].
pub fn lerp<T>(a: T, b: T, t: T) -> T
where
    T: Float
{
    a + (b - a) * clamp(&t, &T::zero(), &T::one())
}

/// Return where `value` sits between `a` and `b` as a fraction in [0, 1].
///
/// Values outside the range are clamped. If the range is empty zero is
/// returned.
pub fn inverse_lerp<T>(a: T, b: T, value: T) -> T
where
    T: Float
{
    if a == b {
        return T::zero();
    }

    clamp(&((value - a) / (b - a)), &T::zero(), &T::one())
}

/// Clamp a value into `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Return `value` if it is finite, otherwise `default`.
pub fn finite_or<T>(value: T, default: T) -> T
where
    T: Float
{
    if value.is_finite() { value } else { default }
}

/// Wrap an angle in degrees into the range (-180, 180].
pub fn wrap_angle_deg<T>(angle_deg: T) -> T
where
    T: Float
{
    let full = T::from(360.0).unwrap();
    let half = T::from(180.0).unwrap();

    let mut a = angle_deg % full;

    if a > half {
        a = a - full;
    }
    else if a <= -half {
        a = a + full;
    }

    a
}

/// Signed shortest angular distance from `current_deg` to `target_deg`, in
/// the range (-180, 180].
pub fn delta_angle_deg<T>(current_deg: T, target_deg: T) -> T
where
    T: Float
{
    wrap_angle_deg(target_deg - current_deg)
}

/// Move `current` towards `target` by at most `max_delta`.
pub fn move_towards<T>(current: T, target: T, max_delta: T) -> T
where
    T: Float
{
    if (target - current).abs() <= max_delta {
        return target;
    }

    current + (target - current).signum() * max_delta
}

/// Move the angle `current_deg` towards `target_deg` by at most `max_delta_deg`
/// along the shortest path around the circle.
///
/// If the target is within reach it is returned unchanged (not wrapped).
pub fn move_towards_angle_deg<T>(current_deg: T, target_deg: T, max_delta_deg: T) -> T
where
    T: Float
{
    let delta = delta_angle_deg(current_deg, target_deg);

    if -max_delta_deg < delta && delta < max_delta_deg {
        return target_deg;
    }

    move_towards(current_deg, current_deg + delta, max_delta_deg)
}

/// First order follow of `current` towards `target` over `dt`, at `rate` per
/// second: `current + (target - current) * (1 - exp(-rate * dt))`.
///
/// Never overshoots the target for non-negative `rate` and `dt`.
pub fn exp_follow<T>(current: T, target: T, rate: T, dt: T) -> T
where
    T: Float
{
    let alpha = T::one() - (-(rate * dt)).exp();
    current + (target - current) * alpha
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_angle_deg() {
        assert_eq!(wrap_angle_deg(0f64), 0f64);
        assert_eq!(wrap_angle_deg(180f64), 180f64);
        assert_eq!(wrap_angle_deg(-180f64), 180f64);
        assert_eq!(wrap_angle_deg(190f64), -170f64);
        assert_eq!(wrap_angle_deg(-190f64), 170f64);
        assert_eq!(wrap_angle_deg(720f64 + 45f64), 45f64);
        assert_eq!(wrap_angle_deg(-540f64), 180f64);
    }

    #[test]
    fn test_wrap_angle_deg_idempotent() {
        let mut a = -1000f64;
        while a < 1000f64 {
            let w = wrap_angle_deg(a);
            assert!(w > -180.0 && w <= 180.0, "wrap({}) = {}", a, w);
            assert_eq!(wrap_angle_deg(w), w);
            a += 0.37;
        }
    }

    #[test]
    fn test_delta_angle_deg() {
        assert_eq!(delta_angle_deg(10f64, 30f64), 20f64);
        assert_eq!(delta_angle_deg(170f64, -170f64), 20f64);
        assert_eq!(delta_angle_deg(-170f64, 170f64), -20f64);
    }

    #[test]
    fn test_move_towards() {
        assert_eq!(move_towards(0f64, 10f64, 2f64), 2f64);
        assert_eq!(move_towards(0f64, -10f64, 2f64), -2f64);
        assert_eq!(move_towards(0f64, 1f64, 2f64), 1f64);
    }

    #[test]
    fn test_move_towards_angle_deg() {
        // Shortest path goes through the +/-180 boundary
        assert_eq!(move_towards_angle_deg(170f64, -170f64, 5f64), 175f64);
        // Within reach returns the target as given
        assert_eq!(move_towards_angle_deg(170f64, -175f64, 20f64), -175f64);
        assert_eq!(move_towards_angle_deg(0f64, 90f64, 10f64), 10f64);
    }

    #[test]
    fn test_lerp_inverse_lerp() {
        assert_eq!(inverse_lerp(0f64, 0.07, 0.035), 0.5);
        assert_eq!(inverse_lerp(0f64, 0.07, 0.5), 1.0);
        assert_eq!(inverse_lerp(0f64, 0.07, -0.5), 0.0);
        assert_eq!(inverse_lerp(1f64, 1f64, 3.0), 0.0);
        assert_eq!(lerp(0f64, 80.0, 0.5), 40.0);
        assert_eq!(lerp(10f64, 0.0, 2.0), 0.0);
    }

    #[test]
    fn test_finite_or() {
        assert_eq!(finite_or(f64::NAN, 0.0), 0.0);
        assert_eq!(finite_or(f64::INFINITY, 1.0), 1.0);
        assert_eq!(finite_or(2.5f64, 0.0), 2.5);
    }

    #[test]
    fn test_exp_follow() {
        assert_eq!(exp_follow(1f64, 5.0, 12.0, 0.0), 1.0);
        assert!((exp_follow(0f64, 1.0, 1e6, 1.0) - 1.0).abs() < 1e-12);

        let mut x = 0f64;
        for _ in 0..10 {
            let next = exp_follow(x, 1.0, 12.0, 0.02);
            assert!(next > x && next < 1.0);
            x = next;
        }
    }
}
