use crate::BlockError;

/// Floating point type used throughout the engine.
pub type Real = f64;

#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, BlockError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(BlockError::NonFinite { what, value: v })
    }
}

/// Number of fixed steps of size `dt` needed to reach `t_end` from zero.
///
/// Steps are counted rather than accumulated so that long runs do not
/// drift past `t_end` through repeated addition.
pub fn step_count(t_end: Real, dt: Real) -> usize {
    if t_end <= 0.0 || dt <= 0.0 {
        return 0;
    }
    let n = t_end / dt;
    let rounded = n.round();
    if nearly_equal(n, rounded, Tolerances::default()) {
        rounded as usize
    } else {
        n.ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn step_count_exact_and_partial() {
        assert_eq!(step_count(5.0, 0.01), 500);
        assert_eq!(step_count(1.0, 0.3), 4);
        assert_eq!(step_count(0.0, 0.1), 0);
        assert_eq!(step_count(1.0, 0.0), 0);
    }

    proptest::proptest! {
        #[test]
        fn step_count_recovers_whole_multiples(k in 0usize..100_000, dt in 1e-4f64..1.0) {
            proptest::prop_assert_eq!(step_count(k as f64 * dt, dt), k);
        }
    }
}
