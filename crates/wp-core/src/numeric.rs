/// Floating point type used throughout system
pub type Real = f64;

/// Smallest cost used in place of a free action so benefit/cost stays finite.
pub const MIN_COST: Real = 1e-5;

/// One tolerance for everything
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

/// Replace a zero cost with [`MIN_COST`].
pub fn nonzero_cost(cost: Real) -> Real {
    if cost == 0.0 { MIN_COST } else { cost }
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

    proptest::proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let tol = Tolerances::default();
            proptest::prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }
    }

    #[test]
    fn zero_cost_becomes_epsilon() {
        assert_eq!(nonzero_cost(0.0), MIN_COST);
        assert_eq!(nonzero_cost(12.5), 12.5);
    }
}
