//! Best/worst-relative normalization of objective vectors.

use serde::{Deserialize, Serialize};
use wp_core::{Real, Tolerances, nearly_equal};

use crate::objective::{Benchmarks, ObjectiveVector};

/// Orientation of the normalized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// 1 at `best`, 0 at `worst`.
    HigherIsBetter,
    /// 0 at `best`, 1 at `worst`.
    LowerIsBetter,
}

impl Orientation {
    /// Value of a key that cannot be placed on a best-worst span.
    pub fn neutral(self) -> Real {
        match self {
            Orientation::HigherIsBetter => 0.0,
            Orientation::LowerIsBetter => 1.0,
        }
    }
}

/// Map each objective of `raw` into `[0, 1]` by its position between `worst` and `best`.
///
/// Works for either raw direction: the span `worst - best` carries the sign.
/// Keys without a reference value, or whose best and worst coincide, take
/// [`Orientation::neutral`].
pub fn normalize(
    raw: &ObjectiveVector,
    worst: &ObjectiveVector,
    best: &ObjectiveVector,
    orientation: Orientation,
) -> ObjectiveVector {
    let tol = Tolerances::default();
    raw.iter()
        .map(|(k, v)| {
            let value = match (worst.get(k), best.get(k)) {
                (Some(w), Some(b)) if !nearly_equal(w, b, tol) && v.is_finite() => {
                    let closeness = ((w - v) / (w - b)).clamp(0.0, 1.0);
                    match orientation {
                        Orientation::HigherIsBetter => closeness,
                        Orientation::LowerIsBetter => 1.0 - closeness,
                    }
                }
                _ => orientation.neutral(),
            };
            (k, value)
        })
        .collect()
}

/// Summed normalized score of `raw` against a benchmark pair.
pub fn normalized_score(
    raw: &ObjectiveVector,
    benchmarks: &Benchmarks,
    orientation: Orientation,
) -> Real {
    normalize(raw, &benchmarks.worst, &benchmarks.best, orientation).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vec_of(values: &[f64]) -> ObjectiveVector {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (crate::ObjectiveId(i as u8 + 1), *v))
            .collect()
    }

    #[test]
    fn midpoint_is_half() {
        let raw = vec_of(&[0.5, 0.5]);
        let worst = vec_of(&[0.0, 1.0]);
        let best = vec_of(&[1.0, 0.0]);
        let n = normalize(&raw, &worst, &best, Orientation::HigherIsBetter);
        assert_eq!(n, vec_of(&[0.5, 0.5]));
        let n = normalize(&raw, &worst, &best, Orientation::LowerIsBetter);
        assert_eq!(n, vec_of(&[0.5, 0.5]));
    }

    #[test]
    fn beyond_span_is_clamped() {
        let raw = vec_of(&[2.0, -1.0]);
        let worst = vec_of(&[0.0, 0.0]);
        let best = vec_of(&[1.0, 1.0]);
        let n = normalize(&raw, &worst, &best, Orientation::HigherIsBetter);
        assert_eq!(n, vec_of(&[1.0, 0.0]));
    }

    #[test]
    fn missing_reference_is_neutral() {
        let raw = vec_of(&[0.3, 0.3]);
        let worst = vec_of(&[0.0]);
        let best = vec_of(&[1.0]);
        let n = normalize(&raw, &worst, &best, Orientation::LowerIsBetter);
        assert_eq!(n.get(crate::ObjectiveId(2)), Some(1.0));
    }

    fn unit_vec(len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(0.0f64..=1.0, len)
    }

    proptest! {
        #[test]
        fn equal_references_give_neutral(raw in unit_vec(9), worst in unit_vec(9)) {
            let raw = vec_of(&raw);
            let worst = vec_of(&worst);
            for o in [Orientation::HigherIsBetter, Orientation::LowerIsBetter] {
                let n = normalize(&raw, &worst, &worst, o);
                prop_assert!(n.iter().all(|(_, v)| v == o.neutral()));
            }
        }

        #[test]
        fn best_maps_to_maximum(worst in unit_vec(9), best in unit_vec(9)) {
            let worst = vec_of(&worst);
            let best = vec_of(&best);
            let n = normalize(&best, &worst, &best, Orientation::HigherIsBetter);
            for (k, v) in n.iter() {
                let (w, b) = (worst.get(k).unwrap(), best.get(k).unwrap());
                if nearly_equal(w, b, Tolerances::default()) {
                    prop_assert_eq!(v, 0.0);
                } else {
                    prop_assert_eq!(v, 1.0);
                }
            }
        }

        #[test]
        fn output_is_bounded_and_repeatable(
            raw in proptest::collection::vec(-5.0f64..5.0, 9),
            worst in unit_vec(9),
            best in unit_vec(9),
        ) {
            let (raw, worst, best) = (vec_of(&raw), vec_of(&worst), vec_of(&best));
            let a = normalize(&raw, &worst, &best, Orientation::LowerIsBetter);
            let b = normalize(&raw, &worst, &best, Orientation::LowerIsBetter);
            prop_assert_eq!(&a, &b);
            prop_assert!(a.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
        }

        #[test]
        fn key_order_does_not_matter(
            values in proptest::collection::vec((0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0), 1..9),
        ) {
            let forward = |rev: bool| {
                let mut idx: Vec<usize> = (0..values.len()).collect();
                if rev {
                    idx.reverse();
                }
                let build = |pick: fn(&(f64, f64, f64)) -> f64| -> ObjectiveVector {
                    idx.iter()
                        .map(|&i| (crate::ObjectiveId(i as u8), pick(&values[i])))
                        .collect()
                };
                (build(|t| t.0), build(|t| t.1), build(|t| t.2))
            };
            let (r1, w1, b1) = forward(false);
            let (r2, w2, b2) = forward(true);
            prop_assert_eq!(
                normalize(&r1, &w1, &b1, Orientation::HigherIsBetter),
                normalize(&r2, &w2, &b2, Orientation::HigherIsBetter)
            );
        }
    }
}
