//! Objective identifiers, vectors and reference benchmarks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use wp_core::Real;

/// Index of one objective in the scoring engine's fixed enumeration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectiveId(pub u8);

impl fmt::Debug for ObjectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectiveId({})", self.0)
    }
}

impl fmt::Display for ObjectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Objective scores keyed by objective id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectiveVector(BTreeMap<ObjectiveId, Real>);

impl ObjectiveVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ObjectiveId) -> Option<Real> {
        self.0.get(&id).copied()
    }

    pub fn insert(&mut self, id: ObjectiveId, value: Real) -> Option<Real> {
        self.0.insert(id, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectiveId, Real)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = ObjectiveId> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum over all objectives.
    pub fn sum(&self) -> Real {
        self.0.values().sum()
    }

    /// Copy with every value rounded to `decimals` places.
    pub fn rounded(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        self.iter()
            .map(|(k, v)| (k, (v * factor).round() / factor))
            .collect()
    }
}

impl FromIterator<(ObjectiveId, Real)> for ObjectiveVector {
    fn from_iter<T: IntoIterator<Item = (ObjectiveId, Real)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(u8, Real); N]> for ObjectiveVector {
    fn from(pairs: [(u8, Real); N]) -> Self {
        pairs
            .into_iter()
            .map(|(k, v)| (ObjectiveId(k), v))
            .collect()
    }
}

/// Whether an objective improves by going down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveDef {
    pub id: ObjectiveId,
    pub sense: Sense,
}

/// The objectives reported by the scoring engine.
///
/// Scores are expected in the unit interval, so the ideal value of an objective
/// is 0 when minimised and 1 when maximised; the worst case is the opposite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectiveSet(Vec<ObjectiveDef>);

impl Default for ObjectiveSet {
    /// Nine objectives; 3, 7 and 8 are minimised, the rest maximised.
    fn default() -> Self {
        let minimised = [3, 7, 8];
        Self(
            (1..=9)
                .map(|i| ObjectiveDef {
                    id: ObjectiveId(i),
                    sense: if minimised.contains(&i) {
                        Sense::Minimize
                    } else {
                        Sense::Maximize
                    },
                })
                .collect(),
        )
    }
}

impl ObjectiveSet {
    pub fn new(defs: Vec<ObjectiveDef>) -> Self {
        Self(defs)
    }

    pub fn defs(&self) -> &[ObjectiveDef] {
        &self.0
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectiveId> + '_ {
        self.0.iter().map(|d| d.id)
    }

    pub fn sense(&self, id: ObjectiveId) -> Option<Sense> {
        self.0.iter().find(|d| d.id == id).map(|d| d.sense)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Upper bound of a summed normalized score (one unit per objective).
    pub fn ceiling(&self) -> Real {
        self.0.len() as Real
    }

    /// The all-optimal vector.
    pub fn ideal(&self) -> ObjectiveVector {
        self.0
            .iter()
            .map(|d| match d.sense {
                Sense::Minimize => (d.id, 0.0),
                Sense::Maximize => (d.id, 1.0),
            })
            .collect()
    }

    /// The vector reported in place of a result that could not be computed.
    pub fn worst_case(&self) -> ObjectiveVector {
        self.0
            .iter()
            .map(|d| match d.sense {
                Sense::Minimize => (d.id, 1.0),
                Sense::Maximize => (d.id, 0.0),
            })
            .collect()
    }
}

/// A best/worst pair of reference vectors spanning the normalization range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub best: ObjectiveVector,
    pub worst: ObjectiveVector,
}

impl Benchmarks {
    /// Ideal vector against a given worst reference.
    pub fn against(set: &ObjectiveSet, worst: ObjectiveVector) -> Self {
        Self {
            best: set.ideal(),
            worst,
        }
    }

    /// Best and worst observed value of every objective across a table of results.
    pub fn from_rows<'a, I>(set: &ObjectiveSet, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a ObjectiveVector>,
    {
        let mut lo: BTreeMap<ObjectiveId, Real> = BTreeMap::new();
        let mut hi: BTreeMap<ObjectiveId, Real> = BTreeMap::new();
        for row in rows {
            for (k, v) in row.iter() {
                lo.entry(k).and_modify(|x| *x = x.min(v)).or_insert(v);
                hi.entry(k).and_modify(|x| *x = x.max(v)).or_insert(v);
            }
        }

        let mut best = ObjectiveVector::new();
        let mut worst = ObjectiveVector::new();
        for def in set.defs() {
            let (Some(&min), Some(&max)) = (lo.get(&def.id), hi.get(&def.id)) else {
                continue;
            };
            let (b, w) = match def.sense {
                Sense::Minimize => (min, max),
                Sense::Maximize => (max, min),
            };
            best.insert(def.id, b);
            worst.insert(def.id, w);
        }
        Self { best, worst }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_worst_case() {
        let set = ObjectiveSet::default();
        let expected = ObjectiveVector::from([
            (1, 0.0),
            (2, 0.0),
            (3, 1.0),
            (4, 0.0),
            (5, 0.0),
            (6, 0.0),
            (7, 1.0),
            (8, 1.0),
            (9, 0.0),
        ]);
        assert_eq!(set.worst_case(), expected);
        assert_eq!(set.ceiling(), 9.0);
    }

    #[test]
    fn ideal_is_mirror_of_worst_case() {
        let set = ObjectiveSet::default();
        let ideal = set.ideal();
        for (k, w) in set.worst_case().iter() {
            assert_eq!(ideal.get(k), Some(1.0 - w));
        }
    }

    #[test]
    fn benchmarks_follow_sense() {
        let set = ObjectiveSet::new(vec![
            ObjectiveDef {
                id: ObjectiveId(1),
                sense: Sense::Maximize,
            },
            ObjectiveDef {
                id: ObjectiveId(2),
                sense: Sense::Minimize,
            },
        ]);
        let rows = [
            ObjectiveVector::from([(1, 0.2), (2, 0.7)]),
            ObjectiveVector::from([(1, 0.9), (2, 0.1)]),
            ObjectiveVector::from([(1, 0.5), (2, 0.4)]),
        ];
        let b = Benchmarks::from_rows(&set, &rows);
        assert_eq!(b.best, ObjectiveVector::from([(1, 0.9), (2, 0.1)]));
        assert_eq!(b.worst, ObjectiveVector::from([(1, 0.2), (2, 0.7)]));
    }

    #[test]
    fn rounding() {
        let v = ObjectiveVector::from([(1, 0.123_456), (2, 0.5)]);
        assert_eq!(v.rounded(3), ObjectiveVector::from([(1, 0.123), (2, 0.5)]));
    }
}
