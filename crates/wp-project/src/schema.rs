//! Run configuration schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wp_core::ElementId;
use wp_eval::{ObjectiveSet, RetryPolicy};
use wp_search::{ControlSearchConfig, CostModel, GreedyConfig};

/// Newest configuration version understood by this crate.
pub const LATEST_VERSION: u32 = 1;

/// Everything a planning run needs besides the network and the scoring engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub objectives: ObjectiveSet,
    #[serde(default)]
    pub costs: CostModel,
    #[serde(default)]
    pub evaluation: RetryPolicy,
    #[serde(default)]
    pub greedy: GreedyConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_search: Option<ControlSearchConfig>,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: LATEST_VERSION,
            name: name.into(),
            objectives: ObjectiveSet::default(),
            costs: CostModel::default(),
            evaluation: RetryPolicy::default(),
            greedy: GreedyConfig::default(),
            control_search: None,
        }
    }
}

/// Valve groups searched independently by the control search, keyed by group name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ValveGroups(pub BTreeMap<String, Vec<ElementId>>);

impl ValveGroups {
    pub fn get(&self, group: &str) -> Option<&[ElementId]> {
        self.0.get(group).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ElementId])> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Vec<ElementId>); N]> for ValveGroups {
    fn from(groups: [(K, Vec<ElementId>); N]) -> Self {
        Self(groups.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
