//! Configuration validation logic.

use crate::schema::{LATEST_VERSION, RunConfig, ValveGroups};
use std::collections::HashSet;
use wp_network::Network;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_config(config: &RunConfig) -> Result<(), ValidationError> {
    if config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    if config.objectives.is_empty() {
        return Err(invalid("objectives", "[]", "at least one objective is required"));
    }
    let mut objective_ids = HashSet::new();
    for def in config.objectives.defs() {
        if !objective_ids.insert(def.id) {
            return Err(ValidationError::DuplicateId {
                id: def.id.0.to_string(),
                context: "objectives".to_string(),
            });
        }
    }

    validate_costs(config)?;
    validate_greedy(config)?;

    if config.evaluation.max_attempts == 0 {
        return Err(invalid(
            "evaluation.max_attempts",
            0,
            "at least one attempt is required",
        ));
    }

    if let Some(search) = &config.control_search {
        if search.regimes.is_empty() {
            return Err(invalid(
                "control_search.regimes",
                "[]",
                "at least one time regime is required",
            ));
        }
        let mut names = HashSet::new();
        for regime in &search.regimes {
            if !names.insert(regime.name.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: regime.name.clone(),
                    context: "control_search.regimes".to_string(),
                });
            }
            if regime.start_s >= regime.end_s || regime.end_s > 24 * 3600 {
                return Err(invalid(
                    "control_search.regimes",
                    format!("{}..{}", regime.start_s, regime.end_s),
                    "window must satisfy start < end <= 86400",
                ));
            }
        }
    }

    Ok(())
}

fn validate_costs(config: &RunConfig) -> Result<(), ValidationError> {
    let costs = &config.costs;
    if costs.ladder.is_empty() {
        return Err(invalid("costs.ladder", "[]", "diameter ladder is empty"));
    }
    for class in &costs.ladder {
        if !(class.diameter_mm > 0.0 && class.diameter_mm.is_finite()) {
            return Err(invalid(
                "costs.ladder.diameter_mm",
                class.diameter_mm,
                "must be positive",
            ));
        }
        if !(class.cost_per_m >= 0.0 && class.cost_per_m.is_finite()) {
            return Err(invalid(
                "costs.ladder.cost_per_m",
                class.cost_per_m,
                "must be finite and non-negative",
            ));
        }
    }
    for pair in costs.ladder.windows(2) {
        if pair[1].diameter_mm <= pair[0].diameter_mm {
            return Err(invalid(
                "costs.ladder",
                pair[1].diameter_mm,
                "diameters must be strictly ascending",
            ));
        }
    }
    if costs.leak_tiers.is_empty() {
        return Err(invalid("costs.leak_tiers", "[]", "no leak repair tiers"));
    }
    for tier in &costs.leak_tiers {
        if !(tier.base_cost >= 0.0 && tier.cost_per_coefficient >= 0.0)
            || !tier.base_cost.is_finite()
            || !tier.cost_per_coefficient.is_finite()
        {
            return Err(invalid(
                "costs.leak_tiers",
                tier.up_to_diameter_mm,
                "repair prices must be finite and non-negative",
            ));
        }
    }
    for pair in costs.leak_tiers.windows(2) {
        if pair[1].up_to_diameter_mm <= pair[0].up_to_diameter_mm {
            return Err(invalid(
                "costs.leak_tiers",
                pair[1].up_to_diameter_mm,
                "tiers must be strictly ascending",
            ));
        }
    }
    if !(costs.replacement_roughness > 0.0 && costs.replacement_roughness.is_finite()) {
        return Err(invalid(
            "costs.replacement_roughness",
            costs.replacement_roughness,
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_greedy(config: &RunConfig) -> Result<(), ValidationError> {
    let greedy = &config.greedy;
    if !(greedy.budget >= 0.0 && greedy.budget.is_finite()) {
        return Err(invalid("greedy.budget", greedy.budget, "must be finite and >= 0"));
    }
    if !(0.0..=1.0).contains(&greedy.actions_ratio) {
        return Err(invalid(
            "greedy.actions_ratio",
            greedy.actions_ratio,
            "must lie in [0, 1]",
        ));
    }
    if !(greedy.reevaluate_ratio > 0.0 && greedy.reevaluate_ratio <= 1.0) {
        return Err(invalid(
            "greedy.reevaluate_ratio",
            greedy.reevaluate_ratio,
            "must lie in (0, 1]",
        ));
    }
    if !(greedy.total_run_time_h > 0.0 && greedy.total_run_time_h.is_finite()) {
        return Err(invalid(
            "greedy.total_run_time_h",
            greedy.total_run_time_h,
            "must be positive",
        ));
    }
    if !(greedy.seconds_per_evaluation > 0.0 && greedy.seconds_per_evaluation.is_finite()) {
        return Err(invalid(
            "greedy.seconds_per_evaluation",
            greedy.seconds_per_evaluation,
            "must be positive",
        ));
    }
    if !greedy.loss_threshold.is_finite() {
        return Err(invalid(
            "greedy.loss_threshold",
            greedy.loss_threshold,
            "must be finite",
        ));
    }
    Ok(())
}

/// Structural checks on a valve group file: named, non-empty groups without repeats.
pub fn validate_groups(groups: &ValveGroups) -> Result<(), ValidationError> {
    for (name, valves) in groups.iter() {
        if name.trim().is_empty() {
            return Err(invalid("valve_groups", "\"\"", "group name is empty"));
        }
        if valves.is_empty() {
            return Err(invalid(
                &format!("valve_groups.{name}"),
                "[]",
                "group has no valves",
            ));
        }
        let mut seen = HashSet::new();
        for valve in valves {
            if !seen.insert(valve) {
                return Err(ValidationError::DuplicateId {
                    id: valve.to_string(),
                    context: format!("valve group {name}"),
                });
            }
        }
    }
    Ok(())
}

/// Every grouped valve must be a valve of `network`.
pub fn check_groups_against(groups: &ValveGroups, network: &Network) -> Result<(), ValidationError> {
    for (name, valves) in groups.iter() {
        for valve in valves {
            if network.valve(valve).is_none() {
                return Err(ValidationError::MissingReference {
                    id: valve.to_string(),
                    context: format!("valve group {name}"),
                });
            }
        }
    }
    Ok(())
}
