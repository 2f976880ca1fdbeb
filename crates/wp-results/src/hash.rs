//! Content-based hashing for run IDs.

use sha2::{Digest, Sha256};
use wp_network::Network;
use wp_project::RunConfig;

pub fn compute_run_id(
    config: &RunConfig,
    network: &Network,
    run_type: &crate::types::RunType,
    engine_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let config_json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(config_json.as_bytes());

    let network_json = serde_json::to_string(network).unwrap_or_default();
    hasher.update(network_json.as_bytes());

    let run_type_json = serde_json::to_string(run_type).unwrap_or_default();
    hasher.update(run_type_json.as_bytes());

    hasher.update(engine_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
