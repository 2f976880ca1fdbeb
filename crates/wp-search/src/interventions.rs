//! Applying pipe upgrades and leak repairs to a network.

use wp_core::{ElementId, Length, Real, to_mm};
use wp_network::{Attribute, Link, Network, NetworkError};

use crate::costs::CostModel;
use crate::error::SearchResult;

/// What replacing a pipe did to the network.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeUpgrade {
    /// Full replacement cost of every segment at the new diameter.
    pub cost: Real,
    /// Leaks repaired along with the pipe.
    pub absorbed: Vec<ElementId>,
}

/// Replace every segment of pipe `origin` with a new pipe of `diameter`.
///
/// Leaks on the pipe are removed with it at no extra cost.
pub fn upgrade_pipe(
    network: &mut Network,
    origin: &ElementId,
    diameter: Length,
    costs: &CostModel,
) -> SearchResult<PipeUpgrade> {
    let segments: Vec<(ElementId, Length)> = network
        .pipe_segments(origin)
        .map(|p| (p.id.clone(), p.length))
        .collect();
    if segments.is_empty() {
        return Err(NetworkError::NotFound { id: origin.clone() }.into());
    }

    let absorbed: Vec<ElementId> = network.leaks_on(origin).map(|l| l.id.clone()).collect();
    for leak in &absorbed {
        network.remove_leak(leak)?;
    }

    let mut cost = 0.0;
    for (id, length) in &segments {
        network.set_attribute(id, Attribute::Diameter(diameter))?;
        network.set_attribute(id, Attribute::Roughness(costs.replacement_roughness))?;
        cost += costs.pipe_cost(diameter, *length);
    }

    Ok(PipeUpgrade { cost, absorbed })
}

/// Price of replacing every segment of `origin` at `diameter`, leaving the network untouched.
pub fn upgrade_cost(network: &Network, origin: &ElementId, diameter: Length, costs: &CostModel) -> Real {
    network
        .pipe_segments(origin)
        .map(|p| costs.pipe_cost(diameter, p.length))
        .sum()
}

/// Price of repairing `leak`; zero when it is already gone.
pub fn repair_cost(network: &Network, leak: &ElementId, costs: &CostModel) -> Real {
    let Some(node) = network.leak(leak) else {
        return 0.0;
    };
    // Emitter coefficients are stored in SI; repair prices are quoted in (l/s)/m.
    let coefficient = node.emitter_coefficient * 1000.0;
    let diameter_mm = host_diameter_mm(network, leak).unwrap_or(0.0);
    costs.leak_repair_cost(coefficient, diameter_mm)
}

/// Diameter of the pipe carrying `leak`, in millimetres.
pub fn host_diameter_mm(network: &Network, leak: &ElementId) -> Option<Real> {
    let host = &network.leak(leak)?.host_link;
    network.link(host).and_then(Link::diameter).map(to_mm)
}

/// Remove a leak node and its connector, returning the repair cost.
///
/// A leak that is already gone (absorbed by an earlier pipe replacement) costs nothing.
pub fn repair_leak(network: &mut Network, leak: &ElementId, costs: &CostModel) -> SearchResult<Real> {
    if network.leak(leak).is_none() {
        tracing::debug!(leak = %leak, "leak already repaired");
        return Ok(0.0);
    }
    let cost = repair_cost(network, leak, costs);
    network.remove_leak(leak)?;
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wp_core::{m, mm};
    use wp_network::NetworkBuilder;

    fn network() -> Network {
        let mut b = NetworkBuilder::new("interventions");
        b.add_reservoir("R", m(50.0));
        b.add_junction("A", m(0.0));
        b.add_junction("sp_1", m(0.0));
        b.add_junction("B", m(0.0));
        b.add_pipe_segment("P1", "P1", "A", "sp_1", m(30.0), mm(100.0), 90.0);
        b.add_pipe_segment("P1_1", "P1", "sp_1", "B", m(20.0), mm(100.0), 90.0);
        b.add_pipe("P0", "R", "A", m(10.0), mm(300.0), 110.0);
        b.add_leak("Leak_1", "LeakPipe_1", "sp_1", "P1", 0.002);
        b.build().unwrap()
    }

    #[test]
    fn upgrade_replaces_all_segments_and_absorbs_leaks() {
        let mut net = network();
        let costs = CostModel::default();
        let origin = ElementId::from("P1");
        let up = upgrade_pipe(&mut net, &origin, mm(150.0), &costs).unwrap();

        assert_eq!(up.absorbed, vec![ElementId::from("Leak_1")]);
        assert!((up.cost - 180.0 * 50.0).abs() < 1e-6);
        for seg in net.pipe_segments(&origin) {
            assert_eq!(seg.diameter, mm(150.0));
            assert_eq!(seg.roughness, 120.0);
        }
        assert!(net.leak(&ElementId::from("Leak_1")).is_none());
        assert!(net.link(&ElementId::from("LeakPipe_1")).is_none());
        net.validate().unwrap();
    }

    #[test]
    fn prices_match_what_applying_charges() {
        let net = network();
        let costs = CostModel::default();
        let origin = ElementId::from("P1");
        let leak = ElementId::from("Leak_1");

        let quoted_upgrade = upgrade_cost(&net, &origin, mm(150.0), &costs);
        let quoted_repair = repair_cost(&net, &leak, &costs);
        assert_eq!(upgrade_pipe(&mut net.clone(), &origin, mm(150.0), &costs).unwrap().cost, quoted_upgrade);
        assert_eq!(repair_leak(&mut net.clone(), &leak, &costs).unwrap(), quoted_repair);

        let mut repaired = net.clone();
        repair_leak(&mut repaired, &leak, &costs).unwrap();
        assert_eq!(repair_cost(&repaired, &leak, &costs), 0.0);
    }

    #[test]
    fn unknown_pipe_is_an_error() {
        let mut net = network();
        assert!(upgrade_pipe(&mut net, &ElementId::from("P9"), mm(150.0), &CostModel::default()).is_err());
    }

    #[test]
    fn leak_repair_prices_by_coefficient_and_host() {
        let mut net = network();
        let costs = CostModel::default();
        let cost = repair_leak(&mut net, &ElementId::from("Leak_1"), &costs).unwrap();
        // 100 mm host, 2 (l/s)/m.
        assert!((cost - 1_900.0).abs() < 1e-6);
        assert!(net.leak(&ElementId::from("Leak_1")).is_none());
    }

    #[test]
    fn repairing_a_missing_leak_is_free() {
        let mut net = network();
        let costs = CostModel::default();
        let leak = ElementId::from("Leak_1");
        repair_leak(&mut net, &leak, &costs).unwrap();
        assert_eq!(repair_leak(&mut net, &leak, &costs).unwrap(), 0.0);
    }
}
