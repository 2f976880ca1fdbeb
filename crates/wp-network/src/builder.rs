//! Incremental network builder.

use std::collections::BTreeMap;
use wp_core::{ElementId, Length, m};

use crate::error::{NetworkError, NetworkResult};
use crate::model::{
    Junction, LeakConnector, LeakNode, Link, LinkStatus, Node, Pipe, Reservoir, Valve,
};
use crate::network::Network;
use crate::validate;

/// Builder for constructing a network incrementally.
///
/// Use the `add_*` methods to describe elements, then call `build()` to
/// validate and freeze them into a [`Network`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    name: String,
    links: Vec<Link>,
    nodes: Vec<Node>,
}

impl NetworkBuilder {
    /// Create a new empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_junction(&mut self, id: impl Into<ElementId>, elevation: Length) -> ElementId {
        let id = id.into();
        self.nodes.push(Node::Junction(Junction {
            id: id.clone(),
            elevation,
        }));
        id
    }

    pub fn add_reservoir(&mut self, id: impl Into<ElementId>, head: Length) -> ElementId {
        let id = id.into();
        self.nodes.push(Node::Reservoir(Reservoir {
            id: id.clone(),
            head,
        }));
        id
    }

    /// Add an unsplit pipe (its origin is its own id).
    pub fn add_pipe(
        &mut self,
        id: impl Into<ElementId>,
        from: impl Into<ElementId>,
        to: impl Into<ElementId>,
        length: Length,
        diameter: Length,
        roughness: f64,
    ) -> ElementId {
        let id = id.into();
        self.add_pipe_segment(id.clone(), id, from, to, length, diameter, roughness)
    }

    /// Add one segment of a pipe that was split into several pieces.
    #[allow(clippy::too_many_arguments)]
    pub fn add_pipe_segment(
        &mut self,
        id: impl Into<ElementId>,
        origin: impl Into<ElementId>,
        from: impl Into<ElementId>,
        to: impl Into<ElementId>,
        length: Length,
        diameter: Length,
        roughness: f64,
    ) -> ElementId {
        let id = id.into();
        self.links.push(Link::Pipe(Pipe {
            id: id.clone(),
            origin: origin.into(),
            from: from.into(),
            to: to.into(),
            length,
            diameter,
            roughness,
            status: LinkStatus::Open,
        }));
        id
    }

    pub fn add_valve(
        &mut self,
        id: impl Into<ElementId>,
        from: impl Into<ElementId>,
        to: impl Into<ElementId>,
        diameter: Length,
        initial_status: LinkStatus,
    ) -> ElementId {
        let id = id.into();
        self.links.push(Link::Valve(Valve {
            id: id.clone(),
            from: from.into(),
            to: to.into(),
            diameter,
            initial_status,
        }));
        id
    }

    /// Add a leak node at `split_node` on `host_link`, together with its connector.
    ///
    /// The leak takes the elevation of the split node when that node is known.
    pub fn add_leak(
        &mut self,
        id: impl Into<ElementId>,
        connector: impl Into<ElementId>,
        split_node: impl Into<ElementId>,
        host_link: impl Into<ElementId>,
        emitter_coefficient: f64,
    ) -> ElementId {
        let id = id.into();
        let connector = connector.into();
        let split_node = split_node.into();
        let elevation = self
            .nodes
            .iter()
            .find_map(|n| match n {
                Node::Junction(j) if j.id == split_node => Some(j.elevation),
                _ => None,
            })
            .unwrap_or_else(|| m(0.0));

        self.links.push(Link::LeakConnector(LeakConnector {
            id: connector.clone(),
            from: split_node,
            to: id.clone(),
        }));
        self.nodes.push(Node::Leak(LeakNode {
            id: id.clone(),
            elevation,
            host_link: host_link.into(),
            connector,
            emitter_coefficient,
        }));
        id
    }

    /// Build and validate the network.
    pub fn build(self) -> NetworkResult<Network> {
        let mut nodes = BTreeMap::new();
        for node in self.nodes {
            let id = node.id().clone();
            if nodes.insert(id.clone(), node).is_some() {
                return Err(NetworkError::DuplicateId { id });
            }
        }

        let mut links = BTreeMap::new();
        for link in self.links {
            let id = link.id().clone();
            if nodes.contains_key(&id) || links.insert(id.clone(), link).is_some() {
                return Err(NetworkError::DuplicateId { id });
            }
        }

        validate::validate_network(&links, &nodes)?;

        Ok(Network {
            name: self.name,
            links,
            nodes,
            controls: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wp_core::mm;

    #[test]
    fn builder_basic() {
        let mut b = NetworkBuilder::new("basic");
        b.add_reservoir("R", m(30.0));
        b.add_junction("J", m(5.0));
        b.add_pipe("P", "R", "J", m(100.0), mm(150.0), 120.0);
        let net = b.build().unwrap();

        assert_eq!(net.name(), "basic");
        assert_eq!(net.nodes().count(), 2);
        let pipe = net.pipe(&ElementId::from("P")).unwrap();
        assert_eq!(pipe.origin, pipe.id);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut b = NetworkBuilder::new("dup");
        b.add_junction("J", m(0.0));
        b.add_junction("J", m(1.0));
        assert!(matches!(
            b.build(),
            Err(NetworkError::DuplicateId { .. })
        ));
    }

    #[test]
    fn leak_takes_split_elevation() {
        let mut b = NetworkBuilder::new("leak");
        b.add_junction("A", m(0.0));
        b.add_junction("sp", m(7.5));
        b.add_pipe("P", "A", "sp", m(10.0), mm(100.0), 100.0);
        b.add_leak("L", "LC", "sp", "P", 1e-3);
        let net = b.build().unwrap();
        assert_eq!(net.leak(&ElementId::from("L")).unwrap().elevation, m(7.5));
    }
}
