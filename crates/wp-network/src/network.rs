//! The mutable network state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wp_core::{ElementId, LinkId, NodeId};

use crate::error::{NetworkError, NetworkResult};
use crate::model::{
    Attribute, ControlRule, Element, LeakNode, Link, LinkStatus, Node, Pipe, Valve,
};
use crate::validate;

/// A validated network: links, nodes and control rules keyed by stable ids.
///
/// `Clone` produces a deep, independent copy; nothing is shared between a
/// clone and its origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub(crate) name: String,
    pub(crate) links: BTreeMap<LinkId, Link>,
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    #[serde(default)]
    pub(crate) controls: Vec<ControlRule>,
}

impl Network {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn controls(&self) -> &[ControlRule] {
        &self.controls
    }

    pub fn link(&self, id: &ElementId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn node(&self, id: &ElementId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.links.contains_key(id) || self.nodes.contains_key(id)
    }

    /// Look up any element by id.
    pub fn get_element(&self, id: &ElementId) -> NetworkResult<Element<'_>> {
        if let Some(link) = self.links.get(id) {
            return Ok(Element::Link(link));
        }
        self.nodes
            .get(id)
            .map(Element::Node)
            .ok_or_else(|| NetworkError::NotFound { id: id.clone() })
    }

    pub fn pipe(&self, id: &ElementId) -> Option<&Pipe> {
        self.links.get(id).and_then(Link::as_pipe)
    }

    pub fn valve(&self, id: &ElementId) -> Option<&Valve> {
        self.links.get(id).and_then(Link::as_valve)
    }

    pub fn pipes(&self) -> impl Iterator<Item = &Pipe> {
        self.links.values().filter_map(Link::as_pipe)
    }

    pub fn valves(&self) -> impl Iterator<Item = &Valve> {
        self.links.values().filter_map(Link::as_valve)
    }

    pub fn leaks(&self) -> impl Iterator<Item = &LeakNode> {
        self.nodes.values().filter_map(Node::as_leak)
    }

    pub fn leak(&self, id: &ElementId) -> Option<&LeakNode> {
        self.nodes.get(id).and_then(Node::as_leak)
    }

    /// All segments that share the pre-split identifier `origin`.
    pub fn pipe_segments<'a>(&'a self, origin: &'a ElementId) -> impl Iterator<Item = &'a Pipe> {
        self.pipes().filter(move |p| &p.origin == origin)
    }

    /// Leaks sitting on any segment of the pipe `origin`.
    pub fn leaks_on<'a>(&'a self, origin: &'a ElementId) -> impl Iterator<Item = &'a LeakNode> {
        self.leaks().filter(move |leak| {
            self.pipe(&leak.host_link)
                .is_some_and(|host| &host.origin == origin)
        })
    }

    /// Apply a typed attribute update.
    pub fn set_attribute(&mut self, id: &ElementId, attribute: Attribute) -> NetworkResult<()> {
        let mismatch = || NetworkError::AttributeMismatch {
            id: id.clone(),
            attribute: attribute.name(),
        };

        if let Some(link) = self.links.get_mut(id) {
            match (link, attribute) {
                (Link::Pipe(p), Attribute::Diameter(d)) => p.diameter = positive(d)?,
                (Link::Pipe(p), Attribute::Roughness(r)) => p.roughness = r,
                (Link::Pipe(p), Attribute::Status(s)) => p.status = s,
                (Link::Valve(v), Attribute::Diameter(d)) => v.diameter = positive(d)?,
                (Link::Valve(v), Attribute::InitialStatus(s) | Attribute::Status(s)) => {
                    v.initial_status = s
                }
                _ => return Err(mismatch()),
            }
            return Ok(());
        }

        match (self.nodes.get_mut(id), attribute) {
            (Some(Node::Leak(leak)), Attribute::EmitterCoefficient(c)) => {
                if c.is_nan() || c < 0.0 {
                    return Err(NetworkError::InvalidValue {
                        what: "emitter coefficient must be non-negative",
                    });
                }
                leak.emitter_coefficient = c;
                Ok(())
            }
            (Some(_), _) => Err(mismatch()),
            (None, _) => Err(NetworkError::NotFound { id: id.clone() }),
        }
    }

    /// Remove an element.
    ///
    /// Removing a leak node also removes its connector. A connector cannot be
    /// removed on its own, and a node with incident links cannot be removed.
    /// Removing a link drops every control rule attached to it.
    pub fn remove_element(&mut self, id: &ElementId) -> NetworkResult<()> {
        match self.links.get(id) {
            Some(Link::LeakConnector(_)) => {
                return Err(NetworkError::ConnectorRemoval { id: id.clone() });
            }
            Some(Link::Pipe(_)) if self.leaks().any(|l| &l.host_link == id) => {
                return Err(NetworkError::NodeInUse { id: id.clone() });
            }
            Some(_) => {
                self.links.remove(id);
                self.controls.retain(|c| &c.link != id);
                return Ok(());
            }
            None => {}
        }

        match self.nodes.get(id) {
            Some(Node::Leak(_)) => self.remove_leak(id).map(|_| ()),
            Some(_) => {
                if self.links.values().any(|l| {
                    let (a, b) = l.endpoints();
                    a == id || b == id
                }) {
                    return Err(NetworkError::NodeInUse { id: id.clone() });
                }
                self.nodes.remove(id);
                Ok(())
            }
            None => Err(NetworkError::NotFound { id: id.clone() }),
        }
    }

    /// Remove a leak node and its connector together.
    pub fn remove_leak(&mut self, id: &ElementId) -> NetworkResult<LeakNode> {
        let connector = match self.nodes.get(id) {
            Some(Node::Leak(leak)) => leak.connector.clone(),
            Some(_) => {
                return Err(NetworkError::LeakTopology {
                    leak: id.clone(),
                    what: "element is not a leak node",
                });
            }
            None => return Err(NetworkError::NotFound { id: id.clone() }),
        };
        if !matches!(self.links.get(&connector), Some(Link::LeakConnector(_))) {
            return Err(NetworkError::LeakTopology {
                leak: id.clone(),
                what: "connector missing",
            });
        }

        self.links.remove(&connector);
        match self.nodes.remove(id) {
            Some(Node::Leak(leak)) => Ok(leak),
            _ => Err(NetworkError::NotFound { id: id.clone() }),
        }
    }

    /// Attach a time-based control rule to an existing link.
    pub fn add_control(&mut self, rule: ControlRule) -> NetworkResult<()> {
        if !self.links.contains_key(&rule.link) {
            return Err(NetworkError::NotFound {
                id: rule.link.clone(),
            });
        }
        if rule.window.start_s >= rule.window.end_s {
            return Err(NetworkError::InvalidValue {
                what: "control window must end after it starts",
            });
        }
        self.controls.push(rule);
        Ok(())
    }

    pub fn clear_controls(&mut self) {
        self.controls.clear();
    }

    pub fn controls_for<'a>(&'a self, link: &'a ElementId) -> impl Iterator<Item = &'a ControlRule> {
        self.controls.iter().filter(move |c| &c.link == link)
    }

    /// Force the initial status of several valves.
    pub fn set_valve_statuses<'a, I>(&mut self, valves: I, status: LinkStatus) -> NetworkResult<()>
    where
        I: IntoIterator<Item = &'a ElementId>,
    {
        for id in valves {
            self.set_attribute(id, Attribute::InitialStatus(status))?;
        }
        Ok(())
    }

    /// Re-run structural validation (ids, endpoints, leak topology).
    pub fn validate(&self) -> NetworkResult<()> {
        validate::validate_network(&self.links, &self.nodes)
    }
}

fn positive(d: wp_core::Length) -> NetworkResult<wp_core::Length> {
    if d.value > 0.0 && d.value.is_finite() {
        Ok(d)
    } else {
        Err(NetworkError::InvalidValue {
            what: "diameter must be positive",
        })
    }
}
