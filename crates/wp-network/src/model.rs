//! Core network data structures.

use serde::{Deserialize, Serialize};
use wp_core::{Length, LinkId, NodeId};

/// Open/closed state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkStatus {
    Open,
    Closed,
}

/// A pipe, possibly one segment of a longer pipe split by leak insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    pub id: LinkId,
    /// Identifier of the pipe before splitting. Equal to `id` for unsplit pipes.
    pub origin: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub length: Length,
    pub diameter: Length,
    /// Hazen-Williams roughness coefficient.
    pub roughness: f64,
    pub status: LinkStatus,
}

/// A controllable valve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valve {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub diameter: Length,
    pub initial_status: LinkStatus,
}

/// Zero-length check valve tying a leak node to the split point on its pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakConnector {
    pub id: LinkId,
    /// Split point on the host pipe.
    pub from: NodeId,
    /// The leak node.
    pub to: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Link {
    Pipe(Pipe),
    Valve(Valve),
    LeakConnector(LeakConnector),
}

impl Link {
    pub fn id(&self) -> &LinkId {
        match self {
            Link::Pipe(p) => &p.id,
            Link::Valve(v) => &v.id,
            Link::LeakConnector(c) => &c.id,
        }
    }

    /// Start and end node of the link.
    pub fn endpoints(&self) -> (&NodeId, &NodeId) {
        match self {
            Link::Pipe(p) => (&p.from, &p.to),
            Link::Valve(v) => (&v.from, &v.to),
            Link::LeakConnector(c) => (&c.from, &c.to),
        }
    }

    pub fn as_pipe(&self) -> Option<&Pipe> {
        match self {
            Link::Pipe(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_valve(&self) -> Option<&Valve> {
        match self {
            Link::Valve(v) => Some(v),
            _ => None,
        }
    }

    pub fn diameter(&self) -> Option<Length> {
        match self {
            Link::Pipe(p) => Some(p.diameter),
            Link::Valve(v) => Some(v.diameter),
            Link::LeakConnector(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: NodeId,
    pub elevation: Length,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservoir {
    pub id: NodeId,
    pub head: Length,
}

/// A leak modelled as an emitter node hanging off a pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakNode {
    pub id: NodeId,
    pub elevation: Length,
    /// Pipe segment the leak sits on.
    pub host_link: LinkId,
    pub connector: LinkId,
    /// Emitter coefficient in SI units (m³/s per m of pressure head).
    pub emitter_coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Junction(Junction),
    Reservoir(Reservoir),
    Leak(LeakNode),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Junction(j) => &j.id,
            Node::Reservoir(r) => &r.id,
            Node::Leak(l) => &l.id,
        }
    }

    pub fn as_leak(&self) -> Option<&LeakNode> {
        match self {
            Node::Leak(l) => Some(l),
            _ => None,
        }
    }
}

/// Borrowed view of any element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element<'a> {
    Link(&'a Link),
    Node(&'a Node),
}

/// Named daily time window, in seconds after midnight (`start_s..end_s`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub name: String,
    pub start_s: u32,
    pub end_s: u32,
}

impl TimeWindow {
    pub fn new(name: impl Into<String>, start_s: u32, end_s: u32) -> Self {
        Self {
            name: name.into(),
            start_s,
            end_s,
        }
    }

    pub fn contains(&self, seconds_of_day: u32) -> bool {
        seconds_of_day >= self.start_s && seconds_of_day < self.end_s
    }
}

/// Time-based control: `link` takes `status` inside `window`, its initial status otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRule {
    pub link: LinkId,
    pub status: LinkStatus,
    pub window: TimeWindow,
}

/// Typed attribute update accepted by [`crate::Network::set_attribute`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attribute {
    Diameter(Length),
    Roughness(f64),
    Status(LinkStatus),
    InitialStatus(LinkStatus),
    EmitterCoefficient(f64),
}

impl Attribute {
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Diameter(_) => "diameter",
            Attribute::Roughness(_) => "roughness",
            Attribute::Status(_) => "status",
            Attribute::InitialStatus(_) => "initial_status",
            Attribute::EmitterCoefficient(_) => "emitter_coefficient",
        }
    }
}
