//! wp-network: mutable network state for waterplan.
//!
//! Provides:
//! - Element data structures (pipes, valves, leak connectors, junctions, leak nodes)
//! - Time-windowed control rules
//! - Typed attribute mutation and atomic leak removal
//! - Incremental builder with structural validation
//!
//! # Example
//!
//! ```
//! use wp_core::{m, mm};
//! use wp_network::{LinkStatus, NetworkBuilder};
//!
//! let mut builder = NetworkBuilder::new("demo");
//! builder.add_reservoir("R1", m(50.0));
//! builder.add_junction("J1", m(10.0));
//! builder.add_pipe("P1", "R1", "J1", m(120.0), mm(150.0), 100.0);
//! builder.add_valve("V1", "J1", "R1", mm(100.0), LinkStatus::Closed);
//! let net = builder.build().unwrap();
//!
//! assert_eq!(net.pipes().count(), 1);
//! assert_eq!(net.valves().count(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod model;
pub mod network;
pub(crate) mod validate;

pub use builder::NetworkBuilder;
pub use error::{NetworkError, NetworkResult};
pub use model::{
    Attribute, ControlRule, Element, Junction, LeakConnector, LeakNode, Link, LinkStatus, Node,
    Pipe, Reservoir, TimeWindow, Valve,
};
pub use network::Network;
