//! Network validation logic.

use std::collections::BTreeMap;
use wp_core::{LinkId, NodeId};

use crate::error::{NetworkError, NetworkResult};
use crate::model::{Link, Node};

/// Validate structure: endpoints exist and every leak is wired to exactly one connector.
pub(crate) fn validate_network(
    links: &BTreeMap<LinkId, Link>,
    nodes: &BTreeMap<NodeId, Node>,
) -> NetworkResult<()> {
    // Every link must reference existing nodes
    for link in links.values() {
        let (from, to) = link.endpoints();
        for node in [from, to] {
            if !nodes.contains_key(node) {
                return Err(NetworkError::InvalidEndpoint {
                    link: link.id().clone(),
                    node: node.clone(),
                });
            }
        }
    }

    // Every leak node: connector is a LeakConnector ending at the leak, host is a pipe
    for leak in nodes.values().filter_map(Node::as_leak) {
        let connector = match links.get(&leak.connector) {
            Some(Link::LeakConnector(c)) => c,
            _ => {
                return Err(NetworkError::LeakTopology {
                    leak: leak.id.clone(),
                    what: "connector is missing or not a leak connector",
                });
            }
        };
        if connector.to != leak.id {
            return Err(NetworkError::LeakTopology {
                leak: leak.id.clone(),
                what: "connector does not end at the leak node",
            });
        }
        let host = match links.get(&leak.host_link) {
            Some(Link::Pipe(p)) => p,
            _ => {
                return Err(NetworkError::LeakTopology {
                    leak: leak.id.clone(),
                    what: "host link is missing or not a pipe",
                });
            }
        };
        if connector.from != host.from && connector.from != host.to {
            return Err(NetworkError::LeakTopology {
                leak: leak.id.clone(),
                what: "connector does not start on the host pipe",
            });
        }
    }

    // Every connector must belong to exactly one leak
    for link in links.values() {
        if let Link::LeakConnector(c) = link {
            let owners = nodes
                .values()
                .filter_map(Node::as_leak)
                .filter(|l| l.connector == c.id)
                .count();
            if owners != 1 {
                return Err(NetworkError::LeakTopology {
                    leak: c.to.clone(),
                    what: "connector must belong to exactly one leak",
                });
            }
        }
    }

    Ok(())
}
