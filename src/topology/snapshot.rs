//! Save and restore of topology state.

use std::collections::HashMap;

use crate::error::{PoeError, Result};

use super::validate::validate_topology;
use super::{Node, NodeId, Topology};

/// An independent copy of a topology's nodes and electrical state.
///
/// Taking a snapshot clones every node, port and link; nothing is shared
/// with the live topology, so later edits never leak into a saved copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    next_id: usize,
    ticks: u64,
}

impl Snapshot {
    /// Number of nodes captured.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tick count at capture time.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}

impl Topology {
    /// Capture the full node set.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            order: self.order.clone(),
            next_id: self.next_id,
            ticks: self.ticks,
        }
    }

    /// Replace the live node set with a copy of `snapshot`.
    ///
    /// The snapshot is checked first; on error the live topology is left
    /// untouched. The snapshot itself stays reusable.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut candidate = Topology {
            nodes: snapshot.nodes.clone(),
            order: snapshot.order.clone(),
            next_id: snapshot.next_id,
            ticks: snapshot.ticks,
            config: self.config().clone(),
        };
        validate_topology(&candidate).map_err(|e| PoeError::InvalidSnapshot {
            message: e.to_string(),
        })?;

        log::info!(
            "restored {} node(s) from tick {}",
            candidate.order.len(),
            candidate.ticks
        );

        std::mem::swap(&mut self.nodes, &mut candidate.nodes);
        std::mem::swap(&mut self.order, &mut candidate.order);
        self.next_id = candidate.next_id;
        self.ticks = candidate.ticks;
        Ok(())
    }
}
