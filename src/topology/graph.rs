//! Topology container.

use std::collections::HashMap;

use super::node::{Node, NodeKind, Port, SourceParams};
use super::types::{NodeId, NodeType};
use crate::error::{ensure_finite, PoeError, Result};
use crate::solver::step::{step_node, ChildView, Upstream};
use crate::solver::{SimConfig, MAX_PORTS_PER_SWITCH};

/// A power distribution tree ready for simulation.
///
/// Nodes are stored by id. `order` holds every id in pre-order, so
/// stepping the nodes front to back always visits a parent before any of
/// its descendants.
#[derive(Debug, Clone)]
pub struct Topology {
    /// All nodes, keyed by id
    pub(crate) nodes: HashMap<NodeId, Node>,

    /// Pre-order traversal of the tree
    pub(crate) order: Vec<NodeId>,

    /// Next id to hand out
    pub(crate) next_id: usize,

    /// Ticks run so far
    pub(crate) ticks: u64,

    pub(crate) config: SimConfig,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    /// Create an empty topology with the default configuration.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            ticks: 0,
            config: SimConfig::default(),
        }
    }

    /// Create an empty topology with a custom configuration.
    pub fn with_config(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// The configuration this topology was built with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Add a node. A node without a parent becomes the root.
    ///
    /// The new node lands at the end of its parent's subtree in the flat
    /// order, keeping the order an exact pre-order traversal.
    pub fn add_node(
        &mut self,
        name: Option<&str>,
        node_type: NodeType,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        match (parent, node_type) {
            (None, NodeType::Switch) => return Err(PoeError::RootMustBeSource),
            (None, NodeType::Source) => {
                if let Some(root) = self.root() {
                    return Err(PoeError::RootAlreadyExists { root });
                }
            }
            (Some(p), NodeType::Source) => return Err(PoeError::SourceMustBeRoot { parent: p }),
            (Some(p), NodeType::Switch) => {
                if !self.nodes.contains_key(&p) {
                    return Err(PoeError::NodeNotFound { id: p });
                }
            }
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        let mut node = Node::new(id, name, node_type, &self.config);

        let position = match parent {
            Some(p) => {
                let position = self.subtree_end(p)?;
                let parent_node = self.node_mut(p)?;
                parent_node.children.push(id);
                node.parent = Some(p);
                node.level = parent_node.level + 1;
                position
            }
            None => self.order.len(),
        };

        log::info!("added {} '{}' ({}) at level {}", node_type, node.name, id, node.level);

        self.order.insert(position, id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Add a child below `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
        node_type: NodeType,
    ) -> Result<NodeId> {
        self.add_node(name, node_type, Some(parent))
    }

    /// Remove a node together with its whole subtree.
    ///
    /// Returns the removed ids in pre-order.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let start = self.position(id)?;
        let end = self.subtree_end(id)?;
        let removed: Vec<NodeId> = self.order.drain(start..end).collect();

        if let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|&c| c != id);
            }
        }
        for removed_id in &removed {
            self.nodes.remove(removed_id);
        }

        log::info!("removed {} and {} descendant(s)", id, removed.len() - 1);
        Ok(removed)
    }

    /// Advance the simulation by exactly one step.
    pub fn tick(&mut self) {
        // Index loop: each step reads the parent and children by id while
        // the node itself is mutated.
        for i in 0..self.order.len() {
            let id = self.order[i];
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };

            let upstream = node.parent.and_then(|p| self.nodes.get(&p)).map(|p| Upstream {
                voltage: p.state.voltage,
                v_min: p.state.v_min,
            });
            let children: Vec<ChildView> = node
                .children
                .iter()
                .filter_map(|c| self.nodes.get(c))
                .map(ChildView::of)
                .collect();
            let child_ids = node.children.clone();

            let grants = match self.nodes.get_mut(&id) {
                Some(node) => step_node(node, upstream, &children, &self.config),
                None => continue,
            };

            for (child, grant) in child_ids.iter().zip(grants) {
                if let Some(child) = self.nodes.get_mut(child) {
                    child.state.granted_max = grant;
                }
            }
        }
        self.ticks += 1;
    }

    // ============ Field setters ============

    /// Set the length of the cable from the node's parent (metres).
    pub fn set_cable_len(&mut self, id: NodeId, meters: f64) -> Result<()> {
        let meters = ensure_finite("cable length", meters)?;
        self.node_mut(id)?.cable_len = meters;
        Ok(())
    }

    /// Set a source's output voltage. Its capacity in watts is kept, so the
    /// maximum current follows the new voltage.
    pub fn set_source_voltage(&mut self, id: NodeId, volts: f64) -> Result<()> {
        let volts = ensure_finite("source voltage", volts)?;
        self.edit_source(id, |src| src.voltage = volts)
    }

    /// Set a source's capacity in watts.
    pub fn set_source_max_watts(&mut self, id: NodeId, watts: f64) -> Result<()> {
        let watts = ensure_finite("source capacity", watts)?;
        self.edit_source(id, |src| src.max_watts = watts)
    }

    fn edit_source(&mut self, id: NodeId, edit: impl FnOnce(&mut SourceParams)) -> Result<()> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            NodeKind::Source(src) => {
                edit(src);
                // Sources are not derived from anything; show the edit at once
                node.state.voltage = src.voltage.max(0.0);
                node.state.granted_max = src.max_current();
                Ok(())
            }
            NodeKind::Switch(_) => Err(PoeError::WrongNodeKind {
                id,
                expected: "power source",
            }),
        }
    }

    /// Set a switch's housekeeping power (watts).
    pub fn set_switch_power(&mut self, id: NodeId, watts: f64) -> Result<()> {
        let watts = ensure_finite("switch power", watts)?;
        match &mut self.node_mut(id)?.kind {
            NodeKind::Switch(sw) => {
                sw.housekeeping_power = watts;
                Ok(())
            }
            NodeKind::Source(_) => Err(PoeError::WrongNodeKind {
                id,
                expected: "network switch",
            }),
        }
    }

    /// Set the requested power of a port (watts).
    pub fn set_port_power(&mut self, id: NodeId, port: usize, watts: f64) -> Result<()> {
        let watts = ensure_finite("port power", watts)?;
        let node = self.node_mut(id)?;
        let slot = node
            .ports
            .get_mut(port)
            .ok_or(PoeError::PortNotFound { node: id, port })?;
        slot.requested_power = watts;
        Ok(())
    }

    /// Attach a new port to a node. Returns its index.
    ///
    /// A node carries at most [`MAX_PORTS_PER_SWITCH`] ports.
    pub fn add_port(&mut self, id: NodeId, watts: f64) -> Result<usize> {
        let watts = ensure_finite("port power", watts)?;
        let node = self.node_mut(id)?;
        if node.ports.len() >= MAX_PORTS_PER_SWITCH {
            return Err(PoeError::InvalidParameter {
                param: "port count",
                value: (node.ports.len() + 1) as f64,
            });
        }
        node.ports.push(Port::new(watts));
        Ok(node.ports.len() - 1)
    }

    /// Detach a port from a node.
    pub fn remove_port(&mut self, id: NodeId, port: usize) -> Result<Port> {
        let node = self.node_mut(id)?;
        if port >= node.ports.len() {
            return Err(PoeError::PortNotFound { node: id, port });
        }
        Ok(node.ports.remove(port))
    }

    /// Change a node's display name.
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    // ============ Accessors ============

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(PoeError::NodeNotFound { id })
    }

    /// Iterate over nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(move |id| self.nodes.get(id))
    }

    /// The flat pre-order sequence of ids.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// The root source, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.order.first().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Voltage at the root, or 0 for an empty topology.
    pub fn voltage(&self) -> f64 {
        self.root()
            .and_then(|r| self.nodes.get(&r))
            .map(|n| n.state.voltage)
            .unwrap_or(0.0)
    }

    /// Find a node by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes().find(|n| n.name == name).map(|n| n.id)
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Cable length from the root to this node, summed over ancestors.
    pub fn cable_len_total(&self, id: NodeId) -> Result<f64> {
        let mut total = 0.0;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.nodes.get(&current).ok_or(PoeError::NodeNotFound { id: current })?;
            total += node.cable_len;
            cursor = node.parent;
        }
        Ok(total)
    }

    /// Resistance of the cable from the node's parent.
    pub fn cable_resistance(&self, id: NodeId) -> Result<f64> {
        let node = self.nodes.get(&id).ok_or(PoeError::NodeNotFound { id })?;
        Ok(self.config.cable_resistance(node.cable_len))
    }

    /// Resistance of the whole cable run from the root to this node.
    pub fn cable_resistance_total(&self, id: NodeId) -> Result<f64> {
        let mut total = 0.0;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.nodes.get(&current).ok_or(PoeError::NodeNotFound { id: current })?;
            total += self.config.cable_resistance(node.cable_len);
            cursor = node.parent;
        }
        Ok(total)
    }

    /// Sum of the children's total currents.
    pub fn children_current(&self, id: NodeId) -> Result<f64> {
        self.sum_children(id, |c| c.state.total_current)
    }

    /// Sum of the children's maximum safe currents.
    pub fn children_current_max(&self, id: NodeId) -> Result<f64> {
        self.sum_children(id, |c| c.state.total_current_max)
    }

    fn sum_children(&self, id: NodeId, f: impl Fn(&Node) -> f64) -> Result<f64> {
        let node = self.nodes.get(&id).ok_or(PoeError::NodeNotFound { id })?;
        Ok(node
            .children
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .map(f)
            .sum())
    }

    fn position(&self, id: NodeId) -> Result<usize> {
        self.order
            .iter()
            .position(|&n| n == id)
            .ok_or(PoeError::NodeNotFound { id })
    }

    /// One past the last position of `id`'s subtree in the order.
    ///
    /// Relies on the pre-order invariant: the subtree is the contiguous run
    /// after `id` whose levels are deeper than `id`'s.
    fn subtree_end(&self, id: NodeId) -> Result<usize> {
        let start = self.position(id)?;
        let level = self.nodes.get(&id).map(|n| n.level).unwrap_or(0);
        let end = self.order[start + 1..]
            .iter()
            .position(|n| self.nodes.get(n).map_or(true, |node| node.level <= level))
            .map_or(self.order.len(), |offset| start + 1 + offset);
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ups_with_switch() -> (Topology, NodeId, NodeId) {
        let mut topo = Topology::new();
        let ups = topo.add_node(Some("UPS"), NodeType::Source, None).unwrap();
        let ns = topo.add_child(ups, Some("My NS60"), NodeType::Switch).unwrap();
        (topo, ups, ns)
    }

    #[test]
    fn test_add_assigns_ids_levels_and_names() {
        let (mut topo, ups, ns) = ups_with_switch();
        let leaf = topo.add_child(ns, None, NodeType::Switch).unwrap();

        assert_eq!(ups, NodeId(0));
        assert_eq!(leaf, NodeId(2));
        assert_eq!(topo.node(leaf).unwrap().name, "NS-2");
        assert_eq!(topo.node(leaf).unwrap().level, 2);
        assert_eq!(topo.node(ns).unwrap().parent, Some(ups));
        assert_eq!(topo.node(ups).unwrap().children, vec![ns]);
        assert_eq!(topo.find("My NS60"), Some(ns));
    }

    #[test]
    fn test_order_is_preorder() {
        let (mut topo, ups, a) = ups_with_switch();
        let b = topo.add_child(ups, Some("b"), NodeType::Switch).unwrap();
        let a1 = topo.add_child(a, Some("a1"), NodeType::Switch).unwrap();
        let a1x = topo.add_child(a1, Some("a1x"), NodeType::Switch).unwrap();
        let a2 = topo.add_child(a, Some("a2"), NodeType::Switch).unwrap();

        assert_eq!(topo.order(), &[ups, a, a1, a1x, a2, b]);
    }

    #[test]
    fn test_insert_errors() {
        let (mut topo, ups, _) = ups_with_switch();
        assert!(matches!(
            topo.add_node(None, NodeType::Source, None),
            Err(PoeError::RootAlreadyExists { root }) if root == ups
        ));
        assert!(matches!(
            topo.add_node(None, NodeType::Switch, Some(NodeId(42))),
            Err(PoeError::NodeNotFound { .. })
        ));
        assert!(matches!(
            topo.add_child(ups, None, NodeType::Source),
            Err(PoeError::SourceMustBeRoot { .. })
        ));
        assert!(matches!(
            Topology::new().add_node(None, NodeType::Switch, None),
            Err(PoeError::RootMustBeSource)
        ));
        // failed inserts do not consume ids
        assert_eq!(topo.add_child(ups, None, NodeType::Switch).unwrap(), NodeId(2));
    }

    #[test]
    fn test_remove_takes_subtree() {
        let (mut topo, ups, a) = ups_with_switch();
        let a1 = topo.add_child(a, None, NodeType::Switch).unwrap();
        let a1x = topo.add_child(a1, None, NodeType::Switch).unwrap();
        let b = topo.add_child(ups, None, NodeType::Switch).unwrap();

        let removed = topo.remove_node(a).unwrap();
        assert_eq!(removed, vec![a, a1, a1x]);
        assert_eq!(topo.order(), &[ups, b]);
        assert_eq!(topo.node(ups).unwrap().children, vec![b]);
        assert!(topo.node(a1x).is_none());

        assert!(matches!(topo.remove_node(a), Err(PoeError::NodeNotFound { .. })));

        // ids keep counting after removal
        let c = topo.add_child(ups, None, NodeType::Switch).unwrap();
        assert_eq!(c, NodeId(5));
        topo.tick();
    }

    #[test]
    fn test_remove_root_empties_topology() {
        let (mut topo, ups, _) = ups_with_switch();
        topo.remove_node(ups).unwrap();
        assert!(topo.is_empty());
        assert_eq!(topo.voltage(), 0.0);
        topo.tick();
        assert!(topo.add_node(None, NodeType::Source, None).is_ok());
    }

    #[test]
    fn test_cable_len_total_follows_ancestor_edits() {
        let (mut topo, _, ns) = ups_with_switch();
        let leaf = topo.add_child(ns, None, NodeType::Switch).unwrap();
        assert_relative_eq!(topo.cable_len_total(leaf).unwrap(), 600.0);

        topo.set_cable_len(ns, 100.0).unwrap();
        assert_relative_eq!(topo.cable_len_total(leaf).unwrap(), 400.0);
        assert_relative_eq!(topo.cable_resistance_total(leaf).unwrap(), 4.92, epsilon = 1e-12);

        // Negative runs add no resistance but still count as length
        topo.set_cable_len(leaf, -50.0).unwrap();
        assert_relative_eq!(topo.cable_len_total(leaf).unwrap(), 50.0);
        assert_relative_eq!(topo.cable_resistance_total(leaf).unwrap(), 1.23, epsilon = 1e-12);
        assert!(topo.cable_resistance_total(NodeId(99)).is_err());
    }

    #[test]
    fn test_add_port_is_bounded() {
        let (mut topo, _, ns) = ups_with_switch();
        while topo.node(ns).unwrap().ports.len() < MAX_PORTS_PER_SWITCH {
            topo.add_port(ns, 1.0).unwrap();
        }
        assert!(matches!(
            topo.add_port(ns, 1.0),
            Err(PoeError::InvalidParameter { param: "port count", .. })
        ));
        assert_eq!(topo.node(ns).unwrap().ports.len(), MAX_PORTS_PER_SWITCH);
    }

    #[test]
    fn test_aggregate_currents_match_state() {
        let (mut topo, ups, ns) = ups_with_switch();
        let leaf = topo.add_child(ns, None, NodeType::Switch).unwrap();
        topo.set_port_power(ns, 0, 7.5).unwrap();
        topo.set_port_power(ns, 1, 4.0).unwrap();
        for _ in 0..20 {
            topo.tick();
        }

        let switch = topo.node(ns).unwrap();
        assert_relative_eq!(switch.ports_current(), switch.state.ports_current);
        assert_relative_eq!(switch.ports_current_max(), switch.state.ports_current_max);
        assert_relative_eq!(switch.total_current(), switch.state.total_current);
        assert!(switch.ports_current() > 0.0);
        assert!(switch.ports_current_max() >= switch.ports_current());

        let leaf_node = topo.node(leaf).unwrap();
        assert_relative_eq!(topo.children_current(ns).unwrap(), leaf_node.total_current());
        assert_relative_eq!(
            topo.children_current_max(ns).unwrap(),
            leaf_node.state.total_current_max
        );
        assert_relative_eq!(topo.children_current(ups).unwrap(), switch.total_current());
        assert_eq!(topo.children_current(leaf).unwrap(), 0.0);
        assert!(topo.children_current_max(NodeId(99)).is_err());
    }

    #[test]
    fn test_setters_validate_targets() {
        let (mut topo, ups, ns) = ups_with_switch();
        assert!(topo.set_source_voltage(ups, 54.0).is_ok());
        assert!(matches!(
            topo.set_source_voltage(ns, 54.0),
            Err(PoeError::WrongNodeKind { .. })
        ));
        assert!(matches!(
            topo.set_switch_power(ups, 10.0),
            Err(PoeError::WrongNodeKind { .. })
        ));
        assert!(matches!(
            topo.set_port_power(ns, 7, 5.0),
            Err(PoeError::PortNotFound { port: 7, .. })
        ));
        assert!(matches!(
            topo.set_cable_len(ns, f64::NAN),
            Err(PoeError::InvalidParameter { .. })
        ));

        let port = topo.add_port(ns, 4.0).unwrap();
        assert_eq!(port, 2);
        assert_eq!(topo.remove_port(ns, port).unwrap().requested_power, 4.0);
        topo.rename(ns, "edge").unwrap();
        assert_eq!(topo.find("edge"), Some(ns));
    }

    #[test]
    fn test_negative_and_zero_inputs_stay_finite() {
        let (mut topo, ups, ns) = ups_with_switch();
        topo.set_cable_len(ns, -300.0).unwrap();
        topo.set_port_power(ns, 0, -12.0).unwrap();
        topo.set_switch_power(ns, 0.0).unwrap();
        topo.set_source_max_watts(ups, -10.0).unwrap();
        for _ in 0..50 {
            topo.tick();
        }
        for node in topo.nodes() {
            let s = &node.state;
            for v in [s.voltage, s.total_current, s.total_current_max, s.v_min, s.own_current] {
                assert!(v.is_finite() && v >= 0.0, "{}: {:?}", node.name, s);
            }
        }
    }

    #[test]
    fn test_tick_grants_parent_spare_to_child() {
        let (mut topo, ups, ns) = ups_with_switch();
        topo.tick();
        assert_eq!(topo.tick_count(), 1);
        let granted = topo.node(ns).unwrap().state.granted_max;
        assert_relative_eq!(granted, topo.node(ups).unwrap().state.dist_current);
        assert_relative_eq!(granted, 6.25);
    }
}
