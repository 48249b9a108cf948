//! Nodes and ports.

use super::types::{NodeId, NodeType};
use crate::solver::SimConfig;

/// Fixed parameters of a power source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceParams {
    /// Output voltage
    pub voltage: f64,
    /// Capacity in watts
    pub max_watts: f64,
}

impl SourceParams {
    /// Maximum deliverable current, `max_watts / voltage`.
    ///
    /// A source switched to 0 V delivers nothing.
    pub fn max_current(&self) -> f64 {
        if self.voltage > 0.0 {
            (self.max_watts / self.voltage).max(0.0)
        } else {
            0.0
        }
    }
}

/// Fixed parameters of a network switch.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchParams {
    /// Power the switch itself consumes
    pub housekeeping_power: f64,
}

/// What a node is, with its kind-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Source(SourceParams),
    Switch(SwitchParams),
}

impl NodeKind {
    /// Build the kind for `node_type` from configuration defaults.
    pub fn from_config(node_type: NodeType, config: &SimConfig) -> Self {
        match node_type {
            NodeType::Source => NodeKind::Source(SourceParams {
                voltage: config.source_voltage,
                max_watts: config.source_max_watts,
            }),
            NodeType::Switch => NodeKind::Switch(SwitchParams {
                housekeeping_power: config.switch_power,
            }),
        }
    }

    /// The field-less tag of this kind.
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Source(_) => NodeType::Source,
            NodeKind::Switch(_) => NodeType::Switch,
        }
    }

    /// Power the node draws for itself.
    pub fn own_power(&self) -> f64 {
        match self {
            NodeKind::Source(_) => 0.0,
            NodeKind::Switch(sw) => sw.housekeeping_power,
        }
    }
}

/// A PoE load attached to a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Port {
    /// Configured load in watts
    pub requested_power: f64,
    /// Current drawn at the node's present voltage
    pub current: f64,
    /// Current the load would draw at the node's worst-case voltage
    pub current_max: f64,
}

impl Port {
    /// Create an idle port requesting `requested_power` watts.
    pub fn new(requested_power: f64) -> Self {
        Self {
            requested_power,
            ..Default::default()
        }
    }

    /// Requested power clamped to what a port can actually deliver.
    pub fn effective_power(&self, poe_max_watts: f64) -> f64 {
        self.requested_power.clamp(0.0, poe_max_watts.max(0.0))
    }
}

/// Per-tick electrical state of a node.
///
/// Everything here is recomputed by the solver. The fields below the
/// reporting marker are observation-only and never read back by a step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Electrical {
    /// Present voltage
    pub voltage: f64,
    /// Own (housekeeping) current, damped toward its target
    pub own_current: f64,
    /// Own power at the present voltage
    pub own_power: f64,
    /// Sum of port currents
    pub ports_current: f64,
    /// Sum of children's total currents from the previous tick
    pub children_current: f64,
    /// Own + ports + children
    pub total_current: f64,
    /// Ceiling granted by the parent (source: its capacity)
    pub granted_max: f64,
    /// Maximum safe total current after relaxation and brownout clamp
    pub total_current_max: f64,
    /// Worst-case minimum voltage
    pub v_min: f64,
    /// Own current at the worst-case voltage
    pub own_current_max: f64,
    /// Port currents at the worst-case voltage
    pub ports_current_max: f64,
    /// Current available for children
    pub dist_current: f64,

    // -- reporting --
    /// Power through the node at present voltage
    pub total_power: f64,
    /// Power deliverable at the worst-case voltage
    pub max_power: f64,
    /// Power available to children at the worst-case voltage
    pub dist_power: f64,
    /// Current still available to ports after own and children maxima
    pub ports_headroom_current: f64,
    /// `ports_headroom_current` as power at the worst-case voltage
    pub ports_max_power: f64,
    /// Port power not yet requested
    pub ports_available_power: f64,
    /// Voltage lost on the upstream cable
    pub cable_drop: f64,
    /// Power lost on the upstream cable
    pub cable_loss: f64,
    /// Cable loss at the maximum safe current
    pub cable_loss_max: f64,
}

/// A vertex of the distribution tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Non-owning back reference; `None` for the root
    pub parent: Option<NodeId>,
    /// Owned children, in insertion order
    pub children: Vec<NodeId>,
    pub ports: Vec<Port>,
    /// Depth from the root
    pub level: usize,
    /// Length of the cable from the parent (metres)
    pub cable_len: f64,
    pub state: Electrical,
}

impl Node {
    /// Create a detached node with configuration defaults.
    ///
    /// Switches start with `ports_per_switch` idle ports and the default
    /// cable length. Sources start with no ports and no cable; loads hang
    /// off switches, and ports can still be added to a source explicitly.
    pub(crate) fn new(id: NodeId, name: Option<&str>, node_type: NodeType, config: &SimConfig) -> Self {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("{}-{}", node_type.tag().to_uppercase(), id.0),
        };

        let kind = NodeKind::from_config(node_type, config);
        let mut state = Electrical::default();
        let (cable_len, ports) = match &kind {
            NodeKind::Source(src) => {
                state.voltage = src.voltage;
                state.granted_max = src.max_current();
                (0.0, Vec::new())
            }
            NodeKind::Switch(_) => (
                config.cable_len,
                vec![Port::default(); config.ports_per_switch],
            ),
        };

        Self {
            id,
            name,
            kind,
            parent: None,
            children: Vec::new(),
            ports,
            level: 0,
            cable_len,
            state,
        }
    }

    /// The node's type tag.
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn is_source(&self) -> bool {
        matches!(self.kind, NodeKind::Source(_))
    }

    /// Present voltage.
    pub fn voltage(&self) -> f64 {
        self.state.voltage
    }

    /// Total current through the upstream cable.
    pub fn total_current(&self) -> f64 {
        self.state.total_current
    }

    /// Sum of port currents.
    pub fn ports_current(&self) -> f64 {
        self.ports.iter().map(|p| p.current).sum()
    }

    /// Sum of port worst-case currents.
    pub fn ports_current_max(&self) -> f64 {
        self.ports.iter().map(|p| p.current_max).sum()
    }

    /// Sum of requested port power.
    pub fn ports_power(&self) -> f64 {
        self.ports.iter().map(|p| p.requested_power).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_names_and_fields() {
        let config = SimConfig::default();
        let ps = Node::new(NodeId(0), None, NodeType::Source, &config);
        assert_eq!(ps.name, "PS-0");
        assert_eq!(ps.cable_len, 0.0);
        assert!(ps.ports.is_empty());
        assert_relative_eq!(ps.state.granted_max, 6.25);

        let ns = Node::new(NodeId(3), Some(""), NodeType::Switch, &config);
        assert_eq!(ns.name, "NS-3");
        assert_eq!(ns.cable_len, 300.0);
        assert_eq!(ns.ports.len(), 2);
        assert_eq!(ns.kind.own_power(), 14.7);
    }

    #[test]
    fn test_source_at_zero_volts_has_no_capacity() {
        let src = SourceParams {
            voltage: 0.0,
            max_watts: 300.0,
        };
        assert_eq!(src.max_current(), 0.0);
    }

    #[test]
    fn test_port_effective_power_is_clamped() {
        assert_eq!(Port::new(30.0).effective_power(15.0), 15.0);
        assert_eq!(Port::new(-4.0).effective_power(15.0), 0.0);
        assert_eq!(Port::new(7.5).effective_power(15.0), 7.5);
    }
}
