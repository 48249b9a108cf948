//! Per-node relaxation step.
//!
//! [`step_node`] advances a single node given a read-only view of its
//! parent (already stepped this tick) and of its children (still holding
//! last tick's values). It returns the ceilings to grant each child; the
//! caller writes them back before the children are stepped.

use crate::topology::{Node, NodeKind};

use super::SimConfig;

/// What a node reads from its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Upstream {
    pub voltage: f64,
    pub v_min: f64,
}

/// What a node reads from each child.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct ChildView {
    pub total_current: f64,
    pub total_current_max: f64,
    pub granted_max: f64,
}

impl ChildView {
    pub fn of(node: &Node) -> Self {
        Self {
            total_current: node.state.total_current,
            total_current_max: node.state.total_current_max,
            granted_max: node.state.granted_max,
        }
    }
}

/// Current drawn by a constant-power load at `voltage`.
///
/// Zero at (or below) zero volts; negative power is no load.
pub(crate) fn current_at(power: f64, voltage: f64) -> f64 {
    if voltage > 0.0 {
        power.max(0.0) / voltage
    } else {
        0.0
    }
}

/// Advance `node` by one tick. Returns one granted ceiling per child.
pub(crate) fn step_node(
    node: &mut Node,
    upstream: Option<Upstream>,
    children: &[ChildView],
    config: &SimConfig,
) -> Vec<f64> {
    let resistance = config.cable_resistance(node.cable_len);
    let prev = node.state.clone();

    // Voltage from the parent, lagged by one tick of our own draw
    let voltage = match (&node.kind, upstream) {
        (NodeKind::Source(src), _) => src.voltage.max(0.0),
        (NodeKind::Switch(_), Some(up)) => (up.voltage - resistance * prev.total_current).max(0.0),
        (NodeKind::Switch(_), None) => 0.0,
    };
    let granted_max = match &node.kind {
        NodeKind::Source(src) => src.max_current(),
        NodeKind::Switch(_) => prev.granted_max.max(0.0),
    };

    // Ports draw what they need at the present voltage
    for port in &mut node.ports {
        port.current = current_at(port.effective_power(config.poe_max_watts), voltage);
    }
    let ports_current: f64 = node.ports.iter().map(|p| p.current).sum();
    let children_current: f64 = children.iter().map(|c| c.total_current).sum();
    let total_current = prev.own_current + ports_current + children_current;

    // Own current has inertia
    let own_power = node.kind.own_power();
    let own_target = current_at(own_power, voltage);
    let own_current = (prev.own_current + (own_target - prev.own_current) * config.damping).max(0.0);

    let v_parent_min = upstream.map(|u| u.v_min).unwrap_or(voltage);

    // A child that cannot use its whole grant means we reserve headroom
    // nobody downstream can spend. Release it slowly.
    let mut target_max = granted_max;
    if let NodeKind::Switch(_) = node.kind {
        let over_reserved = children
            .iter()
            .any(|c| c.total_current_max + config.epsilon < c.granted_max);
        if over_reserved {
            let needed = prev.own_current_max
                + prev.ports_current_max
                + children.iter().map(|c| c.total_current_max).sum::<f64>();
            target_max = prev.total_current_max
                + (needed - prev.total_current_max) * config.relax_step;
            target_max = target_max.min(granted_max);
        }
    }

    let mut total_current_max = target_max.max(total_current).max(0.0);
    let worst_case = |max: f64| voltage.min(v_parent_min - resistance * max).max(0.0);
    let mut v_min = worst_case(total_current_max);

    // Brownout: cap the budget so the worst case sits on the floor
    if v_min < config.min_voltage && resistance > 0.0 {
        let clamped = ((v_parent_min - config.min_voltage) / resistance).max(0.0);
        log::debug!(
            "{}: brownout clamp {:.4} A -> {:.4} A (Vparent_min {:.3} V)",
            node.name,
            total_current_max,
            clamped,
            v_parent_min
        );
        total_current_max = clamped;
        v_min = worst_case(total_current_max);
    }

    // Distribute what is safe in the worst case
    let own_current_max = current_at(own_power, v_min);
    for port in &mut node.ports {
        port.current_max = current_at(port.effective_power(config.poe_max_watts), v_min);
    }
    let ports_current_max: f64 = node.ports.iter().map(|p| p.current_max).sum();
    let dist_current = (total_current_max - own_current_max - ports_current_max).max(0.0);

    let grants = if children.is_empty() {
        Vec::new()
    } else if children.iter().any(|c| c.total_current == 0.0) {
        // Unknown consumption somewhere: split evenly
        let share = dist_current / children.len() as f64;
        vec![share; children.len()]
    } else {
        // Known consumption: proportional, to balance an uneven tree
        let quota = dist_current / children_current;
        children.iter().map(|c| c.total_current * quota).collect()
    };

    let children_max: f64 = children.iter().map(|c| c.total_current_max).sum();
    let ports_headroom_current = (total_current_max - own_current_max - children_max).max(0.0);
    let ports_max_power = ports_headroom_current * v_min;

    node.state = crate::topology::Electrical {
        voltage,
        own_current,
        own_power: own_current * voltage,
        ports_current,
        children_current,
        total_current,
        granted_max,
        total_current_max,
        v_min,
        own_current_max,
        ports_current_max,
        dist_current,
        total_power: total_current * voltage,
        max_power: v_min * total_current_max,
        dist_power: dist_current * v_min,
        ports_headroom_current,
        ports_max_power,
        ports_available_power: ports_max_power - node.ports_power(),
        cable_drop: resistance * total_current,
        cable_loss: resistance * total_current * total_current,
        cable_loss_max: resistance * total_current_max * total_current_max,
    };

    log::trace!(
        "{}: V={:.4} Itotal={:.5} Imax={:.5} Vmin={:.4}",
        node.name,
        voltage,
        total_current,
        total_current_max,
        v_min
    );

    grants
}
