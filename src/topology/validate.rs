//! Topology validation.

use std::collections::HashSet;

use crate::error::{PoeError, Result};

use super::{NodeId, Topology};

/// Validate the structure of a topology.
///
/// Checks:
/// - The order and the node set contain the same ids, once each
/// - Exactly one root, and it is a power source
/// - Parent and child links agree, levels match depth
/// - The order is the pre-order traversal of the tree (implies acyclic)
pub fn validate_topology(topology: &Topology) -> Result<()> {
    if topology.order.len() != topology.nodes.len() {
        return Err(PoeError::invalid_topology(format!(
            "order lists {} nodes but {} are stored",
            topology.order.len(),
            topology.nodes.len()
        )));
    }

    let mut seen = HashSet::new();
    for id in &topology.order {
        if !seen.insert(*id) {
            return Err(PoeError::invalid_topology(format!("{} appears twice in order", id)));
        }
        if !topology.nodes.contains_key(id) {
            return Err(PoeError::invalid_topology(format!("{} in order but not stored", id)));
        }
        if id.0 >= topology.next_id {
            return Err(PoeError::invalid_topology(format!("{} was never allocated", id)));
        }
    }

    let Some(root) = topology.root() else {
        return Ok(());
    };

    let roots: Vec<NodeId> = topology
        .nodes
        .values()
        .filter(|n| n.parent.is_none())
        .map(|n| n.id)
        .collect();
    if roots != [root] {
        return Err(PoeError::invalid_topology(format!(
            "expected single root {}, found {:?}",
            root, roots
        )));
    }
    if !topology.nodes[&root].is_source() {
        return Err(PoeError::RootMustBeSource);
    }

    for node in topology.nodes.values() {
        if let Some(parent) = node.parent {
            let parent_node = topology.nodes.get(&parent).ok_or_else(|| {
                PoeError::invalid_topology(format!("{} has missing parent {}", node.id, parent))
            })?;
            if !parent_node.children.contains(&node.id) {
                return Err(PoeError::invalid_topology(format!(
                    "{} is not listed as a child of {}",
                    node.id, parent
                )));
            }
            if node.is_source() {
                return Err(PoeError::SourceMustBeRoot { parent });
            }
            if node.level != parent_node.level + 1 {
                return Err(PoeError::invalid_topology(format!(
                    "{} has level {} below level {}",
                    node.id, node.level, parent_node.level
                )));
            }
        } else if node.level != 0 {
            return Err(PoeError::invalid_topology(format!("root {} has level {}", node.id, node.level)));
        }
        for child in &node.children {
            let linked = topology.nodes.get(child).and_then(|c| c.parent);
            if linked != Some(node.id) {
                return Err(PoeError::invalid_topology(format!(
                    "child {} of {} points back to {:?}",
                    child, node.id, linked
                )));
            }
        }
    }

    // Walk the tree from the root; cycles never reach the stack twice
    // because every node has exactly one parent and the root has none.
    let mut preorder = Vec::with_capacity(topology.order.len());
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if preorder.len() > topology.nodes.len() {
            return Err(PoeError::invalid_topology("cycle detected"));
        }
        preorder.push(id);
        if let Some(node) = topology.nodes.get(&id) {
            stack.extend(node.children.iter().rev());
        }
    }
    if preorder != topology.order {
        return Err(PoeError::invalid_topology("order is not a pre-order traversal"));
    }

    Ok(())
}
