//! Building a topology from a parsed description.

use std::collections::HashMap;

use super::node::Port;
use super::validate::validate_topology;
use super::{NodeId, NodeType, Topology};
use crate::dsl::{NodeDef, TopologyAst};
use crate::error::{PoeError, Result};
use crate::solver::{port_count, SimConfig, MAX_PORTS_PER_SWITCH};

impl Topology {
    /// Build a topology from a parsed AST with default configuration.
    pub fn from_ast(ast: TopologyAst) -> Result<Self> {
        Self::from_ast_with_config(ast, SimConfig::default())
    }

    /// Build a topology from a parsed AST, applying its `.config` lines on
    /// top of `base`.
    pub fn from_ast_with_config(ast: TopologyAst, mut base: SimConfig) -> Result<Self> {
        for entry in &ast.config {
            base.set(&entry.key, entry.value)
                .map_err(|e| PoeError::parse(entry.line, e.to_string()))?;
        }
        let mut topology = Topology::with_config(base)?;

        // Names to ids, for parent and `.poe` references
        let mut names: HashMap<String, NodeId> = HashMap::new();

        for def in &ast.nodes {
            if names.contains_key(&def.name) {
                return Err(PoeError::DuplicateNode {
                    name: def.name.clone(),
                    line: def.line,
                });
            }

            let parent = match &def.parent {
                Some(parent_name) => Some(*names.get(parent_name).ok_or_else(|| {
                    PoeError::UnknownNodeName {
                        name: parent_name.clone(),
                        line: def.line,
                    }
                })?),
                None => None,
            };

            let id = topology
                .add_node(Some(&def.name), def.node_type, parent)
                .map_err(|e| PoeError::parse(def.line, e.to_string()))?;
            topology.apply_params(id, def)?;
            names.insert(def.name.clone(), id);
        }

        for port_def in &ast.ports {
            let id = *names
                .get(&port_def.node)
                .ok_or_else(|| PoeError::UnknownNodeName {
                    name: port_def.node.clone(),
                    line: port_def.line,
                })?;
            for (index, &watts) in port_def.powers.iter().enumerate() {
                let existing = topology.node(id).map_or(0, |n| n.ports.len());
                if index < existing {
                    topology.set_port_power(id, index, watts)?;
                } else {
                    topology
                        .add_port(id, watts)
                        .map_err(|e| PoeError::parse(port_def.line, e.to_string()))?;
                }
            }
        }

        validate_topology(&topology)?;
        Ok(topology)
    }

    fn apply_params(&mut self, id: NodeId, def: &NodeDef) -> Result<()> {
        // Sorted so errors are reported deterministically
        let mut params: Vec<(&String, &f64)> = def.params.iter().collect();
        params.sort_by(|a, b| a.0.cmp(b.0));

        for (key, &value) in params {
            match (def.node_type, key.as_str()) {
                (NodeType::Source, "voltage") => self.set_source_voltage(id, value)?,
                (NodeType::Source, "maxw") => self.set_source_max_watts(id, value)?,
                (NodeType::Switch, "len") => self.set_cable_len(id, value)?,
                (NodeType::Switch, "power") => self.set_switch_power(id, value)?,
                (NodeType::Switch, "ports") => {
                    let count = port_count(value).ok_or_else(|| {
                        PoeError::parse(
                            def.line,
                            format!(
                                "ports must be an integer in 0..={}, got {}",
                                MAX_PORTS_PER_SWITCH, value
                            ),
                        )
                    })?;
                    self.node_mut(id)?.ports.resize(count, Port::default());
                }
                _ => {
                    return Err(PoeError::UnknownParameter {
                        node: def.name.clone(),
                        param: key.clone(),
                        line: def.line,
                    })
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse;
    use approx::assert_relative_eq;

    const CHAIN: &str = "\
.config switch_power 10
ps UPS voltage=54 maxw=540
ns CORE UPS len=150 ports=4
ns EDGE CORE len=1.2k
.poe EDGE 15 7.5 4
";

    #[test]
    fn test_build_chain() {
        let topo = Topology::from_ast(parse(CHAIN).unwrap()).unwrap();
        assert_eq!(topo.len(), 3);
        assert_eq!(topo.config().switch_power, 10.0);

        let ups = topo.node(topo.find("UPS").unwrap()).unwrap();
        assert_relative_eq!(ups.state.voltage, 54.0);
        assert_relative_eq!(ups.state.granted_max, 10.0);

        let core = topo.node(topo.find("CORE").unwrap()).unwrap();
        assert_eq!(core.ports.len(), 4);
        assert_eq!(core.cable_len, 150.0);
        assert_eq!(core.kind.own_power(), 10.0);

        let edge = topo.node(topo.find("EDGE").unwrap()).unwrap();
        assert_eq!(edge.cable_len, 1200.0);
        assert_eq!(edge.ports.len(), 3);
        assert_eq!(edge.ports[2].requested_power, 4.0);
        assert_eq!(edge.level, 2);
    }

    #[test]
    fn test_demo_lab_settles() {
        let source = include_str!("../../demos/lab.poe");
        let topo = Topology::from_ast(parse(source).unwrap()).unwrap();
        assert_eq!(topo.len(), 5);

        let lab = topo.node(topo.find("LAB").unwrap()).unwrap();
        assert_eq!(lab.ports.len(), 4);
        assert_eq!(lab.ports[3].requested_power, 0.0);

        let mut sim = crate::Simulator::new(topo);
        sim.settle(1000).unwrap();
        let topo = sim.topology();
        for node in topo.nodes() {
            assert!(node.state.voltage > topo.config().min_voltage, "{}", node.name);
        }
        let voltage = |name: &str| topo.node(topo.find(name).unwrap()).unwrap().voltage();
        assert!(voltage("ANNEX") < voltage("LAB"));
        assert!(voltage("LAB") < voltage("CORE"));
    }

    #[test]
    fn test_build_errors() {
        let err = |src: &str| Topology::from_ast(parse(src).unwrap()).unwrap_err();

        assert!(matches!(
            err("ps A\nns A A\n"),
            PoeError::DuplicateNode { line: 2, .. }
        ));
        assert!(matches!(
            err("ps A\nns B C\n"),
            PoeError::UnknownNodeName { line: 2, .. }
        ));
        assert!(matches!(
            err("ps A\n.poe Z 4\n"),
            PoeError::UnknownNodeName { line: 2, .. }
        ));
        assert!(matches!(
            err("ps A len=3\n"),
            PoeError::UnknownParameter { line: 1, .. }
        ));
        assert!(matches!(err("ns A\n"), PoeError::ParseError { line: 1, .. }));
        assert!(matches!(
            err(".config nonsense 1\nps A\n"),
            PoeError::ParseError { line: 1, .. }
        ));
        assert!(matches!(
            err(".config damping 2\nps A\n"),
            PoeError::InvalidConfig { .. }
        ));
    }

    #[test]
    fn test_port_counts_are_bounded() {
        let err = |src: &str| Topology::from_ast(parse(src).unwrap()).unwrap_err();

        for count in ["1e30", "65", "-1", "2.5"] {
            let src = format!("ps UPS\nns A UPS ports={}\n", count);
            assert!(
                matches!(err(&src), PoeError::ParseError { line: 2, .. }),
                "ports={}",
                count
            );
        }
        assert!(matches!(
            err(".config ports_per_switch 1e30\nps UPS\nns A UPS\n"),
            PoeError::ParseError { line: 1, .. }
        ));

        let powers = vec!["1"; MAX_PORTS_PER_SWITCH + 1].join(" ");
        let src = format!("ps UPS\nns A UPS ports=0\n.poe A {}\n", powers);
        assert!(matches!(err(&src), PoeError::ParseError { line: 3, .. }));

        let topo = Topology::from_ast(parse("ps UPS\nns A UPS ports=64\n").unwrap()).unwrap();
        let a = topo.find("A").unwrap();
        assert_eq!(topo.node(a).unwrap().ports.len(), MAX_PORTS_PER_SWITCH);
    }
}
