//! Abstract Syntax Tree types for topology files.

use std::collections::HashMap;

use crate::topology::NodeType;

/// Complete AST representation of a parsed topology file.
#[derive(Debug, Clone, Default)]
pub struct TopologyAst {
    /// Node lines, in file order
    pub nodes: Vec<NodeDef>,
    /// `.poe` directives
    pub ports: Vec<PortDef>,
    /// `.config` directives
    pub config: Vec<ConfigDef>,
}

impl TopologyAst {
    /// Create a new empty AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A node line: `<type> <name> [parent] [key=value ...]`.
#[derive(Debug, Clone)]
pub struct NodeDef {
    pub node_type: NodeType,
    pub name: String,
    /// Name of the parent node, absent for the root
    pub parent: Option<String>,
    /// `key=value` parameters, keys lowercased
    pub params: HashMap<String, f64>,
    /// Source line number for error reporting
    pub line: usize,
}

/// A `.poe <node> <watts>...` directive.
#[derive(Debug, Clone)]
pub struct PortDef {
    pub node: String,
    /// Requested power per port, starting at port 0
    pub powers: Vec<f64>,
    pub line: usize,
}

/// A `.config <key> <value>` directive.
#[derive(Debug, Clone)]
pub struct ConfigDef {
    pub key: String,
    pub value: f64,
    pub line: usize,
}
