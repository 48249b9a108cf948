//! Core types for topology representation.

use std::fmt;

/// A unique identifier for a node in the topology.
///
/// Ids are handed out in creation order and never reused, so an id stays
/// valid for lookup until its node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Field-less node type tag, as written in topology files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Power source ("ps")
    Source,
    /// Network switch ("ns")
    Switch,
}

impl NodeType {
    /// Parse a type tag (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ps" | "source" => Some(NodeType::Source),
            "ns" | "switch" => Some(NodeType::Switch),
            _ => None,
        }
    }

    /// The short tag used in names and files.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeType::Source => "ps",
            NodeType::Switch => "ns",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_tags() {
        assert_eq!(NodeType::from_str("PS"), Some(NodeType::Source));
        assert_eq!(NodeType::from_str("ns"), Some(NodeType::Switch));
        assert_eq!(NodeType::from_str("ups"), None);
        assert_eq!(NodeType::Switch.tag().to_uppercase(), "NS");
    }
}
