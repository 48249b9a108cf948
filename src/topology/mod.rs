//! Topology representation and validation.
//!
//! A [`Topology`] owns every [`Node`] of a power distribution tree and
//! keeps a flat pre-order sequence of their ids. Parents own their
//! children (removing a node removes its subtree); children refer back
//! to their parent by id only.

mod build;
mod graph;
mod node;
mod snapshot;
mod types;
mod validate;

pub use graph::Topology;
pub use node::{Electrical, Node, NodeKind, Port, SourceParams, SwitchParams};
pub use snapshot::Snapshot;
pub use types::*;
pub use validate::validate_topology;
