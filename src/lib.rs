//! # PoE Core
//!
//! A step-driven power budget simulator for Power-over-Ethernet switch
//! trees.
//!
//! This library provides:
//! - A tree container for power sources, switches and their PoE ports
//! - A damped per-node relaxation step for voltage drop and current flow
//! - Worst-case voltage tracking, brownout clamping and top-down budgets
//! - Deep snapshot and restore of the whole tree
//! - A small text format for describing topologies
//!
//! ## Architecture
//!
//! - [`topology`] - Tree container, nodes, ports, snapshots, validation
//! - [`solver`] - Configuration, the per-node step and a convergence driver
//! - [`dsl`] - Parser for topology description files
//! - [`report`] - Text report of node state (CLI only)
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! poesim lab.poe --ticks 200
//! ```
//!
//! ### Library
//!
//! ```
//! use poe_core::{NodeType, Simulator, Topology};
//!
//! let mut topology = Topology::new();
//! let ups = topology.add_node(Some("UPS"), NodeType::Source, None)?;
//! let switch = topology.add_child(ups, Some("NS60"), NodeType::Switch)?;
//! topology.set_port_power(switch, 0, 7.5)?;
//!
//! let mut sim = Simulator::new(topology);
//! sim.settle(1000)?;
//! assert!(sim.topology().node(switch).unwrap().voltage() < 48.0);
//! # Ok::<(), poe_core::PoeError>(())
//! ```
//!
//! ## Simulation Method
//!
//! Each [`Topology::tick`] visits the nodes in pre-order. A switch takes its
//! voltage from its parent minus the cable drop caused by last tick's
//! current, lets its ports and itself draw at that voltage (own current
//! with damping), then works out the worst-case voltage it could see at
//! its maximum budget. Whatever is safe beyond its own needs is split
//! among its children as their new ceilings. Repeated ticks settle the
//! tree; nothing is solved simultaneously.

pub mod dsl;
pub mod error;
pub mod solver;
pub mod topology;

#[cfg(feature = "cli")]
pub mod report;

// Re-export main types for convenience
pub use error::{PoeError, Result};
pub use solver::{SimConfig, Simulator};
pub use topology::{Node, NodeId, NodeKind, NodeType, Port, Snapshot, Topology};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmTopology;

/// Tick budget used when settling without an explicit limit.
pub const DEFAULT_MAX_TICKS: usize = 10_000;
