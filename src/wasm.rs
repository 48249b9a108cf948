//! WASM bindings for PoE Core.
//!
//! This module provides JavaScript-friendly bindings so a browser page can
//! drive the simulation from a `setInterval` loop and render node state.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmTopology } from 'poe_core';
//!
//! await init();
//!
//! const topo = WasmTopology.with_default_tree();
//! const timer = setInterval(() => {
//!   topo.tick();
//!   render(topo.report());
//! }, 125);
//! ```

use wasm_bindgen::prelude::*;

use crate::dsl;
use crate::error::PoeError;
use crate::topology::{NodeId, NodeType, Snapshot, Topology};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_err(e: PoeError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn node_type(tag: &str) -> Result<NodeType, JsValue> {
    NodeType::from_str(tag).ok_or_else(|| {
        js_err(PoeError::WasmError {
            message: format!("unknown node type '{}'", tag),
        })
    })
}

/// WASM-compatible PoE topology.
///
/// Node ids cross the boundary as plain integers. A single saved snapshot
/// is held on the Rust side for the page's save/restore buttons.
#[wasm_bindgen]
pub struct WasmTopology {
    topology: Topology,
    saved: Option<Snapshot>,
}

#[wasm_bindgen]
impl WasmTopology {
    /// Create a topology from a description in the `.poe` format.
    #[wasm_bindgen(constructor)]
    pub fn new(description: &str) -> Result<WasmTopology, JsValue> {
        let ast = dsl::parse(description).map_err(js_err)?;
        let topology = Topology::from_ast(ast).map_err(js_err)?;
        Ok(WasmTopology {
            topology,
            saved: None,
        })
    }

    /// A UPS feeding one switch, the page's starting point.
    #[wasm_bindgen]
    pub fn with_default_tree() -> Result<WasmTopology, JsValue> {
        let mut topology = Topology::new();
        let ups = topology
            .add_node(Some("UPS"), NodeType::Source, None)
            .map_err(js_err)?;
        topology
            .add_child(ups, Some("My NS60"), NodeType::Switch)
            .map_err(js_err)?;
        Ok(WasmTopology {
            topology,
            saved: None,
        })
    }

    /// Add a node; pass `undefined` as parent for the root. Returns its id.
    #[wasm_bindgen]
    pub fn add_node(
        &mut self,
        name: Option<String>,
        node_type_tag: &str,
        parent: Option<usize>,
    ) -> Result<usize, JsValue> {
        let id = self
            .topology
            .add_node(name.as_deref(), node_type(node_type_tag)?, parent.map(NodeId))
            .map_err(js_err)?;
        Ok(id.0)
    }

    /// Remove a node and its subtree. Returns the number of nodes removed.
    #[wasm_bindgen]
    pub fn remove_node(&mut self, id: usize) -> Result<usize, JsValue> {
        let removed = self.topology.remove_node(NodeId(id)).map_err(js_err)?;
        Ok(removed.len())
    }

    /// Advance the simulation by one tick.
    #[wasm_bindgen]
    pub fn tick(&mut self) {
        self.topology.tick();
    }

    #[wasm_bindgen]
    pub fn set_cable_len(&mut self, id: usize, meters: f64) -> Result<(), JsValue> {
        self.topology.set_cable_len(NodeId(id), meters).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn set_source_voltage(&mut self, id: usize, volts: f64) -> Result<(), JsValue> {
        self.topology.set_source_voltage(NodeId(id), volts).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn set_port_power(&mut self, id: usize, port: usize, watts: f64) -> Result<(), JsValue> {
        self.topology
            .set_port_power(NodeId(id), port, watts)
            .map_err(js_err)
    }

    /// Keep a deep copy of the current state.
    #[wasm_bindgen]
    pub fn save(&mut self) {
        self.saved = Some(self.topology.snapshot());
    }

    /// Go back to the last saved state. Returns false if nothing was saved.
    #[wasm_bindgen]
    pub fn restore(&mut self) -> Result<bool, JsValue> {
        match &self.saved {
            Some(snapshot) => {
                self.topology.restore(snapshot).map_err(js_err)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Node ids in display (pre-)order.
    #[wasm_bindgen]
    pub fn node_ids(&self) -> Vec<usize> {
        self.topology.order().iter().map(|id| id.0).collect()
    }

    /// Present voltage of a node, or `undefined` if it doesn't exist.
    #[wasm_bindgen]
    pub fn node_voltage(&self, id: usize) -> Option<f64> {
        self.topology.node(NodeId(id)).map(|n| n.state.voltage)
    }

    /// Worst-case voltage of a node.
    #[wasm_bindgen]
    pub fn node_v_min(&self, id: usize) -> Option<f64> {
        self.topology.node(NodeId(id)).map(|n| n.state.v_min)
    }

    /// Total current through a node's upstream cable.
    #[wasm_bindgen]
    pub fn node_current(&self, id: usize) -> Option<f64> {
        self.topology.node(NodeId(id)).map(|n| n.state.total_current)
    }

    /// Voltage at the root.
    #[wasm_bindgen(getter)]
    pub fn voltage(&self) -> f64 {
        self.topology.voltage()
    }

    /// One summary line per node, indented by level.
    #[wasm_bindgen]
    pub fn report(&self) -> String {
        let mut out = String::new();
        for node in self.topology.nodes() {
            let s = &node.state;
            out.push_str(&format!(
                "{}{} {:.2}V min {:.2}V {:.3}A/{:.3}A\n",
                "  ".repeat(node.level),
                node.name,
                s.voltage,
                s.v_min,
                s.total_current,
                s.total_current_max
            ));
        }
        out
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
