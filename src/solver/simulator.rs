//! Convergence driver.

use crate::error::{PoeError, Result};
use crate::topology::Topology;

/// Drives a [`Topology`] toward its steady state.
///
/// `Topology::tick` knows nothing about convergence; the simulator wraps
/// it, measuring how far each tick moved the tree so callers can stop
/// once it has settled.
pub struct Simulator {
    /// The topology being simulated
    topology: Topology,
    /// Largest change seen in the most recent tick
    last_delta: f64,
}

impl Simulator {
    /// Create a simulator for the given topology.
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            last_delta: f64::INFINITY,
        }
    }

    /// Run one tick and return the largest absolute change of any node's
    /// voltage, own current or total current.
    pub fn step(&mut self) -> f64 {
        let before: Vec<[f64; 3]> = self.topology.nodes().map(probe).collect();
        self.topology.tick();

        // A tick never changes the node set, so the probes line up
        let delta = self
            .topology
            .nodes()
            .map(probe)
            .zip(before)
            .flat_map(|(after, before)| (0..3).map(move |i| (after[i] - before[i]).abs()))
            .fold(0.0, f64::max);

        self.last_delta = delta;
        delta
    }

    /// Run exactly `ticks` ticks.
    pub fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Tick until a tick moves nothing by more than the configured epsilon.
    ///
    /// Returns the number of ticks taken.
    pub fn settle(&mut self, max_ticks: usize) -> Result<usize> {
        let epsilon = self.topology.config().epsilon;
        for tick in 1..=max_ticks {
            if self.step() < epsilon {
                log::debug!("settled after {} ticks", tick);
                return Ok(tick);
            }
        }
        Err(PoeError::convergence_failure(max_ticks, self.last_delta))
    }

    /// Change measured by the most recent tick (infinite before the first).
    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    /// Get a reference to the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get a mutable reference to the topology, for edits between ticks.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Give back the topology.
    pub fn into_topology(self) -> Topology {
        self.topology
    }
}

fn probe(node: &crate::topology::Node) -> [f64; 3] {
    [
        node.state.voltage,
        node.state.own_current,
        node.state.total_current,
    ]
}
