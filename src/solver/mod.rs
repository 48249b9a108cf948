//! Electrical solver for PoE distribution trees.
//!
//! The solver is a damped relaxation rather than a simultaneous-equation
//! solve. Each call to [`Topology::tick`](crate::Topology::tick) advances
//! every node by one step in pre-order, and repeated ticks approach the
//! steady state:
//!
//! ```text
//! V(n)     = V(parent) - R(n) * Itotal(n, t-1)
//! Iself(n) = Iself(n) + (P(n) / V(n) - Iself(n)) * damping
//! Vmin(n)  = Vmin(parent) - R(n) * ItotalMax(n)
//! ```
//!
//! The one-tick lag in the cable drop term is what turns the tree into
//! a discrete-time system with a fixed point. Budgets are sized against
//! `Vmin`, the voltage a node would see if everything above it drew its
//! full grant at once.

mod config;
mod simulator;
pub(crate) mod step;

pub(crate) use config::port_count;
pub use config::SimConfig;
pub use simulator::Simulator;

/// Cable resistance in ohms per kilometre.
pub const DEFAULT_CABLE_OHM_PER_KM: f64 = 12.3;

/// Cable length for a new switch, in metres.
pub const DEFAULT_CABLE_LEN: f64 = 300.0;

/// Switch housekeeping power in watts.
pub const DEFAULT_SWITCH_POWER: f64 = 14.7;

/// Minimum supported voltage on a switch.
pub const DEFAULT_MIN_VOLTAGE: f64 = 20.0;

/// Default power source voltage.
pub const DEFAULT_SOURCE_VOLTAGE: f64 = 48.0;

/// Default power source capacity in watts.
pub const DEFAULT_SOURCE_MAX_WATTS: f64 = 300.0;

/// Per-port PoE ceiling in watts.
pub const DEFAULT_POE_MAX_WATTS: f64 = 15.0;

/// Ports created with each switch.
pub const DEFAULT_PORTS_PER_SWITCH: usize = 2;

/// Most ports a single node may carry.
pub const MAX_PORTS_PER_SWITCH: usize = 64;

/// Comparison and convergence tolerance.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Own-current inertia step.
pub const DEFAULT_DAMPING: f64 = 0.2;

/// Budget relaxation step.
pub const DEFAULT_RELAX_STEP: f64 = 0.1;
