//! Simulation configuration.

use super::{
    DEFAULT_CABLE_LEN, DEFAULT_CABLE_OHM_PER_KM, DEFAULT_DAMPING, DEFAULT_EPSILON,
    DEFAULT_MIN_VOLTAGE, DEFAULT_POE_MAX_WATTS, DEFAULT_PORTS_PER_SWITCH, DEFAULT_RELAX_STEP,
    DEFAULT_SOURCE_MAX_WATTS, DEFAULT_SOURCE_VOLTAGE, DEFAULT_SWITCH_POWER, MAX_PORTS_PER_SWITCH,
};
use crate::error::{PoeError, Result};

/// Configuration for a topology and its solver.
///
/// The configuration is fixed for the life of a [`Topology`](crate::Topology);
/// tests that need different constants build a new topology with their own
/// config instead of mutating shared state.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Cable resistance in ohms per kilometre.
    pub cable_ohm_per_km: f64,
    /// Cable length given to new switches (metres).
    pub cable_len: f64,
    /// Housekeeping power drawn by a switch (watts).
    pub switch_power: f64,
    /// Minimum supported operating voltage on a switch (volts).
    pub min_voltage: f64,
    /// Voltage of a new power source (volts).
    pub source_voltage: f64,
    /// Capacity of a new power source (watts).
    pub source_max_watts: f64,
    /// Maximum power a single PoE port may deliver (watts).
    pub poe_max_watts: f64,
    /// Number of idle ports created with each switch.
    pub ports_per_switch: usize,
    /// Comparison and convergence tolerance.
    pub epsilon: f64,
    /// Fraction of the gap to its target that own current closes per tick.
    pub damping: f64,
    /// Fraction of reclaimable headroom released per tick.
    pub relax_step: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cable_ohm_per_km: DEFAULT_CABLE_OHM_PER_KM,
            cable_len: DEFAULT_CABLE_LEN,
            switch_power: DEFAULT_SWITCH_POWER,
            min_voltage: DEFAULT_MIN_VOLTAGE,
            source_voltage: DEFAULT_SOURCE_VOLTAGE,
            source_max_watts: DEFAULT_SOURCE_MAX_WATTS,
            poe_max_watts: DEFAULT_POE_MAX_WATTS,
            ports_per_switch: DEFAULT_PORTS_PER_SWITCH,
            epsilon: DEFAULT_EPSILON,
            damping: DEFAULT_DAMPING,
            relax_step: DEFAULT_RELAX_STEP,
        }
    }
}

impl SimConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cable resistance per kilometre.
    pub fn with_cable_ohm_per_km(mut self, ohm: f64) -> Self {
        self.cable_ohm_per_km = ohm;
        self
    }

    /// Set the default switch cable length (metres).
    pub fn with_cable_len(mut self, len: f64) -> Self {
        self.cable_len = len;
        self
    }

    /// Set the switch housekeeping power (watts).
    pub fn with_switch_power(mut self, watts: f64) -> Self {
        self.switch_power = watts;
        self
    }

    /// Set the brownout floor (volts).
    pub fn with_min_voltage(mut self, volts: f64) -> Self {
        self.min_voltage = volts;
        self
    }

    /// Set the voltage and capacity used for new sources.
    pub fn with_source(mut self, volts: f64, max_watts: f64) -> Self {
        self.source_voltage = volts;
        self.source_max_watts = max_watts;
        self
    }

    /// Set the per-port PoE ceiling (watts).
    pub fn with_poe_max_watts(mut self, watts: f64) -> Self {
        self.poe_max_watts = watts;
        self
    }

    /// Set how many ports each new switch starts with.
    pub fn with_ports_per_switch(mut self, ports: usize) -> Self {
        self.ports_per_switch = ports;
        self
    }

    /// Set the comparison and convergence tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the damping coefficient.
    ///
    /// Smaller values converge slower but ride out abrupt load changes:
    /// - 0.2 (default): settles a few-hop tree within a hundred ticks
    /// - 0.05: very smooth, several hundred ticks
    /// - 1.0: no inertia, may ring on long cable runs
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the budget relaxation step.
    pub fn with_relax_step(mut self, step: f64) -> Self {
        self.relax_step = step;
        self
    }

    /// Apply a named override, as used by `.config` lines and the CLI.
    pub fn set(&mut self, key: &str, value: f64) -> Result<()> {
        match key.to_ascii_lowercase().as_str() {
            "cable_ohm_per_km" | "cable_ohm" => self.cable_ohm_per_km = value,
            "cable_len" => self.cable_len = value,
            "switch_power" | "ns_power" => self.switch_power = value,
            "min_voltage" | "ns_voltage_min" => self.min_voltage = value,
            "source_voltage" | "ps_voltage" => self.source_voltage = value,
            "source_max_watts" | "ps_maxw" => self.source_max_watts = value,
            "poe_max_watts" | "ipoe_maxw" => self.poe_max_watts = value,
            "ports_per_switch" => self.ports_per_switch = port_count(value).ok_or_else(|| {
                PoeError::invalid_config(format!(
                    "ports_per_switch must be an integer in 0..={}, got {}",
                    MAX_PORTS_PER_SWITCH, value
                ))
            })?,
            "epsilon" => self.epsilon = value,
            "damping" => self.damping = value,
            "relax_step" => self.relax_step = value,
            _ => {
                return Err(PoeError::UnknownConfigKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Check that every value is usable by the solver.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("cable_ohm_per_km", self.cable_ohm_per_km),
            ("cable_len", self.cable_len),
            ("switch_power", self.switch_power),
            ("min_voltage", self.min_voltage),
            ("source_voltage", self.source_voltage),
            ("source_max_watts", self.source_max_watts),
            ("poe_max_watts", self.poe_max_watts),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(PoeError::invalid_config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(PoeError::invalid_config(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }

        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(PoeError::invalid_config(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }

        if self.ports_per_switch > MAX_PORTS_PER_SWITCH {
            return Err(PoeError::invalid_config(format!(
                "ports_per_switch must be at most {}, got {}",
                MAX_PORTS_PER_SWITCH, self.ports_per_switch
            )));
        }

        if !(0.0..=1.0).contains(&self.relax_step) {
            return Err(PoeError::invalid_config(format!(
                "relax_step must be in [0, 1], got {}",
                self.relax_step
            )));
        }

        Ok(())
    }

    /// Resistance of a cable run of `len` metres.
    ///
    /// Negative lengths are treated as zero.
    pub fn cable_resistance(&self, len: f64) -> f64 {
        self.cable_ohm_per_km * len.max(0.0) / 1000.0
    }
}

/// A whole number of ports no larger than [`MAX_PORTS_PER_SWITCH`].
pub(crate) fn port_count(value: f64) -> Option<usize> {
    let valid = value >= 0.0 && value.fract() == 0.0 && value <= MAX_PORTS_PER_SWITCH as f64;
    valid.then_some(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{NodeType, Topology};
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.cable_resistance(300.0), 3.69, epsilon = 1e-12);
    }

    #[test]
    fn test_set_by_name() {
        let mut config = SimConfig::new();
        config.set("damping", 0.1).unwrap();
        config.set("PS_VOLTAGE", 54.0).unwrap();
        config.set("ports_per_switch", 4.0).unwrap();
        assert_eq!(config.damping, 0.1);
        assert_eq!(config.source_voltage, 54.0);
        assert_eq!(config.ports_per_switch, 4);

        assert!(matches!(
            config.set("bogus", 1.0),
            Err(PoeError::UnknownConfigKey { .. })
        ));
        assert!(config.set("ports_per_switch", 1.5).is_err());
    }

    #[test]
    fn test_port_count_is_bounded() {
        let mut config = SimConfig::new();
        config.set("ports_per_switch", 64.0).unwrap();
        assert_eq!(config.ports_per_switch, MAX_PORTS_PER_SWITCH);

        for value in [65.0, 1e30, f64::INFINITY, f64::NAN, -1.0] {
            assert!(matches!(
                config.set("ports_per_switch", value),
                Err(PoeError::InvalidConfig { .. })
            ));
        }
        assert_eq!(config.ports_per_switch, MAX_PORTS_PER_SWITCH);

        let too_many = SimConfig::new().with_ports_per_switch(MAX_PORTS_PER_SWITCH + 1);
        assert!(too_many.validate().is_err());
        assert!(Topology::with_config(too_many).is_err());
    }

    #[test]
    fn test_builders() {
        let config = SimConfig::new()
            .with_cable_len(120.0)
            .with_switch_power(9.5)
            .with_source(54.0, 540.0)
            .with_poe_max_watts(30.0)
            .with_ports_per_switch(8);
        assert!(config.validate().is_ok());
        assert_eq!(config.cable_len, 120.0);
        assert_eq!(config.switch_power, 9.5);
        assert_eq!((config.source_voltage, config.source_max_watts), (54.0, 540.0));
        assert_eq!(config.poe_max_watts, 30.0);
        assert_eq!(config.ports_per_switch, 8);
    }

    #[test]
    fn test_builders_shape_new_nodes() {
        let config = SimConfig::new()
            .with_cable_len(120.0)
            .with_switch_power(9.5)
            .with_source(54.0, 540.0)
            .with_poe_max_watts(30.0)
            .with_ports_per_switch(3);
        let mut topo = Topology::with_config(config).unwrap();
        let ups = topo.add_node(None, NodeType::Source, None).unwrap();
        let sw = topo.add_child(ups, None, NodeType::Switch).unwrap();
        topo.set_port_power(sw, 0, 40.0).unwrap();

        let source = topo.node(ups).unwrap();
        assert_eq!(source.state.voltage, 54.0);
        assert_relative_eq!(source.state.granted_max, 10.0);

        let switch = topo.node(sw).unwrap();
        assert_eq!(switch.cable_len, 120.0);
        assert_eq!(switch.kind.own_power(), 9.5);
        assert_eq!(switch.ports.len(), 3);
        assert_eq!(switch.ports[0].effective_power(topo.config().poe_max_watts), 30.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SimConfig::new().with_damping(0.0).validate().is_err());
        assert!(SimConfig::new().with_damping(1.5).validate().is_err());
        assert!(SimConfig::new().with_relax_step(-0.1).validate().is_err());
        assert!(SimConfig::new().with_epsilon(0.0).validate().is_err());
        assert!(SimConfig::new().with_cable_ohm_per_km(f64::NAN).validate().is_err());
        assert!(SimConfig::new().with_min_voltage(-1.0).validate().is_err());
    }

    #[test]
    fn test_negative_length_has_no_resistance() {
        let config = SimConfig::default();
        assert_eq!(config.cable_resistance(-50.0), 0.0);
    }
}
