//! poesim - PoE Distribution Tree Simulator
//!
//! Loads a topology file, runs the power budget simulation and prints the
//! per-node state.
//!
//! # Usage
//!
//! ```bash
//! poesim lab.poe                # tick until settled
//! poesim lab.poe --ticks 25     # exactly 25 ticks
//! RUST_LOG=trace poesim lab.poe # per-node step trace
//! ```

use std::io;
use std::path::PathBuf;

use clap::Parser;
use poe_core::{
    dsl::{self, ConfigDef},
    error::Result,
    report::write_report,
    topology::{validate_topology, Topology},
    Simulator, DEFAULT_MAX_TICKS,
};

/// PoE distribution tree simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the topology description file (.poe)
    #[arg(value_name = "TOPOLOGY_FILE")]
    topology_file: PathBuf,

    /// Run exactly this many ticks instead of settling
    #[arg(short, long)]
    ticks: Option<usize>,

    /// Give up settling after this many ticks
    #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
    max_ticks: usize,

    /// Override the damping coefficient
    #[arg(long)]
    damping: Option<f64>,

    /// Override the convergence tolerance
    #[arg(long)]
    epsilon: Option<f64>,

    /// Log structural changes and brownout clamps
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Parse, then let command-line overrides win over the file's .config lines
    let mut ast = dsl::parse_file(&args.topology_file)?;
    let overrides = [("damping", args.damping), ("epsilon", args.epsilon)];
    for (key, value) in overrides {
        if let Some(value) = value {
            ast.config.push(ConfigDef {
                key: key.to_string(),
                value,
                line: 0,
            });
        }
    }

    let topology = Topology::from_ast(ast)?;
    validate_topology(&topology)?;

    // Simulate
    let mut simulator = Simulator::new(topology);
    match args.ticks {
        Some(ticks) => simulator.run(ticks),
        None => {
            let ticks = simulator.settle(args.max_ticks)?;
            log::info!("settled in {} ticks", ticks);
        }
    }

    write_report(simulator.topology(), &mut io::stdout().lock())?;

    Ok(())
}
