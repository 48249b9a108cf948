//! Text report for the CLI frontend.
//!
//! Renders one row per node, indented by tree level.

use std::io::Write;

use crate::error::{PoeError, Result};
use crate::topology::Topology;

/// Write a table of node state to `out`.
pub fn write_report<W: Write>(topology: &Topology, out: &mut W) -> Result<()> {
    let io_err = |e: std::io::Error| PoeError::ReportError {
        message: e.to_string(),
    };

    writeln!(
        out,
        "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "node", "len(m)", "V", "Vmin", "I(A)", "Imax(A)", "P(W)", "loss(W)", "PoE(W)"
    )
    .map_err(io_err)?;

    for node in topology.nodes() {
        let s = &node.state;
        let label = format!("{}{}", "  ".repeat(node.level), node.name);
        writeln!(
            out,
            "{:<20} {:>8.0} {:>8.2} {:>8.2} {:>8.3} {:>8.3} {:>8.1} {:>8.2} {:>8.1}",
            label,
            topology.cable_len_total(node.id)?,
            s.voltage,
            s.v_min,
            s.total_current,
            s.total_current_max,
            s.total_power,
            s.cable_loss,
            s.ports_available_power,
        )
        .map_err(io_err)?;
    }

    writeln!(out, "after {} tick(s)", topology.tick_count()).map_err(io_err)?;
    out.flush().map_err(io_err)
}
