//! File-boundary collaborators: `.bench` netlists, test-vector files, and
//! the per-fault result report (spec §6, out of scope for the core itself).

mod bench;
mod vectors;

use std::fs::File;
use std::path::Path;

pub use bench::{read_bench, write_bench};
pub use vectors::{read_vectors, reorder_to_circuit, VectorFile};

use crate::circuit::Circuit;

/// Parse a `.bench` netlist file into a circuit topology.
pub fn read_network_file(path: &Path) -> Result<Circuit, String> {
    let f = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let raw = read_bench(f)?;
    Circuit::from_source(&raw)
}

/// Write a circuit topology to a `.bench` netlist file.
pub fn write_network_file(path: &Path, circuit: &Circuit) -> Result<(), String> {
    let mut f = File::create(path).map_err(|e| format!("{}: {e}", path.display()))?;
    write_bench(&mut f, circuit).map_err(|e| format!("{}: {e}", path.display()))
}

/// Parse a test-vector file and reorder its rows to the circuit's own
/// primary-input order.
pub fn read_vector_file(path: &Path, circuit: &Circuit) -> Result<Vec<Vec<bool>>, String> {
    let f = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let parsed = read_vectors(f)?;
    reorder_to_circuit(circuit, &parsed)
}

/// One fault attempt, ready to be reported (spec §6, "Result output").
pub struct FaultRecord {
    pub signal: String,
    pub stuck_at: bool,
    pub seconds: f64,
    pub detected: bool,
}

/// Write the per-fault CSV-ish report followed by the total computation
/// time, in the order faults were attempted (spec §6).
pub fn write_results<W: std::io::Write>(
    w: &mut W,
    records: &[FaultRecord],
    total_seconds: f64,
) -> std::io::Result<()> {
    for r in records {
        writeln!(
            w,
            "{},{},{},{}",
            r.signal,
            if r.stuck_at { 1 } else { 0 },
            r.seconds,
            if r.detected { 1 } else { 0 }
        )?;
    }
    writeln!(w, "total: {total_seconds}")?;
    Ok(())
}
