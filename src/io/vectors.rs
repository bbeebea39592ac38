//! IO for the line-oriented test-vector file format (spec §6).
//!
//! ```text
//!     VECTORS 2
//!     INPUTS a b c
//!     v1: 010
//!     v2: 111
//! ```

use std::io::{BufRead, BufReader, Read};

use fxhash::FxHashMap;

use crate::circuit::Circuit;

/// A parsed vector file: the PI ordering used by each row, and the rows
/// themselves (each `bits.len() == order.len()`).
pub struct VectorFile {
    pub order: Vec<String>,
    pub vectors: Vec<Vec<bool>>,
}

/// Parse a test-vector file. `VECTORS N` declares the expected row count;
/// `INPUTS ...` declares the column ordering; exactly `N` `label: bits`
/// lines must follow (spec §6).
pub fn read_vectors<R: Read>(r: R) -> Result<VectorFile, String> {
    let mut declared_count: Option<usize> = None;
    let mut order: Option<Vec<String>> = None;
    let mut vectors = Vec::new();

    for (lineno, line) in BufReader::new(r).lines().enumerate() {
        let line = line.map_err(|e| format!("line {}: {e}", lineno + 1))?;
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') || t.starts_with('$') {
            continue;
        }

        if let Some(rest) = strip_keyword(t, "VECTORS") {
            let n: usize = rest
                .trim()
                .parse()
                .map_err(|_| format!("line {}: malformed VECTORS count", lineno + 1))?;
            declared_count = Some(n);
            continue;
        }
        if let Some(rest) = strip_keyword(t, "INPUTS") {
            order = Some(rest.split_whitespace().map(str::to_string).collect());
            continue;
        }

        // `label: bits`
        let (_, bits) = t
            .split_once(':')
            .ok_or_else(|| format!("line {}: expected a `label: bits` vector row", lineno + 1))?;
        let order_ref = order
            .as_ref()
            .ok_or_else(|| format!("line {}: INPUTS must be declared before any vector row", lineno + 1))?;
        let bits = bits.trim();
        if bits.len() != order_ref.len() {
            return Err(format!(
                "line {}: vector width {} does not match INPUTS width {}",
                lineno + 1,
                bits.len(),
                order_ref.len()
            ));
        }
        let mut row = Vec::with_capacity(bits.len());
        for c in bits.chars() {
            match c {
                '0' => row.push(false),
                '1' => row.push(true),
                other => return Err(format!("line {}: bit {:?} is not 0 or 1", lineno + 1, other)),
            }
        }
        vectors.push(row);
    }

    let order = order.ok_or_else(|| "vector file never declared INPUTS".to_string())?;
    if let Some(n) = declared_count {
        if vectors.len() != n {
            return Err(format!(
                "VECTORS declared {n} rows but {} were present",
                vectors.len()
            ));
        }
    }
    Ok(VectorFile { order, vectors })
}

fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let first = parts.next()?;
    if first.eq_ignore_ascii_case(keyword) {
        Some(parts.next().unwrap_or(""))
    } else {
        None
    }
}

/// Reorder a vector file's rows to the circuit's own primary-input order,
/// as required by [`crate::sim::simulate_fault_free`] and
/// [`crate::sim::BatchedFaultSimulator`].
pub fn reorder_to_circuit(circuit: &Circuit, file: &VectorFile) -> Result<Vec<Vec<bool>>, String> {
    if file.order.len() != circuit.nb_inputs() {
        return Err(format!(
            "vector file declares {} inputs, circuit has {}",
            file.order.len(),
            circuit.nb_inputs()
        ));
    }
    let mut column_of: FxHashMap<&str, usize> = FxHashMap::default();
    for (col, name) in file.order.iter().enumerate() {
        if !circuit
            .signal_by_name(name)
            .map(|s| circuit.is_input(s))
            .unwrap_or(false)
        {
            return Err(format!("{name} in INPUTS is not a declared primary input"));
        }
        column_of.insert(name.as_str(), col);
    }

    let canonical_columns: Vec<usize> = circuit
        .inputs()
        .iter()
        .map(|&pi| column_of[circuit.name(pi)])
        .collect();

    Ok(file
        .vectors
        .iter()
        .map(|row| canonical_columns.iter().map(|&col| row[col]).collect())
        .collect())
}
