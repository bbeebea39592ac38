//! Levelizer (C7): topological traversal order over a named netlist.
//!
//! Operates on the flat, string-keyed gate list produced by stem/branch
//! expansion ([`crate::circuit::RawGate`]), before signal ids are assigned;
//! [`crate::circuit::Circuit::from_source`] uses the returned order
//! directly as the numbering of [`crate::signal::SignalId`]s, so id order
//! and topological order coincide by construction (spec §9).

use fxhash::FxHashMap;
use std::collections::VecDeque;

use crate::circuit::RawGate;

/// Compute a topological order: primary inputs first (in source order),
/// then every other signal, appended as soon as all of its fan-in is
/// already in the order (spec §4.7).
///
/// Returns an error if the netlist is not combinational (some signal's
/// fan-in never becomes fully available, i.e. there is a cycle).
pub fn topo_order(inputs: &[String], gates: &[RawGate]) -> Result<Vec<String>, String> {
    let mut remaining_deps: FxHashMap<&str, usize> = FxHashMap::default();
    let mut consumers: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    for (i, g) in gates.iter().enumerate() {
        remaining_deps.insert(g.name.as_str(), g.deps.len());
        for d in &g.deps {
            consumers.entry(d.as_str()).or_default().push(i);
        }
    }

    let mut order: Vec<String> = Vec::with_capacity(inputs.len() + gates.len());
    let mut ready: VecDeque<&str> = VecDeque::new();
    for name in inputs {
        order.push(name.clone());
        ready.push_back(name.as_str());
    }
    // Gates with zero fan-in (e.g. tied constants, if the source format
    // allows them) are ready immediately.
    for g in gates {
        if g.deps.is_empty() {
            ready.push_back(g.name.as_str());
        }
    }

    let gate_index: FxHashMap<&str, usize> =
        gates.iter().enumerate().map(|(i, g)| (g.name.as_str(), i)).collect();
    let mut emitted: FxHashMap<&str, ()> = FxHashMap::default();
    for name in inputs {
        emitted.insert(name.as_str(), ());
    }

    while let Some(name) = ready.pop_front() {
        if gate_index.contains_key(name) && !emitted.contains_key(name) {
            order.push(name.to_string());
            emitted.insert(name, ());
        }
        if let Some(cons) = consumers.get(name) {
            for &ci in cons {
                let g = &gates[ci];
                let left = remaining_deps.get_mut(g.name.as_str()).unwrap();
                *left -= 1;
                if *left == 0 {
                    ready.push_back(g.name.as_str());
                }
            }
        }
    }

    let total = inputs.len() + gates.len();
    if order.len() != total {
        return Err(
            "circuit is not combinational: a dependency cycle prevents levelization".to_string(),
        );
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateKind;

    fn g(name: &str, deps: &[&str]) -> RawGate {
        RawGate {
            name: name.to_string(),
            kind: GateKind::Buf,
            deps: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_linear_chain() {
        let inputs = vec!["a".to_string()];
        let gates = vec![g("y", &["a"]), g("z", &["y"])];
        let order = topo_order(&inputs, &gates).unwrap();
        assert_eq!(order, vec!["a", "y", "z"]);
    }

    #[test]
    fn test_diamond() {
        let inputs = vec!["a".to_string()];
        let gates = vec![g("y", &["a"]), g("z", &["a"]), g("w", &["y", "z"])];
        let order = topo_order(&inputs, &gates).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("y"));
        assert!(pos("a") < pos("z"));
        assert!(pos("y") < pos("w"));
        assert!(pos("z") < pos("w"));
    }

    #[test]
    fn test_cycle_detected() {
        let inputs = vec![];
        let gates = vec![g("x", &["y"]), g("y", &["x"])];
        assert!(topo_order(&inputs, &gates).is_err());
    }
}
