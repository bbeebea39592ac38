//! Batched two-valued fault simulator (C6): evaluates every stuck-at fault
//! against a set of input vectors using plain boolean gate semantics (no
//! D-algebra — faults are forced values, spec §4.6).

use rayon::prelude::*;

use crate::circuit::Circuit;
use crate::gate::GateKind;
use crate::signal::SignalId;

/// A fault index `2*s + b`: signal `s` forced to bit `b`.
pub type FaultId = usize;

fn eval_gate_bool(kind: GateKind, vals: &[bool]) -> bool {
    match kind {
        GateKind::Buf => vals[0],
        GateKind::Not => !vals[0],
        GateKind::And => vals.iter().all(|&v| v),
        GateKind::Nand => !vals.iter().all(|&v| v),
        GateKind::Or => vals.iter().any(|&v| v),
        GateKind::Nor => !vals.iter().any(|&v| v),
        GateKind::Xor => vals.iter().fold(false, |acc, &v| acc ^ v),
        GateKind::Xnor => !vals.iter().fold(false, |acc, &v| acc ^ v),
        GateKind::Input => unreachable!("evaluated an INPUT gate past the primary-input prefix"),
    }
}

/// Run the fault-free pass: `pi_values[i]` is the value for `circuit.inputs()[i]`.
/// Returns the full per-signal value array, indexed by `SignalId`.
pub fn simulate_fault_free(circuit: &Circuit, pi_values: &[bool]) -> Vec<bool> {
    assert_eq!(
        pi_values.len(),
        circuit.nb_inputs(),
        "vector width must match the circuit's primary input count"
    );
    let mut values = vec![false; circuit.nb_signals()];
    for (i, &pi) in circuit.inputs().iter().enumerate() {
        values[pi.index()] = pi_values[i];
    }
    for s in circuit.all_signals() {
        if circuit.is_input(s) {
            continue;
        }
        let gate = circuit.gate(s);
        let vals: Vec<bool> = gate.fanin.iter().map(|&f| values[f.index()]).collect();
        values[s.index()] = eval_gate_bool(gate.kind, &vals);
    }
    values
}

/// Two-valued levelized simulator scoring every stuck-at fault against a
/// batch of input vectors (spec §4.6). `O(M * |S|^2)` bit ops: for every
/// vector, every one of the `2*|S|` faults gets its own full re-pass.
pub struct BatchedFaultSimulator<'a> {
    circuit: &'a Circuit,
}

impl<'a> BatchedFaultSimulator<'a> {
    pub fn new(circuit: &'a Circuit) -> BatchedFaultSimulator<'a> {
        BatchedFaultSimulator { circuit }
    }

    /// Total number of faults: every signal crossed with `{stuck-at-0, stuck-at-1}`.
    pub fn nb_faults(&self) -> usize {
        2 * self.circuit.nb_signals()
    }

    /// Run every vector against every fault. Returns `detected[v][f]`.
    /// Vectors are independent and run in parallel; the faults for a given
    /// vector share its golden pass and also run in parallel.
    pub fn run(&self, vectors: &[Vec<bool>]) -> Vec<Vec<bool>> {
        vectors.par_iter().map(|v| self.run_one_vector(v)).collect()
    }

    fn run_one_vector(&self, pi_values: &[bool]) -> Vec<bool> {
        let golden = simulate_fault_free(self.circuit, pi_values);
        let golden_po: Vec<bool> = self
            .circuit
            .outputs()
            .iter()
            .map(|&o| golden[o.index()])
            .collect();

        (0..self.nb_faults())
            .into_par_iter()
            .map(|f| {
                let loc = SignalId::new(f / 2);
                let bit = f % 2 == 1;
                let faulty = self.simulate_with_fault(pi_values, loc, bit);
                self.circuit
                    .outputs()
                    .iter()
                    .zip(golden_po.iter())
                    .any(|(&o, &g)| faulty[o.index()] != g)
            })
            .collect()
    }

    fn simulate_with_fault(&self, pi_values: &[bool], fault_loc: SignalId, fault_bit: bool) -> Vec<bool> {
        let mut values = vec![false; self.circuit.nb_signals()];
        for (i, &pi) in self.circuit.inputs().iter().enumerate() {
            values[pi.index()] = if pi == fault_loc { fault_bit } else { pi_values[i] };
        }
        for s in self.circuit.all_signals() {
            if self.circuit.is_input(s) {
                continue;
            }
            debug_assert_ne!(self.circuit.gate(s).kind, GateKind::Input);
            values[s.index()] = if s == fault_loc {
                fault_bit
            } else {
                let gate = self.circuit.gate(s);
                let vals: Vec<bool> = gate.fanin.iter().map(|&f| values[f.index()]).collect();
                eval_gate_bool(gate.kind, &vals)
            };
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{RawGate, RawNetlist};

    fn build(inputs: &[&str], outputs: &[&str], gates: &[(&str, GateKind, &[&str])]) -> Circuit {
        let raw = RawNetlist {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            gates: gates
                .iter()
                .map(|(n, k, d)| RawGate {
                    name: n.to_string(),
                    kind: *k,
                    deps: d.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        };
        Circuit::from_source(&raw).unwrap()
    }

    #[test]
    fn test_fault_sim_sanity_scenario() {
        // Scenario 4: Z = OR(A,B); vector 00.
        let c = build(&["a", "b"], &["z"], &[("z", GateKind::Or, &["a", "b"])]);
        let a = c.signal_by_name("a").unwrap();
        let b = c.signal_by_name("b").unwrap();
        let z = c.signal_by_name("z").unwrap();
        let sim = BatchedFaultSimulator::new(&c);
        let detected = sim.run(&[vec![false, false]]);
        let row = &detected[0];

        let fault = |s: SignalId, bit: bool| row[2 * s.index() + if bit { 1 } else { 0 }];
        assert!(fault(a, true), "stuck-at-1 on A must be detected by 00");
        assert!(fault(b, true), "stuck-at-1 on B must be detected by 00");
        assert!(fault(z, true), "stuck-at-1 on Z must be detected by 00");
        assert!(!fault(a, false), "stuck-at-0 on A is not observable from 00");
        assert!(!fault(b, false), "stuck-at-0 on B is not observable from 00");
        assert!(!fault(z, false), "stuck-at-0 on Z is not observable from 00");
    }

    #[test]
    fn test_cross_model_agreement_with_golden_pass() {
        let c = build(
            &["a", "b", "c"],
            &["z"],
            &[("z", GateKind::And, &["a", "b", "c"])],
        );
        let golden = simulate_fault_free(&c, &[true, true, false]);
        let z = c.signal_by_name("z").unwrap();
        assert_eq!(golden[z.index()], false);
        let golden2 = simulate_fault_free(&c, &[true, true, true]);
        assert_eq!(golden2[z.index()], true);
    }

    #[test]
    fn test_determinism() {
        let c = build(&["a", "b"], &["z"], &[("z", GateKind::Xor, &["a", "b"])]);
        let sim = BatchedFaultSimulator::new(&c);
        let vectors = vec![vec![true, false], vec![false, false], vec![true, true]];
        let r1 = sim.run(&vectors);
        let r2 = sim.run(&vectors);
        assert_eq!(r1, r2);
    }
}
