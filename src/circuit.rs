//! Circuit model (C2): gate graph after stem/branch expansion.
//!
//! A [`Circuit`] is the immutable topology of a combinational netlist:
//! primary inputs, primary outputs, and gates, all addressed through
//! [`SignalId`]s assigned so that primary inputs occupy a prefix and every
//! other signal follows in the topological order computed by
//! [`crate::levelize`] (spec §3, §9: "assign each signal a stable integer
//! index after levelization").
//!
//! Construction performs stem/branch expansion once, at parse time, and the
//! result never changes afterwards: mutable simulation state lives
//! separately in [`crate::sim::engine::Sim`], which borrows a `Circuit`
//! through an `Arc` so that spawning a parallel PODEM task clones only the
//! mutable half (design note, spec §9).

use fxhash::FxHashMap;
use std::fmt;

use crate::gate::{Gate, GateKind};
use crate::levelize::topo_order;
use crate::signal::SignalId;

/// A single named gate as it appears in the source netlist, before
/// stem/branch expansion. Produced by an external collaborator (the
/// `.bench` parser); consumed by [`Circuit::from_source`].
#[derive(Debug, Clone)]
pub struct RawGate {
    /// Name of the signal this gate produces.
    pub name: String,
    /// Gate kind.
    pub kind: GateKind,
    /// Ordered fan-in signal names, as written in the source.
    pub deps: Vec<String>,
}

/// A parsed netlist, before stem/branch expansion and numbering.
#[derive(Debug, Clone, Default)]
pub struct RawNetlist {
    /// Primary input names, in source order.
    pub inputs: Vec<String>,
    /// Primary output names, in source order.
    pub outputs: Vec<String>,
    /// Gate definitions, in source order.
    pub gates: Vec<RawGate>,
}

/// Immutable combinational netlist topology.
#[derive(Debug, Clone)]
pub struct Circuit {
    /// Signal name indexed by `SignalId`.
    names: Vec<String>,
    /// Inverse of `names`.
    name_to_id: FxHashMap<String, SignalId>,
    /// Gate record indexed by `SignalId`; primary inputs have `GateKind::Input`.
    gates: Vec<Gate>,
    /// Primary inputs, in source order (also `SignalId::new(0..nb_inputs)`).
    pi: Vec<SignalId>,
    /// Primary outputs, in source order.
    po: Vec<SignalId>,
}

/// The k-th synthesized branch name for stem `stem` feeding gate `consumer`.
///
/// Chooses the smallest `k` such that the resulting name collides with
/// nothing already taken, per spec §4.2.
fn branch_name(stem: &str, consumer: &str, taken: &impl Fn(&str) -> bool) -> String {
    for k in 0.. {
        let candidate = format!("{stem}_BRANCH{k}_{consumer}");
        if !taken(&candidate) {
            return candidate;
        }
    }
    unreachable!()
}

impl Circuit {
    /// Build a circuit from a parsed source netlist.
    ///
    /// Performs stem/branch expansion, levelization and numbering. The
    /// construction is total (returns `Err` rather than panicking on
    /// malformed input), deterministic, and does not mutate `raw`.
    pub fn from_source(raw: &RawNetlist) -> Result<Circuit, String> {
        // All names defined anywhere in the source (inputs and gate outputs).
        let mut defined: FxHashMap<String, ()> = FxHashMap::default();
        for name in &raw.inputs {
            if defined.insert(name.clone(), ()).is_some() {
                return Err(format!("signal {name} is defined twice"));
            }
        }
        for g in &raw.gates {
            if defined.insert(g.name.clone(), ()).is_some() {
                return Err(format!("signal {} is defined twice", g.name));
            }
        }
        for g in &raw.gates {
            for d in &g.deps {
                if !defined.contains_key(d) {
                    return Err(format!("gate input {d} is not generated anywhere"));
                }
            }
        }
        for o in &raw.outputs {
            if !defined.contains_key(o) {
                return Err(format!("output {o} is not generated anywhere"));
            }
        }

        // Map each producer name to the distinct consuming gates (by output name), in
        // first-appearance order, so expansion is deterministic.
        let mut consumers: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for g in &raw.gates {
            let mut seen_this_gate: FxHashMap<&str, ()> = FxHashMap::default();
            for d in &g.deps {
                if seen_this_gate.insert(d.as_str(), ()).is_some() {
                    continue;
                }
                consumers.entry(d.clone()).or_default().push(g.name.clone());
            }
        }

        // Stem/branch expansion: any producer feeding more than one distinct
        // gate gets one synthesized Buf branch per consumer (spec §3, §4.2).
        let mut taken: FxHashMap<String, ()> = defined.clone();
        // name -> consumer name -> branch name
        let mut branch_of: FxHashMap<String, FxHashMap<String, String>> = FxHashMap::default();
        let mut synthesized: Vec<RawGate> = Vec::new();
        for (stem, cons) in &consumers {
            if cons.len() <= 1 {
                continue;
            }
            let mut per_consumer = FxHashMap::default();
            for consumer in cons {
                let name = branch_name(stem, consumer, &|c| taken.contains_key(c));
                taken.insert(name.clone(), ());
                synthesized.push(RawGate {
                    name: name.clone(),
                    kind: GateKind::Buf,
                    deps: vec![stem.clone()],
                });
                per_consumer.insert(consumer.clone(), name);
            }
            branch_of.insert(stem.clone(), per_consumer);
        }

        // Rewrite every gate's fan-in to use its own branch tap where the
        // producer was expanded.
        let mut rewritten: Vec<RawGate> = Vec::with_capacity(raw.gates.len());
        for g in &raw.gates {
            let new_deps = g
                .deps
                .iter()
                .map(|d| {
                    branch_of
                        .get(d)
                        .and_then(|m| m.get(&g.name))
                        .cloned()
                        .unwrap_or_else(|| d.clone())
                })
                .collect();
            rewritten.push(RawGate {
                name: g.name.clone(),
                kind: g.kind,
                deps: new_deps,
            });
        }
        rewritten.extend(synthesized);

        // Levelize: primary inputs are a fixed prefix in source order, then every
        // other signal in a valid topological order (spec §3, §7).
        let order = topo_order(&raw.inputs, &rewritten)?;

        let mut names = Vec::with_capacity(order.len());
        let mut name_to_id = FxHashMap::default();
        for (i, name) in order.iter().enumerate() {
            names.push(name.clone());
            name_to_id.insert(name.clone(), SignalId::new(i));
        }

        let defs_by_name: FxHashMap<&str, &RawGate> =
            rewritten.iter().map(|g| (g.name.as_str(), g)).collect();

        let mut gates = Vec::with_capacity(order.len());
        for name in &order {
            if let Some(def) = defs_by_name.get(name.as_str()) {
                let fanin: Vec<SignalId> = def.deps.iter().map(|d| name_to_id[d]).collect();
                let gate = Gate::new(def.kind, fanin);
                if !gate.arity_ok() {
                    return Err(format!(
                        "gate {name} of kind {:?} has invalid arity {}",
                        def.kind,
                        def.deps.len()
                    ));
                }
                gates.push(gate);
            } else {
                // Primary input.
                gates.push(Gate::new(GateKind::Input, Vec::new()));
            }
        }

        // Fill in fanout lists.
        for consumer in 0..gates.len() {
            let fanin = gates[consumer].fanin.clone();
            for f in fanin {
                gates[f.index()].fanout.push(SignalId::new(consumer));
            }
        }
        for (i, g) in gates.iter().enumerate() {
            if !g.fanout_ok() {
                return Err(format!(
                    "signal {} has fan-out {}, exceeding MAX_ARITY",
                    order[i],
                    g.fanout.len()
                ));
            }
        }

        let pi: Vec<SignalId> = (0..raw.inputs.len()).map(SignalId::new).collect();
        let mut po = Vec::with_capacity(raw.outputs.len());
        for o in &raw.outputs {
            po.push(name_to_id[o]);
        }

        let circuit = Circuit {
            names,
            name_to_id,
            gates,
            pi,
            po,
        };
        circuit.check();
        Ok(circuit)
    }

    /// Number of primary inputs.
    pub fn nb_inputs(&self) -> usize {
        self.pi.len()
    }

    /// Number of primary outputs.
    pub fn nb_outputs(&self) -> usize {
        self.po.len()
    }

    /// Total number of signals (inputs + gates + synthesized branches).
    pub fn nb_signals(&self) -> usize {
        self.names.len()
    }

    /// Primary inputs, in source order.
    pub fn inputs(&self) -> &[SignalId] {
        &self.pi
    }

    /// Primary outputs, in source order.
    pub fn outputs(&self) -> &[SignalId] {
        &self.po
    }

    /// Gate record for a signal.
    pub fn gate(&self, s: SignalId) -> &Gate {
        &self.gates[s.index()]
    }

    /// Name of a signal.
    pub fn name(&self, s: SignalId) -> &str {
        &self.names[s.index()]
    }

    /// Look up a signal by name.
    pub fn signal_by_name(&self, name: &str) -> Option<SignalId> {
        self.name_to_id.get(name).copied()
    }

    /// Whether a signal is a primary input.
    pub fn is_input(&self, s: SignalId) -> bool {
        s.index() < self.pi.len()
    }

    /// Whether a signal is a primary output.
    pub fn is_output(&self, s: SignalId) -> bool {
        self.po.contains(&s)
    }

    /// All signal ids, in numbering (= topological) order.
    pub fn all_signals(&self) -> impl Iterator<Item = SignalId> {
        (0..self.names.len()).map(SignalId::new)
    }

    /// Check internal consistency: every fan-in id is in range and precedes
    /// its consumer (spec §3, topological invariant).
    pub fn check(&self) {
        assert_eq!(self.names.len(), self.gates.len());
        for (i, g) in self.gates.iter().enumerate() {
            for &f in &g.fanin {
                assert!(f.index() < i, "fan-in {f} of gate {i} is not topologically before it");
            }
        }
        for &o in &self.po {
            assert!(o.index() < self.nb_signals(), "output {o} out of range");
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Circuit with {} inputs, {} outputs, {} signals",
            self.nb_inputs(),
            self.nb_outputs(),
            self.nb_signals()
        )?;
        for s in self.all_signals() {
            let g = self.gate(s);
            if g.kind == GateKind::Input {
                continue;
            }
            let deps = g
                .fanin
                .iter()
                .map(|d| self.name(*d).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "  {} = {}({})", self.name(s), g.kind, deps)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(inputs: &[&str], outputs: &[&str], gates: &[(&str, GateKind, &[&str])]) -> RawNetlist {
        RawNetlist {
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
        }
    }

    #[test]
    fn test_simple_and() {
        let r = raw(
            &["a", "b", "c"],
            &["z"],
            &[("z", GateKind::And, &["a", "b", "c"])],
        );
        let c = Circuit::from_source(&r).unwrap();
        assert_eq!(c.nb_inputs(), 3);
        assert_eq!(c.nb_outputs(), 1);
        assert_eq!(c.nb_signals(), 4);
    }

    #[test]
    fn test_stem_branch_expansion() {
        // a feeds two distinct gates: stem/branch expansion must synthesize
        // two Buf taps and leave a unconsumed directly.
        let r = raw(
            &["a", "b", "c"],
            &["y", "z"],
            &[
                ("y", GateKind::And, &["a", "b"]),
                ("z", GateKind::Or, &["a", "c"]),
            ],
        );
        let c = Circuit::from_source(&r).unwrap();
        // 3 inputs + 2 branches + 2 gates = 7 signals
        assert_eq!(c.nb_signals(), 7);
        let a = c.signal_by_name("a").unwrap();
        // The stem itself now feeds exactly the two synthesized branches.
        assert_eq!(c.gate(a).fanout.len(), 2);
        for f in &c.gate(a).fanout {
            assert_eq!(c.gate(*f).kind, GateKind::Buf);
        }
        let y = c.signal_by_name("y").unwrap();
        let z = c.signal_by_name("z").unwrap();
        assert!(!c.gate(y).fanin.contains(&a));
        assert!(!c.gate(z).fanin.contains(&a));
    }

    #[test]
    fn test_no_expansion_for_single_consumer() {
        let r = raw(
            &["a", "b"],
            &["z"],
            &[("mid", GateKind::Not, &["a"]), ("z", GateKind::And, &["mid", "b"])],
        );
        let c = Circuit::from_source(&r).unwrap();
        assert_eq!(c.nb_signals(), 4);
    }

    #[test]
    fn test_undefined_dependency_is_error() {
        let r = raw(&["a"], &["z"], &[("z", GateKind::Buf, &["nope"])]);
        assert!(Circuit::from_source(&r).is_err());
    }

    #[test]
    fn test_bad_arity_is_error() {
        let r = raw(&["a"], &["z"], &[("z", GateKind::And, &["a"])]);
        assert!(Circuit::from_source(&r).is_err());
    }

    #[test]
    fn test_cycle_is_error() {
        let r = raw(
            &["a"],
            &["y"],
            &[
                ("x", GateKind::Buf, &["y"]),
                ("y", GateKind::Buf, &["x"]),
            ],
        );
        assert!(Circuit::from_source(&r).is_err());
    }

    #[test]
    fn test_fanout_beyond_max_arity_is_error() {
        // `a` feeds MAX_ARITY + 1 distinct consumers: stem/branch expansion
        // leaves `a` itself with one branch tap per consumer, so its own
        // fan-out exceeds MAX_ARITY.
        let nb_consumers = crate::gate::MAX_ARITY + 1;
        let mut outputs = Vec::with_capacity(nb_consumers);
        let mut gates = Vec::with_capacity(nb_consumers);
        for k in 0..nb_consumers {
            let name = format!("g{k}");
            gates.push(RawGate {
                name: name.clone(),
                kind: GateKind::Not,
                deps: vec!["a".to_string()],
            });
            outputs.push(name);
        }
        let r = RawNetlist {
            inputs: vec!["a".to_string()],
            outputs,
            gates,
        };
        assert!(Circuit::from_source(&r).is_err());
    }
}
