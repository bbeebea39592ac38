//! Implication engine (C3): forward propagation, D-frontier maintenance,
//! fault injection, and return-code composition.

use std::collections::BinaryHeap;
use std::cmp::Reverse;
use std::sync::Arc;

use fxhash::FxHashMap;

use crate::circuit::Circuit;
use crate::gate::GateKind;
use crate::signal::SignalId;
use crate::value::{self, Value};

/// Composite result of a `set_and_imply` call (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    /// No effect on the fault.
    Normal,
    /// The fault site now carries `D`/`D̄` but the effect has not reached a PO.
    Activated,
    /// A primary output now carries `D`/`D̄`.
    Detected,
    /// An assignment matched the stuck value at the fault site, preventing activation.
    Masked,
    /// A contradictory combination was observed while composing return codes.
    Error,
}

/// Compose two return codes observed during the same `set_and_imply` call
/// (spec §4.3). `prev` is the running result so far, `new` is the code from
/// the gate evaluation just performed.
pub fn compose(prev: ReturnCode, new: ReturnCode) -> ReturnCode {
    use ReturnCode::*;
    if prev == Error || new == Error {
        return Error;
    }
    if prev == Masked && matches!(new, Detected | Activated) {
        return Error;
    }
    if new == Masked && matches!(prev, Detected | Activated) {
        return Error;
    }
    // Priority: Detected > Activated > Masked > Normal.
    fn rank(c: ReturnCode) -> u8 {
        match c {
            Detected => 3,
            Activated => 2,
            Masked => 1,
            Normal => 0,
            Error => unreachable!(),
        }
    }
    if rank(new) >= rank(prev) {
        new
    } else {
        prev
    }
}

/// The mutable half of a circuit under simulation: current value of every
/// signal, D-frontier membership, and the active fault.
///
/// Cheap to spawn in parallel: clone a `Sim` to hand an independent copy of
/// its state to a task, while the immutable [`Circuit`] topology is shared
/// through the `Arc` (spec §9, "Clone-on-spawn").
#[derive(Debug, Clone)]
pub struct Sim {
    topo: Arc<Circuit>,
    state: Vec<Value>,
    frontier: Vec<bool>,
    fault_location: Option<SignalId>,
    fault_value: Option<Value>,
}

impl Sim {
    /// Build a simulator over a circuit, with every signal at `X` and no
    /// fault active.
    pub fn new(topo: Arc<Circuit>) -> Sim {
        let n = topo.nb_signals();
        let mut sim = Sim {
            topo,
            state: vec![Value::X; n],
            frontier: vec![false; n],
            fault_location: None,
            fault_value: None,
        };
        sim.full_recompute();
        sim
    }

    /// Topology this simulator operates on.
    pub fn circuit(&self) -> &Circuit {
        &self.topo
    }

    /// Current value of a signal.
    pub fn value(&self, s: SignalId) -> Value {
        self.state[s.index()]
    }

    /// Whether `s` is currently on the D-frontier.
    pub fn on_frontier(&self, s: SignalId) -> bool {
        self.frontier[s.index()]
    }

    /// The current D-frontier, in signal-id order.
    pub fn d_frontier(&self) -> Vec<SignalId> {
        self.topo
            .all_signals()
            .filter(|s| self.frontier[s.index()])
            .collect()
    }

    /// Whether the D-frontier is empty.
    pub fn frontier_is_empty(&self) -> bool {
        self.frontier.iter().all(|b| !b)
    }

    /// The active fault location, if any.
    pub fn fault_location(&self) -> Option<SignalId> {
        self.fault_location
    }

    /// The active fault's effect value (`D` or `D̄`), if any.
    pub fn fault_value(&self) -> Option<Value> {
        self.fault_value
    }

    /// Record the active fault: `loc` stuck such that the fault effect is
    /// `v` (`D` for stuck-at-0, `D̄` for stuck-at-1). Fails if `loc` is out
    /// of range or `v` is not `D`/`D̄` (spec §4.3).
    pub fn set_circuit_fault(&mut self, loc: SignalId, v: Value) -> Result<(), String> {
        if loc.index() >= self.topo.nb_signals() {
            return Err(format!("fault location {loc} is out of range"));
        }
        if !matches!(v, Value::D | Value::DBar) {
            return Err("fault value must be D or D-bar".to_string());
        }
        self.fault_location = Some(loc);
        self.fault_value = Some(v);
        Ok(())
    }

    /// Reset every primary input to `X` and propagate.
    pub fn reset(&mut self) {
        for &pi in self.topo.inputs() {
            self.state[pi.index()] = Value::X;
        }
        self.full_recompute();
    }

    /// Set a primary input to `v` (one of `0`, `1`, `X`) and propagate the
    /// change through every dependent gate, returning the composite return
    /// code for this assignment (spec §4.3).
    ///
    /// `input` itself may be the active fault site — a PI-located fault is a
    /// valid fault just like any internal signal (spec §4.8 enumerates every
    /// signal) — so the assignment goes through the same D/D̄/Masked/Activated
    /// override `evaluate` applies to internal gates, via [`Sim::apply_fault_override`].
    pub fn set_and_imply(&mut self, input: SignalId, v: Value) -> ReturnCode {
        assert!(self.topo.is_input(input), "{input} is not a primary input");
        assert!(
            matches!(v, Value::Zero | Value::One | Value::X),
            "primary inputs may only be driven to 0, 1 or X"
        );

        let is_fault_site = self.fault_location == Some(input);
        let (final_value, masked) = self.apply_fault_override(input, v);
        self.state[input.index()] = final_value;
        let own_code = self.classify(input, final_value, is_fault_site, masked);

        let mut queue: BinaryHeap<Reverse<SignalId>> = BinaryHeap::new();
        for &f in &self.topo.gate(input).fanout {
            queue.push(Reverse(f));
        }
        let result = self.drain(queue, own_code);
        if result == ReturnCode::Error {
            log::debug!(
                "set_and_imply({input}, {v}): composed return code is Error (contradiction)"
            );
        }
        result
    }

    /// Pop gates off `queue` in topological order, evaluating each and
    /// re-queueing its fanout whenever the value changes, folding every
    /// evaluation's return code into `result` (the caller's own assignment's
    /// return code, or `Normal` for a full recompute with no assignment of
    /// its own). Since `SignalId` order is topological, a gate is only ever
    /// popped once all of its fan-in has reached its value for this call.
    fn drain(&mut self, mut queue: BinaryHeap<Reverse<SignalId>>, mut result: ReturnCode) -> ReturnCode {
        let mut queued = vec![false; self.state.len()];
        while let Some(Reverse(g)) = queue.pop() {
            queued[g.index()] = false;
            let (code, changed) = self.evaluate(g);
            result = compose(result, code);
            if changed {
                for &f in &self.topo.gate(g).fanout {
                    if !queued[f.index()] {
                        queued[f.index()] = true;
                        queue.push(Reverse(f));
                    }
                }
            }
        }
        result
    }

    /// Each PI's value in the good machine (`D` projects to `1`, `D̄` to
    /// `0`). A PI that never got a concrete assignment (`X` at the point of
    /// success) is reported as `0`, following the convention that
    /// don't-care primary inputs default low.
    pub fn current_pi_values(&self) -> FxHashMap<SignalId, bool> {
        self.topo
            .inputs()
            .iter()
            .map(|&pi| {
                let v = self.state[pi.index()];
                (pi, matches!(v, Value::One | Value::D))
            })
            .collect()
    }

    fn full_recompute(&mut self) {
        let mut queue: BinaryHeap<Reverse<SignalId>> = BinaryHeap::new();
        for s in self.topo.all_signals() {
            if self.topo.gate(s).kind != GateKind::Input {
                queue.push(Reverse(s));
            }
        }
        self.drain(queue, ReturnCode::Normal);
    }

    /// Apply fault injection to a signal's freshly computed value, following
    /// spec §4.3's rule: if `g` is the active fault site and `computed` is
    /// resolved (not `X`), it is forced to the stuck value, with the D/D̄
    /// effect appearing whenever the natural value disagrees with it (masked
    /// when it agrees). Shared by [`Sim::evaluate`] (internal gates) and
    /// [`Sim::set_and_imply`] (a fault located directly on a primary input).
    fn apply_fault_override(&self, g: SignalId, computed: Value) -> (Value, bool) {
        if self.fault_location != Some(g) || computed == Value::X {
            return (computed, false);
        }
        match self.fault_value.unwrap() {
            Value::D => {
                if computed == Value::Zero {
                    (Value::Zero, true)
                } else {
                    (Value::D, false)
                }
            }
            Value::DBar => {
                if computed == Value::One {
                    (Value::One, true)
                } else {
                    (Value::DBar, false)
                }
            }
            _ => unreachable!("fault value is always D or D-bar"),
        }
    }

    /// Classify the return code for a signal's new value (spec §4.3):
    /// `Detected` if a PO now carries the fault effect, else `Masked`/
    /// `Activated`/`Normal` if `g` is the fault site, else `Normal`.
    fn classify(&self, g: SignalId, final_value: Value, is_fault_site: bool, masked: bool) -> ReturnCode {
        if self.topo.is_output(g) && final_value.is_fault_effect() {
            ReturnCode::Detected
        } else if is_fault_site {
            if masked {
                ReturnCode::Masked
            } else if final_value.is_fault_effect() {
                ReturnCode::Activated
            } else {
                ReturnCode::Normal
            }
        } else {
            ReturnCode::Normal
        }
    }

    /// Recompute one gate's output from the current state of its fan-in,
    /// apply fault injection, and update the D-frontier. Returns this
    /// evaluation's return code and whether the gate's value changed.
    fn evaluate(&mut self, g: SignalId) -> (ReturnCode, bool) {
        let kind = self.topo.gate(g).kind;
        debug_assert_ne!(kind, GateKind::Input);
        let vals: Vec<Value> = self
            .topo
            .gate(g)
            .fanin
            .iter()
            .map(|&f| self.state[f.index()])
            .collect();
        let computed = match kind {
            GateKind::Buf => vals[0],
            GateKind::Not => value::not(vals[0]),
            GateKind::And => value::and_n(&vals),
            GateKind::Nand => value::nand_n(&vals),
            GateKind::Or => value::or_n(&vals),
            GateKind::Nor => value::nor_n(&vals),
            GateKind::Xor => value::xor_n(&vals),
            GateKind::Xnor => value::xnor_n(&vals),
            GateKind::Input => unreachable!(),
        };

        let is_fault_site = self.fault_location == Some(g);
        let (final_value, masked) = self.apply_fault_override(g, computed);

        let changed = self.state[g.index()] != final_value;
        self.state[g.index()] = final_value;

        let on_frontier = final_value == Value::X
            && self
                .topo
                .gate(g)
                .fanin
                .iter()
                .any(|f| self.state[f.index()].is_fault_effect());
        self.frontier[g.index()] = on_frontier;

        let code = self.classify(g, final_value, is_fault_site, masked);

        (code, changed)
    }
}
