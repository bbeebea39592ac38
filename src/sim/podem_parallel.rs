//! Parallel PODEM variants (C5): across-decisions and across-objectives
//! task parallelism, throttled by a shared search context (spec §4.5, §5).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use fxhash::FxHashMap;
use log::debug;
use rayon::prelude::*;

use crate::circuit::Circuit;
use crate::config::ParallelMode;
use crate::signal::SignalId;
use crate::sim::engine::Sim;
use crate::sim::podem::{backtrace, choose_objective, is_detected};
use crate::value::Value;

/// Shared mutable context for one `run_podem_parallel` invocation: the
/// "solution found" flag and the active-task throttle, scoped per fault
/// rather than as process-wide globals (spec §9, "Global mutable state in
/// parallel PODEM").
pub struct SearchContext {
    solution_found: AtomicBool,
    active_tasks: AtomicUsize,
    max_task_high_water: AtomicUsize,
    max_active_tasks: usize,
    max_parallel_objectives: usize,
}

impl SearchContext {
    /// Build a fresh context. `solution_found` and `active_tasks` always
    /// start at their zero values; there is no way to construct a context
    /// in a stale state.
    pub fn new(max_active_tasks: usize, max_parallel_objectives: usize) -> SearchContext {
        SearchContext {
            solution_found: AtomicBool::new(false),
            active_tasks: AtomicUsize::new(0),
            max_task_high_water: AtomicUsize::new(0),
            max_active_tasks,
            max_parallel_objectives: max_parallel_objectives.max(1),
        }
    }

    /// High-water mark of concurrently active tasks over this context's
    /// lifetime, restored from the original `theMaxTaskCnt` counter as a
    /// diagnostic (not a new search feature).
    pub fn max_task_high_water(&self) -> usize {
        self.max_task_high_water.load(Ordering::SeqCst)
    }

    fn solved(&self) -> bool {
        self.solution_found.load(Ordering::SeqCst)
    }

    fn mark_solved(&self) {
        self.solution_found.store(true, Ordering::SeqCst);
    }

    /// Attempt to reserve room for one more spawn event. Returns `false`
    /// (without reserving) if the pool is already at `max_active_tasks`.
    fn try_enter(&self) -> bool {
        let prev = self.active_tasks.fetch_add(1, Ordering::SeqCst);
        if prev < self.max_active_tasks {
            self.max_task_high_water.fetch_max(prev + 1, Ordering::SeqCst);
            true
        } else {
            self.active_tasks.fetch_sub(1, Ordering::SeqCst);
            false
        }
    }

    fn leave(&self) {
        self.active_tasks.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Run one of the two parallel PODEM variants for a single stuck-at fault.
/// `mode` must be `AcrossDecisions` or `AcrossObjectives`; use
/// [`crate::sim::podem::run_podem`] for `Serial`.
pub fn run_podem_parallel(
    topo: Arc<Circuit>,
    fault_loc: SignalId,
    fault_value: Value,
    mode: ParallelMode,
    ctx: &SearchContext,
) -> Option<FxHashMap<SignalId, bool>> {
    assert_ne!(mode, ParallelMode::Serial, "use run_podem for serial search");
    let mut sim = Sim::new(topo);
    sim.set_circuit_fault(fault_loc, fault_value)
        .expect("fault_value must be D or D-bar");
    sim.reset();
    search(&mut sim, fault_loc, mode, ctx)
}

/// Across-decisions variant: named after the original `runPODEMRecursiveParallelDecisions`.
pub fn run_podem_across_decisions(
    topo: Arc<Circuit>,
    fault_loc: SignalId,
    fault_value: Value,
    ctx: &SearchContext,
) -> Option<FxHashMap<SignalId, bool>> {
    run_podem_parallel(topo, fault_loc, fault_value, ParallelMode::AcrossDecisions, ctx)
}

/// Across-objectives variant: named after the original `runPODEMRecursiveParallelSignals`.
pub fn run_podem_across_objectives(
    topo: Arc<Circuit>,
    fault_loc: SignalId,
    fault_value: Value,
    ctx: &SearchContext,
) -> Option<FxHashMap<SignalId, bool>> {
    run_podem_parallel(topo, fault_loc, fault_value, ParallelMode::AcrossObjectives, ctx)
}

fn search(
    sim: &mut Sim,
    fault_loc: SignalId,
    mode: ParallelMode,
    ctx: &SearchContext,
) -> Option<FxHashMap<SignalId, bool>> {
    if ctx.solved() {
        return None;
    }
    if is_detected(sim) {
        ctx.mark_solved();
        return Some(sim.current_pi_values());
    }
    if sim.frontier_is_empty() && sim.value(fault_loc) != Value::X {
        return None;
    }

    match mode {
        ParallelMode::Serial => unreachable!("dispatched away in run_podem_parallel"),
        ParallelMode::AcrossDecisions => {
            let objective = choose_objective(sim, fault_loc);
            let (pi, v) = backtrace(sim, objective);
            decisions_branch(sim, pi, v, fault_loc, ctx)
        }
        ParallelMode::AcrossObjectives => {
            if sim.value(fault_loc) == Value::X {
                // Only one possible objective (activate the fault site);
                // there is nothing to fan out across yet.
                let objective = choose_objective(sim, fault_loc);
                let (pi, v) = backtrace(sim, objective);
                two_value_attempt(sim, pi, v, fault_loc, ctx)
            } else {
                let objectives = distinct_objectives(sim, ctx.max_parallel_objectives);
                dispatch_objectives(sim, objectives, fault_loc, ctx)
            }
        }
    }
}

/// Across-decisions branch: explore `(pi, v)` and `(pi, !v)` concurrently
/// when the throttle allows it, serially otherwise.
fn decisions_branch(
    sim: &mut Sim,
    pi: SignalId,
    v: bool,
    fault_loc: SignalId,
    ctx: &SearchContext,
) -> Option<FxHashMap<SignalId, bool>> {
    if ctx.try_enter() {
        let mut clone_v = sim.clone();
        let mut clone_nv = sim.clone();
        clone_v.set_and_imply(pi, Value::from_bool(v));
        clone_nv.set_and_imply(pi, Value::from_bool(!v));
        let (res_v, res_nv) = rayon::join(
            || search(&mut clone_v, fault_loc, ParallelMode::AcrossDecisions, ctx),
            || search(&mut clone_nv, fault_loc, ParallelMode::AcrossDecisions, ctx),
        );
        ctx.leave();
        // Preference to the first decision (v) if both branches succeed
        // (spec §9, open question 3).
        if let Some(m) = res_v {
            *sim = clone_v;
            return Some(m);
        }
        if let Some(m) = res_nv {
            *sim = clone_nv;
            return Some(m);
        }
        sim.set_and_imply(pi, Value::X);
        None
    } else {
        debug!("podem-parallel: active_tasks at cap, degrading to serial at {pi}");
        sim.set_and_imply(pi, Value::from_bool(v));
        if let Some(m) = search(sim, fault_loc, ParallelMode::AcrossDecisions, ctx) {
            return Some(m);
        }
        sim.set_and_imply(pi, Value::from_bool(!v));
        if let Some(m) = search(sim, fault_loc, ParallelMode::AcrossDecisions, ctx) {
            return Some(m);
        }
        sim.set_and_imply(pi, Value::X);
        None
    }
}

/// Across-objectives per-task work: try `v` then `!v` serially on this
/// task's own clone (spec §4.5: "a full two-value attempt").
fn two_value_attempt(
    sim: &mut Sim,
    pi: SignalId,
    v: bool,
    fault_loc: SignalId,
    ctx: &SearchContext,
) -> Option<FxHashMap<SignalId, bool>> {
    sim.set_and_imply(pi, Value::from_bool(v));
    if let Some(m) = search(sim, fault_loc, ParallelMode::AcrossObjectives, ctx) {
        return Some(m);
    }
    sim.set_and_imply(pi, Value::from_bool(!v));
    if let Some(m) = search(sim, fault_loc, ParallelMode::AcrossObjectives, ctx) {
        return Some(m);
    }
    sim.set_and_imply(pi, Value::X);
    None
}

/// Collect up to `max` distinct (X fan-in, non-controlling value) objectives
/// across the current D-frontier, in frontier/fan-in order.
fn distinct_objectives(sim: &Sim, max: usize) -> Vec<(SignalId, bool)> {
    let mut out = Vec::new();
    for g in sim.d_frontier() {
        let kind = sim.circuit().gate(g).kind;
        for &f in &sim.circuit().gate(g).fanin {
            if sim.value(f) == Value::X {
                out.push((f, kind.non_controlling_value()));
                if out.len() >= max {
                    return out;
                }
            }
        }
    }
    out
}

/// Dispatch up to `objectives.len()` concurrent tasks, one per objective,
/// respecting the active-task throttle.
fn dispatch_objectives(
    sim: &mut Sim,
    objectives: Vec<(SignalId, bool)>,
    fault_loc: SignalId,
    ctx: &SearchContext,
) -> Option<FxHashMap<SignalId, bool>> {
    let decisions: Vec<(SignalId, bool)> = objectives
        .iter()
        .map(|&obj| backtrace(sim, obj))
        .collect();

    if decisions.len() <= 1 || !ctx.try_enter() {
        let &(pi, v) = decisions.first()?;
        return two_value_attempt(sim, pi, v, fault_loc, ctx);
    }

    let clones: Vec<Sim> = decisions.iter().map(|_| sim.clone()).collect();
    let results: Vec<Option<FxHashMap<SignalId, bool>>> = clones
        .into_iter()
        .zip(decisions.into_iter())
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(mut clone, (pi, v))| two_value_attempt(&mut clone, pi, v, fault_loc, ctx))
        .collect();
    ctx.leave();
    results.into_iter().flatten().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, RawGate, RawNetlist};
    use crate::gate::GateKind;

    fn build(inputs: &[&str], outputs: &[&str], gates: &[(&str, GateKind, &[&str])]) -> Arc<Circuit> {
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
        Arc::new(Circuit::from_source(&raw).unwrap())
    }

    #[test]
    fn test_across_decisions_throttle_zero_matches_serial() {
        let c = build(&["a", "b", "c"], &["z"], &[("z", GateKind::And, &["a", "b", "c"])]);
        let z = c.signal_by_name("z").unwrap();
        let ctx = SearchContext::new(0, 1);
        let m = run_podem_parallel(c, z, Value::DBar, ParallelMode::AcrossDecisions, &ctx);
        assert!(m.is_some());
    }

    #[test]
    fn test_across_decisions_detects_inverter_chain() {
        let c = build(&["a"], &["z"], &[("y", GateKind::Not, &["a"]), ("z", GateKind::Not, &["y"])]);
        let y = c.signal_by_name("y").unwrap();
        let a = c.signal_by_name("a").unwrap();
        let ctx = SearchContext::new(4, 2);
        let m = run_podem_parallel(c, y, Value::D, ParallelMode::AcrossDecisions, &ctx).unwrap();
        assert_eq!(*m.get(&a).unwrap(), false);
    }

    #[test]
    fn test_across_objectives_detects_inverter_chain() {
        let c = build(&["a"], &["z"], &[("y", GateKind::Not, &["a"]), ("z", GateKind::Not, &["y"])]);
        let y = c.signal_by_name("y").unwrap();
        let a = c.signal_by_name("a").unwrap();
        let ctx = SearchContext::new(4, 2);
        let m = run_podem_parallel(c, y, Value::D, ParallelMode::AcrossObjectives, &ctx).unwrap();
        assert_eq!(*m.get(&a).unwrap(), false);
    }

    #[test]
    fn test_undetectable_fault_returns_none_in_parallel_modes() {
        let c = build(
            &["a"],
            &["z"],
            &[("na", GateKind::Not, &["a"]), ("z", GateKind::And, &["a", "na"])],
        );
        let z = c.signal_by_name("z").unwrap();
        let ctx = SearchContext::new(4, 2);
        assert!(run_podem_parallel(c, z, Value::D, ParallelMode::AcrossDecisions, &ctx).is_none());
    }
}
