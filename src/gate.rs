//! Gate representation (C2): kind, fan-in, and arity bound.

use crate::signal::SignalId;
use std::fmt;

/// Maximum fan-in/fan-out arity a single gate may have.
///
/// The batched fault simulator (C6) uses fixed-width per-gate records, so
/// arity is bounded at construction time by this compile-time constant
/// (spec §3: "bounded by a compile-time constant (set to at least 15)").
pub const MAX_ARITY: usize = 32;

/// Gate kind, following the `.bench` (ISCAS) keyword set (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    /// Primary input: no fan-in.
    Input,
    /// Buffer: exactly one fan-in. Also used for synthesized stem/branch taps.
    Buf,
    /// Inverter: exactly one fan-in.
    Not,
    /// n-ary AND, arity >= 2.
    And,
    /// n-ary NAND, arity >= 2.
    Nand,
    /// n-ary OR, arity >= 2.
    Or,
    /// n-ary NOR, arity >= 2.
    Nor,
    /// n-ary XOR, arity >= 2.
    Xor,
    /// n-ary XNOR, arity >= 2.
    Xnor,
}

impl GateKind {
    /// Minimum valid arity for this gate kind (spec §3 invariants).
    pub fn min_arity(self) -> usize {
        match self {
            GateKind::Input => 0,
            GateKind::Buf | GateKind::Not => 1,
            GateKind::And
            | GateKind::Nand
            | GateKind::Or
            | GateKind::Nor
            | GateKind::Xor
            | GateKind::Xnor => 2,
        }
    }

    /// Maximum valid arity for this gate kind.
    pub fn max_arity(self) -> usize {
        match self {
            GateKind::Input => 0,
            GateKind::Buf | GateKind::Not => 1,
            _ => MAX_ARITY,
        }
    }

    /// Whether this gate kind inverts its backtrace target (NOT, NAND, NOR, XNOR),
    /// as used by PODEM's backtrace step (spec §4.4).
    pub fn is_inverting(self) -> bool {
        matches!(
            self,
            GateKind::Not | GateKind::Nand | GateKind::Nor | GateKind::Xnor
        )
    }

    /// The non-controlling value used to choose a PODEM objective on the
    /// D-frontier (spec §4.4): 1 for AND/NAND, 0 for OR/NOR/XOR/XNOR.
    ///
    /// Only meaningful for gates that can appear on the D-frontier, i.e.
    /// anything but `Input`/`Buf`/`Not` (those never leave a fan-in at X
    /// while being a frontier gate in a way that needs this heuristic, since
    /// they have a single input).
    pub fn non_controlling_value(self) -> bool {
        matches!(self, GateKind::And | GateKind::Nand)
    }

    /// Parse a `.bench` keyword (case-insensitive) into a gate kind.
    pub fn from_keyword(s: &str) -> Option<GateKind> {
        match s.to_ascii_uppercase().as_str() {
            "BUF" | "BUFF" => Some(GateKind::Buf),
            "NOT" => Some(GateKind::Not),
            "AND" => Some(GateKind::And),
            "NAND" => Some(GateKind::Nand),
            "OR" => Some(GateKind::Or),
            "NOR" => Some(GateKind::Nor),
            "XOR" => Some(GateKind::Xor),
            "XNOR" => Some(GateKind::Xnor),
            _ => None,
        }
    }

    /// The `.bench` keyword for this gate kind (used by the writer).
    pub fn keyword(self) -> &'static str {
        match self {
            GateKind::Input => "INPUT",
            GateKind::Buf => "BUF",
            GateKind::Not => "NOT",
            GateKind::And => "AND",
            GateKind::Nand => "NAND",
            GateKind::Or => "OR",
            GateKind::Nor => "NOR",
            GateKind::Xor => "XOR",
            GateKind::Xnor => "XNOR",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// A single gate: its kind and ordered fan-in.
///
/// The output signal is implicit: a `Gate` at index `i` in
/// [`crate::circuit::Circuit`] produces signal `SignalId::new(i)`.
#[derive(Debug, Clone)]
pub struct Gate {
    /// Gate kind.
    pub kind: GateKind,
    /// Ordered fan-in signals. Empty for `Input`.
    pub fanin: Vec<SignalId>,
    /// Gates that consume this gate's output, filled in after construction.
    pub fanout: Vec<SignalId>,
}

impl Gate {
    /// Build a new gate with no recorded fanout yet.
    pub fn new(kind: GateKind, fanin: Vec<SignalId>) -> Gate {
        Gate {
            kind,
            fanin,
            fanout: Vec::new(),
        }
    }

    /// Whether this gate's fan-in arity respects the bounds for its kind.
    pub fn arity_ok(&self) -> bool {
        let n = self.fanin.len();
        n >= self.kind.min_arity() && n <= self.kind.max_arity()
    }

    /// Whether this gate's fan-out arity respects `MAX_ARITY` (spec §3: fan-in
    /// "and fan-out" are both bounded by the same compile-time constant).
    pub fn fanout_ok(&self) -> bool {
        self.fanout.len() <= MAX_ARITY
    }
}
