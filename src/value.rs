//! Five-valued algebra used by the implication engine (C1).
//!
//! Values are `0`, `1`, `X` (unknown) and the two D-calculus symbols `D`
//! (good=1, faulty=0) and `D̄` (good=0, faulty=1). `AND`/`OR`/`XOR`/`NOT`
//! are total tables over `{0,1,X,D,D̄}`; every other gate kind folds one of
//! these or negates the result.

use std::fmt;

/// A signal value in the five-valued D-algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// Good machine 0, faulty machine 0.
    Zero,
    /// Good machine 1, faulty machine 1.
    One,
    /// Unknown (uninitialized primary input).
    X,
    /// Good machine 1, faulty machine 0: the fault effect is visible here.
    D,
    /// Good machine 0, faulty machine 1: the fault effect is visible here.
    DBar,
}

use Value::*;

impl Value {
    /// Encoding used for table lookups: `0=0, 1=1, D=2, D̄=3, X=4` (spec §4.1).
    fn idx(self) -> usize {
        match self {
            Zero => 0,
            One => 1,
            D => 2,
            DBar => 3,
            X => 4,
        }
    }

    /// Good-machine projection: what this value means on the fault-free circuit.
    pub fn good(self) -> bool {
        matches!(self, One | D)
    }

    /// Faulty-machine projection: what this value means with the fault active.
    pub fn faulty(self) -> bool {
        matches!(self, One | DBar)
    }

    /// Whether this value carries an active fault effect.
    pub fn is_fault_effect(self) -> bool {
        matches!(self, D | DBar)
    }

    /// Build a D-algebra value from a two-valued bit, with no fault effect.
    pub fn from_bool(b: bool) -> Value {
        if b {
            One
        } else {
            Zero
        }
    }
}

const AND_TABLE: [[Value; 5]; 5] = [
    [Zero, Zero, Zero, Zero, Zero],
    [Zero, One, D, DBar, X],
    [Zero, D, D, Zero, X],
    [Zero, DBar, Zero, DBar, X],
    [Zero, X, X, X, X],
];

const OR_TABLE: [[Value; 5]; 5] = [
    [Zero, One, D, DBar, X],
    [One, One, One, One, One],
    [D, One, D, One, X],
    [DBar, One, One, DBar, X],
    [X, One, X, X, X],
];

const XOR_TABLE: [[Value; 5]; 5] = [
    [Zero, One, D, DBar, X],
    [One, Zero, DBar, D, X],
    [D, DBar, Zero, One, X],
    [DBar, D, One, Zero, X],
    [X, X, X, X, X],
];

const NOT_TABLE: [Value; 5] = [One, Zero, DBar, D, X];

/// Binary AND over the five-valued algebra.
pub fn and2(a: Value, b: Value) -> Value {
    AND_TABLE[a.idx()][b.idx()]
}

/// Binary OR over the five-valued algebra.
pub fn or2(a: Value, b: Value) -> Value {
    OR_TABLE[a.idx()][b.idx()]
}

/// Binary XOR over the five-valued algebra.
pub fn xor2(a: Value, b: Value) -> Value {
    XOR_TABLE[a.idx()][b.idx()]
}

/// Unary NOT over the five-valued algebra.
pub fn not(a: Value) -> Value {
    NOT_TABLE[a.idx()]
}

/// Fold an n-ary AND over a non-empty slice of inputs.
pub fn and_n(vals: &[Value]) -> Value {
    vals.iter().copied().fold(One, and2)
}

/// Fold an n-ary OR over a non-empty slice of inputs.
pub fn or_n(vals: &[Value]) -> Value {
    vals.iter().copied().fold(Zero, or2)
}

/// Fold an n-ary XOR over a non-empty slice of inputs.
pub fn xor_n(vals: &[Value]) -> Value {
    vals.iter().copied().fold(Zero, xor2)
}

/// Fold an n-ary NAND: `NOT(AND(...))`.
pub fn nand_n(vals: &[Value]) -> Value {
    not(and_n(vals))
}

/// Fold an n-ary NOR: `NOT(OR(...))`.
pub fn nor_n(vals: &[Value]) -> Value {
    not(or_n(vals))
}

/// Fold an n-ary XNOR: `NOT(XOR(...))`.
pub fn xnor_n(vals: &[Value]) -> Value {
    not(xor_n(vals))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Zero => "0",
            One => "1",
            X => "X",
            D => "D",
            DBar => "D'",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_table() {
        assert_eq!(and2(Zero, X), Zero);
        assert_eq!(and2(D, D), D);
        assert_eq!(and2(D, DBar), Zero);
        assert_eq!(and2(X, One), X);
        assert_eq!(and2(X, Zero), Zero);
        assert_eq!(and2(DBar, DBar), DBar);
        assert_eq!(and2(DBar, D), Zero);
    }

    #[test]
    fn test_or_table() {
        assert_eq!(or2(One, X), One);
        assert_eq!(or2(D, DBar), One);
        assert_eq!(or2(D, D), D);
        assert_eq!(or2(X, Zero), X);
        assert_eq!(or2(X, One), One);
    }

    #[test]
    fn test_xor_table() {
        assert_eq!(xor2(D, DBar), One);
        assert_eq!(xor2(D, D), Zero);
        assert_eq!(xor2(X, One), X);
        assert_eq!(xor2(Zero, One), One);
    }

    #[test]
    fn test_not_table() {
        assert_eq!(not(D), DBar);
        assert_eq!(not(DBar), D);
        assert_eq!(not(X), X);
        assert_eq!(not(Zero), One);
        assert_eq!(not(One), Zero);
    }

    #[test]
    fn test_derived_nary() {
        assert_eq!(nand_n(&[One, One]), Zero);
        assert_eq!(nor_n(&[Zero, Zero]), One);
        assert_eq!(xnor_n(&[One, Zero]), Zero);
        assert_eq!(and_n(&[One, One, D]), D);
        assert_eq!(or_n(&[Zero, Zero, DBar]), DBar);
    }
}
