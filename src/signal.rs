//! Stable integer index for a signal, assigned once by the levelizer (C7).
//!
//! Per the design notes in spec §9, signals are identified by a small
//! integer after levelization rather than by repeated string lookups; the
//! string name is kept only at the I/O boundary (`Circuit::name`).

use std::fmt;

/// Index of a signal within a [`crate::circuit::Circuit`].
///
/// Primary inputs occupy a prefix `0..nb_inputs`; every other signal
/// (gates and synthesized branches) follows in topological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignalId(u32);

impl SignalId {
    /// Build a signal id from a raw index.
    pub fn new(i: usize) -> SignalId {
        SignalId(i as u32)
    }

    /// Raw index, for use as a `Vec`/array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_id_roundtrip() {
        for i in [0usize, 1, 7, 1000] {
            assert_eq!(SignalId::new(i).index(), i);
        }
    }
}
