//! PODEM-based automatic test pattern generation and parallel fault
//! simulation for combinational netlists.
//!
//! A `.bench` netlist is parsed into a [`circuit::Circuit`] (stem/branch
//! expansion and levelization happen once, at construction), then either
//! driven through [`sim`]'s PODEM search to generate a detecting test vector
//! per stuck-at fault (`atpg`), or through the batched two-valued fault
//! simulator to score a user-supplied vector set (`simulate`).

pub mod atpg;
pub mod cmd;
pub mod circuit;
pub mod config;
pub mod gate;
pub mod io;
pub mod levelize;
pub mod signal;
pub mod sim;
pub mod value;

pub use circuit::Circuit;
pub use config::{Config, ParallelMode};
pub use gate::{Gate, GateKind};
pub use signal::SignalId;
pub use value::Value;
