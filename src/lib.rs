//! # wire_circuit
//!
//! **16-bit wire circuits, evaluated lazily**
//!
//! A circuit is a list of assignment instructions, one per line. Each binds
//! a wire to a constant, another wire, or a gate over at most two inputs.
//! Wires may be used before they are defined; a signal is only computed
//! when a wire is resolved.
//!
//! ## Quick Start
//!
//! ```rust
//! use wire_circuit::Circuit;
//!
//! let mut circuit = Circuit::from_instructions(
//!     "123 -> x\n456 -> y\nx AND y -> d\nNOT x -> h".lines(),
//! ).unwrap();
//!
//! assert_eq!(circuit.resolve("d").unwrap(), 72);
//! assert_eq!(circuit.resolve("h").unwrap(), 65412);
//!
//! println!("Circuit identity: blake3:{}", circuit.hash());
//! ```
//!
//! ## Key Concepts
//!
//! - **Wire**: a name bound to exactly one node
//! - **Node**: literal, wire reference, NOT, or AND/OR/LSHIFT/RSHIFT
//! - **Resolution**: recursive walk down to a signal, memoized per node
//! - **Invalidation**: clearing all memoized signals; rebinding a wire does it

pub mod arena;
pub mod cache;
pub mod circuit;
pub mod signal_ir;

pub use cache::{CacheState, CacheStats};
pub use circuit::{Circuit, CircuitError, CircuitHash};
pub use signal_ir::{BinaryOp, Instruction, Node, Operand, ParseError, Signal, WireName};
