//! Gatework Core - logic circuit compiler and arena evaluator
//!
//! This crate turns an editable graph of logic nodes into a flat byte arena
//! and simulates it in discrete, double-buffered steps. Nothing allocates
//! while stepping.
//!
//! # Pipeline
//!
//! - [`circuit`] - Mutable graph: gates, buttons, displays, nested functions
//!   and shared buses, bound connector to connector
//! - [`analysis`] - Cycle detection, propagation delay, layout order
//! - [`compiler`] - Two-pass serialization into an [`Arena`]
//! - [`evaluator`] - `pretick` (compute and stage) and `tick` (commit)
//! - [`simulation`] - [`Simulation`] driver: recompiles, buttons, settling
//!
//! # Arena
//!
//! [`Arena`] stores variable-length `#[repr(C)]` records in one 4-aligned
//! buffer. Inputs hold absolute offsets of the output bytes they read, so
//! evaluation is a flat walk with no lookups. Arenas can be saved as raw
//! bytes and loaded back (validated) on the same machine.
//!
//! # no_std Support
//!
//! Disable the default `std` feature to build without the standard library
//! (`alloc` is still required):
//!
//! ```toml
//! [dependencies]
//! gatework-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use gatework_core::circuit::{ButtonKind, Circuit, DisplayKind, GateKind};
//! use gatework_core::Simulation;
//!
//! let mut circuit = Circuit::new();
//! let a = circuit.add_button(ButtonKind::Toggle);
//! let b = circuit.add_button(ButtonKind::Toggle);
//! let xor = circuit.add_gate(GateKind::Xor, 2)?;
//! let lamp = circuit.add_display(DisplayKind::LightBulb);
//! circuit.connect(a, 0, xor, 0)?;
//! circuit.connect(b, 0, xor, 1)?;
//! circuit.connect(xor, 0, lamp, 0)?;
//!
//! let mut sim = Simulation::new(circuit);
//! sim.compile();
//! sim.press(a)?;
//! sim.settle(8);
//! assert_eq!(sim.display(lamp), Some(vec![true]));
//! # Ok::<(), gatework_core::CircuitError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod analysis;
pub mod arena;
pub mod circuit;
pub mod compiler;
pub mod evaluator;
pub mod simulation;

// Re-export main types at crate root
pub use analysis::{CYCLIC_DELAY, CircuitSummary};
pub use arena::layout::RecordKind;
pub use arena::{Arena, ArenaError, Offset, RecordInfo};
pub use circuit::{
    ButtonKind, Circuit, CircuitError, CircuitNode, DisplayKind, GateKind, NodeId, NodeKind,
    PinRef, UnaryKind,
};
pub use compiler::{CompiledCircuit, compile, compile_function_body};
pub use evaluator::{pretick, tick};
pub use simulation::{SettleReport, Simulation, decode_seven_segment};
