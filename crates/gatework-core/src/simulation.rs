//! High-level simulation driver.
//!
//! [`Simulation`] pairs an editable [`Circuit`] with its current compiled
//! arena and drives it step by step. Edits go to the circuit and take effect
//! on the next [`compile()`](Simulation::compile); button drivers write both
//! the circuit and the live arena so they act immediately.
//!
//! ```rust
//! use gatework_core::circuit::{ButtonKind, Circuit, DisplayKind, GateKind};
//! use gatework_core::Simulation;
//!
//! let mut circuit = Circuit::new();
//! let a = circuit.add_button(ButtonKind::Toggle);
//! let b = circuit.add_button(ButtonKind::Toggle);
//! let and = circuit.add_gate(GateKind::And, 2)?;
//! let lamp = circuit.add_display(DisplayKind::LightBulb);
//! circuit.connect(a, 0, and, 0)?;
//! circuit.connect(b, 0, and, 1)?;
//! circuit.connect(and, 0, lamp, 0)?;
//!
//! let mut sim = Simulation::new(circuit);
//! sim.compile();
//! sim.set_button(a, true)?;
//! sim.set_button(b, true)?;
//! assert!(sim.settle(16).converged);
//! assert_eq!(sim.display(lamp), Some(vec![true]));
//! # Ok::<(), gatework_core::circuit::CircuitError>(())
//! ```

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::arena::{Arena, Offset};
use crate::circuit::{ButtonKind, Circuit, CircuitError, DisplayKind, NodeId, NodeKind};
use crate::compiler::{self, CompiledCircuit};
use crate::evaluator;

/// Result of [`Simulation::settle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettleReport {
    /// Steps executed.
    pub rounds: u32,
    /// `true` if the last step reported no pending change.
    pub converged: bool,
}

/// Segment patterns (bit 0 = a … bit 6 = g) for hexadecimal digits.
const SEVEN_SEGMENT_DIGITS: [u8; 16] = [
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F, 0x77, 0x7C, 0x39, 0x5E, 0x79,
    0x71,
];

/// Editable circuit plus its live compiled arena.
#[derive(Clone, Debug)]
pub struct Simulation {
    circuit: Circuit,
    compiled: Option<CompiledCircuit>,
    force_next: bool,
    force_first_step: bool,
    carry_over: bool,
    steps: u64,
}

impl Simulation {
    /// Wraps `circuit`. Nothing runs until [`compile()`](Self::compile).
    pub fn new(circuit: Circuit) -> Self {
        Self {
            circuit,
            compiled: None,
            force_next: false,
            force_first_step: true,
            carry_over: true,
            steps: 0,
        }
    }

    /// Whether toggle button levels survive recompiles (default `true`).
    pub fn set_carry_over(&mut self, enabled: bool) {
        self.carry_over = enabled;
    }

    /// Whether the first step after a compile runs with `force` (default
    /// `true`).
    pub fn set_force_first_step(&mut self, enabled: bool) {
        self.force_first_step = enabled;
    }

    /// The edit-time circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Mutable access to the circuit. Structural edits only reach the arena
    /// on the next [`compile()`](Self::compile).
    pub fn circuit_mut(&mut self) -> &mut Circuit {
        &mut self.circuit
    }

    /// The current compiled form, if any.
    pub fn compiled(&self) -> Option<&CompiledCircuit> {
        self.compiled.as_ref()
    }

    /// The live arena, if compiled.
    pub fn arena(&self) -> Option<&Arena> {
        self.compiled.as_ref().map(|c| &c.arena)
    }

    /// Returns `true` once [`compile()`](Self::compile) has run.
    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Steps executed since construction.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    // --- Lifecycle ---

    /// Recompiles the circuit into a fresh arena.
    ///
    /// Toggle levels are copied back from the old arena first (when carry-over
    /// is enabled); push buttons restart released. The next step runs with
    /// `force` so every function subtree is evaluated at least once.
    pub fn compile(&mut self) {
        if let Some(old) = self.compiled.take()
            && self.carry_over
        {
            self.carry_over_buttons(&old);
        }
        let compiled = compiler::compile(&self.circuit);

        #[cfg(feature = "tracing")]
        tracing::info!(
            "simulation_compile: {} nodes, {} bytes, delay {}",
            self.circuit.node_count(),
            compiled.arena.len(),
            compiled.delay
        );

        self.compiled = Some(compiled);
        self.force_next = self.force_first_step;
    }

    fn carry_over_buttons(&mut self, old: &CompiledCircuit) {
        let buttons: Vec<(NodeId, ButtonKind)> = self
            .circuit
            .iter()
            .filter_map(|(id, node)| match node.kind() {
                NodeKind::Button(kind) => Some((id, *kind)),
                _ => None,
            })
            .collect();

        for (id, kind) in buttons {
            let level = match kind {
                ButtonKind::Push => false,
                ButtonKind::Toggle | ButtonKind::StaticToggle => {
                    match read_output(&old.arena, old.offset(id), 0) {
                        Some(level) => level,
                        None => continue,
                    }
                }
            };
            // `id` came from iterating the circuit, so it is a live button.
            let _ = self.circuit.set_button_state(id, level);
        }
    }

    /// Runs one pretick/tick pair.
    ///
    /// Returns whether pretick reported a pending change. Does nothing and
    /// returns `false` before the first compile.
    pub fn step(&mut self) -> bool {
        let Some(compiled) = self.compiled.as_mut() else {
            return false;
        };
        let force = core::mem::take(&mut self.force_next);
        let changed = evaluator::pretick(&mut compiled.arena, force);
        evaluator::tick(&mut compiled.arena, force);
        self.steps += 1;
        changed
    }

    /// Steps until a step reports no change, or `max_rounds` steps ran.
    pub fn settle(&mut self, max_rounds: u32) -> SettleReport {
        if self.compiled.is_none() {
            return SettleReport {
                rounds: 0,
                converged: true,
            };
        }
        let mut rounds = 0;
        while rounds < max_rounds {
            rounds += 1;
            if !self.step() {
                #[cfg(feature = "tracing")]
                tracing::debug!("simulation_settle: converged after {rounds} rounds");
                return SettleReport {
                    rounds,
                    converged: true,
                };
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("simulation_settle: still changing after {rounds} rounds");
        SettleReport {
            rounds,
            converged: false,
        }
    }

    /// Steps needed for the compiled circuit to propagate a new input to
    /// every display. `None` when it is cyclic or before the first compile.
    pub fn rounds_to_settle(&self) -> Option<u32> {
        let compiled = self.compiled.as_ref()?;
        u32::try_from(compiled.delay).ok()
    }

    // --- Drivers ---

    /// Sets a button's level in the circuit and, if compiled, in the arena.
    ///
    /// Static toggle buttons are constant sources and are refused.
    pub fn set_button(&mut self, id: NodeId, level: bool) -> Result<(), CircuitError> {
        self.drivable_button(id)?;
        self.circuit.set_button_state(id, level)?;
        if let Some(compiled) = self.compiled.as_mut() {
            let cell = compiled
                .offset(id)
                .and_then(|at| compiled.arena.output_cell(at, 0, Offset::ROOT));
            if let Some(cell) = cell {
                compiled.arena.write_bool(cell, level);
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("simulation_button: {id} = {level}");
        Ok(())
    }

    /// Presses a button: a push button goes high, a toggle flips.
    pub fn press(&mut self, id: NodeId) -> Result<(), CircuitError> {
        match self.drivable_button(id)? {
            ButtonKind::Push => self.set_button(id, true),
            _ => self.toggle(id),
        }
    }

    /// Releases a button: a push button goes low, a toggle keeps its level.
    pub fn release(&mut self, id: NodeId) -> Result<(), CircuitError> {
        match self.drivable_button(id)? {
            ButtonKind::Push => self.set_button(id, false),
            _ => Ok(()),
        }
    }

    /// Flips a button's level.
    pub fn toggle(&mut self, id: NodeId) -> Result<(), CircuitError> {
        let level = self.circuit.button_state(id)?;
        self.set_button(id, !level)
    }

    fn drivable_button(&self, id: NodeId) -> Result<ButtonKind, CircuitError> {
        let node = self.circuit.node(id).ok_or(CircuitError::NodeNotFound(id))?;
        match node.kind() {
            NodeKind::Button(ButtonKind::StaticToggle) => Err(CircuitError::WrongKind {
                node: id,
                expected: "runtime-driven button",
            }),
            NodeKind::Button(kind) => Ok(*kind),
            _ => Err(CircuitError::WrongKind {
                node: id,
                expected: "button",
            }),
        }
    }

    // --- Readers ---

    /// Committed level of output `index` of a top-level node.
    ///
    /// `None` before compile, for nodes added since, or for nodes without
    /// that output.
    pub fn output(&self, id: NodeId, index: u16) -> Option<bool> {
        let compiled = self.compiled.as_ref()?;
        read_output(&compiled.arena, compiled.offset(id), index)
    }

    /// Levels seen by every input of a top-level display.
    pub fn display(&self, id: NodeId) -> Option<Vec<bool>> {
        let compiled = self.compiled.as_ref()?;
        evaluator::display_levels(&compiled.arena, compiled.offset(id)?)
    }

    /// Hex digit shown by a seven-segment display, or `None` if the lit
    /// segments do not form one.
    pub fn seven_segment_digit(&self, id: NodeId) -> Option<u8> {
        let node = self.circuit.node(id)?;
        if !matches!(node.kind(), NodeKind::Display(DisplayKind::SevenSegment)) {
            return None;
        }
        let segments = self.display(id)?;
        decode_seven_segment(&segments)
    }
}

fn read_output(arena: &Arena, record: Option<Offset>, index: u16) -> Option<bool> {
    let cell = arena.output_cell(record?, index, Offset::ROOT)?;
    Some(arena.read_bool(cell))
}

/// Decodes segment levels `a..g` into a hex digit.
pub fn decode_seven_segment(segments: &[bool]) -> Option<u8> {
    if segments.len() != 7 {
        return None;
    }
    let pattern = segments
        .iter()
        .enumerate()
        .fold(0u8, |acc, (i, &lit)| acc | (u8::from(lit) << i));
    SEVEN_SEGMENT_DIGITS
        .iter()
        .position(|&p| p == pattern)
        .map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{GateKind, UnaryKind};

    fn xor_function() -> Circuit {
        let mut body = Circuit::new();
        let x = body.add_button(ButtonKind::Push);
        let y = body.add_button(ButtonKind::Push);
        let xor = body.add_gate(GateKind::Xor, 2).unwrap();
        let out = body.add_display(DisplayKind::LightBulb);
        body.set_position(x, 1.0).unwrap();
        body.connect(x, 0, xor, 0).unwrap();
        body.connect(y, 0, xor, 1).unwrap();
        body.connect(xor, 0, out, 0).unwrap();
        body
    }

    #[test]
    fn test_step_before_compile_is_noop() {
        let mut sim = Simulation::new(Circuit::new());
        assert!(!sim.step());
        assert_eq!(sim.step_count(), 0);
        assert_eq!(
            sim.settle(10),
            SettleReport {
                rounds: 0,
                converged: true
            }
        );
    }

    #[test]
    fn test_and_gate_with_lamp() {
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Toggle);
        let b = c.add_button(ButtonKind::Toggle);
        let and = c.add_gate(GateKind::And, 2).unwrap();
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, and, 0).unwrap();
        c.connect(b, 0, and, 1).unwrap();
        c.connect(and, 0, lamp, 0).unwrap();

        let mut sim = Simulation::new(c);
        sim.compile();
        sim.set_button(a, true).unwrap();
        sim.settle(8);
        assert_eq!(sim.display(lamp), Some(vec![false]));

        sim.set_button(b, true).unwrap();
        let report = sim.settle(8);
        assert!(report.converged);
        assert_eq!(sim.output(and, 0), Some(true));
        assert_eq!(sim.display(lamp), Some(vec![true]));
    }

    #[test]
    fn test_xor_function_node() {
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Toggle);
        let b = c.add_button(ButtonKind::Toggle);
        let f = c.add_function(xor_function());
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, f, 0).unwrap();
        c.connect(b, 0, f, 1).unwrap();
        c.connect(f, 0, lamp, 0).unwrap();

        let mut sim = Simulation::new(c);
        sim.compile();
        for (la, lb) in [(false, false), (true, false), (true, true), (false, true)] {
            sim.set_button(a, la).unwrap();
            sim.set_button(b, lb).unwrap();
            assert!(sim.settle(16).converged);
            assert_eq!(sim.display(lamp), Some(vec![la ^ lb]), "a={la} b={lb}");
        }
    }

    /// Every top-level output level and display level, keyed by node.
    fn levels(sim: &Simulation) -> Vec<(NodeId, Vec<bool>)> {
        sim.circuit()
            .iter()
            .map(|(id, node)| {
                let mut v: Vec<bool> = (0..node.kind.output_count())
                    .filter_map(|i| sim.output(id, i))
                    .collect();
                v.extend(sim.display(id).unwrap_or_default());
                (id, v)
            })
            .collect()
    }

    #[test]
    fn test_xor_function_one_step_changes_only_its_output() {
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Toggle);
        let b = c.add_button(ButtonKind::Toggle);
        let f = c.add_function(xor_function());
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, f, 0).unwrap();
        c.connect(b, 0, f, 1).unwrap();
        c.connect(f, 0, lamp, 0).unwrap();
        // Unrelated logic that must hold still.
        let idle = c.add_button(ButtonKind::Toggle);
        let not = c.add_unary(UnaryKind::Not, 1).unwrap();
        let idle_lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(idle, 0, not, 0).unwrap();
        c.connect(not, 0, idle_lamp, 0).unwrap();

        let mut sim = Simulation::new(c);
        sim.compile();
        assert!(sim.settle(16).converged);
        assert_eq!(sim.output(f, 0), Some(false));

        sim.toggle(a).unwrap();
        let before = levels(&sim);
        sim.step();
        let after = levels(&sim);

        let changed: Vec<NodeId> = before
            .iter()
            .zip(&after)
            .filter(|(x, y)| x.1 != y.1)
            .map(|(x, _)| x.0)
            .collect();
        // The lamp reads the function's output byte directly.
        assert_eq!(changed, vec![f, lamp]);
        assert_eq!(sim.output(f, 0), Some(true));
        assert_eq!(sim.display(lamp), Some(vec![true]));
    }

    #[test]
    fn test_bus_bit_visible_on_sibling_after_one_step() {
        let mut c = Circuit::new();
        let driver = c.add_button(ButtonKind::Toggle);
        let left = c.add_bus("BUS_0", 3).unwrap();
        let right = c.add_bus("BUS_0", 3).unwrap();
        c.connect(driver, 0, left, 1).unwrap();

        let mut sim = Simulation::new(c);
        sim.compile();
        assert!(sim.settle(8).converged);
        assert_eq!(sim.output(right, 1), Some(false));

        sim.set_button(driver, true).unwrap();
        assert!(sim.step());
        assert_eq!(sim.output(right, 0), Some(false));
        assert_eq!(sim.output(right, 1), Some(true));
        assert_eq!(sim.output(right, 2), Some(false));
        assert_eq!(sim.output(left, 1), Some(true));
    }

    #[test]
    fn test_bus_width_three_or() {
        let mut c = Circuit::new();
        let buttons: Vec<NodeId> = (0..6).map(|_| c.add_button(ButtonKind::Toggle)).collect();
        let left = c.add_bus("BUS_0", 3).unwrap();
        let right = c.add_bus("BUS_0", 3).unwrap();
        let seg = c.add_unary(UnaryKind::Buffer, 3).unwrap();
        for i in 0..3u16 {
            c.connect(buttons[i as usize], 0, left, i).unwrap();
            c.connect(buttons[i as usize + 3], 0, right, i).unwrap();
            c.connect(right, i, seg, i).unwrap();
        }

        let mut sim = Simulation::new(c);
        sim.compile();
        // left = 101, right = 010 → every bit high.
        sim.set_button(buttons[0], true).unwrap();
        sim.set_button(buttons[2], true).unwrap();
        sim.set_button(buttons[4], true).unwrap();
        sim.settle(8);
        for i in 0..3 {
            assert_eq!(sim.output(left, i), Some(true));
            assert_eq!(sim.output(seg, i), Some(true));
        }

        sim.set_button(buttons[4], false).unwrap();
        sim.settle(8);
        assert_eq!(sim.output(right, 1), Some(false));
        assert_eq!(sim.output(right, 0), Some(true));
    }

    #[test]
    fn test_ring_never_settles() {
        let mut c = Circuit::new();
        let not = c.add_unary(UnaryKind::Not, 1).unwrap();
        c.connect(not, 0, not, 0).unwrap();
        let mut sim = Simulation::new(c);
        sim.compile();
        let report = sim.settle(10);
        assert!(!report.converged);
        assert_eq!(report.rounds, 10);
        assert_eq!(sim.rounds_to_settle(), None);
    }

    #[test]
    fn test_static_toggle_refused() {
        let mut c = Circuit::new();
        let s = c.add_button(ButtonKind::StaticToggle);
        c.set_button_state(s, true).unwrap();
        let mut sim = Simulation::new(c);
        sim.compile();
        assert!(matches!(sim.press(s), Err(CircuitError::WrongKind { .. })));
        assert!(matches!(sim.set_button(s, false), Err(CircuitError::WrongKind { .. })));
        assert_eq!(sim.output(s, 0), Some(true));
    }

    #[test]
    fn test_push_and_toggle_drivers() {
        let mut c = Circuit::new();
        let push = c.add_button(ButtonKind::Push);
        let latch = c.add_button(ButtonKind::Toggle);
        let mut sim = Simulation::new(c);
        sim.compile();

        sim.press(push).unwrap();
        assert_eq!(sim.output(push, 0), Some(true));
        sim.release(push).unwrap();
        assert_eq!(sim.output(push, 0), Some(false));

        sim.press(latch).unwrap();
        sim.release(latch).unwrap();
        assert_eq!(sim.output(latch, 0), Some(true));
        sim.press(latch).unwrap();
        assert_eq!(sim.output(latch, 0), Some(false));
    }

    #[test]
    fn test_recompile_carries_toggle_state() {
        let mut c = Circuit::new();
        let push = c.add_button(ButtonKind::Push);
        let latch = c.add_button(ButtonKind::Toggle);
        let mut sim = Simulation::new(c);
        sim.compile();
        sim.set_button(push, true).unwrap();
        sim.set_button(latch, true).unwrap();

        sim.circuit_mut().add_gate(GateKind::Or, 2).unwrap();
        sim.compile();
        assert_eq!(sim.output(latch, 0), Some(true));
        assert_eq!(sim.output(push, 0), Some(false));
    }

    #[test]
    fn test_rounds_to_settle_matches_delay() {
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Toggle);
        let n1 = c.add_unary(UnaryKind::Not, 1).unwrap();
        let n2 = c.add_unary(UnaryKind::Not, 1).unwrap();
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, n1, 0).unwrap();
        c.connect(n1, 0, n2, 0).unwrap();
        c.connect(n2, 0, lamp, 0).unwrap();

        let mut sim = Simulation::new(c);
        assert_eq!(sim.rounds_to_settle(), None);
        sim.compile();
        assert_eq!(sim.rounds_to_settle(), Some(2));
        sim.set_button(a, true).unwrap();
        for _ in 0..2 {
            sim.step();
        }
        assert_eq!(sim.display(lamp), Some(vec![true]));
        assert!(!sim.step());
    }

    #[test]
    fn test_rounds_to_settle_tracks_live_arena() {
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Toggle);
        let n1 = c.add_unary(UnaryKind::Not, 1).unwrap();
        c.connect(a, 0, n1, 0).unwrap();
        let mut sim = Simulation::new(c);
        sim.compile();
        assert_eq!(sim.rounds_to_settle(), Some(1));

        // Edits reach the answer only on the next compile.
        let n2 = sim.circuit_mut().add_unary(UnaryKind::Not, 1).unwrap();
        sim.circuit_mut().connect(n1, 0, n2, 0).unwrap();
        assert_eq!(sim.rounds_to_settle(), Some(1));
        sim.compile();
        assert_eq!(sim.rounds_to_settle(), Some(2));

        sim.circuit_mut().connect(n2, 0, n1, 0).unwrap();
        assert_eq!(sim.rounds_to_settle(), Some(2));
        sim.compile();
        assert_eq!(sim.rounds_to_settle(), None);
    }

    #[test]
    fn test_seven_segment_decoding() {
        let mut c = Circuit::new();
        let seg = c.add_display(DisplayKind::SevenSegment);
        let on = c.add_button(ButtonKind::Toggle);
        // Segments b and c: digit 1.
        c.connect(on, 0, seg, 1).unwrap();
        c.connect(on, 0, seg, 2).unwrap();
        let mut sim = Simulation::new(c);
        sim.compile();
        assert_eq!(sim.seven_segment_digit(seg), None);
        sim.set_button(on, true).unwrap();
        assert_eq!(sim.seven_segment_digit(seg), Some(1));

        assert_eq!(decode_seven_segment(&[true; 7]), Some(8));
        assert_eq!(decode_seven_segment(&[true; 3]), None);
    }
}
