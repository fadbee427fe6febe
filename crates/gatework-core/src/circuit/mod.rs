//! Edit-time circuit graph.
//!
//! [`Circuit`] is the mutable side of the engine: it owns nodes (gates,
//! buttons, displays, nested functions, buses) and the bindings between their
//! connectors. It is never executed directly. Instead it is linearized by the
//! [`analysis`](crate::analysis) pass and serialized by the
//! [`compiler`](crate::compiler) into an [`Arena`](crate::arena::Arena), which
//! the [`evaluator`](crate::evaluator) runs every tick.
//!
//! # Bindings
//!
//! Every input connector is either unconnected or bound to one output of a
//! sibling node ([`PinRef`]). Bindings never cross circuit boundaries: a
//! function node's body only talks to the outside through its boundary
//! proxies (input buttons and output displays).
//!
//! Cycles are legal. They compile and run, they just never settle.
//!
//! # Example
//!
//! ```rust
//! use gatework_core::circuit::{ButtonKind, Circuit, DisplayKind, GateKind};
//!
//! let mut circuit = Circuit::new();
//! let a = circuit.add_button(ButtonKind::Toggle);
//! let b = circuit.add_button(ButtonKind::Toggle);
//! let and = circuit.add_gate(GateKind::And, 2)?;
//! let lamp = circuit.add_display(DisplayKind::LightBulb);
//!
//! circuit.connect(a, 0, and, 0)?;
//! circuit.connect(b, 0, and, 1)?;
//! circuit.connect(and, 0, lamp, 0)?;
//! assert!(!circuit.is_cyclic());
//! # Ok::<(), gatework_core::circuit::CircuitError>(())
//! ```

pub mod node;
pub mod pin;

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, vec::Vec};
use core::cell::OnceCell;

use crate::analysis::{self, CircuitSummary};

pub use node::{ButtonKind, CircuitNode, DisplayKind, GateKind, NodeId, NodeKind, UnaryKind};
pub use pin::PinRef;

/// Errors that can occur while editing a circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitError {
    /// The specified node was not found in the circuit.
    NodeNotFound(NodeId),
    /// A connector index is outside the node's connector range.
    PinOutOfRange {
        /// Node owning the connector.
        node: NodeId,
        /// Requested connector index.
        index: u16,
        /// Number of connectors of that direction on the node.
        count: u16,
    },
    /// The node exists but is not of the kind the operation requires.
    WrongKind {
        /// Node that was addressed.
        node: NodeId,
        /// Kind the operation expected.
        expected: &'static str,
    },
    /// Gate arity or bus/unary width is outside the supported range.
    InvalidArity(u16),
    /// A bus with this label already exists with a different width.
    BusWidthMismatch {
        /// Shared bus label.
        label: String,
        /// Width of the existing bus.
        expected: u16,
        /// Width that was requested.
        found: u16,
    },
}

impl core::fmt::Display for CircuitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node {id} not found"),
            Self::PinOutOfRange { node, index, count } => {
                write!(f, "connector {index} out of range for {node} ({count} available)")
            }
            Self::WrongKind { node, expected } => write!(f, "{node} is not a {expected}"),
            Self::InvalidArity(n) => write!(f, "unsupported connector count {n}"),
            Self::BusWidthMismatch {
                label,
                expected,
                found,
            } => write!(
                f,
                "bus '{label}' has width {expected}, cannot add a record of width {found}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CircuitError {}

/// Upper bound on connectors per node; positions and indices are stored as
/// `u16` in the arena and `u16::MAX` is reserved.
pub const MAX_CONNECTORS: u16 = u16::MAX - 1;

/// Mutable graph of logic nodes.
///
/// # Usage
///
/// 1. Create a circuit with [`new()`](Self::new)
/// 2. Add nodes: [`add_gate()`](Self::add_gate), [`add_unary()`](Self::add_unary),
///    [`add_button()`](Self::add_button), [`add_display()`](Self::add_display),
///    [`add_function()`](Self::add_function), [`add_bus()`](Self::add_bus)
/// 3. Bind connectors: [`connect()`](Self::connect)
/// 4. Compile: [`compiler::compile()`](crate::compiler::compile)
#[derive(Clone, Debug, Default)]
pub struct Circuit {
    nodes: Vec<Option<CircuitNode>>,
    next_node_slot: u32,
    /// Memoized cycle/delay analysis, cleared by every mutation.
    summary: OnceCell<CircuitSummary>,
}

impl Circuit {
    /// Creates an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Node mutations ---

    /// Adds a multi-input gate with `inputs` input connectors (at least 2).
    pub fn add_gate(&mut self, kind: GateKind, inputs: u16) -> Result<NodeId, CircuitError> {
        if !(2..=MAX_CONNECTORS).contains(&inputs) {
            return Err(CircuitError::InvalidArity(inputs));
        }
        Ok(self.add_node(NodeKind::Gate { kind, inputs }))
    }

    /// Adds an element-wise BUFFER/NOT gate with `width` connector pairs.
    pub fn add_unary(&mut self, kind: UnaryKind, width: u16) -> Result<NodeId, CircuitError> {
        if !(1..=MAX_CONNECTORS).contains(&width) {
            return Err(CircuitError::InvalidArity(width));
        }
        Ok(self.add_node(NodeKind::Unary { kind, width }))
    }

    /// Adds a button (externally driven source).
    pub fn add_button(&mut self, kind: ButtonKind) -> NodeId {
        self.add_node(NodeKind::Button(kind))
    }

    /// Adds a display (sink).
    pub fn add_display(&mut self, kind: DisplayKind) -> NodeId {
        self.add_node(NodeKind::Display(kind))
    }

    /// Adds a function node wrapping `body`.
    ///
    /// The body's buttons become the node's public inputs and its displays
    /// the public outputs, both ordered by descending vertical position.
    pub fn add_function(&mut self, body: Circuit) -> NodeId {
        self.add_node(NodeKind::Function(Box::new(body)))
    }

    /// Adds a bus record. Every bus with the same `label` in this circuit
    /// shares one wired-OR line and must have the same `width`.
    pub fn add_bus(&mut self, label: impl Into<String>, width: u16) -> Result<NodeId, CircuitError> {
        let label = label.into();
        if !(1..=MAX_CONNECTORS).contains(&width) {
            return Err(CircuitError::InvalidArity(width));
        }
        if let Some(expected) = self.bus_width(&label)
            && expected != width
        {
            return Err(CircuitError::BusWidthMismatch {
                label,
                expected,
                found: width,
            });
        }
        Ok(self.add_node(NodeKind::Bus { label, width }))
    }

    /// Removes a node. Inputs that were bound to it become unconnected.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), CircuitError> {
        self.get_node(id)?;
        self.nodes[id.0 as usize] = None;
        for node in self.nodes.iter_mut().flatten() {
            for input in &mut node.inputs {
                if input.is_some_and(|pin| pin.node == id) {
                    *input = None;
                }
            }
        }
        self.invalidate();
        #[cfg(feature = "tracing")]
        tracing::debug!("circuit_remove: node {id}");
        Ok(())
    }

    /// Binds input `to_input` of `to` to output `from_output` of `from`.
    ///
    /// Replaces any existing binding of that input. Returns the previous
    /// binding, if there was one.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_output: u16,
        to: NodeId,
        to_input: u16,
    ) -> Result<Option<PinRef>, CircuitError> {
        let out_count = self.get_node(from)?.outputs.len() as u16;
        if from_output >= out_count {
            return Err(CircuitError::PinOutOfRange {
                node: from,
                index: from_output,
                count: out_count,
            });
        }
        let slot = self.input_slot_mut(to, to_input)?;
        let previous = slot.replace(PinRef::new(from, from_output));
        self.invalidate();
        #[cfg(feature = "tracing")]
        tracing::debug!("circuit_connect: {from}[{from_output}] → {to}[{to_input}]");
        Ok(previous)
    }

    /// Unbinds input `to_input` of `to`. Returns the removed binding.
    pub fn disconnect(&mut self, to: NodeId, to_input: u16) -> Result<Option<PinRef>, CircuitError> {
        let previous = self.input_slot_mut(to, to_input)?.take();
        self.invalidate();
        Ok(previous)
    }

    /// Sets a node's vertical canvas position.
    pub fn set_position(&mut self, id: NodeId, y: f32) -> Result<(), CircuitError> {
        self.get_node_mut(id)?.y = y;
        self.invalidate();
        Ok(())
    }

    /// Sets the level of a button.
    pub fn set_button_state(&mut self, id: NodeId, level: bool) -> Result<(), CircuitError> {
        let node = self.get_node_mut(id)?;
        if !node.kind.is_input() {
            return Err(CircuitError::WrongKind {
                node: id,
                expected: "button",
            });
        }
        node.outputs[0] = level;
        Ok(())
    }

    /// Edits a function node's body in place.
    ///
    /// After `edit` returns, the node's public connectors are re-derived from
    /// the body and sibling bindings to outputs that no longer exist are
    /// dropped.
    pub fn edit_function<R>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut Circuit) -> R,
    ) -> Result<R, CircuitError> {
        let node = self.get_node_mut(id)?;
        let NodeKind::Function(body) = &mut node.kind else {
            return Err(CircuitError::WrongKind {
                node: id,
                expected: "function",
            });
        };
        let result = edit(body);
        node.resync_arity();
        let out_count = node.outputs.len() as u16;

        for other in self.nodes.iter_mut().flatten() {
            for input in &mut other.inputs {
                if input.is_some_and(|pin| pin.node == id && pin.index >= out_count) {
                    *input = None;
                }
            }
        }
        self.invalidate();
        Ok(result)
    }

    // --- Queries ---

    /// Returns the node with the given ID.
    pub fn node(&self, id: NodeId) -> Option<&CircuitNode> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    /// Iterates over live nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &CircuitNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    /// Returns the number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns the number of input connectors on a node.
    pub fn input_count(&self, id: NodeId) -> Result<u16, CircuitError> {
        Ok(self.get_node(id)?.inputs.len() as u16)
    }

    /// Returns the number of output connectors on a node.
    pub fn output_count(&self, id: NodeId) -> Result<u16, CircuitError> {
        Ok(self.get_node(id)?.outputs.len() as u16)
    }

    /// Returns the level of a button.
    pub fn button_state(&self, id: NodeId) -> Result<bool, CircuitError> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Button(_) => Ok(node.outputs[0]),
            _ => Err(CircuitError::WrongKind {
                node: id,
                expected: "button",
            }),
        }
    }

    /// Boundary input proxies (buttons), ordered by descending vertical
    /// position, ties broken by insertion order.
    pub fn input_targets(&self) -> Vec<NodeId> {
        self.boundary_nodes(NodeKind::is_input)
    }

    /// Boundary output proxies (displays), ordered by descending vertical
    /// position, ties broken by insertion order.
    pub fn output_targets(&self) -> Vec<NodeId> {
        self.boundary_nodes(NodeKind::is_output)
    }

    /// Number of public inputs when this circuit is used as a function body.
    pub fn public_input_count(&self) -> u16 {
        self.iter()
            .filter(|(_, n)| n.kind.is_input())
            .map(|(_, n)| n.outputs.len() as u16)
            .sum()
    }

    /// Number of public outputs when this circuit is used as a function body.
    pub fn public_output_count(&self) -> u16 {
        self.iter()
            .filter(|(_, n)| n.kind.is_output())
            .map(|(_, n)| n.inputs.len() as u16)
            .sum()
    }

    /// Returns `true` if the circuit (or any nested function) contains a
    /// feedback loop. Memoized until the next mutation.
    pub fn is_cyclic(&self) -> bool {
        self.summary().cyclic
    }

    /// Longest propagation path in ticks from the boundary inputs to the
    /// boundary outputs, or `-1` if the circuit is cyclic. Memoized until the
    /// next mutation.
    pub fn delay(&self) -> i32 {
        self.summary().delay
    }

    /// Returns the node order used for arena layout.
    pub fn topological_order(&self) -> Vec<NodeId> {
        analysis::topological_order(self)
    }

    // --- Internal helpers ---

    fn summary(&self) -> &CircuitSummary {
        self.summary.get_or_init(|| analysis::summarize(self))
    }

    fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_node_slot);
        self.next_node_slot += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!("circuit_add: {} node {id}", kind.name());
        self.nodes.push(Some(CircuitNode::new(kind)));
        self.invalidate();
        id
    }

    fn invalidate(&mut self) {
        self.summary = OnceCell::new();
    }

    fn get_node(&self, id: NodeId) -> Result<&CircuitNode, CircuitError> {
        self.node(id).ok_or(CircuitError::NodeNotFound(id))
    }

    fn get_node_mut(&mut self, id: NodeId) -> Result<&mut CircuitNode, CircuitError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(|n| n.as_mut())
            .ok_or(CircuitError::NodeNotFound(id))
    }

    fn input_slot_mut(
        &mut self,
        id: NodeId,
        index: u16,
    ) -> Result<&mut Option<PinRef>, CircuitError> {
        let node = self.get_node_mut(id)?;
        let count = node.inputs.len() as u16;
        node.inputs
            .get_mut(index as usize)
            .ok_or(CircuitError::PinOutOfRange {
                node: id,
                index,
                count,
            })
    }

    fn bus_width(&self, label: &str) -> Option<u16> {
        self.iter().find_map(|(_, n)| match &n.kind {
            NodeKind::Bus { label: l, width } if l == label => Some(*width),
            _ => None,
        })
    }

    fn boundary_nodes(&self, pick: fn(&NodeKind) -> bool) -> Vec<NodeId> {
        let mut targets: Vec<(NodeId, f32)> = self
            .iter()
            .filter(|(_, n)| pick(&n.kind))
            .map(|(id, n)| (id, n.y))
            .collect();
        targets.sort_by(|a, b| b.1.total_cmp(&a.1));
        targets.into_iter().map(|(id, _)| id).collect()
    }
}
