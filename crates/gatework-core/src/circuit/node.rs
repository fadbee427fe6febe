//! Circuit node types for the edit-time graph.
//!
//! Each node in a [`Circuit`](super::Circuit) has a [`NodeId`] and a
//! [`NodeKind`] that determines its role: combinational gate, external input
//! source, display sink, nested function (subcircuit), or shared bus. The
//! `CircuitNode` struct bundles the kind with its connector state (input
//! bindings, output levels) and its vertical position on the canvas.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, vec, vec::Vec};

use super::Circuit;
use super::pin::PinRef;

/// Unique identifier for a node in a circuit.
///
/// Node IDs are assigned sequentially and never reused within a circuit
/// instance. They remain stable across mutations and recompilations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Multi-input gate function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateKind {
    /// True when every input is true.
    And,
    /// True when any input is true.
    Or,
    /// Complement of [`And`](Self::And).
    Nand,
    /// Complement of [`Or`](Self::Or).
    Nor,
    /// True when an odd number of inputs are true.
    Xor,
    /// True when an even number of inputs are true.
    Xnor,
}

/// Element-wise single-input gate function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryKind {
    /// `out[i] = in[i]`.
    Buffer,
    /// `out[i] = !in[i]`.
    Not,
}

/// Externally driven signal source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonKind {
    /// Momentary: true only while held.
    Push,
    /// Latching: flips on every click.
    Toggle,
    /// Constant source: level fixed at edit time, refused by runtime drivers.
    StaticToggle,
}

/// Signal sink with no outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayKind {
    /// Single-input lamp.
    LightBulb,
    /// Seven inputs, segments `a` through `g`.
    SevenSegment,
}

impl DisplayKind {
    /// Number of input connectors for this display.
    pub fn input_count(self) -> u16 {
        match self {
            Self::LightBulb => 1,
            Self::SevenSegment => 7,
        }
    }
}

/// The role of a node in the circuit.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Multi-input gate with a single output.
    Gate {
        /// Gate function.
        kind: GateKind,
        /// Number of input connectors (at least 2).
        inputs: u16,
    },
    /// Element-wise gate with `width` inputs and `width` outputs.
    Unary {
        /// Gate function.
        kind: UnaryKind,
        /// Number of input/output connector pairs.
        width: u16,
    },
    /// Externally driven source with one output.
    Button(ButtonKind),
    /// Sink with no outputs.
    Display(DisplayKind),
    /// Nested subcircuit. Its input buttons and displays become the public
    /// connectors of the node.
    Function(Box<Circuit>),
    /// Wired-OR line shared by every bus with the same label in one circuit.
    Bus {
        /// Label shared by all records of the bus.
        label: String,
        /// Number of bits carried.
        width: u16,
    },
}

impl NodeKind {
    /// Returns `true` for nodes that act as signal sources (buttons).
    ///
    /// Inside a function body these become the function's input targets.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Button(_))
    }

    /// Returns `true` for nodes that act as signal sinks (displays).
    ///
    /// Inside a function body these become the function's output targets.
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Display(_))
    }

    /// Short human-readable name used in logs and dumps.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gate { kind, .. } => match kind {
                GateKind::And => "AND",
                GateKind::Or => "OR",
                GateKind::Nand => "NAND",
                GateKind::Nor => "NOR",
                GateKind::Xor => "XOR",
                GateKind::Xnor => "XNOR",
            },
            Self::Unary { kind, .. } => match kind {
                UnaryKind::Buffer => "BUFFER",
                UnaryKind::Not => "NOT",
            },
            Self::Button(ButtonKind::Push) => "PushButton",
            Self::Button(ButtonKind::Toggle) => "ToggleButton",
            Self::Button(ButtonKind::StaticToggle) => "StaticToggleButton",
            Self::Display(DisplayKind::LightBulb) => "LightBulb",
            Self::Display(DisplayKind::SevenSegment) => "SevenSegmentDisplay",
            Self::Function(_) => "Function",
            Self::Bus { .. } => "Bus",
        }
    }

    /// Number of input connectors this kind exposes.
    pub fn input_count(&self) -> u16 {
        match self {
            Self::Gate { inputs, .. } => *inputs,
            Self::Unary { width, .. } | Self::Bus { width, .. } => *width,
            Self::Button(_) => 0,
            Self::Display(kind) => kind.input_count(),
            Self::Function(body) => body.public_input_count(),
        }
    }

    /// Number of output connectors this kind exposes.
    pub fn output_count(&self) -> u16 {
        match self {
            Self::Gate { .. } | Self::Button(_) => 1,
            Self::Unary { width, .. } | Self::Bus { width, .. } => *width,
            Self::Display(_) => 0,
            Self::Function(body) => body.public_output_count(),
        }
    }
}

/// A node together with its connector state.
#[derive(Clone, Debug)]
pub struct CircuitNode {
    pub(crate) kind: NodeKind,
    /// Source bound to each input connector, `None` when unconnected.
    pub(crate) inputs: Vec<Option<PinRef>>,
    /// Current level of each output connector. Buttons keep their pressed or
    /// toggled state here; other kinds use it as the initial level.
    pub(crate) outputs: Vec<bool>,
    /// Vertical canvas position, used for connector ordering.
    pub(crate) y: f32,
}

impl CircuitNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        let inputs = vec![None; kind.input_count() as usize];
        let outputs = vec![false; kind.output_count() as usize];
        Self {
            kind,
            inputs,
            outputs,
            y: 0.0,
        }
    }

    /// Returns the node's kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns the source bound to each input connector.
    pub fn inputs(&self) -> &[Option<PinRef>] {
        &self.inputs
    }

    /// Returns the current level of each output connector.
    pub fn outputs(&self) -> &[bool] {
        &self.outputs
    }

    /// Returns the vertical canvas position.
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Re-derives connector vectors after the kind's arity changed (e.g. a
    /// function body was edited). Existing bindings are kept where the index
    /// still exists.
    pub(crate) fn resync_arity(&mut self) {
        self.inputs.resize(self.kind.input_count() as usize, None);
        self.outputs
            .resize(self.kind.output_count() as usize, false);
    }
}
