//! Binary record layout of the compiled arena.
//!
//! Every record starts with a one-byte tag at offset 0 and its `total_size`
//! (`u32`) at offset 4. Bytes 1..4 hold per-kind small fields (signal levels,
//! flags, the primary connector count). The fixed header is followed by the
//! record's variable arrays and, for containers, its children.
//!
//! # Layout Guarantees
//!
//! All header types are `#[repr(C)]` with explicit padding so they have no
//! implicit padding bytes and a 4-byte alignment. They derive
//! `bytemuck::Pod` and `bytemuck::Zeroable` for safe reinterpretation of arena
//! bytes without unsafe code.
//!
//! Offsets stored in headers are relative to the start of the record, except
//! the bus `shared_*` offsets which are relative to the enclosing container
//! (root or function record). Resolved input cells hold absolute offsets.
//!
//! Multi-byte fields use host byte order; arenas are not portable across
//! endianness.

use bytemuck::{Pod, Zeroable};

use crate::circuit::{ButtonKind, DisplayKind, GateKind, NodeKind, UnaryKind};

/// Byte offset of `total_size` in every record.
pub const TOTAL_SIZE_FIELD: u32 = 4;

/// Byte offset of a binary gate's committed output.
pub const GATE_OUTPUT_FIELD: u32 = 1;

/// Byte offset of a binary gate's staged output.
pub const GATE_NEW_OUTPUT_FIELD: u32 = 2;

/// Byte offset of a function record's `has_changed` flag.
pub const FUNCTION_HAS_CHANGED_FIELD: u32 = 1;

/// Absolute offset of the always-false cell inside the root header.
///
/// Unconnected inputs resolve here. Nothing ever writes this byte.
pub const FALSE_CELL: u32 = 1;

/// Pending input encoding for "no source".
pub const UNCONNECTED: u32 = u32::MAX;

/// Record type tag stored in byte 0 of every record.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    /// Top-level container of a compiled circuit.
    Root = 1,
    /// Top-level container of a standalone function body.
    FunctionRoot = 2,
    /// Binary gate: AND.
    And = 3,
    /// Binary gate: OR.
    Or = 4,
    /// Binary gate: NAND.
    Nand = 5,
    /// Binary gate: NOR.
    Nor = 6,
    /// Binary gate: XOR.
    Xor = 7,
    /// Binary gate: XNOR.
    Xnor = 8,
    /// Unary gate: BUFFER.
    Buffer = 9,
    /// Unary gate: NOT.
    Not = 10,
    /// Input node: momentary button.
    PushButton = 11,
    /// Input node: latching button.
    ToggleButton = 12,
    /// Input node: constant source.
    StaticToggleButton = 13,
    /// Output node: lamp.
    LightBulb = 14,
    /// Output node: seven-segment display.
    SevenSegmentDisplay = 15,
    /// Nested subcircuit.
    Function = 16,
    /// Shared wired-OR bus.
    Bus = 17,
}

impl RecordKind {
    /// Decodes a tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::Root,
            2 => Self::FunctionRoot,
            3 => Self::And,
            4 => Self::Or,
            5 => Self::Nand,
            6 => Self::Nor,
            7 => Self::Xor,
            8 => Self::Xnor,
            9 => Self::Buffer,
            10 => Self::Not,
            11 => Self::PushButton,
            12 => Self::ToggleButton,
            13 => Self::StaticToggleButton,
            14 => Self::LightBulb,
            15 => Self::SevenSegmentDisplay,
            16 => Self::Function,
            17 => Self::Bus,
            _ => return None,
        })
    }

    /// Returns the tag byte.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Maps an edit-time node kind to its record kind.
    pub fn of(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Gate { kind, .. } => match kind {
                GateKind::And => Self::And,
                GateKind::Or => Self::Or,
                GateKind::Nand => Self::Nand,
                GateKind::Nor => Self::Nor,
                GateKind::Xor => Self::Xor,
                GateKind::Xnor => Self::Xnor,
            },
            NodeKind::Unary { kind, .. } => match kind {
                UnaryKind::Buffer => Self::Buffer,
                UnaryKind::Not => Self::Not,
            },
            NodeKind::Button(ButtonKind::Push) => Self::PushButton,
            NodeKind::Button(ButtonKind::Toggle) => Self::ToggleButton,
            NodeKind::Button(ButtonKind::StaticToggle) => Self::StaticToggleButton,
            NodeKind::Display(DisplayKind::LightBulb) => Self::LightBulb,
            NodeKind::Display(DisplayKind::SevenSegment) => Self::SevenSegmentDisplay,
            NodeKind::Function(_) => Self::Function,
            NodeKind::Bus { .. } => Self::Bus,
        }
    }

    /// Binary gate records.
    pub fn is_gate(self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Nand | Self::Nor | Self::Xor | Self::Xnor
        )
    }

    /// Unary gate records.
    pub fn is_unary(self) -> bool {
        matches!(self, Self::Buffer | Self::Not)
    }

    /// Input (button) records.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            Self::PushButton | Self::ToggleButton | Self::StaticToggleButton
        )
    }

    /// Output (display) records.
    pub fn is_output(self) -> bool {
        matches!(self, Self::LightBulb | Self::SevenSegmentDisplay)
    }

    /// Root or function-root records.
    pub fn is_root(self) -> bool {
        matches!(self, Self::Root | Self::FunctionRoot)
    }

    /// Size of the fixed header for this kind.
    pub fn header_size(self) -> u32 {
        let size = match self {
            Self::Root | Self::FunctionRoot => core::mem::size_of::<RootRecord>(),
            Self::And | Self::Or | Self::Nand | Self::Nor | Self::Xor | Self::Xnor => {
                core::mem::size_of::<GateRecord>()
            }
            Self::Buffer | Self::Not => core::mem::size_of::<UnaryRecord>(),
            Self::PushButton | Self::ToggleButton | Self::StaticToggleButton => {
                core::mem::size_of::<InputRecord>()
            }
            Self::LightBulb | Self::SevenSegmentDisplay => core::mem::size_of::<OutputRecord>(),
            Self::Function => core::mem::size_of::<FunctionRecord>(),
            Self::Bus => core::mem::size_of::<BusRecord>(),
        };
        size as u32
    }

    /// Display name matching the edit-time node names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::FunctionRoot => "FunctionRoot",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
            Self::Xnor => "XNOR",
            Self::Buffer => "BUFFER",
            Self::Not => "NOT",
            Self::PushButton => "PushButton",
            Self::ToggleButton => "ToggleButton",
            Self::StaticToggleButton => "StaticToggleButton",
            Self::LightBulb => "LightBulb",
            Self::SevenSegmentDisplay => "SevenSegmentDisplay",
            Self::Function => "Function",
            Self::Bus => "Bus",
        }
    }
}

/// Root / function-root header (12 bytes), followed by children.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RootRecord {
    /// [`RecordKind::Root`] or [`RecordKind::FunctionRoot`].
    pub tag: u8,
    /// Always-false cell, see [`FALSE_CELL`].
    pub false_cell: u8,
    /// Number of direct children.
    pub child_count: u16,
    /// Size of the whole arena.
    pub total_size: u32,
    /// Offset of the first child.
    pub children_offset: u32,
}

const _: () = assert!(core::mem::size_of::<RootRecord>() == 12);

/// Binary gate header (16 bytes), followed by `input_count` input cells.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct GateRecord {
    /// Gate tag.
    pub tag: u8,
    /// Committed output level.
    pub output: u8,
    /// Staged output level, written by pretick.
    pub new_output: u8,
    /// Padding.
    pub _pad0: u8,
    /// Record size in bytes.
    pub total_size: u32,
    /// Number of input cells.
    pub input_count: u16,
    /// Padding.
    pub _pad1: u16,
    /// Offset of the input cells.
    pub inputs_offset: u32,
}

const _: () = assert!(core::mem::size_of::<GateRecord>() == 16);

/// Unary gate header (20 bytes), followed by input cells, then the output
/// and staged output byte arrays.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct UnaryRecord {
    /// Gate tag.
    pub tag: u8,
    /// Padding.
    pub _pad0: u8,
    /// Number of input/output pairs.
    pub input_output_count: u16,
    /// Record size in bytes.
    pub total_size: u32,
    /// Offset of the input cells.
    pub inputs_offset: u32,
    /// Offset of the committed output bytes.
    pub outputs_offset: u32,
    /// Offset of the staged output bytes.
    pub new_outputs_offset: u32,
}

const _: () = assert!(core::mem::size_of::<UnaryRecord>() == 20);

/// Input node header (12 bytes), followed by the output bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct InputRecord {
    /// Button tag.
    pub tag: u8,
    /// Padding.
    pub _pad0: u8,
    /// Number of output bytes.
    pub output_count: u16,
    /// Record size in bytes.
    pub total_size: u32,
    /// Offset of the output bytes.
    pub outputs_offset: u32,
}

const _: () = assert!(core::mem::size_of::<InputRecord>() == 12);

/// Output node header (12 bytes), followed by the input cells.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct OutputRecord {
    /// Display tag.
    pub tag: u8,
    /// Padding.
    pub _pad0: u8,
    /// Number of input cells.
    pub input_count: u16,
    /// Record size in bytes.
    pub total_size: u32,
    /// Offset of the input cells.
    pub inputs_offset: u32,
}

const _: () = assert!(core::mem::size_of::<OutputRecord>() == 12);

/// Function node header (36 bytes).
///
/// Followed by the input-target and output-target tables (absolute child
/// record offsets), the public input cells, the public output bytes, and the
/// children.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FunctionRecord {
    /// [`RecordKind::Function`].
    pub tag: u8,
    /// Non-zero when the subtree must be re-evaluated next step.
    pub has_changed: u8,
    /// Number of input-target children.
    pub input_targ_node_count: u16,
    /// Record size in bytes, children included.
    pub total_size: u32,
    /// Number of output-target children.
    pub output_targ_node_count: u16,
    /// Number of public input cells.
    pub input_count: u16,
    /// Number of public output bytes.
    pub output_count: u16,
    /// Number of direct children.
    pub child_count: u16,
    /// Offset of the input-target table.
    pub intargs_offset: u32,
    /// Offset of the output-target table.
    pub outtargs_offset: u32,
    /// Offset of the public input cells.
    pub inputs_offset: u32,
    /// Offset of the public output bytes.
    pub outputs_offset: u32,
    /// Offset of the first child.
    pub children_offset: u32,
}

const _: () = assert!(core::mem::size_of::<FunctionRecord>() == 36);

/// Bus header (24 bytes), followed by the input cells and, for the first
/// record of a label, the shared output and staged output arrays.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BusRecord {
    /// [`RecordKind::Bus`].
    pub tag: u8,
    /// Non-zero on the record that owns the shared storage.
    pub is_first_node_in_bus: u8,
    /// Number of input cells.
    pub input_output_count: u16,
    /// Record size in bytes.
    pub total_size: u32,
    /// Width of the shared arrays.
    pub shared_output_count: u16,
    /// Padding.
    pub _pad0: u16,
    /// Offset of the input cells (record-relative).
    pub inputs_offset: u32,
    /// Offset of the shared output bytes (container-relative).
    pub shared_outputs_offset: u32,
    /// Offset of the shared staged bytes (container-relative).
    pub shared_new_outputs_offset: u32,
}

const _: () = assert!(core::mem::size_of::<BusRecord>() == 24);

/// Rounds `n` up to the arena alignment.
#[inline]
pub const fn align4(n: u32) -> u32 {
    (n + 3) & !3
}

/// Packs a pending `(sibling position, output index)` pair into an input cell.
#[inline]
pub fn encode_pending(position: u16, index: u16) -> u32 {
    debug_assert!(position != u16::MAX || index != u16::MAX);
    u32::from(position) | (u32::from(index) << 16)
}

/// Unpacks a pending input cell.
#[inline]
pub fn decode_pending(cell: u32) -> (u16, u16) {
    ((cell & 0xFFFF) as u16, (cell >> 16) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for tag in 1..=17u8 {
            let kind = RecordKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(RecordKind::from_tag(0), None);
        assert_eq!(RecordKind::from_tag(18), None);
    }

    #[test]
    fn test_header_sizes_are_aligned() {
        for tag in 1..=17u8 {
            let kind = RecordKind::from_tag(tag).unwrap();
            assert_eq!(kind.header_size() % 4, 0, "{} header misaligned", kind.name());
        }
    }

    #[test]
    fn test_pending_encoding() {
        let cell = encode_pending(12, 3);
        assert_eq!(decode_pending(cell), (12, 3));
        assert_ne!(cell, UNCONNECTED);
    }

    #[test]
    fn test_align4() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(13), 16);
        assert_eq!(align4(16), 16);
    }
}
