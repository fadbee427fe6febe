//! Circuit → arena compiler.
//!
//! Compilation runs in two passes over each sibling list:
//!
//! 1. **Emit**: nodes are written in [`topological_order`](crate::analysis::topological_order).
//!    Each input cell temporarily holds a pending `(sibling position, output
//!    index)` pair, or [`UNCONNECTED`]. Function nodes recurse into their
//!    body, which is fully compiled (both passes) before the function header
//!    is backpatched.
//! 2. **Connect**: every pending cell is resolved to the absolute offset of
//!    the source output byte. Unconnected cells resolve to the root's
//!    always-false cell.
//!
//! Bus records with the same label in one sibling list share a single pair
//! of output arrays, appended to the first record of that label.

use alloc::collections::BTreeMap;
#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::arena::layout::{
    self, BusRecord, FunctionRecord, GateRecord, InputRecord, OutputRecord, RecordKind,
    RootRecord, UnaryRecord, FALSE_CELL, UNCONNECTED,
};
use crate::arena::{Arena, Offset};
use crate::circuit::{Circuit, CircuitNode, NodeId, NodeKind, PinRef};

/// Output of [`compile`].
#[derive(Clone, Debug)]
pub struct CompiledCircuit {
    /// The executable arena.
    pub arena: Arena,
    /// Record offset of every top-level node.
    pub offsets: BTreeMap<NodeId, Offset>,
    /// [`Circuit::delay`] at compile time, `-1` if cyclic.
    pub delay: i32,
}

impl CompiledCircuit {
    /// Record offset of a top-level node.
    pub fn offset(&self, id: NodeId) -> Option<Offset> {
        self.offsets.get(&id).copied()
    }
}

/// Compiles a top-level circuit into an arena with a `Root` record.
pub fn compile(circuit: &Circuit) -> CompiledCircuit {
    compile_with_root(circuit, RecordKind::Root)
}

/// Compiles a circuit as a standalone function body (`FunctionRoot` record).
///
/// The result runs exactly like [`compile`]'s; the tag only marks the arena
/// as a reusable body for tools that inspect it.
pub fn compile_function_body(circuit: &Circuit) -> CompiledCircuit {
    compile_with_root(circuit, RecordKind::FunctionRoot)
}

fn compile_with_root(circuit: &Circuit, tag: RecordKind) -> CompiledCircuit {
    let mut arena = Arena::new();
    let root = arena.alloc(RecordKind::Root.header_size());
    debug_assert_eq!(root, Offset::ROOT);

    let order = circuit.topological_order();
    let children_start = Offset::new(arena.len());
    let records = emit_children(&mut arena, circuit, &order, root);
    connect_children(&mut arena, children_start, order.len(), root);

    let header = RootRecord {
        tag: tag.tag(),
        false_cell: 0,
        child_count: child_count(order.len()),
        total_size: arena.len(),
        children_offset: children_start.get(),
    };
    arena.write(root, &header);
    debug_assert_eq!(Offset::new(FALSE_CELL), root.add(1));

    let offsets = order.iter().copied().zip(records).collect();
    let delay = circuit.delay();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "compile: {} nodes → {} bytes (delay {delay})",
        order.len(),
        arena.len()
    );

    CompiledCircuit {
        arena,
        offsets,
        delay,
    }
}

fn child_count(n: usize) -> u16 {
    assert!(
        n <= usize::from(crate::circuit::MAX_CONNECTORS),
        "too many nodes in one circuit ({n})"
    );
    n as u16
}

// --- Pass 1: emit ---

/// Shared bus storage of one sibling list, container-relative.
struct BusStorage {
    outputs: u32,
    new_outputs: u32,
}

/// Emits `order` as consecutive records and returns each record's offset.
fn emit_children(
    arena: &mut Arena,
    circuit: &Circuit,
    order: &[NodeId],
    container: Offset,
) -> Vec<Offset> {
    let positions: BTreeMap<NodeId, u16> = order
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i as u16))
        .collect();
    let mut buses: BTreeMap<String, BusStorage> = BTreeMap::new();

    let mut records = Vec::with_capacity(order.len());
    for &id in order {
        let Some(node) = circuit.node(id) else {
            continue;
        };
        let at = emit_node(arena, node, &positions, container, &mut buses);
        records.push(at);
    }
    records
}

fn emit_node(
    arena: &mut Arena,
    node: &CircuitNode,
    positions: &BTreeMap<NodeId, u16>,
    container: Offset,
    buses: &mut BTreeMap<String, BusStorage>,
) -> Offset {
    let kind = RecordKind::of(node.kind());
    let header = kind.header_size();

    match node.kind() {
        NodeKind::Gate { inputs, .. } => {
            let total = header + u32::from(*inputs) * 4;
            let at = arena.alloc(total);
            let level = u8::from(node.outputs()[0]);
            arena.write(
                at,
                &GateRecord {
                    tag: kind.tag(),
                    output: level,
                    new_output: level,
                    _pad0: 0,
                    total_size: total,
                    input_count: *inputs,
                    _pad1: 0,
                    inputs_offset: header,
                },
            );
            write_pending(arena, at.add(header), node.inputs(), positions);
            at
        }
        NodeKind::Unary { width, .. } => {
            let n = u32::from(*width);
            let outputs_offset = header + n * 4;
            let new_outputs_offset = outputs_offset + n;
            let total = layout::align4(new_outputs_offset + n);
            let at = arena.alloc(total);
            arena.write(
                at,
                &UnaryRecord {
                    tag: kind.tag(),
                    _pad0: 0,
                    input_output_count: *width,
                    total_size: total,
                    inputs_offset: header,
                    outputs_offset,
                    new_outputs_offset,
                },
            );
            write_pending(arena, at.add(header), node.inputs(), positions);
            write_levels(arena, at.add(outputs_offset), node.outputs());
            write_levels(arena, at.add(new_outputs_offset), node.outputs());
            at
        }
        NodeKind::Button(_) => {
            let count = node.outputs().len() as u16;
            let total = layout::align4(header + u32::from(count));
            let at = arena.alloc(total);
            arena.write(
                at,
                &InputRecord {
                    tag: kind.tag(),
                    _pad0: 0,
                    output_count: count,
                    total_size: total,
                    outputs_offset: header,
                },
            );
            write_levels(arena, at.add(header), node.outputs());
            at
        }
        NodeKind::Display(display) => {
            let count = display.input_count();
            let total = header + u32::from(count) * 4;
            let at = arena.alloc(total);
            arena.write(
                at,
                &OutputRecord {
                    tag: kind.tag(),
                    _pad0: 0,
                    input_count: count,
                    total_size: total,
                    inputs_offset: header,
                },
            );
            write_pending(arena, at.add(header), node.inputs(), positions);
            at
        }
        NodeKind::Function(body) => emit_function(arena, node, body, positions),
        NodeKind::Bus { label, width } => {
            let n = u32::from(*width);
            let inputs_size = n * 4;
            let first = !buses.contains_key(label);
            let total = if first {
                layout::align4(header + inputs_size + 2 * n)
            } else {
                header + inputs_size
            };
            let at = arena.alloc(total);
            let storage = buses.entry(label.clone()).or_insert_with(|| {
                let outputs = at.get() + header + inputs_size - container.get();
                BusStorage {
                    outputs,
                    new_outputs: outputs + n,
                }
            });
            arena.write(
                at,
                &BusRecord {
                    tag: kind.tag(),
                    is_first_node_in_bus: u8::from(first),
                    input_output_count: *width,
                    total_size: total,
                    shared_output_count: *width,
                    _pad0: 0,
                    inputs_offset: header,
                    shared_outputs_offset: storage.outputs,
                    shared_new_outputs_offset: storage.new_outputs,
                },
            );
            write_pending(arena, at.add(header), node.inputs(), positions);
            at
        }
    }
}

fn emit_function(
    arena: &mut Arena,
    node: &CircuitNode,
    body: &Circuit,
    positions: &BTreeMap<NodeId, u16>,
) -> Offset {
    let header = RecordKind::Function.header_size();
    let inputs = body.input_targets();
    let outputs = body.output_targets();
    let input_count = node.inputs().len() as u16;
    let output_count = node.outputs().len() as u16;

    let intargs_offset = header;
    let outtargs_offset = intargs_offset + inputs.len() as u32 * 4;
    let inputs_offset = outtargs_offset + outputs.len() as u32 * 4;
    let outputs_offset = inputs_offset + u32::from(input_count) * 4;
    let children_offset = layout::align4(outputs_offset + u32::from(output_count));

    let at = arena.alloc(children_offset);
    write_pending(arena, at.add(inputs_offset), node.inputs(), positions);
    write_levels(arena, at.add(outputs_offset), node.outputs());

    let order = body.topological_order();
    let children_start = at.add(children_offset);
    let records = emit_children(arena, body, &order, at);
    connect_children(arena, children_start, order.len(), at);

    let record_of: BTreeMap<NodeId, Offset> = order.iter().copied().zip(records).collect();
    for (table, targets) in [(intargs_offset, &inputs), (outtargs_offset, &outputs)] {
        for (i, id) in targets.iter().enumerate() {
            let target = record_of[id];
            arena.write_u32(at.add(table + i as u32 * 4), target.get());
        }
    }

    arena.write(
        at,
        &FunctionRecord {
            tag: RecordKind::Function.tag(),
            has_changed: 1,
            input_targ_node_count: child_count(inputs.len()),
            total_size: arena.len() - at.get(),
            output_targ_node_count: child_count(outputs.len()),
            input_count,
            output_count,
            child_count: child_count(order.len()),
            intargs_offset,
            outtargs_offset,
            inputs_offset,
            outputs_offset,
            children_offset,
        },
    );
    at
}

fn write_pending(
    arena: &mut Arena,
    start: Offset,
    inputs: &[Option<PinRef>],
    positions: &BTreeMap<NodeId, u16>,
) {
    for (i, input) in inputs.iter().enumerate() {
        let cell = match input.and_then(|pin| Some((positions.get(&pin.node)?, pin.index))) {
            Some((&position, index)) => layout::encode_pending(position, index),
            None => UNCONNECTED,
        };
        arena.write_u32(start.add(i as u32 * 4), cell);
    }
}

fn write_levels(arena: &mut Arena, start: Offset, levels: &[bool]) {
    for (i, &level) in levels.iter().enumerate() {
        arena.write_bool(start.add(i as u32), level);
    }
}

// --- Pass 2: connect ---

/// Resolves the pending input cells of `count` consecutive sibling records
/// starting at `first`.
fn connect_children(arena: &mut Arena, first: Offset, count: usize, container: Offset) {
    let mut child = first;
    for _ in 0..count {
        let (inputs_offset, input_count) = input_cells(arena, child);
        for i in 0..input_count {
            let cell = child.add(inputs_offset + i * 4);
            let pending = arena.read_u32(cell);
            let resolved = if pending == UNCONNECTED {
                FALSE_CELL
            } else {
                let (position, index) = layout::decode_pending(pending);
                let source = nth_sibling(arena, first, position);
                match arena.output_cell(source, index, container) {
                    Some(out) => out.get(),
                    None => panic!("binding to missing output {index} of record at {source}"),
                }
            };
            arena.write_u32(cell, resolved);
        }
        child = child.add(arena.record_size(child));
    }
}

fn nth_sibling(arena: &Arena, first: Offset, position: u16) -> Offset {
    let mut at = first;
    for _ in 0..position {
        at = at.add(arena.record_size(at));
    }
    at
}

/// Input cell array of a record: `(record-relative offset, count)`.
fn input_cells(arena: &Arena, record: Offset) -> (u32, u32) {
    match arena.kind(record) {
        k if k.is_gate() => {
            let h: GateRecord = arena.read(record);
            (h.inputs_offset, h.input_count.into())
        }
        k if k.is_unary() => {
            let h: UnaryRecord = arena.read(record);
            (h.inputs_offset, h.input_output_count.into())
        }
        k if k.is_output() => {
            let h: OutputRecord = arena.read(record);
            (h.inputs_offset, h.input_count.into())
        }
        RecordKind::Function => {
            let h: FunctionRecord = arena.read(record);
            (h.inputs_offset, h.input_count.into())
        }
        RecordKind::Bus => {
            let h: BusRecord = arena.read(record);
            (h.inputs_offset, h.input_output_count.into())
        }
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{ButtonKind, DisplayKind, GateKind, UnaryKind};

    #[test]
    fn test_empty_circuit() {
        let compiled = compile(&Circuit::new());
        let root: RootRecord = compiled.arena.read(Offset::ROOT);
        assert_eq!(root.child_count, 0);
        assert_eq!(root.total_size, 12);
        assert!(compiled.offsets.is_empty());
        compiled.arena.validate().unwrap();
    }

    #[test]
    fn test_unconnected_input_reads_false_cell() {
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Toggle);
        let and = c.add_gate(GateKind::And, 2).unwrap();
        c.connect(a, 0, and, 0).unwrap();

        let compiled = compile(&c);
        let gate = compiled.offset(and).unwrap();
        let h: GateRecord = compiled.arena.read(gate);
        let second = compiled.arena.read_u32(gate.add(h.inputs_offset + 4));
        assert_eq!(second, FALSE_CELL);
        assert!(!compiled.arena.read_bool(Offset::new(second)));

        let first = compiled.arena.read_u32(gate.add(h.inputs_offset));
        let button = compiled.offset(a).unwrap();
        assert_eq!(first, button.get() + 12);
    }

    #[test]
    fn test_function_record_layout() {
        let mut body = Circuit::new();
        let x = body.add_button(ButtonKind::Push);
        let y = body.add_button(ButtonKind::Push);
        let xor = body.add_gate(GateKind::Xor, 2).unwrap();
        let out = body.add_display(DisplayKind::LightBulb);
        body.set_position(x, 2.0).unwrap();
        body.set_position(y, 1.0).unwrap();
        body.connect(x, 0, xor, 0).unwrap();
        body.connect(y, 0, xor, 1).unwrap();
        body.connect(xor, 0, out, 0).unwrap();

        let mut c = Circuit::new();
        let f = c.add_function(body);
        let compiled = compile(&c);
        let arena = &compiled.arena;
        let at = compiled.offset(f).unwrap();
        let h: FunctionRecord = arena.read(at);

        assert_eq!(h.has_changed, 1);
        assert_eq!(h.input_targ_node_count, 2);
        assert_eq!(h.output_targ_node_count, 1);
        assert_eq!(h.input_count, 2);
        assert_eq!(h.output_count, 1);
        assert_eq!(h.child_count, 4);
        assert_eq!(h.total_size, arena.len() - at.get());

        // Children are laid out by ascending y (y, then x) while the input
        // targets follow descending y, so the first target is the second
        // 16-byte button record.
        let first_target = Offset::new(arena.read_u32(at.add(h.intargs_offset)));
        assert_eq!(arena.kind(first_target), RecordKind::PushButton);
        assert_eq!(first_target, at.add(h.children_offset + 16));
        let out_target = Offset::new(arena.read_u32(at.add(h.outtargs_offset)));
        assert_eq!(arena.kind(out_target), RecordKind::LightBulb);

        // Unconnected public inputs point at the false cell.
        assert_eq!(arena.read_u32(at.add(h.inputs_offset)), FALSE_CELL);
        arena.validate().unwrap();
    }

    #[test]
    fn test_bus_shares_storage() {
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Toggle);
        let first = c.add_bus("DATA", 3).unwrap();
        let second = c.add_bus("DATA", 3).unwrap();
        let other = c.add_bus("ADDR", 2).unwrap();
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, first, 1).unwrap();
        c.connect(second, 2, lamp, 0).unwrap();

        let compiled = compile(&c);
        let arena = &compiled.arena;
        let h1: BusRecord = arena.read(compiled.offset(first).unwrap());
        let h2: BusRecord = arena.read(compiled.offset(second).unwrap());
        let h3: BusRecord = arena.read(compiled.offset(other).unwrap());

        assert_eq!(h1.is_first_node_in_bus + h2.is_first_node_in_bus, 1);
        assert_eq!(h1.shared_outputs_offset, h2.shared_outputs_offset);
        assert_eq!(h1.shared_new_outputs_offset, h2.shared_new_outputs_offset);
        assert_ne!(h1.shared_outputs_offset, h3.shared_outputs_offset);
        assert_eq!(h3.is_first_node_in_bus, 1);

        let lamp_at = compiled.offset(lamp).unwrap();
        let cell = arena.read_u32(lamp_at.add(12));
        assert_eq!(cell, h1.shared_outputs_offset + 2);
        arena.validate().unwrap();
    }

    #[test]
    fn test_unary_layout() {
        let mut c = Circuit::new();
        let not = c.add_unary(UnaryKind::Not, 3).unwrap();
        let compiled = compile(&c);
        let at = compiled.offset(not).unwrap();
        let h: UnaryRecord = compiled.arena.read(at);
        assert_eq!(h.inputs_offset, 20);
        assert_eq!(h.outputs_offset, 32);
        assert_eq!(h.new_outputs_offset, 35);
        assert_eq!(h.total_size, 40);
    }

    #[test]
    fn test_function_body_root_tag() {
        let mut c = Circuit::new();
        c.add_button(ButtonKind::Push);
        let compiled = compile_function_body(&c);
        assert_eq!(compiled.arena.kind(Offset::ROOT), RecordKind::FunctionRoot);
        compiled.arena.validate().unwrap();
    }

    #[test]
    fn test_initial_levels_copied() {
        let mut c = Circuit::new();
        let t = c.add_button(ButtonKind::Toggle);
        c.set_button_state(t, true).unwrap();
        let compiled = compile(&c);
        let at = compiled.offset(t).unwrap();
        let cell = compiled.arena.output_cell(at, 0, Offset::ROOT).unwrap();
        assert!(compiled.arena.read_bool(cell));
    }
}
