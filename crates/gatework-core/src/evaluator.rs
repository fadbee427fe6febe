//! Two-phase evaluator over a compiled arena.
//!
//! One simulation step is a [`pretick`] followed by a [`tick`]:
//!
//! - **pretick** computes every node's next outputs from the currently
//!   committed outputs of its sources and stages them in the node's
//!   `new_output(s)` storage. It returns whether anything will change.
//! - **tick** commits the staged values.
//!
//! Because pretick only ever reads committed bytes, the result of a step does
//! not depend on record order: every node sees the values from the end of the
//! previous step.
//!
//! Function records skip their whole subtree while their `has_changed` flag
//! is clear. The `force` flag overrides this and is used for the first step
//! after compilation.
//!
//! Both passes walk the arena recursively (function nesting depth) and never
//! allocate.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::arena::layout::{
    BusRecord, FunctionRecord, GateRecord, InputRecord, OutputRecord, RecordKind, RootRecord,
    UnaryRecord, FUNCTION_HAS_CHANGED_FIELD, GATE_NEW_OUTPUT_FIELD, GATE_OUTPUT_FIELD,
};
use crate::arena::{Arena, Offset};

/// Level of input `index`, whose cell array starts at `inputs`.
///
/// Input cells hold absolute offsets of source output bytes (or the root's
/// false cell for unconnected inputs).
#[inline]
pub fn get_input_val(arena: &Arena, index: u32, inputs: Offset) -> bool {
    let source = arena.read_u32(inputs.add(index * 4));
    arena.read_bool(Offset::new(source))
}

/// Levels seen by every input of the display record at `at`, or `None` if
/// the record is not a display.
pub fn display_levels(arena: &Arena, at: Offset) -> Option<Vec<bool>> {
    if !arena.kind(at).is_output() {
        return None;
    }
    let h: OutputRecord = arena.read(at);
    let inputs = at.add(h.inputs_offset);
    Some(
        (0..u32::from(h.input_count))
            .map(|i| get_input_val(arena, i, inputs))
            .collect(),
    )
}

/// Computes and stages the next state of every record.
///
/// Returns `true` if any top-level record will change on the following
/// [`tick`]. With `force`, function records are evaluated regardless of
/// their `has_changed` flag.
pub fn pretick(arena: &mut Arena, force: bool) -> bool {
    let root: RootRecord = arena.read(Offset::ROOT);
    pretick_children(
        arena,
        Offset::ROOT,
        root.children_offset,
        root.child_count,
        force,
    )
}

/// Commits the values staged by the last [`pretick`].
pub fn tick(arena: &mut Arena, force: bool) {
    let root: RootRecord = arena.read(Offset::ROOT);
    tick_children(
        arena,
        Offset::ROOT,
        root.children_offset,
        root.child_count,
        force,
    );
}

/// Pretick of a single record inside `container`.
///
/// Returns whether the record's outputs will change on tick. Root records
/// always report a change; inputs and outputs never do.
pub fn pretick_record(arena: &mut Arena, at: Offset, container: Offset, force: bool) -> bool {
    match arena.kind(at) {
        RecordKind::Root | RecordKind::FunctionRoot => {
            let h: RootRecord = arena.read(at);
            pretick_children(arena, at, h.children_offset, h.child_count, force);
            true
        }
        k if k.is_gate() => pretick_gate(arena, at, k),
        k if k.is_unary() => pretick_unary(arena, at, k == RecordKind::Not),
        RecordKind::Function => pretick_function(arena, at, force),
        RecordKind::Bus => pretick_bus(arena, at, container),
        // Inputs are driven from outside, outputs have nothing to stage.
        _ => false,
    }
}

/// Tick of a single record inside `container`.
pub fn tick_record(arena: &mut Arena, at: Offset, container: Offset, force: bool) {
    match arena.kind(at) {
        RecordKind::Root | RecordKind::FunctionRoot => {
            let h: RootRecord = arena.read(at);
            tick_children(arena, at, h.children_offset, h.child_count, force);
        }
        k if k.is_gate() => {
            let staged = arena.read_bool(at.add(GATE_NEW_OUTPUT_FIELD));
            arena.write_bool(at.add(GATE_OUTPUT_FIELD), staged);
        }
        k if k.is_unary() => {
            let h: UnaryRecord = arena.read(at);
            for i in 0..u32::from(h.input_output_count) {
                let staged = arena.read_bool(at.add(h.new_outputs_offset + i));
                arena.write_bool(at.add(h.outputs_offset + i), staged);
            }
        }
        RecordKind::Function => tick_function(arena, at, force),
        RecordKind::Bus => {
            // Every record of the bus copies the same shared arrays, so the
            // commit is idempotent.
            let h: BusRecord = arena.read(at);
            let outputs = container.add(h.shared_outputs_offset);
            let staged = container.add(h.shared_new_outputs_offset);
            for i in 0..u32::from(h.shared_output_count) {
                let level = arena.read_bool(staged.add(i));
                arena.write_bool(outputs.add(i), level);
            }
        }
        _ => {}
    }
}

fn pretick_children(
    arena: &mut Arena,
    container: Offset,
    children_offset: u32,
    count: u16,
    force: bool,
) -> bool {
    let mut changed = false;
    let mut child = container.add(children_offset);
    for _ in 0..count {
        changed |= pretick_record(arena, child, container, force);
        child = child.add(arena.record_size(child));
    }
    changed
}

fn tick_children(
    arena: &mut Arena,
    container: Offset,
    children_offset: u32,
    count: u16,
    force: bool,
) {
    let mut child = container.add(children_offset);
    for _ in 0..count {
        tick_record(arena, child, container, force);
        child = child.add(arena.record_size(child));
    }
}

// --- Record kinds ---

fn pretick_gate(arena: &mut Arena, at: Offset, kind: RecordKind) -> bool {
    let h: GateRecord = arena.read(at);
    let inputs = at.add(h.inputs_offset);
    let mut levels = (0..u32::from(h.input_count)).map(|i| get_input_val(arena, i, inputs));

    let next = match kind {
        RecordKind::And => levels.all(|v| v),
        RecordKind::Or => levels.any(|v| v),
        RecordKind::Nand => !levels.all(|v| v),
        RecordKind::Nor => !levels.any(|v| v),
        RecordKind::Xor => levels.fold(false, |acc, v| acc ^ v),
        RecordKind::Xnor => levels.fold(true, |acc, v| acc ^ v),
        _ => unreachable!("not a gate: {kind:?}"),
    };

    arena.write_bool(at.add(GATE_NEW_OUTPUT_FIELD), next);
    next != (h.output != 0)
}

fn pretick_unary(arena: &mut Arena, at: Offset, invert: bool) -> bool {
    let h: UnaryRecord = arena.read(at);
    let inputs = at.add(h.inputs_offset);
    let mut changed = false;
    for i in 0..u32::from(h.input_output_count) {
        let next = get_input_val(arena, i, inputs) != invert;
        arena.write_bool(at.add(h.new_outputs_offset + i), next);
        changed |= next != arena.read_bool(at.add(h.outputs_offset + i));
    }
    changed
}

fn pretick_bus(arena: &mut Arena, at: Offset, container: Offset) -> bool {
    let h: BusRecord = arena.read(at);
    let width = u32::from(h.shared_output_count);
    let outputs = container.add(h.shared_outputs_offset);
    let staged = container.add(h.shared_new_outputs_offset);
    let inputs = at.add(h.inputs_offset);

    // The first record of a label precedes the others in layout, so it opens
    // the wired-OR accumulation for this step.
    if h.is_first_node_in_bus != 0 {
        for i in 0..width {
            arena.write_bool(staged.add(i), false);
        }
    }
    for i in 0..u32::from(h.input_output_count) {
        if get_input_val(arena, i, inputs) {
            arena.write_bool(staged.add(i), true);
        }
    }
    (0..width).any(|i| arena.read_bool(staged.add(i)) != arena.read_bool(outputs.add(i)))
}

fn pretick_function(arena: &mut Arena, at: Offset, force: bool) -> bool {
    let h: FunctionRecord = arena.read(at);
    let inputs = at.add(h.inputs_offset);

    // Public inputs drive the body's input targets directly.
    let mut inputs_changed = false;
    let mut index = 0;
    for t in 0..u32::from(h.input_targ_node_count) {
        let target = Offset::new(arena.read_u32(at.add(h.intargs_offset + t * 4)));
        let th: InputRecord = arena.read(target);
        for o in 0..u32::from(th.output_count) {
            let level = get_input_val(arena, index, inputs);
            let cell = target.add(th.outputs_offset + o);
            if arena.read_bool(cell) != level {
                arena.write_bool(cell, level);
                inputs_changed = true;
            }
            index += 1;
        }
    }
    debug_assert_eq!(index, u32::from(h.input_count));

    let flag = at.add(FUNCTION_HAS_CHANGED_FIELD);
    if h.has_changed != 0 || inputs_changed || force {
        let children_changed =
            pretick_children(arena, at, h.children_offset, h.child_count, force);
        arena.write_bool(flag, children_changed || inputs_changed);
    }
    arena.read_bool(flag)
}

fn tick_function(arena: &mut Arena, at: Offset, force: bool) {
    let h: FunctionRecord = arena.read(at);
    if h.has_changed == 0 && !force {
        return;
    }
    tick_children(arena, at, h.children_offset, h.child_count, force);

    // Public outputs mirror what the body's output targets now see.
    let mut index = 0;
    for t in 0..u32::from(h.output_targ_node_count) {
        let target = Offset::new(arena.read_u32(at.add(h.outtargs_offset + t * 4)));
        let th: OutputRecord = arena.read(target);
        for i in 0..u32::from(th.input_count) {
            let level = get_input_val(arena, i, target.add(th.inputs_offset));
            arena.write_bool(at.add(h.outputs_offset + index), level);
            index += 1;
        }
    }
    debug_assert_eq!(index, u32::from(h.output_count));
}
