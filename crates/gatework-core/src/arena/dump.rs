//! Record walking, structural validation and debug dumps.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};
use core::fmt::Write;

use super::layout::{
    BusRecord, FunctionRecord, GateRecord, InputRecord, OutputRecord, RecordKind, RootRecord,
    UnaryRecord,
};
use super::{Arena, ArenaError, Offset};

/// One record visited by [`Arena::records`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordInfo {
    /// Record offset.
    pub offset: Offset,
    /// Record kind.
    pub kind: RecordKind,
    /// Nesting depth: 0 for the root, 1 for its children, and so on.
    pub depth: u32,
    /// Enclosing container (the root for the root itself).
    pub container: Offset,
}

struct Level {
    next: Offset,
    remaining: u16,
    container: Offset,
    depth: u32,
}

/// Depth-first, layout-order iterator over every record in an arena.
pub struct Records<'a> {
    arena: &'a Arena,
    root_pending: bool,
    stack: Vec<Level>,
}

impl Iterator for Records<'_> {
    type Item = RecordInfo;

    fn next(&mut self) -> Option<RecordInfo> {
        if self.root_pending {
            self.root_pending = false;
            if self.arena.is_empty() {
                return None;
            }
            let root: RootRecord = self.arena.read(Offset::ROOT);
            self.stack.push(Level {
                next: Offset::ROOT.add(root.children_offset),
                remaining: root.child_count,
                container: Offset::ROOT,
                depth: 1,
            });
            return Some(RecordInfo {
                offset: Offset::ROOT,
                kind: self.arena.kind(Offset::ROOT),
                depth: 0,
                container: Offset::ROOT,
            });
        }

        loop {
            let level = self.stack.last_mut()?;
            if level.remaining == 0 {
                self.stack.pop();
                continue;
            }
            let at = level.next;
            level.remaining -= 1;
            level.next = at.add(self.arena.record_size(at));
            let depth = level.depth;
            let container = level.container;

            let kind = self.arena.kind(at);
            if kind == RecordKind::Function {
                let h: FunctionRecord = self.arena.read(at);
                self.stack.push(Level {
                    next: at.add(h.children_offset),
                    remaining: h.child_count,
                    container: at,
                    depth: depth + 1,
                });
            }
            return Some(RecordInfo {
                offset: at,
                kind,
                depth,
                container,
            });
        }
    }
}

impl Arena {
    /// Iterates over every record in layout order.
    ///
    /// Assumes a structurally valid arena (compiled, or loaded through
    /// [`Arena::load`]).
    pub fn records(&self) -> Records<'_> {
        Records {
            arena: self,
            root_pending: true,
            stack: Vec::new(),
        }
    }

    // --- Validation ---

    /// Checks that the arena is structurally sound.
    ///
    /// Verifies tags, record sizes and nesting, that every array fits inside
    /// its record, that every resolved input points inside the arena, and
    /// that function target tables name boundary records. Signal values are
    /// not checked.
    pub fn validate(&self) -> Result<(), ArenaError> {
        let len = self.len();
        let root: RootRecord = self.try_read(Offset::ROOT).ok_or(ArenaError::MissingRoot)?;
        match RecordKind::from_tag(root.tag) {
            Some(kind) if kind.is_root() => {}
            Some(_) => return Err(ArenaError::MissingRoot),
            None => {
                return Err(ArenaError::UnknownTag {
                    offset: 0,
                    tag: root.tag,
                });
            }
        }
        if root.total_size != len {
            return Err(ArenaError::MissingRoot);
        }
        self.check_children(Offset::ROOT, root.children_offset, root.child_count, len)
    }

    fn check_children(
        &self,
        container: Offset,
        children_offset: u32,
        count: u16,
        end: u32,
    ) -> Result<(), ArenaError> {
        let mut at = container.get().saturating_add(children_offset);
        for _ in 0..count {
            at += self.check_record(at, container, end)?;
        }
        if at != end {
            return Err(ArenaError::BadRecordSize {
                offset: container.get(),
                total_size: end - container.get(),
            });
        }
        Ok(())
    }

    fn check_record(&self, at: u32, container: Offset, limit: u32) -> Result<u32, ArenaError> {
        if at % 4 != 0 {
            return Err(ArenaError::Misaligned(at));
        }
        if at.saturating_add(8) > limit {
            return Err(ArenaError::Truncated {
                offset: at,
                end: at.saturating_add(8),
                limit,
            });
        }
        let tag = self.as_bytes()[at as usize];
        let kind = match RecordKind::from_tag(tag) {
            Some(kind) if !kind.is_root() => kind,
            _ => return Err(ArenaError::UnknownTag { offset: at, tag }),
        };
        let record = Offset(at);
        let size = self.record_size(record);
        if size < kind.header_size() || size % 4 != 0 {
            return Err(ArenaError::BadRecordSize {
                offset: at,
                total_size: size,
            });
        }
        let end = at.saturating_add(size);
        if end > limit {
            return Err(ArenaError::Truncated {
                offset: at,
                end,
                limit,
            });
        }

        match kind {
            k if k.is_gate() => {
                let h: GateRecord = self.read(record);
                self.check_cells(at, h.inputs_offset, h.input_count.into(), end)?;
            }
            k if k.is_unary() => {
                let h: UnaryRecord = self.read(record);
                let n = u32::from(h.input_output_count);
                self.check_cells(at, h.inputs_offset, n, end)?;
                check_span(at, h.outputs_offset, n, end)?;
                check_span(at, h.new_outputs_offset, n, end)?;
            }
            k if k.is_input() => {
                let h: InputRecord = self.read(record);
                check_span(at, h.outputs_offset, h.output_count.into(), end)?;
            }
            k if k.is_output() => {
                let h: OutputRecord = self.read(record);
                self.check_cells(at, h.inputs_offset, h.input_count.into(), end)?;
            }
            RecordKind::Function => {
                let h: FunctionRecord = self.read(record);
                self.check_cells(at, h.inputs_offset, h.input_count.into(), end)?;
                check_span(at, h.outputs_offset, h.output_count.into(), end)?;
                self.check_children(record, h.children_offset, h.child_count, end)?;
                let children = self.child_offsets(record, h.children_offset, h.child_count);
                let fed = self.check_targets(
                    at,
                    h.intargs_offset,
                    h.input_targ_node_count,
                    end,
                    &children,
                    true,
                )?;
                check_arity(at, h.input_count.into(), fed)?;
                let read = self.check_targets(
                    at,
                    h.outtargs_offset,
                    h.output_targ_node_count,
                    end,
                    &children,
                    false,
                )?;
                check_arity(at, h.output_count.into(), read)?;
            }
            RecordKind::Bus => {
                let h: BusRecord = self.read(record);
                self.check_cells(at, h.inputs_offset, h.input_output_count.into(), end)?;
                let width = u32::from(h.shared_output_count);
                check_arity(at, width, h.input_output_count.into())?;
                for shared in [h.shared_outputs_offset, h.shared_new_outputs_offset] {
                    let start = container.get().saturating_add(shared);
                    let reach = start.saturating_add(width);
                    if reach > self.len() {
                        return Err(ArenaError::Truncated {
                            offset: at,
                            end: reach,
                            limit: self.len(),
                        });
                    }
                }
            }
            _ => unreachable!("root records rejected above"),
        }
        Ok(size)
    }

    fn check_cells(&self, record: u32, offset: u32, count: u32, end: u32) -> Result<(), ArenaError> {
        let start = record.saturating_add(offset);
        if start % 4 != 0 {
            return Err(ArenaError::Misaligned(start));
        }
        check_span(record, offset, count.saturating_mul(4), end)?;
        for i in 0..count {
            let cell = start + i * 4;
            let target = self.read_u32(Offset(cell));
            if target >= self.len() {
                return Err(ArenaError::DanglingInput { cell, target });
            }
        }
        Ok(())
    }

    /// Offsets of a container's direct children. Only call after
    /// [`check_children`](Self::check_children) accepted them.
    fn child_offsets(&self, container: Offset, children_offset: u32, count: u16) -> Vec<u32> {
        let mut at = container.add(children_offset);
        (0..count)
            .map(|_| {
                let here = at;
                at = at.add(self.record_size(here));
                here.get()
            })
            .collect()
    }

    /// Checks a function's target table and returns the number of connectors
    /// the targets provide.
    fn check_targets(
        &self,
        function: u32,
        offset: u32,
        count: u16,
        end: u32,
        children: &[u32],
        inputs: bool,
    ) -> Result<u32, ArenaError> {
        let start = function.saturating_add(offset);
        if start % 4 != 0 {
            return Err(ArenaError::Misaligned(start));
        }
        check_span(function, offset, u32::from(count) * 4, end)?;
        let mut connectors = 0;
        for i in 0..u32::from(count) {
            let target = self.read_u32(Offset(start + i * 4));
            let bad = ArenaError::BadTarget { function, target };
            if children.binary_search(&target).is_err() {
                return Err(bad);
            }
            let kind = self.kind(Offset(target));
            connectors += if inputs && kind.is_input() {
                u32::from(self.read::<InputRecord>(Offset(target)).output_count)
            } else if !inputs && kind.is_output() {
                u32::from(self.read::<OutputRecord>(Offset(target)).input_count)
            } else {
                return Err(bad);
            };
        }
        Ok(connectors)
    }

    // --- Dump ---

    /// Human-readable listing of every record, one per line, indented by
    /// nesting depth.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_dump(&mut out);
        out
    }

    /// Writes the [`dump`](Self::dump) listing into `out`.
    pub fn write_dump(&self, out: &mut impl Write) -> core::fmt::Result {
        for info in self.records() {
            let at = info.offset;
            for _ in 0..info.depth {
                out.write_str("  ")?;
            }
            write!(out, "{at} {} size={}", info.kind.name(), self.record_size(at))?;
            match info.kind {
                RecordKind::Root | RecordKind::FunctionRoot => {
                    let h: RootRecord = self.read(at);
                    write!(out, " children={}", h.child_count)?;
                }
                k if k.is_gate() => {
                    let h: GateRecord = self.read(at);
                    write!(out, " out={} new={} in=", h.output, h.new_output)?;
                    self.write_cells(out, at.add(h.inputs_offset), h.input_count)?;
                }
                k if k.is_unary() => {
                    let h: UnaryRecord = self.read(at);
                    out.write_str(" out=")?;
                    self.write_levels(out, at.add(h.outputs_offset), h.input_output_count)?;
                    out.write_str(" in=")?;
                    self.write_cells(out, at.add(h.inputs_offset), h.input_output_count)?;
                }
                k if k.is_input() => {
                    let h: InputRecord = self.read(at);
                    out.write_str(" out=")?;
                    self.write_levels(out, at.add(h.outputs_offset), h.output_count)?;
                }
                k if k.is_output() => {
                    let h: OutputRecord = self.read(at);
                    out.write_str(" in=")?;
                    self.write_cells(out, at.add(h.inputs_offset), h.input_count)?;
                }
                RecordKind::Function => {
                    let h: FunctionRecord = self.read(at);
                    write!(out, " changed={} out=", h.has_changed)?;
                    self.write_levels(out, at.add(h.outputs_offset), h.output_count)?;
                    out.write_str(" in=")?;
                    self.write_cells(out, at.add(h.inputs_offset), h.input_count)?;
                    write!(out, " children={}", h.child_count)?;
                }
                RecordKind::Bus => {
                    let h: BusRecord = self.read(at);
                    write!(out, " first={} shared=", h.is_first_node_in_bus)?;
                    self.write_levels(
                        out,
                        info.container.add(h.shared_outputs_offset),
                        h.shared_output_count,
                    )?;
                    out.write_str(" in=")?;
                    self.write_cells(out, at.add(h.inputs_offset), h.input_output_count)?;
                }
                _ => {}
            }
            out.write_char('\n')?;
        }
        Ok(())
    }

    fn write_cells(&self, out: &mut impl Write, start: Offset, count: u16) -> core::fmt::Result {
        out.write_char('[')?;
        for i in 0..u32::from(count) {
            if i > 0 {
                out.write_char(',')?;
            }
            write!(out, "{}", Offset(self.read_u32(start.add(i * 4))))?;
        }
        out.write_char(']')
    }

    fn write_levels(&self, out: &mut impl Write, start: Offset, count: u16) -> core::fmt::Result {
        for i in 0..u32::from(count) {
            out.write_char(if self.read_bool(start.add(i)) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

fn check_arity(record: u32, expected: u32, found: u32) -> Result<(), ArenaError> {
    if expected != found {
        return Err(ArenaError::ArityMismatch {
            record,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_span(record: u32, offset: u32, bytes: u32, end: u32) -> Result<(), ArenaError> {
    let reach = record.saturating_add(offset).saturating_add(bytes);
    if reach > end {
        return Err(ArenaError::Truncated {
            offset: record,
            end: reach,
            limit: end,
        });
    }
    Ok(())
}
