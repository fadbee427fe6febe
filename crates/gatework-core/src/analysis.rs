//! Static analysis of the edit-time graph: cycle detection, propagation delay,
//! and the linear node order baked into the arena.
//!
//! All walks are connector-precise: an output only depends on the inputs that
//! actually feed it (a NOT array maps `in[i]` to `out[i]`; a bus bit `i` is the
//! OR of bit `i` of every record sharing the label). Function nodes are
//! treated as opaque: every public output depends on every public input, and
//! crossing one costs `max(1, body.delay())` ticks.
//!
//! Walks use explicit stacks so deep gate chains cannot overflow the call
//! stack.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};
use alloc::collections::BTreeMap;

use crate::circuit::{Circuit, NodeId, NodeKind, PinRef};

/// Delay reported for circuits that contain a feedback loop.
pub const CYCLIC_DELAY: i32 = -1;

/// Memoized per-circuit analysis result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitSummary {
    /// Whether any output-bound path (or any nested function) loops.
    pub cyclic: bool,
    /// Ticks from boundary inputs to boundary outputs, or [`CYCLIC_DELAY`].
    pub delay: i32,
}

/// Computes the summary for a circuit. Use [`Circuit::is_cyclic`] and
/// [`Circuit::delay`] for the memoized values.
pub fn summarize(circuit: &Circuit) -> CircuitSummary {
    let nested_cyclic = circuit.iter().any(|(_, node)| match &node.kind {
        NodeKind::Function(body) => body.is_cyclic(),
        _ => false,
    });

    let mut walk = DepthWalk::new(circuit);
    let mut delay = 0;
    let mut cyclic = nested_cyclic;
    if !cyclic {
        'targets: for target in circuit.output_targets() {
            for pin in circuit.node(target).map(|n| n.inputs()).unwrap_or(&[]) {
                match pin.map(|p| walk.depth(p)) {
                    Some(None) => {
                        cyclic = true;
                        break 'targets;
                    }
                    Some(Some(d)) => delay = delay.max(d),
                    None => {}
                }
            }
        }
    }

    let summary = CircuitSummary {
        cyclic,
        delay: if cyclic { CYCLIC_DELAY } else { delay },
    };
    #[cfg(feature = "tracing")]
    tracing::debug!(
        "analysis: {} nodes, cyclic={}, delay={}",
        circuit.node_count(),
        summary.cyclic,
        summary.delay
    );
    summary
}

/// Longest path in ticks from the boundary inputs to this node's outputs (or,
/// for a display, to its inputs). Returns [`CYCLIC_DELAY`] if the node sits on
/// or behind a feedback loop.
///
/// For a chain `A → B`, `node_depth(B) == node_depth(A) + 1`.
pub fn node_depth(circuit: &Circuit, id: NodeId) -> i32 {
    let Some(node) = circuit.node(id) else {
        return 0;
    };
    let mut walk = DepthWalk::new(circuit);
    let mut best = 0;

    let result = if node.kind.is_output() {
        node.inputs
            .iter()
            .flatten()
            .try_for_each(|&pin| walk.depth(pin).map(|d| best = best.max(d)))
    } else {
        (0..node.outputs.len() as u16)
            .try_for_each(|i| walk.depth(PinRef::new(id, i)).map(|d| best = best.max(d)))
    };
    match result {
        Some(()) => best,
        None => CYCLIC_DELAY,
    }
}

/// Returns the arena layout order for a circuit's nodes.
///
/// Nodes are stably sorted by descending height (longest forward path to any
/// sink), so producers precede their consumers. Buttons are then moved to the
/// front in ascending vertical position and displays to the back in
/// descending vertical position. Ties keep insertion order.
pub fn topological_order(circuit: &Circuit) -> Vec<NodeId> {
    let heights = forward_heights(circuit);

    let mut middle: Vec<(NodeId, usize)> = Vec::new();
    let mut inputs: Vec<(NodeId, f32)> = Vec::new();
    let mut outputs: Vec<(NodeId, f32)> = Vec::new();
    for (id, node) in circuit.iter() {
        if node.kind.is_input() {
            inputs.push((id, node.y));
        } else if node.kind.is_output() {
            outputs.push((id, node.y));
        } else {
            middle.push((id, heights.get(&id).copied().unwrap_or(0)));
        }
    }

    middle.sort_by(|a, b| b.1.cmp(&a.1));
    inputs.sort_by(|a, b| a.1.total_cmp(&b.1));
    outputs.sort_by(|a, b| b.1.total_cmp(&a.1));

    inputs
        .into_iter()
        .map(|(id, _)| id)
        .chain(middle.into_iter().map(|(id, _)| id))
        .chain(outputs.into_iter().map(|(id, _)| id))
        .collect()
}

// --- Backward walk (depth / cycles) ---

#[derive(Clone, Copy)]
enum Mark {
    Visiting,
    Done(i32),
}

struct Frame {
    pin: PinRef,
    deps: Vec<Option<PinRef>>,
    next: usize,
    weight: i32,
    best: i32,
}

/// Memoizing backward walk from output connectors to their producers.
struct DepthWalk<'a> {
    circuit: &'a Circuit,
    buses: BTreeMap<&'a str, Vec<NodeId>>,
    marks: BTreeMap<(NodeId, u16), Mark>,
}

impl<'a> DepthWalk<'a> {
    fn new(circuit: &'a Circuit) -> Self {
        Self {
            circuit,
            buses: bus_groups(circuit),
            marks: BTreeMap::new(),
        }
    }

    /// Depth of an output connector, `None` on a cycle.
    fn depth(&mut self, root: PinRef) -> Option<i32> {
        if let Some(mark) = self.marks.get(&(root.node, root.index)) {
            return match mark {
                Mark::Visiting => None,
                Mark::Done(d) => Some(*d),
            };
        }

        self.marks.insert((root.node, root.index), Mark::Visiting);
        let mut stack = vec![self.frame(root)?];

        loop {
            let top = stack.len() - 1;
            let frame = &mut stack[top];
            if let Some(dep) = frame.deps.get(frame.next).copied() {
                frame.next += 1;
                let Some(src) = dep else { continue };
                if self.circuit.node(src.node).is_none() {
                    continue;
                }
                match self.marks.get(&(src.node, src.index)).copied() {
                    Some(Mark::Visiting) => return None,
                    Some(Mark::Done(d)) => frame.best = frame.best.max(d),
                    None => {
                        self.marks.insert((src.node, src.index), Mark::Visiting);
                        let child = self.frame(src)?;
                        stack.push(child);
                    }
                }
            } else {
                let done = stack.pop()?;
                let d = if done.weight == 0 {
                    0
                } else {
                    done.weight + done.best
                };
                self.marks.insert((done.pin.node, done.pin.index), Mark::Done(d));
                match stack.last_mut() {
                    Some(parent) => parent.best = parent.best.max(d),
                    None => return Some(d),
                }
            }
        }
    }

    /// Builds a frame for one output connector. `None` if the owner is a
    /// function whose body is cyclic.
    fn frame(&self, pin: PinRef) -> Option<Frame> {
        let node = self.circuit.node(pin.node)?;
        let i = pin.index as usize;
        let (weight, deps) = match &node.kind {
            NodeKind::Button(_) | NodeKind::Display(_) => (0, Vec::new()),
            NodeKind::Gate { .. } => (1, node.inputs.clone()),
            NodeKind::Unary { .. } => (1, vec![node.inputs.get(i).copied().flatten()]),
            NodeKind::Bus { label, .. } => {
                let deps = self
                    .buses
                    .get(label.as_str())
                    .map(|group| {
                        group
                            .iter()
                            .filter_map(|id| self.circuit.node(*id))
                            .map(|n| n.inputs.get(i).copied().flatten())
                            .collect()
                    })
                    .unwrap_or_default();
                (1, deps)
            }
            NodeKind::Function(body) => {
                if body.is_cyclic() {
                    return None;
                }
                (body.delay().max(1), node.inputs.clone())
            }
        };
        Some(Frame {
            pin,
            deps,
            next: 0,
            weight,
            best: 0,
        })
    }
}

fn bus_groups(circuit: &Circuit) -> BTreeMap<&str, Vec<NodeId>> {
    let mut groups: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();
    for (id, node) in circuit.iter() {
        if let NodeKind::Bus { label, .. } = &node.kind {
            groups.entry(label.as_str()).or_default().push(id);
        }
    }
    groups
}

// --- Forward walk (layout heights) ---

/// Longest forward path from each node to a sink. Back edges are ignored so
/// cyclic circuits still get a total order.
fn forward_heights(circuit: &Circuit) -> BTreeMap<NodeId, usize> {
    let groups = bus_groups(circuit);

    // Direct consumers of each node's outputs.
    let mut consumers: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for (id, node) in circuit.iter() {
        for pin in node.inputs.iter().flatten() {
            consumers.entry(pin.node).or_default().push(id);
        }
    }
    // A bus record also feeds everything that reads any record of its group.
    let successors = |id: NodeId| -> Vec<NodeId> {
        match circuit.node(id).map(|n| &n.kind) {
            Some(NodeKind::Bus { label, .. }) => groups
                .get(label.as_str())
                .into_iter()
                .flatten()
                .flat_map(|member| consumers.get(member).into_iter().flatten().copied())
                .filter(|&c| c != id)
                .collect(),
            _ => consumers.get(&id).cloned().unwrap_or_default(),
        }
    };

    let mut heights: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut on_stack: BTreeMap<NodeId, bool> = BTreeMap::new();

    for (start, _) in circuit.iter() {
        if heights.contains_key(&start) {
            continue;
        }
        // (node, successors, next index, best height so far)
        let mut stack: Vec<(NodeId, Vec<NodeId>, usize, usize)> =
            vec![(start, successors(start), 0, 0)];
        on_stack.insert(start, true);

        while let Some(top) = stack.last_mut() {
            if let Some(&succ) = top.1.get(top.2) {
                top.2 += 1;
                if let Some(&h) = heights.get(&succ) {
                    top.3 = top.3.max(h + 1);
                } else if !on_stack.get(&succ).copied().unwrap_or(false) {
                    on_stack.insert(succ, true);
                    let next = successors(succ);
                    stack.push((succ, next, 0, 0));
                }
            } else if let Some((id, _, _, best)) = stack.pop() {
                on_stack.insert(id, false);
                heights.insert(id, best);
                if let Some(parent) = stack.last_mut() {
                    parent.3 = parent.3.max(best + 1);
                }
            }
        }
    }
    heights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{ButtonKind, DisplayKind, GateKind, UnaryKind};

    /// a, b → AND → NOT → lamp
    fn chain() -> (Circuit, NodeId, NodeId, NodeId) {
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Toggle);
        let b = c.add_button(ButtonKind::Toggle);
        let and = c.add_gate(GateKind::And, 2).unwrap();
        let not = c.add_unary(UnaryKind::Not, 1).unwrap();
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, and, 0).unwrap();
        c.connect(b, 0, and, 1).unwrap();
        c.connect(and, 0, not, 0).unwrap();
        c.connect(not, 0, lamp, 0).unwrap();
        (c, and, not, lamp)
    }

    fn oscillator() -> Circuit {
        let mut c = Circuit::new();
        let not = c.add_unary(UnaryKind::Not, 1).unwrap();
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(not, 0, not, 0).unwrap();
        c.connect(not, 0, lamp, 0).unwrap();
        c
    }

    #[test]
    fn test_chain_delay() {
        let (c, and, not, lamp) = chain();
        assert!(!c.is_cyclic());
        assert_eq!(c.delay(), 2);
        assert_eq!(node_depth(&c, and), 1);
        assert_eq!(node_depth(&c, not), node_depth(&c, and) + 1);
        assert_eq!(node_depth(&c, lamp), 2);
    }

    #[test]
    fn test_self_loop_is_cyclic() {
        let c = oscillator();
        assert!(c.is_cyclic());
        assert_eq!(c.delay(), CYCLIC_DELAY);
    }

    #[test]
    fn test_unobserved_cycle_not_reported() {
        // The loop does not feed any display, so outputs still settle.
        let mut c = Circuit::new();
        let not = c.add_unary(UnaryKind::Not, 1).unwrap();
        c.connect(not, 0, not, 0).unwrap();
        let a = c.add_button(ButtonKind::Push);
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, lamp, 0).unwrap();
        assert!(!c.is_cyclic());
        assert_eq!(c.delay(), 0);
    }

    #[test]
    fn test_unary_channels_are_independent() {
        // out[0] → in[1] is not a loop on a 2-wide NOT array.
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Push);
        let not = c.add_unary(UnaryKind::Not, 2).unwrap();
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, not, 0).unwrap();
        c.connect(not, 0, not, 1).unwrap();
        c.connect(not, 1, lamp, 0).unwrap();
        assert!(!c.is_cyclic());
        assert_eq!(c.delay(), 2);
    }

    #[test]
    fn test_cycle_through_bus() {
        let mut c = Circuit::new();
        let b0 = c.add_bus("LOOP", 1).unwrap();
        let b1 = c.add_bus("LOOP", 1).unwrap();
        let not = c.add_unary(UnaryKind::Not, 1).unwrap();
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(b1, 0, not, 0).unwrap();
        c.connect(not, 0, b0, 0).unwrap();
        c.connect(b0, 0, lamp, 0).unwrap();
        assert!(c.is_cyclic());
    }

    #[test]
    fn test_nested_cycle_propagates_to_ancestors() {
        let inner = oscillator();
        let mut middle = Circuit::new();
        middle.add_function(inner);
        let mut outer = Circuit::new();
        outer.add_function(middle.clone());

        assert!(middle.is_cyclic());
        assert!(outer.is_cyclic());
        assert_eq!(outer.delay(), CYCLIC_DELAY);
    }

    #[test]
    fn test_function_adds_body_delay() {
        let (body, ..) = chain();
        let mut c = Circuit::new();
        let a = c.add_button(ButtonKind::Push);
        let f = c.add_function(body);
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(a, 0, f, 0).unwrap();
        c.connect(f, 0, lamp, 0).unwrap();
        assert_eq!(c.delay(), 2);
        assert_eq!(node_depth(&c, f), 2);
    }

    #[test]
    fn test_memo_invalidated_on_edit() {
        let (mut c, and, ..) = chain();
        assert!(!c.is_cyclic());
        c.connect(and, 0, and, 0).unwrap();
        assert!(c.is_cyclic());
    }

    #[test]
    fn test_topological_order_partitions() {
        let mut c = Circuit::new();
        let lamp_low = c.add_display(DisplayKind::LightBulb);
        let not = c.add_unary(UnaryKind::Not, 1).unwrap();
        let and = c.add_gate(GateKind::And, 2).unwrap();
        let b_high = c.add_button(ButtonKind::Push);
        let b_low = c.add_button(ButtonKind::Push);
        let lamp_high = c.add_display(DisplayKind::LightBulb);
        c.set_position(lamp_low, 1.0).unwrap();
        c.set_position(lamp_high, 9.0).unwrap();
        c.set_position(b_high, 9.0).unwrap();
        c.set_position(b_low, 1.0).unwrap();
        c.connect(b_high, 0, and, 0).unwrap();
        c.connect(b_low, 0, and, 1).unwrap();
        c.connect(and, 0, not, 0).unwrap();
        c.connect(not, 0, lamp_low, 0).unwrap();
        c.connect(and, 0, lamp_high, 0).unwrap();

        let order = topological_order(&c);
        assert_eq!(order, vec![b_low, b_high, and, not, lamp_high, lamp_low]);
    }

    #[test]
    fn test_topological_order_total_on_cycles() {
        let c = oscillator();
        let order = topological_order(&c);
        assert_eq!(order.len(), c.node_count());
    }
}
