//! Connector references for the edit-time graph.
//!
//! A `PinRef` names the output connector an input is bound to: "output
//! `index` of node `node`" within the same circuit. During compilation the
//! node is translated to its sibling position and the pair is later resolved
//! into an absolute arena offset.

use super::node::NodeId;

/// Reference to one output connector of a sibling node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinRef {
    /// Node that owns the output.
    pub node: NodeId,
    /// Output connector index on that node.
    pub index: u16,
}

impl PinRef {
    /// Creates a reference to output `index` of `node`.
    #[inline]
    pub fn new(node: NodeId, index: u16) -> Self {
        Self { node, index }
    }
}
