//! Conditional dynamic subscription.
//!
//! A gate follows a wrapped node while a boolean predicate node is true and
//! freezes at the last adopted value while it is false. The subscription is
//! a real loud edge that the gate attaches and detaches itself — the one
//! place the graph changes shape as a consequence of values flowing through
//! it. Those edge flips are queued during evaluation and applied at end of
//! tick, so the order the scheduler computed stays valid; an edge flipped
//! this tick takes effect starting next tick.

use crate::arena::{Behavior, NodeData};
use crate::graph::Graph;
use crate::node::{AnyNode, Node, Value};

/// Handle to a gate. Reads like any node; the value is the wrapped node's
/// while open, frozen while closed.
pub struct Gate<T> {
    node: Node<T>,
}

impl<T> Clone for Gate<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Gate<T> {}

impl<T> Gate<T> {
    /// The general node handle for this gate.
    pub fn node(self) -> Node<T> {
        self.node
    }
}

impl<T> From<Gate<T>> for Node<T> {
    fn from(gate: Gate<T>) -> Self {
        gate.node
    }
}

impl<T> From<Gate<T>> for AnyNode {
    fn from(gate: Gate<T>) -> Self {
        gate.node.into()
    }
}

impl Graph {
    /// Create a gate over `wrapped`, controlled by the boolean `open` node.
    ///
    /// The gate inherits `wrapped`'s kind — gating an event node yields an
    /// event node whose pulses pass only while open — and starts from
    /// `wrapped`'s current committed value. If `open` is currently true the
    /// subscription edge is attached immediately; otherwise it is attached
    /// on the first tick that commits `open` as true.
    pub fn gate<T: Value>(
        &mut self,
        open: impl Into<Node<bool>>,
        wrapped: impl Into<Node<T>>,
    ) -> Gate<T> {
        let open = open.into().id;
        let wrapped = wrapped.into().id;
        let is_open = *self
            .arena
            .node(open)
            .committed
            .downcast_ref::<bool>()
            .expect("gate predicate holds a bool");

        let proto = self.arena.node(wrapped);
        let data = NodeData::like(
            proto,
            proto.committed.clone(),
            Behavior::Gate {
                open,
                wrapped,
                linked: is_open,
            },
        );
        let id = self.insert_node(data);
        self.arena.node_mut(open).loud.insert(id);
        if is_open {
            self.arena.node_mut(wrapped).loud.insert(id);
        }
        Gate { node: Node::new(id) }
    }
}
