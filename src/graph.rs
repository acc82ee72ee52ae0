//! The graph object: arena, dirty seed set, and external access.
//!
//! [`Graph`] is the explicit owner of everything the runtime mutates — node
//! storage, the set of nodes touched since the last tick, and the queue of
//! edge changes deferred to the end of the current tick. There is no hidden
//! process-wide state; collaborators hold a `Graph` and pass handles around.
//!
//! Evaluation-time reads go through [`EvalCx`], a read-only view over the
//! arena handed to user closures. It exposes pending values and nothing
//! else, so update code structurally cannot stage new values mid-tick.

use std::any::Any;
use std::fmt;

use crate::arena::{NodeArena, NodeData, NodeId, NodeLabel, NodeSet, Slot};
use crate::node::{Node, Value};
use crate::source::Settable;

/// An edge change requested during evaluation, applied at end of tick so the
/// order computed for the current tick stays valid.
pub(crate) enum EdgeOp {
    Attach { from: NodeId, to: NodeId },
    Detach { from: NodeId, to: NodeId },
}

/// A tick-driven reactive dataflow graph.
///
/// Nodes are created through the kind constructors ([`source`](Graph::source),
/// [`derived`](Graph::derived), [`gate`](Graph::gate), ...), wired by those
/// constructors into loud (triggering) and quiet (ordering-only) edges, and
/// advanced all at once by [`tick`](Graph::tick). Between ticks the graph may
/// grow — new nodes, new folds, re-driven sources — but never shrinks.
///
/// Single-threaded by design: a tick runs to completion before the caller
/// regains control, and handles are plain copies with no synchronization.
pub struct Graph {
    pub(crate) arena: NodeArena,
    /// Nodes staged since the last tick; the next tick's seeds.
    /// Insertion-ordered so evaluation order is reproducible.
    pub(crate) dirty: NodeSet,
    pub(crate) edge_ops: Vec<EdgeOp>,
    next_watch_key: u64,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            arena: NodeArena::new(),
            dirty: NodeSet::default(),
            edge_ops: Vec::new(),
            next_watch_key: 0,
        }
    }

    /// Read a node's committed value.
    ///
    /// Safe at any time, including from outside code while a tick has staged
    /// but not yet committed values: readers never observe pending state. A
    /// node untouched by recent ticks simply yields its last committed value.
    pub fn read<T: Value>(&self, node: impl Into<Node<T>>) -> T {
        let id = node.into().id;
        self.arena
            .node(id)
            .committed
            .downcast_ref::<T>()
            .expect("slot type is pinned by the typed handle")
            .clone()
    }

    /// Stage a value on a settable node for the next tick.
    ///
    /// The value lands in the node's pending slot and the node joins the next
    /// tick's seeds; nothing is visible to [`read`](Graph::read) until
    /// [`tick`](Graph::tick) commits. Staging twice before a tick keeps the
    /// latest value.
    pub fn set<T: Value>(&mut self, target: impl Settable<T>, value: T) {
        target.stage(self, value);
    }

    /// Attach a debug label to a node.
    ///
    /// Labelled nodes log `node=<name> value=<new>` at trace level whenever
    /// they commit a changed value. The `Debug` bound is paid only here;
    /// unlabelled nodes never format their values.
    pub fn label<T: Value + fmt::Debug>(&mut self, node: impl Into<Node<T>>, name: impl Into<String>) {
        self.arena.node_mut(node.into().id).label = Some(NodeLabel {
            name: name.into(),
            fmt: fmt_probe::<T>,
        });
    }

    pub(crate) fn stage_slot(&mut self, id: NodeId, value: Slot) {
        self.arena.node_mut(id).pending = value;
        self.dirty.insert(id);
    }

    pub(crate) fn insert_node(&mut self, data: NodeData) -> NodeId {
        self.arena.insert(data)
    }

    pub(crate) fn next_watch_key(&mut self) -> u64 {
        let key = self.next_watch_key;
        self.next_watch_key += 1;
        key
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

fn fmt_probe<T: fmt::Debug + 'static>(slot: &dyn Any) -> String {
    match slot.downcast_ref::<T>() {
        Some(value) => format!("{value:?}"),
        None => String::from("<mistyped slot>"),
    }
}

/// Read-only view of the graph during evaluation.
///
/// Handed to derived and fold closures; [`get`](EvalCx::get) returns the
/// *pending* value of a node — the value its producer computed earlier in
/// this same tick, or its committed value if nothing touched it. Reading a
/// node you did not declare as a dependency is allowed but won't wake you
/// when it changes; declare every input you want to react to.
pub struct EvalCx<'a> {
    pub(crate) arena: &'a NodeArena,
}

impl EvalCx<'_> {
    /// This tick's pending value of `node`.
    pub fn get<T: Value>(&self, node: impl Into<Node<T>>) -> T {
        let id = node.into().id;
        self.arena
            .node(id)
            .pending
            .downcast_ref::<T>()
            .expect("slot type is pinned by the typed handle")
            .clone()
    }
}
