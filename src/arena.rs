//! Arena storage for node state.
//!
//! All nodes live in one slab owned by [`Graph`](crate::Graph); a [`NodeId`]
//! is a slab index. Nodes are never removed — the graph may grow between
//! ticks but is never pruned, so ids stay valid for the life of the graph
//! and indexing never has to account for vacancies.
//!
//! Each node carries two value slots: `committed` is what readers see
//! between ticks, `pending` is what this tick is computing. Evaluation reads
//! neighbours' pending slots; `read()` only ever touches committed ones.
//! That separation is what keeps fan-out graphs free of read-after-write
//! hazards.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;
use slab::Slab;

use crate::graph::{EvalCx, Graph};
use crate::hash::GraphHashBuilder;
use crate::node::Value;

/// Index of a node in the arena. Identity, not value: two ids are the same
/// node exactly when they are equal.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Set of node ids with deterministic iteration order.
pub(crate) type NodeSet = IndexSet<NodeId, GraphHashBuilder>;

/// A type-erased value slot.
pub(crate) type Slot = Rc<dyn Any>;

/// Recompute a derived node's pending value from its dependencies' pendings.
pub(crate) type EvalFn = Rc<dyn Fn(&EvalCx<'_>) -> Slot>;

/// One registered fold: threads the accumulator through if its trigger pulsed.
pub(crate) type FoldFn = Rc<dyn Fn(Slot, &EvalCx<'_>) -> Slot>;

/// Reverse setter of a writable derived value.
pub(crate) type SetFn = Rc<dyn Fn(&mut Graph, &dyn Any)>;

/// Watcher callback, invoked with the freshly committed value.
pub(crate) type WatchFn = dyn FnMut(&dyn Any);

/// Extra state carried by event nodes.
///
/// Event nodes store `Option<T>`; the sentinel is the `None` the node was
/// born with, cloned back in whenever a pulse expires. `is_pulsed` is a
/// monomorphized probe captured at construction, the only place the payload
/// type is statically known.
#[derive(Clone)]
pub(crate) struct EventState {
    pub(crate) sentinel: Slot,
    pub(crate) is_pulsed: fn(&dyn Any) -> bool,
}

/// Debug label plus a formatter probe for trace logging.
#[derive(Clone)]
pub(crate) struct NodeLabel {
    pub(crate) name: String,
    pub(crate) fmt: fn(&dyn Any) -> String,
}

/// A registered watcher. The key is only used to unregister it.
pub(crate) struct Watcher {
    pub(crate) key: u64,
    pub(crate) callback: Rc<RefCell<WatchFn>>,
}

/// What a node does when the scheduler evaluates it.
pub(crate) enum Behavior {
    /// Settable root; when driven, mirrors the driver's pending value.
    Source { driver: Option<NodeId> },
    /// Pure recomputation from dependency pendings; `setter` is present on
    /// the writable variant only.
    Derived {
        eval: EvalFn,
        setter: Option<SetFn>,
    },
    /// Conditional subscription to `wrapped`, controlled by `open`.
    /// `linked` tracks whether the wrapped→gate edge currently exists.
    Gate {
        open: NodeId,
        wrapped: NodeId,
        linked: bool,
    },
    /// Stateful fold over event pulses, in registration order.
    Reducer { folds: Vec<FoldFn> },
    /// Snapshot of `of`'s committed value whenever `on` pulses.
    Sample { of: NodeId, on: NodeId },
}

pub(crate) struct NodeData {
    pub(crate) committed: Slot,
    pub(crate) pending: Slot,
    /// Compares two slots of this node's value type; drives changed-commit
    /// detection for watchers.
    pub(crate) value_eq: fn(&dyn Any, &dyn Any) -> bool,
    /// `Some` iff this is an event node.
    pub(crate) event: Option<EventState>,
    pub(crate) label: Option<NodeLabel>,
    /// Successors whose recomputation this node triggers.
    pub(crate) loud: NodeSet,
    /// Successors ordered after this node but not triggered by it.
    pub(crate) quiet: NodeSet,
    pub(crate) watchers: Vec<Watcher>,
    pub(crate) behavior: Behavior,
}

impl NodeData {
    fn with_slot(
        slot: Slot,
        value_eq: fn(&dyn Any, &dyn Any) -> bool,
        event: Option<EventState>,
        behavior: Behavior,
    ) -> Self {
        Self {
            committed: slot.clone(),
            pending: slot,
            value_eq,
            event,
            label: None,
            loud: NodeSet::default(),
            quiet: NodeSet::default(),
            watchers: Vec::new(),
            behavior,
        }
    }

    /// A continuous node holding `initial`.
    pub(crate) fn continuous<T: Value>(initial: T, behavior: Behavior) -> Self {
        Self::with_slot(Rc::new(initial), eq_probe::<T>, None, behavior)
    }

    /// A continuous node of type `T` whose initial slot was computed elsewhere.
    pub(crate) fn continuous_slot<T: Value>(slot: Slot, behavior: Behavior) -> Self {
        Self::with_slot(slot, eq_probe::<T>, None, behavior)
    }

    /// An event node carrying `Option<T>` pulses, born holding the sentinel.
    pub(crate) fn event<T: Value>(behavior: Behavior) -> Self {
        let sentinel: Slot = Rc::new(None::<T>);
        let event = EventState {
            sentinel: sentinel.clone(),
            is_pulsed: pulse_probe::<T>,
        };
        Self::with_slot(sentinel, eq_probe::<Option<T>>, Some(event), behavior)
    }

    /// A node inheriting another node's value type and event-ness, starting
    /// from `slot`. Used by gates, which adopt whatever they wrap.
    pub(crate) fn like(proto: &NodeData, slot: Slot, behavior: Behavior) -> Self {
        Self::with_slot(slot, proto.value_eq, proto.event.clone(), behavior)
    }
}

fn eq_probe<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn pulse_probe<T: 'static>(slot: &dyn Any) -> bool {
    slot.downcast_ref::<Option<T>>()
        .is_some_and(|pulse| pulse.is_some())
}

/// The slab of all nodes. Insert-only; see module docs.
pub(crate) struct NodeArena {
    nodes: Slab<NodeData>,
}

impl NodeArena {
    pub(crate) fn new() -> Self {
        Self { nodes: Slab::new() }
    }

    pub(crate) fn insert(&mut self, data: NodeData) -> NodeId {
        NodeId(self.nodes.insert(data) as u32)
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    /// Did `id`'s pending slot carry a pulse? Always false for continuous nodes.
    pub(crate) fn pulsed_pending(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.event
            .as_ref()
            .is_some_and(|ev| (ev.is_pulsed)(&*node.pending))
    }
}
