//! Topological planning and the tick entry point.
//!
//! A tick advances the whole reachable subgraph in four passes:
//!
//! 1. **Plan.** From the seeds staged since the last tick, build one linear
//!    order over everything reachable along loud and quiet edges, such that
//!    every node appears after all of its in-order predecessors.
//! 2. **Update.** Evaluate each loud-reachable node's pending value in that
//!    order. Consumers strictly follow producers, so every read of a
//!    neighbour's pending slot sees this tick's value, never last tick's.
//! 3. **Commit.** Copy pending into committed in the same order, notifying
//!    watchers of changed values. Readers outside the tick only ever see
//!    this fully-committed state.
//! 4. **Housekeeping.** Apply edge changes queued by gates (effective next
//!    tick), then stage expired event pulses back to their sentinels.
//!
//! Planning is a seeded depth-first search with a splice: each seed produces
//! a local post-order of its reachable cone, and when the search runs into a
//! node some earlier seed already placed, it stops descending and remembers
//! the deepest such position; the local order is spliced in just after it.
//! That keeps the combined order valid even though cones overlap and are
//! explored seed by seed rather than by one global sort.

use tracing::trace;

use crate::arena::{Behavior, EvalFn, FoldFn, NodeId, NodeSet, Slot};
use crate::graph::{EdgeOp, EvalCx, Graph};

/// Snapshot of the work a node needs this tick, cloned out of the arena so
/// evaluation can borrow the arena immutably while computing.
enum Step {
    Idle,
    /// Mirror another node's pending slot (driven source, open gate).
    Adopt(NodeId),
    Eval(EvalFn),
    Fold(Vec<FoldFn>),
    Snapshot { of: NodeId, on: NodeId },
    GateCheck { open: NodeId, wrapped: NodeId, linked: bool },
}

impl Graph {
    /// Advance the graph one tick.
    ///
    /// The only entry point that moves values through the graph: evaluates
    /// everything loud-reachable from the nodes staged since the last call,
    /// commits the results, and resets expired event pulses so they read as
    /// "no pulse" from the next tick on. Staging nothing makes this a no-op.
    ///
    /// # Cycles
    ///
    /// Cycles are not rejected. A node already placed in the order is treated
    /// as done and not re-entered, so the tick terminates, but a back-edge
    /// reads the previous tick's pending value rather than this tick's. If
    /// you wire a cycle (typically by driving a source from its own
    /// downstream), that one-tick lag is the semantics you get.
    pub fn tick(&mut self) {
        let seeds: Vec<NodeId> = self.dirty.iter().copied().collect();
        let (order, loud) = self.plan(&seeds);
        // Clear before running anything, so values staged during this tick
        // (pulse resets) are remembered for the next one.
        self.dirty.clear();

        let schedule: Vec<NodeId> = order
            .iter()
            .rev()
            .copied()
            .filter(|id| {
                let fired = loud.contains(id);
                if !fired {
                    // Ordered for the sake of its consumers, but none of its
                    // loud predecessors changed; leave it untouched.
                    cov_mark::hit!(quiet_only_excluded);
                }
                fired
            })
            .collect();
        trace!(
            seeds = seeds.len(),
            ordered = order.len(),
            scheduled = schedule.len(),
            "tick"
        );

        for &id in &schedule {
            self.evaluate(id);
        }
        for &id in &schedule {
            self.commit(id);
        }
        self.apply_edge_ops();
        self.reset_pulses(&schedule);
    }

    /// Build the evaluation order (reverse-topological, dependents first)
    /// and the loud-reachable set for the given seeds.
    fn plan(&self, seeds: &[NodeId]) -> (Vec<NodeId>, NodeSet) {
        let mut order: Vec<NodeId> = Vec::new();
        let mut loud: NodeSet = seeds.iter().copied().collect();

        for &seed in seeds {
            let mut stack = vec![seed];
            let mut local: Vec<NodeId> = Vec::new();
            let mut expanded = NodeSet::default();
            // Deepest already-placed position found while exploring this
            // seed; the local order is spliced in just after it.
            let mut splice_at = 0usize;

            while let Some(id) = stack.pop() {
                if let Some(at) = order.iter().position(|&placed| placed == id) {
                    cov_mark::hit!(order_spliced);
                    splice_at = splice_at.max(at);
                    continue;
                }
                if local.contains(&id) {
                    // Already placed by this seed; re-entering would descend
                    // a cycle forever.
                    continue;
                }
                let node = self.arena.node(id);
                let was_expanded = expanded.contains(&id);
                if was_expanded || (node.loud.is_empty() && node.quiet.is_empty()) {
                    local.push(id);
                    if was_expanded {
                        expanded.swap_remove(&id);
                    }
                    continue;
                }
                stack.push(id);
                stack.extend(node.loud.iter().copied());
                if loud.contains(&id) {
                    loud.extend(node.loud.iter().copied());
                }
                // Quiet successors are ordered after their producers but
                // never marked loud by this edge alone.
                stack.extend(node.quiet.iter().copied());
                expanded.insert(id);
            }

            let at = (splice_at + 1).min(order.len());
            order.splice(at..at, local);
        }

        (order, loud)
    }

    /// Compute `id`'s pending value from its neighbours' pending values.
    fn evaluate(&mut self, id: NodeId) {
        let step = match &self.arena.node(id).behavior {
            Behavior::Source { driver } => match driver {
                Some(driver) => Step::Adopt(*driver),
                None => Step::Idle,
            },
            Behavior::Derived { eval, .. } => Step::Eval(eval.clone()),
            Behavior::Reducer { folds } => Step::Fold(folds.clone()),
            Behavior::Sample { of, on } => Step::Snapshot { of: *of, on: *on },
            Behavior::Gate {
                open,
                wrapped,
                linked,
            } => Step::GateCheck {
                open: *open,
                wrapped: *wrapped,
                linked: *linked,
            },
        };

        match step {
            Step::Idle => {}
            Step::Adopt(producer) => {
                let value = self.arena.node(producer).pending.clone();
                self.arena.node_mut(id).pending = value;
            }
            Step::Eval(eval) => {
                let value = eval(&EvalCx { arena: &self.arena });
                self.arena.node_mut(id).pending = value;
            }
            Step::Fold(folds) => {
                let mut acc = self.arena.node(id).pending.clone();
                {
                    let cx = EvalCx { arena: &self.arena };
                    for fold in &folds {
                        acc = fold(acc, &cx);
                    }
                }
                self.arena.node_mut(id).pending = acc;
            }
            Step::Snapshot { of, on } => {
                if self.arena.pulsed_pending(on) {
                    let value = self.arena.node(of).committed.clone();
                    self.arena.node_mut(id).pending = value;
                }
            }
            Step::GateCheck {
                open,
                wrapped,
                linked,
            } => {
                let is_open = *self
                    .arena
                    .node(open)
                    .pending
                    .downcast_ref::<bool>()
                    .expect("gate predicate holds a bool");
                if is_open {
                    let value = self.arena.node(wrapped).pending.clone();
                    self.arena.node_mut(id).pending = value;
                    if !linked {
                        self.set_gate_link(id, wrapped, true);
                    }
                } else if linked {
                    self.set_gate_link(id, wrapped, false);
                }
                // Closed and unlinked: frozen, nothing to do.
            }
        }
    }

    /// Queue the gate's edge flip for end of tick and record the new link
    /// state. The order already computed for this tick must stay valid, so
    /// the adjacency sets are not touched here.
    fn set_gate_link(&mut self, gate: NodeId, wrapped: NodeId, link: bool) {
        cov_mark::hit!(gate_edge_deferred);
        self.edge_ops.push(if link {
            EdgeOp::Attach {
                from: wrapped,
                to: gate,
            }
        } else {
            EdgeOp::Detach {
                from: wrapped,
                to: gate,
            }
        });
        if let Behavior::Gate { linked, .. } = &mut self.arena.node_mut(gate).behavior {
            *linked = link;
        }
    }

    /// Publish `id`'s pending value and notify watchers if it changed.
    fn commit(&mut self, id: NodeId) {
        let node = self.arena.node(id);
        let changed = !(node.value_eq)(&*node.pending, &*node.committed);
        let value: Slot = node.pending.clone();
        if !changed {
            self.arena.node_mut(id).committed = value;
            return;
        }

        let watchers: Vec<_> = node
            .watchers
            .iter()
            .map(|w| w.callback.clone())
            .collect();
        let label = node.label.clone();
        self.arena.node_mut(id).committed = value.clone();

        if let Some(label) = label {
            let rendered = (label.fmt)(&*value);
            trace!(node = %label.name, value = %rendered, "commit");
        }
        for callback in watchers {
            (callback.borrow_mut())(&*value);
        }
    }

    fn apply_edge_ops(&mut self) {
        for op in std::mem::take(&mut self.edge_ops) {
            match op {
                EdgeOp::Attach { from, to } => {
                    self.arena.node_mut(from).loud.insert(to);
                }
                EdgeOp::Detach { from, to } => {
                    self.arena.node_mut(from).loud.shift_remove(&to);
                }
            }
        }
    }

    /// Stage the sentinel on every event node that just committed a pulse,
    /// so the following tick reads it back as "no pulse" — unless something
    /// re-fires it in between.
    fn reset_pulses(&mut self, schedule: &[NodeId]) {
        for &id in schedule {
            let node = self.arena.node(id);
            let Some(event) = &node.event else { continue };
            if !(event.is_pulsed)(&*node.committed) {
                continue;
            }
            let sentinel = event.sentinel.clone();
            self.arena.node_mut(id).pending = sentinel;
            self.dirty.insert(id);
        }
    }
}
