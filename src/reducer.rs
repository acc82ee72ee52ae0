//! Stateful folds over event pulses.
//!
//! A reducer holds an accumulator and a list of fold registrations. Each
//! registration pairs one trigger event (a loud edge: its pulses wake the
//! reducer) with any number of quiet context nodes (ordering-only edges:
//! their pending values may be read inside the fold, but changing them alone
//! never re-runs it). When several triggers pulse in the same tick, the
//! folds apply in registration order, threading the accumulator through.

use std::rc::Rc;

use crate::arena::{Behavior, FoldFn, NodeData, Slot};
use crate::error::Error;
use crate::graph::{EvalCx, Graph};
use crate::node::{AnyNode, Node, Value};

/// Handle to a reducer. The accumulated value is continuous: it stays
/// readable between pulses and across ticks in which nothing fires.
pub struct Reducer<A> {
    node: Node<A>,
}

impl<A> Clone for Reducer<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Reducer<A> {}

impl<A> Reducer<A> {
    /// The general node handle for this reducer.
    pub fn node(self) -> Node<A> {
        self.node
    }
}

impl<A> From<Reducer<A>> for Node<A> {
    fn from(reducer: Reducer<A>) -> Self {
        reducer.node
    }
}

impl<A> From<Reducer<A>> for AnyNode {
    fn from(reducer: Reducer<A>) -> Self {
        reducer.node.into()
    }
}

impl Graph {
    /// Create a reducer with an initial accumulator and no registrations.
    pub fn reducer<A: Value>(&mut self, initial: A) -> Reducer<A> {
        let id = self.insert_node(NodeData::continuous(
            initial,
            Behavior::Reducer { folds: Vec::new() },
        ));
        Reducer { node: Node::new(id) }
    }

    /// Register a fold on `reducer`.
    ///
    /// `trigger` must be an event node; its pulse wakes the reducer and is
    /// passed to `fold` as the second argument. `quiet` nodes are linked for
    /// ordering only: the fold may read them through the [`EvalCx`] and will
    /// see their values from the current tick, but their changes alone never
    /// fire the fold. One reducer accepts any number of registrations, each
    /// with its own trigger and logic; same-tick pulses apply in
    /// registration order.
    ///
    /// # Errors
    ///
    /// [`Error::TriggerNotEvent`] if `trigger` is a continuous node.
    pub fn fold<A, E, F>(
        &mut self,
        reducer: Reducer<A>,
        trigger: impl Into<Node<Option<E>>>,
        quiet: impl IntoIterator<Item = AnyNode>,
        fold: F,
    ) -> Result<(), Error>
    where
        A: Value,
        E: Value,
        F: Fn(A, E, &EvalCx<'_>) -> A + 'static,
    {
        let trigger = trigger.into();
        if self.arena.node(trigger.id).event.is_none() {
            return Err(Error::TriggerNotEvent);
        }

        let id = reducer.node.id;
        self.arena.node_mut(trigger.id).loud.insert(id);
        for dep in quiet {
            self.arena.node_mut(dep.id).quiet.insert(id);
        }

        let apply: FoldFn = Rc::new(move |acc: Slot, cx: &EvalCx<'_>| -> Slot {
            let Some(pulse) = cx.get(trigger) else {
                return acc;
            };
            let current = acc
                .downcast_ref::<A>()
                .expect("accumulator type is pinned by the typed handle")
                .clone();
            Rc::new(fold(current, pulse, cx))
        });
        match &mut self.arena.node_mut(id).behavior {
            Behavior::Reducer { folds } => folds.push(apply),
            _ => unreachable!("Reducer handles always name reducer nodes"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Graph};

    #[test]
    fn fold_accumulates_pulses() {
        let mut g = Graph::new();
        let trigger = g.event::<i64>();
        let total = g.reducer(0i64);
        g.fold(total, trigger, [], |acc, pulse, _| acc + pulse).unwrap();

        g.fire(trigger, 3);
        g.tick();
        assert_eq!(g.read(total), 3);

        // The pulse expires; the accumulator holds without re-firing.
        g.tick();
        assert_eq!(g.read(total), 3);

        g.fire(trigger, 4);
        g.tick();
        assert_eq!(g.read(total), 7);
    }

    #[test]
    fn registrations_apply_in_order_within_a_tick() {
        let mut g = Graph::new();
        let add = g.event::<i64>();
        let scale = g.event::<i64>();
        let acc = g.reducer(1i64);
        g.fold(acc, add, [], |acc, pulse, _| acc + pulse).unwrap();
        g.fold(acc, scale, [], |acc, pulse, _| acc * pulse).unwrap();

        g.fire(add, 4);
        g.fire(scale, 10);
        g.tick();
        // Addition registered first: (1 + 4) * 10, not 1 * 10 + 4.
        assert_eq!(g.read(acc), 50);
    }

    #[test]
    fn quiet_context_is_read_fresh_but_never_triggers() {
        let mut g = Graph::new();
        let step = g.source(1i64);
        let bump = g.event::<()>();
        let count = g.reducer(0i64);
        g.fold(count, bump, [step.into()], move |acc, (), cx| acc + cx.get(step))
            .unwrap();

        g.fire(bump, ());
        g.tick();
        assert_eq!(g.read(count), 1);

        // Changing the context alone does nothing...
        g.set(step, 10);
        g.tick();
        assert_eq!(g.read(count), 1);

        // ...but the next pulse reads it, even when both land in one tick.
        g.set(step, 100);
        g.fire(bump, ());
        g.tick();
        assert_eq!(g.read(count), 101);
    }

    #[test]
    fn continuous_triggers_are_rejected() {
        let mut g = Graph::new();
        let held = g.source(None::<i64>);
        let acc = g.reducer(0i64);
        let result = g.fold(acc, held, [], |acc, pulse, _| acc + pulse);
        assert_eq!(result, Err(Error::TriggerNotEvent));
    }

    #[test]
    fn two_reducers_share_a_trigger() {
        let mut g = Graph::new();
        let pulse = g.event::<i64>();
        let sum = g.reducer(0i64);
        let count = g.reducer(0i64);
        g.fold(sum, pulse, [], |acc, p, _| acc + p).unwrap();
        g.fold(count, pulse, [], |acc, _, _| acc + 1).unwrap();

        g.fire(pulse, 5);
        g.tick();
        g.fire(pulse, 7);
        g.tick();
        assert_eq!(g.read(sum), 12);
        assert_eq!(g.read(count), 2);
    }
}
