//! Derived values: pure recomputation over explicit dependencies.
//!
//! A derived node owns no settable state. Every tick in which it is
//! reachable from a changed root it re-runs its closure against its
//! dependencies' pending values — unconditionally, with no memoization: the
//! cost of re-running a pure function is taken over the bookkeeping of
//! skip-if-unchanged.

use std::rc::Rc;

use crate::arena::{Behavior, EvalFn, NodeData, NodeId, SetFn, Slot};
use crate::graph::{EvalCx, Graph};
use crate::node::{AnyNode, Node, Value};
use crate::source::Settable;

/// Handle to a pure derived value.
pub struct Derived<T> {
    node: Node<T>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Derived<T> {}

impl<T> Derived<T> {
    /// The general node handle for this value.
    pub fn node(self) -> Node<T> {
        self.node
    }
}

impl<T> From<Derived<T>> for Node<T> {
    fn from(derived: Derived<T>) -> Self {
        derived.node
    }
}

impl<T> From<Derived<T>> for AnyNode {
    fn from(derived: Derived<T>) -> Self {
        derived.node.into()
    }
}

/// A derived value that additionally accepts external `set` calls through a
/// user-supplied reverse setter, typically forwarding a transformed value to
/// an underlying [`Source`](crate::Source).
pub struct WritableDerived<T> {
    node: Node<T>,
}

impl<T> Clone for WritableDerived<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WritableDerived<T> {}

impl<T> WritableDerived<T> {
    /// The general node handle for this value.
    pub fn node(self) -> Node<T> {
        self.node
    }
}

impl<T> From<WritableDerived<T>> for Node<T> {
    fn from(derived: WritableDerived<T>) -> Self {
        derived.node
    }
}

impl<T> From<WritableDerived<T>> for AnyNode {
    fn from(derived: WritableDerived<T>) -> Self {
        derived.node.into()
    }
}

impl<T: Value> Settable<T> for WritableDerived<T> {
    fn stage(self, graph: &mut Graph, value: T) {
        let setter = match &graph.arena.node(self.node.id).behavior {
            Behavior::Derived {
                setter: Some(setter),
                ..
            } => setter.clone(),
            _ => unreachable!("WritableDerived handles always carry a setter"),
        };
        setter(graph, &value);
    }
}

impl Graph {
    /// Create a derived value.
    ///
    /// `deps` are the nodes whose changes trigger recomputation; the closure
    /// reads their pending values through the [`EvalCx`]. It runs once
    /// eagerly here, so the node is born with a consistent value. The
    /// closure must be pure with respect to the graph — `EvalCx` gives it no
    /// way to stage values, and it should not touch outside state.
    pub fn derived<T, F>(
        &mut self,
        deps: impl IntoIterator<Item = AnyNode>,
        eval: F,
    ) -> Derived<T>
    where
        T: Value,
        F: Fn(&EvalCx<'_>) -> T + 'static,
    {
        let id = self.insert_derived(deps, eval, None);
        Derived { node: Node::new(id) }
    }

    /// Create a writable derived value.
    ///
    /// Reads like [`derived`](Graph::derived); writes invoke `setter`, which
    /// decides what staging a value means — usually translating it and
    /// forwarding to the source the computation reads from.
    pub fn writable<T, F, S>(
        &mut self,
        deps: impl IntoIterator<Item = AnyNode>,
        eval: F,
        setter: S,
    ) -> WritableDerived<T>
    where
        T: Value,
        F: Fn(&EvalCx<'_>) -> T + 'static,
        S: Fn(&mut Graph, T) + 'static,
    {
        let setter: SetFn = Rc::new(move |graph: &mut Graph, value: &dyn std::any::Any| {
            let value = value
                .downcast_ref::<T>()
                .expect("staged type is pinned by the typed handle")
                .clone();
            setter(graph, value);
        });
        let id = self.insert_derived(deps, eval, Some(setter));
        WritableDerived { node: Node::new(id) }
    }

    fn insert_derived<T, F>(
        &mut self,
        deps: impl IntoIterator<Item = AnyNode>,
        eval: F,
        setter: Option<SetFn>,
    ) -> NodeId
    where
        T: Value,
        F: Fn(&EvalCx<'_>) -> T + 'static,
    {
        let eval: EvalFn = Rc::new(move |cx: &EvalCx<'_>| -> Slot { Rc::new(eval(cx)) });
        let initial = eval(&EvalCx { arena: &self.arena });
        let id = self.insert_node(NodeData::continuous_slot::<T>(
            initial,
            Behavior::Derived { eval, setter },
        ));
        for dep in deps {
            self.arena.node_mut(dep.id).loud.insert(id);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use crate::Graph;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn derived_follows_its_source() {
        let mut g = Graph::new();
        let a = g.source(1);
        let b = g.derived([a.into()], move |cx| cx.get(a) * 2);
        assert_eq!(g.read(b), 2);

        g.set(a, 5);
        g.tick();
        assert_eq!(g.read(b), 10);
    }

    #[test]
    fn recomputes_even_when_inputs_are_value_equal() {
        let runs = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        let a = g.source(1);
        let runs_in_eval = runs.clone();
        let _b = g.derived([a.into()], move |cx| {
            runs_in_eval.set(runs_in_eval.get() + 1);
            cx.get(a) * 2
        });
        assert_eq!(runs.get(), 1);

        // Staging the same value still reaches the derived node.
        g.set(a, 1);
        g.tick();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn writable_forwards_through_its_setter() {
        let mut g = Graph::new();
        let celsius = g.source(0.0f64);
        let fahrenheit = g.writable(
            [celsius.into()],
            move |cx| cx.get(celsius) * 9.0 / 5.0 + 32.0,
            move |g, f: f64| g.set(celsius, (f - 32.0) * 5.0 / 9.0),
        );
        assert_eq!(g.read(fahrenheit), 32.0);

        g.set(fahrenheit, 212.0);
        g.tick();
        assert_eq!(g.read(celsius), 100.0);
        assert_eq!(g.read(fahrenheit), 212.0);
    }

    #[test]
    fn derived_over_an_event_sees_the_pulse_window() {
        let mut g = Graph::new();
        let clicks = g.event::<(i32, i32)>();
        let last_x = g.derived([clicks.into()], move |cx| {
            cx.get(clicks).map(|(x, _)| x)
        });

        g.fire(clicks, (3, 4));
        g.tick();
        assert_eq!(g.read(last_x), Some(3));

        // The pulse expires and the derived value follows it back down.
        g.tick();
        assert_eq!(g.read(last_x), None);
    }
}
