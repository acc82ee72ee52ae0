//! Settable root nodes.
//!
//! Sources are where values enter the graph: the input layer stages raw
//! occurrences with [`Graph::set`] / [`Graph::fire`] and then ticks once per
//! external event. A source may instead be *driven* by another node, in
//! which case it mirrors the driver's pending value every tick.

use std::rc::Rc;

use crate::arena::{Behavior, NodeData};
use crate::error::Error;
use crate::graph::Graph;
use crate::node::{AnyNode, Node, Value};

/// Handle to a settable root node.
///
/// Continuous sources hold a plain `T`; event sources are
/// `Source<Option<T>>`, created by [`Graph::event`], whose `None` means "no
/// pulse this tick".
pub struct Source<T> {
    node: Node<T>,
}

impl<T> Source<T> {
    /// The general node handle for this source.
    pub fn node(self) -> Node<T> {
        self.node
    }
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Source<T> {}

impl<T> From<Source<T>> for Node<T> {
    fn from(source: Source<T>) -> Self {
        source.node
    }
}

impl<T> From<Source<T>> for AnyNode {
    fn from(source: Source<T>) -> Self {
        source.node.into()
    }
}

/// Nodes that accept externally staged values.
///
/// Implemented by [`Source`] and
/// [`WritableDerived`](crate::WritableDerived); [`Graph::set`] is generic
/// over it so call sites read the same either way.
pub trait Settable<T: Value>: Copy {
    /// Stage `value` for the next tick.
    fn stage(self, graph: &mut Graph, value: T);
}

impl<T: Value> Settable<T> for Source<T> {
    fn stage(self, graph: &mut Graph, value: T) {
        graph.stage_slot(self.node.id, Rc::new(value));
    }
}

impl Graph {
    /// Create a continuous source holding `initial`.
    pub fn source<T: Value>(&mut self, initial: T) -> Source<T> {
        let id = self.insert_node(NodeData::continuous(
            initial,
            Behavior::Source { driver: None },
        ));
        Source { node: Node::new(id) }
    }

    /// Create an event source for pulses of type `T`.
    ///
    /// Born holding the "no pulse" sentinel; [`fire`](Graph::fire) stages a
    /// pulse that is visible for exactly one tick and then resets.
    pub fn event<T: Value>(&mut self) -> Source<Option<T>> {
        let id = self.insert_node(NodeData::event::<T>(Behavior::Source { driver: None }));
        Source { node: Node::new(id) }
    }

    /// Stage a pulse on an event source. Sugar for `set(event, Some(pulse))`.
    pub fn fire<T: Value>(&mut self, event: Source<Option<T>>, pulse: T) {
        self.set(event, Some(pulse));
    }

    /// Bind `target` to continuously mirror `driver`'s pending value.
    ///
    /// Adds a loud edge from the driver, so the source updates whenever the
    /// driver does. At most one driver is active: re-driving detaches the
    /// previous edge and attaches the new one in the same call, leaving no
    /// dangling edge. While driven, the driver's value wins over anything
    /// staged externally in the same tick.
    ///
    /// # Errors
    ///
    /// [`Error::DriveKindMismatch`] if one side is an event node and the
    /// other is continuous.
    pub fn drive<T: Value>(
        &mut self,
        target: Source<T>,
        driver: impl Into<Node<T>>,
    ) -> Result<(), Error> {
        let driver = driver.into().id;
        let target = target.node.id;
        if self.arena.node(target).event.is_some() != self.arena.node(driver).event.is_some() {
            return Err(Error::DriveKindMismatch);
        }

        let previous = match &mut self.arena.node_mut(target).behavior {
            Behavior::Source { driver: slot } => slot.replace(driver),
            _ => unreachable!("Source handles always name source nodes"),
        };
        if let Some(previous) = previous {
            self.arena.node_mut(previous).loud.shift_remove(&target);
        }
        self.arena.node_mut(driver).loud.insert(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Graph};

    #[test]
    fn set_then_tick_publishes() {
        let mut g = Graph::new();
        let a = g.source(1);
        g.set(a, 5);
        // Staged but not yet committed.
        assert_eq!(g.read(a), 1);
        g.tick();
        assert_eq!(g.read(a), 5);
    }

    #[test]
    fn latest_staging_wins_within_a_tick() {
        let mut g = Graph::new();
        let a = g.source(0);
        g.set(a, 1);
        g.set(a, 2);
        g.tick();
        assert_eq!(g.read(a), 2);
    }

    #[test]
    fn driven_source_mirrors_its_driver() {
        let mut g = Graph::new();
        let raw = g.source(1);
        let scaled = g.derived([raw.into()], move |cx| cx.get(raw) * 10);
        let mirror = g.source(0);
        g.drive(mirror, scaled).unwrap();

        g.set(raw, 3);
        g.tick();
        assert_eq!(g.read(mirror), 30);
    }

    #[test]
    fn redrive_detaches_the_previous_driver() {
        let mut g = Graph::new();
        let first = g.source(1);
        let second = g.source(2);
        let target = g.source(0);
        g.drive(target, first).unwrap();
        g.drive(target, second).unwrap();

        // The old edge is gone: changing `first` no longer reaches `target`.
        g.set(first, 100);
        g.tick();
        assert_eq!(g.read(target), 0);

        g.set(second, 7);
        g.tick();
        assert_eq!(g.read(target), 7);
    }

    #[test]
    fn drive_rejects_mixed_kinds() {
        let mut g = Graph::new();
        let pulses = g.event::<i32>();
        // Same stored type, but continuous: the kind check is semantic, not
        // structural.
        let held = g.source(None::<i32>);
        assert_eq!(g.drive(held, pulses), Err(Error::DriveKindMismatch));

        let other = g.event::<i32>();
        assert_eq!(g.drive(other, pulses), Ok(()));
    }

    #[test]
    fn fired_event_reads_for_one_tick_then_resets() {
        let mut g = Graph::new();
        let key = g.event::<char>();
        assert_eq!(g.read(key), None);

        g.fire(key, 'a');
        g.tick();
        assert_eq!(g.read(key), Some('a'));

        g.tick();
        assert_eq!(g.read(key), None);
    }

    #[test]
    fn refiring_before_the_reset_keeps_the_new_pulse() {
        let mut g = Graph::new();
        let key = g.event::<char>();
        g.fire(key, 'a');
        g.tick();
        g.fire(key, 'b');
        g.tick();
        assert_eq!(g.read(key), Some('b'));
        g.tick();
        assert_eq!(g.read(key), None);
    }

    #[test]
    fn driven_event_source_propagates_pulses_and_resets() {
        let mut g = Graph::new();
        let upstream = g.event::<i32>();
        let downstream = g.event::<i32>();
        g.drive(downstream, upstream).unwrap();

        g.fire(upstream, 9);
        g.tick();
        assert_eq!(g.read(downstream), Some(9));
        g.tick();
        assert_eq!(g.read(downstream), None);
    }
}
