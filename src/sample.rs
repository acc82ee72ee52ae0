//! Event-driven snapshots of continuous values.
//!
//! A sample node copies another node's committed value whenever a trigger
//! event pulses, and holds it until the next pulse. Unlike a derived value
//! it reads the *committed* slot — the snapshot is "the value as of the last
//! tick", taken at pulse time, deliberately insensitive to anything the
//! current tick is still computing.

use crate::arena::{Behavior, NodeData};
use crate::error::Error;
use crate::graph::Graph;
use crate::node::{AnyNode, Node, Value};

/// Handle to a sample node.
pub struct Sample<T> {
    node: Node<T>,
}

impl<T> Clone for Sample<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Sample<T> {}

impl<T> Sample<T> {
    /// The general node handle for this sample.
    pub fn node(self) -> Node<T> {
        self.node
    }
}

impl<T> From<Sample<T>> for Node<T> {
    fn from(sample: Sample<T>) -> Self {
        sample.node
    }
}

impl<T> From<Sample<T>> for AnyNode {
    fn from(sample: Sample<T>) -> Self {
        sample.node.into()
    }
}

impl Graph {
    /// Create a sample of `of`, taken whenever `on` pulses.
    ///
    /// Starts holding `of`'s current committed value.
    ///
    /// # Errors
    ///
    /// [`Error::TriggerNotEvent`] if `on` is a continuous node.
    pub fn sample<T: Value, E: Value>(
        &mut self,
        of: impl Into<Node<T>>,
        on: impl Into<Node<Option<E>>>,
    ) -> Result<Sample<T>, Error> {
        let of = of.into().id;
        let on = on.into().id;
        if self.arena.node(on).event.is_none() {
            return Err(Error::TriggerNotEvent);
        }

        let slot = self.arena.node(of).committed.clone();
        let id = self.insert_node(NodeData::continuous_slot::<T>(
            slot,
            Behavior::Sample { of, on },
        ));
        self.arena.node_mut(on).loud.insert(id);
        Ok(Sample { node: Node::new(id) })
    }
}

#[cfg(test)]
mod tests {
    use crate::Graph;

    #[test]
    fn snapshots_only_on_pulses() {
        let mut g = Graph::new();
        let position = g.source(10);
        let shutter = g.event::<()>();
        let held = g.sample(position, shutter).unwrap();
        assert_eq!(g.read(held), 10);

        // The tracked value moves; the sample does not.
        g.set(position, 20);
        g.tick();
        assert_eq!(g.read(held), 10);

        g.fire(shutter, ());
        g.tick();
        assert_eq!(g.read(held), 20);

        g.set(position, 30);
        g.tick();
        assert_eq!(g.read(held), 20);
    }

    #[test]
    fn snapshot_is_of_the_previous_commit() {
        let mut g = Graph::new();
        let position = g.source(1);
        let shutter = g.event::<()>();
        let held = g.sample(position, shutter).unwrap();

        // Staged in the same tick as the pulse: the sample reads the value
        // as of the last tick, not the one being committed now.
        g.set(position, 2);
        g.fire(shutter, ());
        g.tick();
        assert_eq!(g.read(held), 1);
        assert_eq!(g.read(position), 2);
    }
}
