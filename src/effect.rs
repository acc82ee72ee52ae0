//! Watch subscriptions and condition-scoped effects.
//!
//! Watchers are how the outside world hears about commits: a callback
//! registered on a node runs after every tick in which that node commits a
//! *changed* value, receiving the new value. The rendering layer uses this
//! to re-upload uniforms, re-bind programs, and the like.
//!
//! [`Graph::effect_scope`] builds on watchers to tie a resource to a
//! reactive boolean: mount when the condition commits true, unmount when it
//! commits false. Callbacks hold no access to the graph, so they can observe
//! but never mutate mid-tick; staging in response to an observation is the
//! driver loop's job, between ticks.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::arena::Watcher;
use crate::graph::Graph;
use crate::node::{Node, Value};

/// Registration token returned by [`Graph::watch`]; pass it to
/// [`Graph::unwatch`] to stop the callback.
#[derive(Clone, Copy, Debug)]
pub struct WatchHandle {
    pub(crate) node: crate::arena::NodeId,
    pub(crate) key: u64,
}

impl Graph {
    /// Register a callback on `node`, run after each commit that changes its
    /// value.
    ///
    /// Commits that leave the value equal to the previous one do not fire.
    /// Note that an event pulse expiring back to `None` is a change like any
    /// other; pulse consumers should match on `Some`.
    pub fn watch<T: Value>(
        &mut self,
        node: impl Into<Node<T>>,
        mut callback: impl FnMut(&T) + 'static,
    ) -> WatchHandle {
        let node = node.into().id;
        let key = self.next_watch_key();
        let erased: Rc<RefCell<dyn FnMut(&dyn Any)>> =
            Rc::new(RefCell::new(move |value: &dyn Any| {
                if let Some(value) = value.downcast_ref::<T>() {
                    callback(value);
                }
            }));
        self.arena.node_mut(node).watchers.push(Watcher {
            key,
            callback: erased,
        });
        WatchHandle { node, key }
    }

    /// Remove a watcher. Unknown or already-removed handles are a no-op.
    pub fn unwatch(&mut self, handle: WatchHandle) {
        self.arena
            .node_mut(handle.node)
            .watchers
            .retain(|w| w.key != handle.key);
    }

    /// Tie a resource's lifetime to a reactive boolean.
    ///
    /// `mount` runs when `active` becomes true, `unmount` when it becomes
    /// false, alternating strictly. If the condition already holds, `mount`
    /// runs immediately. Returns the underlying watch registration; unwatch
    /// it to stop tracking (this does not run `unmount` — release the
    /// resource yourself if it is currently mounted).
    pub fn effect_scope(
        &mut self,
        active: impl Into<Node<bool>>,
        mut mount: impl FnMut() + 'static,
        mut unmount: impl FnMut() + 'static,
    ) -> WatchHandle {
        let active = active.into();
        let mut engaged = false;
        if self.read(active) {
            mount();
            engaged = true;
        }
        self.watch(active, move |now_active: &bool| {
            if *now_active && !engaged {
                mount();
                engaged = true;
            } else if !*now_active && engaged {
                unmount();
                engaged = false;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Graph;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn watchers_fire_only_on_changed_commits() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut g = Graph::new();
        let a = g.source(1);
        let seen_in_watch = seen.clone();
        g.watch(a, move |v: &i32| seen_in_watch.borrow_mut().push(*v));

        g.set(a, 2);
        g.tick();
        // Re-staging the same value commits equal: silent.
        g.set(a, 2);
        g.tick();
        g.set(a, 3);
        g.tick();
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }

    #[test]
    fn watchers_see_derived_commits() {
        let seen = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        let a = g.source(1);
        let b = g.derived([a.into()], move |cx| cx.get(a) * 2);
        let seen_in_watch = seen.clone();
        g.watch(b, move |v: &i32| seen_in_watch.set(*v));

        g.set(a, 21);
        g.tick();
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn unwatch_stops_the_callback() {
        let count = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        let a = g.source(0);
        let count_in_watch = count.clone();
        let handle = g.watch(a, move |_: &i32| count_in_watch.set(count_in_watch.get() + 1));

        g.set(a, 1);
        g.tick();
        assert_eq!(count.get(), 1);

        g.unwatch(handle);
        g.set(a, 2);
        g.tick();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn effect_scope_mounts_and_unmounts_with_the_condition() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut g = Graph::new();
        let active = g.source(false);
        let mount_log = log.clone();
        let unmount_log = log.clone();
        g.effect_scope(
            active,
            move || mount_log.borrow_mut().push("mount"),
            move || unmount_log.borrow_mut().push("unmount"),
        );
        assert!(log.borrow().is_empty());

        g.set(active, true);
        g.tick();
        assert_eq!(*log.borrow(), vec!["mount"]);

        // Still true: no re-mount.
        g.set(active, true);
        g.tick();
        assert_eq!(*log.borrow(), vec!["mount"]);

        g.set(active, false);
        g.tick();
        assert_eq!(*log.borrow(), vec!["mount", "unmount"]);
    }

    #[test]
    fn effect_scope_mounts_immediately_when_already_active() {
        let mounted = Rc::new(Cell::new(false));
        let mut g = Graph::new();
        let active = g.source(true);
        let flag = mounted.clone();
        g.effect_scope(active, move || flag.set(true), || {});
        assert!(mounted.get());
    }
}
