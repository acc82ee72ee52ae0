#![deny(missing_docs)]

//! Tick-driven push/pull reactive dataflow.
//!
//! `refract` schedules a graph of reactive nodes — settable [`Source`]s,
//! pure [`Derived`] values, conditional [`Gate`]s, event-folding
//! [`Reducer`]s — and advances the whole reachable subgraph exactly once per
//! call to [`Graph::tick`], in a consistent, glitch-free order.
//!
//! # Quick start
//!
//! ```
//! use refract::Graph;
//!
//! let mut g = Graph::new();
//! let width = g.source(4);
//! let area = g.derived([width.into()], move |cx| cx.get(width) * cx.get(width));
//!
//! g.set(width, 6);
//! g.tick();
//! assert_eq!(g.read(area), 36);
//! ```
//!
//! # The tick model
//!
//! Values move in two phases. Staging (`set`, `fire`) writes a node's
//! *pending* slot and marks it as a seed; nothing is observable yet. A tick
//! then orders everything reachable from the seeds so producers precede
//! consumers, recomputes each node's pending value from its neighbours'
//! pending values, and finally commits the whole batch at once. Readers —
//! [`Graph::read`], watchers, whatever renders frames — only ever see
//! committed state, so a tick is atomic from the outside and a consumer
//! inside a tick never mixes values from two different generations.
//!
//! The driving loop is external: stage every `set` belonging to one outside
//! occurrence (a frame, an input event), call `tick()` once, then read.
//!
//! # Continuous values and event pulses
//!
//! Continuous nodes hold a value that persists until replaced. Event nodes
//! (created with [`Graph::event`]) hold `Option<T>` and are transient: a
//! fired pulse reads as `Some` for exactly one tick, after which the runtime
//! resets it to `None`. [`Reducer`]s fold pulses into durable state;
//! [`Sample`] snapshots a continuous value at pulse time.
//!
//! # Edges, loud and quiet
//!
//! A *loud* edge propagates recomputation: when a node changes, its loud
//! successors re-evaluate. A *quiet* edge (used for reducer context) only
//! constrains ordering: the successor, if it runs at all, is guaranteed to
//! see the current tick's value, but the quiet producer changing is never by
//! itself a reason to run. Graphs may grow between ticks — new nodes, new
//! folds, re-driven sources — and [`Gate`]s attach and detach their own
//! subscription edges as their predicate flips.

mod arena;
mod derived;
mod effect;
mod error;
mod gate;
mod graph;
mod hash;
mod node;
mod reducer;
mod sample;
mod scheduler;
mod source;

pub use derived::{Derived, WritableDerived};
pub use effect::WatchHandle;
pub use error::Error;
pub use gate::Gate;
pub use graph::{EvalCx, Graph};
pub use node::{AnyNode, Node, Value};
pub use reducer::Reducer;
pub use sample::Sample;
pub use source::{Settable, Source};
