//! Protocol-violation errors.
//!
//! Every error here is a precondition failure surfaced immediately at the
//! call site; nothing is retried or deferred. Graph cycles are deliberately
//! not an error — see [`Graph::tick`](crate::Graph::tick) for the documented
//! stale-read semantics.

use thiserror::Error;

/// Rejection of an operation that would corrupt graph semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A drive binding mixed an event node with a continuous node.
    ///
    /// Pulses are transient and continuous values are not; mirroring one
    /// through the other has no meaning, so [`Graph::drive`](crate::Graph::drive)
    /// rejects the pair outright.
    #[error("cannot drive across kinds: event and continuous nodes do not mix")]
    DriveKindMismatch,

    /// A fold or sample was registered with a continuous trigger.
    ///
    /// Triggers must be event nodes; a continuous node never pulses, so the
    /// registration would be dead on arrival.
    #[error("trigger must be an event node")]
    TriggerNotEvent,
}
