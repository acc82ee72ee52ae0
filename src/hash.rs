//! Zero-sized hash builder for the graph's node-id collections.
//!
//! Node ids are dense `u32` indices hashed constantly while planning a tick,
//! so the edge sets and the dirty set use foldhash with a fixed seed instead
//! of the default HashDoS-resistant hasher. The fixed seed also keeps
//! iteration order reproducible across runs, which the scheduler relies on
//! for deterministic evaluation orders.

use std::hash::BuildHasher;

use foldhash::fast::{FixedState, FoldHasher};

/// A zero-sized `BuildHasher` over foldhash with a fixed seed.
///
/// All instances hash identically, so sets built with it have stable,
/// reproducible iteration order. Internal use only; node ids are not
/// attacker-controlled.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct GraphHashBuilder;

impl BuildHasher for GraphHashBuilder {
    type Hasher = FoldHasher<'static>;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        FixedState::with_seed(0x2545f4914f6cdd1d).build_hasher()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_is_zero_sized() {
        assert_eq!(std::mem::size_of::<GraphHashBuilder>(), 0);
    }

    #[test]
    fn hashes_are_reproducible() {
        let a = GraphHashBuilder.hash_one(7u32);
        let b = GraphHashBuilder.hash_one(7u32);
        assert_eq!(a, b);
    }
}
