//! Shared assertion helpers for argus tests.

pub mod lattice;

use argus_ir::{HasBottom, HasTop, Lattice};

/// A totally-ordered min/max lattice over `u8`. Used in doc examples and as a
/// known-good reference implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chain(pub u8);

impl Lattice for Chain {
    fn join(&self, other: &Self) -> Self {
        Chain(self.0.max(other.0))
    }

    fn meet(&self, other: &Self) -> Self {
        Chain(self.0.min(other.0))
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        self.0 <= other.0
    }
}

impl HasBottom for Chain {
    fn bottom() -> Self {
        Chain(u8::MIN)
    }
}

impl HasTop for Chain {
    fn top() -> Self {
        Chain(u8::MAX)
    }
}
