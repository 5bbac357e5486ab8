/// Join/meet algebra with a subset ordering, shared by the analysis domains
/// (symbolic expressions and ranges).
///
/// Implementations are expected to satisfy the usual laws: `join` and `meet`
/// are commutative, associative, and idempotent; the two absorb each other
/// (`a.join(&a.meet(&b)) == a` and dually); and `is_subseteq` agrees with
/// them (`a.is_subseteq(&b)` iff `a.join(&b) == b` iff `a.meet(&b) == a`).
/// `argus-test-utils` has assertion helpers that check all of these over a
/// sample of elements.
pub trait Lattice {
    fn join(&self, other: &Self) -> Self;
    fn meet(&self, other: &Self) -> Self;
    fn is_subseteq(&self, other: &Self) -> bool;
}

/// A lattice with a least element: `bottom()` is below everything, is the
/// identity of `join`, and absorbs `meet`.
pub trait HasBottom: Lattice {
    fn bottom() -> Self;
}

/// A lattice with a greatest element: everything is below `top()`, it
/// absorbs `join`, and is the identity of `meet`.
pub trait HasTop: Lattice {
    fn top() -> Self;
}

/// A lattice bounded on both ends.
pub trait FiniteLattice: HasBottom + HasTop {}

impl<T: HasBottom + HasTop> FiniteLattice for T {}
