use argus_ir::{HasBottom, HasTop, Lattice, Value};

use crate::atom::Scalar;
use crate::expr::{Expr, join, meet, var_sym_expr};

/// A symbolic interval `[lo, hi]`.
///
/// `full` is `[bot, top]`; `empty` is the inverted `[top, bot]` and serves as
/// the identity of union. Empty ranges only appear transiently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymRange {
    pub lo: Expr,
    pub hi: Expr,
}

pub type ScalarRange = (Scalar, Scalar);

impl SymRange {
    pub fn new(lo: Expr, hi: Expr) -> Self {
        SymRange { lo, hi }
    }

    pub fn full() -> Self {
        SymRange {
            lo: Expr::Bot,
            hi: Expr::Top,
        }
    }

    pub fn empty() -> Self {
        SymRange {
            lo: Expr::Top,
            hi: Expr::Bot,
        }
    }

    /// `[e, e]`.
    pub fn singleton(e: Expr) -> Self {
        SymRange {
            lo: e.clone(),
            hi: e,
        }
    }
}

pub fn const_sym_range(v: Scalar) -> SymRange {
    SymRange::singleton(Expr::scalar(v))
}

/// The range containing only the value itself as a symbolic constant.
pub fn var_sym_range(v: Value) -> SymRange {
    SymRange::singleton(var_sym_expr(v))
}

pub fn to_scalar_range(r: &SymRange) -> Option<ScalarRange> {
    Some((r.lo.to_scalar()?, r.hi.to_scalar()?))
}

// ----------------------------------------------------------------------
// Union / intersection
// ----------------------------------------------------------------------

impl std::ops::BitOrAssign<&SymRange> for SymRange {
    fn bitor_assign(&mut self, rhs: &SymRange) {
        self.lo = meet(&self.lo, &rhs.lo);
        self.hi = join(&self.hi, &rhs.hi);
    }
}

impl std::ops::BitOr for SymRange {
    type Output = SymRange;

    fn bitor(mut self, rhs: SymRange) -> SymRange {
        self |= &rhs;
        self
    }
}

impl std::ops::BitAndAssign<&SymRange> for SymRange {
    fn bitand_assign(&mut self, rhs: &SymRange) {
        self.lo = join(&self.lo, &rhs.lo);
        self.hi = meet(&self.hi, &rhs.hi);
    }
}

impl std::ops::BitAnd for SymRange {
    type Output = SymRange;

    fn bitand(mut self, rhs: SymRange) -> SymRange {
        self &= &rhs;
        self
    }
}

// ----------------------------------------------------------------------
// Arithmetic
// ----------------------------------------------------------------------

impl std::ops::Add for SymRange {
    type Output = SymRange;

    fn add(self, rhs: SymRange) -> SymRange {
        SymRange {
            lo: self.lo + rhs.lo,
            hi: self.hi + rhs.hi,
        }
    }
}

impl std::ops::Sub for SymRange {
    type Output = SymRange;

    fn sub(self, rhs: SymRange) -> SymRange {
        SymRange {
            lo: self.lo - rhs.hi,
            hi: self.hi - rhs.lo,
        }
    }
}

impl std::ops::Mul<&Expr> for SymRange {
    type Output = SymRange;

    /// Both orientations are computed and unioned, which handles an unknown
    /// sign of `e`.
    fn mul(self, e: &Expr) -> SymRange {
        let tmp = SymRange {
            lo: self.hi.clone() * e.clone(),
            hi: self.lo.clone() * e.clone(),
        };
        let mut res = SymRange {
            lo: self.lo * e.clone(),
            hi: self.hi * e.clone(),
        };
        res |= &tmp;
        res
    }
}

impl std::ops::Mul<&SymRange> for SymRange {
    type Output = SymRange;

    fn mul(self, rhs: &SymRange) -> SymRange {
        let tmp = self.clone() * &rhs.hi;
        let mut res = self * &rhs.lo;
        res |= &tmp;
        res
    }
}

impl std::ops::Div<&Expr> for SymRange {
    type Output = SymRange;

    fn div(self, e: &Expr) -> SymRange {
        let tmp = SymRange {
            lo: self.hi.clone() / e.clone(),
            hi: self.lo.clone() / e.clone(),
        };
        let mut res = SymRange {
            lo: self.lo / e.clone(),
            hi: self.hi / e.clone(),
        };
        res |= &tmp;
        res
    }
}

impl std::ops::Div<&SymRange> for SymRange {
    type Output = SymRange;

    /// Defined only for strictly-positive or strictly-negative divisor
    /// ranges; anything else widens to full.
    fn div(self, rhs: &SymRange) -> SymRange {
        if rhs.hi.le(&Expr::scalar(-1)) || Expr::scalar(1).le(&rhs.lo) {
            let tmp = self.clone() / &rhs.hi;
            let mut res = self / &rhs.lo;
            res |= &tmp;
            res
        } else {
            SymRange::full()
        }
    }
}

// ----------------------------------------------------------------------
// Lattice
// ----------------------------------------------------------------------

impl Lattice for SymRange {
    fn join(&self, other: &Self) -> Self {
        self.clone() | other.clone()
    }

    fn meet(&self, other: &Self) -> Self {
        self.clone() & other.clone()
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        other.lo.le(&self.lo) && self.hi.le(&other.hi)
    }
}

impl HasBottom for SymRange {
    fn bottom() -> Self {
        SymRange::empty()
    }
}

impl HasTop for SymRange {
    fn top() -> Self {
        SymRange::full()
    }
}

impl std::fmt::Display for SymRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}; {}]", self.lo, self.hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ir::TestValue;

    fn scalars(lo: Scalar, hi: Scalar) -> SymRange {
        SymRange::new(Expr::scalar(lo), Expr::scalar(hi))
    }

    #[test]
    fn union_identities() {
        let r = scalars(0, 9);
        assert_eq!(r.clone() | SymRange::empty(), r);
        assert_eq!(r.clone() | SymRange::full(), SymRange::full());
    }

    #[test]
    fn intersection_identities() {
        let r = scalars(0, 9);
        assert_eq!(r.clone() & SymRange::full(), r);
        assert_eq!(r & SymRange::empty(), SymRange::empty());
    }

    #[test]
    fn addition_and_subtraction() {
        assert_eq!(scalars(0, 9) + scalars(0, 9), scalars(0, 18));
        assert_eq!(scalars(0, 9) - scalars(0, 9), scalars(-9, 9));
    }

    #[test]
    fn multiplication_handles_sign() {
        assert_eq!(scalars(0, 9) * &Expr::scalar(2), scalars(0, 18));
        assert_eq!(scalars(0, 9) * &Expr::scalar(-2), scalars(-18, 0));
        assert_eq!(scalars(2, 3) * &scalars(-1, 4), scalars(-3, 12));
    }

    #[test]
    fn division_requires_strict_sign() {
        assert_eq!(scalars(0, 8) / &scalars(2, 2), scalars(0, 4));
        assert_eq!(scalars(0, 8) / &scalars(-1, 1), SymRange::full());
        assert_eq!(scalars(4, 8) / &scalars(-2, -2), scalars(-4, -2));
    }

    #[test]
    fn symbolic_singletons() {
        let v = var_sym_range(TestValue(1).into());
        assert_eq!(v.lo, v.hi);
        assert_eq!(to_scalar_range(&v), None);
        assert_eq!(to_scalar_range(&scalars(1, 2)), Some((1, 2)));
    }
}
