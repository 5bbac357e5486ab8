//! Symbolic algebra for the range analysis.
//!
//! Values are abstracted as expressions in the normal form `coeff * atom +
//! delta` (plus the sentinels top and bottom), and sets of values as ranges
//! `[lo, hi]` over such expressions. Atoms are immutable trees shared through
//! `Rc`; equality is structural throughout.

mod atom;
mod expr;
mod range;

pub use atom::{Atom, AtomOp, Scalar};
pub use expr::{Expr, join, meet, var_sym_expr};
pub use range::{ScalarRange, SymRange, const_sym_range, to_scalar_range, var_sym_range};

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ir::TestValue;
    use argus_test_utils::lattice::assert_finite_lattice_laws;

    #[test]
    fn expr_lattice_laws() {
        let x = var_sym_expr(TestValue(1).into());
        let elements = vec![
            Expr::Bot,
            Expr::scalar(0),
            Expr::scalar(42),
            x.clone(),
            x.clone() + Expr::scalar(1),
            x * Expr::scalar(2),
            Expr::Top,
        ];
        assert_finite_lattice_laws(&elements);
    }

    #[test]
    fn range_lattice_laws() {
        let x = var_sym_expr(TestValue(1).into());
        let elements = vec![
            SymRange::empty(),
            const_sym_range(0),
            SymRange::new(Expr::scalar(0), Expr::scalar(10)),
            SymRange::new(Expr::scalar(5), Expr::scalar(6)),
            SymRange::singleton(x.clone()),
            SymRange::new(x.clone(), x + Expr::scalar(3)),
            SymRange::full(),
        ];
        assert_finite_lattice_laws(&elements);
    }
}
