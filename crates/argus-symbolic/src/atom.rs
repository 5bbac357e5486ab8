use std::rc::Rc;

use argus_ir::Value;

/// The widened scalar domain. Two's-complement wrap-around is accepted; the
/// analysis is best-effort in the face of it.
pub type Scalar = i64;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum AtomOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl AtomOp {
    fn symbol(self) -> char {
        match self {
            AtomOp::Add => '+',
            AtomOp::Sub => '-',
            AtomOp::Mul => '*',
            AtomOp::Div => '/',
        }
    }
}

/// An opaque term of a symbolic expression.
///
/// Atoms form trees with shared sub-atoms; they are immutable once built and
/// compared structurally (`PartialEq` recurses through `Rc`).
#[derive(Debug, Hash, PartialEq, Eq)]
pub enum Atom {
    Const(Scalar),
    /// An IR value as its own symbol; identity is the value handle.
    Var(Value),
    /// `coeff * atom`.
    Linear { coeff: Scalar, atom: Rc<Atom> },
    BinOp {
        op: AtomOp,
        lhs: Rc<Atom>,
        rhs: Rc<Atom>,
    },
}

impl Atom {
    pub fn bin_op(op: AtomOp, lhs: Rc<Atom>, rhs: Rc<Atom>) -> Rc<Atom> {
        Rc::new(Atom::BinOp { op, lhs, rhs })
    }

    pub fn linear(coeff: Scalar, atom: Rc<Atom>) -> Rc<Atom> {
        Rc::new(Atom::Linear { coeff, atom })
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Atom::Const(v) => write!(f, "{v}"),
            Atom::Var(v) => write!(f, "{v}"),
            Atom::Linear { coeff, atom } => write!(f, "{coeff} * {atom}"),
            Atom::BinOp { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ir::TestValue;

    #[test]
    fn equality_is_structural() {
        let x: Value = TestValue(1).into();
        let a = Rc::new(Atom::Var(x));
        let b = Rc::new(Atom::Var(x));
        assert_eq!(a, b);

        let lin_a = Atom::linear(3, a.clone());
        let lin_b = Atom::linear(3, b.clone());
        assert_eq!(lin_a, lin_b);
        assert_ne!(lin_a, Atom::linear(4, a.clone()));

        let sum = Atom::bin_op(AtomOp::Add, a.clone(), Rc::new(Atom::Const(1)));
        let sum2 = Atom::bin_op(AtomOp::Add, b, Rc::new(Atom::Const(1)));
        assert_eq!(sum, sum2);
        assert_ne!(sum, Atom::bin_op(AtomOp::Add, a, Rc::new(Atom::Const(2))));
    }
}
