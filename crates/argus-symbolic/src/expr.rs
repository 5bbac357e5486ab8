use std::rc::Rc;

use argus_ir::{HasBottom, HasTop, Lattice, Value};

use crate::atom::{Atom, AtomOp, Scalar};

/// A symbolic expression: one of the sentinels, or the normal form
/// `coeff * atom + delta` with `atom` present iff `coeff != 0`.
///
/// Purely scalar values are kept in the normal form with `coeff == 0`;
/// constant atoms are always lifted this way, never stored as atoms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// Unknown upper bound (+inf).
    Top,
    /// Unknown lower bound (-inf).
    Bot,
    Normal(Normal),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normal {
    coeff: Scalar,
    atom: Option<Rc<Atom>>,
    delta: Scalar,
}

impl Expr {
    pub fn scalar(value: Scalar) -> Self {
        Expr::Normal(Normal {
            coeff: 0,
            atom: None,
            delta: value,
        })
    }

    /// Normalized constructor; drops the atom when the coefficient is zero.
    fn normal(coeff: Scalar, atom: Option<Rc<Atom>>, delta: Scalar) -> Self {
        if coeff == 0 {
            Expr::scalar(delta)
        } else {
            Expr::Normal(Normal { coeff, atom, delta })
        }
    }

    pub fn from_atom(atom: Rc<Atom>) -> Self {
        match *atom {
            Atom::Const(value) => Expr::scalar(value),
            _ => Expr::Normal(Normal {
                coeff: 1,
                atom: Some(atom),
                delta: 0,
            }),
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Expr::Top)
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Expr::Bot)
    }

    /// `Some(delta)` when the expression is purely scalar.
    pub fn to_scalar(&self) -> Option<Scalar> {
        match self {
            Expr::Normal(n) if n.coeff == 0 => Some(n.delta),
            _ => None,
        }
    }

    /// The whole expression as an atom; `None` for the sentinels.
    pub fn to_atom(&self) -> Option<Rc<Atom>> {
        match self {
            Expr::Normal(n) => Some(n.to_atom()),
            _ => None,
        }
    }

    /// Sound-by-default comparator: `true` means `self <= rhs` is proved,
    /// `false` means it is not proved (never "proved greater").
    pub fn le(&self, rhs: &Expr) -> bool {
        if self.is_bot() || rhs.is_top() {
            return true;
        }
        if self.is_top() || rhs.is_bot() {
            return false;
        }
        match self.clone() - rhs.clone() {
            Expr::Normal(d) if d.coeff == 0 => d.delta <= 0,
            _ => false,
        }
    }
}

impl Normal {
    /// `coeff * atom` as an atom, without the delta. `None` for scalars.
    fn to_atom_no_delta(&self) -> Option<Rc<Atom>> {
        let atom = self.atom.as_ref()?;
        Some(if self.coeff == 1 {
            atom.clone()
        } else {
            Atom::linear(self.coeff, atom.clone())
        })
    }

    fn to_atom(&self) -> Rc<Atom> {
        match self.to_atom_no_delta() {
            None => Rc::new(Atom::Const(self.delta)),
            Some(no_delta) if self.delta == 0 => no_delta,
            Some(no_delta) => Atom::bin_op(AtomOp::Add, no_delta, Rc::new(Atom::Const(self.delta))),
        }
    }
}

/// An IR value as its own symbolic constant.
pub fn var_sym_expr(v: Value) -> Expr {
    Expr::from_atom(Rc::new(Atom::Var(v)))
}

// ----------------------------------------------------------------------
// Arithmetic
// ----------------------------------------------------------------------

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        match self {
            Expr::Top => Expr::Bot,
            Expr::Bot => Expr::Top,
            Expr::Normal(n) => Expr::Normal(Normal {
                coeff: n.coeff.wrapping_neg(),
                atom: n.atom,
                delta: n.delta.wrapping_neg(),
            }),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        let (a, b) = match (self, rhs) {
            (lhs @ (Expr::Top | Expr::Bot), _) => return lhs,
            (_, rhs @ (Expr::Top | Expr::Bot)) => return rhs,
            (Expr::Normal(a), Expr::Normal(b)) => (a, b),
        };
        let delta = a.delta.wrapping_add(b.delta);
        match (&a.atom, &b.atom) {
            (_, None) => Expr::normal(a.coeff, a.atom.clone(), delta),
            (None, _) => Expr::normal(b.coeff, b.atom.clone(), delta),
            (Some(la), Some(ra)) => {
                if a.coeff == b.coeff.wrapping_neg() {
                    // Atom cancellation: this is what proves `x - x = 0` and
                    // lets the comparator terminate on loop-carried values.
                    Expr::scalar(delta)
                } else if la == ra {
                    Expr::normal(a.coeff.wrapping_add(b.coeff), a.atom.clone(), delta)
                } else {
                    let (Some(lhs), Some(rhs)) = (a.to_atom_no_delta(), b.to_atom_no_delta())
                    else {
                        unreachable!("both sides have atoms");
                    };
                    Expr::normal(1, Some(Atom::bin_op(AtomOp::Add, lhs, rhs)), delta)
                }
            }
        }
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        self + (-rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        // Sentinel anywhere: give up and keep the left-hand side.
        if matches!(self, Expr::Top | Expr::Bot) || matches!(rhs, Expr::Top | Expr::Bot) {
            return self;
        }
        let (Expr::Normal(a), Expr::Normal(b)) = (&self, &rhs) else {
            unreachable!("sentinels handled above");
        };
        // `(a_c x + a_d) * (b_c y + b_d)`
        let delta = a.delta.wrapping_mul(b.delta);
        match (&a.atom, &b.atom) {
            (None, None) => Expr::scalar(delta),
            (None, Some(batom)) => Expr::normal(
                a.delta.wrapping_mul(b.coeff),
                Some(batom.clone()),
                delta,
            ),
            (Some(aatom), None) => Expr::normal(
                a.coeff.wrapping_mul(b.delta),
                Some(aatom.clone()),
                delta,
            ),
            (Some(aatom), Some(batom)) => {
                // `a_c b_c xy + b_d` plus the cross terms.
                let mut res = Expr::normal(
                    a.coeff.wrapping_mul(b.coeff),
                    Some(Atom::bin_op(AtomOp::Mul, aatom.clone(), batom.clone())),
                    delta,
                );
                if a.delta != 0 {
                    res = res
                        + Expr::normal(a.delta.wrapping_mul(b.coeff), Some(batom.clone()), 0);
                }
                if b.delta != 0 {
                    res = res
                        + Expr::normal(a.coeff.wrapping_mul(b.delta), Some(aatom.clone()), 0);
                }
                res
            }
        }
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        if matches!(self, Expr::Top | Expr::Bot) || matches!(rhs, Expr::Top | Expr::Bot) {
            return self;
        }
        let (Expr::Normal(a), Expr::Normal(b)) = (&self, &rhs) else {
            unreachable!("sentinels handled above");
        };
        if b.coeff == 0 {
            // Scalar divisor. Callers guarantee it is nonzero; degrade
            // instead of dividing when they don't.
            if b.delta == 0 {
                return self;
            }
            Expr::normal(
                a.coeff.wrapping_div(b.delta),
                a.atom.clone(),
                a.delta.wrapping_div(b.delta),
            )
        } else {
            Expr::normal(
                1,
                Some(Atom::bin_op(AtomOp::Div, a.to_atom(), b.to_atom())),
                0,
            )
        }
    }
}

// ----------------------------------------------------------------------
// Lattice
// ----------------------------------------------------------------------

pub fn meet(a: &Expr, b: &Expr) -> Expr {
    if a.le(b) {
        a.clone()
    } else if b.le(a) {
        b.clone()
    } else {
        Expr::Bot
    }
}

pub fn join(a: &Expr, b: &Expr) -> Expr {
    if a.le(b) {
        b.clone()
    } else if b.le(a) {
        a.clone()
    } else {
        Expr::Top
    }
}

impl Lattice for Expr {
    fn join(&self, other: &Self) -> Self {
        join(self, other)
    }

    fn meet(&self, other: &Self) -> Self {
        meet(self, other)
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        self.le(other)
    }
}

impl HasBottom for Expr {
    fn bottom() -> Self {
        Expr::Bot
    }
}

impl HasTop for Expr {
    fn top() -> Self {
        Expr::Top
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Top => write!(f, "top"),
            Expr::Bot => write!(f, "bot"),
            Expr::Normal(n) => {
                if let Some(atom) = &n.atom {
                    if n.coeff != 1 {
                        write!(f, "{} * ", n.coeff)?;
                    }
                    write!(f, "{atom}")?;
                    if n.delta != 0 {
                        write!(f, " + {}", n.delta)?;
                    }
                    Ok(())
                } else {
                    write!(f, "{}", n.delta)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ir::TestValue;

    fn var(raw: usize) -> Expr {
        var_sym_expr(TestValue(raw).into())
    }

    #[test]
    fn atom_cancellation() {
        let x = var(1);
        let diff = x.clone() + (-x.clone());
        assert_eq!(diff.to_scalar(), Some(0));

        let a = x.clone() + Expr::scalar(3);
        let b = x.clone() + Expr::scalar(5);
        assert_eq!((a - b).to_scalar(), Some(-2));
    }

    #[test]
    fn scalar_absorption() {
        let x = var(1);
        let y = var(2);
        let sum = x + y;
        assert_eq!((sum * Expr::scalar(0)).to_scalar(), Some(0));
    }

    #[test]
    fn to_scalar_of_normal_forms() {
        assert_eq!(Expr::scalar(7).to_scalar(), Some(7));
        assert_eq!(var(1).to_scalar(), None);
        assert_eq!(Expr::Top.to_scalar(), None);
    }

    #[test]
    fn sentinel_arithmetic() {
        assert_eq!(-Expr::Top, Expr::Bot);
        assert_eq!(-Expr::Bot, Expr::Top);
        assert_eq!(Expr::Top + Expr::scalar(5), Expr::Top);
        assert_eq!(Expr::scalar(5) + Expr::Bot, Expr::Bot);
        // Multiplication keeps the left-hand side when a sentinel shows up.
        assert_eq!(Expr::scalar(5) * Expr::Top, Expr::scalar(5));
        assert_eq!(Expr::Top * Expr::scalar(5), Expr::Top);
    }

    #[test]
    fn comparator_is_sound_by_default() {
        let x = var(1);
        assert!(Expr::Bot.le(&x));
        assert!(x.le(&Expr::Top));
        assert!(!Expr::Top.le(&x));
        assert!(!x.le(&Expr::Bot));
        assert!(x.le(&x));
        assert!(x.le(&(x.clone() + Expr::scalar(1))));
        assert!(!x.le(&(x.clone() - Expr::scalar(1))));
        // Unrelated symbols are never ordered.
        let y = var(2);
        assert!(!x.le(&y));
        assert!(!y.le(&x));
    }

    #[test]
    fn linear_combinations() {
        let x = var(1);
        let two_x = x.clone() * Expr::scalar(2);
        let three_x = two_x.clone() + x.clone();
        assert_eq!(three_x, x.clone() * Expr::scalar(3));
        // `2x - 2x` cancels through the coefficient rule.
        assert_eq!((two_x.clone() - two_x).to_scalar(), Some(0));
        // `(x + 3) * 2 = 2x + 6`
        let scaled = (x.clone() + Expr::scalar(3)) * Expr::scalar(2);
        assert_eq!(scaled, x * Expr::scalar(2) + Expr::scalar(6));
    }

    #[test]
    fn division() {
        let x = var(1);
        let scaled = x.clone() * Expr::scalar(4) + Expr::scalar(8);
        assert_eq!(scaled / Expr::scalar(4), x.clone() + Expr::scalar(2));
        assert_eq!((Expr::scalar(9) / Expr::scalar(2)).to_scalar(), Some(4));
        // Symbolic divisor builds an opaque quotient atom.
        let quot = Expr::scalar(10) / x.clone();
        assert_eq!(quot.to_scalar(), None);
    }

    #[test]
    fn meet_join_pick_comparable_side() {
        let x = var(1);
        let x1 = x.clone() + Expr::scalar(1);
        assert_eq!(meet(&x, &x1), x);
        assert_eq!(join(&x, &x1), x1);
        let y = var(2);
        assert_eq!(meet(&x, &y), Expr::Bot);
        assert_eq!(join(&x, &y), Expr::Top);
    }
}
