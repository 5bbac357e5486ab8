use argus_ir::{Instr, InstrKind, Module, Value, ValueKind};
use argus_symbolic::{Atom, Expr, SymRange};

use crate::context::{Trigger, Verdict};

/// Outcome of the overflow decision: a verdict, or deferred triggers when the
/// inconclusive endpoints are argument-only.
pub(crate) struct CheckOverflowResult {
    pub verdict: Verdict,
    pub triggers: Vec<Trigger>,
}

fn verdict(verdict: Verdict) -> CheckOverflowResult {
    CheckOverflowResult {
        verdict,
        triggers: Vec::new(),
    }
}

/// Three-valued comparison of an index range against a size range.
///
/// Definitely overflowing when the size's upper end is provably at or below
/// the index's upper end, or the index can be negative; definitely safe when
/// the whole index range fits below the smallest possible size. Inconclusive
/// argument-only endpoints turn into triggers instead of a verdict.
pub(crate) fn check_overflow(
    module: &Module,
    size_range: &SymRange,
    idx_range: &SymRange,
    instr: Instr,
) -> CheckOverflowResult {
    if size_range.hi.le(&idx_range.hi) || idx_range.lo.le(&Expr::scalar(-1)) {
        return verdict(Verdict::Yes);
    }

    let mut triggers = Vec::new();
    if is_argument_only_expr(module, &size_range.hi) && is_argument_only_expr(module, &idx_range.hi)
    {
        triggers.push(Trigger {
            lhs: size_range.hi.clone(),
            rhs: idx_range.hi.clone(),
            instr,
        });
    }
    if is_argument_only_expr(module, &idx_range.lo) {
        triggers.push(Trigger {
            lhs: idx_range.lo.clone(),
            rhs: Expr::scalar(-1),
            instr,
        });
    }
    if !triggers.is_empty() {
        return CheckOverflowResult {
            verdict: Verdict::No,
            triggers,
        };
    }

    if Expr::scalar(0).le(&idx_range.lo)
        && idx_range.hi.le(&(size_range.lo.clone() - Expr::scalar(1)))
    {
        return verdict(Verdict::No);
    }

    verdict(Verdict::Maybe)
}

/// A value is argument-only when it is a formal parameter, possibly behind
/// sign/zero extensions.
fn is_argument_only_value(module: &Module, v: Value) -> bool {
    if matches!(module.value(v).kind(), ValueKind::Argument { .. }) {
        return true;
    }
    if let Some(def) = module.def_instr(v) {
        if let InstrKind::Sext { value } | InstrKind::Zext { value } = def.kind() {
            return is_argument_only_value(module, *value);
        }
    }
    false
}

fn is_argument_only_atom(module: &Module, atom: &Atom) -> bool {
    match atom {
        Atom::Const(_) => true,
        Atom::Var(v) => is_argument_only_value(module, *v),
        Atom::Linear { atom, .. } => is_argument_only_atom(module, atom),
        Atom::BinOp { lhs, rhs, .. } => {
            is_argument_only_atom(module, lhs) && is_argument_only_atom(module, rhs)
        }
    }
}

/// True when every atom of `e` refers only to parameters and constants.
pub(crate) fn is_argument_only_expr(module: &Module, e: &Expr) -> bool {
    match e.to_atom() {
        Some(atom) => is_argument_only_atom(module, &atom),
        None => false,
    }
}
