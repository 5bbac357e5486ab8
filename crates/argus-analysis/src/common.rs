use argus_ir::{BinOp, InstrKind, Module, Value, ValueKind};
use argus_symbolic::Scalar;

/// The scalar behind `v` when it is an integer constant.
pub(crate) fn extract_const_maybe(module: &Module, v: Value) -> Option<Scalar> {
    match module.value(v).kind() {
        ValueKind::ConstInt(s) => Some(*s),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Monotony {
    /// Not monotonic (or not recognized).
    No,
    /// Non-decreasing.
    Inc,
    /// Non-increasing.
    Dec,
}

/// Whether `dependent = f(x)` for a monotonically non-decreasing or
/// non-increasing affine update `f`. Only `x + k` and `x - k` shapes are
/// recognized.
pub(crate) fn does_monotonically_depend(module: &Module, dependent: Value, x: Value) -> Monotony {
    let Some(def) = module.def_instr(dependent) else {
        return Monotony::No;
    };
    let InstrKind::Binary { op, lhs, rhs } = def.kind() else {
        return Monotony::No;
    };
    if *lhs != x && *rhs != x {
        return Monotony::No;
    }
    let x_is_first = *lhs == x;
    let other = if x_is_first { *rhs } else { *lhs };
    let Some(scalar) = extract_const_maybe(module, other) else {
        return Monotony::No;
    };
    match op {
        BinOp::Add => {
            if scalar > 0 {
                Monotony::Inc
            } else {
                Monotony::Dec
            }
        }
        BinOp::Sub if x_is_first => {
            if scalar > 0 {
                Monotony::Dec
            } else {
                Monotony::Inc
            }
        }
        _ => Monotony::No,
    }
}
