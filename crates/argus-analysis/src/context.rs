use argus_ir::{Func, Instr, Value};
use argus_symbolic::{Expr, SymRange};
use rustc_hash::{FxHashMap, FxHashSet};

/// `(function, parameter index)` — the key of interprocedural summaries.
pub type ArgKey = (Func, usize);

/// Three-valued classification of a memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Definitely overflows.
    Yes,
    /// Definitely in bounds.
    No,
    /// Could not be decided.
    Maybe,
}

#[derive(Clone, Debug)]
pub struct VulnerabilityInfo {
    pub decision: Verdict,
    pub idx_range: SymRange,
    pub size_range: SymRange,
}

impl VulnerabilityInfo {
    pub(crate) fn not_vulnerable() -> Self {
        VulnerabilityInfo {
            decision: Verdict::No,
            idx_range: SymRange::empty(),
            size_range: SymRange::empty(),
        }
    }
}

/// A deferred interprocedural obligation: if `lhs <= rhs` holds once the
/// callee's parameters are substituted with actuals at some callsite, the
/// access at `instr` overflows.
#[derive(Clone, Debug)]
pub struct Trigger {
    pub lhs: Expr,
    pub rhs: Expr,
    pub instr: Instr,
}

/// Shared tables of one analysis pass. Mutated only by the solver.
///
/// Invariant: a value cached in `def_ranges` is either finalized (not in
/// `new_val_set`) or carries the provisional `full` seed while its range is
/// being computed.
#[derive(Debug, Default)]
pub(crate) struct Context {
    pub def_ranges: FxHashMap<Value, SymRange>,
    pub new_val_set: FxHashSet<Value>,
    pub vulnerability_info: FxHashMap<Value, VulnerabilityInfo>,
    pub arg_ranges: FxHashMap<ArgKey, SymRange>,
    pub arg_size_ranges: FxHashMap<ArgKey, SymRange>,
    // Vec per function keeps discharge order deterministic.
    pub triggers: FxHashMap<Func, Vec<Trigger>>,
}
