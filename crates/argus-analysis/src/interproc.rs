use std::collections::hash_map::Entry;

use argus_ir::{Func, Instr, InstrInfo, InstrKind, Module, ValueKind};
use argus_symbolic::{Atom, Expr, SymRange, const_sym_range};
use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::analyzer::Analyzer;
use crate::context::Verdict;
use crate::report::ReportSink;

/// Direct callees of `f`, in discovery order.
fn called_functions(module: &Module, f: Func) -> IndexSet<Func> {
    let mut res = IndexSet::new();
    for &bb in module.func(f).blocks() {
        for &instr in module.block(bb).instrs() {
            if let InstrKind::Call { callee, .. } = module.instr(instr).kind() {
                res.insert(*callee);
            }
        }
    }
    res
}

/// DFS post-order over the call graph: callees come before callers.
/// Recursion is broken by the visited set; a function on a cycle keeps the
/// position where it was first discovered.
pub(crate) fn call_order(module: &Module) -> Vec<Func> {
    fn dfs(module: &Module, f: Func, visited: &mut FxHashSet<Func>, out: &mut Vec<Func>) {
        if !visited.insert(f) {
            return;
        }
        for callee in called_functions(module, f) {
            dfs(module, callee, visited, out);
        }
        out.push(f);
    }

    let mut visited = FxHashSet::default();
    let mut out = Vec::new();
    for f in module.funcs() {
        dfs(module, f, &mut visited, &mut out);
    }
    out
}

impl<S: ReportSink> Analyzer<'_, S> {
    /// A callsite feeds the interprocedural state twice over: actual
    /// argument ranges union into the callee's per-parameter summaries, and
    /// the callee's pending triggers are evaluated against the actuals.
    pub(crate) fn process_call(&mut self, call: Instr) {
        let m = self.module;
        let info = m.instr(call);
        let InstrKind::Call { callee, args } = info.kind() else {
            return;
        };

        for (index, &arg) in args.iter().enumerate() {
            let range = self.compute_use_range(arg, Some(call));
            let size = self.compute_buffer_size_range(arg);
            match self.ctx.arg_ranges.entry((*callee, index)) {
                Entry::Occupied(mut e) => *e.get_mut() |= &range,
                Entry::Vacant(e) => {
                    e.insert(range);
                }
            }
            match self.ctx.arg_size_ranges.entry((*callee, index)) {
                Entry::Occupied(mut e) => *e.get_mut() |= &size,
                Entry::Vacant(e) => {
                    e.insert(size);
                }
            }
        }

        let triggers = self.ctx.triggers.get(callee).cloned().unwrap_or_default();
        for trigger in triggers {
            debug!("processing trigger: {} <= {}", trigger.lhs, trigger.rhs);
            match self.is_le_arg(&trigger.lhs, &trigger.rhs, info) {
                Verdict::Yes => {
                    debug!("triggered");
                    self.report_overflow(trigger.instr, None, None, true);
                }
                Verdict::Maybe => {
                    debug!("potentially triggered");
                    self.report_overflow(trigger.instr, None, None, false);
                }
                Verdict::No => debug!("didn't trigger"),
            }
        }
    }

    /// Is `e1 <= e2` once parameters are substituted with the actuals of
    /// `call`? The `+ 1` stands in for a strict comparison, which the
    /// expression comparator does not have.
    fn is_le_arg(&mut self, e1: &Expr, e2: &Expr, call: &InstrInfo) -> Verdict {
        let range1 = self.resolve_expr_arg(e1, call);
        let range2 = self.resolve_expr_arg(e2, call);
        debug!("evaluated ranges for trigger: {range1}, {range2}");

        if range1.hi.le(&range2.lo) {
            return Verdict::Yes;
        }
        if range2.hi.le(&(range1.lo.clone() + Expr::scalar(1))) {
            return Verdict::No;
        }
        Verdict::Maybe
    }

    /// Evaluate a trigger expression under the parameter-to-actual
    /// substitution of this callsite.
    fn resolve_expr_arg(&mut self, e: &Expr, call: &InstrInfo) -> SymRange {
        match e.to_atom() {
            Some(atom) => self.resolve_atom_arg(&atom, e, call),
            None => SymRange::singleton(e.clone()),
        }
    }

    fn resolve_atom_arg(&mut self, atom: &Atom, whole: &Expr, call: &InstrInfo) -> SymRange {
        let m = self.module;
        let InstrKind::Call { callee, args } = call.kind() else {
            return SymRange::singleton(whole.clone());
        };
        match atom {
            Atom::Const(c) => const_sym_range(*c),
            Atom::Var(var) => {
                if let ValueKind::Argument { func, index } = m.value(*var).kind() {
                    if func == callee {
                        if let Some(&actual) = args.get(*index) {
                            return self.compute_use_range(actual, Some(call.id()));
                        }
                    } else {
                        warn!("function mismatch while resolving a trigger expression");
                    }
                }
                SymRange::singleton(whole.clone())
            }
            Atom::Linear { coeff, atom } => {
                self.resolve_atom_arg(atom, whole, call) * &Expr::scalar(*coeff)
            }
            Atom::BinOp { .. } => SymRange::singleton(whole.clone()),
        }
    }
}
