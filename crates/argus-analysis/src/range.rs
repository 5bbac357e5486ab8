use argus_ir::{BinOp, Instr, InstrInfo, InstrKind, Value, ValueKind};
use argus_symbolic::{Expr, SymRange, join, meet, to_scalar_range, var_sym_range};
use tracing::debug;

use crate::analyzer::Analyzer;
use crate::common::{Monotony, does_monotonically_depend, extract_const_maybe};
use crate::refine::{Predicate, PredicateKind};
use crate::report::ReportSink;

impl<S: ReportSink> Analyzer<'_, S> {
    /// The def-range of `v` refined by everything known to hold at `p`.
    pub(crate) fn compute_use_range(&mut self, v: Value, p: Option<Instr>) -> SymRange {
        let r = self.compute_def_range(v);
        self.refine_def_range(v, r, p)
    }

    /// Over-approximation of `v`'s values assuming control reaches its
    /// definition. Memoized; cyclic def-use chains are broken by seeding the
    /// cache with `full` while the value is on the `new_val_set` barrier.
    pub(crate) fn compute_def_range(&mut self, v: Value) -> SymRange {
        if let Some(r) = self.ctx.def_ranges.get(&v) {
            return r.clone();
        }

        let m = self.module;
        if let ValueKind::Argument { func, index } = *m.value(v).kind() {
            if let Some(r) = self.ctx.arg_ranges.get(&(func, index)) {
                let r = r.clone();
                self.ctx.def_ranges.insert(v, r.clone());
                return r;
            }
        }

        if m.value(v).is_constant() {
            let r = self.compute_def_range_const(v);
            self.ctx.def_ranges.insert(v, r.clone());
            return r;
        }

        self.ctx.new_val_set.insert(v);
        self.ctx.def_ranges.insert(v, SymRange::full());

        let range = self.compute_def_range_internal(v);
        self.ctx.def_ranges.insert(v, range);

        self.update_def_range(v);
        self.ctx.new_val_set.remove(&v);

        self.ctx
            .def_ranges
            .get(&v)
            .cloned()
            .unwrap_or_else(SymRange::full)
    }

    /// Propagate a tightened range of `v` into users still on the cycle
    /// barrier, intersecting and recursing while anything strictly tightens.
    /// This closes the fixpoint over the currently-active SCC only.
    pub(crate) fn update_def_range(&mut self, v: Value) {
        let m = self.module;
        for use_ in m.value(v).uses() {
            let Some(w) = m.instr(use_.instr).result() else {
                continue;
            };
            if !self.ctx.new_val_set.contains(&w) {
                continue;
            }
            let recomputed = self.compute_def_range_internal(w);
            let cached = self
                .ctx
                .def_ranges
                .get(&w)
                .cloned()
                .unwrap_or_else(SymRange::full);
            let tightened = recomputed & cached.clone();
            if tightened != cached {
                self.ctx.def_ranges.insert(w, tightened);
                self.update_def_range(w);
            }
        }
    }

    fn compute_def_range_const(&mut self, v: Value) -> SymRange {
        let m = self.module;
        match m.value(v).kind() {
            ValueKind::ConstInt(s) => SymRange::singleton(Expr::scalar(*s)),
            _ => {
                debug!(
                    "can't compute def range of constant {v} with type {}",
                    m.value(v).ty()
                );
                var_sym_range(v)
            }
        }
    }

    pub(crate) fn compute_def_range_internal(&mut self, v: Value) -> SymRange {
        let m = self.module;
        let Some(def) = m.def_instr(v) else {
            // Arguments without a summary, and anything else defined outside
            // an instruction, become their own symbol.
            return var_sym_range(v);
        };
        match def.kind() {
            InstrKind::Binary { op, lhs, rhs } => {
                let l = self.compute_use_range(*lhs, Some(def.id()));
                let r = self.compute_use_range(*rhs, Some(def.id()));
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * &r,
                    BinOp::SDiv => l / &r,
                }
            }
            InstrKind::Phi { incoming } => {
                let mut r = SymRange::empty();
                for (index, (inc, _)) in incoming.iter().enumerate() {
                    let mut inc_range = self.compute_use_range(*inc, Some(def.id()));
                    if let Some(cond) = self.gsa.gating_condition(def.id(), index) {
                        let cond = cond.clone();
                        inc_range = self.refine_def_range_gating(*inc, inc_range, &cond);
                    }
                    r |= &inc_range;
                }
                if let [(a, _), (b, _)] = incoming.as_slice() {
                    r = self.refine_phi_monotony(v, def.id(), *a, *b, r);
                    r = self.refine_phi_monotony(v, def.id(), *b, *a, r);
                }
                r
            }
            InstrKind::Load { ptr } => match self.const_aggregate_load_range(def, *ptr) {
                Some(r) => r,
                None => var_sym_range(v),
            },
            InstrKind::Sext { value } | InstrKind::Zext { value } => {
                // zext is handled like sext; negative ranges pass through.
                self.compute_use_range(*value, Some(def.id()))
            }
            InstrKind::Alloca { .. }
            | InstrKind::Gep { .. }
            | InstrKind::Bitcast { .. }
            | InstrKind::Call { .. } => var_sym_range(v),
            _ => match m.value(v).ty().signed_bounds() {
                Some((min, max)) => SymRange::new(Expr::scalar(min), Expr::scalar(max)),
                None => var_sym_range(v),
            },
        }
    }

    /// Loop induction: when one incoming value of a two-way phi is a
    /// monotone affine update of the phi itself, the other incoming value
    /// bounds the phi from one side.
    fn refine_phi_monotony(
        &mut self,
        phi: Value,
        phi_instr: Instr,
        dependent: Value,
        another: Value,
        r: SymRange,
    ) -> SymRange {
        match does_monotonically_depend(self.module, dependent, phi) {
            Monotony::Inc => {
                let pred = Predicate {
                    kind: PredicateKind::Le,
                    lhs: another,
                    rhs: phi,
                    at: phi_instr,
                };
                self.refine_def_range_internal(phi, r, &pred)
            }
            Monotony::Dec => {
                let pred = Predicate {
                    kind: PredicateKind::Le,
                    lhs: phi,
                    rhs: another,
                    at: phi_instr,
                };
                self.refine_def_range_internal(phi, r, &pred)
            }
            Monotony::No => r,
        }
    }

    /// Loads through a two-index gep into a constant data sequence evaluate
    /// to the min/max over the indexed constants; an index range escaping
    /// `[0, len)` is itself a reportable access.
    fn const_aggregate_load_range(
        &mut self,
        load: &InstrInfo,
        ptr: Value,
    ) -> Option<SymRange> {
        let m = self.module;
        let gep = m.def_instr(ptr)?;
        let InstrKind::Gep { base, indices, .. } = gep.kind() else {
            return None;
        };
        let [first, second] = indices.as_slice() else {
            return None;
        };
        let elems: &[i64] = match m.value(*base).kind() {
            ValueKind::ConstDataArray(vals) => vals,
            ValueKind::GlobalVar {
                init: Some(init),
                is_const: true,
            } => match m.value(*init).kind() {
                ValueKind::ConstDataArray(vals) => vals,
                _ => return None,
            },
            _ => return None,
        };
        if extract_const_maybe(m, *first) != Some(0) {
            return None;
        }
        let idx_range = self.compute_use_range(*second, Some(gep.id()));
        let (lo, hi) = to_scalar_range(&idx_range)?;
        let len = elems.len() as i64;
        if lo < 0 || hi >= len {
            self.report_const_aggregate_access(load);
            return None;
        }
        let mut res = SymRange::empty();
        for i in lo..=hi {
            let e = Expr::scalar(elems[i as usize]);
            res.lo = meet(&res.lo, &e);
            res.hi = join(&res.hi, &e);
        }
        Some(res)
    }
}
