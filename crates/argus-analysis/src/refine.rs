use argus_ir::{BinOp, Block, DomTree, IcmpPred, Instr, InstrKind, Module, Value};
use argus_symbolic::{Expr, Scalar, SymRange};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::analyzer::Analyzer;
use crate::common::extract_const_maybe;
use crate::gsa::GatingCond;
use crate::report::ReportSink;

/// Visit cap of the custom reachability walk. Exhausting it answers
/// "reachable", which suppresses the predicate instead of inventing one.
pub const REACHABILITY_VISIT_LIMIT: u32 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PredicateKind {
    Eq,
    Ne,
    /// `lhs < rhs`.
    Lt,
    /// `lhs <= rhs`.
    Le,
}

/// A comparison known to hold at `at`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Predicate {
    pub kind: PredicateKind,
    pub lhs: Value,
    pub rhs: Value,
    pub at: Instr,
}

/// Like plain CFG reachability from `source` to `dest`, but ignoring the
/// outgoing edges of `checkpoint` (the dominator whose branch is being
/// examined). Bounded: visiting more than [`REACHABILITY_VISIT_LIMIT`]
/// blocks conservatively answers "reachable".
fn is_potentially_reachable_custom(
    module: &Module,
    dom: &DomTree,
    source: Block,
    dest: Block,
    checkpoint: Block,
) -> bool {
    if !dom.is_reachable_from_entry(dest) {
        return false;
    }
    let mut limit = REACHABILITY_VISIT_LIMIT;
    let mut worklist = vec![source];
    let mut visited: FxHashSet<Block> = FxHashSet::default();
    while let Some(bb) = worklist.pop() {
        if !visited.insert(bb) {
            continue;
        }
        if bb == dest {
            return true;
        }
        limit -= 1;
        if limit == 0 {
            return true;
        }
        if bb != checkpoint {
            worklist.extend(module.successors(bb));
        }
    }
    false
}

/// Translate an icmp under a branch polarity into the normalized predicate
/// shape. Returns the kind and whether the icmp operands must swap so that
/// `Lt`/`Le` always read left-to-right.
fn branch_predicate(pred: IcmpPred, is_true_succ: bool) -> (PredicateKind, bool) {
    use IcmpPred::*;
    use PredicateKind as P;
    match pred {
        Eq => (if is_true_succ { P::Eq } else { P::Ne }, false),
        Ne => (if is_true_succ { P::Ne } else { P::Eq }, false),
        Ugt | Sgt => {
            if is_true_succ {
                (P::Lt, true)
            } else {
                (P::Le, false)
            }
        }
        Uge | Sge => {
            if is_true_succ {
                (P::Le, true)
            } else {
                (P::Lt, false)
            }
        }
        Ult | Slt => {
            if is_true_succ {
                (P::Lt, false)
            } else {
                (P::Le, true)
            }
        }
        Ule | Sle => {
            if is_true_succ {
                (P::Le, false)
            } else {
                (P::Lt, true)
            }
        }
    }
}

/// Translate an icmp asserted by a gating condition. This is not the branch
/// table with `is_true_succ = true`: gating conditions take the non-strict
/// reading of `<`/`<=` (`ULT`/`SLT` become `Le`, `ULE`/`SLE` become `Lt`),
/// and neither swaps its operands.
fn gating_predicate(pred: IcmpPred) -> (PredicateKind, bool) {
    use IcmpPred::*;
    use PredicateKind as P;
    match pred {
        Eq => (P::Eq, false),
        Ne => (P::Ne, false),
        Ugt | Sgt => (P::Lt, true),
        Uge | Sge => (P::Le, true),
        Ult | Slt => (P::Le, false),
        Ule | Sle => (P::Lt, false),
    }
}

fn negate_predicate(pred: &mut Predicate) {
    match pred.kind {
        PredicateKind::Eq => pred.kind = PredicateKind::Ne,
        PredicateKind::Ne => pred.kind = PredicateKind::Eq,
        PredicateKind::Lt => {
            pred.kind = PredicateKind::Le;
            std::mem::swap(&mut pred.lhs, &mut pred.rhs);
        }
        PredicateKind::Le => {
            pred.kind = PredicateKind::Lt;
            std::mem::swap(&mut pred.lhs, &mut pred.rhs);
        }
    }
}

/// Scalars `(coeff, delta)` such that `v = coeff * to_match_with + delta`
/// syntactically in the IR.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MatchRes {
    pub coeff: Scalar,
    pub delta: Scalar,
}

pub(crate) fn match_var(module: &Module, v: Value, to_match_with: Value) -> Option<MatchRes> {
    if v == to_match_with {
        return Some(MatchRes { coeff: 1, delta: 0 });
    }

    if let Some(def) = module.def_instr(to_match_with) {
        if let InstrKind::Binary { op, lhs, rhs } = def.kind() {
            if *lhs != v && *rhs != v {
                return None;
            }
            let v_is_first = *lhs == v;
            let other = if v_is_first { *rhs } else { *lhs };
            if let Some(scalar) = extract_const_maybe(module, other) {
                match op {
                    BinOp::Add => {
                        return Some(MatchRes {
                            coeff: 1,
                            delta: scalar.wrapping_neg(),
                        });
                    }
                    BinOp::Sub => {
                        return Some(if v_is_first {
                            MatchRes {
                                coeff: 1,
                                delta: scalar,
                            }
                        } else {
                            MatchRes {
                                coeff: -1,
                                delta: scalar,
                            }
                        });
                    }
                    BinOp::SDiv if v_is_first => {
                        return Some(MatchRes {
                            coeff: scalar,
                            delta: 0,
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(def) = module.def_instr(v) {
        if let InstrKind::Binary { op, lhs, rhs } = def.kind() {
            if *lhs != to_match_with && *rhs != to_match_with {
                return None;
            }
            let tmw_is_first = *lhs == to_match_with;
            let other = if tmw_is_first { *rhs } else { *lhs };
            if let Some(scalar) = extract_const_maybe(module, other) {
                match op {
                    BinOp::Add => {
                        return Some(MatchRes {
                            coeff: 1,
                            delta: scalar,
                        });
                    }
                    BinOp::Sub => {
                        return Some(if tmw_is_first {
                            MatchRes {
                                coeff: 1,
                                delta: scalar.wrapping_neg(),
                            }
                        } else {
                            MatchRes {
                                coeff: -1,
                                delta: scalar,
                            }
                        });
                    }
                    BinOp::Mul => {
                        return Some(MatchRes {
                            coeff: scalar,
                            delta: 0,
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    None
}

impl<S: ReportSink> Analyzer<'_, S> {
    /// Fold every predicate proven to hold at `p` into `def_range`.
    pub(crate) fn refine_def_range(
        &mut self,
        v: Value,
        def_range: SymRange,
        p: Option<Instr>,
    ) -> SymRange {
        let Some(p) = p else {
            return def_range;
        };
        let bb = self.module.instr(p).parent();
        let predicates = self.collect_predicates(bb);
        predicates
            .into_iter()
            .fold(def_range, |r, pred| self.refine_def_range_internal(v, r, &pred))
    }

    pub(crate) fn refine_def_range_gating(
        &mut self,
        v: Value,
        def_range: SymRange,
        cond: &GatingCond,
    ) -> SymRange {
        let mut predicates = Vec::new();
        self.collect_gating_predicates(cond, false, &mut predicates);
        predicates
            .into_iter()
            .fold(def_range, |r, pred| self.refine_def_range_internal(v, r, &pred))
    }

    /// Predicates holding on entry to `bb`: one per properly-dominating
    /// conditional branch whose outcome is pinned by which successor can
    /// still reach `bb` without going back through the dominator.
    pub(crate) fn collect_predicates(&mut self, bb: Block) -> Vec<Predicate> {
        let m = self.module;
        let func = m.block(bb).parent();
        self.ensure_dom_tree(func);
        let dom = &self.doms[&func];

        let mut predicates = Vec::new();
        for &dominator in m.func(func).blocks() {
            if !dom.properly_dominates(dominator, bb) {
                continue;
            }
            let Some(term) = m.block(dominator).terminator() else {
                continue;
            };
            let InstrKind::Br {
                cond: Some(cond),
                then_dest,
                else_dest: Some(else_dest),
            } = m.instr(term).kind()
            else {
                continue;
            };
            let reachable_from_true =
                is_potentially_reachable_custom(m, dom, *then_dest, bb, dominator);
            let reachable_from_false =
                is_potentially_reachable_custom(m, dom, *else_dest, bb, dominator);
            let is_true_succ = match (reachable_from_true, reachable_from_false) {
                (true, false) => true,
                (false, true) => false,
                _ => continue,
            };
            let Some(cmp) = m.def_instr(*cond) else {
                continue;
            };
            let InstrKind::Icmp { pred, lhs, rhs } = cmp.kind() else {
                continue;
            };
            let (kind, swap) = branch_predicate(*pred, is_true_succ);
            let (lhs, rhs) = if swap { (*rhs, *lhs) } else { (*lhs, *rhs) };
            predicates.push(Predicate {
                kind,
                lhs,
                rhs,
                at: cmp.id(),
            });
        }
        predicates
    }

    /// Translate a gating condition into predicates; conditions are asserted
    /// true, negation flips the relation.
    fn collect_gating_predicates(
        &self,
        cond: &GatingCond,
        negated: bool,
        out: &mut Vec<Predicate>,
    ) {
        match cond {
            GatingCond::Simple(value) | GatingCond::Negated(value) => {
                let negate = negated ^ matches!(cond, GatingCond::Negated(_));
                let Some(cmp) = self.module.def_instr(*value) else {
                    return;
                };
                let InstrKind::Icmp { pred, lhs, rhs } = cmp.kind() else {
                    return;
                };
                let (kind, swap) = gating_predicate(*pred);
                let (lhs, rhs) = if swap { (*rhs, *lhs) } else { (*lhs, *rhs) };
                let mut predicate = Predicate {
                    kind,
                    lhs,
                    rhs,
                    at: cmp.id(),
                };
                if negate {
                    negate_predicate(&mut predicate);
                }
                out.push(predicate);
            }
            GatingCond::Conjunction(lhs, rhs) => {
                self.collect_gating_predicates(lhs, negated, out);
                self.collect_gating_predicates(rhs, negated, out);
            }
        }
    }

    /// Refine `def_range` of `v` knowing that `pred` holds.
    pub(crate) fn refine_def_range_internal(
        &mut self,
        v: Value,
        def_range: SymRange,
        pred: &Predicate,
    ) -> SymRange {
        if pred.kind == PredicateKind::Ne {
            if let Some(r) = self.refine_ne_induction(v, &def_range, pred) {
                return r;
            }
        }

        let m = self.module;
        let (op2, mres) = if let Some(mres) = match_var(m, v, pred.lhs) {
            (pred.rhs, mres)
        } else if let Some(mres) = match_var(m, v, pred.rhs) {
            (pred.lhs, mres)
        } else {
            return def_range;
        };

        let op2_range = self.compute_use_range(op2, Some(pred.at));

        if pred.kind == PredicateKind::Ne {
            // Only a pinned operand can poke a hole, and only at an endpoint.
            if op2_range.lo == op2_range.hi {
                if let Some(s) = op2_range.lo.to_scalar() {
                    let transformed = mres.coeff.wrapping_mul(s).wrapping_add(mres.delta);
                    if def_range.lo.to_scalar() == Some(transformed) {
                        return SymRange::new(
                            Expr::scalar(transformed.wrapping_add(1)),
                            def_range.hi,
                        );
                    }
                    if def_range.hi.to_scalar() == Some(transformed) {
                        return SymRange::new(
                            def_range.lo,
                            Expr::scalar(transformed.wrapping_sub(1)),
                        );
                    }
                }
            }
            return def_range;
        }

        let coeff = Expr::scalar(mres.coeff);
        let delta = Expr::scalar(mres.delta);
        let one = Expr::scalar(1);
        let upper_side = (op2 == pred.rhs) ^ (mres.coeff < 0);
        let to_intersect = match pred.kind {
            PredicateKind::Eq => {
                (op2_range * &coeff) + SymRange::singleton(delta)
            }
            PredicateKind::Lt => {
                if upper_side {
                    SymRange::new(Expr::Bot, coeff * op2_range.hi + delta - one)
                } else {
                    SymRange::new(coeff * op2_range.lo + delta + one, Expr::Top)
                }
            }
            PredicateKind::Le => {
                if upper_side {
                    SymRange::new(Expr::Bot, coeff * op2_range.hi + delta)
                } else {
                    SymRange::new(coeff * op2_range.lo + delta, Expr::Top)
                }
            }
            PredicateKind::Ne => return def_range,
        };
        debug!("control dependency leads to intersection with {to_intersect}");
        def_range & to_intersect
    }

    /// `NE` on an induction variable: for `x = phi(a, x + t)` with a fixed
    /// sign of `t`, if `(y - a) / t` is a whole number of steps then `x`
    /// never passes `y`, so `x != y` bounds `x` strictly by `y`.
    fn refine_ne_induction(
        &mut self,
        v: Value,
        def_range: &SymRange,
        pred: &Predicate,
    ) -> Option<SymRange> {
        let m = self.module;
        let def = m.def_instr(v)?;
        let InstrKind::Phi { incoming } = def.kind() else {
            return None;
        };
        let y = if pred.lhs == v {
            pred.rhs
        } else if pred.rhs == v {
            pred.lhs
        } else {
            return None;
        };
        let [(a, _), (inc1, _)] = incoming.as_slice() else {
            return None;
        };
        let f = m.def_instr(*inc1)?;
        let InstrKind::Binary {
            op: BinOp::Add,
            lhs,
            rhs,
        } = f.kind()
        else {
            return None;
        };
        let t = if *lhs == v {
            *rhs
        } else if *rhs == v {
            *lhs
        } else {
            return None;
        };

        let t_range = self.compute_use_range(t, Some(pred.at));
        let zero = Expr::scalar(0);
        let t_positive = if zero.le(&t_range.lo) {
            true
        } else if t_range.hi.le(&zero) {
            false
        } else {
            return None;
        };

        let a_range = self.compute_use_range(*a, Some(pred.at));
        let y_range = self.compute_use_range(y, Some(pred.at));
        let d = y_range.clone() - a_range;
        if d.lo != d.hi || t_range.lo != t_range.hi {
            return None;
        }
        let steps = d.lo / t_range.lo;
        steps.to_scalar()?;

        let one = Expr::scalar(1);
        let to_intersect = if t_positive {
            SymRange::new(Expr::Bot, y_range.hi - one)
        } else {
            SymRange::new(y_range.lo + one, Expr::Top)
        };
        debug!("induction variable bound leads to intersection with {to_intersect}");
        Some(def_range.clone() & to_intersect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AllocationOracle;
    use crate::report::CollectingReporter;
    use argus_ir::{FunctionBuilder, Module, Ty};

    #[test]
    fn match_var_affine_shapes() {
        let mut m = Module::new("t.c");
        let f = m.declare_function("f", vec![(Some("u".into()), Ty::Int(64))], Ty::Void);
        let mut b = FunctionBuilder::new(&mut m, f);
        b.block("entry");
        let u = b.param(0);
        let c3 = b.const_int(Ty::Int(64), 3);
        let v_add = b.binary(BinOp::Add, u, c3); // v = u + 3
        let v_sub = b.binary(BinOp::Sub, u, c3); // v = u - 3
        let v_rsub = b.binary(BinOp::Sub, c3, u); // v = 3 - u
        let v_mul = b.binary(BinOp::Mul, u, c3); // v = 3u
        let w_div = b.binary(BinOp::SDiv, u, c3); // w = u / 3, so u ~ 3w
        b.ret(None);

        let r = match_var(&m, u, u).unwrap();
        assert_eq!((r.coeff, r.delta), (1, 0));
        let r = match_var(&m, v_add, u).unwrap();
        assert_eq!((r.coeff, r.delta), (1, 3));
        let r = match_var(&m, v_sub, u).unwrap();
        assert_eq!((r.coeff, r.delta), (1, -3));
        let r = match_var(&m, v_rsub, u).unwrap();
        assert_eq!((r.coeff, r.delta), (-1, 3));
        let r = match_var(&m, v_mul, u).unwrap();
        assert_eq!((r.coeff, r.delta), (3, 0));
        let r = match_var(&m, u, w_div).unwrap();
        assert_eq!((r.coeff, r.delta), (3, 0));
        assert!(match_var(&m, v_add, v_mul).is_none());
    }

    #[test]
    fn ne_predicate_trims_matching_endpoint() {
        let mut m = Module::new("t.c");
        let f = m.declare_function("f", vec![(Some("x".into()), Ty::Int(64))], Ty::Void);
        let point = {
            let mut b = FunctionBuilder::new(&mut m, f);
            let entry = b.block("entry");
            let then = b.block("then");
            let exit = b.block("exit");
            b.set_block(entry);
            let x = b.param(0);
            let c9 = b.const_int(Ty::Int(64), 9);
            let cond = b.icmp(IcmpPred::Ne, x, c9);
            b.cond_br(cond, then, exit);
            b.set_block(then);
            let point = b.ret(None);
            b.set_block(exit);
            b.ret(None);
            point
        };

        let x = m.func(f).params()[0];
        let mut sink = CollectingReporter::default();
        let mut analyzer = Analyzer::new(&m, AllocationOracle::default(), true, &mut sink);
        analyzer
            .ctx
            .arg_ranges
            .insert((f, 0), SymRange::new(Expr::scalar(0), Expr::scalar(9)));
        let refined = analyzer.compute_use_range(x, Some(point));
        assert_eq!(refined, SymRange::new(Expr::scalar(0), Expr::scalar(8)));
    }

    #[test]
    fn gating_condition_translation() {
        let mut m = Module::new("t.c");
        let f = m.declare_function(
            "f",
            vec![(Some("a".into()), Ty::Int(64)), (Some("b".into()), Ty::Int(64))],
            Ty::Void,
        );
        let mut b = FunctionBuilder::new(&mut m, f);
        b.block("entry");
        let a = b.param(0);
        let bb = b.param(1);
        let sgt = b.icmp(IcmpPred::Sgt, a, bb);
        let eq = b.icmp(IcmpPred::Eq, a, bb);
        let slt = b.icmp(IcmpPred::Slt, a, bb);
        let sle = b.icmp(IcmpPred::Sle, a, bb);
        let ult = b.icmp(IcmpPred::Ult, a, bb);
        let ule = b.icmp(IcmpPred::Ule, a, bb);
        b.ret(None);

        let mut sink = CollectingReporter::default();
        let analyzer = Analyzer::new(&m, AllocationOracle::default(), true, &mut sink);

        // `a > b` asserted true reads as `b < a`.
        let mut out = Vec::new();
        analyzer.collect_gating_predicates(&GatingCond::Simple(sgt), false, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, PredicateKind::Lt);
        assert_eq!((out[0].lhs, out[0].rhs), (bb, a));

        // The less-than side takes the non-strict reading and keeps its
        // operand order: `a < b` reads as `a <= b`, `a <= b` as `a < b`.
        // Signedness does not matter.
        for (cond, kind) in [
            (slt, PredicateKind::Le),
            (ult, PredicateKind::Le),
            (sle, PredicateKind::Lt),
            (ule, PredicateKind::Lt),
        ] {
            let mut out = Vec::new();
            analyzer.collect_gating_predicates(&GatingCond::Simple(cond), false, &mut out);
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].kind, kind);
            assert_eq!((out[0].lhs, out[0].rhs), (a, bb));
        }

        // Negation flips the relation and the operands.
        let mut out = Vec::new();
        analyzer.collect_gating_predicates(&GatingCond::Negated(sgt), false, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, PredicateKind::Le);
        assert_eq!((out[0].lhs, out[0].rhs), (a, bb));

        // Conjunctions concatenate both sides.
        let conj = GatingCond::Conjunction(
            Box::new(GatingCond::Simple(sgt)),
            Box::new(GatingCond::Negated(eq)),
        );
        let mut out = Vec::new();
        analyzer.collect_gating_predicates(&conj, false, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].kind, PredicateKind::Lt);
        assert_eq!(out[1].kind, PredicateKind::Ne);
    }
}
