use argus_ir::{DomTree, Func, Instr, InstrInfo, InstrKind, Module, Value};
use argus_symbolic::{SymRange, const_sym_range};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::buffer::AllocationOracle;
use crate::common::extract_const_maybe;
use crate::context::{Context, Verdict, VulnerabilityInfo};
use crate::gsa::GsaBuilder;
use crate::interproc::call_order;
use crate::overflow::check_overflow;
use crate::report::{Finding, FindingKind, ReportSink, Severity, Totals};

/// The analysis engine: owns all per-pass state and walks one module.
///
/// Single-threaded and deterministic for a fixed module and oracle. All
/// degradations (unknown constructs, malformed operands) widen ranges rather
/// than abort; only module loading can fail, and that happens before an
/// `Analyzer` exists.
pub struct Analyzer<'a, S: ReportSink> {
    pub(crate) module: &'a Module,
    pub(crate) ctx: Context,
    pub(crate) doms: FxHashMap<Func, DomTree>,
    pub(crate) gsa: GsaBuilder,
    pub(crate) oracle: AllocationOracle,
    report_indeterminate: bool,
    totals: Totals,
    sink: &'a mut S,
}

impl<'a, S: ReportSink> Analyzer<'a, S> {
    pub fn new(
        module: &'a Module,
        oracle: AllocationOracle,
        report_indeterminate: bool,
        sink: &'a mut S,
    ) -> Self {
        Analyzer {
            module,
            ctx: Context::default(),
            doms: FxHashMap::default(),
            gsa: GsaBuilder::new(),
            oracle,
            report_indeterminate,
            totals: Totals::default(),
            sink,
        }
    }

    /// Analyze the whole module and return the terminal counters.
    pub fn run(mut self) -> Totals {
        let m = self.module;
        self.gsa.build(m);
        let order = call_order(m);
        debug!(
            "analyzing module {} ({} functions)",
            m.source_name(),
            order.len()
        );
        for f in order {
            self.analyze_function(f);
        }
        self.totals
    }

    fn analyze_function(&mut self, f: Func) {
        let m = self.module;
        debug!("analyzing function {}", m.func(f).name());
        for &bb in m.func(f).blocks() {
            for &instr in m.block(bb).instrs() {
                self.process_instruction(instr);
            }
        }
    }

    fn process_instruction(&mut self, instr: Instr) {
        let m = self.module;
        match m.instr(instr).kind() {
            InstrKind::Load { ptr } => self.process_memory_access(instr, *ptr),
            InstrKind::Store { ptr, .. } => self.process_memory_access(instr, *ptr),
            InstrKind::Call { .. } => self.process_call(instr),
            _ => {}
        }
    }

    /// Classify the access at `instr` through the pointer `ptr`.
    fn process_memory_access(&mut self, instr: Instr, ptr: Value) {
        let vuln = self.is_access_vulnerable(ptr, instr);
        match vuln.decision {
            Verdict::Yes => {
                self.report_overflow(instr, Some(vuln.idx_range), Some(vuln.size_range), true)
            }
            Verdict::Maybe => {
                self.report_overflow(instr, Some(vuln.idx_range), Some(vuln.size_range), false)
            }
            Verdict::No => self.totals.correct += 1,
        }
    }

    /// Classification is cached per pointer value and never revisited within
    /// a pass.
    fn is_access_vulnerable(&mut self, ptr: Value, instr: Instr) -> VulnerabilityInfo {
        if let Some(cached) = self.ctx.vulnerability_info.get(&ptr) {
            return cached.clone();
        }
        let m = self.module;
        let res = match m.def_instr(ptr) {
            Some(def) if matches!(def.kind(), InstrKind::Gep { .. }) => {
                self.is_access_vulnerable_gep(def.id(), instr)
            }
            _ => VulnerabilityInfo::not_vulnerable(),
        };
        self.ctx.vulnerability_info.insert(ptr, res.clone());
        res
    }

    fn is_access_vulnerable_gep(&mut self, gep: Instr, instr: Instr) -> VulnerabilityInfo {
        let m = self.module;
        let gep_info = m.instr(gep);
        let InstrKind::Gep {
            source_ty,
            base,
            indices,
        } = gep_info.kind()
        else {
            return VulnerabilityInfo::not_vulnerable();
        };
        debug!("processing gep with source element type {source_ty}");

        // A two-index gep with array source and a leading constant zero walks
        // into the array: the element count is the array length and the
        // relevant index is the second one. Everything else is plain pointer
        // arithmetic on the base.
        let array_walk = match (indices.as_slice(), source_ty.array_parts()) {
            ([first, second], Some((_, len)))
                if extract_const_maybe(m, *first) == Some(0) =>
            {
                Some((*second, len))
            }
            _ => None,
        };
        let (buf_size, idx_value) = match array_walk {
            Some((idx, len)) => (const_sym_range(len as i64), idx),
            None => {
                let Some(&first) = indices.first() else {
                    warn!("gep without indices");
                    return VulnerabilityInfo::not_vulnerable();
                };
                (self.compute_buffer_size_range(*base), first)
            }
        };
        debug!("gep base buffer size is in range {buf_size}");

        let idx_range = self.compute_use_range(idx_value, Some(gep));
        debug!("gep index is in range {idx_range}");

        let res = check_overflow(m, &buf_size, &idx_range, instr);
        if !res.triggers.is_empty() {
            let func = m.block(gep_info.parent()).parent();
            self.ctx
                .triggers
                .entry(func)
                .or_default()
                .extend(res.triggers);
        }
        VulnerabilityInfo {
            decision: res.verdict,
            idx_range,
            size_range: buf_size,
        }
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    pub(crate) fn report_overflow(
        &mut self,
        instr: Instr,
        idx_range: Option<SymRange>,
        size_range: Option<SymRange>,
        sure: bool,
    ) {
        if sure {
            self.totals.overflows += 1;
        } else {
            self.totals.indeterminate += 1;
        }
        if !self.report_indeterminate && !sure {
            return;
        }
        let m = self.module;
        let info = m.instr(instr);
        let finding = Finding {
            function: m.block(info.parent()).parent(),
            instr,
            severity: if sure {
                Severity::Definite
            } else {
                Severity::Indeterminate
            },
            kind: FindingKind::Access,
            idx_range,
            size_range,
            loc: info.loc(),
        };
        self.sink.finding(m, &finding);
    }

    pub(crate) fn report_const_aggregate_access(&mut self, load: &InstrInfo) {
        self.totals.overflows += 1;
        let m = self.module;
        let finding = Finding {
            function: m.block(load.parent()).parent(),
            instr: load.id(),
            severity: Severity::Definite,
            kind: FindingKind::ConstAggregate,
            idx_range: None,
            size_range: None,
            loc: load.loc(),
        };
        self.sink.finding(m, &finding);
    }

    /// Dominator tree for `f`, built on first use.
    pub(crate) fn ensure_dom_tree(&mut self, f: Func) {
        if !self.doms.contains_key(&f) {
            let dom = DomTree::compute(self.module, f);
            self.doms.insert(f, dom);
        }
    }
}
