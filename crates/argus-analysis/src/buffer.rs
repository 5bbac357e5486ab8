use argus_ir::{InstrKind, Value, ValueKind};
use argus_symbolic::{Expr, SymRange, const_sym_range};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::analyzer::Analyzer;
use crate::report::ReportSink;

/// Recognizes allocation callsites by callee name. The first argument of a
/// recognized callee is a byte count.
#[derive(Clone, Debug)]
pub struct AllocationOracle {
    names: FxHashSet<String>,
}

impl Default for AllocationOracle {
    fn default() -> Self {
        AllocationOracle::new(["malloc", "xmalloc", "valloc", "aligned_alloc"])
    }
}

impl AllocationOracle {
    pub fn new<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        AllocationOracle {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn is_allocation(&self, callee_name: &str) -> bool {
        self.names.contains(callee_name)
    }
}

impl<S: ReportSink> Analyzer<'_, S> {
    /// Range over the element count (not bytes) of the buffer `v` points to.
    /// An unknown buffer is assumed to hold at least one element.
    pub(crate) fn compute_buffer_size_range(&mut self, v: Value) -> SymRange {
        let m = self.module;
        if let Some(def) = m.def_instr(v) {
            match def.kind() {
                InstrKind::Alloca { count, .. } => {
                    return self.compute_use_range(*count, Some(def.id()));
                }
                InstrKind::Call { callee, args } => {
                    if self.oracle.is_allocation(m.func(*callee).name()) {
                        if let Some(&count) = args.first() {
                            let res = self.compute_use_range(count, Some(def.id()));
                            debug!("allocated {res}");
                            return res;
                        }
                    }
                }
                InstrKind::Bitcast { value, to } => {
                    // An `i8*` to `tau*` cast reinterprets a byte count as
                    // elements of size `k = sizeof(tau)`.
                    if let (Some(src_elem), Some(dst_elem)) =
                        (m.value(*value).ty().pointee(), to.pointee())
                    {
                        if src_elem.int_width() == Some(8) {
                            if let Some(w) = dst_elem.int_width() {
                                if w % 8 == 0 {
                                    let k = Expr::scalar((w / 8) as i64);
                                    return self.compute_buffer_size_range(*value) / &k;
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        } else if let ValueKind::ConstDataArray(vals) = m.value(v).kind() {
            return const_sym_range(vals.len() as i64);
        }

        SymRange::new(Expr::scalar(1), Expr::Top)
    }
}
