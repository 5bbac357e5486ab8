use std::io;

use argus_ir::{Func, Instr, Module, SrcLoc};
use argus_symbolic::SymRange;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Definite,
    Indeterminate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindingKind {
    /// An out-of-bounds (or possibly out-of-bounds) memory access.
    Access,
    /// A load from a constant aggregate with an out-of-bounds index.
    ConstAggregate,
}

/// One classified memory access, as handed to the report sink.
///
/// Ranges are absent on findings produced by trigger discharge, where the
/// offending ranges belong to a callsite other than `instr`.
#[derive(Clone, Debug)]
pub struct Finding {
    pub function: Func,
    pub instr: Instr,
    pub severity: Severity,
    pub kind: FindingKind,
    pub idx_range: Option<SymRange>,
    pub size_range: Option<SymRange>,
    pub loc: Option<SrcLoc>,
}

/// Sink for structured findings.
pub trait ReportSink {
    fn finding(&mut self, module: &Module, finding: &Finding);
}

/// Collects findings in memory; used by tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub findings: Vec<Finding>,
}

impl ReportSink for CollectingReporter {
    fn finding(&mut self, _module: &Module, finding: &Finding) {
        self.findings.push(finding.clone());
    }
}

/// Writes findings as single lines, one per access.
pub struct TextReporter<W: io::Write> {
    out: W,
}

impl<W: io::Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        TextReporter { out }
    }
}

impl<W: io::Write> ReportSink for TextReporter<W> {
    fn finding(&mut self, module: &Module, finding: &Finding) {
        if let Err(err) = write_finding(&mut self.out, module, finding) {
            warn!("failed to write finding: {err}");
        }
    }
}

fn write_finding<W: io::Write>(
    out: &mut W,
    module: &Module,
    finding: &Finding,
) -> io::Result<()> {
    if let Some(loc) = finding.loc {
        write!(
            out,
            "{}:{}:{} | ",
            module.source_name(),
            loc.line,
            loc.col
        )?;
    }
    let func_name = module.func(finding.function).name();
    let snippet = module.display_instr(finding.instr);
    match finding.kind {
        FindingKind::Access => {
            let how = match finding.severity {
                Severity::Definite => "is possible",
                Severity::Indeterminate => "may be possible (but not surely)",
            };
            write!(
                out,
                "overflow {how} in function {func_name}, instruction {{ {snippet} }}"
            )?;
            if let (Some(idx), Some(size)) = (&finding.idx_range, &finding.size_range) {
                write!(out, ", index range: {idx}, size range: {size}")?;
            }
        }
        FindingKind::ConstAggregate => {
            write!(
                out,
                "vulnerable access of constant aggregate in function {func_name}, \
                 instruction {{ {snippet} }}"
            )?;
        }
    }
    writeln!(out)
}

/// Terminal counters of one analysis pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub overflows: u64,
    pub indeterminate: u64,
    pub correct: u64,
}

impl std::fmt::Display for Totals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total number of possible overflows: {}, total number of indeterminate cases: {}, \
             total number of correct memory usages: {}",
            self.overflows, self.indeterminate, self.correct
        )
    }
}
