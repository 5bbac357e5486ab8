use argus_ir::{Instr, Module, Value};

/// Boolean condition governing one incoming edge of a phi in a Gated-SSA
/// representation. `Value`s refer to integer comparisons.
#[derive(Clone, Debug)]
pub enum GatingCond {
    Simple(Value),
    Negated(Value),
    Conjunction(Box<GatingCond>, Box<GatingCond>),
}

/// Gated-SSA construction.
///
/// Gating-path computation is not realized; `gating_condition` always answers
/// "no condition known", which refinement treats as an absent predicate.
#[derive(Debug, Default)]
pub struct GsaBuilder;

impl GsaBuilder {
    pub fn new() -> Self {
        GsaBuilder
    }

    pub fn build(&mut self, _module: &Module) {}

    pub fn gating_condition(&self, _phi: Instr, _incoming_index: usize) -> Option<&GatingCond> {
        None
    }
}
