use smallvec::SmallVec;

use crate::arena::Id;
use crate::block::Block;
use crate::function::Func;
use crate::identifier;
use crate::types::Ty;
use crate::value::Value;

identifier! {
    /// An Id reference to an instruction in the arena.
    ///
    /// Instructions double as the analysis' program points: what matters for
    /// predicate collection is the containing basic block.
    struct Instr
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{}", self.0.raw())
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum IcmpPred {
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl IcmpPred {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IcmpPred::Eq => "eq",
            IcmpPred::Ne => "ne",
            IcmpPred::Ult => "ult",
            IcmpPred::Ule => "ule",
            IcmpPred::Ugt => "ugt",
            IcmpPred::Uge => "uge",
            IcmpPred::Slt => "slt",
            IcmpPred::Sle => "sle",
            IcmpPred::Sgt => "sgt",
            IcmpPred::Sge => "sge",
        }
    }
}

/// Debug location attached to an instruction (`file` lives on the module).
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct SrcLoc {
    pub line: u32,
    pub col: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstrInfo {
    pub(crate) id: Instr,
    pub(crate) parent: Block,
    pub(crate) result: Option<Value>,
    pub(crate) kind: InstrKind,
    pub(crate) loc: Option<SrcLoc>,
}

impl InstrInfo {
    pub fn id(&self) -> Instr {
        self.id
    }

    pub fn parent(&self) -> Block {
        self.parent
    }

    pub fn result(&self) -> Option<Value> {
        self.result
    }

    pub fn kind(&self) -> &InstrKind {
        &self.kind
    }

    pub fn loc(&self) -> Option<SrcLoc> {
        self.loc
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstrKind {
    /// Stack allocation of `count` elements of `elem_ty`.
    Alloca { elem_ty: Ty, count: Value },
    Binary {
        op: BinOp,
        lhs: Value,
        rhs: Value,
    },
    Phi {
        incoming: SmallVec<[(Value, Block); 2]>,
    },
    Load { ptr: Value },
    Store { value: Value, ptr: Value },
    Gep {
        source_ty: Ty,
        base: Value,
        indices: SmallVec<[Value; 2]>,
    },
    Bitcast { value: Value, to: Ty },
    Sext { value: Value },
    Zext { value: Value },
    Icmp {
        pred: IcmpPred,
        lhs: Value,
        rhs: Value,
    },
    Br {
        cond: Option<Value>,
        then_dest: Block,
        else_dest: Option<Block>,
    },
    Ret { value: Option<Value> },
    Call {
        callee: Func,
        args: SmallVec<[Value; 4]>,
    },
}

impl InstrKind {
    /// Value operands in a fixed order; use-edge indices refer to this order.
    pub fn operands(&self) -> SmallVec<[Value; 4]> {
        let mut out = SmallVec::new();
        match self {
            InstrKind::Alloca { count, .. } => out.push(*count),
            InstrKind::Binary { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            InstrKind::Phi { incoming } => out.extend(incoming.iter().map(|(v, _)| *v)),
            InstrKind::Load { ptr } => out.push(*ptr),
            InstrKind::Store { value, ptr } => {
                out.push(*value);
                out.push(*ptr);
            }
            InstrKind::Gep { base, indices, .. } => {
                out.push(*base);
                out.extend(indices.iter().copied());
            }
            InstrKind::Bitcast { value, .. }
            | InstrKind::Sext { value }
            | InstrKind::Zext { value } => out.push(*value),
            InstrKind::Icmp { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            InstrKind::Br { cond, .. } => out.extend(cond.iter().copied()),
            InstrKind::Ret { value } => out.extend(value.iter().copied()),
            InstrKind::Call { args, .. } => out.extend(args.iter().copied()),
        }
        out
    }

    pub fn successors(&self) -> SmallVec<[Block; 2]> {
        let mut out = SmallVec::new();
        if let InstrKind::Br {
            then_dest,
            else_dest,
            ..
        } = self
        {
            out.push(*then_dest);
            out.extend(else_dest.iter().copied());
        }
        out
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, InstrKind::Br { .. } | InstrKind::Ret { .. })
    }
}
