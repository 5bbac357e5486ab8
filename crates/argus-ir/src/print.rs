use std::fmt;

use crate::block::Block;
use crate::instr::{Instr, InstrKind};
use crate::module::Module;
use crate::value::{Value, ValueKind};

/// One-line disassembly of an instruction, for reports and logs.
pub struct DisplayInstr<'a> {
    module: &'a Module,
    instr: Instr,
}

impl Module {
    pub fn display_instr(&self, instr: Instr) -> DisplayInstr<'_> {
        DisplayInstr {
            module: self,
            instr,
        }
    }
}

fn fmt_value(f: &mut fmt::Formatter<'_>, module: &Module, v: Value) -> fmt::Result {
    let info = module.value(v);
    match info.kind() {
        ValueKind::ConstInt(n) => write!(f, "{n}"),
        ValueKind::GlobalVar { .. } => match info.name() {
            Some(name) => write!(f, "@{name}"),
            None => write!(f, "{v}"),
        },
        ValueKind::Function(func) => write!(f, "@{}", module.func(*func).name()),
        _ => match info.name() {
            Some(name) => write!(f, "%{name}"),
            None => write!(f, "{v}"),
        },
    }
}

fn fmt_block(f: &mut fmt::Formatter<'_>, module: &Module, b: Block) -> fmt::Result {
    match module.block(b).name() {
        Some(name) => write!(f, "^{name}"),
        None => write!(f, "{b}"),
    }
}

impl fmt::Display for DisplayInstr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.module;
        let info = m.instr(self.instr);
        if let Some(result) = info.result() {
            fmt_value(f, m, result)?;
            write!(f, " = ")?;
        }
        match info.kind() {
            InstrKind::Alloca { elem_ty, count } => {
                write!(f, "alloca {elem_ty}, ")?;
                fmt_value(f, m, *count)
            }
            InstrKind::Binary { op, lhs, rhs } => {
                write!(f, "{} {} ", op.mnemonic(), m.value(*lhs).ty())?;
                fmt_value(f, m, *lhs)?;
                write!(f, ", ")?;
                fmt_value(f, m, *rhs)
            }
            InstrKind::Phi { incoming } => {
                let ty = info
                    .result()
                    .map(|r| m.value(r).ty().clone())
                    .unwrap_or(crate::Ty::Void);
                write!(f, "phi {ty}")?;
                for (i, (v, b)) in incoming.iter().enumerate() {
                    write!(f, "{} [", if i == 0 { " " } else { ", " })?;
                    fmt_value(f, m, *v)?;
                    write!(f, ", ")?;
                    fmt_block(f, m, *b)?;
                    write!(f, "]")?;
                }
                Ok(())
            }
            InstrKind::Load { ptr } => {
                let ty = info
                    .result()
                    .map(|r| m.value(r).ty().clone())
                    .unwrap_or(crate::Ty::Void);
                write!(f, "load {ty}, ")?;
                fmt_value(f, m, *ptr)
            }
            InstrKind::Store { value, ptr } => {
                write!(f, "store {} ", m.value(*value).ty())?;
                fmt_value(f, m, *value)?;
                write!(f, ", ")?;
                fmt_value(f, m, *ptr)
            }
            InstrKind::Gep {
                source_ty,
                base,
                indices,
            } => {
                write!(f, "gep {source_ty}, ")?;
                fmt_value(f, m, *base)?;
                for idx in indices {
                    write!(f, ", ")?;
                    fmt_value(f, m, *idx)?;
                }
                Ok(())
            }
            InstrKind::Bitcast { value, to } => {
                write!(f, "bitcast ")?;
                fmt_value(f, m, *value)?;
                write!(f, " to {to}")
            }
            InstrKind::Sext { value } => {
                let ty = info
                    .result()
                    .map(|r| m.value(r).ty().clone())
                    .unwrap_or(crate::Ty::Void);
                write!(f, "sext ")?;
                fmt_value(f, m, *value)?;
                write!(f, " to {ty}")
            }
            InstrKind::Zext { value } => {
                let ty = info
                    .result()
                    .map(|r| m.value(r).ty().clone())
                    .unwrap_or(crate::Ty::Void);
                write!(f, "zext ")?;
                fmt_value(f, m, *value)?;
                write!(f, " to {ty}")
            }
            InstrKind::Icmp { pred, lhs, rhs } => {
                write!(f, "icmp {} {} ", pred.mnemonic(), m.value(*lhs).ty())?;
                fmt_value(f, m, *lhs)?;
                write!(f, ", ")?;
                fmt_value(f, m, *rhs)
            }
            InstrKind::Br {
                cond,
                then_dest,
                else_dest,
            } => {
                write!(f, "br ")?;
                if let Some(cond) = cond {
                    fmt_value(f, m, *cond)?;
                    write!(f, ", ")?;
                }
                fmt_block(f, m, *then_dest)?;
                if let Some(else_dest) = else_dest {
                    write!(f, ", ")?;
                    fmt_block(f, m, *else_dest)?;
                }
                Ok(())
            }
            InstrKind::Ret { value } => {
                write!(f, "ret")?;
                if let Some(value) = value {
                    write!(f, " {} ", m.value(*value).ty())?;
                    fmt_value(f, m, *value)?;
                }
                Ok(())
            }
            InstrKind::Call { callee, args } => {
                let ret_ty = info
                    .result()
                    .map(|r| m.value(r).ty().clone())
                    .unwrap_or(crate::Ty::Void);
                write!(f, "call {ret_ty} @{}(", m.func(*callee).name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    fmt_value(f, m, *arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::instr::BinOp;
    use crate::types::Ty;

    #[test]
    fn snippets() {
        let mut m = Module::new("t.c");
        let f = m.declare_function("f", vec![(Some("n".into()), Ty::Int(64))], Ty::Void);
        let mut b = FunctionBuilder::new(&mut m, f);
        b.block("entry");
        let n = b.param(0);
        let one = b.const_int(Ty::Int(64), 1);
        let sum = b.binary(BinOp::Add, n, one);
        b.set_value_name(sum, "sum");
        let store = {
            let p = b.alloca(Ty::Int(64), one);
            b.set_value_name(p, "p");
            b.store(sum, p)
        };
        let sum_instr = m.def_instr(sum).unwrap().id();
        assert_eq!(m.display_instr(sum_instr).to_string(), "%sum = add i64 %n, 1");
        assert_eq!(m.display_instr(store).to_string(), "store i64 %sum, %p");
    }
}
