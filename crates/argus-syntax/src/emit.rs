//! Resolve an [`AstModule`] into an IR module.
//!
//! Signatures and globals are registered first so bodies can reference any
//! item regardless of order. Within a body, non-phi operands must be defined
//! by the time they are used; phis are created empty and closed at the end,
//! so their incoming values may be defined later (back-edges).

use argus_ir::{Block, FunctionBuilder, Module, SrcLoc, Ty, Value};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ParseError;
use crate::ast::{AstInstr, AstModule, AstOp, FuncDef, Item, Operand};

fn err(line: usize, message: impl Into<String>) -> ParseError {
    ParseError {
        line,
        message: message.into(),
    }
}

pub(crate) fn emit(ast: &AstModule<'_>) -> Result<Module, ParseError> {
    let mut module = Module::new(ast.source_name.unwrap_or("<unknown>"));
    let mut defined: FxHashSet<&str> = FxHashSet::default();

    for item in &ast.items {
        match item {
            Item::Global(g) => {
                if module.global_by_name(g.name).is_some() {
                    return Err(err(g.line, format!("duplicate global @{}", g.name)));
                }
                let init = match &g.init {
                    Some(values) => {
                        let (elem, len) = g.ty.array_parts().ok_or_else(|| {
                            err(
                                g.line,
                                format!("initializer on non-array global @{}", g.name),
                            )
                        })?;
                        if values.len() as u64 != len {
                            return Err(err(
                                g.line,
                                format!(
                                    "initializer of @{} has {} elements, the type wants {len}",
                                    g.name,
                                    values.len()
                                ),
                            ));
                        }
                        Some(module.const_data_array(elem.clone(), values.clone()))
                    }
                    None => None,
                };
                module.add_global(g.name, g.ty.clone(), init, g.is_const);
            }
            Item::Declare(d) => {
                module.declare_function(
                    d.name,
                    d.params.iter().map(|t| (None, t.clone())).collect(),
                    d.ret.clone(),
                );
            }
            Item::Func(f) => {
                if !defined.insert(f.name) {
                    return Err(err(f.line, format!("duplicate definition of @{}", f.name)));
                }
                module.declare_function(
                    f.name,
                    f.params
                        .iter()
                        .map(|(ty, name)| (Some((*name).to_string()), ty.clone()))
                        .collect(),
                    f.ret.clone(),
                );
            }
        }
    }

    for item in &ast.items {
        if let Item::Func(f) = item {
            emit_body(&mut module, f)?;
        }
    }
    Ok(module)
}

fn emit_body<'src>(module: &mut Module, f: &FuncDef<'src>) -> Result<(), ParseError> {
    let func = match module.func_by_name(f.name) {
        Some(func) => func,
        None => return Err(err(f.line, format!("function @{} was not registered", f.name))),
    };
    let mut b = FunctionBuilder::new(module, func);

    let mut values: FxHashMap<&'src str, Value> = FxHashMap::default();
    for (index, (_, pname)) in f.params.iter().enumerate() {
        if values.insert(pname, b.param(index)).is_some() {
            return Err(err(f.line, format!("duplicate parameter %{pname}")));
        }
    }

    let mut blocks: FxHashMap<&'src str, Block> = FxHashMap::default();
    for block in &f.blocks {
        let id = b.block(block.name);
        if blocks.insert(block.name, id).is_some() {
            return Err(err(block.line, format!("duplicate block ^{}", block.name)));
        }
    }

    let mut pending_phis: Vec<(Value, &AstInstr<'src>)> = Vec::new();

    for block in &f.blocks {
        b.set_block(blocks[block.name]);
        for instr in &block.instrs {
            b.set_loc(instr.loc.map(|(line, col)| SrcLoc { line, col }));
            let result = emit_instr(&mut b, &values, &blocks, instr, &mut pending_phis)?;
            match (instr.result, result) {
                (Some(name), Some(v)) => {
                    b.set_value_name(v, name);
                    if values.insert(name, v).is_some() {
                        return Err(err(instr.line, format!("redefinition of %{name}")));
                    }
                }
                (Some(_), None) => {
                    return Err(err(instr.line, "instruction produces no result"));
                }
                (None, _) => {}
            }
        }
    }

    for (phi, instr) in pending_phis {
        let AstOp::Phi { ty, incoming } = &instr.op else {
            continue;
        };
        for (op, label) in incoming {
            let value = resolve(&mut b, &values, *op, ty, instr.line)?;
            let block = *blocks
                .get(label)
                .ok_or_else(|| err(instr.line, format!("unknown block ^{label}")))?;
            b.add_incoming(phi, value, block);
        }
    }
    Ok(())
}

fn emit_instr<'src, 'ast>(
    b: &mut FunctionBuilder<'_>,
    values: &FxHashMap<&'src str, Value>,
    blocks: &FxHashMap<&'src str, Block>,
    instr: &'ast AstInstr<'src>,
    pending_phis: &mut Vec<(Value, &'ast AstInstr<'src>)>,
) -> Result<Option<Value>, ParseError> {
    let line = instr.line;
    let block = |label: &str| {
        blocks
            .get(label)
            .copied()
            .ok_or_else(|| err(line, format!("unknown block ^{label}")))
    };
    match &instr.op {
        AstOp::Binary { op, ty, lhs, rhs } => {
            let lhs = resolve(b, values, *lhs, ty, line)?;
            let rhs = resolve(b, values, *rhs, ty, line)?;
            Ok(Some(b.binary(*op, lhs, rhs)))
        }
        AstOp::Phi { ty, .. } => {
            let phi = b.phi(ty.clone());
            pending_phis.push((phi, instr));
            Ok(Some(phi))
        }
        AstOp::Alloca { elem_ty, count } => {
            let count = resolve(b, values, *count, &Ty::Int(64), line)?;
            Ok(Some(b.alloca(elem_ty.clone(), count)))
        }
        AstOp::Load { ty, ptr } => {
            let ptr = resolve(b, values, *ptr, &Ty::Int(64), line)?;
            Ok(Some(b.load(ty.clone(), ptr)))
        }
        AstOp::Store { ty, value, ptr } => {
            let value = resolve(b, values, *value, ty, line)?;
            let ptr = resolve(b, values, *ptr, &Ty::Int(64), line)?;
            b.store(value, ptr);
            Ok(None)
        }
        AstOp::Gep {
            source_ty,
            base,
            indices,
        } => {
            let base = resolve(b, values, *base, &Ty::Int(64), line)?;
            let mut resolved = Vec::with_capacity(indices.len());
            for op in indices {
                resolved.push(resolve(b, values, *op, &Ty::Int(64), line)?);
            }
            Ok(Some(b.gep(source_ty.clone(), base, resolved)))
        }
        AstOp::Bitcast { value, to } => {
            let value = resolve(b, values, *value, &Ty::Int(64), line)?;
            Ok(Some(b.bitcast(value, to.clone())))
        }
        AstOp::Ext { signed, value, to } => {
            let value = resolve(b, values, *value, &Ty::Int(64), line)?;
            Ok(Some(if *signed {
                b.sext(value, to.clone())
            } else {
                b.zext(value, to.clone())
            }))
        }
        AstOp::Icmp { pred, ty, lhs, rhs } => {
            let lhs = resolve(b, values, *lhs, ty, line)?;
            let rhs = resolve(b, values, *rhs, ty, line)?;
            Ok(Some(b.icmp(*pred, lhs, rhs)))
        }
        AstOp::Br {
            cond,
            then_dest,
            else_dest,
        } => {
            let then_block = block(then_dest)?;
            match (cond, else_dest) {
                (Some(cond), Some(else_dest)) => {
                    let cond = resolve(b, values, *cond, &Ty::Int(1), line)?;
                    let else_block = block(else_dest)?;
                    b.cond_br(cond, then_block, else_block);
                }
                (None, _) => {
                    b.br(then_block);
                }
                (Some(_), None) => {
                    return Err(err(line, "conditional branch needs two destinations"));
                }
            }
            Ok(None)
        }
        AstOp::Ret { value } => {
            let value = match value {
                Some((ty, op)) => Some(resolve(b, values, *op, ty, line)?),
                None => None,
            };
            b.ret(value);
            Ok(None)
        }
        AstOp::Call { ret, callee, args } => {
            let func = b.module().get_or_declare_function(callee);
            let mut resolved = Vec::with_capacity(args.len());
            for op in args {
                resolved.push(resolve(b, values, *op, &Ty::Int(64), line)?);
            }
            Ok(b.call(func, ret.clone(), resolved))
        }
    }
}

/// Integer literals take the type the instruction states for that operand,
/// defaulting to `i64` where the syntax has none (gep indices, call
/// arguments).
fn resolve<'src>(
    b: &mut FunctionBuilder<'_>,
    values: &FxHashMap<&'src str, Value>,
    op: Operand<'src>,
    ty: &Ty,
    line: usize,
) -> Result<Value, ParseError> {
    match op {
        Operand::Value(name) => values.get(name).copied().ok_or_else(|| {
            err(
                line,
                format!("use of undefined value %{name} (only phis may reference later definitions)"),
            )
        }),
        Operand::Const(value) => Ok(b.const_int(ty.clone(), value)),
        Operand::Global(name) => {
            if let Some(v) = b.module().global_by_name(name) {
                return Ok(v);
            }
            if let Some(f) = b.module().func_by_name(name) {
                return Ok(b.module().function_value(f));
            }
            Err(err(line, format!("unknown symbol @{name}")))
        }
    }
}
