use smallvec::SmallVec;

use crate::block::{Block, BlockInfo};
use crate::function::Func;
use crate::instr::{BinOp, IcmpPred, Instr, InstrInfo, InstrKind, SrcLoc};
use crate::module::Module;
use crate::types::Ty;
use crate::value::{Use, Value, ValueInfo, ValueKind};

/// Appends blocks and instructions to one function.
///
/// Instructions are inserted at the end of the current block; the pending
/// debug location (if any) is attached to every inserted instruction until it
/// is changed. Phi nodes may be closed over later definitions with
/// [`FunctionBuilder::add_incoming`].
pub struct FunctionBuilder<'m> {
    module: &'m mut Module,
    func: Func,
    current: Option<Block>,
    loc: Option<SrcLoc>,
}

impl<'m> FunctionBuilder<'m> {
    pub fn new(module: &'m mut Module, func: Func) -> Self {
        FunctionBuilder {
            module,
            func,
            current: None,
            loc: None,
        }
    }

    pub fn module(&mut self) -> &mut Module {
        self.module
    }

    pub fn func(&self) -> Func {
        self.func
    }

    pub fn param(&self, index: usize) -> Value {
        self.module.func(self.func).params[index]
    }

    pub fn const_int(&mut self, ty: Ty, value: i64) -> Value {
        self.module.const_int(ty, value)
    }

    pub fn set_loc(&mut self, loc: Option<SrcLoc>) {
        self.loc = loc;
    }

    pub fn set_value_name(&mut self, v: Value, name: impl Into<String>) {
        self.module.values[v].name = Some(name.into());
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// Append a new block and make it current.
    pub fn block(&mut self, name: impl Into<String>) -> Block {
        let id = self.module.blocks.next_id();
        let block = self.module.blocks.alloc(BlockInfo {
            id,
            name: Some(name.into()),
            parent: self.func,
            instrs: Vec::new(),
        });
        self.module.functions[self.func].blocks.push(block);
        self.current = Some(block);
        block
    }

    pub fn set_block(&mut self, block: Block) {
        self.current = Some(block);
    }

    fn current(&self) -> Block {
        self.current
            .expect("FunctionBuilder: no insertion block set")
    }

    // ------------------------------------------------------------------
    // Instructions
    // ------------------------------------------------------------------

    fn insert(&mut self, kind: InstrKind, result_ty: Option<Ty>) -> (Instr, Option<Value>) {
        let parent = self.current();
        let operands = kind.operands();
        let instr = self.module.instrs.next_id();
        let result = result_ty.map(|ty| {
            let id = self.module.values.next_id();
            self.module
                .values
                .alloc(ValueInfo::new(id, None, ty, ValueKind::Result(instr)))
        });
        self.module.instrs.alloc(InstrInfo {
            id: instr,
            parent,
            result,
            kind,
            loc: self.loc,
        });
        self.module.blocks[parent].instrs.push(instr);
        for (operand_index, op) in operands.into_iter().enumerate() {
            self.module.values[op].uses.push(Use {
                instr,
                operand_index,
            });
        }
        (instr, result)
    }

    fn insert_value(&mut self, kind: InstrKind, result_ty: Ty) -> Value {
        let (instr, result) = self.insert(kind, Some(result_ty));
        match result {
            Some(v) => v,
            None => unreachable!("instruction {instr} was inserted with a result type"),
        }
    }

    pub fn alloca(&mut self, elem_ty: Ty, count: Value) -> Value {
        let result_ty = Ty::ptr_to(elem_ty.clone());
        self.insert_value(InstrKind::Alloca { elem_ty, count }, result_ty)
    }

    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        let ty = self.module.value(lhs).ty().clone();
        self.insert_value(InstrKind::Binary { op, lhs, rhs }, ty)
    }

    /// Create a phi with no incoming edges; close it with
    /// [`FunctionBuilder::add_incoming`] once the edge values exist.
    pub fn phi(&mut self, ty: Ty) -> Value {
        self.insert_value(
            InstrKind::Phi {
                incoming: SmallVec::new(),
            },
            ty,
        )
    }

    pub fn add_incoming(&mut self, phi: Value, value: Value, from: Block) {
        let ValueKind::Result(instr) = *self.module.value(phi).kind() else {
            panic!("add_incoming: {phi} is not an instruction result");
        };
        let InstrKind::Phi { incoming } = &mut self.module.instrs[instr].kind else {
            panic!("add_incoming: {phi} is not a phi");
        };
        incoming.push((value, from));
        let operand_index = incoming.len() - 1;
        self.module.values[value].uses.push(Use {
            instr,
            operand_index,
        });
    }

    pub fn load(&mut self, ty: Ty, ptr: Value) -> Value {
        self.insert_value(InstrKind::Load { ptr }, ty)
    }

    pub fn store(&mut self, value: Value, ptr: Value) -> Instr {
        self.insert(InstrKind::Store { value, ptr }, None).0
    }

    pub fn gep(
        &mut self,
        source_ty: Ty,
        base: Value,
        indices: impl IntoIterator<Item = Value>,
    ) -> Value {
        let indices: SmallVec<[Value; 2]> = indices.into_iter().collect();
        let result_ty = gep_result_ty(&source_ty, indices.len());
        self.insert_value(
            InstrKind::Gep {
                source_ty,
                base,
                indices,
            },
            result_ty,
        )
    }

    pub fn bitcast(&mut self, value: Value, to: Ty) -> Value {
        self.insert_value(InstrKind::Bitcast { value, to: to.clone() }, to)
    }

    pub fn sext(&mut self, value: Value, to: Ty) -> Value {
        self.insert_value(InstrKind::Sext { value }, to)
    }

    pub fn zext(&mut self, value: Value, to: Ty) -> Value {
        self.insert_value(InstrKind::Zext { value }, to)
    }

    pub fn icmp(&mut self, pred: IcmpPred, lhs: Value, rhs: Value) -> Value {
        self.insert_value(InstrKind::Icmp { pred, lhs, rhs }, Ty::Int(1))
    }

    pub fn br(&mut self, dest: Block) -> Instr {
        self.insert(
            InstrKind::Br {
                cond: None,
                then_dest: dest,
                else_dest: None,
            },
            None,
        )
        .0
    }

    pub fn cond_br(&mut self, cond: Value, then_dest: Block, else_dest: Block) -> Instr {
        self.insert(
            InstrKind::Br {
                cond: Some(cond),
                then_dest,
                else_dest: Some(else_dest),
            },
            None,
        )
        .0
    }

    pub fn ret(&mut self, value: Option<Value>) -> Instr {
        self.insert(InstrKind::Ret { value }, None).0
    }

    /// Returns the result value unless `ret_ty` is void.
    pub fn call(
        &mut self,
        callee: Func,
        ret_ty: Ty,
        args: impl IntoIterator<Item = Value>,
    ) -> Option<Value> {
        let args: SmallVec<[Value; 4]> = args.into_iter().collect();
        let result_ty = (ret_ty != Ty::Void).then_some(ret_ty);
        self.insert(InstrKind::Call { callee, args }, result_ty).1
    }
}

fn gep_result_ty(source_ty: &Ty, num_indices: usize) -> Ty {
    if num_indices == 2 {
        if let Some((elem, _)) = source_ty.array_parts() {
            return Ty::ptr_to(elem.clone());
        }
    }
    Ty::ptr_to(source_ty.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_loop_with_phi() {
        let mut m = Module::new("t.c");
        let f = m.declare_function("f", vec![], Ty::Void);
        let mut b = FunctionBuilder::new(&mut m, f);
        let entry = b.block("entry");
        let header = b.block("header");
        b.set_block(entry);
        let zero = b.const_int(Ty::Int(64), 0);
        b.br(header);
        b.set_block(header);
        let x = b.phi(Ty::Int(64));
        let one = b.const_int(Ty::Int(64), 1);
        let x1 = b.binary(BinOp::Add, x, one);
        b.br(header);
        b.add_incoming(x, zero, entry);
        b.add_incoming(x, x1, header);

        let phi_instr = m.def_instr(x).unwrap();
        let InstrKind::Phi { incoming } = phi_instr.kind() else {
            panic!("not a phi");
        };
        assert_eq!(incoming.len(), 2);
        assert_eq!(m.value(x).uses().len(), 1); // the add
        assert_eq!(m.value(x1).uses().len(), 1); // the phi back-edge
        assert_eq!(m.value(zero).uses().len(), 1);
        assert_eq!(m.successors(entry).as_slice(), &[header]);
    }
}
