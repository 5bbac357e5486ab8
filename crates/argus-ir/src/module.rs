use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::arena::Arena;
use crate::block::{Block, BlockInfo};
use crate::function::{Func, FunctionInfo};
use crate::instr::{Instr, InstrInfo};
use crate::types::Ty;
use crate::value::{Value, ValueInfo, ValueKind};

/// A read-only-after-construction IR module.
///
/// All nodes live in arenas owned here; handles (`Func`, `Block`, `Instr`,
/// `Value`) are typed arena ids and stay valid for the module's lifetime.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub(crate) source_name: String,
    pub(crate) functions: Arena<Func, FunctionInfo>,
    pub(crate) blocks: Arena<Block, BlockInfo>,
    pub(crate) instrs: Arena<Instr, InstrInfo>,
    pub(crate) values: Arena<Value, ValueInfo>,
    func_by_name: FxHashMap<String, Func>,
    global_by_name: FxHashMap<String, Value>,
    const_ints: FxHashMap<(Ty, i64), Value>,
}

impl Module {
    pub fn new(source_name: impl Into<String>) -> Self {
        Module {
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    // ------------------------------------------------------------------
    // Node access
    // ------------------------------------------------------------------

    pub fn value(&self, v: Value) -> &ValueInfo {
        &self.values[v]
    }

    pub fn instr(&self, i: Instr) -> &InstrInfo {
        &self.instrs[i]
    }

    pub fn block(&self, b: Block) -> &BlockInfo {
        &self.blocks[b]
    }

    pub fn func(&self, f: Func) -> &FunctionInfo {
        &self.functions[f]
    }

    pub fn funcs(&self) -> impl Iterator<Item = Func> {
        self.functions.ids()
    }

    pub fn func_by_name(&self, name: &str) -> Option<Func> {
        self.func_by_name.get(name).copied()
    }

    pub fn global_by_name(&self, name: &str) -> Option<Value> {
        self.global_by_name.get(name).copied()
    }

    /// The instruction defining `v`, if `v` is an instruction result.
    pub fn def_instr(&self, v: Value) -> Option<&InstrInfo> {
        match self.values[v].kind {
            ValueKind::Result(instr) => Some(&self.instrs[instr]),
            _ => None,
        }
    }

    pub fn successors(&self, b: Block) -> SmallVec<[Block; 2]> {
        self.blocks[b]
            .terminator()
            .map(|t| self.instrs[t].kind.successors())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Look up `name`, or register it as an external function with an empty
    /// signature. `declare_function` fills the signature in later.
    pub fn get_or_declare_function(&mut self, name: &str) -> Func {
        if let Some(f) = self.func_by_name.get(name) {
            return *f;
        }
        let id = self.functions.next_id();
        self.functions.alloc(FunctionInfo {
            id,
            name: name.to_string(),
            params: Vec::new(),
            ret_ty: Ty::Void,
            blocks: Vec::new(),
        });
        self.func_by_name.insert(name.to_string(), id);
        id
    }

    /// Register `name` with the given signature, creating argument values.
    /// Replaces the empty signature of a forward reference.
    pub fn declare_function(
        &mut self,
        name: &str,
        param_tys: Vec<(Option<String>, Ty)>,
        ret_ty: Ty,
    ) -> Func {
        let f = self.get_or_declare_function(name);
        let params: Vec<Value> = param_tys
            .into_iter()
            .enumerate()
            .map(|(index, (pname, ty))| {
                let id = self.values.next_id();
                self.values.alloc(ValueInfo::new(
                    id,
                    pname,
                    ty,
                    ValueKind::Argument { func: f, index },
                ))
            })
            .collect();
        let info = &mut self.functions[f];
        info.params = params;
        info.ret_ty = ret_ty;
        f
    }

    pub fn add_global(
        &mut self,
        name: &str,
        ty: Ty,
        init: Option<Value>,
        is_const: bool,
    ) -> Value {
        let id = self.values.next_id();
        let v = self.values.alloc(ValueInfo::new(
            id,
            Some(name.to_string()),
            Ty::ptr_to(ty),
            ValueKind::GlobalVar { init, is_const },
        ));
        self.global_by_name.insert(name.to_string(), v);
        v
    }

    /// Interned integer constant of type `ty`.
    pub fn const_int(&mut self, ty: Ty, value: i64) -> Value {
        if let Some(v) = self.const_ints.get(&(ty.clone(), value)) {
            return *v;
        }
        let id = self.values.next_id();
        let v = self
            .values
            .alloc(ValueInfo::new(id, None, ty.clone(), ValueKind::ConstInt(value)));
        self.const_ints.insert((ty, value), v);
        v
    }

    pub fn const_data_array(&mut self, elem_ty: Ty, values: Vec<i64>) -> Value {
        let len = values.len() as u64;
        let id = self.values.next_id();
        self.values.alloc(ValueInfo::new(
            id,
            None,
            Ty::array_of(elem_ty, len),
            ValueKind::ConstDataArray(values),
        ))
    }

    /// Address-of value for calling or storing a function.
    pub fn function_value(&mut self, f: Func) -> Value {
        let id = self.values.next_id();
        self.values
            .alloc(ValueInfo::new(id, None, Ty::Func, ValueKind::Function(f)))
    }
}
