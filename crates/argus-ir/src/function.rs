use crate::arena::Id;
use crate::block::Block;
use crate::identifier;
use crate::types::Ty;
use crate::value::Value;

identifier! {
    /// An Id reference to a function in the arena.
    struct Func
}

impl std::fmt::Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0.raw())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionInfo {
    pub(crate) id: Func,
    pub(crate) name: String,
    pub(crate) params: Vec<Value>,
    pub(crate) ret_ty: Ty,
    pub(crate) blocks: Vec<Block>,
}

impl FunctionInfo {
    pub fn id(&self) -> Func {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn ret_ty(&self) -> &Ty {
        &self.ret_ty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn entry(&self) -> Option<Block> {
        self.blocks.first().copied()
    }

    /// A function without a body is an external declaration.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}
