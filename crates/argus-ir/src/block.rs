use crate::arena::Id;
use crate::function::Func;
use crate::identifier;
use crate::instr::Instr;

identifier! {
    /// An Id reference to a basic block in the arena.
    struct Block
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "^{}", self.0.raw())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub(crate) id: Block,
    pub(crate) name: Option<String>,
    pub(crate) parent: Func,
    pub(crate) instrs: Vec<Instr>,
}

impl BlockInfo {
    pub fn id(&self) -> Block {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Func {
        self.parent
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn terminator(&self) -> Option<Instr> {
        self.instrs.last().copied()
    }
}
