mod arena;
mod block;
mod builder;
mod dom;
mod function;
mod instr;
mod lattice;
mod module;
mod print;
mod types;
mod value;

pub use arena::{Arena, Id, Identifier};
pub use block::{Block, BlockInfo};
pub use builder::FunctionBuilder;
pub use dom::DomTree;
pub use function::{Func, FunctionInfo};
pub use instr::{BinOp, IcmpPred, Instr, InstrInfo, InstrKind, SrcLoc};
pub use lattice::{FiniteLattice, HasBottom, HasTop, Lattice};
pub use module::Module;
pub use print::DisplayInstr;
pub use types::Ty;
pub use value::{TestValue, Use, Value, ValueInfo, ValueKind};
