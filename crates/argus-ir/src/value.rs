use crate::arena::Id;
use crate::function::Func;
use crate::identifier;
use crate::instr::Instr;
use crate::types::Ty;

identifier! {
    /// Stable identity of an IR value: a function argument, an instruction
    /// result, a constant, or a global.
    ///
    /// Identity is the arena id; two handles compare equal iff they refer to
    /// the same value.
    struct Value
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0.raw())
    }
}

/// A value handle fabricated for tests. It may not exist in any module.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct TestValue(pub usize);

impl From<TestValue> for Value {
    fn from(t: TestValue) -> Self {
        Value(Id(t.0))
    }
}

/// One use of a value by an instruction operand.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Use {
    pub instr: Instr,
    pub operand_index: usize,
}

/// Information about a value in the module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueInfo {
    pub(crate) id: Value,
    pub(crate) name: Option<String>,
    pub(crate) ty: Ty,
    pub(crate) kind: ValueKind,
    // Insertion-ordered so consumers that walk uses are deterministic.
    pub(crate) uses: Vec<Use>,
}

impl ValueInfo {
    pub(crate) fn new(id: Value, name: Option<String>, ty: Ty, kind: ValueKind) -> Self {
        Self {
            id,
            name,
            ty,
            kind,
            uses: Vec::new(),
        }
    }

    pub fn id(&self) -> Value {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn uses(&self) -> &[Use] {
        &self.uses
    }

    /// True for values whose bits are fixed at build time.
    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::ConstInt(_) | ValueKind::ConstDataArray(_) | ValueKind::Function(_)
        ) || matches!(self.kind, ValueKind::GlobalVar { is_const: true, .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// The `index`-th formal parameter of `func`.
    Argument { func: Func, index: usize },
    /// The result of an instruction.
    Result(Instr),
    ConstInt(i64),
    /// A constant data sequence, e.g. an array initializer.
    ConstDataArray(Vec<i64>),
    /// Address of a module-level variable.
    GlobalVar { init: Option<Value>, is_const: bool },
    /// Address of a function.
    Function(Func),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_id() {
        let v = Value(Id(42));
        assert_eq!(v.to_string(), "%42");
    }
}
