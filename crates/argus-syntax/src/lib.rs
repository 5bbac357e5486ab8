//! Loading textual IR modules.
//!
//! The surface covers exactly what the analysis consumes — functions, blocks,
//! typed instructions, debug locations — in a small line-oriented format:
//!
//! ```text
//! source "paper.c"
//!
//! declare @malloc(i64) -> ptr i8
//!
//! func @main() -> void {
//! ^entry:
//!   %p = call ptr i8 @malloc(28)
//!   %a = bitcast %p to ptr i32
//!   %g = gep i32, %a, 3
//!   store i32 7, %g #loc(4, 5)
//!   ret
//! }
//! ```
//!
//! Parsing happens in two stages: tokens to a name-based AST, then a
//! resolving emit pass into [`argus_ir::Module`].

mod ast;
mod emit;
mod lexer;
mod parser;

pub use lexer::Token;

use thiserror::Error;

/// A lexing, parsing, or resolution failure. Module loading is the only
/// fatal error class of the tool.
#[derive(Debug, Clone, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// Parse a textual IR module.
pub fn parse_module(source: &str) -> Result<argus_ir::Module, ParseError> {
    let ast = parser::parse(source)?;
    emit::emit(&ast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ir::{InstrKind, Ty, ValueKind};

    #[test]
    fn parses_a_loop_module() {
        let src = r#"
source "paper.c"

declare @malloc(i64) -> ptr i8

func @main() -> void {
^entry:
  %raw = call ptr i8 @malloc(28)
  %a = bitcast %raw to ptr i32
  br ^header
^header:
  %x = phi i64 [0, ^entry], [%x1, ^body]
  %c = icmp slt i64 %x, 10
  br %c, ^body, ^exit
^body:
  %g = gep i32, %a, %x
  store i32 6, %g #loc(6, 3)
  %x1 = add i64 %x, 1
  br ^header
^exit:
  ret
}
"#;
        let m = parse_module(src).unwrap();
        assert_eq!(m.source_name(), "paper.c");

        let main = m.func_by_name("main").unwrap();
        let blocks = m.func(main).blocks();
        assert_eq!(blocks.len(), 4);

        let header = blocks[1];
        let phi_instr = m.block(header).instrs()[0];
        let InstrKind::Phi { incoming } = m.instr(phi_instr).kind() else {
            panic!("expected a phi");
        };
        assert_eq!(incoming.len(), 2);
        // The back-edge value was resolved even though it is defined later.
        let (back, from) = incoming[1];
        assert_eq!(m.value(back).name(), Some("x1"));
        assert_eq!(from, blocks[2]);

        let body = blocks[2];
        let store = m.block(body).instrs()[1];
        assert!(matches!(m.instr(store).kind(), InstrKind::Store { .. }));
        let loc = m.instr(store).loc().unwrap();
        assert_eq!((loc.line, loc.col), (6, 3));
        assert_eq!(m.display_instr(store).to_string(), "store i32 6, %g");

        let malloc = m.func_by_name("malloc").unwrap();
        assert!(m.func(malloc).is_declaration());
        assert_eq!(m.func(malloc).params().len(), 1);
    }

    #[test]
    fn parses_globals_and_const_tables() {
        let src = r#"
const @tbl : [4 x i32] = [1, 2, 3, 4]
global @arr : [10 x i32]

func @f() -> void {
^entry:
  %g = gep [10 x i32], @arr, 0, 3
  store i32 1, %g
  ret
}
"#;
        let m = parse_module(src).unwrap();
        let tbl = m.global_by_name("tbl").unwrap();
        let ValueKind::GlobalVar {
            init: Some(init),
            is_const: true,
        } = m.value(tbl).kind()
        else {
            panic!("expected a constant global");
        };
        assert_eq!(
            m.value(*init).kind(),
            &ValueKind::ConstDataArray(vec![1, 2, 3, 4])
        );
        assert_eq!(m.value(tbl).ty(), &Ty::ptr_to(Ty::array_of(Ty::Int(32), 4)));

        let arr = m.global_by_name("arr").unwrap();
        assert!(matches!(
            m.value(arr).kind(),
            ValueKind::GlobalVar { init: None, is_const: false }
        ));
    }

    #[test]
    fn rejects_undefined_values() {
        let src = r#"
func @f() -> void {
^entry:
  %y = add i64 %x, 1
  ret
}
"#;
        let e = parse_module(src).unwrap_err();
        assert_eq!(e.line, 4);
        assert!(e.message.contains("undefined value %x"));
    }

    #[test]
    fn rejects_garbage_tokens() {
        let e = parse_module("func @f ? {").unwrap_err();
        assert!(e.message.contains("unrecognized token"));
    }

    #[test]
    fn rejects_unknown_instructions() {
        let src = "func @f() -> void {\n^entry:\n  frobnicate i64 1\n}\n";
        let e = parse_module(src).unwrap_err();
        assert_eq!(e.line, 3);
        assert!(e.message.contains("unknown instruction"));
    }
}
