use argus_ir::{BinOp, IcmpPred, Ty};
use logos::Logos;

use crate::ParseError;
use crate::ast::{
    AstBlock, AstInstr, AstModule, AstOp, DeclareDef, FuncDef, GlobalDef, Item, Operand,
};
use crate::lexer::Token;

pub(crate) fn parse(source: &str) -> Result<AstModule<'_>, ParseError> {
    let tokens = lex(source)?;
    Parser { tokens, pos: 0 }.module()
}

fn lex(source: &str) -> Result<Vec<(Token<'_>, usize)>, ParseError> {
    let mut out = Vec::new();
    let mut line = 1;
    for (res, span) in Token::lexer(source).spanned() {
        match res {
            Ok(tok) => {
                let tok_line = line;
                if tok == Token::Newline {
                    line += 1;
                }
                out.push((tok, tok_line));
            }
            Err(()) => {
                return Err(ParseError {
                    line,
                    message: format!("unrecognized token {:?}", &source[span]),
                });
            }
        }
    }
    Ok(out)
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, usize)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t.clone())
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, line)| *line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token<'src>) -> Result<(), ParseError> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(self.err(format!("expected `{expected}`, found `{tok}`"))),
            None => Err(self.err(format!("expected `{expected}`, found end of input"))),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Some(Token::Newline)) {
            self.pos += 1;
        }
    }

    /// Instructions and items end at a newline (or the end of input).
    fn expect_line_end(&mut self) -> Result<(), ParseError> {
        match self.advance() {
            Some(Token::Newline) | None => Ok(()),
            Some(tok) => Err(self.err(format!("expected end of line, found `{tok}`"))),
        }
    }

    fn int(&mut self) -> Result<i64, ParseError> {
        match self.advance() {
            Some(Token::Int(s)) => s
                .parse::<i64>()
                .map_err(|_| self.err(format!("integer literal `{s}` out of range"))),
            Some(tok) => Err(self.err(format!("expected integer, found `{tok}`"))),
            None => Err(self.err("expected integer, found end of input")),
        }
    }

    fn symbol(&mut self) -> Result<&'src str, ParseError> {
        match self.advance() {
            Some(Token::Symbol(name)) => Ok(name),
            Some(tok) => Err(self.err(format!("expected @symbol, found `{tok}`"))),
            None => Err(self.err("expected @symbol, found end of input")),
        }
    }

    fn block_label(&mut self) -> Result<&'src str, ParseError> {
        match self.advance() {
            Some(Token::Block(name)) => Ok(name),
            Some(tok) => Err(self.err(format!("expected ^block, found `{tok}`"))),
            None => Err(self.err("expected ^block, found end of input")),
        }
    }

    // ------------------------------------------------------------------
    // Grammar
    // ------------------------------------------------------------------

    fn module(mut self) -> Result<AstModule<'src>, ParseError> {
        self.skip_newlines();
        let source_name = if matches!(self.peek(), Some(Token::Identifier("source"))) {
            self.advance();
            let name = match self.advance() {
                Some(Token::StringLit(name)) => name,
                _ => return Err(self.err("expected a quoted file name after `source`")),
            };
            self.expect_line_end()?;
            Some(name)
        } else {
            None
        };

        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            let Some(tok) = self.peek() else {
                break;
            };
            match tok {
                Token::Identifier("const") => items.push(Item::Global(self.global(true)?)),
                Token::Identifier("global") => items.push(Item::Global(self.global(false)?)),
                Token::Identifier("declare") => items.push(Item::Declare(self.declare()?)),
                Token::Identifier("func") => items.push(Item::Func(self.func()?)),
                other => return Err(self.err(format!("expected a top-level item, found `{other}`"))),
            }
        }
        Ok(AstModule { source_name, items })
    }

    /// `const @tbl : [4 x i32] = [1, 2, 3, 4]` or `global @arr : [10 x i32]`.
    fn global(&mut self, is_const: bool) -> Result<GlobalDef<'src>, ParseError> {
        let line = self.line();
        self.advance(); // `const` / `global`
        let name = self.symbol()?;
        self.expect(Token::Colon)?;
        let ty = self.ty()?;
        let init = if matches!(self.peek(), Some(Token::Equal)) {
            self.advance();
            self.expect(Token::LBracket)?;
            let mut values = Vec::new();
            if !matches!(self.peek(), Some(Token::RBracket)) {
                loop {
                    values.push(self.int()?);
                    if matches!(self.peek(), Some(Token::Comma)) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(Token::RBracket)?;
            Some(values)
        } else {
            None
        };
        self.expect_line_end()?;
        Ok(GlobalDef {
            line,
            name,
            ty,
            init,
            is_const,
        })
    }

    /// `declare @malloc(i64) -> ptr i8`
    fn declare(&mut self) -> Result<DeclareDef<'src>, ParseError> {
        let line = self.line();
        self.advance(); // `declare`
        let name = self.symbol()?;
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                params.push(self.ty()?);
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        let ret = self.ret_ty()?;
        self.expect_line_end()?;
        Ok(DeclareDef {
            line,
            name,
            params,
            ret,
        })
    }

    /// `func @main(i64 %n) -> void { ... }`
    fn func(&mut self) -> Result<FuncDef<'src>, ParseError> {
        let line = self.line();
        self.advance(); // `func`
        let name = self.symbol()?;
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                let ty = self.ty()?;
                let pname = match self.advance() {
                    Some(Token::SSAValue(pname)) => pname,
                    _ => return Err(self.err("expected a %name for the parameter")),
                };
                params.push((ty, pname));
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        let ret = self.ret_ty()?;
        self.expect(Token::LBrace)?;
        self.expect_line_end()?;

        let mut blocks = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    break;
                }
                Some(Token::Block(_)) => blocks.push(self.block()?),
                Some(tok) => {
                    return Err(self.err(format!("expected ^block label or `}}`, found `{tok}`")));
                }
                None => return Err(self.err("unexpected end of input inside a function body")),
            }
        }
        self.expect_line_end()?;
        Ok(FuncDef {
            line,
            name,
            params,
            ret,
            blocks,
        })
    }

    fn ret_ty(&mut self) -> Result<Ty, ParseError> {
        if matches!(self.peek(), Some(Token::Arrow)) {
            self.advance();
            self.ty()
        } else {
            Ok(Ty::Void)
        }
    }

    fn block(&mut self) -> Result<AstBlock<'src>, ParseError> {
        let line = self.line();
        let name = self.block_label()?;
        self.expect(Token::Colon)?;
        self.expect_line_end()?;
        let mut instrs = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                Some(Token::Block(_)) | Some(Token::RBrace) | None => break,
                Some(_) => instrs.push(self.instr()?),
            }
        }
        Ok(AstBlock { line, name, instrs })
    }

    fn instr(&mut self) -> Result<AstInstr<'src>, ParseError> {
        let line = self.line();
        let result = if let Some(Token::SSAValue(name)) = self.peek() {
            self.advance();
            self.expect(Token::Equal)?;
            Some(name)
        } else {
            None
        };
        let op = self.op()?;
        let loc = match self.peek() {
            Some(Token::AttrId("loc")) => {
                self.advance();
                self.expect(Token::LParen)?;
                let l = self.int()?;
                self.expect(Token::Comma)?;
                let c = self.int()?;
                self.expect(Token::RParen)?;
                Some((l as u32, c as u32))
            }
            Some(Token::AttrId(other)) => {
                return Err(self.err(format!("unknown attribute #{other}")));
            }
            _ => None,
        };
        self.expect_line_end()?;
        Ok(AstInstr {
            result,
            op,
            loc,
            line,
        })
    }

    fn op(&mut self) -> Result<AstOp<'src>, ParseError> {
        let kw = match self.advance() {
            Some(Token::Identifier(kw)) => kw,
            Some(tok) => return Err(self.err(format!("expected an instruction, found `{tok}`"))),
            None => return Err(self.err("expected an instruction, found end of input")),
        };
        match kw {
            "add" | "sub" | "mul" | "sdiv" => {
                let op = match kw {
                    "add" => BinOp::Add,
                    "sub" => BinOp::Sub,
                    "mul" => BinOp::Mul,
                    _ => BinOp::SDiv,
                };
                let ty = self.ty()?;
                let lhs = self.operand()?;
                self.expect(Token::Comma)?;
                let rhs = self.operand()?;
                Ok(AstOp::Binary { op, ty, lhs, rhs })
            }
            "phi" => {
                let ty = self.ty()?;
                let mut incoming = Vec::new();
                loop {
                    self.expect(Token::LBracket)?;
                    let value = self.operand()?;
                    self.expect(Token::Comma)?;
                    let label = self.block_label()?;
                    self.expect(Token::RBracket)?;
                    incoming.push((value, label));
                    if matches!(self.peek(), Some(Token::Comma)) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                Ok(AstOp::Phi { ty, incoming })
            }
            "alloca" => {
                let elem_ty = self.ty()?;
                self.expect(Token::Comma)?;
                let count = self.operand()?;
                Ok(AstOp::Alloca { elem_ty, count })
            }
            "load" => {
                let ty = self.ty()?;
                self.expect(Token::Comma)?;
                let ptr = self.operand()?;
                Ok(AstOp::Load { ty, ptr })
            }
            "store" => {
                let ty = self.ty()?;
                let value = self.operand()?;
                self.expect(Token::Comma)?;
                let ptr = self.operand()?;
                Ok(AstOp::Store { ty, value, ptr })
            }
            "gep" => {
                let source_ty = self.ty()?;
                self.expect(Token::Comma)?;
                let base = self.operand()?;
                let mut indices = Vec::new();
                while matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                    indices.push(self.operand()?);
                }
                if indices.is_empty() {
                    return Err(self.err("gep needs at least one index"));
                }
                Ok(AstOp::Gep {
                    source_ty,
                    base,
                    indices,
                })
            }
            "bitcast" | "sext" | "zext" => {
                let value = self.operand()?;
                match self.advance() {
                    Some(Token::Identifier("to")) => {}
                    _ => return Err(self.err(format!("expected `to` after the {kw} operand"))),
                }
                let to = self.ty()?;
                Ok(match kw {
                    "bitcast" => AstOp::Bitcast { value, to },
                    "sext" => AstOp::Ext {
                        signed: true,
                        value,
                        to,
                    },
                    _ => AstOp::Ext {
                        signed: false,
                        value,
                        to,
                    },
                })
            }
            "icmp" => {
                let pred = match self.advance() {
                    Some(Token::Identifier(p)) => icmp_pred(p)
                        .ok_or_else(|| self.err(format!("unknown icmp predicate `{p}`")))?,
                    _ => return Err(self.err("expected an icmp predicate")),
                };
                let ty = self.ty()?;
                let lhs = self.operand()?;
                self.expect(Token::Comma)?;
                let rhs = self.operand()?;
                Ok(AstOp::Icmp { pred, ty, lhs, rhs })
            }
            "br" => {
                if matches!(self.peek(), Some(Token::Block(_))) {
                    let dest = self.block_label()?;
                    Ok(AstOp::Br {
                        cond: None,
                        then_dest: dest,
                        else_dest: None,
                    })
                } else {
                    let cond = self.operand()?;
                    self.expect(Token::Comma)?;
                    let then_dest = self.block_label()?;
                    self.expect(Token::Comma)?;
                    let else_dest = self.block_label()?;
                    Ok(AstOp::Br {
                        cond: Some(cond),
                        then_dest,
                        else_dest: Some(else_dest),
                    })
                }
            }
            "ret" => {
                if matches!(
                    self.peek(),
                    Some(Token::Newline) | Some(Token::AttrId(_)) | None
                ) {
                    Ok(AstOp::Ret { value: None })
                } else {
                    let ty = self.ty()?;
                    let value = self.operand()?;
                    Ok(AstOp::Ret {
                        value: Some((ty, value)),
                    })
                }
            }
            "call" => {
                let ret = self.ty()?;
                let callee = self.symbol()?;
                self.expect(Token::LParen)?;
                let mut args = Vec::new();
                if !matches!(self.peek(), Some(Token::RParen)) {
                    loop {
                        args.push(self.operand()?);
                        if matches!(self.peek(), Some(Token::Comma)) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen)?;
                Ok(AstOp::Call { ret, callee, args })
            }
            other => Err(self.err(format!("unknown instruction `{other}`"))),
        }
    }

    fn ty(&mut self) -> Result<Ty, ParseError> {
        match self.advance() {
            Some(Token::Identifier("void")) => Ok(Ty::Void),
            Some(Token::Identifier("ptr")) => Ok(Ty::ptr_to(self.ty()?)),
            Some(Token::Identifier(s)) => {
                if let Some(width) = s.strip_prefix('i').and_then(|w| w.parse::<u32>().ok()) {
                    Ok(Ty::Int(width))
                } else {
                    Err(self.err(format!("unknown type `{s}`")))
                }
            }
            Some(Token::LParen) => {
                let ty = self.ty()?;
                self.expect(Token::RParen)?;
                Ok(ty)
            }
            Some(Token::LBracket) => {
                let len = self.int()?;
                match self.advance() {
                    Some(Token::Identifier("x")) => {}
                    _ => return Err(self.err("expected `x` in array type")),
                }
                let elem = self.ty()?;
                self.expect(Token::RBracket)?;
                if len < 0 {
                    return Err(self.err("array length must be non-negative"));
                }
                Ok(Ty::array_of(elem, len as u64))
            }
            Some(tok) => Err(self.err(format!("expected a type, found `{tok}`"))),
            None => Err(self.err("expected a type, found end of input")),
        }
    }

    fn operand(&mut self) -> Result<Operand<'src>, ParseError> {
        match self.advance() {
            Some(Token::SSAValue(name)) => Ok(Operand::Value(name)),
            Some(Token::Symbol(name)) => Ok(Operand::Global(name)),
            Some(Token::Int(s)) => {
                let value = s
                    .parse::<i64>()
                    .map_err(|_| self.err(format!("integer literal `{s}` out of range")))?;
                Ok(Operand::Const(value))
            }
            Some(tok) => Err(self.err(format!("expected an operand, found `{tok}`"))),
            None => Err(self.err("expected an operand, found end of input")),
        }
    }
}

fn icmp_pred(name: &str) -> Option<IcmpPred> {
    match name {
        "eq" => Some(IcmpPred::Eq),
        "ne" => Some(IcmpPred::Ne),
        "ult" => Some(IcmpPred::Ult),
        "ule" => Some(IcmpPred::Ule),
        "ugt" => Some(IcmpPred::Ugt),
        "uge" => Some(IcmpPred::Uge),
        "slt" => Some(IcmpPred::Slt),
        "sle" => Some(IcmpPred::Sle),
        "sgt" => Some(IcmpPred::Sgt),
        "sge" => Some(IcmpPred::Sge),
        _ => None,
    }
}
