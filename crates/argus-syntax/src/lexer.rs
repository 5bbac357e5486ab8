pub use logos::Logos;

/// Tokens of the textual IR. Newlines are significant: instructions are
/// line-delimited.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip(r";[^\n]*", allow_greedy = true))]
pub enum Token<'src> {
    Error,
    /// ```text
    /// %<identifier>
    /// ```
    #[regex(r"%[A-Za-z0-9_$.]+", |lex| &lex.slice()[1..])]
    SSAValue(&'src str),
    /// ```text
    /// ^<identifier>
    /// ```
    #[regex(r"\^[A-Za-z0-9_$.]+", |lex| &lex.slice()[1..])]
    Block(&'src str),
    /// ```text
    /// @<symbol>
    /// ```
    #[regex(r"@[A-Za-z0-9_$.]+", |lex| &lex.slice()[1..])]
    Symbol(&'src str),
    /// ```text
    /// #<attr_id>
    /// ```
    #[regex(r"#[A-Za-z0-9_$.]+", |lex| &lex.slice()[1..])]
    AttrId(&'src str),
    #[regex(r"[A-Za-z_][A-Za-z0-9_$.]*")]
    Identifier(&'src str),
    #[regex(r"-?[0-9]+", |lex| lex.slice())]
    Int(&'src str),
    // Simple quoted string, no escape handling
    #[regex(r#""[^"\n]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    StringLit(&'src str),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("=")]
    Equal,
    #[token("->")]
    Arrow,
    #[token("\n")]
    Newline,
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Error => write!(f, "error"),
            Token::SSAValue(name) => write!(f, "%{name}"),
            Token::Block(name) => write!(f, "^{name}"),
            Token::Symbol(name) => write!(f, "@{name}"),
            Token::AttrId(name) => write!(f, "#{name}"),
            Token::Identifier(name) => write!(f, "{name}"),
            Token::Int(value) => write!(f, "{value}"),
            Token::StringLit(value) => write!(f, "{value:?}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::Equal => write!(f, "="),
            Token::Arrow => write!(f, "->"),
            Token::Newline => write!(f, "\\n"),
        }
    }
}
