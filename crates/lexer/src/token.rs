use common::Span;
use std::fmt;

/// Token categories shared by the C-family, Kotlin and Rust grammars.
///
/// Only the shapes needed to recognise function headers are distinguished;
/// everything else collapses into [`TokenKind::Punct`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(String),
    Number(String),
    /// String literal contents without the quotes. Escapes are kept verbatim.
    StringLiteral(String),
    CharLiteral(String),
    /// Rust lifetime or loop label, e.g. `'a`.
    Lifetime(String),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Lt,
    Gt,
    Comma,
    Colon,
    PathSep,
    Semicolon,
    Star,
    Amp,
    Arrow,
    Equals,
    Question,
    Dot,
    Hash,

    Punct(char),
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Identifier(_) => "identifier",
            TokenKind::Number(_) => "number",
            TokenKind::StringLiteral(_) => "string",
            TokenKind::CharLiteral(_) => "char",
            TokenKind::Lifetime(_) => "lifetime",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::PathSep => "::",
            TokenKind::Semicolon => ";",
            TokenKind::Star => "*",
            TokenKind::Amp => "&",
            TokenKind::Arrow => "->",
            TokenKind::Equals => "=",
            TokenKind::Question => "?",
            TokenKind::Dot => ".",
            TokenKind::Hash => "#",
            TokenKind::Punct(_) => "punctuation",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => f.write_str(name),
            TokenKind::Number(text) => f.write_str(text),
            TokenKind::StringLiteral(text) => write!(f, "\"{text}\""),
            TokenKind::CharLiteral(text) => write!(f, "'{text}'"),
            TokenKind::Lifetime(name) => write!(f, "'{name}"),
            TokenKind::Punct(ch) => write!(f, "{ch}"),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// True when no other token precedes this one on its source line.
    pub starts_line: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, starts_line: bool) -> Self {
        Self {
            kind,
            span,
            starts_line,
        }
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(ident) if ident == name)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(ident) => Some(ident),
            _ => None,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}
