//! Tokenizer shared by the signature extractors.

pub mod token;
pub mod tokenizer;

pub use token::{Token, TokenKind};
pub use tokenizer::{Dialect, LexResult, LexerError, tokenize};
