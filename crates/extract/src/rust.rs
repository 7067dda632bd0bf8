//! Rust grammar: `extern "C" ... fn <name>(<name>: <type>, ...) -> <returnType>`.
//!
//! Only functions with the C ABI are callable from the binder, so anything not
//! marked `extern "C"` is invisible. `extern "C" { ... }` blocks declare
//! imports rather than exports and are skipped too. Headers may span lines.

use lexer::{Dialect, Token, TokenKind, tokenize};

use crate::cursor::{find_top_level, matching_close, render_tokens, split_top_level};
use crate::error::ExtractResult;
use crate::signature::ExportedSignature;

/// Raw return type recorded for functions without `-> T`.
pub const UNIT_TYPE: &str = "()";

pub fn parse_rust_signatures(source: &str) -> ExtractResult<Vec<ExportedSignature>> {
    let tokens = tokenize(source, Dialect::Rust)?;
    let mut signatures = Vec::new();
    let mut idx = 0;

    while idx < tokens.len() {
        if is_extern_c(&tokens, idx) {
            if let Some((signature, next)) = parse_function(&tokens, idx + 2) {
                signatures.push(signature);
                idx = next;
                continue;
            }
        }
        idx += 1;
    }

    Ok(signatures)
}

fn is_extern_c(tokens: &[Token], idx: usize) -> bool {
    tokens[idx].is_ident("extern")
        && matches!(
            tokens.get(idx + 1).map(|t| &t.kind),
            Some(TokenKind::StringLiteral(abi)) if abi == "C"
        )
}

/// Scans from just after `extern "C"` to the `fn` keyword and reads the header.
fn parse_function(tokens: &[Token], start: usize) -> Option<(ExportedSignature, usize)> {
    let mut fn_kw = start;
    loop {
        let token = tokens.get(fn_kw)?;
        if token.is_ident("fn") {
            break;
        }
        if matches!(
            token.kind,
            TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semicolon
        ) {
            return None;
        }
        fn_kw += 1;
    }

    // `extern "C" fn(i32)` is a function pointer type, not a definition.
    let name = tokens.get(fn_kw + 1)?.ident()?.to_string();
    let mut open = fn_kw + 2;
    if tokens.get(open)?.kind == TokenKind::Lt {
        open = matching_close(tokens, open)? + 1;
    }
    if tokens.get(open)?.kind != TokenKind::LParen {
        return None;
    }
    let close = matching_close(tokens, open)?;
    let method_args = parse_args(&tokens[open + 1..close]);

    let (return_type, next) = if tokens.get(close + 1).map(|t| &t.kind) == Some(&TokenKind::Arrow) {
        read_return_type(tokens, close + 2)
    } else {
        (UNIT_TYPE.to_string(), close + 1)
    };

    Some((
        ExportedSignature {
            method_name: name,
            return_type,
            method_args,
        },
        next,
    ))
}

/// Return type tokens run until the body, a `;` or a `where` clause.
fn read_return_type(tokens: &[Token], start: usize) -> (String, usize) {
    let mut depth = 0isize;
    let mut end = start;
    while let Some(token) = tokens.get(end) {
        match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::Lt => depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::Gt => depth -= 1,
            TokenKind::LBrace | TokenKind::Semicolon if depth <= 0 => break,
            TokenKind::Identifier(ref word) if depth <= 0 && word == "where" => break,
            _ => {}
        }
        end += 1;
    }
    (render_tokens(&tokens[start..end]), end)
}

fn parse_args(tokens: &[Token]) -> Vec<(String, String)> {
    split_top_level(tokens, &TokenKind::Comma)
        .into_iter()
        .filter(|arg| !arg.is_empty())
        .map(|arg| match find_top_level(arg, &TokenKind::Colon) {
            Some(colon) => {
                let pattern: Vec<Token> = arg[..colon]
                    .iter()
                    .filter(|t| !t.is_ident("mut"))
                    .cloned()
                    .collect();
                (render_tokens(&pattern), render_tokens(&arg[colon + 1..]))
            }
            None => (render_tokens(arg), String::new()),
        })
        .collect()
}
