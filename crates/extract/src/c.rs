//! C-family grammar: `<returnType> <name>(<type> <name>, ...)`.
//!
//! A header must start its source line at file scope. Blocks opened by
//! `extern "C" {` and `namespace x {` stay file scope. Storage-class and
//! calling-convention words are not understood and remain part of the raw
//! return type.

use lexer::{Dialect, Token, TokenKind, tokenize};

use crate::cursor::{matching_close, render_tokens, split_top_level};
use crate::error::ExtractResult;
use crate::signature::ExportedSignature;

/// Words that can start a line with `word (` without being a function header.
const NOT_A_HEADER: &[&str] = &[
    "if", "else", "while", "for", "do", "switch", "case", "return", "goto", "sizeof", "typedef",
    "using", "template", "delete", "new", "throw",
];

pub fn parse_c_signatures(source: &str) -> ExtractResult<Vec<ExportedSignature>> {
    let tokens = tokenize(source, Dialect::C)?;
    let mut signatures = Vec::new();

    // `true` for braces that open a scope whose contents are still file scope.
    let mut scopes: Vec<bool> = Vec::new();
    let mut idx = 0;

    while idx < tokens.len() {
        let token = &tokens[idx];
        match &token.kind {
            TokenKind::LBrace => {
                scopes.push(opens_transparent_scope(&tokens, idx));
                idx += 1;
                continue;
            }
            TokenKind::RBrace => {
                scopes.pop();
                idx += 1;
                continue;
            }
            _ => {}
        }

        let at_file_scope = scopes.iter().all(|transparent| *transparent);
        if at_file_scope && token.starts_line {
            if let Some((signature, next)) = parse_header(&tokens, idx) {
                signatures.push(signature);
                idx = next;
                continue;
            }
        }
        idx += 1;
    }

    Ok(signatures)
}

fn opens_transparent_scope(tokens: &[Token], brace: usize) -> bool {
    match &tokens[..brace] {
        [.., kw, abi] if kw.is_ident("extern") => matches!(abi.kind, TokenKind::StringLiteral(_)),
        [.., kw, name] if kw.is_ident("namespace") => name.ident().is_some(),
        [.., kw] => kw.is_ident("namespace"),
        _ => false,
    }
}

/// Tries to read a header starting at `start`. Returns the signature and the
/// index just past the closing parenthesis.
fn parse_header(tokens: &[Token], start: usize) -> Option<(ExportedSignature, usize)> {
    let first = tokens[start].ident()?;
    if NOT_A_HEADER.contains(&first) {
        return None;
    }

    // Return type and name: a run of identifiers and `*` up to `(`.
    let mut open = start;
    while let Some(token) = tokens.get(open) {
        match token.kind {
            TokenKind::Identifier(_) | TokenKind::Star => open += 1,
            TokenKind::LParen => break,
            _ => return None,
        }
    }
    if tokens.get(open)?.kind != TokenKind::LParen || open < start + 2 {
        return None;
    }

    let name = tokens[open - 1].ident()?.to_string();
    let return_type = render_tokens(&tokens[start..open - 1]);
    if return_type.is_empty() || !tokens[start..open - 1].iter().any(|t| t.ident().is_some()) {
        return None;
    }

    let close = matching_close(tokens, open)?;
    let method_args = parse_args(&tokens[open + 1..close]);

    Some((
        ExportedSignature {
            method_name: name,
            return_type,
            method_args,
        },
        close + 1,
    ))
}

fn parse_args(tokens: &[Token]) -> Vec<(String, String)> {
    if tokens.is_empty() || (tokens.len() == 1 && tokens[0].is_ident("void")) {
        return Vec::new();
    }

    split_top_level(tokens, &TokenKind::Comma)
        .into_iter()
        .filter(|arg| !arg.is_empty())
        .map(|arg| {
            // The last identifier is the name, everything else is the type.
            match arg.iter().rposition(|t| t.ident().is_some()) {
                Some(pos) => {
                    let name = arg[pos].ident().unwrap_or_default().to_string();
                    let mut ty = render_tokens(&arg[..pos]);
                    ty.push_str(&render_tokens(&arg[pos + 1..]));
                    (name, ty)
                }
                None => (render_tokens(arg), String::new()),
            }
        })
        .collect()
}
