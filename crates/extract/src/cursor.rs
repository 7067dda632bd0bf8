//! Token-slice helpers shared by the backend parsers.

use lexer::{Token, TokenKind};

fn closer_for(kind: &TokenKind) -> Option<TokenKind> {
    match kind {
        TokenKind::LParen => Some(TokenKind::RParen),
        TokenKind::LBracket => Some(TokenKind::RBracket),
        TokenKind::LBrace => Some(TokenKind::RBrace),
        TokenKind::Lt => Some(TokenKind::Gt),
        _ => None,
    }
}

/// Index of the token that closes the group opened at `open`.
pub(crate) fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let open_kind = &tokens.get(open)?.kind;
    let close_kind = closer_for(open_kind)?;
    let mut depth = 0usize;

    for (idx, token) in tokens.iter().enumerate().skip(open) {
        if &token.kind == open_kind {
            depth += 1;
        } else if token.kind == close_kind {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

/// Splits `tokens` on `separator` where it is not nested in any bracket pair.
/// A trailing empty segment (trailing comma) is dropped.
pub(crate) fn split_top_level<'t>(tokens: &'t [Token], separator: &TokenKind) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;

    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace | TokenKind::Lt => {
                depth += 1
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::Gt => {
                depth -= 1
            }
            _ => {}
        }
        if depth == 0 && &token.kind == separator {
            parts.push(&tokens[start..idx]);
            start = idx + 1;
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }
    parts
}

/// Position of the first top-level `target` token, if any.
pub(crate) fn find_top_level(tokens: &[Token], target: &TokenKind) -> Option<usize> {
    let mut depth = 0isize;
    for (idx, token) in tokens.iter().enumerate() {
        if depth == 0 && &token.kind == target {
            return Some(idx);
        }
        match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace | TokenKind::Lt => {
                depth += 1
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::Gt => {
                depth -= 1
            }
            _ => {}
        }
    }
    None
}

fn is_wordish(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier(_)
            | TokenKind::Number(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::CharLiteral(_)
            | TokenKind::Lifetime(_)
    )
}

/// Renders a type token run back to compact source text: `const char*`,
/// `*const c_char`, `Option<extern "C" fn(i32) -> i32>`.
pub(crate) fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&TokenKind> = None;

    for token in tokens {
        if let Some(prev) = prev {
            let spaced = (is_wordish(prev) && is_wordish(&token.kind))
                || matches!(prev, TokenKind::Comma | TokenKind::Arrow)
                || token.kind == TokenKind::Arrow;
            if spaced {
                out.push(' ');
            }
        }
        out.push_str(&token.kind.to_string());
        prev = Some(&token.kind);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexer::{Dialect, tokenize};

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source, Dialect::Rust).unwrap()
    }

    #[test]
    fn render_keeps_pointer_and_fn_types_compact() {
        assert_eq!(render_tokens(&tokens("const char *")), "const char*");
        assert_eq!(render_tokens(&tokens("* const c_char")), "*const c_char");
        assert_eq!(
            render_tokens(&tokens("Option < extern \"C\" fn ( i32 , u8 ) -> i32 >")),
            "Option<extern \"C\" fn(i32, u8) -> i32>"
        );
    }

    #[test]
    fn split_ignores_nested_commas() {
        let toks = tokens("a: Map<K, V>, b: fn(i32, i32),");
        let parts = split_top_level(&toks, &TokenKind::Comma);
        assert_eq!(parts.len(), 2);
        assert_eq!(render_tokens(parts[0]), "a:Map<K, V>");
    }

    #[test]
    fn matching_close_handles_nesting() {
        let toks = tokens("(a, (b), [c]) d");
        assert_eq!(matching_close(&toks, 0), Some(10));
        assert_eq!(matching_close(&toks, 5), None);
    }
}
