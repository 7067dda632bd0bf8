//! Kotlin/Native grammar: `fun <name>(<name>: <type>, ...): <returnType>`.
//!
//! Only top-level functions are exported through `kotlin.root`, so functions
//! nested in classes, objects or bodies are ignored. Every exported function
//! must spell out its return type.

use lexer::{Dialect, Token, TokenKind, tokenize};

use crate::cursor::{find_top_level, matching_close, render_tokens, split_top_level};
use crate::error::{ExtractError, ExtractResult, KOTLIN_RETURN_TYPE_RULE};
use crate::signature::ExportedSignature;

pub fn parse_kotlin_signatures(source: &str) -> ExtractResult<Vec<ExportedSignature>> {
    let tokens = tokenize(source, Dialect::Kotlin)?;
    let mut signatures = Vec::new();
    let mut depth = 0usize;
    let mut idx = 0;

    while idx < tokens.len() {
        match tokens[idx].kind {
            TokenKind::LBrace => depth += 1,
            TokenKind::RBrace => depth = depth.saturating_sub(1),
            _ => {}
        }

        if depth == 0 && tokens[idx].is_ident("fun") {
            if let Some((signature, next)) = parse_function(&tokens, idx)? {
                signatures.push(signature);
                idx = next;
                continue;
            }
        }
        idx += 1;
    }

    Ok(signatures)
}

fn parse_function(tokens: &[Token], fun: usize) -> ExtractResult<Option<(ExportedSignature, usize)>> {
    let mut cursor = fun + 1;

    // `fun <T> name(...)`: skip the type parameter list.
    if tokens.get(cursor).map(|t| &t.kind) == Some(&TokenKind::Lt) {
        match matching_close(tokens, cursor) {
            Some(close) => cursor = close + 1,
            None => return Ok(None),
        }
    }

    let Some(name) = tokens.get(cursor).and_then(Token::ident) else {
        return Ok(None);
    };
    let name = name.to_string();
    let open = cursor + 1;
    // Extension functions (`fun String.shout()`) and anything else without a
    // parameter list right after the name are not exported.
    if tokens.get(open).map(|t| &t.kind) != Some(&TokenKind::LParen) {
        return Ok(None);
    }
    let Some(close) = matching_close(tokens, open) else {
        return Ok(None);
    };

    let method_args = parse_args(&tokens[open + 1..close]);

    let line = tokens[fun].line();
    if tokens.get(close + 1).map(|t| &t.kind) != Some(&TokenKind::Colon) {
        return Err(ExtractError::grammar(
            KOTLIN_RETURN_TYPE_RULE,
            format!("fun {name}"),
            line,
        ));
    }

    let (return_type, next) = read_type(tokens, close + 2);
    if return_type.is_empty() {
        return Err(ExtractError::grammar(
            KOTLIN_RETURN_TYPE_RULE,
            format!("fun {name}"),
            line,
        ));
    }

    Ok(Some((
        ExportedSignature {
            method_name: name,
            return_type,
            method_args,
        },
        next,
    )))
}

/// Reads `Name(.Name)*(<...>)?(?)?` starting at `start`.
fn read_type(tokens: &[Token], start: usize) -> (String, usize) {
    let mut end = start;
    loop {
        if tokens.get(end).and_then(Token::ident).is_none() {
            break;
        }
        end += 1;
        if tokens.get(end).map(|t| &t.kind) == Some(&TokenKind::Dot)
            && tokens.get(end + 1).and_then(Token::ident).is_some()
        {
            end += 1;
            continue;
        }
        break;
    }
    if end == start {
        return (String::new(), start);
    }
    if tokens.get(end).map(|t| &t.kind) == Some(&TokenKind::Lt) {
        if let Some(close) = matching_close(tokens, end) {
            end = close + 1;
        }
    }
    if tokens.get(end).map(|t| &t.kind) == Some(&TokenKind::Question) {
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
                // `vararg`, annotations and other modifiers precede the name.
                let name = arg[..colon]
                    .iter()
                    .rev()
                    .find_map(Token::ident)
                    .unwrap_or_default()
                    .to_string();
                let ty_tokens = &arg[colon + 1..];
                let ty_end = find_top_level(ty_tokens, &TokenKind::Equals).unwrap_or(ty_tokens.len());
                (name, render_tokens(&ty_tokens[..ty_end]))
            }
            None => (render_tokens(arg), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_typed_function() {
        let source = "fun add(a: Int, b: Int): Int {\n    return a + b\n}\n";
        assert_eq!(
            parse_kotlin_signatures(source).unwrap(),
            vec![ExportedSignature::new("add", "Int", [("a", "Int"), ("b", "Int")])]
        );
    }

    #[test]
    fn missing_return_type_is_fatal() {
        let err = parse_kotlin_signatures("fun greet(name: String) {\n    println(name)\n}\n")
            .unwrap_err();
        match err {
            ExtractError::GrammarViolation { rule, subject, line } => {
                assert_eq!(rule, KOTLIN_RETURN_TYPE_RULE);
                assert_eq!(subject, "fun greet");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn expression_body_without_type_is_fatal() {
        assert!(parse_kotlin_signatures("fun answer() = 42").is_err());
    }

    #[test]
    fn nullable_generic_and_qualified_types() {
        let source = "fun pick(xs: List<Int>, fallback: kotlin.Int = 0): Map<String, Int>? = null";
        let sigs = parse_kotlin_signatures(source).unwrap();
        assert_eq!(sigs[0].return_type, "Map<String, Int>?");
        assert_eq!(
            sigs[0].method_args,
            vec![
                ("xs".to_string(), "List<Int>".to_string()),
                ("fallback".to_string(), "kotlin.Int".to_string()),
            ]
        );
    }

    #[test]
    fn members_and_extensions_are_skipped() {
        let source = r#"
class Counter {
    fun bump(by: Int) { }
}
fun String.shout(): String = uppercase()
private fun helper(x: Double): Double = x
"#;
        let sigs = parse_kotlin_signatures(source).unwrap();
        assert_eq!(sigs, vec![ExportedSignature::new("helper", "Double", [("x", "Double")])]);
    }

    #[test]
    fn fun_inside_strings_and_comments_is_ignored() {
        let source = "// fun broken(x: Int)\nval s = \"fun nope(y: Int)\"\nfun ok(): Unit {}\n";
        let sigs = parse_kotlin_signatures(source).unwrap();
        assert_eq!(sigs, vec![ExportedSignature::without_args("ok", "Unit")]);
    }
}
