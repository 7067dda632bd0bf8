use crate::token::{Token, TokenKind};
use common::Span;

use thiserror::Error;

/// Source grammar the tokenizer runs under.
///
/// The dialects differ only in comment nesting, preprocessor lines and the
/// literal forms that could otherwise swallow a function header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// C, C++ and Objective-C. `#` directives are skipped as whole lines.
    C,
    /// Kotlin. Block comments nest, `"""` raw strings, backtick identifiers.
    Kotlin,
    /// Rust. Block comments nest, raw strings, lifetimes.
    Rust,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("unterminated string literal (line {line}, column {column})")]
    UnterminatedString {
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("unterminated character literal (line {line}, column {column})")]
    UnterminatedChar {
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("unterminated block comment (line {line}, column {column})")]
    UnterminatedComment {
        line: usize,
        column: usize,
        span: Span,
    },
}

impl LexerError {
    pub fn span(&self) -> Span {
        match self {
            LexerError::UnterminatedString { span, .. }
            | LexerError::UnterminatedChar { span, .. }
            | LexerError::UnterminatedComment { span, .. } => *span,
        }
    }
}

pub type LexResult<T> = Result<T, Vec<LexerError>>;

struct LexerState<'a> {
    dialect: Dialect,
    text: &'a str,
    source: &'a [u8],
    tokens: Vec<Token>,
    errors: Vec<LexerError>,
    offset: usize,
    line: usize,
    column: usize,
    line_has_token: bool,
}

impl<'a> LexerState<'a> {
    fn new(source: &'a str, dialect: Dialect) -> Self {
        Self {
            dialect,
            text: source,
            source: source.as_bytes(),
            tokens: Vec::new(),
            errors: Vec::new(),
            offset: 0,
            line: 1,
            column: 1,
            line_has_token: false,
        }
    }

    fn current_char(&self) -> Option<u8> {
        self.source.get(self.offset).copied()
    }

    fn peek_char(&self, ahead: usize) -> Option<u8> {
        self.source.get(self.offset + ahead).copied()
    }

    fn is_at_end(&self) -> bool {
        self.offset >= self.source.len()
    }

    fn advance(&mut self, count: usize) {
        for _ in 0..count {
            match self.current_char() {
                Some(b'\r') => {
                    self.offset += 1;
                    if self.current_char() == Some(b'\n') {
                        self.offset += 1;
                    }
                    self.new_line();
                }
                Some(b'\n') => {
                    self.offset += 1;
                    self.new_line();
                }
                Some(_) => {
                    self.offset += 1;
                    self.column += 1;
                }
                None => return,
            }
        }
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.column = 1;
        self.line_has_token = false;
    }

    fn span_from(&self, start: usize, line: usize, column: usize) -> Span {
        Span::at(start, self.offset, line, column)
    }

    fn emit(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) {
        let span = self.span_from(start, line, column);
        let starts_line = !self.line_has_token;
        self.tokens.push(Token::new(kind, span, starts_line));
        self.line_has_token = true;
    }

    fn emit_punct(&mut self, kind: TokenKind, len: usize) {
        let (start, line, column) = (self.offset, self.line, self.column);
        self.advance(len);
        self.emit(kind, start, line, column);
    }

    fn skip_to_end_of_line(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == b'\n' || ch == b'\r' {
                return;
            }
            self.advance(1);
        }
    }

    /// Skips a preprocessor directive, following `\` line continuations.
    fn skip_directive(&mut self) {
        while let Some(ch) = self.current_char() {
            match ch {
                b'\\' if matches!(self.peek_char(1), Some(b'\n' | b'\r')) => self.advance(2),
                b'\n' | b'\r' => return,
                _ => self.advance(1),
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let (start, line, column) = (self.offset, self.line, self.column);
        let nests = self.dialect != Dialect::C;
        let mut depth = 0usize;

        while !self.is_at_end() {
            match (self.current_char(), self.peek_char(1)) {
                (Some(b'/'), Some(b'*')) if nests || depth == 0 => {
                    depth += 1;
                    self.advance(2);
                }
                (Some(b'*'), Some(b'/')) => {
                    depth -= 1;
                    self.advance(2);
                    if depth == 0 {
                        return;
                    }
                }
                _ => self.advance(1),
            }
        }

        let span = self.span_from(start, line, column);
        self.errors
            .push(LexerError::UnterminatedComment { line, column, span });
    }

    /// Reads a quoted literal starting at the opening `quote`. Returns the
    /// contents, or `None` when the input ends first.
    fn read_quoted(&mut self, quote: u8) -> Option<String> {
        self.advance(1);
        let content_start = self.offset;
        while let Some(ch) = self.current_char() {
            if ch == b'\\' {
                self.advance(2);
                continue;
            }
            if ch == quote {
                let content = self.text[content_start..self.offset].to_string();
                self.advance(1);
                return Some(content);
            }
            self.advance(1);
        }
        None
    }

    fn lex_string(&mut self) {
        let (start, line, column) = (self.offset, self.line, self.column);

        if self.dialect == Dialect::Kotlin
            && self.peek_char(1) == Some(b'"')
            && self.peek_char(2) == Some(b'"')
        {
            self.advance(3);
            let content_start = self.offset;
            while !self.is_at_end() {
                if self.source[self.offset..].starts_with(b"\"\"\"") {
                    let content = self.text[content_start..self.offset].to_string();
                    self.advance(3);
                    self.emit(TokenKind::StringLiteral(content), start, line, column);
                    return;
                }
                self.advance(1);
            }
        } else if let Some(content) = self.read_quoted(b'"') {
            self.emit(TokenKind::StringLiteral(content), start, line, column);
            return;
        }

        let span = self.span_from(start, line, column);
        self.errors
            .push(LexerError::UnterminatedString { line, column, span });
    }

    /// Rust raw strings: `r"..."`, `r#"..."#`, `br"..."`. Returns false when
    /// the input at the cursor is not a raw string.
    fn try_lex_raw_string(&mut self) -> bool {
        let prefix = if self.current_char() == Some(b'b') { 1 } else { 0 };
        if self.peek_char(prefix) != Some(b'r') {
            return false;
        }
        let mut hashes = 0;
        while self.peek_char(prefix + 1 + hashes) == Some(b'#') {
            hashes += 1;
        }
        if self.peek_char(prefix + 1 + hashes) != Some(b'"') {
            return false;
        }

        let (start, line, column) = (self.offset, self.line, self.column);
        self.advance(prefix + 2 + hashes);
        let content_start = self.offset;
        let mut terminator = vec![b'"'];
        terminator.extend(std::iter::repeat_n(b'#', hashes));

        while !self.is_at_end() {
            if self.source[self.offset..].starts_with(&terminator) {
                let content = self.text[content_start..self.offset].to_string();
                self.advance(terminator.len());
                self.emit(TokenKind::StringLiteral(content), start, line, column);
                return true;
            }
            self.advance(1);
        }

        let span = self.span_from(start, line, column);
        self.errors
            .push(LexerError::UnterminatedString { line, column, span });
        true
    }

    fn lex_quote(&mut self) {
        let (start, line, column) = (self.offset, self.line, self.column);

        // `'a` without a closing quote right after the first char is a lifetime.
        let first_len = self.text[self.offset + 1..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        if self.dialect == Dialect::Rust
            && self.peek_char(1).is_some_and(is_ident_start)
            && self.peek_char(1 + first_len) != Some(b'\'')
        {
            self.advance(1);
            let name_start = self.offset;
            while self.current_char().is_some_and(is_ident_continue) {
                self.advance(1);
            }
            let name = self.text[name_start..self.offset].to_string();
            self.emit(TokenKind::Lifetime(name), start, line, column);
            return;
        }

        match self.read_quoted(b'\'') {
            Some(content) => self.emit(TokenKind::CharLiteral(content), start, line, column),
            None => {
                let span = self.span_from(start, line, column);
                self.errors
                    .push(LexerError::UnterminatedChar { line, column, span });
            }
        }
    }

    fn lex_identifier(&mut self) {
        let (start, line, column) = (self.offset, self.line, self.column);
        while self.current_char().is_some_and(is_ident_continue) {
            self.advance(1);
        }
        let ident = self.text[start..self.offset].to_string();
        self.emit(TokenKind::Identifier(ident), start, line, column);
    }

    fn lex_backtick_identifier(&mut self) {
        let (start, line, column) = (self.offset, self.line, self.column);
        match self.read_quoted(b'`') {
            Some(name) => self.emit(TokenKind::Identifier(name), start, line, column),
            None => {
                let span = self.span_from(start, line, column);
                self.errors
                    .push(LexerError::UnterminatedString { line, column, span });
            }
        }
    }

    fn lex_number(&mut self) {
        let (start, line, column) = (self.offset, self.line, self.column);
        while let Some(ch) = self.current_char() {
            let fractional =
                ch == b'.' && self.peek_char(1).is_some_and(|next| next.is_ascii_digit());
            // C++14 digit separator: `10'000`, `0xFF'FF`.
            let separator = ch == b'\''
                && self.dialect == Dialect::C
                && self.peek_char(1).is_some_and(|next| next.is_ascii_hexdigit());
            if is_ident_continue(ch) || fractional || separator {
                self.advance(1);
            } else {
                break;
            }
        }
        let text = self.text[start..self.offset].to_string();
        self.emit(TokenKind::Number(text), start, line, column);
    }

    fn lex_other(&mut self) {
        let ch = self.text[self.offset..].chars().next().unwrap_or('\u{fffd}');
        let (start, line, column) = (self.offset, self.line, self.column);
        self.offset += ch.len_utf8();
        self.column += 1;
        self.emit(TokenKind::Punct(ch), start, line, column);
    }

    fn tokenize_token(&mut self, ch: u8) {
        match ch {
            b'(' => self.emit_punct(TokenKind::LParen, 1),
            b')' => self.emit_punct(TokenKind::RParen, 1),
            b'{' => self.emit_punct(TokenKind::LBrace, 1),
            b'}' => self.emit_punct(TokenKind::RBrace, 1),
            b'[' => self.emit_punct(TokenKind::LBracket, 1),
            b']' => self.emit_punct(TokenKind::RBracket, 1),
            b'<' => self.emit_punct(TokenKind::Lt, 1),
            b'>' => self.emit_punct(TokenKind::Gt, 1),
            b',' => self.emit_punct(TokenKind::Comma, 1),
            b';' => self.emit_punct(TokenKind::Semicolon, 1),
            b'*' => self.emit_punct(TokenKind::Star, 1),
            b'&' => self.emit_punct(TokenKind::Amp, 1),
            b'=' => self.emit_punct(TokenKind::Equals, 1),
            b'?' => self.emit_punct(TokenKind::Question, 1),
            b'.' => self.emit_punct(TokenKind::Dot, 1),
            b'#' => self.emit_punct(TokenKind::Hash, 1),
            b':' => {
                if self.peek_char(1) == Some(b':') {
                    self.emit_punct(TokenKind::PathSep, 2);
                } else {
                    self.emit_punct(TokenKind::Colon, 1);
                }
            }
            b'-' => {
                if self.peek_char(1) == Some(b'>') {
                    self.emit_punct(TokenKind::Arrow, 2);
                } else {
                    self.emit_punct(TokenKind::Punct('-'), 1);
                }
            }
            b'"' => self.lex_string(),
            b'\'' => self.lex_quote(),
            b'`' if self.dialect == Dialect::Kotlin => self.lex_backtick_identifier(),
            b'b' | b'r' if self.dialect == Dialect::Rust && self.try_lex_raw_string() => {}
            b'b' if self.dialect == Dialect::Rust && self.peek_char(1) == Some(b'"') => {
                self.advance(1);
                self.lex_string();
            }
            ch if is_ident_start(ch) => self.lex_identifier(),
            ch if ch.is_ascii_digit() => self.lex_number(),
            _ => self.lex_other(),
        }
    }

    fn run(&mut self) {
        while let Some(ch) = self.current_char() {
            match ch {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0c => self.advance(1),
                b'/' if self.peek_char(1) == Some(b'/') => self.skip_to_end_of_line(),
                b'/' if self.peek_char(1) == Some(b'*') => self.skip_block_comment(),
                b'#' if self.dialect == Dialect::C && !self.line_has_token => {
                    self.skip_directive()
                }
                _ => self.tokenize_token(ch),
            }
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch >= 0x80
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch >= 0x80
}

/// Splits `source` into tokens, dropping whitespace and comments.
pub fn tokenize(source: &str, dialect: Dialect) -> LexResult<Vec<Token>> {
    let mut state = LexerState::new(source, dialect);
    state.tokens.reserve(source.len() / 4);
    state.run();

    if state.errors.is_empty() {
        Ok(state.tokens)
    } else {
        Err(state.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_kinds(source: &str, dialect: Dialect) -> Vec<TokenKind> {
        tokenize(source, dialect)
            .expect("lexing should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.to_string())
    }

    #[test]
    fn multibyte_char_literal_in_rust() {
        assert_eq!(
            token_kinds("'é' 'a", Dialect::Rust),
            vec![
                TokenKind::CharLiteral("é".to_string()),
                TokenKind::Lifetime("a".to_string()),
            ]
        );
    }

    #[test]
    fn c_digit_separators_stay_in_the_number() {
        assert_eq!(
            token_kinds("1'000'000 'x'", Dialect::C),
            vec![
                TokenKind::Number("1'000'000".to_string()),
                TokenKind::CharLiteral("x".to_string()),
            ]
        );
    }

    #[test]
    fn crlf_and_lf_inputs_produce_same_token_stream() {
        let lf_source = "int add(int a, int b)\n{\n    return a + b;\n}\n";
        let crlf_source = lf_source.replace('\n', "\r\n");

        assert_eq!(
            token_kinds(&crlf_source, Dialect::C),
            token_kinds(lf_source, Dialect::C)
        );
    }

    #[test]
    fn c_directives_and_comments_are_skipped() {
        let source = "#include <stdio.h>\n#define TWICE(x) \\\n  ((x) * 2)\n// int hidden(int a)\n/* int gone(void) */ int shown(void);\n";
        assert_eq!(
            token_kinds(source, Dialect::C),
            vec![
                ident("int"),
                ident("shown"),
                TokenKind::LParen,
                ident("void"),
                TokenKind::RParen,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn starts_line_marks_first_token_only() {
        let tokens = tokenize("int\nadd (x)\n", Dialect::C).unwrap();
        let flags: Vec<bool> = tokens.iter().map(|t| t.starts_line).collect();
        assert_eq!(flags, vec![true, true, false, false, false]);
        assert_eq!(tokens[1].line(), 2);
        assert_eq!(tokens[1].span.column(), 1);
    }

    #[test]
    fn rust_lifetimes_raw_strings_and_nested_comments() {
        let source = "/* outer /* inner */ still */ fn f<'a>(s: &'a str) { let _ = r#\"fn x()\"#; }";
        let kinds = token_kinds(source, Dialect::Rust);
        assert_eq!(kinds[0], ident("fn"));
        assert!(kinds.contains(&TokenKind::Lifetime("a".into())));
        assert!(kinds.contains(&TokenKind::StringLiteral("fn x()".into())));
        assert!(!kinds.contains(&ident("x")));
    }

    #[test]
    fn rust_char_literal_is_not_a_lifetime() {
        let kinds = token_kinds("let c = 'x';", Dialect::Rust);
        assert!(kinds.contains(&TokenKind::CharLiteral("x".into())));
    }

    #[test]
    fn kotlin_raw_strings_hide_their_contents() {
        let source = "val s = \"\"\"fun hidden(): Int\"\"\"\nfun shown(): Int = 1";
        let kinds = token_kinds(source, Dialect::Kotlin);
        assert!(!kinds.contains(&ident("hidden")));
        assert!(kinds.contains(&ident("shown")));
    }

    #[test]
    fn path_separator_and_arrow_are_single_tokens() {
        let kinds = token_kinds("std::os::raw -> x", Dialect::Rust);
        assert_eq!(
            kinds,
            vec![
                ident("std"),
                TokenKind::PathSep,
                ident("os"),
                TokenKind::PathSep,
                ident("raw"),
                TokenKind::Arrow,
                ident("x"),
            ]
        );
    }

    #[test]
    fn unterminated_literals_are_reported() {
        let errors = tokenize("char *s = \"oops;\n", Dialect::C).unwrap_err();
        assert!(matches!(errors[0], LexerError::UnterminatedString { line: 1, .. }));

        let errors = tokenize("int a; /* never closed", Dialect::C).unwrap_err();
        assert!(matches!(errors[0], LexerError::UnterminatedComment { .. }));
    }
}
