use std::io;
use std::path::PathBuf;

use lexer::LexerError;
use thiserror::Error;

pub const KOTLIN_RETURN_TYPE_RULE: &str = "Kotlin exports require an explicit return type";

pub type ExtractResult<T> = Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not find source file {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("{rule} (`{subject}`, line {line})")]
    GrammarViolation {
        rule: String,
        subject: String,
        line: usize,
    },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    pub(crate) fn grammar(rule: impl Into<String>, subject: impl Into<String>, line: usize) -> Self {
        ExtractError::GrammarViolation {
            rule: rule.into(),
            subject: subject.into(),
            line,
        }
    }
}

impl From<Vec<LexerError>> for ExtractError {
    fn from(errors: Vec<LexerError>) -> Self {
        let first = errors.first();
        let line = first.map(|err| err.span().line()).unwrap_or(0);
        let rule = first
            .map(ToString::to_string)
            .unwrap_or_else(|| "source could not be tokenized".to_string());
        ExtractError::grammar(rule, "source", line)
    }
}
