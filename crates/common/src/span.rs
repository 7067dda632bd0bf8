//! Source locations shared by the tokenizer and the signature extractors.
//!
//! # Note
//!
//! Offsets are byte offsets into the original source text. Lines and columns
//! are 1-based and only used for diagnostics.

/// A byte range of source text plus the line/column where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    start: usize,
    end: usize,
    line: usize,
    column: usize,
}

impl Span {
    /// Creates a span anchored at `line`/`column`.
    #[inline]
    #[must_use]
    pub const fn at(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// 1-based line, or 0 when unknown.
    #[inline]
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// 1-based column, or 0 when unknown.
    #[inline]
    #[must_use]
    pub const fn column(&self) -> usize {
        self.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_span_has_no_position() {
        let span = Span::default();
        assert_eq!((span.line(), span.column()), (0, 0));
        assert_eq!(Span::at(4, 9, 2, 5).line(), 2);
    }
}
