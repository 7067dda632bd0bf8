use std::path::PathBuf;

use thiserror::Error;

use crate::types::AbiTypeTag;

pub type BindResult<T> = Result<T, BindError>;
pub type CallResult<T> = Result<T, CallError>;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("failed to load native module {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol `{symbol}` not found in {}", path.display())]
    MissingSymbol {
        symbol: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("`{function}` has an unmapped type `{raw}` in {slot}")]
    UnknownType {
        function: String,
        slot: String,
        raw: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum CallError {
    #[error("`{function}` takes {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of `{function}` expects {expected}, got {found}")]
    Mismatch {
        function: String,
        index: usize,
        expected: AbiTypeTag,
        found: String,
    },

    #[error("argument {index} of `{function}` contains an interior NUL byte")]
    InvalidString { function: String, index: usize },
}
