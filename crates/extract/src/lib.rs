//! Exported-function signature extraction for the supported backends.
//!
//! Each backend recognises one narrow declaration shape over the shared token
//! stream from the `lexer` crate:
//!
//! | backend | shape                                              |
//! |---------|----------------------------------------------------|
//! | clang   | `<ret> <name>(<type> <name>, ...)` at line start    |
//! | konan   | `fun <name>(<name>: <type>, ...): <ret>`           |
//! | rust    | `extern "C" ... fn <name>(<name>: <type>, ...) -> <ret>` |
//!
//! Extraction never validates names, arity or types. That is left to the
//! type map and the binder.

mod c;
mod cursor;
mod error;
mod kotlin;
mod rust;
mod signature;

use std::fs;
use std::io;
use std::path::Path;

use common::Backend;
use tracing::debug;

pub use c::parse_c_signatures;
pub use error::{ExtractError, ExtractResult, KOTLIN_RETURN_TYPE_RULE};
pub use kotlin::parse_kotlin_signatures;
pub use rust::parse_rust_signatures;
pub use signature::ExportedSignature;

/// Parses already-loaded source text with the grammar of `backend`.
pub fn parse_signatures(backend: Backend, source: &str) -> ExtractResult<Vec<ExportedSignature>> {
    match backend {
        Backend::Clang => parse_c_signatures(source),
        Backend::Konan => parse_kotlin_signatures(source),
        Backend::Rust => parse_rust_signatures(source),
    }
}

/// Reads `path` and extracts its exported signatures.
///
/// A missing file is fatal; a file without any matching declaration yields an
/// empty list.
pub fn extract_signatures(backend: Backend, path: &Path) -> ExtractResult<Vec<ExportedSignature>> {
    debug!(path = %path.display(), %backend, "collecting exported signatures");

    let source = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ExtractError::MissingSource {
            path: path.to_path_buf(),
        },
        _ => ExtractError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let signatures = parse_signatures(backend, &source)?;
    debug!(
        path = %path.display(),
        count = signatures.len(),
        "collected exported signatures"
    );
    Ok(signatures)
}
