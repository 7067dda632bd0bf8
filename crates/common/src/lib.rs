//! Types shared across the nativekit crates.

pub mod backend;
pub mod span;

pub use backend::Backend;
pub use span::Span;
