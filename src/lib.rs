//! Builds C, Kotlin/Native and Rust sources into loadable native modules,
//! binds their exported functions and writes TypeScript declaration stubs.

pub mod cli;
pub mod config;
pub mod driver;
pub mod logger;
pub mod pipeline;

pub use config::{ModuleConfig, PipelineConfig};
pub use driver::{BuildDriver, BuildError, BuildRequest, DuctRunner, Invocation, ToolchainRunner};
pub use pipeline::{Inspection, LoadedModule, Pipeline};
