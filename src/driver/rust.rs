use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::RustConfig;

use super::Invocation;

pub(super) const PROGRAM: &str = "rustc";

pub(super) fn default_output(out_dir: &Path, file_name: &str) -> PathBuf {
    out_dir.join(format!("{file_name}.o"))
}

/// `rustc --crate-type cdylib [-C opt-level=N] [-g] [-L p].. [-l lib].. src -o out`
pub(super) fn args(source: &Path, out: &Path, config: &RustConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--crate-type".into(), "cdylib".into()];
    if let Some(level) = config.optimize {
        args.push("-C".into());
        args.push(format!("opt-level={}", level.value()).into());
    }
    if config.debug == Some(true) {
        args.push("-g".into());
    }
    for dir in config.lib_search_paths.iter().flatten() {
        args.push("-L".into());
        args.push(dir.into());
    }
    for lib in config.libraries.iter().flatten() {
        args.push("-l".into());
        args.push(lib.into());
    }
    args.push(source.into());
    args.push("-o".into());
    args.push(out.into());
    args
}

pub(super) fn compile(source: &Path, out: &Path, config: &RustConfig, timeout: Duration) -> Invocation {
    Invocation::new(PROGRAM, args(source, out, config), timeout)
}
