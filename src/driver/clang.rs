use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ClangConfig;

use super::Invocation;

pub(super) const PROGRAM: &str = "clang";

pub(super) fn default_output(out_dir: &Path, file_name: &str) -> PathBuf {
    out_dir.join(format!("{file_name}.o"))
}

/// `clang -shared -fPIC [-O..] [-g] [-framework F].. [-I p].. [-L p].. [-l lib].. src extra.. -o out`
pub(super) fn args(source: &Path, out: &Path, config: &ClangConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-shared".into(), "-fPIC".into()];
    if let Some(level) = config.optimize {
        args.push(level.flag().into());
    }
    if config.debug == Some(true) {
        args.push("-g".into());
    }
    for framework in config.frameworks.iter().flatten() {
        args.push("-framework".into());
        args.push(framework.into());
    }
    for dir in config.header_search_paths.iter().flatten() {
        args.push("-I".into());
        args.push(dir.into());
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
    for extra in config.additional_sources.iter().flatten() {
        args.push(extra.into());
    }
    args.push("-o".into());
    args.push(out.into());
    args
}

pub(super) fn compile(
    source: &Path,
    out: &Path,
    config: &ClangConfig,
    timeout: Duration,
) -> Invocation {
    Invocation::new(PROGRAM, args(source, out, config), timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClangOptLevel, ClangOptName};

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn minimal_invocation() {
        let args = args(Path::new("add.c"), Path::new("out/add.c.o"), &ClangConfig::default());
        assert_eq!(
            strings(args),
            vec!["-shared", "-fPIC", "add.c", "-o", "out/add.c.o"]
        );
    }

    #[test]
    fn every_flag_in_order() {
        let config = ClangConfig {
            optimize: Some(ClangOptLevel::Named(ClangOptName::Z)),
            debug: Some(true),
            frameworks: Some(vec!["Cocoa".into()]),
            header_search_paths: Some(vec!["include".into()]),
            lib_search_paths: Some(vec!["/opt/lib".into()]),
            libraries: Some(vec!["m".into(), "z".into()]),
            additional_sources: Some(vec!["util.c".into()]),
            ..ClangConfig::default()
        };
        assert_eq!(
            strings(args(Path::new("add.c"), Path::new("add.so"), &config)),
            vec![
                "-shared", "-fPIC", "-Oz", "-g", "-framework", "Cocoa", "-I", "include", "-L",
                "/opt/lib", "-l", "m", "-l", "z", "add.c", "util.c", "-o", "add.so",
            ]
        );
    }

    #[test]
    fn debug_false_adds_nothing() {
        let config = ClangConfig {
            debug: Some(false),
            optimize: Some(ClangOptLevel::Level(0)),
            ..ClangConfig::default()
        };
        let args = strings(args(Path::new("a.c"), Path::new("a.o"), &config));
        assert!(!args.contains(&"-g".to_string()));
        assert!(args.contains(&"-O0".to_string()));
    }
}
