//! Kotlin/Native builds take three steps. konanc produces a static library and
//! an `_api.h` header. A generated C++ shim re-exports every function with C
//! linkage. clang++ then links shim and library into a shared object.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use extract::ExportedSignature;
use ffi::render_kotlin_shim;

use crate::config::KonanConfig;

use super::{Invocation, OutputPlan, append_suffix};

pub(super) const PROGRAM: &str = "konanc";
pub(super) const LINKER: &str = "clang++";

#[cfg(target_os = "macos")]
const LINK_FRAMEWORKS: &[&str] = &["Cocoa", "CoreFoundation"];
#[cfg(not(target_os = "macos"))]
const LINK_FRAMEWORKS: &[&str] = &[];

pub(super) fn default_output(out_dir: &Path, file_name: &str) -> PathBuf {
    out_dir.join(format!("lib{file_name}.a"))
}

/// The shared object linked from the static library at `primary`.
pub(super) fn final_artifact(primary: &Path) -> PathBuf {
    append_suffix(primary, ".o")
}

pub(super) fn intermediate_object(primary: &Path) -> PathBuf {
    append_suffix(primary, ".intermediate.o")
}

/// `out/libmath.kt.a` -> `out/libmath.kt_api.h`
pub(super) fn api_header(primary: &Path) -> PathBuf {
    let raw = primary.to_string_lossy();
    let stem = raw.strip_suffix(".a").unwrap_or(&raw);
    PathBuf::from(format!("{stem}_api.h"))
}

/// Prefix of the `<prefix>_symbols()` accessor konanc generates, derived from
/// the library file name: `libmath.kt.a` -> `libmath_kt`.
pub(super) fn symbol_prefix(primary: &Path) -> String {
    let name = primary
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".a").unwrap_or(&name);
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

/// `konanc -nomain -produce static [-opt] [-g] [-l lib].. src extra.. -o out`
pub(super) fn args(source: &Path, primary: &Path, config: &KonanConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-nomain".into(), "-produce".into(), "static".into()];
    if config.optimize == Some(true) {
        args.push("-opt".into());
    }
    if config.debug == Some(true) {
        args.push("-g".into());
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
    args.push(primary.into());
    args
}

pub(super) fn steps(
    source: &Path,
    outputs: &OutputPlan,
    config: &KonanConfig,
    signatures: &[ExportedSignature],
    timeout: Duration,
) -> Vec<Invocation> {
    let primary = &outputs.primary;
    let intermediate = intermediate_object(primary);

    let header = api_header(primary);
    let shim = render_kotlin_shim(
        &header.to_string_lossy(),
        &symbol_prefix(primary),
        signatures,
    );
    let wrapper = Invocation::new(
        LINKER,
        vec![
            "-c".into(),
            "-x".into(),
            "c++".into(),
            "-o".into(),
            intermediate.clone().into(),
            "-".into(),
        ],
        timeout,
    )
    .with_stdin(shim);

    let mut link_args: Vec<OsString> = vec![
        "-shared".into(),
        intermediate.into(),
        primary.into(),
        "-o".into(),
        outputs.artifact.clone().into(),
    ];
    for framework in LINK_FRAMEWORKS {
        link_args.push("-framework".into());
        link_args.push((*framework).into());
    }

    vec![
        Invocation::new(PROGRAM, args(source, primary, config), timeout),
        wrapper,
        Invocation::new(LINKER, link_args, timeout),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths() {
        let primary = Path::new("out/libmath.kt.a");
        assert_eq!(final_artifact(primary), PathBuf::from("out/libmath.kt.a.o"));
        assert_eq!(
            intermediate_object(primary),
            PathBuf::from("out/libmath.kt.a.intermediate.o")
        );
        assert_eq!(api_header(primary), PathBuf::from("out/libmath.kt_api.h"));
        assert_eq!(symbol_prefix(primary), "libmath_kt");
        assert_eq!(symbol_prefix(Path::new("build/libgeo-2.a")), "libgeo_2");
    }

    #[test]
    fn three_steps_with_shim_on_stdin() {
        let outputs = OutputPlan {
            primary: PathBuf::from("out/libmath.kt.a"),
            artifact: PathBuf::from("out/libmath.kt.a.o"),
        };
        let sigs = vec![ExportedSignature::new("add", "Int", [("a", "Int"), ("b", "Int")])];
        let config = KonanConfig {
            optimize: Some(true),
            ..KonanConfig::default()
        };
        let steps = steps(
            Path::new("math.kt"),
            &outputs,
            &config,
            &sigs,
            Duration::from_secs(60),
        );
        assert_eq!(steps.len(), 3);

        assert_eq!(steps[0].program, "konanc");
        assert_eq!(
            steps[0].argv(),
            vec!["-nomain", "-produce", "static", "-opt", "math.kt", "-o", "out/libmath.kt.a"]
        );

        assert_eq!(steps[1].program, "clang++");
        assert_eq!(
            steps[1].argv(),
            vec!["-c", "-x", "c++", "-o", "out/libmath.kt.a.intermediate.o", "-"]
        );
        let shim = String::from_utf8(steps[1].stdin.clone().unwrap()).unwrap();
        assert!(shim.starts_with("#include \"out/libmath.kt_api.h\"\n"));
        assert!(shim.contains("int add(int a, int b) { return libmath_kt_symbols()->kotlin.root.add(a, b); }"));

        let link = steps[2].argv();
        assert_eq!(
            &link[..5],
            &[
                "-shared",
                "out/libmath.kt.a.intermediate.o",
                "out/libmath.kt.a",
                "-o",
                "out/libmath.kt.a.o"
            ]
        );
        assert_eq!(link.len(), 5 + 2 * LINK_FRAMEWORKS.len());
    }
}
