use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use common::Backend;
use extract::ExportedSignature;

use crate::typemap::{kotlin_to_c_type, presentation_for_arg, presentation_for_return};

/// Renders the TypeScript-style ambient module declaring every export.
///
/// ```text
/// declare module "*/add.c" {
///  export function add(a: number, b: number): number;
/// }
/// ```
pub fn render_declarations(
    module_name: &str,
    signatures: &[ExportedSignature],
    backend: Backend,
) -> String {
    let lines: Vec<String> = signatures
        .iter()
        .map(|signature| {
            let args = signature
                .method_args
                .iter()
                .map(|(name, raw)| format!("{name}: {}", presentation_for_arg(backend, raw)))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                " export function {}({args}): {};",
                signature.method_name,
                presentation_for_return(backend, &signature.return_type)
            )
        })
        .collect();

    format!(
        "declare module \"*/{module_name}\" {{\n{}\n}}\n\n",
        lines.join("\n")
    )
}

/// `add.c` -> `add_c.d.ts`.
pub fn stub_file_name(module_name: &str) -> String {
    format!("{}.d.ts", module_name.replace('.', "_"))
}

/// Where the stub for `module_name` lives: next to the artifact.
pub fn stub_path(artifact: &Path, module_name: &str) -> PathBuf {
    let dir = artifact.parent().unwrap_or_else(|| Path::new("."));
    dir.join(stub_file_name(module_name))
}

/// C++ source forwarding C-linkage functions to the Kotlin/Native export
/// table `<library_prefix>_symbols()->kotlin.root.<name>`.
///
/// `header` is the `_api.h` konanc writes next to the static library and
/// `library_prefix` the sanitized library name, for example `libmath_kt`.
pub fn render_kotlin_shim(
    header: &str,
    library_prefix: &str,
    signatures: &[ExportedSignature],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#include \"{header}\"");
    out.push_str("extern \"C\" {\n");
    for signature in signatures {
        let params = signature
            .method_args
            .iter()
            .map(|(name, raw)| format!("{} {name}", kotlin_to_c_type(raw)))
            .collect::<Vec<_>>()
            .join(", ");
        let forwarded = signature
            .method_args
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{} {}({params}) {{ return {library_prefix}_symbols()->kotlin.root.{}({forwarded}); }}",
            kotlin_to_c_type(&signature.return_type),
            signature.method_name,
            signature.method_name,
        );
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_for_c_module() {
        let sigs = vec![
            ExportedSignature::new("add", "int", [("a", "int"), ("b", "int")]),
            ExportedSignature::new("greet", "char*", [("name", "char*")]),
        ];
        assert_eq!(
            render_declarations("add.c", &sigs, Backend::Clang),
            "declare module \"*/add.c\" {\n export function add(a: number, b: number): number;\n export function greet(name: Buffer): string;\n}\n\n"
        );
    }

    #[test]
    fn unknown_types_render_as_unknown() {
        let sigs = vec![ExportedSignature::new("draw", "Unit", [("w", "Widget")])];
        let text = render_declarations("ui.kt", &sigs, Backend::Konan);
        assert!(text.contains(" export function draw(w: unknown): unknown;"));
    }

    #[test]
    fn empty_module_still_has_a_block() {
        assert_eq!(
            render_declarations("lib.rs", &[], Backend::Rust),
            "declare module \"*/lib.rs\" {\n\n}\n\n"
        );
    }

    #[test]
    fn stub_lives_next_to_artifact() {
        assert_eq!(stub_file_name("math.util.c"), "math_util_c.d.ts");
        assert_eq!(
            stub_path(Path::new("out/add.c.o"), "add.c"),
            PathBuf::from("out/add_c.d.ts")
        );
    }

    #[test]
    fn kotlin_shim_forwards_to_root_package() {
        let sigs = vec![
            ExportedSignature::new("add", "Int", [("a", "Int"), ("b", "Int")]),
            ExportedSignature::new("hello", "String", [("name", "String")]),
        ];
        let shim = render_kotlin_shim("./out/libmath.kt_api.h", "libmath_kt", &sigs);
        assert_eq!(
            shim,
            "#include \"./out/libmath.kt_api.h\"\n\
             extern \"C\" {\n\
             int add(int a, int b) { return libmath_kt_symbols()->kotlin.root.add(a, b); }\n\
             const char* hello(const char* name) { return libmath_kt_symbols()->kotlin.root.hello(name); }\n\
             }\n"
        );
    }
}
