use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::Backend;
use extract::ExportedSignature;
use libloading::Library;
use tracing::debug;

use crate::call::invoke;
use crate::error::{BindError, BindResult, CallResult};
use crate::stubgen::render_declarations;
use crate::typemap::map_type;
use crate::types::{CallDescriptor, TypeMapping};
use crate::value::NativeValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindOptions {
    /// Refuse to bind functions with any unmapped argument or return type.
    pub reject_unknown: bool,
}

/// One resolved export, callable through libffi.
#[derive(Clone)]
pub struct BoundFunction {
    name: String,
    descriptor: CallDescriptor,
    address: usize,
    // Keeps the symbol address valid.
    _library: Arc<Library>,
}

impl BoundFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &CallDescriptor {
        &self.descriptor
    }

    /// Calls the native function.
    ///
    /// Arity and each value's fit for its ABI tag are checked first. Unknown
    /// slots bind as void and reject any value.
    ///
    /// # Safety
    /// The exported symbol's real signature must match the extracted one, and
    /// pointer arguments must be valid for whatever the callee does with them.
    pub unsafe fn call(&self, args: &[NativeValue]) -> CallResult<NativeValue> {
        unsafe { invoke(&self.name, self.address, &self.descriptor, args) }
    }
}

impl std::fmt::Debug for BoundFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundFunction")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// All bound exports of one artifact plus its declaration stub text.
#[derive(Debug)]
pub struct BoundModule {
    module_name: String,
    artifact: PathBuf,
    functions: HashMap<String, BoundFunction>,
    declarations: String,
}

impl BoundModule {
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn get(&self, name: &str) -> Option<&BoundFunction> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> &HashMap<String, BoundFunction> {
        &self.functions
    }

    /// Exported names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn declarations(&self) -> &str {
        &self.declarations
    }
}

/// Maps every signature through the type map. Duplicate names collapse to the
/// last declaration; the result keeps first-appearance order.
pub fn describe_signatures(
    backend: Backend,
    signatures: &[ExportedSignature],
) -> Vec<(String, CallDescriptor)> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, CallDescriptor> = HashMap::new();

    for signature in signatures {
        let descriptor = CallDescriptor {
            args: signature
                .arg_types()
                .map(|raw| map_type(backend, raw))
                .collect(),
            ret: map_type(backend, &signature.return_type),
        };
        if by_name
            .insert(signature.method_name.clone(), descriptor)
            .is_none()
        {
            order.push(signature.method_name.clone());
        } else {
            debug!(name = %signature.method_name, "duplicate export, keeping the last declaration");
        }
    }

    order
        .into_iter()
        .filter_map(|name| by_name.remove(&name).map(|desc| (name, desc)))
        .collect()
}

fn check_known(
    name: &str,
    descriptor: &CallDescriptor,
    signature: Option<&ExportedSignature>,
) -> BindResult<()> {
    if let TypeMapping::Unknown(raw) = &descriptor.ret {
        return Err(BindError::UnknownType {
            function: name.to_string(),
            slot: "return type".to_string(),
            raw: raw.clone(),
        });
    }
    for (idx, arg) in descriptor.args.iter().enumerate() {
        if let TypeMapping::Unknown(raw) = arg {
            let arg_name = signature
                .and_then(|sig| sig.method_args.get(idx))
                .map(|(name, _)| name.as_str())
                .unwrap_or("?");
            return Err(BindError::UnknownType {
                function: name.to_string(),
                slot: format!("argument `{arg_name}`"),
                raw: raw.clone(),
            });
        }
    }
    Ok(())
}

/// Opens artifacts and resolves their exports for one backend.
#[derive(Debug, Clone, Copy)]
pub struct Binder {
    backend: Backend,
    options: BindOptions,
}

impl Binder {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            options: BindOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn bind(
        &self,
        module_name: &str,
        artifact: &Path,
        signatures: &[ExportedSignature],
    ) -> BindResult<BoundModule> {
        let descriptors = describe_signatures(self.backend, signatures);

        if self.options.reject_unknown {
            for (name, descriptor) in &descriptors {
                let last = signatures.iter().rev().find(|s| &s.method_name == name);
                check_known(name, descriptor, last)?;
            }
        }

        debug!(artifact = %artifact.display(), exports = descriptors.len(), "opening native module");
        // SAFETY: loading runs the library's initializers; artifacts come from
        // our own toolchain invocations.
        let library = unsafe { Library::new(artifact) }.map_err(|source| BindError::Load {
            path: artifact.to_path_buf(),
            source,
        })?;
        let library = Arc::new(library);

        let mut functions = HashMap::with_capacity(descriptors.len());
        for (name, descriptor) in descriptors {
            // SAFETY: the symbol is only read as an address here.
            let address = unsafe { library.get::<*const c_void>(name.as_bytes()) }
                .map(|symbol| *symbol as usize)
                .map_err(|source| BindError::MissingSymbol {
                    symbol: name.clone(),
                    path: artifact.to_path_buf(),
                    source,
                })?;
            debug!(%name, %descriptor, "bound export");
            functions.insert(
                name.clone(),
                BoundFunction {
                    name,
                    descriptor,
                    address,
                    _library: Arc::clone(&library),
                },
            );
        }

        Ok(BoundModule {
            module_name: module_name.to_string(),
            artifact: artifact.to_path_buf(),
            functions,
            declarations: render_declarations(module_name, signatures, self.backend),
        })
    }
}

pub fn bind(
    backend: Backend,
    module_name: &str,
    artifact: &Path,
    signatures: &[ExportedSignature],
    options: BindOptions,
) -> BindResult<BoundModule> {
    Binder::new(backend)
        .with_options(options)
        .bind(module_name, artifact, signatures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AbiTypeTag;
    use tempfile::TempDir;

    #[test]
    fn duplicates_collapse_last_wins() {
        let sigs = vec![
            ExportedSignature::new("twice", "int", [("a", "int")]),
            ExportedSignature::new("other", "void", [("p", "void*")]),
            ExportedSignature::new("twice", "double", [("a", "double")]),
        ];
        let described = describe_signatures(Backend::Clang, &sigs);
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].0, "twice");
        assert_eq!(described[0].1.ret, TypeMapping::Known(AbiTypeTag::F64));
        assert_eq!(described[1].0, "other");
    }

    #[test]
    fn reject_unknown_names_the_slot() {
        let dir = TempDir::new().unwrap();
        let sigs = vec![ExportedSignature::new("draw", "void", [("w", "Widget")])];
        let err = bind(
            Backend::Clang,
            "draw.c",
            &dir.path().join("missing.so"),
            &sigs,
            BindOptions {
                reject_unknown: true,
            },
        )
        .unwrap_err();
        match err {
            BindError::UnknownType { function, slot, raw } => {
                assert_eq!(function, "draw");
                assert_eq!(slot, "argument `w`");
                assert_eq!(raw, "Widget");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn permissive_binding_reaches_the_loader() {
        let dir = TempDir::new().unwrap();
        let sigs = vec![ExportedSignature::new("draw", "void", [("w", "Widget")])];
        let err = bind(
            Backend::Clang,
            "draw.c",
            &dir.path().join("missing.so"),
            &sigs,
            BindOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BindError::Load { .. }));
    }

    /// Compiles `source` into a shared object with the system C compiler.
    /// Returns `None` when no compiler is available.
    fn compile_c(dir: &Path, source: &str) -> Option<PathBuf> {
        let src = dir.join("native.c");
        let out = dir.join(libloading::library_filename("native"));
        std::fs::write(&src, source).ok()?;
        let output = duct::cmd!("cc", "-shared", "-fPIC", &src, "-o", &out)
            .stdout_null()
            .stderr_null()
            .unchecked()
            .run()
            .ok()?;
        output.status.success().then_some(out)
    }

    #[test]
    fn bind_and_call_compiled_library() {
        let dir = TempDir::new().unwrap();
        let source = r#"
int add(int a, int b) { return a + b; }
double half(double x) { return x / 2.0; }
const char *greet(void) { return "hello"; }
unsigned long long len(const char *s) { unsigned long long n = 0; while (s[n]) n++; return n; }
"#;
        let Some(artifact) = compile_c(dir.path(), source) else {
            eprintln!("skipping: no system C compiler");
            return;
        };

        let sigs = extract::parse_c_signatures(source).unwrap();
        let module = bind(Backend::Clang, "native.c", &artifact, &sigs, BindOptions::default())
            .unwrap();
        assert_eq!(module.names(), vec!["add", "greet", "half", "len"]);

        unsafe {
            let add = module.get("add").unwrap();
            assert_eq!(
                add.call(&[NativeValue::Int(2), NativeValue::Int(3)]),
                Ok(NativeValue::Int(5))
            );
            assert_eq!(
                module.get("half").unwrap().call(&[NativeValue::Float(5.0)]),
                Ok(NativeValue::Float(2.5))
            );
            assert_eq!(
                module.get("greet").unwrap().call(&[]),
                Ok(NativeValue::Text("hello".into()))
            );
            assert_eq!(
                module
                    .get("len")
                    .unwrap()
                    .call(&[NativeValue::Text("four".into())]),
                Ok(NativeValue::UInt(4))
            );
        }

        assert!(module.declarations().contains(" export function add(a: number, b: number): number;"));
    }

    #[test]
    fn later_duplicate_declaration_is_the_one_bound() {
        let dir = TempDir::new().unwrap();
        let Some(artifact) = compile_c(dir.path(), "double twice(double a) { return a * 2.0; }\n")
        else {
            eprintln!("skipping: no system C compiler");
            return;
        };
        let sigs = vec![
            ExportedSignature::new("twice", "int", [("a", "int")]),
            ExportedSignature::new("twice", "double", [("a", "double")]),
        ];
        let module = bind(Backend::Clang, "native.c", &artifact, &sigs, BindOptions::default())
            .unwrap();
        assert_eq!(module.len(), 1);

        let twice = module.get("twice").unwrap();
        assert_eq!(twice.descriptor().ret, TypeMapping::Known(AbiTypeTag::F64));
        assert_eq!(twice.descriptor().args, vec![TypeMapping::Known(AbiTypeTag::F64)]);
        assert_eq!(
            unsafe { twice.call(&[NativeValue::Float(1.5)]) },
            Ok(NativeValue::Float(3.0))
        );
    }

    #[test]
    fn missing_symbol_is_reported() {
        let dir = TempDir::new().unwrap();
        let Some(artifact) = compile_c(dir.path(), "int present(void) { return 1; }\n") else {
            eprintln!("skipping: no system C compiler");
            return;
        };
        let sigs = vec![ExportedSignature::without_args("absent", "int")];
        let err = bind(Backend::Clang, "native.c", &artifact, &sigs, BindOptions::default())
            .unwrap_err();
        assert!(matches!(err, BindError::MissingSymbol { ref symbol, .. } if symbol == "absent"));
    }
}
