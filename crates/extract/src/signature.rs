use serde::{Deserialize, Serialize};

/// One exported function as recognised by a backend grammar.
///
/// Types are raw source-language tokens; mapping them to ABI tags happens
/// later, in the `ffi` crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedSignature {
    pub method_name: String,
    pub return_type: String,
    /// `(argument name, raw type)` pairs in declaration order.
    pub method_args: Vec<(String, String)>,
}

impl ExportedSignature {
    pub fn new<N, T, A, B>(method_name: N, return_type: T, args: impl IntoIterator<Item = (A, B)>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            method_name: method_name.into(),
            return_type: return_type.into(),
            method_args: args
                .into_iter()
                .map(|(name, ty)| (name.into(), ty.into()))
                .collect(),
        }
    }

    pub fn without_args(method_name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            return_type: return_type.into(),
            method_args: Vec::new(),
        }
    }

    pub fn arg_types(&self) -> impl Iterator<Item = &str> {
        self.method_args.iter().map(|(_, ty)| ty.as_str())
    }

    pub fn arity(&self) -> usize {
        self.method_args.len()
    }
}
