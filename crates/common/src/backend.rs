use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A source language paired with the toolchain that builds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// C, C++, Objective-C and Objective-C++ built with clang.
    Clang,
    /// Kotlin/Native built with konanc plus a clang++ shim.
    Konan,
    /// Rust built with rustc as a cdylib.
    Rust,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Clang, Backend::Konan, Backend::Rust];

    /// File extensions (without the dot) handled by this backend.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Backend::Clang => &["c", "cpp", "cxx", "cc", "C", "m", "mm"],
            Backend::Konan => &["kt"],
            Backend::Rust => &["rs"],
        }
    }

    /// Picks the backend responsible for `path` from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|backend| backend.extensions().contains(&ext))
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Clang => "clang",
            Backend::Konan => "konan",
            Backend::Rust => "rust",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
