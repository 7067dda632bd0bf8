//! Per-backend build configuration loaded from `nativekit.yaml`.
//!
//! Every backend section is a [`ConfigSet`]: an optional `global` entry plus
//! one entry per source file name. The entry for a file is merged over
//! `global`, field by field, with the file entry winning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use common::Backend;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "nativekit.yaml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Behaviour shared by the backend configuration structs.
pub trait NativeModuleConfig: Clone + Default + DeserializeOwned {
    /// Field-wise merge; `overrides` wins wherever it sets a value.
    fn merge(&self, overrides: &Self) -> Self;

    /// Clears fields that only make sense for a single file and returns their
    /// names.
    fn clear_file_only(&mut self) -> Vec<&'static str>;

    fn timeout_secs(&self) -> Option<u64>;

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs().unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

macro_rules! merge_fields {
    ($base:expr, $overrides:expr; $($field:ident),+ $(,)?) => {
        Self {
            $($field: $overrides.$field.clone().or_else(|| $base.$field.clone()),)+
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClangOptName {
    Fast,
    S,
    Z,
    G,
}

/// `optimize: 2` or `optimize: fast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClangOptLevel {
    Level(u8),
    Named(ClangOptName),
}

impl ClangOptLevel {
    /// The `-O` flag clang expects.
    pub fn flag(self) -> String {
        match self {
            ClangOptLevel::Level(level) => format!("-O{level}"),
            ClangOptLevel::Named(ClangOptName::Fast) => "-Ofast".to_string(),
            ClangOptLevel::Named(ClangOptName::S) => "-Os".to_string(),
            ClangOptLevel::Named(ClangOptName::Z) => "-Oz".to_string(),
            ClangOptLevel::Named(ClangOptName::G) => "-Og".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RustOptName {
    S,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RustOptLevel {
    Level(u8),
    Named(RustOptName),
}

impl RustOptLevel {
    /// Value for `-C opt-level=`.
    pub fn value(self) -> String {
        match self {
            RustOptLevel::Level(level) => level.to_string(),
            RustOptLevel::Named(RustOptName::S) => "s".to_string(),
            RustOptLevel::Named(RustOptName::Z) => "z".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClangConfig {
    pub out: Option<PathBuf>,
    pub optimize: Option<ClangOptLevel>,
    pub debug: Option<bool>,
    pub libraries: Option<Vec<String>>,
    pub frameworks: Option<Vec<String>>,
    #[serde(alias = "headerSearchPaths")]
    pub header_search_paths: Option<Vec<PathBuf>>,
    #[serde(alias = "libSearchPaths")]
    pub lib_search_paths: Option<Vec<PathBuf>>,
    #[serde(alias = "additionalSources")]
    pub additional_sources: Option<Vec<PathBuf>>,
    /// Header to read signatures from, relative to the source directory.
    #[serde(alias = "useHeader")]
    pub use_header: Option<PathBuf>,
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl NativeModuleConfig for ClangConfig {
    fn merge(&self, overrides: &Self) -> Self {
        merge_fields!(self, overrides;
            out, optimize, debug, libraries, frameworks, header_search_paths,
            lib_search_paths, additional_sources, use_header, timeout_secs,
        )
    }

    fn clear_file_only(&mut self) -> Vec<&'static str> {
        let mut cleared = Vec::new();
        if self.out.take().is_some() {
            cleared.push("out");
        }
        if self.use_header.take().is_some() {
            cleared.push("use_header");
        }
        cleared
    }

    fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KonanConfig {
    /// Path of the static library konanc produces. The loadable module is
    /// written next to it with an extra `.o` suffix.
    pub out: Option<PathBuf>,
    pub optimize: Option<bool>,
    pub debug: Option<bool>,
    pub libraries: Option<Vec<String>>,
    #[serde(alias = "additionalSources")]
    pub additional_sources: Option<Vec<PathBuf>>,
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl NativeModuleConfig for KonanConfig {
    fn merge(&self, overrides: &Self) -> Self {
        merge_fields!(self, overrides;
            out, optimize, debug, libraries, additional_sources, timeout_secs,
        )
    }

    fn clear_file_only(&mut self) -> Vec<&'static str> {
        if self.out.take().is_some() {
            vec!["out"]
        } else {
            Vec::new()
        }
    }

    fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RustConfig {
    pub out: Option<PathBuf>,
    pub optimize: Option<RustOptLevel>,
    pub debug: Option<bool>,
    pub libraries: Option<Vec<String>>,
    #[serde(alias = "libSearchPaths")]
    pub lib_search_paths: Option<Vec<PathBuf>>,
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl NativeModuleConfig for RustConfig {
    fn merge(&self, overrides: &Self) -> Self {
        merge_fields!(self, overrides;
            out, optimize, debug, libraries, lib_search_paths, timeout_secs,
        )
    }

    fn clear_file_only(&mut self) -> Vec<&'static str> {
        if self.out.take().is_some() {
            vec!["out"]
        } else {
            Vec::new()
        }
    }

    fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }
}

/// `global` settings plus per-file overrides keyed by file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "T: NativeModuleConfig + Serialize")]
pub struct ConfigSet<T> {
    #[serde(default)]
    pub global: Option<T>,
    #[serde(flatten)]
    pub files: BTreeMap<String, T>,
}

impl<T> Default for ConfigSet<T> {
    fn default() -> Self {
        Self {
            global: None,
            files: BTreeMap::new(),
        }
    }
}

impl<T: NativeModuleConfig> ConfigSet<T> {
    /// Drops file-only fields from `global`, warning about each.
    pub fn sanitize(&mut self, section: &str) {
        if let Some(global) = self.global.as_mut() {
            for field in global.clear_file_only() {
                warn!(section, field, "`{field}` is ignored in `global`; set it per file");
            }
        }
    }

    /// Effective configuration for the file called `module_name`.
    pub fn resolve(&self, module_name: &str) -> T {
        let mut base = self.global.clone().unwrap_or_default();
        base.clear_file_only();
        match self.files.get(module_name) {
            Some(overrides) => base.merge(overrides),
            None => base,
        }
    }
}

/// Configuration resolved for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleConfig {
    Clang(ClangConfig),
    Konan(KonanConfig),
    Rust(RustConfig),
}

impl ModuleConfig {
    pub fn backend(&self) -> Backend {
        match self {
            ModuleConfig::Clang(_) => Backend::Clang,
            ModuleConfig::Konan(_) => Backend::Konan,
            ModuleConfig::Rust(_) => Backend::Rust,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            ModuleConfig::Clang(config) => config.timeout(),
            ModuleConfig::Konan(config) => config.timeout(),
            ModuleConfig::Rust(config) => config.timeout(),
        }
    }

    /// File the signatures are read from: the header named by `use_header`
    /// (relative to the source directory) or the source itself.
    pub fn signature_source(&self, source: &Path) -> PathBuf {
        match self {
            ModuleConfig::Clang(ClangConfig {
                use_header: Some(header),
                ..
            }) => source
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(header),
            _ => source.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub clang: ConfigSet<ClangConfig>,
    pub konan: ConfigSet<KonanConfig>,
    pub rust: ConfigSet<RustConfig>,
}

impl PipelineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self =
            serde_yaml::from_str(text).context("failed to parse build configuration")?;
        config.clang.sanitize("clang");
        config.konan.sanitize("konan");
        config.rust.sanitize("rust");
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        debug!(path = %path.display(), "loading build configuration");
        Self::from_yaml_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Loads `explicit` when given; otherwise `./nativekit.yaml` if it exists,
    /// else the empty configuration.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            Self::load(default)
        } else {
            Ok(Self::default())
        }
    }

    pub fn resolve(&self, backend: Backend, module_name: &str) -> ModuleConfig {
        match backend {
            Backend::Clang => ModuleConfig::Clang(self.clang.resolve(module_name)),
            Backend::Konan => ModuleConfig::Konan(self.konan.resolve(module_name)),
            Backend::Rust => ModuleConfig::Rust(self.rust.resolve(module_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_file_entries_override_global() {
        let config = PipelineConfig::from_yaml_str(
            r#"
clang:
  global:
    optimize: 2
    debug: false
    libraries: [m]
  add.c:
    debug: true
    out: build/add.so
"#,
        )
        .unwrap();

        let ModuleConfig::Clang(add) = config.resolve(Backend::Clang, "add.c") else {
            panic!("wrong backend");
        };
        assert_eq!(add.optimize, Some(ClangOptLevel::Level(2)));
        assert_eq!(add.debug, Some(true));
        assert_eq!(add.libraries, Some(vec!["m".to_string()]));
        assert_eq!(add.out, Some(PathBuf::from("build/add.so")));

        let ModuleConfig::Clang(other) = config.resolve(Backend::Clang, "other.c") else {
            panic!("wrong backend");
        };
        assert_eq!(other.debug, Some(false));
        assert_eq!(other.out, None);
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let config = PipelineConfig::from_yaml_str(
            r#"
clang:
  lib.c:
    headerSearchPaths: [include]
    libSearchPaths: [/opt/lib]
    additionalSources: [extra.c]
    useHeader: lib.h
    timeoutSecs: 5
"#,
        )
        .unwrap();
        let ModuleConfig::Clang(lib) = config.resolve(Backend::Clang, "lib.c") else {
            panic!("wrong backend");
        };
        assert_eq!(lib.header_search_paths, Some(vec![PathBuf::from("include")]));
        assert_eq!(lib.lib_search_paths, Some(vec![PathBuf::from("/opt/lib")]));
        assert_eq!(lib.additional_sources, Some(vec![PathBuf::from("extra.c")]));
        assert_eq!(lib.use_header, Some(PathBuf::from("lib.h")));
        assert_eq!(lib.timeout_secs, Some(5));
    }

    #[test]
    fn global_cannot_set_file_only_fields() {
        let config = PipelineConfig::from_yaml_str(
            r#"
clang:
  global:
    out: everything.o
    use_header: all.h
    debug: true
"#,
        )
        .unwrap();
        let global = config.clang.global.as_ref().unwrap();
        assert_eq!(global.out, None);
        assert_eq!(global.use_header, None);
        assert_eq!(global.debug, Some(true));
    }

    #[test]
    fn named_optimization_levels() {
        let config = PipelineConfig::from_yaml_str(
            "clang:\n  global:\n    optimize: fast\nrust:\n  global:\n    optimize: z\n",
        )
        .unwrap();
        let ModuleConfig::Clang(c) = config.resolve(Backend::Clang, "x.c") else {
            panic!("wrong backend");
        };
        assert_eq!(c.optimize.map(ClangOptLevel::flag).as_deref(), Some("-Ofast"));
        let ModuleConfig::Rust(r) = config.resolve(Backend::Rust, "x.rs") else {
            panic!("wrong backend");
        };
        assert_eq!(r.optimize.map(RustOptLevel::value).as_deref(), Some("z"));
    }

    #[test]
    fn konan_optimize_is_a_switch() {
        let config =
            PipelineConfig::from_yaml_str("konan:\n  global:\n    optimize: true\n").unwrap();
        let ModuleConfig::Konan(k) = config.resolve(Backend::Konan, "m.kt") else {
            panic!("wrong backend");
        };
        assert_eq!(k.optimize, Some(true));
        assert_eq!(k.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PipelineConfig::from_yaml_str("clang:\n  global:\n    optimise: 2\n").is_err());
        assert!(PipelineConfig::from_yaml_str("zig: {}\n").is_err());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(PipelineConfig::from_yaml_str("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn use_header_is_relative_to_source_dir() {
        let config = ModuleConfig::Clang(ClangConfig {
            use_header: Some(PathBuf::from("api.h")),
            ..ClangConfig::default()
        });
        assert_eq!(
            config.signature_source(Path::new("native/impl.c")),
            PathBuf::from("native/api.h")
        );
        let plain = ModuleConfig::Rust(RustConfig::default());
        assert_eq!(plain.signature_source(Path::new("lib.rs")), PathBuf::from("lib.rs"));
    }
}
