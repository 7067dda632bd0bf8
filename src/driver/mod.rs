//! Turns a source file into a loadable native artifact by running the
//! backend toolchain.

mod clang;
mod konan;
mod runner;
mod rust;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cache::BuildCache;
use common::Backend;
use extract::ExportedSignature;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ModuleConfig;

pub use runner::{DuctRunner, Invocation, ToolchainRunner};

/// Directory backend default outputs go to.
pub const DEFAULT_OUT_DIR: &str = "out";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source file {} does not exist", path.display())]
    MissingSource { path: PathBuf },

    #[error("`{program}` failed ({}): {stderr}", describe_status(*status))]
    ToolchainFailure {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("`{program}` did not finish within {}s", timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    #[error("failed to run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("toolchain succeeded but {} was not produced", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_status(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Everything the driver needs to build one module.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub source: &'a Path,
    pub config: &'a ModuleConfig,
    /// Needed by the Kotlin backend to generate its C shim.
    pub signatures: &'a [ExportedSignature],
    /// The cache reported the source unchanged since the last build.
    pub up_to_date: bool,
}

/// Paths produced by one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    /// What the backend compiler writes.
    pub primary: PathBuf,
    /// The loadable object. Same as `primary` except for Kotlin.
    pub artifact: PathBuf,
}

/// Toolchain steps plus the outputs they produce.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub outputs: OutputPlan,
    pub steps: Vec<Invocation>,
}

pub struct BuildDriver<'a> {
    runner: Arc<dyn ToolchainRunner>,
    cache: Option<&'a BuildCache>,
    out_dir: PathBuf,
}

impl<'a> BuildDriver<'a> {
    pub fn new(runner: Arc<dyn ToolchainRunner>, cache: Option<&'a BuildCache>) -> Self {
        Self {
            runner,
            cache,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }

    /// Default output directory for modules without an `out` setting.
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn cache(&self) -> Option<&'a BuildCache> {
        self.cache
    }

    /// Where `source` ends up under `config`.
    pub fn outputs(&self, source: &Path, config: &ModuleConfig) -> OutputPlan {
        let file_name = file_name(source);
        match config {
            ModuleConfig::Clang(c) => {
                let out = c
                    .out
                    .clone()
                    .unwrap_or_else(|| clang::default_output(&self.out_dir, &file_name));
                OutputPlan {
                    primary: out.clone(),
                    artifact: out,
                }
            }
            ModuleConfig::Konan(k) => {
                let primary = k
                    .out
                    .clone()
                    .unwrap_or_else(|| konan::default_output(&self.out_dir, &file_name));
                OutputPlan {
                    artifact: konan::final_artifact(&primary),
                    primary,
                }
            }
            ModuleConfig::Rust(r) => {
                let out = r
                    .out
                    .clone()
                    .unwrap_or_else(|| rust::default_output(&self.out_dir, &file_name));
                OutputPlan {
                    primary: out.clone(),
                    artifact: out,
                }
            }
        }
    }

    /// The toolchain steps a rebuild of `request` runs, in order.
    pub fn plan(&self, request: &BuildRequest<'_>) -> BuildPlan {
        let outputs = self.outputs(request.source, request.config);
        let timeout = request.config.timeout();
        let steps = match request.config {
            ModuleConfig::Clang(c) => {
                vec![clang::compile(request.source, &outputs.primary, c, timeout)]
            }
            ModuleConfig::Konan(k) => {
                konan::steps(request.source, &outputs, k, request.signatures, timeout)
            }
            ModuleConfig::Rust(r) => {
                vec![rust::compile(request.source, &outputs.primary, r, timeout)]
            }
        };
        BuildPlan { outputs, steps }
    }

    /// Builds the module, reusing the existing artifact when the cache says
    /// the source is unchanged. Returns the loadable artifact path.
    pub fn build(&self, request: &BuildRequest<'_>) -> Result<PathBuf, BuildError> {
        let backend = request.config.backend();
        if !request.source.is_file() {
            return Err(BuildError::MissingSource {
                path: request.source.to_path_buf(),
            });
        }

        let plan = self.plan(request);
        for path in [&plan.outputs.primary, &plan.outputs.artifact] {
            ensure_parent(path)?;
        }

        if request.up_to_date && plan.outputs.artifact.exists() {
            info!(
                source = %request.source.display(),
                artifact = %plan.outputs.artifact.display(),
                "up to date, skipping build"
            );
            return Ok(plan.outputs.artifact);
        }

        info!(%backend, source = %request.source.display(), "building native module");
        for step in &plan.steps {
            debug!(command = %step, "toolchain step");
            self.runner.run(step)?;
        }

        if !plan.outputs.artifact.exists() {
            return Err(BuildError::MissingArtifact {
                path: plan.outputs.artifact,
            });
        }

        if let Some(cache) = self.cache {
            if let Err(err) = cache.record_success(request.source) {
                warn!(error = %err, source = %request.source.display(), "could not record build in cache");
            }
        }

        info!(artifact = %plan.outputs.artifact.display(), "built native module");
        Ok(plan.outputs.artifact)
    }
}

/// Default output name for `backend`, ignoring any `out` setting.
pub fn default_output(backend: Backend, out_dir: &Path, source: &Path) -> PathBuf {
    let file_name = file_name(source);
    match backend {
        Backend::Clang => clang::default_output(out_dir, &file_name),
        Backend::Konan => konan::final_artifact(&konan::default_output(out_dir, &file_name)),
        Backend::Rust => rust::default_output(out_dir, &file_name),
    }
}

fn file_name(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn ensure_parent(path: &Path) -> Result<(), BuildError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| BuildError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// `path` with `suffix` appended to its final component.
pub(crate) fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_outputs_per_backend() {
        let out = Path::new("out");
        assert_eq!(
            default_output(Backend::Clang, out, Path::new("src/add.c")),
            PathBuf::from("out/add.c.o")
        );
        assert_eq!(
            default_output(Backend::Rust, out, Path::new("lib.rs")),
            PathBuf::from("out/lib.rs.o")
        );
        assert_eq!(
            default_output(Backend::Konan, out, Path::new("math.kt")),
            PathBuf::from("out/libmath.kt.a.o")
        );
    }

    #[test]
    fn suffix_is_appended_to_the_file_name() {
        assert_eq!(
            append_suffix(Path::new("out/libm.kt.a"), ".o"),
            PathBuf::from("out/libm.kt.a.o")
        );
    }

    #[test]
    fn status_description() {
        assert_eq!(describe_status(Some(1)), "exit status 1");
        assert_eq!(describe_status(None), "terminated by signal");
    }
}
