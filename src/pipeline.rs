//! Per-module orchestration: extract signatures and consult the cache in
//! parallel, build, bind the exports and write the declaration stub.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use cache::BuildCache;
use common::Backend;
use extract::{ExportedSignature, extract_signatures};
use ffi::{BindOptions, Binder, BoundModule, stub_path};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{ModuleConfig, PipelineConfig};
use crate::driver::{BuildDriver, BuildRequest, DuctRunner, ToolchainRunner};

/// A built, bound module and the files written for it.
#[derive(Debug)]
pub struct LoadedModule {
    pub source: PathBuf,
    pub backend: Backend,
    pub signatures: Vec<ExportedSignature>,
    pub module: BoundModule,
    pub stub: PathBuf,
}

/// Signatures of a source file without building it.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub backend: Backend,
    pub module_name: String,
    pub signature_source: PathBuf,
    pub signatures: Vec<ExportedSignature>,
}

pub struct Pipeline<'a> {
    config: PipelineConfig,
    driver: BuildDriver<'a>,
    bind_options: BindOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, driver: BuildDriver<'a>) -> Self {
        Self {
            config,
            driver,
            bind_options: BindOptions::default(),
        }
    }

    /// Pipeline running the real toolchain.
    pub fn with_toolchain(config: PipelineConfig, cache: Option<&'a BuildCache>) -> Self {
        let runner: Arc<dyn ToolchainRunner> = Arc::new(DuctRunner);
        Self::new(config, BuildDriver::new(runner, cache))
    }

    pub fn with_bind_options(mut self, options: BindOptions) -> Self {
        self.bind_options = options;
        self
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.driver = self.driver.with_out_dir(out_dir);
        self
    }

    fn resolve(&self, source: &Path) -> Result<(Backend, String, ModuleConfig)> {
        let backend = Backend::from_path(source).ok_or_else(|| {
            anyhow!(
                "{} has no supported extension (expected one of {})",
                source.display(),
                Backend::ALL
                    .iter()
                    .flat_map(|backend| backend.extensions())
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        let module_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("{} has no file name", source.display()))?;
        let config = self.config.resolve(backend, &module_name);
        Ok((backend, module_name, config))
    }

    /// Extracts signatures only.
    pub fn inspect(&self, source: &Path) -> Result<Inspection> {
        let (backend, module_name, config) = self.resolve(source)?;
        let signature_source = config.signature_source(source);
        let signatures = extract_signatures(backend, &signature_source)
            .with_context(|| format!("failed to extract signatures from {}", signature_source.display()))?;
        Ok(Inspection {
            backend,
            module_name,
            signature_source,
            signatures,
        })
    }

    /// Builds (or reuses) the artifact for `source`, binds its exports and
    /// writes the `.d.ts` stub next to the artifact.
    pub fn load_module(&self, source: &Path) -> Result<LoadedModule> {
        let (backend, module_name, config) = self.resolve(source)?;
        let signature_source = config.signature_source(source);

        let cache = self.driver.cache();
        let (signatures, up_to_date) = rayon::join(
            || extract_signatures(backend, &signature_source),
            || cache.is_some_and(|cache| cache.should_skip(source)),
        );
        let signatures = signatures.with_context(|| {
            format!("failed to extract signatures from {}", signature_source.display())
        })?;
        debug!(module = %module_name, exports = signatures.len(), up_to_date, "prepared module");

        let artifact = self
            .driver
            .build(&BuildRequest {
                source,
                config: &config,
                signatures: &signatures,
                up_to_date,
            })
            .with_context(|| format!("failed to build {}", source.display()))?;

        // A bare relative name would make the loader search system paths.
        let loadable = fs::canonicalize(&artifact)
            .with_context(|| format!("failed to resolve {}", artifact.display()))?;
        let module = Binder::new(backend)
            .with_options(self.bind_options)
            .bind(&module_name, &loadable, &signatures)
            .with_context(|| format!("failed to bind {}", artifact.display()))?;

        let stub = stub_path(&artifact, &module_name);
        fs::write(&stub, module.declarations())
            .with_context(|| format!("failed to write {}", stub.display()))?;
        info!(module = %module_name, stub = %stub.display(), "module ready");

        Ok(LoadedModule {
            source: source.to_path_buf(),
            backend,
            signatures,
            module,
            stub,
        })
    }

    /// Loads several modules concurrently. Each result stands alone; one
    /// failure does not stop the others.
    pub fn load_modules(&self, sources: &[PathBuf]) -> Vec<(PathBuf, Result<LoadedModule>)> {
        sources
            .par_iter()
            .map(|source| (source.clone(), self.load_module(source)))
            .collect()
    }
}
