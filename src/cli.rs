use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use cache::{BuildCache, default_cache_path};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use ffi::{BindOptions, NativeValue, map_type, presentation_for_arg, presentation_for_return};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::logger;
use crate::pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "nativekit",
    version,
    about = "Build C, Kotlin/Native and Rust sources into loadable native modules"
)]
pub struct NativekitCli {
    #[arg(long, global = true, value_name = "path")]
    /// Build configuration file (defaults to ./nativekit.yaml when present).
    config: Option<PathBuf>,

    #[arg(short, long, global = true, action = ArgAction::Count)]
    /// Log verbosity: -v errors, -vv warnings, -vvv progress, -vvvv debug.
    verbose: u8,

    #[arg(long, global = true, value_name = "dir")]
    /// Directory for artifacts of modules without an `out` setting.
    out_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    /// Always rebuild and leave the hash cache untouched.
    no_cache: bool,

    #[arg(long, global = true)]
    /// Refuse to bind functions whose types have no ABI mapping.
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Builds and binds each source, writing its `.d.ts` stub.
    Build {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Lists exported signatures with their ABI tags, without building.
    Inspect { path: PathBuf },
    /// Builds a source and calls one of its exports.
    Call {
        path: PathBuf,
        function: String,
        /// Literal arguments: numbers, true/false, null, or text.
        args: Vec<String>,
    },
    /// Deletes the build hash cache, or only the entries for the given sources.
    Clean { paths: Vec<PathBuf> },
}

pub fn run() -> Result<()> {
    let cli = NativekitCli::parse();
    logger::init_logging(cli.verbose);

    match &cli.command {
        Command::Build { paths } => handle_build(&cli, paths),
        Command::Inspect { path } => handle_inspect(&cli, path),
        Command::Call {
            path,
            function,
            args,
        } => handle_call(&cli, path, function, args),
        Command::Clean { paths } => handle_clean(paths),
    }
}

fn pipeline(cli: &NativekitCli) -> Result<Pipeline<'static>> {
    let config = PipelineConfig::discover(cli.config.as_deref())?;
    let cache = if cli.no_cache {
        None
    } else {
        Some(BuildCache::global())
    };
    let mut pipeline = Pipeline::with_toolchain(config, cache).with_bind_options(BindOptions {
        reject_unknown: cli.strict,
    });
    if let Some(dir) = &cli.out_dir {
        pipeline = pipeline.with_out_dir(dir);
    }
    Ok(pipeline)
}

fn handle_build(cli: &NativekitCli, paths: &[PathBuf]) -> Result<()> {
    let pipeline = pipeline(cli)?;
    let results = pipeline.load_modules(paths);

    let mut failed = 0usize;
    for (path, result) in results {
        match result {
            Ok(loaded) => println!(
                "{} {} ({} exports) -> {}",
                "built".green().bold(),
                path.display(),
                loaded.module.len(),
                loaded.module.artifact().display()
            ),
            Err(err) => {
                failed += 1;
                eprintln!("{} {}: {err:#}", "failed".red().bold(), path.display());
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} module(s) failed to build", paths.len());
    }
    Ok(())
}

fn handle_inspect(cli: &NativekitCli, path: &Path) -> Result<()> {
    let pipeline = pipeline(cli)?;
    let inspection = pipeline.inspect(path)?;
    let backend = inspection.backend;

    println!(
        "{} {} ({backend}, read from {})",
        "module".bold(),
        inspection.module_name,
        inspection.signature_source.display()
    );
    if inspection.signatures.is_empty() {
        println!("  no exported functions");
        return Ok(());
    }

    for signature in &inspection.signatures {
        let args = signature
            .method_args
            .iter()
            .map(|(name, raw)| {
                let mapping = map_type(backend, raw);
                let tag = if mapping.is_unknown() {
                    mapping.to_string().yellow()
                } else {
                    mapping.to_string().cyan()
                };
                format!("{name}: {raw} [{tag}, {}]", presentation_for_arg(backend, raw))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let ret = map_type(backend, &signature.return_type);
        let ret_tag = if ret.is_unknown() {
            ret.to_string().yellow()
        } else {
            ret.to_string().cyan()
        };
        println!(
            "  {}({args}) -> {} [{ret_tag}, {}]",
            signature.method_name.green(),
            signature.return_type,
            presentation_for_return(backend, &signature.return_type)
        );
    }
    Ok(())
}

fn handle_call(cli: &NativekitCli, path: &Path, function: &str, args: &[String]) -> Result<()> {
    let pipeline = pipeline(cli)?;
    let loaded = pipeline.load_module(path)?;
    let bound = loaded.module.get(function).ok_or_else(|| {
        anyhow!(
            "`{function}` is not exported by {} (available: {})",
            path.display(),
            loaded.module.names().join(", ")
        )
    })?;

    let values: Vec<NativeValue> = args.iter().map(|arg| NativeValue::parse_literal(arg)).collect();
    debug!(function, descriptor = %bound.descriptor(), ?values, "calling native function");

    // SAFETY: the descriptor comes from the module's own declarations and the
    // arguments are range-checked against it before the call.
    let result = unsafe { bound.call(&values) }
        .with_context(|| format!("call to `{function}` failed"))?;
    println!("{result}");
    Ok(())
}

fn handle_clean(sources: &[PathBuf]) -> Result<()> {
    let path = default_cache_path();
    if !path.exists() {
        println!("no cache at {}", path.display());
        return Ok(());
    }
    if !sources.is_empty() {
        return forget_sources(BuildCache::global(), sources);
    }
    let entries = BuildCache::open(&path).entries().len();
    fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
    println!(
        "{} {} ({entries} entries)",
        "removed".green().bold(),
        path.display()
    );
    Ok(())
}

fn forget_sources(cache: &BuildCache, sources: &[PathBuf]) -> Result<()> {
    for source in sources {
        let removed = cache
            .forget(source)
            .with_context(|| format!("failed to update {}", cache.path().display()))?;
        if removed {
            println!("{} {}", "forgot".green().bold(), source.display());
        } else {
            println!("{} not cached", source.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clean_accepts_optional_sources() {
        let cli = NativekitCli::try_parse_from(["nativekit", "clean"]).unwrap();
        assert!(matches!(cli.command, Command::Clean { ref paths } if paths.is_empty()));

        let cli = NativekitCli::try_parse_from(["nativekit", "clean", "a.c", "b.rs"]).unwrap();
        assert!(
            matches!(cli.command, Command::Clean { ref paths } if paths == &[PathBuf::from("a.c"), PathBuf::from("b.rs")])
        );
    }

    #[test]
    fn forgetting_sources_keeps_other_entries() {
        let dir = TempDir::new().unwrap();
        let cache = BuildCache::open(dir.path().join("hash.json"));
        let a = dir.path().join("a.c");
        let b = dir.path().join("b.c");
        fs::write(&a, "int a(void);").unwrap();
        fs::write(&b, "int b(void);").unwrap();
        cache.record_success(&a).unwrap();
        cache.record_success(&b).unwrap();

        forget_sources(&cache, &[a.clone(), dir.path().join("missing.c")]).unwrap();
        assert!(!cache.should_skip(&a));
        assert!(cache.should_skip(&b));
    }
}
