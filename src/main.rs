use gnogen::config::Config;
use gnogen::source::is_gno_file;
use gnogen::{
    AggregateError, GoToolchain, MemPackage, PackageDriver, PrecompileError, Precompiler,
    SourceFile,
};

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use walkdir::WalkDir;

/// gnogen - precompile gno packages to Go
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config directory (searched upward for gnogen.toml)
    #[arg(long, short = 'c', global = true)]
    config_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(ClapArgs, Debug)]
struct ToolchainArgs {
    /// Go binary used for builds
    #[arg(long)]
    go_binary: Option<String>,

    /// gofmt command used to verify generated files
    #[arg(long)]
    gofmt_binary: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Precompile .gno files (or directories of them) to .go files
    Precompile {
        /// Files or directories to precompile
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output directory; defaults to next to each source file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Do not verify generated files with gofmt
        #[arg(long)]
        skip_fmt: bool,

        /// Run go build on every directory with generated files
        #[arg(long)]
        gobuild: bool,

        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Precompile a package directory in a temporary location and verify it
    Check {
        /// Package directory
        dir: PathBuf,

        /// Do not verify generated files with gofmt
        #[arg(long)]
        skip_fmt: bool,

        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Run go build on generated files and report gno positions
    Build {
        /// Generated file or package directory
        path: PathBuf,

        #[command(flatten)]
        toolchain: ToolchainArgs,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_dir = args
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::load_or_default(&config_dir)?;

    // RUST_LOG wins, then --verbose, then log_level from gnogen.toml
    let default_level = if args.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone().unwrap_or_else(|| "warn".to_string())
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let result = match args.command {
        Commands::Precompile {
            paths,
            output,
            skip_fmt,
            gobuild,
            toolchain,
        } => precompile_command(
            apply_toolchain(config, toolchain),
            &paths,
            output.as_deref(),
            skip_fmt,
            gobuild,
        ),
        Commands::Check {
            dir,
            skip_fmt,
            toolchain,
        } => check_command(apply_toolchain(config, toolchain), &dir, skip_fmt),
        Commands::Build { path, toolchain } => {
            build_command(apply_toolchain(config, toolchain), &path)
        }
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            report(e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn apply_toolchain(mut config: Config, args: ToolchainArgs) -> Config {
    if let Some(go) = args.go_binary {
        config.toolchain.go = go;
    }
    if let Some(gofmt) = args.gofmt_binary {
        config.toolchain.gofmt = gofmt;
    }
    config
}

fn precompile_command(
    config: Config,
    paths: &[PathBuf],
    output: Option<&Path>,
    skip_fmt: bool,
    gobuild: bool,
) -> Result<(), PrecompileError> {
    let toolchain = GoToolchain::new(&config)?;
    let mut precompiler = Precompiler::new(config)?;

    let files = collect_gno_files(paths)?;
    info!("Precompiling {} file(s)", files.len());

    let mut errors = AggregateError::new();
    let mut built_dirs = BTreeSet::new();

    for (src_path, rel_dir) in &files {
        match precompile_one(&mut precompiler, src_path, rel_dir, output) {
            Ok(target) => {
                if !skip_fmt {
                    if let Err(e) = toolchain.verify_file(&target) {
                        if e.is_fatal() {
                            return Err(e);
                        }
                        errors.push(e);
                    }
                }
                if let Some(dir) = target.parent() {
                    built_dirs.insert(dir.to_path_buf());
                }
            }
            Err(e) => errors.push(e),
        }
    }

    if gobuild {
        for dir in &built_dirs {
            if let Err(e) = toolchain.build_package(dir) {
                if e.is_fatal() {
                    return Err(e);
                }
                errors.push(e);
            }
        }
    }

    errors.into_result().map_err(PrecompileError::Aggregate)
}

/// Precompile one file and write it; returns the generated path
fn precompile_one(
    precompiler: &mut Precompiler,
    src_path: &Path,
    rel_dir: &Path,
    output: Option<&Path>,
) -> Result<PathBuf, PrecompileError> {
    let file = SourceFile::read(src_path)?;
    let generated = precompiler.precompile_file(&file)?.into_checked()?;

    let target_dir = target_dir(src_path, rel_dir, output)?;
    fs::create_dir_all(&target_dir).map_err(|e| PrecompileError::io(&target_dir, e))?;

    let target = target_dir.join(&generated.name);
    fs::write(&target, &generated.text).map_err(|e| PrecompileError::io(&target, e))?;
    debug!("{} -> {}", src_path.display(), target.display());
    Ok(target)
}

/// Output directory for a source file.
///
/// With `--output`, the file's directory relative to the walked root is
/// recreated under it; otherwise the file is written next to its source.
fn target_dir(
    src_path: &Path,
    rel_dir: &Path,
    output: Option<&Path>,
) -> Result<PathBuf, PrecompileError> {
    let Some(out) = output else {
        return Ok(src_path.parent().unwrap_or(Path::new(".")).to_path_buf());
    };

    let escapes = rel_dir
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(PrecompileError::io(
            src_path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} leaves the output directory", rel_dir.display()),
            ),
        ));
    }
    Ok(out.join(rel_dir))
}

fn check_command(config: Config, dir: &Path, skip_fmt: bool) -> Result<(), PrecompileError> {
    let package = MemPackage::read_dir(dir)?;
    let mut driver = PackageDriver::new(Precompiler::new(config.clone())?);
    if !skip_fmt {
        driver = driver.with_verifier(GoToolchain::new(&config)?);
    }
    driver.precompile_and_check(&package)
}

fn build_command(config: Config, path: &Path) -> Result<(), PrecompileError> {
    GoToolchain::new(&config)?.build_package(path)
}

/// Every .gno file under the given paths, sorted and de-duplicated, with
/// its directory relative to the path it was found under
fn collect_gno_files(paths: &[PathBuf]) -> Result<Vec<(PathBuf, PathBuf)>, PrecompileError> {
    let mut files = BTreeMap::new();
    for path in paths {
        let root = if path.is_dir() {
            path.as_path()
        } else {
            path.parent().unwrap_or(Path::new(""))
        };

        for entry in WalkDir::new(path) {
            let entry = entry.map_err(|e| {
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                PrecompileError::io(path, io)
            })?;
            let is_gno = entry
                .file_name()
                .to_str()
                .is_some_and(is_gno_file);
            if !entry.file_type().is_file() || !is_gno {
                continue;
            }

            let rel_dir = entry
                .path()
                .parent()
                .and_then(|dir| dir.strip_prefix(root).ok())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            files.entry(entry.into_path()).or_insert(rel_dir);
        }
    }
    Ok(files.into_iter().collect())
}

/// Print every diagnostic on its own line
fn report(error: PrecompileError) {
    match error {
        PrecompileError::Aggregate(agg) => {
            for e in agg.into_errors() {
                eprintln!("{}", e);
            }
        }
        other => eprintln!("{}", other),
    }
}
