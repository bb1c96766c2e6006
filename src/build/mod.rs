//! Go toolchain invocation against generated files.
//!
//! Calls block until the tool exits; there is no timeout.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::{PrecompileError, Result};
use crate::diagnostics::{translate, DiagnosticParser, RegexDiagnosticParser};
use crate::source::GNO_BUILD_TAG;

/// Generated and hand-written Go files excluded from package builds
const SKIPPED_SUFFIXES: &[&str] = &[
    "_filetest.go",
    "_filetest.gno.gen.go",
    "_test.go",
    "_test.gno.gen.go",
];

/// `go` and `gofmt` commands plus the translator for their output
pub struct GoToolchain {
    go_binary: String,
    gofmt_binary: String,
    module_root: String,
    parser: Box<dyn DiagnosticParser>,
}

impl GoToolchain {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            go_binary: config.toolchain.go.clone(),
            gofmt_binary: config.toolchain.gofmt.clone(),
            module_root: config.module_root.clone(),
            parser: Box::new(RegexDiagnosticParser::new()?),
        })
    }

    /// Replace the output translator
    pub fn with_parser(mut self, parser: Box<dyn DiagnosticParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Run `gofmt -l -e` on one generated file.
    ///
    /// Fast, and does not need the imports to resolve.
    pub fn verify_file(&self, path: &Path) -> Result<()> {
        let mut parts = self.gofmt_binary.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| PrecompileError::tool("gofmt", "empty gofmt command"))?;

        let mut cmd = Command::new(program);
        cmd.args(parts).arg("-l").arg("-e").arg(path);

        let output = run(&mut cmd, &self.gofmt_binary)?;
        if output.status.success() {
            return Ok(());
        }
        self.translate_failure(&self.gofmt_binary, &output)
    }

    /// Run `go build` on a generated file or on a directory of generated files.
    ///
    /// Needs every import of the package to resolve.
    pub fn build_package(&self, file_or_pkg: &Path) -> Result<()> {
        let files = collect_build_files(file_or_pkg)?;
        if files.is_empty() {
            warn!("No Go files to build in {}", file_or_pkg.display());
        }

        let mut cmd = Command::new(&self.go_binary);
        cmd.arg("build")
            .arg("-v")
            .arg(format!("-tags={}", GNO_BUILD_TAG))
            .args(&files);

        match self.guess_root_dir(file_or_pkg) {
            Ok(root) => {
                debug!("Building from module root {}", root.display());
                cmd.current_dir(root);
            }
            Err(e) => debug!("Building from current directory: {}", e),
        }

        info!("Running {} build on {} file(s)", self.go_binary, files.len());
        let output = run(&mut cmd, &self.go_binary)?;
        if output.status.success() {
            return Ok(());
        }
        self.translate_failure(&self.go_binary, &output)
    }

    /// Directory of the module named by `module_root`, via `go list -m`
    pub fn guess_root_dir(&self, file_or_pkg: &Path) -> Result<PathBuf> {
        let abs = absolute(file_or_pkg)?;
        let dir = match abs.parent() {
            Some(parent) if !abs.is_dir() => parent.to_path_buf(),
            _ => abs.clone(),
        };

        let mut cmd = Command::new(&self.go_binary);
        cmd.args(["list", "-m", "-mod=mod", "-f", "{{.Dir}}"])
            .arg(&self.module_root)
            .current_dir(&dir);

        let output = run(&mut cmd, &self.go_binary)?;
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || root.is_empty() {
            return Err(PrecompileError::tool(
                &self.go_binary,
                "can't guess --root-dir",
            ));
        }
        Ok(PathBuf::from(root))
    }

    /// Non-zero exit: diagnostics become a build error; anything else is a
    /// tool invocation error carrying the raw output
    fn translate_failure(&self, tool: &str, output: &Output) -> Result<()> {
        let combined = combined_output(output);
        match translate(self.parser.as_ref(), &combined) {
            Ok(()) => Err(PrecompileError::tool(
                tool,
                format!("{}: {}", output.status, combined.trim()),
            )),
            Err(e) => Err(e),
        }
    }
}

/// Files passed to `go build`, sorted.
///
/// A file is used as-is. A directory contributes its `*.go` files, minus
/// hidden files and test/filetest outputs.
pub fn collect_build_files(file_or_pkg: &Path) -> Result<Vec<PathBuf>> {
    let metadata =
        fs::metadata(file_or_pkg).map_err(|e| PrecompileError::io(file_or_pkg, e))?;

    if !metadata.is_dir() {
        return Ok(vec![file_or_pkg.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(file_or_pkg).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            PrecompileError::io(file_or_pkg, io)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let skipped = !name.ends_with(".go")
            || name.starts_with('.')
            || SKIPPED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix));
        if skipped {
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort();
    Ok(files)
}

fn run(cmd: &mut Command, tool: &str) -> Result<Output> {
    debug!("Running {:?}", cmd);
    cmd.output()
        .map_err(|e| PrecompileError::tool(tool, e.to_string()))
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}{}", stdout, stderr)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| PrecompileError::io(path, e))?;
    Ok(cwd.join(path))
}
