//! Whole-package precompilation with error aggregation.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::build::GoToolchain;
use crate::core::{AggregateError, DiagnosticList, PrecompileError, Result};
use crate::precompile::Precompiler;
use crate::source::{MemPackage, SourceFile};

/// Runs the single-file pipeline over every gno file of a package
pub struct PackageDriver {
    precompiler: Precompiler,
    verifier: Option<GoToolchain>,
}

impl PackageDriver {
    pub fn new(precompiler: Precompiler) -> Self {
        Self {
            precompiler,
            verifier: None,
        }
    }

    /// Also run `gofmt` on every generated file
    pub fn with_verifier(mut self, toolchain: GoToolchain) -> Self {
        self.verifier = Some(toolchain);
        self
    }

    pub fn precompiler_mut(&mut self) -> &mut Precompiler {
        &mut self.precompiler
    }

    /// Precompile every gno file of the package into a scoped temporary
    /// directory, collecting one failure per file in file order.
    ///
    /// Non-gno files are skipped. A tool invocation error aborts the whole
    /// request.
    pub fn precompile_and_check(&mut self, package: &MemPackage) -> Result<()> {
        let tmp_dir = tempfile::Builder::new()
            .prefix(&format!("gnogen-{}-", package.name))
            .tempdir()
            .map_err(|e| PrecompileError::io(std::env::temp_dir(), e))?;
        debug!(
            "Precompiling package {} in {}",
            package.path,
            tmp_dir.path().display()
        );

        let mut errors = AggregateError::new();
        let mut seen = FxHashSet::default();

        for file in &package.files {
            if !file.is_gno() {
                continue;
            }
            if !seen.insert(file.name.as_str()) {
                warn!("{}: duplicate file in package, skipped", file.name);
                continue;
            }

            match self.check_file(file, &tmp_dir) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    if e.is_internal_defect() {
                        error!("{}: internal precompiler error: {}", file.name, e);
                    } else {
                        debug!("{}: {}", file.name, e);
                    }
                    errors.push(e);
                }
            }
        }

        if !errors.is_empty() {
            info!(
                "Package {}: {} file(s) failed",
                package.path,
                errors.len()
            );
        }
        errors.into_result().map_err(PrecompileError::Aggregate)
    }

    fn check_file(&mut self, file: &SourceFile, tmp_dir: &TempDir) -> Result<()> {
        let generated = self.precompiler.precompile_file(file)?.into_checked()?;

        let tmp_file = tmp_dir.path().join(&generated.name);
        fs::write(&tmp_file, &generated.text).map_err(|e| PrecompileError::io(&tmp_file, e))?;

        if let Some(verifier) = &self.verifier {
            verifier
                .verify_file(&tmp_file)
                .map_err(|e| relocate_diagnostics(e, tmp_dir.path(), &file.name))?;
        }
        Ok(())
    }
}

/// Point diagnostics reported against the temporary copy at the source file
fn relocate_diagnostics(error: PrecompileError, tmp_dir: &Path, name: &str) -> PrecompileError {
    let PrecompileError::Build(list) = error else {
        return error;
    };

    let relocated: DiagnosticList = list
        .into_vec()
        .into_iter()
        .map(|mut diag| {
            if Path::new(&diag.file).starts_with(tmp_dir) {
                diag.file = name.to_string();
            }
            diag
        })
        .collect::<Vec<_>>()
        .into();
    PrecompileError::Build(relocated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn driver() -> PackageDriver {
        PackageDriver::new(Precompiler::new(Config::default()).unwrap())
    }

    #[test]
    fn test_valid_package() {
        let pkg = MemPackage::new("foo", "gno.land/p/demo/foo")
            .with_file("foo.gno", "package foo\n\nimport \"std\"\n\nfunc F() std.Address { return \"\" }\n")
            .with_file("foo_test.gno", "package foo\n\nimport \"testing\"\n\nfunc TestF(t *testing.T) {}\n")
            .with_file("README.md", "# not gno");

        assert!(driver().precompile_and_check(&pkg).is_ok());
    }

    #[test]
    fn test_failures_are_collected_in_file_order() {
        let pkg = MemPackage::new("foo", "gno.land/p/demo/foo")
            .with_file("a.gno", "package foo\n\nfunc {\n")
            .with_file("b.gno", "package foo\n\nimport \"os\"\n")
            .with_file("c.gno", "package foo\n");

        let err = driver().precompile_and_check(&pkg).unwrap_err();
        let PrecompileError::Aggregate(agg) = err else {
            panic!("expected an aggregate error");
        };

        assert_eq!(agg.len(), 2);
        assert!(matches!(agg.errors()[0], PrecompileError::Parse(_)));
        assert!(matches!(
            agg.errors()[1],
            PrecompileError::WhitelistViolation(_)
        ));
        assert!(agg.errors()[1]
            .to_string()
            .contains("b.gno:3:8: import \"os\" is not in the whitelist"));
    }

    #[test]
    fn test_duplicate_files_reported_once() {
        let pkg = MemPackage::new("foo", "gno.land/p/demo/foo")
            .with_file("a.gno", "package foo\n\nimport \"os\"\n")
            .with_file("a.gno", "package foo\n\nimport \"os\"\n");

        let PrecompileError::Aggregate(agg) = driver().precompile_and_check(&pkg).unwrap_err()
        else {
            panic!("expected an aggregate error");
        };
        assert_eq!(agg.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_verifier_diagnostics_name_the_source_file() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::TempDir::new().unwrap();
        let script = bin.path().join("fake-gofmt");
        fs::write(
            &script,
            "#!/bin/sh\nfor last; do :; done\necho \"$last:3:1: expected declaration, found x\"\nexit 2\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::default();
        config.toolchain.gofmt = script.to_string_lossy().into_owned();
        let toolchain = GoToolchain::new(&config).unwrap();

        let pkg = MemPackage::new("foo", "gno.land/p/demo/foo")
            .with_file("a.gno", "package foo\n")
            .with_file("b_test.gno", "package foo\n");

        let PrecompileError::Aggregate(agg) = driver()
            .with_verifier(toolchain)
            .precompile_and_check(&pkg)
            .unwrap_err()
        else {
            panic!("expected an aggregate error");
        };
        let reported: Vec<_> = agg.errors().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            reported,
            vec![
                "a.gno:3:1: expected declaration, found x",
                "b_test.gno:3:1: expected declaration, found x",
            ]
        );
    }

    #[test]
    fn test_missing_verifier_aborts() {
        let mut config = Config::default();
        config.toolchain.gofmt = "gnogen-no-such-gofmt".to_string();
        let toolchain = GoToolchain::new(&config).unwrap();

        let pkg = MemPackage::new("foo", "gno.land/p/demo/foo")
            .with_file("a.gno", "package foo\n")
            .with_file("b.gno", "package foo\n");

        let err = driver()
            .with_verifier(toolchain)
            .precompile_and_check(&pkg)
            .unwrap_err();
        assert!(matches!(err, PrecompileError::ToolInvocation { .. }));
    }
}
