use tracing::{debug, error, warn};

use crate::config::Config;
use crate::core::{DiagnosticList, PrecompileError, Result};
use crate::emit::{Emitter, GeneratedFile};
use crate::parser::{GoParser, ImportSpec};
use crate::policy::WhitelistPolicy;
use crate::rewrite::{Rewriter, Transform, TransformStages};
use crate::source::{generated_name_and_tags, FileKind, SourceFile};

/// Output of one file's pass: the translated file plus the whitelist outcome
#[derive(Debug, Clone)]
pub struct Precompiled {
    pub generated: GeneratedFile,
    /// Imports after rewriting; `original_path` keeps the gno path
    pub imports: Vec<ImportSpec>,
    /// Whitelist violations; empty for allowed or unchecked files
    pub violations: DiagnosticList,
}

impl Precompiled {
    /// The generated file, or the whitelist violations when there are any
    pub fn into_checked(self) -> Result<GeneratedFile> {
        if self.violations.is_empty() {
            Ok(self.generated)
        } else {
            Err(PrecompileError::WhitelistViolation(self.violations))
        }
    }
}

/// Single-file pipeline: parse, check imports, rewrite, transform, emit
pub struct Precompiler {
    config: Config,
    parser: GoParser,
    policy: WhitelistPolicy,
    rewriter: Rewriter,
    transforms: TransformStages,
    emitter: Emitter,
}

impl Precompiler {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            parser: GoParser::new()?,
            policy: WhitelistPolicy::from_config(&config),
            rewriter: Rewriter::from_config(&config),
            transforms: TransformStages::new(),
            emitter: Emitter::new(config.module_root.clone())?,
            config,
        })
    }

    /// Append a transform stage, run after import rewriting
    pub fn with_transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> &WhitelistPolicy {
        &self.policy
    }

    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    /// Precompile a file using the tags of the generated-name table
    pub fn precompile_file(&mut self, file: &SourceFile) -> Result<Precompiled> {
        let (_, tags) = generated_name_and_tags(&file.name);
        self.precompile(&file.body, Some(&tags), &file.name)
    }

    /// Precompile gno source with explicit build tags.
    ///
    /// Whitelist violations do not stop rewriting or emission; they are
    /// returned in [`Precompiled::violations`].
    pub fn precompile(
        &mut self,
        source: &str,
        tags: Option<&str>,
        file_name: &str,
    ) -> Result<Precompiled> {
        let mut tree = self.parser.parse(file_name, source)?;
        debug!(
            "{}: package {} with {} imports",
            file_name,
            tree.package_name(),
            tree.imports().len()
        );

        let kind = FileKind::from_name(file_name);
        let check_whitelist = !(self.config.skip_whitelist_for_tests && kind.is_test());

        let violations = if check_whitelist {
            self.policy.check_tree(&tree)
        } else {
            debug!("{}: whitelist skipped for {:?} file", file_name, kind);
            DiagnosticList::new()
        };
        if !violations.is_empty() {
            warn!(
                "{}: {} import(s) outside the whitelist",
                file_name,
                violations.len()
            );
        }

        let failures = self.rewriter.rewrite(&mut tree);
        if !failures.is_empty() {
            error!("{}: import rewriting failed", file_name);
            return Err(PrecompileError::RewriteFailure(failures));
        }

        self.transforms.run(&mut tree)?;

        let text = self.emitter.emit(&tree, tags)?;
        let (name, _) = generated_name_and_tags(file_name);

        Ok(Precompiled {
            generated: GeneratedFile {
                name,
                tags: tags.unwrap_or_default().to_string(),
                text,
            },
            imports: tree.imports().to_vec(),
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn precompiler() -> Precompiler {
        Precompiler::new(Config::default()).unwrap()
    }

    const NET_HTTP: &str = "package foo\n\nimport (\n\t\"net/http\"\n\t\"std\"\n)\n";

    #[test]
    fn test_violations_do_not_stop_rewriting() {
        let out = precompiler().precompile(NET_HTTP, None, "foo.gno").unwrap();

        assert_eq!(out.violations.len(), 1);
        assert_eq!(
            out.violations.to_string(),
            "foo.gno:4:2: import \"net/http\" is not in the whitelist"
        );
        assert!(out
            .generated
            .text
            .contains("\"github.com/gnolang/gno/gnovm/stdlibs/stdshim\""));

        let err = out.into_checked().unwrap_err();
        assert!(matches!(err, PrecompileError::WhitelistViolation(_)));
    }

    #[test]
    fn test_tests_skip_whitelist() {
        let mut precompiler = precompiler();
        for name in ["foo_test.gno", "foo_filetest.gno"] {
            let out = precompiler
                .precompile_file(&SourceFile::new(name, NET_HTTP))
                .unwrap();
            assert!(out.violations.is_empty(), "{name} should skip the whitelist");
        }
    }

    #[test]
    fn test_tests_checked_when_skip_disabled() {
        let config = Config {
            skip_whitelist_for_tests: false,
            ..Config::default()
        };
        let mut precompiler = Precompiler::new(config).unwrap();
        let out = precompiler
            .precompile_file(&SourceFile::new("foo_test.gno", NET_HTTP))
            .unwrap();
        assert_eq!(out.violations.len(), 1);
    }

    #[test]
    fn test_generated_name_and_tags() {
        let out = precompiler()
            .precompile_file(&SourceFile::new("foo_test.gno", "package foo\n"))
            .unwrap();
        assert_eq!(out.generated.name, ".foo_test.gno.gen_test.go");
        assert_eq!(out.generated.tags, "gno && test");
        assert!(out.generated.text.contains("//go:build gno && test\n"));
    }

    #[test]
    fn test_parse_error() {
        let err = precompiler()
            .precompile("package foo\nfunc {", None, "bad.gno")
            .unwrap_err();
        assert!(matches!(err, PrecompileError::Parse(_)));
        assert!(err.to_string().starts_with("parse: bad.gno:"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            module_root: String::new(),
            ..Config::default()
        };
        assert!(matches!(
            Precompiler::new(config),
            Err(PrecompileError::Config(_))
        ));
    }
}
