//! Namespace rewriting from gno import paths to the Go module layout.

use tracing::{debug, error};

use crate::config::Config;
use crate::core::{quote, DiagnosticList, Result};
use crate::parser::tree::unquote_import_path;
use crate::parser::SourceTree;

/// Realm namespace
pub const GNO_REALM_PREFIX: &str = "gno.land/r/";
/// Demo-package namespace
pub const GNO_PACKAGE_PREFIX: &str = "gno.land/p/demo/";
/// The gno standard library shim import
pub const GNO_STD_PACKAGE: &str = "std";

/// How a rule matches an import path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Prefix,
}

/// A single `(match-kind, before, after)` rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub kind: MatchKind,
    pub before: String,
    pub after: String,
}

impl RewriteRule {
    pub fn exact(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Exact,
            before: before.into(),
            after: after.into(),
        }
    }

    pub fn prefix(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            kind: MatchKind::Prefix,
            before: before.into(),
            after: after.into(),
        }
    }

    /// Rewritten path, or None when the rule does not match
    pub fn apply(&self, import_path: &str) -> Option<String> {
        match self.kind {
            MatchKind::Exact if import_path == self.before => Some(self.after.clone()),
            MatchKind::Prefix => import_path
                .strip_prefix(self.before.as_str())
                .map(|rest| format!("{}{}", self.after, rest)),
            _ => None,
        }
    }
}

/// Ordered rule table; the first matching rule wins
#[derive(Debug, Clone)]
pub struct Rewriter {
    rules: Vec<RewriteRule>,
}

impl Rewriter {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Standard table: std shim, demo packages, realms
    pub fn from_config(config: &Config) -> Self {
        let examples = config.examples_root();
        Self::new(vec![
            RewriteRule::exact(GNO_STD_PACKAGE, config.std_shim_path()),
            RewriteRule::prefix(
                GNO_PACKAGE_PREFIX,
                format!("{}/{}", examples, GNO_PACKAGE_PREFIX),
            ),
            RewriteRule::prefix(
                GNO_REALM_PREFIX,
                format!("{}/{}", examples, GNO_REALM_PREFIX),
            ),
        ])
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Target of an import path, if any rule matches
    pub fn rewrite_path(&self, import_path: &str) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.apply(import_path))
    }

    /// Rewrite every import of the tree in place.
    ///
    /// Returns one diagnostic per matched import that could not be located in
    /// the source anymore.
    pub fn rewrite(&self, tree: &mut SourceTree) -> DiagnosticList {
        let mut failures = DiagnosticList::new();
        let mut targets = Vec::new();

        for (index, import) in tree.imports().iter().enumerate() {
            let Some(target) = self.rewrite_path(&import.original_path) else {
                continue;
            };

            let located = tree
                .text(import.literal_range.clone())
                .map(unquote_import_path)
                .is_some_and(|path| path == import.original_path);

            if located {
                debug!(
                    "{}: rewrite {} -> {}",
                    tree.file_name(),
                    import.original_path,
                    target
                );
                targets.push((index, target));
            } else {
                error!(
                    "{}: import {} not found at its recorded range",
                    tree.file_name(),
                    import.original_path
                );
                failures.add(
                    tree.file_name(),
                    import.position,
                    format!(
                        "failed to replace the {} package with {}",
                        quote(&import.original_path),
                        quote(&target)
                    ),
                );
            }
        }

        let imports = tree.imports_mut();
        for (index, target) in targets {
            imports[index].path = target;
        }

        failures
    }
}

/// A tree transform that runs after import rewriting and before emission
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, tree: &mut SourceTree) -> Result<()>;
}

/// Ordered list of transforms
#[derive(Default)]
pub struct TransformStages {
    stages: Vec<Box<dyn Transform>>,
}

impl TransformStages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Box<dyn Transform>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, stopping at the first failure
    pub fn run(&self, tree: &mut SourceTree) -> Result<()> {
        for stage in &self.stages {
            debug!("{}: running transform {}", tree.file_name(), stage.name());
            stage.apply(tree)?;
        }
        Ok(())
    }
}
