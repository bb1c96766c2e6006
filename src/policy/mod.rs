//! Import whitelist enforcement.
//!
//! Non-test gno files may only import whitelisted Go standard library
//! packages, trusted prefixes, and the gno.land realm and demo-package
//! namespaces.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::config::Config;
use crate::core::{quote, DiagnosticList};
use crate::parser::{ImportSpec, SourceTree};
use crate::rewrite::{GNO_PACKAGE_PREFIX, GNO_REALM_PREFIX};

/// Why an import was allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowReason {
    Realm,
    DemoPackage,
    Exact,
    Prefix(String),
}

/// Outcome of evaluating one import path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Exact names plus trusted prefixes
#[derive(Debug, Clone)]
pub struct WhitelistPolicy {
    exact: FxHashSet<String>,
    prefixes: Vec<String>,
}

impl WhitelistPolicy {
    pub fn new<E, P>(exact: E, prefixes: P) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            exact: exact.into_iter().map(Into::into).collect(),
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.whitelist.exact.iter().cloned(),
            config.allowed_prefixes(),
        )
    }

    /// Classify an import path. Every path gets a decision.
    pub fn evaluate(&self, import_path: &str) -> Decision {
        if import_path.starts_with(GNO_REALM_PREFIX) {
            return Decision::Allow(AllowReason::Realm);
        }
        if import_path.starts_with(GNO_PACKAGE_PREFIX) {
            return Decision::Allow(AllowReason::DemoPackage);
        }
        if self.exact.contains(import_path) {
            return Decision::Allow(AllowReason::Exact);
        }
        if let Some(prefix) = self
            .prefixes
            .iter()
            .find(|prefix| import_path.starts_with(prefix.as_str()))
        {
            return Decision::Allow(AllowReason::Prefix(prefix.clone()));
        }
        Decision::Deny
    }

    /// Check every import of a file, reporting all violations
    pub fn check(&self, file_name: &str, imports: &[ImportSpec]) -> DiagnosticList {
        let mut violations = DiagnosticList::new();

        for import in imports {
            let decision = self.evaluate(&import.original_path);
            debug!(
                "{}: import {} -> {:?}",
                file_name, import.original_path, decision
            );
            if !decision.is_allowed() {
                violations.add(
                    file_name,
                    import.position,
                    format!(
                        "import {} is not in the whitelist",
                        quote(&import.original_path)
                    ),
                );
            }
        }

        violations
    }

    pub fn check_tree(&self, tree: &SourceTree) -> DiagnosticList {
        self.check(tree.file_name(), tree.imports())
    }
}
