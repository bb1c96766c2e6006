use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::types::DiagnosticList;

/// Main error type that aggregates the per-layer errors of the pipeline
#[derive(Error, Debug)]
pub enum PrecompileError {
    /// Malformed input, fatal to that file
    #[error("parse: {0}")]
    Parse(#[from] crate::parser::error::ParseError),

    /// One or more imports outside the whitelist
    #[error("{0}")]
    WhitelistViolation(DiagnosticList),

    /// A matched import could not be rewritten
    #[error("{0}")]
    RewriteFailure(DiagnosticList),

    /// The rewritten tree is not valid surface syntax
    #[error("format: {file}: {message}")]
    Format { file: String, message: String },

    /// External tool missing or unusable
    #[error("{tool}: {message}")]
    ToolInvocation { tool: String, message: String },

    /// Translated diagnostics reported by the Go toolchain
    #[error("{0}")]
    Build(DiagnosticList),

    /// Toolchain output that could not be translated
    #[error(transparent)]
    Translate(#[from] crate::diagnostics::error::TranslateError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] crate::config::error::ConfigError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PrecompileError>;

impl PrecompileError {
    pub fn format(file: impl Into<String>, message: impl Into<String>) -> Self {
        PrecompileError::Format {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        PrecompileError::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrecompileError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that signal a bug in the pipeline rather than bad user input
    pub fn is_internal_defect(&self) -> bool {
        matches!(
            self,
            PrecompileError::RewriteFailure(_)
                | PrecompileError::Format { .. }
                | PrecompileError::Translate(_)
        )
    }

    /// Errors that abort a whole request instead of a single file
    pub fn is_fatal(&self) -> bool {
        matches!(self, PrecompileError::ToolInvocation { .. })
    }
}

/// Ordered collection of independent failures reported as one error.
///
/// An empty aggregate means success; use [`AggregateError::into_result`]
/// instead of checking emptiness by hand.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<PrecompileError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: PrecompileError) {
        match error {
            // Flatten so entries stay one-per-failure
            PrecompileError::Aggregate(inner) => self.errors.extend(inner.errors),
            other => self.errors.push(other),
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[PrecompileError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<PrecompileError> {
        self.errors
    }

    pub fn into_result(self) -> std::result::Result<(), AggregateError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::error::Error for AggregateError {}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl Extend<PrecompileError> for AggregateError {
    fn extend<I: IntoIterator<Item = PrecompileError>>(&mut self, iter: I) {
        for error in iter {
            self.push(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;

    #[test]
    fn test_empty_aggregate_is_success() {
        assert!(AggregateError::new().into_result().is_ok());
    }

    #[test]
    fn test_aggregate_keeps_order_and_flattens() {
        let mut inner = AggregateError::new();
        inner.push(PrecompileError::format("b.gno", "bad"));

        let mut list = DiagnosticList::new();
        list.add("a.gno", Position::new(3, 2), "import \"os\" is not in the whitelist");

        let mut agg = AggregateError::new();
        agg.push(PrecompileError::WhitelistViolation(list));
        agg.push(PrecompileError::Aggregate(inner));

        assert_eq!(agg.len(), 2);
        assert!(matches!(
            agg.errors()[0],
            PrecompileError::WhitelistViolation(_)
        ));
        assert_eq!(
            agg.to_string(),
            "a.gno:3:2: import \"os\" is not in the whitelist\nformat: b.gno: bad"
        );
    }

    #[test]
    fn test_internal_defect_classification() {
        assert!(PrecompileError::format("a.gno", "x").is_internal_defect());
        assert!(!PrecompileError::Build(DiagnosticList::new()).is_internal_defect());
        assert!(PrecompileError::tool("go", "not found").is_fatal());
    }
}
