//! Translation of Go toolchain output back to gno source positions.

pub mod error;

use regex::Regex;
use tracing::debug;

use crate::core::{Diagnostic, DiagnosticList, PrecompileError};
use crate::source::GNO_EXTENSION;

pub use error::TranslateError;

/// `path:line:column: message`, one per line
pub const DIAGNOSTIC_PATTERN: &str = r"(?m)^(\S+):(\d+):(\d+): (.+)$";

const GENERATED_SUFFIX: &str = ".gen.go";
const GENERATED_TEST_SUFFIX: &str = ".gen_test.go";

/// Turns raw tool output into diagnostics
pub trait DiagnosticParser: Send + Sync {
    fn parse(&self, raw: &str) -> error::Result<Vec<Diagnostic>>;
}

/// Line-oriented regex matcher for `go build`/`gofmt` output
#[derive(Debug, Clone)]
pub struct RegexDiagnosticParser {
    pattern: Regex,
}

impl RegexDiagnosticParser {
    pub fn new() -> error::Result<Self> {
        Ok(Self {
            pattern: Regex::new(DIAGNOSTIC_PATTERN)?,
        })
    }
}

impl DiagnosticParser for RegexDiagnosticParser {
    fn parse(&self, raw: &str) -> error::Result<Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();

        for captures in self.pattern.captures_iter(raw) {
            let text = &captures[0];
            let line = captures[2]
                .parse::<usize>()
                .map_err(|source| TranslateError::InvalidLine {
                    text: text.to_string(),
                    source,
                })?;
            let column = captures[3]
                .parse::<usize>()
                .map_err(|source| TranslateError::InvalidColumn {
                    text: text.to_string(),
                    source,
                })?;

            diagnostics.push(Diagnostic {
                file: original_file_name(&captures[1]),
                line,
                column,
                message: captures[4].trim_end_matches('\r').to_string(),
            });
        }

        debug!("Translated {} diagnostics", diagnostics.len());
        Ok(diagnostics)
    }
}

/// Map a generated file name back to the gno file it came from.
///
/// `foo.gno.gen.go` -> `foo.gno`, `.foo_test.gno.gen_test.go` -> `foo_test.gno`,
/// `.foo_filetest.gno.gen.go` -> `foo_filetest.gno`. Directories are kept.
/// Other names are returned unchanged.
pub fn original_file_name(generated: &str) -> String {
    let Some(stripped) = generated
        .strip_suffix(GENERATED_TEST_SUFFIX)
        .or_else(|| generated.strip_suffix(GENERATED_SUFFIX))
    else {
        return generated.to_string();
    };

    let (dir, base) = match stripped.rfind('/') {
        Some(idx) => stripped.split_at(idx + 1),
        None => ("", stripped),
    };

    let base = match base.strip_prefix('.') {
        Some(rest) if rest.ends_with(GNO_EXTENSION) => rest,
        _ => base,
    };

    format!("{}{}", dir, base)
}

/// Parse raw output and wrap it: no diagnostics means success
pub fn translate(parser: &dyn DiagnosticParser, raw: &str) -> Result<(), PrecompileError> {
    let diagnostics = parser.parse(raw)?;
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(PrecompileError::Build(DiagnosticList::from(diagnostics)))
    }
}
