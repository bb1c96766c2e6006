//! Go source emission.
//!
//! The emitted file starts with a generated-code marker, an optional
//! `//go:build` line and a `//line :1:1` directive, so the Go toolchain
//! reports positions of the generated file as positions of the gno file.

use std::fmt::Write as _;

use tracing::{debug, error};

use crate::core::{quote, PrecompileError, Result};
use crate::parser::{Edit, GoParser, SourceTree};

/// Pins generated line 1 to line 1, column 1 of the gno file
pub const LINE_DIRECTIVE: &str = "//line :1:1\n";

/// A Go file generated from a gno file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub tags: String,
    pub text: String,
}

/// Serializes rewritten trees back to Go source
pub struct Emitter {
    generator: String,
    validator: GoParser,
}

impl Emitter {
    /// `generator` is named in the "Code generated by" marker
    pub fn new(generator: impl Into<String>) -> Result<Self> {
        Ok(Self {
            generator: generator.into(),
            validator: GoParser::new()?,
        })
    }

    pub fn header(&self, tags: Option<&str>) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "// Code generated by {}. DO NOT EDIT.\n\n",
            self.generator
        );
        if let Some(tags) = tags.filter(|t| !t.is_empty()) {
            let _ = write!(out, "//go:build {}\n\n", tags);
        }
        out.push_str(LINE_DIRECTIVE);
        out
    }

    /// Emit the tree with its rewritten imports and recorded edits
    pub fn emit(&mut self, tree: &SourceTree, tags: Option<&str>) -> Result<String> {
        let body = apply_edits(tree)?;

        let mut out = self.header(tags);
        out.push_str(&body);

        if let Err(e) = self.validator.parse(tree.file_name(), &out) {
            error!("{}: emitted source does not parse: {}", tree.file_name(), e);
            return Err(PrecompileError::format(tree.file_name(), e.to_string()));
        }

        debug!(
            "{}: emitted {} bytes",
            tree.file_name(),
            out.len()
        );
        Ok(out)
    }
}

/// Collect import rewrites and transform edits, then apply from end to start
fn apply_edits(tree: &SourceTree) -> Result<String> {
    let mut edits: Vec<Edit> = tree
        .imports()
        .iter()
        .filter(|import| import.is_rewritten())
        .map(|import| Edit {
            start_byte: import.literal_range.start,
            end_byte: import.literal_range.end,
            replacement: quote(&import.path),
        })
        .chain(tree.edits().iter().cloned())
        .collect();

    edits.sort_by_key(|edit| edit.start_byte);

    for edit in &edits {
        if tree.text(edit.start_byte..edit.end_byte).is_none() {
            return Err(PrecompileError::format(
                tree.file_name(),
                format!(
                    "edit {}..{} is outside the source",
                    edit.start_byte, edit.end_byte
                ),
            ));
        }
    }
    for pair in edits.windows(2) {
        if pair[1].start_byte < pair[0].end_byte {
            return Err(PrecompileError::format(
                tree.file_name(),
                format!("overlapping edits at byte {}", pair[1].start_byte),
            ));
        }
    }

    let mut result = tree.source().to_string();
    for edit in edits.iter().rev() {
        result.replace_range(edit.start_byte..edit.end_byte, &edit.replacement);
    }
    Ok(result)
}
