pub mod error;
pub mod tree;

use tree_sitter::{Parser, Tree};

pub use error::ParseError;
pub use tree::{Declaration, DeclarationKind, Edit, ImportSpec, SourceTree};

use error::Result;

/// Gno parser. Gno shares Go's grammar, so this wraps tree-sitter-go.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    /// Create a new parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| ParseError::LanguageSetupFailed(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse raw source without validating it
    pub fn parse_raw(&mut self, file_name: &str, source: &str) -> Result<Tree> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| ParseError::ParseFailed {
                file: file_name.to_string(),
            })
    }

    /// Parse a gno file into a validated source tree
    pub fn parse(&mut self, file_name: &str, source: &str) -> Result<SourceTree> {
        let tree = self.parse_raw(file_name, source)?;
        SourceTree::from_tree(file_name, source.to_string(), tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_creation() {
        let parser = GoParser::new();
        assert!(parser.is_ok());
    }

    #[test]
    fn test_parse_simple_gno() {
        let mut parser = GoParser::new().unwrap();
        let source = r#"
package main

func main() {
    println("Hello, world!")
}
"#;
        let tree = parser.parse("main.gno", source);
        assert!(tree.is_ok());
    }
}
