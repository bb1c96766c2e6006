use std::ops::Range;

use tree_sitter::{Node, Tree};

use super::error::{ParseError, Result};
use crate::core::Position;

/// Top-level declaration kinds of a gno file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Package,
    Import,
    Const,
    Var,
    Type,
    Function,
    Method,
    Other,
}

impl DeclarationKind {
    fn from_node_kind(kind: &str) -> Self {
        match kind {
            "package_clause" => DeclarationKind::Package,
            "import_declaration" => DeclarationKind::Import,
            "const_declaration" => DeclarationKind::Const,
            "var_declaration" => DeclarationKind::Var,
            "type_declaration" => DeclarationKind::Type,
            "function_declaration" => DeclarationKind::Function,
            "method_declaration" => DeclarationKind::Method,
            _ => DeclarationKind::Other,
        }
    }
}

/// A top-level declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub position: Position,
    pub byte_range: Range<usize>,
}

/// An import spec with everything needed to check, rewrite and report it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Current import path; the rewriter replaces it in place
    pub path: String,
    /// Import path as written in the source
    pub original_path: String,
    /// Alias (`foo`, `_` or `.`)
    pub name: Option<String>,
    /// Position of the spec (alias if present, else the path)
    pub position: Position,
    /// Byte range of the quoted path literal
    pub literal_range: Range<usize>,
}

impl ImportSpec {
    pub fn is_rewritten(&self) -> bool {
        self.path != self.original_path
    }
}

/// A byte-range replacement applied to the source on emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start_byte: usize,
    pub end_byte: usize,
    pub replacement: String,
}

/// Parsed gno file. Owned by a single pipeline run.
#[derive(Debug)]
pub struct SourceTree {
    file_name: String,
    source: String,
    tree: Tree,
    package_name: String,
    declarations: Vec<Declaration>,
    imports: Vec<ImportSpec>,
    edits: Vec<Edit>,
}

impl SourceTree {
    /// Build a source tree from a tree-sitter parse, rejecting invalid syntax
    pub fn from_tree(file_name: &str, source: String, tree: Tree) -> Result<Self> {
        let root = tree.root_node();

        let errors: Vec<_> = {
            let mut nodes = Vec::new();
            collect_error_nodes(root, &mut nodes);
            nodes
                .iter()
                .map(|node| {
                    (
                        Position::from_point(node.start_position()),
                        describe_error_node(node, &source),
                    )
                })
                .collect()
        };
        if let Some(err) = syntax_error(file_name, errors) {
            return Err(err);
        }

        let package_name = extract_package_name(file_name, &root, &source)?;
        if let Some(err) = syntax_error(file_name, check_top_level(&root, &source)) {
            return Err(err);
        }
        let declarations = extract_declarations(&root);
        let imports = extract_imports(&root, &source);

        Ok(Self {
            file_name: file_name.to_string(),
            source,
            tree,
            package_name,
            declarations,
            imports,
            edits: Vec::new(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn imports(&self) -> &[ImportSpec] {
        &self.imports
    }

    pub fn imports_mut(&mut self) -> &mut [ImportSpec] {
        &mut self.imports
    }

    /// Record an extra edit for emission
    pub fn push_edit(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Source text covered by a byte range, if the range is valid
    pub fn text(&self, range: Range<usize>) -> Option<&str> {
        self.source.get(range)
    }
}

/// Syntax errors reported per file, matching `go/parser`
const MAX_SYNTAX_ERRORS: usize = 10;

/// ERROR and MISSING nodes in document order
fn collect_error_nodes<'a>(node: Node<'a>, found: &mut Vec<Node<'a>>) {
    if found.len() >= MAX_SYNTAX_ERRORS {
        return;
    }
    if node.is_error() || node.is_missing() {
        found.push(node);
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, found);
    }
}

/// Fold positioned errors into one, first error first, `go/scanner` style
fn syntax_error(file_name: &str, errors: Vec<(Position, String)>) -> Option<ParseError> {
    let count = errors.len();
    let (position, message) = errors.into_iter().next()?;
    let message = match count {
        1 => message,
        2 => format!("{} (and 1 more error)", message),
        n => format!("{} (and {} more errors)", message, n - 1),
    };
    Some(ParseError::syntax(file_name, position, message))
}

/// Top level must be one package clause, then imports, then declarations.
///
/// The grammar also accepts statements and out-of-order clauses here.
fn check_top_level(root: &Node, source: &str) -> Vec<(Position, String)> {
    let mut errors = Vec::new();
    let mut seen_package = false;
    let mut seen_declaration = false;

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let message = match child.kind() {
            "comment" => continue,
            "package_clause" if !seen_package => {
                seen_package = true;
                continue;
            }
            "package_clause" => "expected declaration, found 'package'".to_string(),
            "import_declaration" if !seen_declaration => continue,
            "import_declaration" => "imports must appear before other declarations".to_string(),
            "const_declaration" | "var_declaration" | "type_declaration"
            | "function_declaration" | "method_declaration" => {
                seen_declaration = true;
                continue;
            }
            kind if kind.ends_with("statement")
                || kind.ends_with("expression")
                || kind == "short_var_declaration" =>
            {
                "non-declaration statement outside function body".to_string()
            }
            _ => {
                let found = source
                    .get(child.byte_range())
                    .and_then(|t| t.split_whitespace().next())
                    .unwrap_or("EOF");
                format!("expected declaration, found {}", found)
            }
        };

        if errors.len() < MAX_SYNTAX_ERRORS {
            errors.push((Position::from_point(child.start_position()), message));
        }
    }
    errors
}

fn describe_error_node(node: &Node, source: &str) -> String {
    if node.is_missing() {
        return format!("syntax error: missing {}", node.kind());
    }

    let text = source.get(node.byte_range()).unwrap_or("");
    match text.split_whitespace().next() {
        Some(token) => format!("syntax error: unexpected {}", token),
        None => "syntax error".to_string(),
    }
}

/// Extract package name; the package clause must come first
fn extract_package_name(file_name: &str, root: &Node, source: &str) -> Result<String> {
    let mut cursor = root.walk();
    let first = root
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");

    match first {
        Some(clause) if clause.kind() == "package_clause" => {
            let mut pkg_cursor = clause.walk();
            for child in clause.children(&mut pkg_cursor) {
                if child.kind() == "package_identifier" {
                    if let Some(name) = source.get(child.byte_range()) {
                        return Ok(name.to_string());
                    }
                }
            }
            Err(ParseError::syntax(
                file_name,
                Position::from_point(clause.start_position()),
                "expected package name",
            ))
        }
        Some(other) => {
            let found = source
                .get(other.byte_range())
                .and_then(|t| t.split_whitespace().next())
                .unwrap_or("EOF");
            Err(ParseError::syntax(
                file_name,
                Position::from_point(other.start_position()),
                format!("expected 'package', found {}", found),
            ))
        }
        None => Err(ParseError::syntax(
            file_name,
            Position::from_point(root.end_position()),
            "expected 'package', found 'EOF'",
        )),
    }
}

fn extract_declarations(root: &Node) -> Vec<Declaration> {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .map(|child| Declaration {
            kind: DeclarationKind::from_node_kind(child.kind()),
            position: Position::from_point(child.start_position()),
            byte_range: child.byte_range(),
        })
        .collect()
}

/// Extract imports from every top-level import declaration
fn extract_imports(root: &Node, source: &str) -> Vec<ImportSpec> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();

    for child in root.children(&mut cursor) {
        if child.kind() == "import_declaration" {
            extract_import_specs(&child, source, &mut imports);
        }
    }

    imports
}

/// Handle both single and grouped imports
fn extract_import_specs(node: &Node, source: &str, imports: &mut Vec<ImportSpec>) {
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        if child.kind() == "import_spec_list" {
            let mut spec_cursor = child.walk();
            for spec in child.children(&mut spec_cursor) {
                if spec.kind() == "import_spec" {
                    if let Some(import) = parse_import_spec(&spec, source) {
                        imports.push(import);
                    }
                }
            }
        } else if child.kind() == "import_spec" {
            if let Some(import) = parse_import_spec(&child, source) {
                imports.push(import);
            }
        }
    }
}

fn parse_import_spec(spec: &Node, source: &str) -> Option<ImportSpec> {
    let path_node = spec.child_by_field_name("path")?;
    let literal = source.get(path_node.byte_range())?;
    let path = unquote_import_path(literal);

    let name = spec
        .child_by_field_name("name")
        .and_then(|n| source.get(n.byte_range()))
        .map(str::to_string);

    Some(ImportSpec {
        original_path: path.clone(),
        path,
        name,
        position: Position::from_point(spec.start_position()),
        literal_range: path_node.byte_range(),
    })
}

/// Strip the quotes of an interpreted or raw string literal
pub(crate) fn unquote_import_path(literal: &str) -> String {
    literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            literal
                .strip_prefix('`')
                .and_then(|s| s.strip_suffix('`'))
        })
        .unwrap_or(literal)
        .to_string()
}
