//! Native Python parser: symbols with decorators and docstrings, imports, and call sites.

use super::{ParsedSource, SourceParser};
use crate::language::Language;
use crate::types::{Import, Symbol, SymbolKind};
use tree_sitter::{Node, Parser};

/// A call site recorded during the walk
#[derive(Debug, Clone)]
struct CallSite {
    line: usize,
    name: String,
}

/// Python parser
///
/// Parsing is strict: a file with syntax errors is rejected so callers fall back to
/// plain line windows.
pub struct PythonParser {
    parser: Parser,
    state: ParsedSource,
    calls: Vec<CallSite>,
}

impl PythonParser {
    /// Create a new Python parser, or None if the grammar cannot be loaded
    pub fn new() -> Option<Self> {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
            tracing::warn!("Failed to load Python grammar: {}", e);
            return None;
        }
        Some(Self {
            parser,
            state: ParsedSource::default(),
            calls: Vec::new(),
        })
    }

    fn walk(&mut self, node: Node, source: &[u8], parent: Option<usize>, decorators: Vec<String>) {
        match node.kind() {
            "decorated_definition" => {
                let mut names = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "decorator"
                        && let Some(name) = decorator_name(child, source)
                    {
                        names.push(name);
                    }
                }
                if let Some(definition) = node.child_by_field_name("definition") {
                    self.walk(definition, source, parent, names);
                }
                return;
            }
            "function_definition" | "class_definition" => {
                let idx = self.push_definition(node, source, parent, decorators);
                self.walk_children(node, source, idx.or(parent));
                return;
            }
            "import_statement" | "import_from_statement" => {
                self.state.imports.extend(imports_from_node(node, source));
                return;
            }
            "call" => {
                if let Some(function) = node.child_by_field_name("function")
                    && let Some(name) = call_name(function, source)
                {
                    self.calls.push(CallSite {
                        line: node.start_position().row + 1,
                        name,
                    });
                }
            }
            _ => {}
        }
        self.walk_children(node, source, parent);
    }

    fn walk_children(&mut self, node: Node, source: &[u8], parent: Option<usize>) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child, source, parent, Vec::new());
        }
    }

    fn push_definition(
        &mut self,
        node: Node,
        source: &[u8],
        parent: Option<usize>,
        decorators: Vec<String>,
    ) -> Option<usize> {
        let name = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(source).ok())?
            .to_string();

        let parent_is_class = parent
            .and_then(|idx| self.state.symbols.get(idx))
            .is_some_and(|p| p.kind == SymbolKind::Class);

        let kind = if node.kind() == "class_definition" {
            SymbolKind::Class
        } else if parent_is_class {
            SymbolKind::Method
        } else if is_async(node) {
            SymbolKind::AsyncFunction
        } else {
            SymbolKind::Function
        };

        let start = node.start_position();
        let end = node.end_position();
        let mut symbol = Symbol::new(name, kind, start.row + 1, end.row + 1);
        symbol.start_col = start.column;
        symbol.end_col = end.column;
        symbol.decorators = decorators;
        symbol.docstring = docstring(node, source);

        Some(self.state.push_symbol(symbol, parent))
    }
}

impl SourceParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&mut self, source: &str, path: &str) -> bool {
        self.state.reset(source);
        self.calls.clear();

        let Some(tree) = self.parser.parse(source, None) else {
            tracing::debug!("Python parser produced no tree for {}", path);
            return false;
        };

        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!("Syntax errors in {}, skipping symbol extraction", path);
            return false;
        }

        self.walk(root, source.as_bytes(), None, Vec::new());
        true
    }

    fn state(&self) -> &ParsedSource {
        &self.state
    }

    fn calls_in_symbol(&self, symbol: &Symbol) -> Vec<String> {
        self.calls
            .iter()
            .filter(|call| symbol.contains_line(call.line))
            .map(|call| call.name.clone())
            .collect()
    }
}

fn is_async(node: Node) -> bool {
    node.child(0).is_some_and(|first| first.kind() == "async")
}

fn node_text(node: Node, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().map(str::to_string)
}

/// `@name`, `@module.attr` and `@factory(...)` all reduce to the last name
fn decorator_name(decorator: Node, source: &[u8]) -> Option<String> {
    let expr = decorator.named_child(0)?;
    expression_name(expr, source)
}

fn expression_name(expr: Node, source: &[u8]) -> Option<String> {
    match expr.kind() {
        "identifier" => node_text(expr, source),
        "attribute" => node_text(expr.child_by_field_name("attribute")?, source),
        "call" => expression_name(expr.child_by_field_name("function")?, source),
        _ => None,
    }
}

fn call_name(function: Node, source: &[u8]) -> Option<String> {
    match function.kind() {
        "identifier" => node_text(function, source),
        "attribute" => node_text(function.child_by_field_name("attribute")?, source),
        _ => None,
    }
}

/// First statement of the body when it is a bare string literal
fn docstring(node: Node, source: &[u8]) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0)?;
    if string.kind() != "string" {
        return None;
    }
    let raw = string.utf8_text(source).ok()?;
    Some(clean_docstring(raw))
}

/// Strip prefixes and quotes, then remove the common indentation of continuation lines
fn clean_docstring(raw: &str) -> String {
    let body = raw.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    let body = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find(|q| body.starts_with(**q) && body.ends_with(**q) && body.len() >= 2 * q.len())
        .map(|q| &body[q.len()..body.len() - q.len()])
        .unwrap_or(body);

    let mut lines = body.lines();
    let first = lines.next().unwrap_or("").trim().to_string();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = vec![first];
    out.extend(
        rest.iter()
            .map(|l| l.get(indent..).unwrap_or("").trim_end().to_string()),
    );
    out.join("\n").trim().to_string()
}

/// Imports from an `import` or `from ... import` statement node
pub(crate) fn imports_from_node(node: Node, source: &[u8]) -> Vec<Import> {
    let line = node.start_position().row + 1;
    let mut imports = Vec::new();

    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let (module, alias) = match name.kind() {
                    "aliased_import" => (
                        name.child_by_field_name("name")
                            .and_then(|n| node_text(n, source)),
                        name.child_by_field_name("alias")
                            .and_then(|n| node_text(n, source)),
                    ),
                    _ => (node_text(name, source), None),
                };
                if let Some(module) = module {
                    let mut import = Import::new(module, line, Language::Python);
                    import.alias = alias;
                    imports.push(import);
                }
            }
        }
        "import_from_statement" => {
            let (module, level) = match node.child_by_field_name("module_name") {
                Some(m) if m.kind() == "relative_import" => {
                    let mut level = 0;
                    let mut module = String::new();
                    let mut cursor = m.walk();
                    for part in m.named_children(&mut cursor) {
                        match part.kind() {
                            "import_prefix" => {
                                level = node_text(part, source)
                                    .map(|t| t.chars().filter(|c| *c == '.').count())
                                    .unwrap_or(0);
                            }
                            "dotted_name" => module = node_text(part, source).unwrap_or_default(),
                            _ => {}
                        }
                    }
                    (module, level)
                }
                Some(m) => (node_text(m, source).unwrap_or_default(), 0),
                None => (String::new(), 0),
            };

            let mut names = Vec::new();
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let text = match name.kind() {
                    "aliased_import" => name
                        .child_by_field_name("name")
                        .and_then(|n| node_text(n, source)),
                    _ => node_text(name, source),
                };
                names.extend(text);
            }
            let mut cursor = node.walk();
            if node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "wildcard_import")
            {
                names.push("*".to_string());
            }

            let mut import = Import::new(module, line, Language::Python);
            import.imported_names = names;
            import.is_relative = level > 0;
            import.relative_level = level;
            imports.push(import);
        }
        _ => {}
    }

    imports
}
