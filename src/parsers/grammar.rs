//! Grammar-table parser shared by every non-Python language.
//!
//! Each language is described by three lists of tree-sitter node kinds: the ones that
//! define functions, the ones that define classes (or class-like containers), and the
//! ones that carry imports. The walk itself is the same for every language.

use super::{ParsedSource, SourceParser};
use crate::language::Language;
use crate::types::{Import, Symbol, SymbolKind};
use tree_sitter::{Node, Parser};

/// Node kinds that produce symbols and imports for one language
#[derive(Debug, Clone, Copy)]
pub struct NodeTable {
    pub functions: &'static [&'static str],
    pub classes: &'static [&'static str],
    pub imports: &'static [&'static str],
}

const JS_FUNCTIONS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
];

const TS_FUNCTIONS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
    "method_signature",
];

/// Function-like kinds that are methods even without an enclosing class symbol
const METHOD_KINDS: &[&str] = &[
    "method_definition",
    "method_signature",
    "method_declaration",
    "method",
    "singleton_method",
];

/// Kinds accepted as a symbol name when no `name` field exists
const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "property_identifier",
    "field_identifier",
    "constant",
    "name",
];

/// Node table for a language, or None if the grammar parser does not handle it
pub fn node_table(language: Language) -> Option<NodeTable> {
    let table = match language {
        Language::JavaScript => NodeTable {
            functions: JS_FUNCTIONS,
            classes: &["class_declaration", "class"],
            imports: &["import_statement"],
        },
        Language::TypeScript => NodeTable {
            functions: TS_FUNCTIONS,
            classes: &["class_declaration", "interface_declaration"],
            imports: &["import_statement"],
        },
        Language::Go => NodeTable {
            functions: &["function_declaration", "method_declaration"],
            classes: &["type_declaration"],
            imports: &["import_spec"],
        },
        Language::Rust => NodeTable {
            functions: &["function_item"],
            classes: &["struct_item", "enum_item", "impl_item", "trait_item"],
            imports: &["use_declaration"],
        },
        Language::Java => NodeTable {
            functions: &["method_declaration", "constructor_declaration"],
            classes: &[
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            imports: &["import_declaration"],
        },
        Language::C => NodeTable {
            functions: &["function_definition"],
            classes: &["struct_specifier"],
            imports: &["preproc_include"],
        },
        Language::Cpp => NodeTable {
            functions: &["function_definition"],
            classes: &["class_specifier", "struct_specifier"],
            imports: &["preproc_include"],
        },
        Language::CSharp => NodeTable {
            functions: &["method_declaration", "constructor_declaration"],
            classes: &[
                "class_declaration",
                "interface_declaration",
                "struct_declaration",
            ],
            imports: &["using_directive"],
        },
        Language::Ruby => NodeTable {
            functions: &["method", "singleton_method"],
            classes: &["class", "module"],
            imports: &[],
        },
        Language::Php => NodeTable {
            functions: &["function_definition", "method_declaration"],
            classes: &["class_declaration", "interface_declaration"],
            imports: &["namespace_use_declaration"],
        },
        Language::Python | Language::Unknown => return None,
    };
    Some(table)
}

/// Tree-sitter grammar for a language; TypeScript picks TSX for `.tsx` files
fn grammar(language: Language, tsx: bool) -> Option<tree_sitter::Language> {
    let grammar = match language {
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript if tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        Language::Python | Language::Unknown => return None,
    };
    Some(grammar)
}

/// Error-tolerant parser driven by a [`NodeTable`]
pub struct GrammarParser {
    parser: Parser,
    language: Language,
    table: NodeTable,
    tsx: bool,
    state: ParsedSource,
}

impl GrammarParser {
    /// Create a parser for `language`, or None if it has no table or its grammar fails to load
    pub fn new(language: Language) -> Option<Self> {
        let table = node_table(language)?;
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&grammar(language, false)?) {
            tracing::warn!("Failed to load {} grammar: {}", language, e);
            return None;
        }
        Some(Self {
            parser,
            language,
            table,
            tsx: false,
            state: ParsedSource::default(),
        })
    }

    fn select_grammar(&mut self, path: &str) -> bool {
        if self.language != Language::TypeScript {
            return true;
        }
        let want_tsx = path.to_lowercase().ends_with(".tsx");
        if want_tsx == self.tsx {
            return true;
        }
        let Some(grammar) = grammar(self.language, want_tsx) else {
            return false;
        };
        match self.parser.set_language(&grammar) {
            Ok(()) => {
                self.tsx = want_tsx;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to switch TypeScript grammar for {}: {}", path, e);
                false
            }
        }
    }

    fn walk(&mut self, node: Node, source: &[u8], parent: Option<usize>) {
        // Keyword tokens such as `class` or `module` share names with real nodes
        if !node.is_named() {
            return;
        }

        let kind = node.kind();
        if self.table.imports.contains(&kind) {
            self.state
                .imports
                .extend(imports_from_node(self.language, node, source));
            return;
        }

        if matches!(self.language, Language::JavaScript | Language::TypeScript)
            && kind == "call_expression"
            && let Some(import) = require_import(self.language, node, source)
        {
            self.state.imports.push(import);
        }

        let is_function = self.table.functions.contains(&kind);
        let is_class = self.table.classes.contains(&kind);

        let mut next_parent = parent;
        if (is_function || is_class)
            && let Some(name) = symbol_name(node, source)
        {
            let kind = self.symbol_kind(node, parent, is_class, source);
            let start = node.start_position();
            let end = node.end_position();
            let mut symbol = Symbol::new(name, kind, start.row + 1, end.row + 1);
            symbol.start_col = start.column;
            symbol.end_col = end.column;
            next_parent = Some(self.state.push_symbol(symbol, parent));
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child, source, next_parent);
        }
    }

    fn symbol_kind(
        &self,
        node: Node,
        parent: Option<usize>,
        is_class: bool,
        source: &[u8],
    ) -> SymbolKind {
        if is_class {
            return SymbolKind::Class;
        }
        let inside_class = parent
            .and_then(|idx| self.state.symbols.get(idx))
            .is_some_and(|p| p.kind == SymbolKind::Class);
        if inside_class || METHOD_KINDS.contains(&node.kind()) {
            SymbolKind::Method
        } else if is_async(node, source) {
            SymbolKind::AsyncFunction
        } else {
            SymbolKind::Function
        }
    }
}

impl SourceParser for GrammarParser {
    fn language(&self) -> Language {
        self.language
    }

    fn parse(&mut self, source: &str, path: &str) -> bool {
        self.state.reset(source);
        if !self.select_grammar(path) {
            return false;
        }

        let Some(tree) = self.parser.parse(source, None) else {
            tracing::debug!("{} parser produced no tree for {}", self.language, path);
            return false;
        };

        self.walk(tree.root_node(), source.as_bytes(), None);
        true
    }

    fn state(&self) -> &ParsedSource {
        &self.state
    }
}

fn text(node: Node, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().map(str::to_string)
}

fn unquote(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '<' | '>'))
        .to_string()
}

fn is_async(node: Node, source: &[u8]) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| match child.kind() {
        "async" => true,
        "function_modifiers" => child
            .utf8_text(source)
            .is_ok_and(|t| t.contains("async")),
        _ => false,
    });
    found
}

fn symbol_name(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "impl_item" => return text(node.child_by_field_name("type")?, source),
        "type_declaration" => {
            let mut cursor = node.walk();
            let spec = node
                .named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "type_spec" | "type_alias"))?;
            return text(spec.child_by_field_name("name")?, source);
        }
        "function_definition" if node.child_by_field_name("declarator").is_some() => {
            return declarator_name(node.child_by_field_name("declarator")?, source, 0);
        }
        _ => {}
    }

    if let Some(name) = node.child_by_field_name("name") {
        return text(name, source);
    }

    if matches!(node.kind(), "arrow_function" | "function_expression") {
        let parent = node.parent()?;
        if parent.kind() == "variable_declarator" {
            return text(parent.child_by_field_name("name")?, source);
        }
        return None;
    }

    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| IDENTIFIER_KINDS.contains(&c.kind()))
        .and_then(|c| text(c, source));
    found
}

/// Follow a C/C++ declarator chain down to the declared name
fn declarator_name(node: Node, source: &[u8], depth: usize) -> Option<String> {
    if depth > 8 {
        return None;
    }
    match node.kind() {
        "identifier" | "field_identifier" | "destructor_name" | "operator_name" => {
            text(node, source)
        }
        "qualified_identifier" => match node.child_by_field_name("name") {
            Some(name) => declarator_name(name, source, depth + 1),
            None => text(node, source),
        },
        _ => {
            let next = node
                .child_by_field_name("declarator")
                .or_else(|| node.named_child(0))?;
            declarator_name(next, source, depth + 1)
        }
    }
}

/// `require('x')`, with the bound variable name as alias
fn require_import(language: Language, call: Node, source: &[u8]) -> Option<Import> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "identifier" || function.utf8_text(source).ok()? != "require" {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let target = arguments.named_child(0)?;
    if target.kind() != "string" {
        return None;
    }

    let module = unquote(target.utf8_text(source).ok()?);
    let mut import = Import::new(module.clone(), call.start_position().row + 1, language);
    import.is_relative = module.starts_with('.');
    if let Some(parent) = call.parent()
        && parent.kind() == "variable_declarator"
        && let Some(name) = parent.child_by_field_name("name")
        && name.kind() == "identifier"
    {
        import.alias = text(name, source);
    }
    Some(import)
}

fn imports_from_node(language: Language, node: Node, source: &[u8]) -> Vec<Import> {
    let line = node.start_position().row + 1;
    match language {
        Language::JavaScript | Language::TypeScript => {
            js_import(language, node, source, line).into_iter().collect()
        }
        Language::Go => go_import(node, source, line).into_iter().collect(),
        Language::Rust => node
            .child_by_field_name("argument")
            .and_then(|arg| arg.utf8_text(source).ok())
            .map(|path| vec![rust_use(path, line)])
            .unwrap_or_default(),
        Language::Java => java_import(node, source, line).into_iter().collect(),
        Language::C | Language::Cpp => c_include(language, node, source, line)
            .into_iter()
            .collect(),
        Language::CSharp => csharp_using(node, source, line).into_iter().collect(),
        Language::Php => php_use(node, source, line),
        _ => Vec::new(),
    }
}

fn js_import(language: Language, node: Node, source: &[u8], line: usize) -> Option<Import> {
    let module = unquote(node.child_by_field_name("source")?.utf8_text(source).ok()?);
    let mut import = Import::new(module.clone(), line, language);
    import.is_relative = module.starts_with('.');

    let mut cursor = node.walk();
    let clause = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "import_clause");
    if let Some(clause) = clause {
        let mut cursor = clause.walk();
        for part in clause.named_children(&mut cursor) {
            match part.kind() {
                "identifier" => import.imported_names.extend(text(part, source)),
                "namespace_import" => {
                    let mut inner = part.walk();
                    import.alias = part
                        .named_children(&mut inner)
                        .find(|c| c.kind() == "identifier")
                        .and_then(|c| text(c, source));
                }
                "named_imports" => {
                    let mut inner = part.walk();
                    for spec in part.named_children(&mut inner) {
                        if spec.kind() == "import_specifier"
                            && let Some(name) = spec.child_by_field_name("name")
                        {
                            import.imported_names.extend(text(name, source));
                        }
                    }
                }
                _ => {}
            }
        }
    }
    Some(import)
}

fn go_import(node: Node, source: &[u8], line: usize) -> Option<Import> {
    let path = unquote(node.child_by_field_name("path")?.utf8_text(source).ok()?);
    let mut import = Import::new(path, line, Language::Go);
    import.alias = node
        .child_by_field_name("name")
        .and_then(|n| text(n, source));
    Some(import)
}

/// Split a `use` argument such as `crate::a::{B, C as D}` or `super::x::*`
fn rust_use(path: &str, line: usize) -> Import {
    let path: String = path.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut import = Import::new(path.clone(), line, Language::Rust);

    if let Some((prefix, list)) = path.split_once("::{") {
        import.module_name = prefix.to_string();
        import.imported_names = list
            .trim_end_matches('}')
            .split(',')
            .map(|item| item.split(" as ").next().unwrap_or(item).trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
    } else if let Some(prefix) = path.strip_suffix("::*") {
        import.module_name = prefix.to_string();
        import.imported_names = vec!["*".to_string()];
    } else if let Some((module, alias)) = path.split_once(" as ") {
        import.module_name = module.trim().to_string();
        import.alias = Some(alias.trim().to_string());
    }

    let segments: Vec<&str> = import.module_name.split("::").collect();
    let supers = segments.iter().take_while(|s| **s == "super").count();
    if supers > 0 {
        import.is_relative = true;
        import.relative_level = supers;
    } else if segments.first() == Some(&"self") {
        import.is_relative = true;
    }
    import
}

fn java_import(node: Node, source: &[u8], line: usize) -> Option<Import> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    let path = children
        .iter()
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))?;
    let mut import = Import::new(text(*path, source)?, line, Language::Java);
    if children.iter().any(|c| c.kind() == "asterisk") {
        import.imported_names = vec!["*".to_string()];
    }
    Some(import)
}

fn c_include(language: Language, node: Node, source: &[u8], line: usize) -> Option<Import> {
    let path = node.child_by_field_name("path")?;
    let raw = path.utf8_text(source).ok()?;
    let mut import = Import::new(unquote(raw), line, language);
    import.is_relative = raw.trim_start().starts_with('"');
    Some(import)
}

fn csharp_using(node: Node, source: &[u8], line: usize) -> Option<Import> {
    let alias = node.child_by_field_name("name");
    let mut cursor = node.walk();
    let target = node
        .named_children(&mut cursor)
        .filter(|c| Some(c.id()) != alias.map(|a| a.id()))
        .last()?;
    let mut import = Import::new(text(target, source)?, line, Language::CSharp);
    import.alias = alias.and_then(|a| text(a, source));
    Some(import)
}

fn php_use(node: Node, source: &[u8], line: usize) -> Vec<Import> {
    let mut prefix: Option<String> = None;
    let mut clauses: Vec<Node> = Vec::new();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "namespace_name" => prefix = text(child, source),
            "namespace_use_clause" => clauses.push(child),
            "namespace_use_group" => {
                let mut inner = child.walk();
                clauses.extend(
                    child
                        .named_children(&mut inner)
                        .filter(|c| c.kind() == "namespace_use_clause"),
                );
            }
            _ => {}
        }
    }

    clauses
        .into_iter()
        .filter_map(|clause| {
            let mut cursor = clause.walk();
            let target = clause
                .named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "qualified_name" | "name"))?;
            let name = text(target, source)?;
            let module = match &prefix {
                Some(prefix) => format!("{}\\{}", prefix, name),
                None => name,
            };
            let mut import = Import::new(module, line, Language::Php);
            import.alias = clause
                .child_by_field_name("alias")
                .and_then(|a| text(a, source));
            Some(import)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(language: Language, path: &str, source: &str) -> GrammarParser {
        let mut parser = GrammarParser::new(language).unwrap();
        assert!(parser.parse(source, path));
        parser
    }

    fn kind_of(parser: &GrammarParser, name: &str) -> SymbolKind {
        parser
            .symbols()
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("symbol {} not found", name))
            .kind
    }

    #[test]
    fn test_no_table_for_python_or_unknown() {
        assert!(GrammarParser::new(Language::Python).is_none());
        assert!(GrammarParser::new(Language::Unknown).is_none());
    }

    #[test]
    fn test_javascript_symbols_and_imports() {
        let source = r#"import React, { useState as useS, useEffect } from 'react';
import * as utils from './utils';
const fs = require('fs');

async function loadUser(id) {
  return fetch(id);
}

const handler = async (req, res) => {
  res.send('ok');
};

class UserController {
  getUser(id) {
    return this.users[id];
  }
}
"#;
        let parser = parse(Language::JavaScript, "app.js", source);
        assert_eq!(kind_of(&parser, "loadUser"), SymbolKind::AsyncFunction);
        assert_eq!(kind_of(&parser, "handler"), SymbolKind::AsyncFunction);
        assert_eq!(kind_of(&parser, "UserController"), SymbolKind::Class);
        assert_eq!(kind_of(&parser, "getUser"), SymbolKind::Method);

        let line = source.lines().position(|l| l.contains("this.users")).unwrap() + 1;
        let symbol = parser.find_enclosing_symbol(line).unwrap();
        assert_eq!(symbol.qualified_name(), "UserController.getUser");

        let imports = parser.extract_imports();
        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].module_name, "react");
        assert_eq!(imports[0].imported_names, vec!["React", "useState", "useEffect"]);
        assert_eq!(imports[1].module_name, "./utils");
        assert!(imports[1].is_relative);
        assert_eq!(imports[1].alias.as_deref(), Some("utils"));
        assert_eq!(imports[2].module_name, "fs");
        assert_eq!(imports[2].alias.as_deref(), Some("fs"));
    }

    #[test]
    fn test_typescript_interface_and_tsx_switch() {
        let source = r#"interface Repo {
  find(id: string): User;
}

export class UserRepo implements Repo {
  find(id: string): User {
    return db.get(id);
  }
}
"#;
        let mut parser = parse(Language::TypeScript, "repo.ts", source);
        assert_eq!(kind_of(&parser, "Repo"), SymbolKind::Class);
        assert_eq!(kind_of(&parser, "UserRepo"), SymbolKind::Class);
        let methods: Vec<_> = parser
            .symbols()
            .iter()
            .filter(|s| s.name == "find")
            .collect();
        assert_eq!(methods.len(), 2);
        assert!(methods.iter().all(|m| m.kind == SymbolKind::Method));

        assert!(parser.parse("const App = () => <div>hi</div>;\n", "App.tsx"));
        assert_eq!(kind_of(&parser, "App"), SymbolKind::Function);
    }

    #[test]
    fn test_go_symbols_and_imports() {
        let source = r#"package main

import (
	"fmt"
	h "net/http"
)

type Server struct {
	addr string
}

func (s *Server) Start() error {
	return nil
}

func main() {
	fmt.Println("hi")
}
"#;
        let parser = parse(Language::Go, "main.go", source);
        assert_eq!(kind_of(&parser, "Server"), SymbolKind::Class);
        assert_eq!(kind_of(&parser, "Start"), SymbolKind::Method);
        assert_eq!(kind_of(&parser, "main"), SymbolKind::Function);

        let imports = parser.extract_imports();
        assert_eq!(imports[0].module_name, "fmt");
        assert_eq!(imports[1].module_name, "net/http");
        assert_eq!(imports[1].alias.as_deref(), Some("h"));
    }

    #[test]
    fn test_rust_symbols_and_uses() {
        let source = r#"use std::collections::HashMap;
use crate::config::{Config, ModelConfig as MC};
use super::helpers::*;

pub struct Engine {
    config: Config,
}

impl Engine {
    pub fn run(&self) -> usize {
        helper()
    }
}

async fn fetch() {}
"#;
        let parser = parse(Language::Rust, "src/engine.rs", source);
        assert_eq!(kind_of(&parser, "run"), SymbolKind::Method);
        assert_eq!(kind_of(&parser, "fetch"), SymbolKind::AsyncFunction);

        let line = source.lines().position(|l| l.contains("helper()")).unwrap() + 1;
        assert_eq!(parser.find_enclosing_symbol(line).unwrap().name, "run");

        let imports = parser.extract_imports();
        assert_eq!(imports[0].module_name, "std::collections::HashMap");
        assert_eq!(imports[1].module_name, "crate::config");
        assert_eq!(imports[1].imported_names, vec!["Config", "ModelConfig"]);
        assert_eq!(imports[2].module_name, "super::helpers");
        assert_eq!(imports[2].imported_names, vec!["*"]);
        assert!(imports[2].is_relative);
        assert_eq!(imports[2].relative_level, 1);
    }

    #[test]
    fn test_java_symbols_and_imports() {
        let source = r#"package com.example;

import java.util.List;
import com.example.service.*;

public class UserService {
    public UserService() {}

    public List<String> findAll() {
        return repo.findAll();
    }
}
"#;
        let parser = parse(Language::Java, "UserService.java", source);
        assert_eq!(kind_of(&parser, "findAll"), SymbolKind::Method);
        let ctor = parser
            .symbols()
            .iter()
            .find(|s| s.name == "UserService" && s.kind == SymbolKind::Method);
        assert!(ctor.is_some());

        let imports = parser.extract_imports();
        assert_eq!(imports[0].module_name, "java.util.List");
        assert_eq!(imports[1].module_name, "com.example.service");
        assert_eq!(imports[1].imported_names, vec!["*"]);
    }

    #[test]
    fn test_c_declarator_chain_and_includes() {
        let source = r#"#include <stdio.h>
#include "util.h"

struct point { int x; };

static int *make(int n) {
    return 0;
}
"#;
        let parser = parse(Language::C, "main.c", source);
        assert_eq!(kind_of(&parser, "point"), SymbolKind::Class);
        assert_eq!(kind_of(&parser, "make"), SymbolKind::Function);

        let imports = parser.extract_imports();
        assert_eq!(imports[0].module_name, "stdio.h");
        assert!(!imports[0].is_relative);
        assert_eq!(imports[1].module_name, "util.h");
        assert!(imports[1].is_relative);
    }

    #[test]
    fn test_cpp_qualified_definition() {
        let source = r#"class Widget {
public:
    void draw();
};

void Widget::draw() {
}
"#;
        let parser = parse(Language::Cpp, "widget.cpp", source);
        assert_eq!(kind_of(&parser, "Widget"), SymbolKind::Class);
        assert_eq!(kind_of(&parser, "draw"), SymbolKind::Function);
    }

    #[test]
    fn test_csharp_symbols_and_usings() {
        let source = r#"using System;
using Json = Newtonsoft.Json;

namespace App {
    public class Handler {
        public Handler() {}
        public async Task Run() {}
    }
}
"#;
        let parser = parse(Language::CSharp, "Handler.cs", source);
        assert_eq!(kind_of(&parser, "Run"), SymbolKind::Method);

        let imports = parser.extract_imports();
        assert_eq!(imports[0].module_name, "System");
        assert_eq!(imports[1].module_name, "Newtonsoft.Json");
        assert_eq!(imports[1].alias.as_deref(), Some("Json"));
    }

    #[test]
    fn test_ruby_module_and_keyword_tokens() {
        let source = r#"module Billing
  class Invoice
    def total
      items.sum
    end

    def self.build
      new
    end
  end
end
"#;
        let parser = parse(Language::Ruby, "invoice.rb", source);
        assert_eq!(kind_of(&parser, "Billing"), SymbolKind::Class);
        assert_eq!(kind_of(&parser, "Invoice"), SymbolKind::Class);
        assert_eq!(kind_of(&parser, "total"), SymbolKind::Method);
        assert_eq!(kind_of(&parser, "build"), SymbolKind::Method);
        assert_eq!(parser.symbols().len(), 4);
        assert!(parser.extract_imports().is_empty());
    }

    #[test]
    fn test_php_symbols_and_uses() {
        let source = r#"<?php
namespace App;

use App\Models\User;
use Illuminate\Support\Str as S;

function helper() {}

class UserController {
    public function show($id) {
        return User::find($id);
    }
}
"#;
        let parser = parse(Language::Php, "UserController.php", source);
        assert_eq!(kind_of(&parser, "helper"), SymbolKind::Function);
        assert_eq!(kind_of(&parser, "UserController"), SymbolKind::Class);
        assert_eq!(kind_of(&parser, "show"), SymbolKind::Method);

        let imports = parser.extract_imports();
        assert_eq!(imports[0].module_name, "App\\Models\\User");
        assert_eq!(imports[1].module_name, "Illuminate\\Support\\Str");
        assert_eq!(imports[1].alias.as_deref(), Some("S"));
    }

    #[test]
    fn test_broken_source_still_parses() {
        let mut parser = GrammarParser::new(Language::JavaScript).unwrap();
        assert!(parser.parse("function ok() { return 1; }\nfunction broken( {\n", "x.js"));
        assert!(parser.symbols().iter().any(|s| s.name == "ok"));
    }

    #[test]
    fn test_rust_use_parsing() {
        let import = rust_use("self::db as database", 3);
        assert_eq!(import.module_name, "self::db");
        assert_eq!(import.alias.as_deref(), Some("database"));
        assert!(import.is_relative);
        assert_eq!(import.relative_level, 0);

        let import = rust_use("super::super::util::{a, b}", 1);
        assert_eq!(import.relative_level, 2);
        assert_eq!(import.imported_names, vec!["a", "b"]);
    }
}
