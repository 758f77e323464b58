//! Core data model shared by the parsers, the traceback matcher and the context builder

use crate::analysis::error_analyzer::ErrorAnalysis;
use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a code symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    AsyncFunction,
    Method,
    Class,
}

impl SymbolKind {
    /// Functions, async functions and methods
    pub fn is_callable(&self) -> bool {
        !matches!(self, SymbolKind::Class)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::AsyncFunction => "async_function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function, method or class extracted from one file
///
/// Symbols live in a flat per-file vector; `parent` indexes into that same vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    /// 0-based
    pub start_col: usize,
    /// 0-based
    pub end_col: usize,
    pub parent: Option<usize>,
    /// Name of the parent symbol, kept so the symbol reads on its own once cloned out
    pub parent_name: Option<String>,
    pub parent_kind: Option<SymbolKind>,
    #[serde(default)]
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, start_line: usize, end_line: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            start_line,
            end_line: end_line.max(start_line),
            start_col: 0,
            end_col: 0,
            parent: None,
            parent_name: None,
            parent_kind: None,
            decorators: Vec::new(),
            docstring: None,
        }
    }

    /// Whether `line` falls inside this symbol's span
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Number of lines spanned minus one
    pub fn span(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }

    /// `Parent.name` when nested, otherwise just the name
    pub fn qualified_name(&self) -> String {
        match &self.parent_name {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }

    /// Name of the enclosing class, if the parent is one
    pub fn class_name(&self) -> Option<&str> {
        match (self.parent_kind, &self.parent_name) {
            (Some(SymbolKind::Class), Some(name)) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// A syntax-level import statement, optionally resolved to a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub module_name: String,
    pub alias: Option<String>,
    #[serde(default)]
    pub imported_names: Vec<String>,
    pub is_relative: bool,
    /// Number of leading dots for dotted-relative imports
    pub relative_level: usize,
    pub line_number: usize,
    pub resolved_path: Option<String>,
    pub language: Language,
}

impl Import {
    pub fn new(module_name: impl Into<String>, line_number: usize, language: Language) -> Self {
        Self {
            module_name: module_name.into(),
            alias: None,
            imported_names: Vec::new(),
            is_relative: false,
            relative_level: 0,
            line_number,
            resolved_path: None,
            language,
        }
    }

    /// Human-readable rendering of the import
    pub fn full_import_string(&self) -> String {
        let prefix = ".".repeat(self.relative_level);
        if !self.imported_names.is_empty() {
            format!(
                "from {}{} import {}",
                prefix,
                self.module_name,
                self.imported_names.join(", ")
            )
        } else if let Some(alias) = &self.alias {
            format!("import {}{} as {}", prefix, self.module_name, alias)
        } else {
            format!("import {}{}", prefix, self.module_name)
        }
    }
}

/// One location in a stack trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub filepath: String,
    pub line_number: usize,
    pub function_name: Option<String>,
    pub column_number: Option<usize>,
    pub language: Language,
}

/// An ordered stack of frames (outer to inner) plus the error it ended in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTraceback {
    pub frames: Vec<TraceFrame>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub language: Language,
    pub raw: String,
}

impl ParsedTraceback {
    /// The innermost frame, where the error surfaced
    pub fn primary_frame(&self) -> Option<&TraceFrame> {
        self.frames.last()
    }

    /// Unique frame paths, in frame order
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for frame in &self.frames {
            if !files.contains(&frame.filepath) {
                files.push(frame.filepath.clone());
            }
        }
        files
    }
}

/// How a FileContext's content was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Full symbol from the native parser
    Ast,
    /// Full symbol from a grammar-based parser
    Treesitter,
    /// Fixed line window
    Lines,
    /// File could not be found or read
    Missing,
    /// Synthetic context built from the error text itself
    ErrorAnalysis,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Ast => "ast",
            ContextType::Treesitter => "treesitter",
            ContextType::Lines => "lines",
            ContextType::Missing => "missing",
            ContextType::ErrorAnalysis => "error_analysis",
        }
    }
}

/// One (file, line) extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContext {
    pub filepath: String,
    pub line_number: usize,
    pub context_type: ContextType,
    pub content: String,
    pub function_name: Option<String>,
    pub class_name: Option<String>,
    pub language: Language,
    #[serde(default)]
    pub imports: Vec<Import>,
    pub symbol: Option<Symbol>,
    #[serde(skip)]
    pub raw_source: Option<String>,
}

impl FileContext {
    pub fn new(
        filepath: impl Into<String>,
        line_number: usize,
        context_type: ContextType,
        content: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            filepath: filepath.into(),
            line_number,
            context_type,
            content: content.into(),
            function_name: None,
            class_name: None,
            language,
            imports: Vec::new(),
            symbol: None,
            raw_source: None,
        }
    }

    /// Placeholder for a file that could not be found or read
    pub fn missing(filepath: impl Into<String>, line_number: usize, reason: impl Into<String>, language: Language) -> Self {
        Self::new(filepath, line_number, ContextType::Missing, reason, language)
    }

    pub fn is_missing(&self) -> bool {
        self.context_type == ContextType::Missing
    }
}

/// Material from files around the error site, for root-cause tracing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamContext {
    pub file_contexts: Vec<FileContext>,
    pub call_chain: Vec<String>,
    pub relevant_definitions: BTreeMap<String, String>,
    pub dependency_summary: String,
}

impl UpstreamContext {
    pub fn is_empty(&self) -> bool {
        self.file_contexts.is_empty() && self.call_chain.is_empty()
    }

    /// Render the upstream material as prompt sections
    pub fn to_prompt_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.call_chain.is_empty() {
            parts.push("## CALL CHAIN".to_string());
            parts.push(self.call_chain.join(" -> "));
            parts.push(String::new());
        }

        if !self.relevant_definitions.is_empty() {
            parts.push("## RELEVANT DEFINITIONS".to_string());
            for (name, code) in &self.relevant_definitions {
                parts.push(format!("### {}", name));
                parts.push("```".to_string());
                parts.push(code.clone());
                parts.push("```".to_string());
            }
            parts.push(String::new());
        }

        if !self.file_contexts.is_empty() {
            parts.push("## UPSTREAM FILE CONTEXTS".to_string());
            for ctx in &self.file_contexts {
                parts.push(format!("### {} (line {})", ctx.filepath, ctx.line_number));
                parts.push("```".to_string());
                parts.push(ctx.content.clone());
                parts.push("```".to_string());
            }
            parts.push(String::new());
        }

        if !self.dependency_summary.is_empty() {
            parts.push("## DEPENDENCY SUMMARY".to_string());
            parts.push(self.dependency_summary.clone());
        }

        parts.join("\n")
    }
}

/// Everything gathered about one failure, ready to be rendered for a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub primary_context: FileContext,
    pub traceback_contexts: Vec<FileContext>,
    pub upstream_context: Option<UpstreamContext>,
    pub parsed_traceback: ParsedTraceback,
    pub error_analysis: Option<ErrorAnalysis>,
    pub project_root: String,
}
