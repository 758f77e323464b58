//! Symbol extraction: a common parser interface with a native Python parser and a
//! grammar-table parser shared by the remaining languages.

pub mod grammar;
pub mod python;
pub mod registry;

pub use grammar::GrammarParser;
pub use python::PythonParser;
pub use registry::ParserRegistry;

use crate::language::Language;
use crate::types::{Import, Symbol};

/// Render `lines[start..=end]` (1-based, clamped) as a numbered block
///
/// The highlighted line gets a ` >> ` marker, every other line four spaces.
pub fn format_snippet<S: AsRef<str>>(
    lines: &[S],
    start: usize,
    end: usize,
    highlight: Option<usize>,
) -> String {
    let start = start.max(1);
    let end = end.min(lines.len());
    if start > end {
        return String::new();
    }

    (start..=end)
        .map(|num| {
            let marker = if Some(num) == highlight { " >> " } else { "    " };
            format!("{}{:4} | {}", marker, num, lines[num - 1].as_ref())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tightest symbol containing `line`; ties keep the first one found
pub fn tightest_enclosing(symbols: &[Symbol], line: usize) -> Option<&Symbol> {
    let mut best: Option<&Symbol> = None;
    for symbol in symbols.iter().filter(|s| s.contains_line(line)) {
        match best {
            Some(current) if symbol.span() >= current.span() => {}
            _ => best = Some(symbol),
        }
    }
    best
}

/// Per-parse state shared by every parser implementation
#[derive(Debug, Default, Clone)]
pub struct ParsedSource {
    pub lines: Vec<String>,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Import>,
}

impl ParsedSource {
    pub fn reset(&mut self, source: &str) {
        self.lines = source.lines().map(str::to_string).collect();
        self.symbols.clear();
        self.imports.clear();
    }

    /// Push a symbol under `parent`, filling in the parent's name and kind
    pub fn push_symbol(&mut self, mut symbol: Symbol, parent: Option<usize>) -> usize {
        if let Some(idx) = parent
            && let Some(p) = self.symbols.get(idx)
        {
            symbol.parent = Some(idx);
            symbol.parent_name = Some(p.name.clone());
            symbol.parent_kind = Some(p.kind);
        }
        self.symbols.push(symbol);
        self.symbols.len() - 1
    }
}

/// Common interface of every source parser
///
/// `parse` resets all state; results only describe the most recent call.
pub trait SourceParser {
    fn language(&self) -> Language;

    /// Parse `source`, returning false when the file could not be parsed
    fn parse(&mut self, source: &str, path: &str) -> bool;

    /// Per-parse state
    fn state(&self) -> &ParsedSource;

    /// Flat symbol list in depth-first order
    fn symbols(&self) -> &[Symbol] {
        &self.state().symbols
    }

    /// Syntax-level imports, unresolved
    fn extract_imports(&self) -> Vec<Import> {
        self.state().imports.clone()
    }

    fn find_enclosing_symbol(&self, line: usize) -> Option<&Symbol> {
        tightest_enclosing(self.symbols(), line)
    }

    fn format_snippet(&self, start: usize, end: usize, highlight: Option<usize>) -> String {
        format_snippet(&self.state().lines, start, end, highlight)
    }

    /// Lines `start..=end` (1-based, clamped)
    fn line_range(&self, start: usize, end: usize) -> Vec<&str> {
        let lines = &self.state().lines;
        let start = start.max(1);
        let end = end.min(lines.len());
        if start > end {
            return Vec::new();
        }
        lines[start - 1..end].iter().map(String::as_str).collect()
    }

    /// Source of a symbol, including any decorator lines above it
    fn extract_symbol_code(&self, symbol: &Symbol) -> String {
        let start = symbol.start_line.saturating_sub(symbol.decorators.len());
        self.line_range(start, symbol.end_line).join("\n")
    }

    /// Names of functions called inside the symbol
    fn calls_in_symbol(&self, _symbol: &Symbol) -> Vec<String> {
        Vec::new()
    }
}

/// The closed set of parser implementations
pub enum LanguageParser {
    Native(PythonParser),
    Grammar(GrammarParser),
}

impl SourceParser for LanguageParser {
    fn language(&self) -> Language {
        match self {
            LanguageParser::Native(p) => p.language(),
            LanguageParser::Grammar(p) => p.language(),
        }
    }

    fn parse(&mut self, source: &str, path: &str) -> bool {
        match self {
            LanguageParser::Native(p) => p.parse(source, path),
            LanguageParser::Grammar(p) => p.parse(source, path),
        }
    }

    fn state(&self) -> &ParsedSource {
        match self {
            LanguageParser::Native(p) => p.state(),
            LanguageParser::Grammar(p) => p.state(),
        }
    }

    fn calls_in_symbol(&self, symbol: &Symbol) -> Vec<String> {
        match self {
            LanguageParser::Native(p) => p.calls_in_symbol(symbol),
            LanguageParser::Grammar(p) => p.calls_in_symbol(symbol),
        }
    }
}

impl LanguageParser {
    /// True for the native parser, whose extractions are tagged `ast`
    pub fn is_native(&self) -> bool {
        matches!(self, LanguageParser::Native(_))
    }
}
