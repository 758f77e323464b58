//! Per-file context extraction around an error line

use crate::language::Language;
use crate::parsers::{ParserRegistry, SourceParser, format_snippet};
use crate::types::{ContextType, FileContext};
use std::path::Path;

/// Upper bound on the half-width of a line window
const MAX_WINDOW_RADIUS: usize = 50;

/// Lines of buffer kept around a whole-symbol snippet
const SYMBOL_BUFFER_LINES: usize = 2;

/// Turns a (file, line) pair into a [`FileContext`]
///
/// A parser-derived snippet covering the whole enclosing symbol is preferred; when
/// the file does not parse or no symbol encloses the line, a fixed line window is
/// used instead. Parsers are reused across files.
pub struct ContextExtractor {
    registry: ParserRegistry,
    max_context_lines: usize,
}

impl ContextExtractor {
    pub fn new(max_context_lines: usize) -> Self {
        Self {
            registry: ParserRegistry::new(),
            max_context_lines,
        }
    }

    /// Half-width of the fallback line window
    pub fn window_radius(&self) -> usize {
        MAX_WINDOW_RADIUS.min(self.max_context_lines / 2)
    }

    /// Read `filepath` and extract around `line`; failures give a `missing` context
    pub fn extract(&mut self, filepath: &str, line: usize, language: Language) -> FileContext {
        let path = Path::new(filepath);
        if !path.is_file() {
            return FileContext::missing(
                filepath,
                line,
                format!("[File not found: {}]", filepath),
                language,
            );
        }

        match std::fs::read(path) {
            Ok(bytes) => {
                let source = String::from_utf8_lossy(&bytes);
                self.extract_source(filepath, &source, line, language)
            }
            Err(e) => {
                tracing::debug!("Failed to read {}: {}", filepath, e);
                FileContext::missing(
                    filepath,
                    line,
                    format!("[Error reading file: {}]", e),
                    language,
                )
            }
        }
    }

    /// Extract around `line` from already-loaded source text
    pub fn extract_source(
        &mut self,
        filepath: &str,
        source: &str,
        line: usize,
        language: Language,
    ) -> FileContext {
        let language = if language.is_unknown() {
            Language::from_path(filepath)
        } else {
            language
        };
        let radius = self.window_radius();

        let Some(parser) = self.registry.get_parser(language) else {
            return line_window(filepath, source, line, language, radius);
        };
        if !parser.parse(source, filepath) {
            tracing::debug!(file = filepath, "Parse failed, using line window");
            return line_window(filepath, source, line, language, radius);
        }

        let imports = parser.extract_imports();
        let Some(symbol) = parser.find_enclosing_symbol(line).cloned() else {
            let mut ctx = line_window(filepath, source, line, language, radius);
            ctx.imports = imports;
            return ctx;
        };

        let line_count = parser.state().lines.len();
        let start = symbol.start_line.saturating_sub(SYMBOL_BUFFER_LINES).max(1);
        let end = (symbol.end_line + SYMBOL_BUFFER_LINES).min(line_count);
        let content = parser.format_snippet(start, end, Some(line));
        let context_type = if parser.is_native() {
            ContextType::Ast
        } else {
            ContextType::Treesitter
        };

        let mut ctx = FileContext::new(filepath, line, context_type, content, language);
        ctx.function_name = symbol.kind.is_callable().then(|| symbol.name.clone());
        ctx.class_name = symbol.class_name().map(str::to_string);
        ctx.imports = imports;
        ctx.symbol = Some(symbol);
        ctx.raw_source = Some(source.to_string());
        ctx
    }
}

impl Default for ContextExtractor {
    fn default() -> Self {
        Self::new(crate::config::default_max_context_lines())
    }
}

/// `±radius` lines around `line`, tagged `lines`
pub fn line_window(
    filepath: &str,
    source: &str,
    line: usize,
    language: Language,
    radius: usize,
) -> FileContext {
    let lines: Vec<&str> = source.lines().collect();
    let content = format_snippet(
        &lines,
        line.saturating_sub(radius),
        line + radius,
        Some(line),
    );
    let mut ctx = FileContext::new(filepath, line, ContextType::Lines, content, language);
    ctx.raw_source = Some(source.to_string());
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = "import os\n\nclass Cart:\n    def total(self):\n        items = self.items\n        return sum(items)\n\n\nx = 1\n";

    #[test]
    fn test_python_symbol_snippet() {
        let mut extractor = ContextExtractor::default();
        let ctx = extractor.extract_source("cart.py", SOURCE, 5, Language::Python);

        assert_eq!(ctx.context_type, ContextType::Ast);
        assert_eq!(ctx.function_name.as_deref(), Some("total"));
        assert_eq!(ctx.class_name.as_deref(), Some("Cart"));
        assert_eq!(ctx.imports.len(), 1);
        assert!(ctx.content.starts_with("       2 | "));
        assert!(ctx.content.contains(" >>    5 |         items = self.items"));
        assert!(ctx.content.lines().last().unwrap().starts_with("       8 |"));
    }

    #[test]
    fn test_line_outside_symbols_uses_window() {
        let mut extractor = ContextExtractor::new(4);
        let ctx = extractor.extract_source("cart.py", SOURCE, 9, Language::Python);

        assert_eq!(ctx.context_type, ContextType::Lines);
        assert_eq!(ctx.function_name, None);
        assert_eq!(ctx.imports.len(), 1);
        assert_eq!(ctx.content.lines().count(), 3);
        assert!(ctx.content.contains(" >>    9 | x = 1"));
    }

    #[test]
    fn test_broken_source_falls_back_to_window() {
        let mut extractor = ContextExtractor::default();
        let ctx = extractor.extract_source("bad.py", "def broken(:\n    pass\n", 1, Language::Python);
        assert_eq!(ctx.context_type, ContextType::Lines);
        assert!(ctx.imports.is_empty());
    }

    #[test]
    fn test_grammar_language_tagged_treesitter() {
        let mut extractor = ContextExtractor::default();
        let source = "package main\n\nfunc run() {\n\tpanic(\"boom\")\n}\n";
        let ctx = extractor.extract_source("main.go", source, 4, Language::Unknown);
        assert_eq!(ctx.language, Language::Go);
        assert_eq!(ctx.context_type, ContextType::Treesitter);
        assert_eq!(ctx.function_name.as_deref(), Some("run"));
    }

    #[test]
    fn test_window_radius_is_capped() {
        assert_eq!(ContextExtractor::new(100).window_radius(), 50);
        assert_eq!(ContextExtractor::new(300).window_radius(), 50);
        assert_eq!(ContextExtractor::new(20).window_radius(), 10);
    }

    #[test]
    fn test_missing_file() {
        let mut extractor = ContextExtractor::default();
        let ctx = extractor.extract("/definitely/not/here.py", 3, Language::Python);
        assert!(ctx.is_missing());
        assert!(ctx.content.contains("File not found"));
    }

    #[test]
    fn test_extract_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cart.py");
        fs::write(&path, SOURCE).unwrap();

        let mut extractor = ContextExtractor::default();
        let ctx = extractor.extract(&path.display().to_string(), 6, Language::Python);
        assert_eq!(ctx.function_name.as_deref(), Some("total"));
        assert!(ctx.raw_source.is_some());
    }
}
