//! Per-language parser cache

use super::{GrammarParser, LanguageParser, PythonParser};
use crate::language::Language;
use std::collections::HashMap;
use std::path::Path;

/// Hands out one cached parser per language
///
/// Parsers hold per-parse state, so the registry is owned by a single analysis and
/// lent out mutably. Use [`ParserRegistry::create_parser`] for an isolated instance.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: HashMap<Language, LanguageParser>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh parser, or None for Unknown or a grammar that fails to load
    pub fn create_parser(language: Language) -> Option<LanguageParser> {
        match language {
            Language::Unknown => None,
            Language::Python => PythonParser::new().map(LanguageParser::Native),
            other => GrammarParser::new(other).map(LanguageParser::Grammar),
        }
    }

    /// Cached parser for `language`, created on first use
    pub fn get_parser(&mut self, language: Language) -> Option<&mut LanguageParser> {
        if !self.parsers.contains_key(&language) {
            let parser = Self::create_parser(language)?;
            self.parsers.insert(language, parser);
        }
        self.parsers.get_mut(&language)
    }

    /// Cached parser chosen by the file's extension
    pub fn get_parser_for_file(&mut self, path: impl AsRef<Path>) -> Option<&mut LanguageParser> {
        self.get_parser(Language::from_path(path))
    }

    /// Languages with a working parser
    pub fn supported_languages() -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|lang| Self::create_parser(*lang).is_some())
            .collect()
    }

    pub fn is_supported(language: Language) -> bool {
        !language.is_unknown() && Self::create_parser(language).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::SourceParser;

    #[test]
    fn test_unknown_has_no_parser() {
        let mut registry = ParserRegistry::new();
        assert!(registry.get_parser(Language::Unknown).is_none());
        assert!(registry.get_parser_for_file("README.md").is_none());
        assert!(!ParserRegistry::is_supported(Language::Unknown));
    }

    #[test]
    fn test_python_is_native() {
        let mut registry = ParserRegistry::new();
        let parser = registry.get_parser_for_file("app/main.py").unwrap();
        assert!(parser.is_native());
        assert_eq!(parser.language(), Language::Python);
    }

    #[test]
    fn test_every_known_language_supported() {
        let supported = ParserRegistry::supported_languages();
        assert_eq!(supported.len(), Language::ALL.len());
        for lang in Language::ALL {
            assert!(ParserRegistry::is_supported(lang), "{} unsupported", lang);
        }
    }

    #[test]
    fn test_cached_parser_is_reused() {
        let mut registry = ParserRegistry::new();
        {
            let parser = registry.get_parser(Language::Go).unwrap();
            assert!(parser.parse("package main\nfunc main() {}\n", "main.go"));
        }
        let parser = registry.get_parser(Language::Go).unwrap();
        assert_eq!(parser.symbols().len(), 1);
    }

    #[test]
    fn test_create_parser_is_isolated() {
        let mut registry = ParserRegistry::new();
        registry
            .get_parser(Language::Go)
            .unwrap()
            .parse("package main\nfunc main() {}\n", "main.go");

        let fresh = ParserRegistry::create_parser(Language::Go).unwrap();
        assert!(fresh.symbols().is_empty());
    }
}
