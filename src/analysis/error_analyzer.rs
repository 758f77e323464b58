//! Error classification for logs without a usable traceback

use crate::analysis::project_scanner::{ProjectFile, ProjectScanner};
use crate::language::Language;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

/// Characters of the original message kept in an analysis
const MAX_MESSAGE_CHARS: usize = 500;

/// Keywords kept in an analysis
const MAX_KEYWORDS: usize = 20;

/// Files ranked per analysis
const RELEVANT_FILE_LIMIT: usize = 5;

/// Characters of each file included by [`ErrorAnalyzer::fix_context`]
const FIX_CONTEXT_FILE_CHARS: usize = 3000;

/// What an error message was classified as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    /// Coarse type: http, static, filesystem, import, runtime, syntax, database, config, connection or unknown
    pub error_type: String,
    /// Specific category such as `http_404` or `python_key`
    pub error_category: String,
    pub error_message: String,
    pub suggested_language: Option<Language>,
    pub relevant_files: Vec<ProjectFile>,
    pub affected_routes: Vec<String>,
    pub keywords: Vec<String>,
    pub confidence: f64,
}

impl ErrorAnalysis {
    pub fn to_context_string(&self) -> String {
        let mut lines = vec![
            "## ERROR ANALYSIS".to_string(),
            format!("Type: {}", self.error_type),
            format!("Category: {}", self.error_category),
            format!("Message: {}", self.error_message),
        ];

        if let Some(lang) = self.suggested_language {
            lines.push(format!("Language: {}", lang));
        }
        if !self.affected_routes.is_empty() {
            lines.push(format!("Affected Routes: {}", self.affected_routes.join(", ")));
        }
        if !self.relevant_files.is_empty() {
            lines.push("\n### Relevant Files:".to_string());
            for file in &self.relevant_files {
                lines.push(format!("- {}", file.path));
            }
        }

        lines.join("\n")
    }
}

struct Category {
    name: &'static str,
    error_type: &'static str,
    language: Option<Language>,
    patterns: Vec<(Regex, f64)>,
}

static CATEGORIES: LazyLock<Vec<Category>> = LazyLock::new(|| {
    use Language::{Go, JavaScript, Python, Rust};
    let table: &[(&str, &str, Option<Language>, &[(&str, f64)])] = &[
        (
            "http_404",
            "http",
            None,
            &[
                (r"cannot\s+(?:get|post|put|delete|patch)\s+[/\w]+", 0.9),
                (r"404\s+(?:not\s+found|\(not\s+found\))", 0.95),
                (r"get\s+http://.*\s+404", 0.95),
                (r"route\s+not\s+found", 0.9),
                (r"no\s+route\s+matches", 0.9),
            ],
        ),
        (
            "http_500",
            "http",
            None,
            &[
                (r"500\s+internal\s+server\s+error", 0.95),
                (r"internal\s+server\s+error", 0.8),
            ],
        ),
        (
            "http_400",
            "http",
            None,
            &[(r"400\s+bad\s+request", 0.95), (r"bad\s+request", 0.7)],
        ),
        (
            "http_401",
            "http",
            None,
            &[
                (r"401\s+unauthorized", 0.95),
                (r"authentication\s+required", 0.85),
                (r"not\s+authenticated", 0.8),
            ],
        ),
        (
            "http_403",
            "http",
            None,
            &[
                (r"403\s+forbidden", 0.95),
                (r"permission\s+denied", 0.8),
                (r"access\s+denied", 0.8),
            ],
        ),
        (
            "static_file",
            "static",
            None,
            &[
                (r"cannot\s+(?:get|find|serve)\s+.*\.(?:html|css|js|png|jpg|svg)", 0.9),
                (r"static\s+file\s+not\s+found", 0.9),
                (r"failed\s+to\s+load\s+resource", 0.85),
                (r"enoent.*index\.html", 0.95),
                (r"enoent.*public", 0.9),
                (r"enoent.*static", 0.9),
                (r"no\s+such\s+file.*\.html", 0.95),
                (r"no\s+such\s+file.*public", 0.9),
            ],
        ),
        (
            "file_not_found",
            "filesystem",
            None,
            &[
                (r"enoent", 0.9),
                (r"no\s+such\s+file\s+or\s+directory", 0.95),
                (r"file\s+not\s+found", 0.9),
                (r"cannot\s+find\s+(?:file|path)", 0.85),
            ],
        ),
        (
            "python_import",
            "import",
            Some(Python),
            &[
                (r"modulenotfounderror", 0.95),
                (r"importerror", 0.9),
                (r"no\s+module\s+named", 0.95),
                (r"cannot\s+import\s+name", 0.9),
            ],
        ),
        (
            "python_attribute",
            "runtime",
            Some(Python),
            &[(r"attributeerror", 0.95), (r"has\s+no\s+attribute", 0.9)],
        ),
        (
            "python_type",
            "runtime",
            Some(Python),
            &[(r"typeerror", 0.95), (r"expected\s+\w+\s+got\s+\w+", 0.8)],
        ),
        (
            "python_value",
            "runtime",
            Some(Python),
            &[(r"valueerror", 0.95), (r"invalid\s+value", 0.7)],
        ),
        ("python_key", "runtime", Some(Python), &[(r"keyerror", 0.95)]),
        (
            "python_index",
            "runtime",
            Some(Python),
            &[(r"indexerror", 0.95), (r"list\s+index\s+out\s+of\s+range", 0.95)],
        ),
        (
            "python_name",
            "runtime",
            Some(Python),
            &[
                (r"nameerror", 0.95),
                (r#"name\s+['"]?\w+['"]?\s+is\s+not\s+defined"#, 0.9),
            ],
        ),
        (
            "python_syntax",
            "syntax",
            Some(Python),
            &[(r"syntaxerror", 0.95), (r"invalid\s+syntax", 0.9)],
        ),
        (
            "js_reference",
            "runtime",
            Some(JavaScript),
            &[(r"referenceerror", 0.95), (r"is\s+not\s+defined", 0.8)],
        ),
        (
            "js_type",
            "runtime",
            Some(JavaScript),
            &[
                (r"typeerror.*undefined", 0.9),
                (r"cannot\s+read\s+propert", 0.9),
                (r"is\s+not\s+a\s+function", 0.9),
            ],
        ),
        (
            "js_syntax",
            "syntax",
            Some(JavaScript),
            &[(r"syntaxerror.*javascript", 0.9), (r"unexpected\s+token", 0.85)],
        ),
        (
            "js_module",
            "import",
            Some(JavaScript),
            &[(r"cannot\s+find\s+module", 0.95), (r"module\s+not\s+found", 0.9)],
        ),
        (
            "go_panic",
            "runtime",
            Some(Go),
            &[(r"panic:", 0.95), (r"runtime\s+error:", 0.9)],
        ),
        (
            "go_nil",
            "runtime",
            Some(Go),
            &[(r"nil\s+pointer", 0.95), (r"invalid\s+memory\s+address", 0.9)],
        ),
        (
            "rust_panic",
            "runtime",
            Some(Rust),
            &[
                (r"thread\s+.*\s+panicked", 0.95),
                (r"called\s+`option::unwrap\(\)`", 0.9),
            ],
        ),
        (
            "database",
            "database",
            None,
            &[
                (r"database\s+error", 0.85),
                (r"sql\s+error", 0.9),
                (r"connection\s+refused.*(?:5432|3306|27017)", 0.9),
                (r"operationalerror.*database", 0.9),
            ],
        ),
        (
            "config",
            "config",
            None,
            &[
                (r"api\s*key\s+(?:not\s+(?:set|found|valid)|invalid)", 0.9),
                (r"missing\s+(?:env|environment)\s+variable", 0.9),
                (r"configuration\s+error", 0.85),
                (r"\.env\s+(?:not\s+found|missing)", 0.9),
            ],
        ),
        (
            "connection",
            "connection",
            None,
            &[
                (r"connection\s+refused", 0.9),
                (r"econnrefused", 0.95),
                (r"connection\s+timed?\s*out", 0.9),
                (r"network\s+error", 0.8),
            ],
        ),
    ];

    table
        .iter()
        .map(|(name, error_type, language, patterns)| Category {
            name,
            error_type,
            language: *language,
            patterns: patterns
                .iter()
                .map(|(p, conf)| (Regex::new(p).unwrap(), *conf))
                .collect(),
        })
        .collect()
});

static ROUTE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"cannot\s+(?:get|post|put|delete|patch)\s+([/\w\-\.]+)",
        r"(?:get|post|put|delete|patch)\s+([/\w\-\.]+)\s+(?:404|failed)",
        r#"route\s+['"]?([/\w\-\.]+)['"]?"#,
        r#"path\s+['"]?([/\w\-\.]+)['"]?"#,
    ]
    .iter()
    .map(|p| RegexBuilder::new(p).case_insensitive(true).build().unwrap())
    .collect()
});

static KEYWORD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"['"]([^'"]{2,30})['"]"#,
        r"\b([A-Z][a-z]+(?:[A-Z][a-z]+)+)\b",
        r"\b([a-z]+(?:_[a-z]+)+)\b",
        r"([\w\-]+\.(?:py|js|ts|go|rs|java))",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Classifies error text and, with a scanner attached, ranks project files against it
pub struct ErrorAnalyzer {
    scanner: Option<Arc<ProjectScanner>>,
    file_limit: usize,
}

impl Default for ErrorAnalyzer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ErrorAnalyzer {
    pub fn new(scanner: Option<Arc<ProjectScanner>>) -> Self {
        Self {
            scanner,
            file_limit: RELEVANT_FILE_LIMIT,
        }
    }

    /// Number of ranked files kept per analysis
    pub fn with_file_limit(mut self, limit: usize) -> Self {
        self.file_limit = limit;
        self
    }

    pub fn analyze(&self, error_message: &str) -> ErrorAnalysis {
        let (category, confidence) = detect_category(&error_message.to_lowercase());

        let mut suggested_language = category.and_then(|c| c.language);
        let mut relevant_files = Vec::new();
        if let Some(scanner) = &self.scanner {
            relevant_files = scanner.find_relevant_files(error_message, self.file_limit);
            if suggested_language.is_none() {
                let primary = scanner.scan().primary_language;
                suggested_language = (!primary.is_unknown()).then_some(primary);
            }
        }

        let analysis = ErrorAnalysis {
            error_type: category.map_or("unknown", |c| c.error_type).to_string(),
            error_category: category.map_or("unknown", |c| c.name).to_string(),
            error_message: error_message.chars().take(MAX_MESSAGE_CHARS).collect(),
            suggested_language,
            relevant_files,
            affected_routes: extract_routes(error_message),
            keywords: extract_keywords(error_message),
            confidence,
        };

        tracing::debug!(
            category = %analysis.error_category,
            confidence = analysis.confidence,
            relevant_files = analysis.relevant_files.len(),
            "Analyzed error"
        );
        analysis
    }

    /// Analysis summary followed by project structure and the top relevant files' contents
    pub fn fix_context(
        &self,
        error_message: &str,
        include_project_structure: bool,
        include_file_contents: bool,
        max_files: usize,
    ) -> String {
        let analysis = self.analyze(error_message);
        let mut parts = vec![analysis.to_context_string()];

        let Some(scanner) = &self.scanner else {
            return parts.join("\n");
        };

        if include_project_structure {
            parts.push(String::new());
            parts.push(scanner.project_context(2));
        }

        if include_file_contents && !analysis.relevant_files.is_empty() {
            parts.push(String::new());
            parts.push("## RELEVANT SOURCE FILES".to_string());

            for file in analysis.relevant_files.iter().take(max_files) {
                let Some(mut content) = scanner.file_content(&file.path).filter(|c| !c.is_empty())
                else {
                    continue;
                };
                if content.chars().count() > FIX_CONTEXT_FILE_CHARS {
                    content = content.chars().take(FIX_CONTEXT_FILE_CHARS).collect::<String>()
                        + "\n... (truncated)";
                }
                parts.push(format!("\n### {}", file.path));
                parts.push(format!("```{}", file.language));
                parts.push(content);
                parts.push("```".to_string());
            }
        }

        parts.join("\n")
    }
}

/// Highest-confidence category; the earlier table entry wins ties
fn detect_category(lower: &str) -> (Option<&'static Category>, f64) {
    let mut best: Option<&'static Category> = None;
    let mut best_confidence = 0.0;

    for category in CATEGORIES.iter() {
        for (regex, confidence) in &category.patterns {
            if *confidence > best_confidence && regex.is_match(lower) {
                best = Some(category);
                best_confidence = *confidence;
            }
        }
    }
    (best, best_confidence)
}

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !out.iter().any(|v| v == value) {
        out.push(value.to_string());
    }
}

fn extract_routes(text: &str) -> Vec<String> {
    let mut routes = Vec::new();
    for regex in ROUTE_PATTERNS.iter() {
        for caps in regex.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                push_unique(&mut routes, m.as_str());
            }
        }
    }
    routes
}

fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    for regex in KEYWORD_PATTERNS.iter() {
        for caps in regex.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                push_unique(&mut keywords, m.as_str());
            }
        }
    }
    keywords.truncate(MAX_KEYWORDS);
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detects_http_404_with_route() {
        let analysis = ErrorAnalyzer::default().analyze("Cannot GET /api/users");
        assert_eq!(analysis.error_category, "http_404");
        assert_eq!(analysis.error_type, "http");
        assert_eq!(analysis.confidence, 0.9);
        assert_eq!(analysis.affected_routes, vec!["/api/users".to_string()]);
        assert_eq!(analysis.suggested_language, None);
    }

    #[test]
    fn test_highest_confidence_wins() {
        // "typeerror" (0.95) beats "cannot read propert" (0.9)
        let analysis = ErrorAnalyzer::default()
            .analyze("TypeError: Cannot read properties of undefined (reading 'id')");
        assert_eq!(analysis.error_category, "python_type");
        assert_eq!(analysis.confidence, 0.95);
    }

    #[test]
    fn test_tie_goes_to_earlier_category() {
        // "no such file or directory" is 0.95 for file_not_found and "panic:" is 0.95 later
        let analysis =
            ErrorAnalyzer::default().analyze("panic: open config.yaml: no such file or directory");
        assert_eq!(analysis.error_category, "file_not_found");
        assert_eq!(analysis.error_type, "filesystem");
    }

    #[test]
    fn test_language_from_category() {
        let analyzer = ErrorAnalyzer::default();
        assert_eq!(
            analyzer.analyze("KeyError: 'user_id'").suggested_language,
            Some(Language::Python)
        );
        assert_eq!(
            analyzer.analyze("Error: Cannot find module 'express'").suggested_language,
            Some(Language::JavaScript)
        );
        assert_eq!(
            analyzer
                .analyze("thread 'main' panicked at src/main.rs:3:5")
                .suggested_language,
            Some(Language::Rust)
        );
    }

    #[test]
    fn test_unknown_category() {
        let analysis = ErrorAnalyzer::default().analyze("everything is on fire");
        assert_eq!(analysis.error_category, "unknown");
        assert_eq!(analysis.error_type, "unknown");
        assert_eq!(analysis.confidence, 0.0);
    }

    #[test]
    fn test_keywords_deduped_and_capped() {
        let analysis = ErrorAnalyzer::default()
            .analyze("KeyError 'user_id' in load_user from views.py, load_user again");
        assert_eq!(
            analysis.keywords,
            vec!["user_id", "KeyError", "load_user", "views.py"]
        );

        let many: String = (0..30).map(|i| format!("'key{i:02}' ")).collect();
        assert_eq!(ErrorAnalyzer::default().analyze(&many).keywords.len(), MAX_KEYWORDS);
    }

    #[test]
    fn test_message_truncated() {
        let long = "x".repeat(2000);
        assert_eq!(
            ErrorAnalyzer::default().analyze(&long).error_message.len(),
            MAX_MESSAGE_CHARS
        );
    }

    #[test]
    fn test_scanner_supplies_files_and_language() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("server.go"), "package main\n").unwrap();
        fs::write(tmp.path().join("main.go"), "package main\n\nfunc main() {}\n").unwrap();

        let scanner = Arc::new(ProjectScanner::new(tmp.path(), 1000));
        let analyzer = ErrorAnalyzer::new(Some(scanner));
        let analysis = analyzer.analyze("connection refused while starting server");

        assert_eq!(analysis.error_category, "connection");
        assert_eq!(analysis.suggested_language, Some(Language::Go));
        assert!(!analysis.relevant_files.is_empty());

        let rendered = analysis.to_context_string();
        assert!(rendered.starts_with("## ERROR ANALYSIS\nType: connection\nCategory: connection"));
        assert!(rendered.contains("Language: go"));
        assert!(rendered.contains("### Relevant Files:"));
    }

    #[test]
    fn test_fix_context_includes_file_contents() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("app.py"), "print('hello')\n").unwrap();
        let scanner = Arc::new(ProjectScanner::new(tmp.path(), 1000));
        let analyzer = ErrorAnalyzer::new(Some(scanner));

        let context = analyzer.fix_context("NameError in app.py", true, true, 3);
        assert!(context.contains("## ERROR ANALYSIS"));
        assert!(context.contains("## PROJECT STRUCTURE"));
        assert!(context.contains("## RELEVANT SOURCE FILES\n\n### app.py\n```python\nprint('hello')"));

        let bare = ErrorAnalyzer::default().fix_context("NameError in app.py", true, true, 3);
        assert!(!bare.contains("## PROJECT STRUCTURE"));
    }
}
