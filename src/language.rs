//! Programming language detection from file extensions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Languages understood by the traceback matcher and parsers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Unknown,
}

impl Language {
    /// Every known language, in detection order
    pub const ALL: [Language; 11] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::CSharp,
        Language::Ruby,
        Language::Php,
    ];

    /// Detect language from a file extension (with or without the leading dot)
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            _ => Language::Unknown,
        }
    }

    /// Detect language from a file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Parse a user-supplied language name such as "python" or "c++"
    pub fn from_name(name: &str) -> Option<Self> {
        let lang = match name.trim().to_lowercase().as_str() {
            "python" | "py" => Language::Python,
            "javascript" | "js" | "node" => Language::JavaScript,
            "typescript" | "ts" => Language::TypeScript,
            "go" | "golang" => Language::Go,
            "rust" | "rs" => Language::Rust,
            "java" | "kotlin" => Language::Java,
            "c" => Language::C,
            "cpp" | "c++" => Language::Cpp,
            "csharp" | "c#" | "cs" => Language::CSharp,
            "ruby" | "rb" => Language::Ruby,
            "php" => Language::Php,
            "unknown" => Language::Unknown,
            _ => return None,
        };
        Some(lang)
    }

    /// Lowercase identifier used in prompts and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Language::Unknown)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_python() {
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension(".pyi"), Language::Python);
        assert_eq!(Language::from_extension("PYW"), Language::Python);
    }

    #[test]
    fn test_from_extension_javascript_family() {
        for ext in ["js", "mjs", "cjs", "jsx"] {
            assert_eq!(Language::from_extension(ext), Language::JavaScript);
        }
        for ext in ["ts", "tsx", "mts", "cts"] {
            assert_eq!(Language::from_extension(ext), Language::TypeScript);
        }
    }

    #[test]
    fn test_from_extension_c_family() {
        assert_eq!(Language::from_extension("h"), Language::C);
        assert_eq!(Language::from_extension("hpp"), Language::Cpp);
        assert_eq!(Language::from_extension("cc"), Language::Cpp);
        assert_eq!(Language::from_extension("cs"), Language::CSharp);
    }

    #[test]
    fn test_from_extension_unknown() {
        assert_eq!(Language::from_extension("md"), Language::Unknown);
        assert_eq!(Language::from_extension(""), Language::Unknown);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("src/main.rs"), Language::Rust);
        assert_eq!(Language::from_path("/app/handlers/user.go"), Language::Go);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Language::from_name("Python"), Some(Language::Python));
        assert_eq!(Language::from_name("c++"), Some(Language::Cpp));
        assert_eq!(Language::from_name("cobol"), None);
    }

    #[test]
    fn test_display_and_serde_agree() {
        for lang in Language::ALL {
            let json = serde_json::to_string(&lang).unwrap();
            assert_eq!(json, format!("\"{}\"", lang));
        }
    }
}
