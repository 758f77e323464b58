//! Regex tables for stack frames, error headers and language markers

use crate::language::Language;
use regex::Regex;
use std::sync::LazyLock;

/// Capture-group positions (1-based) of each frame field in a pattern
#[derive(Debug, Clone, Copy)]
pub struct Fields {
    pub file: usize,
    pub line: usize,
    pub function: Option<usize>,
    pub column: Option<usize>,
}

const FILE_LINE: Fields = Fields { file: 1, line: 2, function: None, column: None };
const FILE_LINE_FUNC: Fields = Fields { file: 1, line: 2, function: Some(3), column: None };
const FILE_LINE_COL: Fields = Fields { file: 1, line: 2, function: None, column: Some(3) };
const FUNC_FILE_LINE: Fields = Fields { file: 2, line: 3, function: Some(1), column: None };
const FUNC_FILE_LINE_COL: Fields = Fields { file: 2, line: 3, function: Some(1), column: Some(4) };

/// One frame regex and how to read its groups
pub struct FramePattern {
    pub regex: Regex,
    pub fields: Fields,
}

fn frame(pattern: &str, fields: Fields) -> FramePattern {
    FramePattern {
        regex: Regex::new(pattern).unwrap(),
        fields,
    }
}

static PYTHON_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r#"File ["'](.+?)["'], line (\d+)(?:, in (\w+))?"#, FILE_LINE_FUNC),
        frame(r"^\s+(.+\.py):(\d+)", FILE_LINE),
    ]
});

static JAVASCRIPT_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r"at\s+(?:(\w+(?:\.\w+)*)\s+)?\(?(.+?):(\d+):(\d+)\)?", FUNC_FILE_LINE_COL),
        frame(r"^\s+at\s+(.+?):(\d+):(\d+)", FILE_LINE_COL),
        // Browser devtools format
        frame(r"(\w+)?@(.+?):(\d+):(\d+)", FUNC_FILE_LINE_COL),
    ]
});

static TYPESCRIPT_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r"at\s+(?:(\w+(?:\.\w+)*)\s+)?\(?(.+?\.tsx?):(\d+):(\d+)\)?", FUNC_FILE_LINE_COL),
        frame(r"^\s+at\s+(.+?\.tsx?):(\d+):(\d+)", FILE_LINE_COL),
    ]
});

static GO_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r"(?m)^\s*(.+\.go):(\d+)(?:\s+\+0x[0-9a-f]+)?", FILE_LINE),
        frame(r"(?m)[\t\s]+(/?\S+\.go):(\d+)", FILE_LINE),
        frame(r"panic.*at\s+(.+\.go):(\d+)", FILE_LINE),
    ]
});

static RUST_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r#"panicked at ['"]?(.+?\.rs)['"]?:(\d+):(\d+)"#, FILE_LINE_COL),
        frame(r"panicked at .+?, (.+?\.rs):(\d+):(\d+)", FILE_LINE_COL),
        frame(r"^\s*\d+:\s+.+\s+at\s+(.+?\.rs):(\d+):(\d+)", FILE_LINE_COL),
        frame(r"^\s+(\S+\.rs):(\d+)", FILE_LINE),
    ]
});

static JAVA_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r"at\s+([\w$.]+)\(([\w]+\.java):(\d+)\)", FUNC_FILE_LINE),
        // Kotlin frames show up in the same traces
        frame(r"at\s+([\w$.]+)\(([\w]+\.kt):(\d+)\)", FUNC_FILE_LINE),
    ]
});

static CSHARP_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r"at\s+([\w.]+)\(\)\s+in\s+(.+?\.cs):line\s+(\d+)", FUNC_FILE_LINE),
        frame(r"at\s+([\w.]+)\s+in\s+(.+?\.cs):(\d+)", FUNC_FILE_LINE),
    ]
});

static RUBY_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r"from (.+?\.rb):(\d+)(?::in [`'](\w+)')?", FILE_LINE_FUNC),
        frame(r"^\s*(.+?\.rb):(\d+):in [`'](\w+)'", FILE_LINE_FUNC),
    ]
});

static PHP_FRAMES: LazyLock<Vec<FramePattern>> = LazyLock::new(|| {
    vec![
        frame(r"in\s+(.+?\.php)\s+on\s+line\s+(\d+)", FILE_LINE),
        frame(r"(.+?\.php)\((\d+)\):\s*(\w+)?", FILE_LINE_FUNC),
    ]
});

static GENERIC_FRAMES: LazyLock<Vec<FramePattern>> =
    LazyLock::new(|| vec![frame(r"(?:at\s+)?(.+?):(\d+)(?::(\d+))?", FILE_LINE_COL)]);

/// Frame patterns for a language; languages without a table use the generic `path:line[:col]`
pub fn frame_patterns(language: Language) -> &'static [FramePattern] {
    match language {
        Language::Python => &PYTHON_FRAMES,
        Language::JavaScript => &JAVASCRIPT_FRAMES,
        Language::TypeScript => &TYPESCRIPT_FRAMES,
        Language::Go => &GO_FRAMES,
        Language::Rust => &RUST_FRAMES,
        Language::Java => &JAVA_FRAMES,
        Language::CSharp => &CSHARP_FRAMES,
        Language::Ruby => &RUBY_FRAMES,
        Language::Php => &PHP_FRAMES,
        Language::C | Language::Cpp | Language::Unknown => &GENERIC_FRAMES,
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

static PYTHON_ERRORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?m)^(\w+Error):\s*(.+)$",
        r"(?m)^(\w+Exception):\s*(.+)$",
        r"(?m)^(\w+Warning):\s*(.+)$",
    ])
});

static JAVASCRIPT_ERRORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r"(?m)^(\w*Error):\s*(.+)$", r"(?m)^Uncaught\s+(\w+):\s*(.+)$"])
});

static TYPESCRIPT_ERRORS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"(?m)^(\w*Error):\s*(.+)$", r"(?m)^TSError:\s*(.+)$"]));

static GO_ERRORS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"(?m)^panic:\s*(.+)$", r"(?m)^fatal error:\s*(.+)$"]));

static RUST_ERRORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"(?m)thread '[\w-]+' panicked at ['"](.+?)['"]"#,
        r"(?m)^error\[E\d+\]:\s*(.+)$",
    ])
});

static JAVA_ERRORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?m)^([\w.]+Exception):\s*(.+)$",
        r"(?m)^([\w.]+Error):\s*(.+)$",
        r"(?m)^Caused by:\s*([\w.]+):\s*(.+)$",
    ])
});

/// Tried for every language after its own table
pub static GENERIC_ERRORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?m)^Error:\s*(.+)$",
        r"(?m)^Exception:\s*(.+)$",
        r"(?m)^fatal:\s*(.+)$",
    ])
});

/// Error-header patterns for a language
pub fn error_patterns(language: Language) -> &'static [Regex] {
    match language {
        Language::Python => &PYTHON_ERRORS,
        Language::JavaScript => &JAVASCRIPT_ERRORS,
        Language::TypeScript => &TYPESCRIPT_ERRORS,
        Language::Go => &GO_ERRORS,
        Language::Rust => &RUST_ERRORS,
        Language::Java => &JAVA_ERRORS,
        _ => &[],
    }
}

/// Literal markers counted by language detection, in tie-breaking order
pub const LANGUAGE_MARKERS: &[(Language, &[&str])] = &[
    (
        Language::Python,
        &["File \"", "Traceback (most recent call last):", ".py\", line"],
    ),
    (
        Language::JavaScript,
        &["at ", ".js:", "node_modules/", "Error:", "    at "],
    ),
    (Language::TypeScript, &[".ts:", ".tsx:", "TSError"]),
    (
        Language::Go,
        &["goroutine", ".go:", "panic:", "runtime error:"],
    ),
    (
        Language::Rust,
        &["panicked at", ".rs:", "thread '", "RUST_BACKTRACE"],
    ),
    (Language::Java, &[".java:", "at ", "Exception", "Caused by:"]),
    (Language::CSharp, &[".cs:", "at ", " in ", ":line "]),
    (Language::Ruby, &[".rb:", "from ", ":in `"]),
    (Language::Php, &[".php", "on line", "Stack trace:"]),
];
