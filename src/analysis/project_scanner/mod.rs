//! Project scanning: source files, entry points, config files and frameworks
//!
//! A scan walks the tree once and is cached for the lifetime of the scanner. The
//! cached [`ProjectInfo`] is never invalidated; build a new scanner to rescan.

mod tree;

use crate::language::Language;
use crate::paths::relative_to;
use ignore::WalkBuilder;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, OnceLock};

/// Directories never descended into
pub const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    ".svn",
    ".hg",
    "venv",
    "env",
    ".venv",
    ".env",
    "dist",
    "build",
    "target",
    ".idea",
    ".vscode",
    "coverage",
    ".pytest_cache",
    ".mypy_cache",
    "eggs",
];

/// File names recorded as configuration rather than source
pub const CONFIG_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "setup.py",
    "pyproject.toml",
    "Pipfile",
    "go.mod",
    "Cargo.toml",
    "pom.xml",
    "build.gradle",
    ".env",
    "config.py",
    "config.js",
    "config.json",
    "settings.py",
    "docker-compose.yml",
    "Dockerfile",
];

/// Bytes of each file inspected for framework markers
const FRAMEWORK_SNIFF_BYTES: u64 = 10240;

/// Source files (after entry points) inspected for framework markers
const FRAMEWORK_SNIFF_FILES: usize = 50;

/// Frameworks in project-type priority order
const FRAMEWORK_PRIORITY: &[&str] = &[
    "flask", "fastapi", "django", "express", "gin", "actix", "spring", "react", "vue",
];

/// Whether a directory name is on the deny-list
pub fn is_skipped_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name) || name.ends_with(".egg-info")
}

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap()
}

static ENTRY_POINT_PATTERNS: LazyLock<Vec<(Language, Vec<Regex>)>> = LazyLock::new(|| {
    let table: &[(Language, &[&str])] = &[
        (
            Language::Python,
            &[
                r"^main\.py$",
                r"^app\.py$",
                r"^server\.py$",
                r"^run\.py$",
                r"^wsgi\.py$",
                r"^asgi\.py$",
                r"^manage\.py$",
                r"^__main__\.py$",
                r"^index\.py$",
            ],
        ),
        (
            Language::JavaScript,
            &[
                r"^index\.js$",
                r"^app\.js$",
                r"^server\.js$",
                r"^main\.js$",
                r"^src/index\.js$",
            ],
        ),
        (
            Language::TypeScript,
            &[
                r"^index\.ts$",
                r"^app\.ts$",
                r"^server\.ts$",
                r"^main\.ts$",
                r"^src/index\.ts$",
            ],
        ),
        (Language::Go, &[r"^main\.go$", r"^cmd/.*\.go$"]),
        (
            Language::Rust,
            &[r"^main\.rs$", r"^lib\.rs$", r"^src/main\.rs$", r"^src/lib\.rs$"],
        ),
        (
            Language::Java,
            &[r"^Main\.java$", r"^App\.java$", r"^Application\.java$"],
        ),
    ];
    table
        .iter()
        .map(|(lang, patterns)| (*lang, patterns.iter().map(|p| case_insensitive(p)).collect()))
        .collect()
});

/// Where a framework marker is looked for
enum MarkerTarget {
    Content(Language),
    Path,
}

static FRAMEWORK_PATTERNS: LazyLock<Vec<(&'static str, Vec<(Regex, MarkerTarget)>)>> =
    LazyLock::new(|| {
        use MarkerTarget::{Content, Path};
        let table: Vec<(&str, Vec<(&str, MarkerTarget)>)> = vec![
            (
                "flask",
                vec![
                    (r"from\s+flask\s+import", Content(Language::Python)),
                    (r"import\s+flask", Content(Language::Python)),
                    (r"Flask\s*\(", Content(Language::Python)),
                ],
            ),
            (
                "fastapi",
                vec![
                    (r"from\s+fastapi\s+import", Content(Language::Python)),
                    (r"FastAPI\s*\(", Content(Language::Python)),
                ],
            ),
            (
                "django",
                vec![
                    (r"from\s+django", Content(Language::Python)),
                    (r"import\s+django", Content(Language::Python)),
                    (r"DJANGO_SETTINGS_MODULE", Content(Language::Python)),
                ],
            ),
            (
                "express",
                vec![
                    (r#"require\s*\(\s*['"]express['"]\s*\)"#, Content(Language::JavaScript)),
                    (r#"from\s+['"]express['"]"#, Content(Language::JavaScript)),
                    (r"express\s*\(\s*\)", Content(Language::JavaScript)),
                ],
            ),
            (
                "react",
                vec![
                    (r#"from\s+['"]react['"]"#, Content(Language::JavaScript)),
                    (r"import\s+React", Content(Language::JavaScript)),
                    (r"React\.createElement", Content(Language::JavaScript)),
                ],
            ),
            (
                "vue",
                vec![
                    (r#"from\s+['"]vue['"]"#, Content(Language::JavaScript)),
                    (r"createApp", Content(Language::JavaScript)),
                    (r"\.vue$", Path),
                ],
            ),
            ("gin", vec![(r"github\.com/gin-gonic/gin", Content(Language::Go))]),
            ("actix", vec![(r"actix_web", Content(Language::Rust))]),
            (
                "spring",
                vec![
                    (r"org\.springframework", Content(Language::Java)),
                    (r"@SpringBootApplication", Content(Language::Java)),
                ],
            ),
        ];
        table
            .into_iter()
            .map(|(name, markers)| {
                let markers = markers
                    .into_iter()
                    .map(|(pattern, target)| (Regex::new(pattern).unwrap(), target))
                    .collect();
                (name, markers)
            })
            .collect()
    });

static FILE_NAME_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        case_insensitive(r"[\w\-]+\.(?:py|js|ts|go|rs|java|jsx|tsx)"),
        case_insensitive(r"/[\w\-/]+\.(?:py|js|ts|go|rs|java|jsx|tsx)"),
    ]
});
static ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[\w\-/]+").unwrap());
static CAMEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+(?:[A-Z][a-z]+)+\b").unwrap());
static SNAKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]+(?:_[a-z]+)+\b").unwrap());
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());

const KEYWORD_STOPWORDS: &[&str] = &[
    "error", "exception", "failed", "cannot", "could", "not", "the", "a", "an", "is", "are",
    "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "at", "in", "on", "to", "for", "of", "with", "by", "from", "get", "post", "put", "delete",
    "http", "https",
];

/// A file found by the scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Relative to the project root, forward slashes
    pub path: String,
    pub language: Language,
    pub is_entry_point: bool,
    pub is_config: bool,
    pub size: u64,
}

impl ProjectFile {
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Result of scanning a project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInfo {
    pub root: String,
    pub project_type: String,
    pub primary_language: Language,
    pub entry_points: Vec<ProjectFile>,
    pub source_files: Vec<ProjectFile>,
    pub config_files: Vec<ProjectFile>,
    pub frameworks_detected: Vec<String>,
}

impl ProjectInfo {
    pub fn files_by_language(&self, language: Language) -> Vec<&ProjectFile> {
        self.source_files
            .iter()
            .filter(|f| f.language == language)
            .collect()
    }

    /// First source file whose path contains `name`, case-insensitively
    pub fn find_file(&self, name: &str) -> Option<&ProjectFile> {
        let needle = name.to_lowercase();
        self.source_files
            .iter()
            .find(|f| f.path.to_lowercase().contains(&needle))
    }

    /// Source files whose path matches a case-insensitive regex; an invalid regex matches nothing
    pub fn find_files_by_pattern(&self, pattern: &str) -> Vec<&ProjectFile> {
        let Ok(regex) = RegexBuilder::new(pattern).case_insensitive(true).build() else {
            tracing::debug!("Invalid file pattern: {}", pattern);
            return Vec::new();
        };
        self.source_files
            .iter()
            .filter(|f| regex.is_match(&f.path))
            .collect()
    }

    pub fn to_summary(&self) -> String {
        let frameworks = if self.frameworks_detected.is_empty() {
            "None detected".to_string()
        } else {
            self.frameworks_detected.join(", ")
        };
        let mut lines = vec![
            format!("Project Type: {}", self.project_type),
            format!("Primary Language: {}", self.primary_language),
            format!("Frameworks: {}", frameworks),
            format!("Entry Points: {}", self.entry_points.len()),
            format!("Source Files: {}", self.source_files.len()),
        ];

        if !self.entry_points.is_empty() {
            lines.push("\nEntry Points:".to_string());
            for ep in self.entry_points.iter().take(5) {
                lines.push(format!("  - {}", ep.path));
            }
        }
        lines.join("\n")
    }
}

/// Simple `.gitignore` matching: `*x` suffix, `x*` prefix, otherwise exact name or path
pub fn gitignore_matches(patterns: &[String], name: &str, rel_path: &str) -> bool {
    patterns.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix('*') {
            name.ends_with(suffix)
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            name.starts_with(prefix)
        } else {
            name == pattern || rel_path == pattern
        }
    })
}

/// Patterns from the root `.gitignore`, comments and blanks dropped, trailing `/` trimmed
pub fn load_gitignore(root: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(root.join(".gitignore")) else {
        return Vec::new();
    };
    let mut patterns: Vec<String> = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let pattern = line.trim_end_matches('/').to_string();
        if !pattern.is_empty() && !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
    }
    patterns
}

/// Scans a project once and answers questions about it
pub struct ProjectScanner {
    root: PathBuf,
    max_files: usize,
    info: OnceLock<ProjectInfo>,
}

impl ProjectScanner {
    /// Scanner for `root`, made absolute; at most `max_files` source files are recorded
    pub fn new(root: impl AsRef<Path>, max_files: usize) -> Self {
        let root = root.as_ref();
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self {
            root,
            max_files,
            info: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cached scan result, computed on first call
    pub fn scan(&self) -> &ProjectInfo {
        self.info.get_or_init(|| self.scan_uncached())
    }

    fn scan_uncached(&self) -> ProjectInfo {
        let gitignore = Arc::new(load_gitignore(&self.root));
        let filter_root = self.root.clone();
        let filter_patterns = Arc::clone(&gitignore);

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                if entry.depth() == 0 {
                    return true;
                }
                if is_dir && (is_skipped_dir(&name) || name.starts_with('.')) {
                    return false;
                }
                let rel = relative_to(&filter_root, entry.path()).unwrap_or_default();
                !gitignore_matches(&filter_patterns, &name, &rel)
            })
            .build();

        let mut source_files: Vec<ProjectFile> = Vec::new();
        let mut config_files: Vec<ProjectFile> = Vec::new();
        let mut language_counts: Vec<(Language, usize)> = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if source_files.len() >= self.max_files {
                tracing::debug!(max_files = self.max_files, "File cap reached, stopping scan");
                break;
            }

            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(rel_path) = relative_to(&self.root, path) else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

            if CONFIG_FILES.contains(&name.as_str()) {
                config_files.push(ProjectFile {
                    path: rel_path,
                    language: Language::Unknown,
                    is_entry_point: false,
                    is_config: true,
                    size,
                });
                continue;
            }

            let language = Language::from_path(path);
            if language.is_unknown() {
                continue;
            }

            source_files.push(ProjectFile {
                is_entry_point: is_entry_point(&rel_path, &name, language),
                path: rel_path,
                language,
                is_config: false,
                size,
            });

            match language_counts.iter_mut().find(|(lang, _)| *lang == language) {
                Some((_, count)) => *count += 1,
                None => language_counts.push((language, 1)),
            }
        }

        let entry_points: Vec<ProjectFile> = source_files
            .iter()
            .filter(|f| f.is_entry_point)
            .cloned()
            .collect();

        let sniffed: Vec<&ProjectFile> = entry_points
            .iter()
            .chain(source_files.iter().take(FRAMEWORK_SNIFF_FILES))
            .collect();
        let frameworks = self.detect_frameworks(&sniffed);

        let mut primary_language = Language::Unknown;
        let mut best = 0;
        for (lang, count) in &language_counts {
            if *count > best {
                best = *count;
                primary_language = *lang;
            }
        }

        let project_type = FRAMEWORK_PRIORITY
            .iter()
            .find(|fw| frameworks.iter().any(|f| f == *fw))
            .map(|fw| fw.to_string())
            .unwrap_or_else(|| primary_language.as_str().to_string());

        tracing::info!(
            root = %self.root.display(),
            source_files = source_files.len(),
            entry_points = entry_points.len(),
            project_type = %project_type,
            "Scanned project"
        );

        ProjectInfo {
            root: self.root.display().to_string(),
            project_type,
            primary_language,
            entry_points,
            source_files,
            config_files,
            frameworks_detected: frameworks,
        }
    }

    fn detect_frameworks(&self, files: &[&ProjectFile]) -> Vec<String> {
        let mut found: BTreeSet<&'static str> = BTreeSet::new();

        for file in files {
            let Some(content) = self.read_prefix(&file.path, FRAMEWORK_SNIFF_BYTES) else {
                continue;
            };
            // TypeScript sources use the JavaScript framework markers
            let content_language = match file.language {
                Language::TypeScript => Language::JavaScript,
                other => other,
            };

            for (framework, markers) in FRAMEWORK_PATTERNS.iter() {
                let hit = markers.iter().any(|(regex, target)| match target {
                    MarkerTarget::Path => regex.is_match(&file.path),
                    MarkerTarget::Content(lang) => {
                        *lang == content_language && regex.is_match(&content)
                    }
                });
                if hit {
                    found.insert(framework);
                }
            }
        }

        FRAMEWORK_PATTERNS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| found.contains(name))
            .map(str::to_string)
            .collect()
    }

    fn read_prefix(&self, rel_path: &str, limit: u64) -> Option<String> {
        let file = std::fs::File::open(self.root.join(rel_path)).ok()?;
        let mut buf = Vec::new();
        file.take(limit).read_to_end(&mut buf).ok()?;
        Some(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Whole file text by relative path, decoded lossily
    pub fn file_content(&self, rel_path: &str) -> Option<String> {
        std::fs::read(self.root.join(rel_path))
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Project summary with the contents of up to `max_files` entry points
    pub fn project_context(&self, max_files: usize) -> String {
        let info = self.scan();
        let frameworks = if info.frameworks_detected.is_empty() {
            "None detected".to_string()
        } else {
            info.frameworks_detected.join(", ")
        };

        let mut lines = vec![
            "## PROJECT STRUCTURE".to_string(),
            format!("Type: {}", info.project_type),
            format!("Language: {}", info.primary_language),
            format!("Frameworks: {}", frameworks),
            String::new(),
            "### Entry Points:".to_string(),
        ];
        for ep in info.entry_points.iter().take(max_files) {
            lines.push(format!("- {}", ep.path));
        }

        lines.push(String::new());
        lines.push("### Key Files:".to_string());
        for ep in info.entry_points.iter().take(max_files) {
            let Some(mut content) = self.file_content(&ep.path).filter(|c| !c.is_empty()) else {
                continue;
            };
            if content.chars().count() > 2000 {
                content = content.chars().take(2000).collect::<String>() + "\n... (truncated)";
            }
            lines.push(format!("\n#### {}", ep.path));
            lines.push(format!("```{}", ep.language));
            lines.push(content);
            lines.push("```".to_string());
        }

        lines.join("\n")
    }

    /// Source files ranked by relevance to an error text, best first
    pub fn find_relevant_files(&self, text: &str, limit: usize) -> Vec<ProjectFile> {
        let info = self.scan();
        let keywords = extract_keywords(text);
        let lower = text.to_lowercase();

        let mut scored: Vec<(f64, &ProjectFile)> = info
            .source_files
            .iter()
            .map(|file| (score_relevance(file, &keywords, text, &lower), file))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(limit)
            .map(|(_, file)| file.clone())
            .collect()
    }

    /// Indented tree of the project, see [`tree::render`]
    pub fn generate_file_tree(&self, max_depth: usize, max_files_per_dir: usize, show_hidden: bool) -> String {
        tree::render(&self.root, max_depth, max_files_per_dir, show_hidden)
    }
}

fn is_entry_point(rel_path: &str, name: &str, language: Language) -> bool {
    ENTRY_POINT_PATTERNS
        .iter()
        .filter(|(lang, _)| *lang == language)
        .flat_map(|(_, patterns)| patterns.iter())
        .any(|re| re.is_match(name) || re.is_match(rel_path))
}

/// Lowercased file names, route segments, identifiers and quoted strings, minus stopwords
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    let mut keywords: BTreeSet<String> = BTreeSet::new();

    for re in FILE_NAME_RE.iter() {
        keywords.extend(re.find_iter(text).map(|m| m.as_str().to_lowercase()));
    }

    for route in ROUTE_RE.find_iter(text) {
        keywords.extend(
            route
                .as_str()
                .trim_matches('/')
                .split('/')
                .filter(|part| part.len() > 2)
                .map(str::to_lowercase),
        );
    }

    keywords.extend(CAMEL_RE.find_iter(text).map(|m| m.as_str().to_lowercase()));
    keywords.extend(SNAKE_RE.find_iter(text).map(|m| m.as_str().to_string()));

    for caps in QUOTED_RE.captures_iter(text) {
        if let Some(quoted) = caps.get(1).map(|m| m.as_str())
            && quoted.len() > 2
            && !quoted.starts_with("http")
        {
            keywords.insert(quoted.to_lowercase());
        }
    }

    keywords.retain(|k| !KEYWORD_STOPWORDS.contains(&k.as_str()));
    keywords
}

fn score_relevance(file: &ProjectFile, keywords: &BTreeSet<String>, text: &str, lower: &str) -> f64 {
    let path = file.path.to_lowercase();
    let name = file.filename().to_lowercase();
    let mut score = 0.0;

    if file.is_entry_point {
        score += 2.0;
    }

    for keyword in keywords {
        if name.contains(keyword.as_str()) {
            score += 3.0;
        } else if path.contains(keyword.as_str()) {
            score += 1.5;
        }
    }

    if (lower.contains("cannot get") || text.contains("404"))
        && ["route", "app", "server", "index", "view", "controller"]
            .iter()
            .any(|x| name.contains(x))
    {
        score += 2.0;
    }

    if lower.contains("static") || lower.contains("index.html") {
        if ["static", "public", "build", "dist", "frontend"]
            .iter()
            .any(|x| path.contains(x))
        {
            score += 1.5;
        }
        if ["app", "server", "main", "index"].iter().any(|x| name.contains(x)) {
            score += 2.0;
        }
    }

    if lower.contains("api") && path.contains("api") {
        score += 2.0;
    }

    score
}
