//! Resolve import statements to files inside the project

use crate::language::Language;
use crate::types::Import;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source directories probed for absolute Python imports, after the root itself
const PYTHON_SOURCE_DIRS: &[&str] = &["src", "lib", "app", "."];

const JS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ""];

const JS_INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.js", "index.jsx"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    language: Language,
    source_file: PathBuf,
    module: String,
    relative_level: usize,
}

/// Per-language import resolution with a result cache
///
/// External packages (stdlib, npm, third-party modules) resolve to None.
pub struct ImportResolver {
    project_root: PathBuf,
    cache: HashMap<CacheKey, Option<String>>,
    go_module: OnceCell<Option<String>>,
}

impl ImportResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            cache: HashMap::new(),
            go_module: OnceCell::new(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Copies of `imports` with `resolved_path` filled where possible
    pub fn resolve_imports(&mut self, imports: &[Import], source_file: &Path) -> Vec<Import> {
        imports
            .iter()
            .map(|import| self.resolve_import(import, source_file))
            .collect()
    }

    /// A copy of `import` with `resolved_path` filled where possible
    pub fn resolve_import(&mut self, import: &Import, source_file: &Path) -> Import {
        let key = CacheKey {
            language: import.language,
            source_file: source_file.to_path_buf(),
            module: import.module_name.clone(),
            relative_level: import.relative_level,
        };

        let resolved_path = match self.cache.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let path = self.resolve_uncached(import, source_file);
                tracing::debug!(
                    module = %import.module_name,
                    language = %import.language,
                    resolved = path.as_deref().unwrap_or("<external>"),
                    "Resolved import"
                );
                self.cache.insert(key, path.clone());
                path
            }
        };

        let mut resolved = import.clone();
        resolved.resolved_path = resolved_path;
        resolved
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn resolve_uncached(&self, import: &Import, source_file: &Path) -> Option<String> {
        let path = match import.language {
            Language::Python if import.is_relative => self.resolve_python_relative(import, source_file),
            Language::Python => self.resolve_python_absolute(import),
            Language::JavaScript | Language::TypeScript => self.resolve_js(import, source_file),
            Language::Go => self.resolve_go(import),
            Language::Rust => self.resolve_rust(import),
            _ => None,
        }?;
        Some(path.to_string_lossy().into_owned())
    }

    fn resolve_python_relative(&self, import: &Import, source_file: &Path) -> Option<PathBuf> {
        let mut target = source_file.parent()?.to_path_buf();
        for _ in 1..import.relative_level {
            target = target.parent()?.to_path_buf();
        }
        if !import.module_name.is_empty() {
            target = target.join(import.module_name.replace('.', "/"));
        }
        probe_python(&target)
    }

    fn resolve_python_absolute(&self, import: &Import) -> Option<PathBuf> {
        let relative = import.module_name.replace('.', "/");
        if relative.is_empty() {
            return None;
        }
        if let Some(found) = probe_python(&self.project_root.join(&relative)) {
            return Some(found);
        }
        PYTHON_SOURCE_DIRS
            .iter()
            .map(|dir| self.project_root.join(dir))
            .filter(|base| base.is_dir())
            .find_map(|base| probe_python(&base.join(&relative)))
    }

    fn resolve_js(&self, import: &Import, source_file: &Path) -> Option<PathBuf> {
        let module = import.module_name.as_str();
        let target = if module.starts_with("./") || module.starts_with("../") {
            crate::paths::normalize_lexically(&source_file.parent()?.join(module))
        } else if let Some(rooted) = module.strip_prefix('/') {
            self.project_root.join(rooted.trim_start_matches('/'))
        } else {
            return None;
        };

        let with_extension = JS_EXTENSIONS.iter().find_map(|ext| {
            let candidate = PathBuf::from(format!("{}{}", target.display(), ext));
            candidate.is_file().then_some(candidate)
        });
        if with_extension.is_some() {
            return with_extension;
        }

        JS_INDEX_FILES
            .iter()
            .map(|index| target.join(index))
            .find(|candidate| candidate.exists())
    }

    fn go_module_path(&self) -> Option<&str> {
        self.go_module
            .get_or_init(|| {
                let content = std::fs::read_to_string(self.project_root.join("go.mod")).ok()?;
                content
                    .lines()
                    .map(str::trim)
                    .find_map(|line| line.strip_prefix("module "))
                    .map(|module| module.trim().to_string())
            })
            .as_deref()
    }

    fn resolve_go(&self, import: &Import) -> Option<PathBuf> {
        let module = import.module_name.as_str();
        if !module.starts_with('.') && !module.contains('/') {
            return None;
        }

        if let Some(module_path) = self.go_module_path()
            && let Some(rest) = module.strip_prefix(module_path)
        {
            let package_dir = self.project_root.join(rest.trim_start_matches('/'));
            if package_dir.is_dir() {
                return first_go_file(&package_dir).or(Some(package_dir));
            }
        }

        let mut parts: Vec<&str> = module.split('/').collect();
        if parts.first().is_some_and(|host| host.contains('.')) {
            parts.remove(0);
        }
        let package_dir = self.project_root.join(parts.join("/"));
        if package_dir.is_dir() {
            return first_go_file(&package_dir);
        }
        None
    }

    /// `crate::a::b::C` probes `src/a/b/C.rs`, `src/a/b/C/mod.rs`, then shorter prefixes
    fn resolve_rust(&self, import: &Import) -> Option<PathBuf> {
        let rest = import.module_name.strip_prefix("crate::")?;
        let segments: Vec<&str> = rest.split("::").filter(|s| !s.is_empty()).collect();
        let src = self.project_root.join("src");

        (1..=segments.len()).rev().find_map(|len| {
            let relative = segments[..len].join("/");
            [
                src.join(format!("{}.rs", relative)),
                src.join(&relative).join("mod.rs"),
            ]
            .into_iter()
            .find(|candidate| candidate.is_file())
        })
    }
}

fn probe_python(target: &Path) -> Option<PathBuf> {
    let module_file = PathBuf::from(format!("{}.py", target.display()));
    if module_file.exists() {
        return Some(module_file);
    }
    let package = target.join("__init__.py");
    package.exists().then_some(package)
}

fn first_go_file(dir: &Path) -> Option<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "go"))
        .collect();
    files.sort();
    files.into_iter().next()
}
