//! Assembles the full analysis context for one failure
//!
//! The builder ties together traceback parsing, per-file extraction, import
//! resolution, the dependency graph, call chains and project scanning. A fresh
//! builder is meant to be used per analysis; only the project scan is shared.

mod render;

use crate::analysis::call_chain::CallChainAnalyzer;
use crate::analysis::dependency_graph::DependencyGraph;
use crate::analysis::error_analyzer::ErrorAnalyzer;
use crate::analysis::extract::ContextExtractor;
use crate::analysis::import_resolver::ImportResolver;
use crate::analysis::project_scanner::{ProjectInfo, ProjectScanner, is_skipped_dir};
use crate::config::Config;
use crate::language::Language;
use crate::paths::canonical_key;
use crate::traceback::parse_traceback;
use crate::types::{AnalysisContext, ContextType, FileContext, ParsedTraceback, UpstreamContext};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// File path used by the synthetic context built from the log itself
pub const ERROR_LOG_PATH: &str = "<error_log>";

/// Directories probed for a bare file name after the project-wide search
const CONVENTIONAL_DIRS: &[&str] = &["src", "lib", "app", "pkg", "."];

/// Relevant files tried when the log has no usable frames
const FALLBACK_RELEVANT_FILES: usize = 3;

/// Entry points tried when no relevant file could be read
const FALLBACK_ENTRY_POINTS: usize = 2;

pub struct ContextBuilder {
    project_root: PathBuf,
    max_upstream_files: usize,
    tree_max_depth: usize,
    tree_max_files_per_dir: usize,
    scanner: Arc<ProjectScanner>,
    extractor: ContextExtractor,
    import_resolver: ImportResolver,
    dependency_graph: DependencyGraph,
    call_chain_analyzer: CallChainAnalyzer,
    error_analyzer: ErrorAnalyzer,
    file_tree: OnceCell<String>,
}

impl ContextBuilder {
    /// Builder with default settings and its own scanner
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self::with_config(project_root, &Config::default(), None)
    }

    /// Builder using `config`; pass a shared scanner to reuse an existing scan
    pub fn with_config(
        project_root: impl AsRef<Path>,
        config: &Config,
        scanner: Option<Arc<ProjectScanner>>,
    ) -> Self {
        let scanner = scanner.unwrap_or_else(|| {
            Arc::new(ProjectScanner::new(
                project_root.as_ref(),
                config.scanner.max_files,
            ))
        });
        let project_root = scanner.root().to_path_buf();
        let error_analyzer = ErrorAnalyzer::new(Some(Arc::clone(&scanner)))
            .with_file_limit(config.context.relevant_file_limit);

        Self {
            max_upstream_files: config.context.max_upstream_files,
            tree_max_depth: config.scanner.tree_max_depth,
            tree_max_files_per_dir: config.scanner.tree_max_files_per_dir,
            extractor: ContextExtractor::new(config.context.max_context_lines),
            import_resolver: ImportResolver::new(&project_root),
            dependency_graph: DependencyGraph::new(&project_root),
            call_chain_analyzer: CallChainAnalyzer::new(&project_root),
            error_analyzer,
            scanner,
            project_root,
            file_tree: OnceCell::new(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn scanner(&self) -> &Arc<ProjectScanner> {
        &self.scanner
    }

    /// Cached project scan
    pub fn project_info(&self) -> &ProjectInfo {
        self.scanner.scan()
    }

    /// Graph of every file seen by this builder so far
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.dependency_graph
    }

    /// Bounded project tree, rendered once per builder
    pub fn file_tree(&self) -> &str {
        self.file_tree.get_or_init(|| {
            self.scanner
                .generate_file_tree(self.tree_max_depth, self.tree_max_files_per_dir, false)
        })
    }

    /// Parse `error_log`, extract every frame's file and gather upstream context
    pub fn build_analysis_context(
        &mut self,
        error_log: &str,
        language_hint: Option<Language>,
    ) -> AnalysisContext {
        let traceback = parse_traceback(error_log, language_hint);
        let contexts = self.extract_frame_contexts(&traceback);

        if contexts.is_empty() {
            tracing::info!("No traceback files resolved, falling back to error analysis");
            return self.minimal_context(error_log, traceback);
        }
        self.assemble(contexts, traceback)
    }

    /// Like [`Self::build_analysis_context`] with pre-extracted file contexts
    pub fn build_from_contexts(
        &mut self,
        error_log: &str,
        contexts: Vec<FileContext>,
        language_hint: Option<Language>,
    ) -> AnalysisContext {
        let traceback = parse_traceback(error_log, language_hint);
        if contexts.is_empty() {
            return self.minimal_context(error_log, traceback);
        }
        self.assemble(contexts, traceback)
    }

    fn assemble(&mut self, mut contexts: Vec<FileContext>, traceback: ParsedTraceback) -> AnalysisContext {
        for ctx in &mut contexts {
            ctx.imports = self
                .import_resolver
                .resolve_imports(&ctx.imports, Path::new(&ctx.filepath));
            self.dependency_graph.add_file_context(ctx);
        }

        let primary_context = primary_context(&contexts, &traceback);
        let upstream_context = self.upstream_context(&primary_context, &contexts, &traceback);

        tracing::info!(
            primary = %primary_context.filepath,
            traceback_files = contexts.len(),
            upstream_files = upstream_context.as_ref().map_or(0, |u| u.file_contexts.len()),
            "Built analysis context"
        );

        AnalysisContext {
            primary_context,
            traceback_contexts: contexts,
            upstream_context,
            parsed_traceback: traceback,
            error_analysis: None,
            project_root: self.project_root.display().to_string(),
        }
    }

    fn extract_frame_contexts(&mut self, traceback: &ParsedTraceback) -> Vec<FileContext> {
        let mut contexts = Vec::new();
        for frame in &traceback.frames {
            let Some(path) = self.resolve_file_path(&frame.filepath) else {
                tracing::debug!(file = %frame.filepath, "Traceback file not found");
                continue;
            };
            let ctx = self.extractor.extract(
                &path.display().to_string(),
                frame.line_number,
                traceback.language,
            );
            if !ctx.is_missing() {
                contexts.push(ctx);
            }
        }
        contexts
    }

    /// Locate a traceback path on disk
    ///
    /// Tried in order: the path as given, relative to the project root, a
    /// project-wide search for the file name, then the conventional source dirs.
    pub fn resolve_file_path(&self, filepath: &str) -> Option<PathBuf> {
        let given = Path::new(filepath);
        if given.is_file() {
            return Some(given.to_path_buf());
        }

        let relative = self.project_root.join(filepath.trim_start_matches('/'));
        if relative.is_file() {
            return Some(relative);
        }

        let filename = given.file_name()?;
        let found = WalkDir::new(&self.project_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !is_skipped_dir(&e.file_name().to_string_lossy())
            })
            .filter_map(Result::ok)
            .find(|e| e.file_type().is_file() && e.file_name() == filename);
        if let Some(entry) = found {
            return Some(entry.into_path());
        }

        CONVENTIONAL_DIRS
            .iter()
            .map(|dir| self.project_root.join(dir).join(filename))
            .find(|candidate| candidate.is_file())
    }

    fn upstream_context(
        &mut self,
        primary: &FileContext,
        contexts: &[FileContext],
        traceback: &ParsedTraceback,
    ) -> Option<UpstreamContext> {
        let call_chain = self
            .call_chain_analyzer
            .analyze_from_contexts(contexts, Some(traceback));

        let traceback_keys: Vec<PathBuf> = contexts
            .iter()
            .map(|c| canonical_key(Path::new(&c.filepath)))
            .collect();
        let mut upstream_files: Vec<PathBuf> = Vec::new();
        let mut push_upstream = |path: PathBuf| {
            let key = canonical_key(&path);
            if !traceback_keys.contains(&key) && !upstream_files.contains(&key) {
                upstream_files.push(key);
            }
        };

        for import in contexts.iter().flat_map(|c| &c.imports) {
            if let Some(resolved) = &import.resolved_path {
                push_upstream(PathBuf::from(resolved));
            }
        }
        for dependent in self.dependency_graph.dependents(&primary.filepath) {
            push_upstream(dependent);
        }
        upstream_files.truncate(self.max_upstream_files);

        let file_contexts: Vec<FileContext> = upstream_files
            .iter()
            .map(|path| {
                self.extractor
                    .extract(&path.display().to_string(), 1, Language::from_path(path))
            })
            .filter(|ctx| !ctx.is_missing())
            .collect();

        if file_contexts.is_empty() && call_chain.sites.is_empty() {
            return None;
        }

        Some(UpstreamContext {
            file_contexts,
            call_chain: call_chain.to_string_list(),
            relevant_definitions: BTreeMap::new(),
            dependency_summary: self.dependency_graph.summary(),
        })
    }

    fn minimal_context(&mut self, error_log: &str, traceback: ParsedTraceback) -> AnalysisContext {
        let analysis = self.error_analyzer.analyze(error_log);
        let mut contexts: Vec<FileContext> = Vec::new();

        for file in analysis.relevant_files.iter().take(FALLBACK_RELEVANT_FILES) {
            let path = self.project_root.join(&file.path);
            let ctx = self
                .extractor
                .extract(&path.display().to_string(), 1, file.language);
            if !ctx.is_missing() {
                contexts.push(ctx);
            }
        }

        if contexts.is_empty() {
            let info = self.scanner.scan();
            for entry in info.entry_points.iter().take(FALLBACK_ENTRY_POINTS) {
                let path = self.project_root.join(&entry.path);
                let ctx = self
                    .extractor
                    .extract(&path.display().to_string(), 1, entry.language);
                if !ctx.is_missing() {
                    contexts.push(ctx);
                }
            }
        }

        let primary_context = contexts.first().cloned().unwrap_or_else(|| {
            FileContext::new(
                ERROR_LOG_PATH,
                0,
                ContextType::ErrorAnalysis,
                error_log,
                analysis.suggested_language.unwrap_or(traceback.language),
            )
        });

        let upstream_context = (!contexts.is_empty()).then(|| UpstreamContext {
            file_contexts: contexts[1..].to_vec(),
            call_chain: Vec::new(),
            relevant_definitions: BTreeMap::new(),
            dependency_summary: self.scanner.scan().to_summary(),
        });

        AnalysisContext {
            primary_context,
            traceback_contexts: contexts,
            upstream_context,
            parsed_traceback: traceback,
            error_analysis: Some(analysis),
            project_root: self.project_root.display().to_string(),
        }
    }
}

/// Last context for the primary frame's file, else the last non-missing one
fn primary_context(contexts: &[FileContext], traceback: &ParsedTraceback) -> FileContext {
    if let Some(frame) = traceback.primary_frame() {
        let frame_path = frame.filepath.trim_start_matches("./");
        let hit = contexts.iter().rev().find(|ctx| {
            !ctx.is_missing()
                && (ctx.filepath.ends_with(frame_path) || frame_path.ends_with(&ctx.filepath))
        });
        if let Some(ctx) = hit {
            return ctx.clone();
        }
    }

    contexts
        .iter()
        .rev()
        .find(|ctx| !ctx.is_missing())
        .or(contexts.last())
        .cloned()
        .unwrap_or_else(|| {
            FileContext::new(ERROR_LOG_PATH, 0, ContextType::ErrorAnalysis, "", traceback.language)
        })
}

#[cfg(test)]
mod tests;
