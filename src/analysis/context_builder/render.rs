//! Prompt rendering of an [`AnalysisContext`]

use super::{ContextBuilder, ERROR_LOG_PATH};
use crate::language::Language;
use crate::types::AnalysisContext;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Characters of the raw log shown when no file could be located
const ERROR_MESSAGE_PREVIEW_CHARS: usize = 1000;

static MENTIONED_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\w\-\.]+\.(?:html|js|ts|py|css|json)").unwrap());

impl ContextBuilder {
    /// Render the context as prompt text
    ///
    /// Sections, in order: project metadata, the file tree, the error analysis,
    /// the primary location, the remaining traceback locations and the upstream
    /// material.
    pub fn context_for_prompt(
        &self,
        ctx: &AnalysisContext,
        include_upstream: bool,
        include_project_info: bool,
        include_file_tree: bool,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();

        if include_project_info {
            let info = self.project_info();
            parts.push("## PROJECT INFORMATION".to_string());
            parts.push(format!("Type: {}", info.project_type));
            parts.push(format!("Language: {}", info.primary_language));
            if !info.frameworks_detected.is_empty() {
                parts.push(format!("Frameworks: {}", info.frameworks_detected.join(", ")));
            }
            if !info.entry_points.is_empty() {
                let entries: Vec<&str> = info
                    .entry_points
                    .iter()
                    .take(3)
                    .map(|e| e.path.as_str())
                    .collect();
                parts.push(format!("Entry Points: {}", entries.join(", ")));
            }
            parts.push(String::new());
        }

        if include_file_tree {
            parts.push("<ProjectStructure>".to_string());
            parts.push("## FILE TREE".to_string());
            parts.push("Use this tree to verify file paths exist before suggesting changes.".to_string());
            parts.push("Do NOT assume a file exists unless you see it here.".to_string());
            parts.push(String::new());
            parts.push("```".to_string());
            parts.push(self.file_tree().to_string());
            parts.push("```".to_string());
            parts.push("</ProjectStructure>".to_string());
            parts.push(String::new());
        }

        if let Some(analysis) = &ctx.error_analysis {
            parts.push("## ERROR ANALYSIS".to_string());
            parts.push(format!("Error Type: {}", analysis.error_type));
            parts.push(format!("Category: {}", analysis.error_category));
            if !analysis.affected_routes.is_empty() {
                parts.push(format!("Affected Routes: {}", analysis.affected_routes.join(", ")));
            }
            if !analysis.relevant_files.is_empty() {
                let files: Vec<&str> = analysis
                    .relevant_files
                    .iter()
                    .take(5)
                    .map(|f| f.path.as_str())
                    .collect();
                parts.push(format!("Relevant Files: {}", files.join(", ")));
            }
            parts.push(String::new());
        }

        let primary = &ctx.primary_context;
        parts.push("## PRIMARY ERROR LOCATION".to_string());
        if primary.filepath != ERROR_LOG_PATH {
            parts.push(format!("File: {}", primary.filepath));
            parts.push(format!("Line: {}", primary.line_number));
            if let Some(function) = &primary.function_name {
                parts.push(format!("Function: {}", function));
            }
            parts.push(format!("Language: {}", primary.language));
            parts.push("\n```".to_string());
            parts.push(primary.content.clone());
            parts.push("```\n".to_string());
        } else {
            parts.push("(No specific file path in error)".to_string());
            parts.push(format!("Language: {}", primary.language));
            parts.push("\nError Message:".to_string());
            parts.push(primary.content.chars().take(ERROR_MESSAGE_PREVIEW_CHARS).collect());
            parts.push(String::new());
        }

        let others: Vec<_> = ctx
            .traceback_contexts
            .iter()
            .filter(|c| c.filepath != primary.filepath)
            .collect();
        if !others.is_empty() {
            parts.push("## CALL STACK CONTEXT".to_string());
            for other in others {
                parts.push(format!("\n### {}:{}", other.filepath, other.line_number));
                if let Some(function) = &other.function_name {
                    parts.push(format!("Function: {}", function));
                }
                parts.push("```".to_string());
                parts.push(other.content.clone());
                parts.push("```".to_string());
            }
        }

        if include_upstream && let Some(upstream) = &ctx.upstream_context {
            parts.push("\n## UPSTREAM CONTEXT (for root cause analysis)".to_string());
            parts.push(upstream.to_prompt_text());
        }

        parts.join("\n")
    }

    /// Project-aware context with whole-file contents, for logs that need a wide view
    ///
    /// Includes a deeper tree than [`Self::context_for_prompt`], an existence check
    /// for every file the log mentions, and the full text of entry points and
    /// relevant files.
    pub fn deep_context(&mut self, error_log: &str, language_hint: Option<Language>) -> String {
        let ctx = self.build_analysis_context(error_log, language_hint);
        let info = self.project_info();
        let mut parts: Vec<String> = Vec::new();

        parts.push("## PROJECT INFORMATION".to_string());
        parts.push(format!("Type: {}", info.project_type));
        parts.push(format!("Language: {}", info.primary_language));
        if !info.frameworks_detected.is_empty() {
            parts.push(format!("Frameworks: {}", info.frameworks_detected.join(", ")));
        }
        parts.push(String::new());

        parts.push("<ProjectStructure>".to_string());
        parts.push("## PROJECT FILE TREE".to_string());
        parts.push("IMPORTANT: Use this tree to verify file paths before suggesting changes.".to_string());
        parts.push("- Do NOT assume a file exists unless you see it in this tree.".to_string());
        parts.push("- If a file is MISSING from an expected location, look for it elsewhere in the tree.".to_string());
        parts.push(String::new());
        parts.push("```".to_string());
        parts.push(self.scanner.generate_file_tree(
            self.tree_max_depth + 1,
            self.tree_max_files_per_dir + 5,
            false,
        ));
        parts.push("```".to_string());
        parts.push("</ProjectStructure>".to_string());
        parts.push(String::new());

        if let Some(analysis) = &ctx.error_analysis {
            parts.push("## ERROR ANALYSIS".to_string());
            parts.push(format!("Error Type: {}", analysis.error_type));
            parts.push(format!("Category: {}", analysis.error_category));
            if !analysis.affected_routes.is_empty() {
                parts.push(format!("Affected Routes: {}", analysis.affected_routes.join(", ")));
            }
            parts.push(String::new());
        }

        parts.push("## ORIGINAL ERROR".to_string());
        parts.push("```".to_string());
        parts.push(error_log.to_string());
        parts.push("```".to_string());
        parts.push(String::new());

        parts.push("## FILE EXISTENCE CHECK".to_string());
        for mentioned in MENTIONED_FILE_RE.find_iter(error_log).take(5) {
            let path = mentioned.as_str();
            let exists = self.project_root.join(path.trim_start_matches('/')).exists();
            parts.push(format!("- {}: {}", path, if exists { "EXISTS" } else { "MISSING" }));
        }
        parts.push(String::new());

        parts.push("## SOURCE FILES TO ANALYZE AND FIX".to_string());
        parts.push(String::new());

        let relevant = ctx
            .error_analysis
            .iter()
            .flat_map(|a| a.relevant_files.iter().take(5));
        let mut added: HashSet<&str> = HashSet::new();
        for file in info.entry_points.iter().take(3).chain(relevant) {
            if !added.insert(file.path.as_str()) {
                continue;
            }
            let Some(content) = self.scanner.file_content(&file.path).filter(|c| !c.is_empty())
            else {
                continue;
            };
            parts.push(format!("### FILE: {}", file.path));
            parts.push(format!("```{}", file.language));
            parts.push(content);
            parts.push("```".to_string());
            parts.push(String::new());
        }

        let lower = error_log.to_lowercase();
        if lower.contains("public") || lower.contains("static") {
            parts.push("## DIRECTORY STRUCTURE CHECK".to_string());
            for dirname in ["public", "static", "build", "dist"] {
                let dir = self.project_root.join(dirname);
                match std::fs::read_dir(&dir) {
                    Ok(entries) => {
                        let mut names: Vec<String> = entries
                            .filter_map(Result::ok)
                            .map(|e| e.file_name().to_string_lossy().into_owned())
                            .collect();
                        names.sort();
                        names.truncate(10);
                        parts.push(format!("- {}/: {}", dirname, names.join(", ")));
                    }
                    Err(_) => parts.push(format!("- {}/: DOES NOT EXIST", dirname)),
                }
            }
            parts.push(String::new());
        }

        parts.join("\n")
    }
}
