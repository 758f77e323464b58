//! Traceback-to-snippet helpers that work without a project scan
//!
//! Frames are read where the log says they are (relative paths against the
//! current directory, or against an explicit root when one is given).

use crate::analysis::extract::ContextExtractor;
use crate::analysis::project_scanner::ProjectScanner;
use crate::config::{default_max_files, default_tree_max_depth};
use crate::language::Language;
use crate::traceback::parse_traceback;
use crate::types::FileContext;
use std::path::{Path, PathBuf};

/// Entries per directory in trees rendered by this module
const TREE_MAX_FILES_PER_DIR: usize = 20;

/// Snippets for every frame in `error_log`, plus the contexts they came from
///
/// The text joins a `Context from <file>:` block per readable frame. Frames whose
/// file is missing still produce a `missing` context. A log without frames gives
/// `("", [])`.
pub fn get_file_context(error_log: &str, language_hint: Option<Language>) -> (String, Vec<FileContext>) {
    contexts_under(error_log, language_hint, None)
}

/// Like [`get_file_context`], with relative frame paths also tried under `root`
pub fn get_file_context_in(
    error_log: &str,
    language_hint: Option<Language>,
    root: &Path,
) -> (String, Vec<FileContext>) {
    contexts_under(error_log, language_hint, Some(root))
}

fn contexts_under(
    error_log: &str,
    language_hint: Option<Language>,
    root: Option<&Path>,
) -> (String, Vec<FileContext>) {
    let traceback = parse_traceback(error_log, language_hint);
    if traceback.frames.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut extractor = ContextExtractor::default();
    let mut blocks: Vec<String> = Vec::new();
    let mut contexts: Vec<FileContext> = Vec::new();

    for frame in &traceback.frames {
        let path = locate(&frame.filepath, root);
        let ctx = extractor.extract(&path.display().to_string(), frame.line_number, traceback.language);
        if !ctx.is_missing() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| frame.filepath.clone());
            blocks.push(format!("Context from {}:\n{}", name, ctx.content));
        }
        contexts.push(ctx);
    }

    (blocks.join("\n\n"), contexts)
}

fn locate(filepath: &str, root: Option<&Path>) -> PathBuf {
    let given = PathBuf::from(filepath);
    if given.is_file() {
        return given;
    }
    match root {
        Some(root) if given.is_relative() => root.join(given),
        _ => given,
    }
}

/// Last context that is not a `missing` placeholder
pub fn primary_file(contexts: &[FileContext]) -> Option<&FileContext> {
    contexts.iter().rev().find(|c| !c.is_missing())
}

/// Tree of `project_root`, or of the current directory when none is given
pub fn generate_file_tree(project_root: Option<&Path>) -> String {
    let root = match project_root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    ProjectScanner::new(&root, default_max_files()).generate_file_tree(
        default_tree_max_depth(),
        TREE_MAX_FILES_PER_DIR,
        false,
    )
}

/// Project tree followed by the frame snippets
pub fn get_file_context_with_tree(
    error_log: &str,
    language_hint: Option<Language>,
    project_root: Option<&Path>,
) -> (String, Vec<FileContext>) {
    let (snippets, contexts) = match project_root {
        Some(root) => get_file_context_in(error_log, language_hint, root),
        None => get_file_context(error_log, language_hint),
    };

    let mut parts = vec![
        "<ProjectStructure>".to_string(),
        "## PROJECT FILE TREE".to_string(),
        "Use this tree to verify file paths before suggesting changes.".to_string(),
        String::new(),
        "```".to_string(),
        generate_file_tree(project_root),
        "```".to_string(),
        "</ProjectStructure>".to_string(),
    ];
    if !snippets.is_empty() {
        parts.push(String::new());
        parts.push("## SOURCE CONTEXT".to_string());
        parts.push(snippets);
    }

    (parts.join("\n"), contexts)
}
