//! Indented file-tree rendering

use super::{gitignore_matches, is_skipped_dir, load_gitignore};
use crate::paths::relative_to;
use std::path::Path;

/// Render the tree under `root`
///
/// Directories come before files, each group sorted by name. Hidden entries are
/// skipped unless `show_hidden`; deny-listed directories and `.gitignore` matches
/// are always skipped. A directory with more than `max_files_per_dir` entries
/// ends with a `... (N more items)` line.
pub fn render(root: &Path, max_depth: usize, max_files_per_dir: usize, show_hidden: bool) -> String {
    let patterns = load_gitignore(root);
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let mut lines = vec![format!("{}/", name)];
    let walk = TreeWalk {
        root,
        patterns: &patterns,
        max_depth,
        max_files_per_dir,
        show_hidden,
    };
    walk.build(root, "", 0, &mut lines);
    lines.join("\n")
}

struct TreeWalk<'a> {
    root: &'a Path,
    patterns: &'a [String],
    max_depth: usize,
    max_files_per_dir: usize,
    show_hidden: bool,
}

impl TreeWalk<'_> {
    fn build(&self, dir: &Path, prefix: &str, depth: usize, lines: &mut Vec<String>) {
        if depth >= self.max_depth {
            return;
        }
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            tracing::debug!("Cannot list {}", dir.display());
            return;
        };

        let mut names: Vec<(String, bool)> = read_dir
            .filter_map(Result::ok)
            .map(|entry| {
                let is_dir = entry.path().is_dir();
                (entry.file_name().to_string_lossy().into_owned(), is_dir)
            })
            .filter(|(name, is_dir)| !self.skip(dir, name, *is_dir))
            .collect();
        names.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let total = names.len();
        let truncated = total.saturating_sub(self.max_files_per_dir);
        names.truncate(self.max_files_per_dir);
        let shown = names.len();

        for (i, (name, is_dir)) in names.into_iter().enumerate() {
            let is_last = i + 1 == shown && truncated == 0;
            let (connector, extension) = if is_last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };

            if is_dir {
                lines.push(format!("{prefix}{connector}{name}/"));
                let child_prefix = format!("{prefix}{extension}");
                self.build(&dir.join(&name), &child_prefix, depth + 1, lines);
            } else {
                lines.push(format!("{prefix}{connector}{name}"));
            }
        }

        if truncated > 0 {
            lines.push(format!("{prefix}└── ... ({truncated} more items)"));
        }
    }

    fn skip(&self, dir: &Path, name: &str, is_dir: bool) -> bool {
        if !self.show_hidden && name.starts_with('.') {
            return true;
        }
        if is_dir && is_skipped_dir(name) {
            return true;
        }
        let rel = relative_to(self.root, &dir.join(name)).unwrap_or_default();
        gitignore_matches(self.patterns, name, &rel)
    }
}
