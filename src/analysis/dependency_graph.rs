//! File-level import graph with forward and reverse edges

use crate::language::Language;
use crate::paths::canonical_key;
use crate::types::{FileContext, Import};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Default bound for transitive walks
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// One file in the graph
#[derive(Debug, Clone, Serialize)]
pub struct DependencyNode {
    pub filepath: PathBuf,
    pub language: Language,
    pub imports: Vec<Import>,
    pub imported_by: BTreeSet<PathBuf>,
}

impl DependencyNode {
    fn new(filepath: PathBuf, language: Language) -> Self {
        Self {
            filepath,
            language,
            imports: Vec::new(),
            imported_by: BTreeSet::new(),
        }
    }

    pub fn filename(&self) -> String {
        self.filepath
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File stem, or the package directory name for `__init__` files
    pub fn module_name(&self) -> String {
        let stem = self
            .filepath
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if stem == "__init__" {
            return self
                .filepath
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(stem);
        }
        stem
    }
}

/// Import graph keyed by canonical absolute path
///
/// `edges[a]` contains `b` exactly when `reverse_edges[b]` contains `a`.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    project_root: PathBuf,
    nodes: BTreeMap<PathBuf, DependencyNode>,
    edges: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    reverse_edges: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl DependencyGraph {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    /// Relative paths are taken against the project root
    fn key(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            canonical_key(path)
        } else {
            canonical_key(&self.project_root.join(path))
        }
    }

    /// Insert or replace a file and its resolved imports
    ///
    /// Revisiting a file overwrites its import list and drops edges it no longer has.
    pub fn add_file(&mut self, filepath: impl AsRef<Path>, language: Language, imports: Vec<Import>) {
        let source = self.key(filepath);

        if let Some(old_targets) = self.edges.remove(&source) {
            for target in old_targets {
                if let Some(sources) = self.reverse_edges.get_mut(&target) {
                    sources.remove(&source);
                    if sources.is_empty() {
                        self.reverse_edges.remove(&target);
                    }
                }
                if let Some(node) = self.nodes.get_mut(&target) {
                    node.imported_by.remove(&source);
                }
            }
        }

        let targets: BTreeSet<PathBuf> = imports
            .iter()
            .filter_map(|import| import.resolved_path.as_deref())
            .map(|resolved| self.key(resolved))
            .filter(|target| *target != source)
            .collect();

        for target in &targets {
            let node = self.nodes.entry(target.clone()).or_insert_with(|| {
                DependencyNode::new(target.clone(), Language::from_path(target))
            });
            node.imported_by.insert(source.clone());
            self.reverse_edges
                .entry(target.clone())
                .or_default()
                .insert(source.clone());
        }

        let node = self
            .nodes
            .entry(source.clone())
            .or_insert_with(|| DependencyNode::new(source.clone(), language));
        node.language = language;
        node.imports = imports;

        if !targets.is_empty() {
            self.edges.insert(source, targets);
        }
    }

    pub fn add_file_context(&mut self, context: &FileContext) {
        self.add_file(&context.filepath, context.language, context.imports.clone());
    }

    /// Files imported directly by `filepath`
    pub fn dependencies(&self, filepath: impl AsRef<Path>) -> Vec<PathBuf> {
        self.edges
            .get(&self.key(filepath))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Files that import `filepath` directly
    pub fn dependents(&self, filepath: impl AsRef<Path>) -> Vec<PathBuf> {
        self.reverse_edges
            .get(&self.key(filepath))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn transitive_dependencies(&self, filepath: impl AsRef<Path>, max_depth: usize) -> Vec<PathBuf> {
        bfs(&self.edges, self.key(filepath), max_depth)
    }

    pub fn transitive_dependents(&self, filepath: impl AsRef<Path>, max_depth: usize) -> Vec<PathBuf> {
        bfs(&self.reverse_edges, self.key(filepath), max_depth)
    }

    /// Shortest import path from `source` to `target`, both included
    pub fn path_between(&self, source: impl AsRef<Path>, target: impl AsRef<Path>) -> Option<Vec<PathBuf>> {
        let source = self.key(source);
        let target = self.key(target);
        if source == target {
            return Some(vec![source]);
        }

        let mut previous: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        let mut visited: HashSet<PathBuf> = HashSet::from([source.clone()]);
        let mut queue = VecDeque::from([source.clone()]);

        while let Some(current) = queue.pop_front() {
            for next in self.edges.get(&current).into_iter().flatten() {
                if !visited.insert(next.clone()) {
                    continue;
                }
                previous.insert(next.clone(), current.clone());
                if *next == target {
                    let mut path = vec![target.clone()];
                    let mut cursor = &target;
                    while let Some(prev) = previous.get(cursor) {
                        path.push(prev.clone());
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next.clone());
            }
        }
        None
    }

    /// Files every input transitively depends on
    pub fn common_dependencies<P: AsRef<Path>>(&self, files: &[P]) -> Vec<PathBuf> {
        let Some((first, rest)) = files.split_first() else {
            return Vec::new();
        };
        let mut common: BTreeSet<PathBuf> = self
            .transitive_dependencies(first, DEFAULT_MAX_DEPTH)
            .into_iter()
            .collect();
        for file in rest {
            let deps: BTreeSet<PathBuf> = self
                .transitive_dependencies(file, DEFAULT_MAX_DEPTH)
                .into_iter()
                .collect();
            common = common.intersection(&deps).cloned().collect();
        }
        common.into_iter().collect()
    }

    pub fn node(&self, filepath: impl AsRef<Path>) -> Option<&DependencyNode> {
        self.nodes.get(&self.key(filepath))
    }

    pub fn all_files(&self) -> Vec<PathBuf> {
        self.nodes.keys().cloned().collect()
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Every forward edge as (source, target)
    pub fn edge_pairs(&self) -> Vec<(PathBuf, PathBuf)> {
        self.edges
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (from.clone(), to.clone())))
            .collect()
    }

    /// Every reverse edge as (target, source)
    pub fn reverse_edge_pairs(&self) -> Vec<(PathBuf, PathBuf)> {
        self.reverse_edges
            .iter()
            .flat_map(|(to, sources)| sources.iter().map(move |from| (to.clone(), from.clone())))
            .collect()
    }

    /// Text block with node and edge counts and the five most imported files
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Dependency Graph Summary:".to_string(),
            format!("  Files: {}", self.nodes.len()),
            format!(
                "  Direct Dependencies: {}",
                self.edges.values().map(BTreeSet::len).sum::<usize>()
            ),
        ];

        let mut counts: Vec<(&PathBuf, usize)> = self
            .reverse_edges
            .iter()
            .map(|(path, sources)| (path, sources.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        if !counts.is_empty() {
            lines.push("\n  Most Imported Files:".to_string());
            for (path, count) in counts.into_iter().take(5) {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                lines.push(format!("    {}: imported by {} files", name, count));
            }
        }

        lines.join("\n")
    }

    /// JSON view of nodes and edges
    pub fn to_json(&self) -> serde_json::Value {
        let nodes: serde_json::Map<String, serde_json::Value> = self
            .nodes
            .iter()
            .map(|(path, node)| {
                (
                    path.display().to_string(),
                    serde_json::json!({
                        "filepath": node.filepath.display().to_string(),
                        "language": node.language.as_str(),
                        "imports": node.imports.iter().map(|i| i.module_name.as_str()).collect::<Vec<_>>(),
                        "imported_by": node
                            .imported_by
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>(),
                    }),
                )
            })
            .collect();

        let edges: serde_json::Map<String, serde_json::Value> = self
            .edges
            .iter()
            .map(|(from, targets)| {
                let targets: Vec<String> = targets.iter().map(|t| t.display().to_string()).collect();
                (from.display().to_string(), serde_json::json!(targets))
            })
            .collect();

        serde_json::json!({
            "project_root": self.project_root.display().to_string(),
            "nodes": nodes,
            "edges": edges,
        })
    }
}

fn bfs(
    adjacency: &BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    start: PathBuf,
    max_depth: usize,
) -> Vec<PathBuf> {
    let mut visited: HashSet<PathBuf> = HashSet::from([start.clone()]);
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut result = Vec::new();

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for next in adjacency.get(&current).into_iter().flatten() {
            if visited.insert(next.clone()) {
                result.push(next.clone());
                queue.push_back((next.clone(), depth + 1));
            }
        }
    }
    result
}
