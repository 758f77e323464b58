use super::*;
use std::fs;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// main.py calls into service.py, which imports models.py
fn python_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "main.py", "from service import run\n\n\ndef main():\n    run()\n");
    write(
        root,
        "service.py",
        "from models import User\n\n\ndef run():\n    user = User()\n    return user.name\n",
    );
    write(root, "models.py", "class User:\n    pass\n");
    tmp
}

fn python_log(root: &Path) -> String {
    format!(
        "Traceback (most recent call last):\n  File \"{}\", line 5, in main\n    run()\n  File \"{}\", line 6, in run\n    return user.name\nAttributeError: 'User' object has no attribute 'name'",
        root.join("main.py").display(),
        root.join("service.py").display()
    )
}

#[test]
fn test_primary_context_is_innermost_frame() {
    let tmp = python_project();
    let mut builder = ContextBuilder::new(tmp.path());
    let ctx = builder.build_analysis_context(&python_log(tmp.path()), None);

    assert!(ctx.primary_context.filepath.ends_with("service.py"));
    assert_eq!(ctx.primary_context.function_name.as_deref(), Some("run"));
    assert_eq!(ctx.primary_context.context_type, ContextType::Ast);
    assert_eq!(ctx.traceback_contexts.len(), 2);
    assert!(ctx.error_analysis.is_none());
}

#[test]
fn test_upstream_includes_imported_file_outside_traceback() {
    let tmp = python_project();
    let mut builder = ContextBuilder::new(tmp.path());
    let ctx = builder.build_analysis_context(&python_log(tmp.path()), None);

    let upstream = ctx.upstream_context.expect("upstream context");
    let files: Vec<&str> = upstream
        .file_contexts
        .iter()
        .map(|c| c.filepath.as_str())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("models.py"));
    assert_eq!(upstream.call_chain.len(), 2);
    assert!(upstream.dependency_summary.starts_with("Dependency Graph Summary:"));

    let service = ctx
        .traceback_contexts
        .iter()
        .find(|c| c.filepath.ends_with("service.py"))
        .unwrap();
    assert!(service.imports[0].resolved_path.is_some());
}

#[test]
fn test_upstream_respects_cap() {
    let tmp = python_project();
    let config = Config {
        context: crate::config::ContextConfig {
            max_upstream_files: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut builder = ContextBuilder::with_config(tmp.path(), &config, None);
    let ctx = builder.build_analysis_context(&python_log(tmp.path()), None);

    let upstream = ctx.upstream_context.expect("call chain keeps the section");
    assert!(upstream.file_contexts.is_empty());
}

#[test]
fn test_resolve_file_path_strategies() {
    let tmp = python_project();
    write(tmp.path(), "pkg/deep/handlers.py", "x = 1\n");
    write(tmp.path(), "node_modules/dep/skipped.js", "x\n");
    let builder = ContextBuilder::new(tmp.path());

    let absolute = tmp.path().join("main.py").display().to_string();
    assert_eq!(builder.resolve_file_path(&absolute), Some(tmp.path().join("main.py")));
    assert_eq!(builder.resolve_file_path("/models.py"), Some(tmp.path().join("models.py")));
    assert_eq!(
        builder.resolve_file_path("/srv/app/handlers.py"),
        Some(tmp.path().join("pkg/deep/handlers.py"))
    );
    assert_eq!(builder.resolve_file_path("/x/skipped.js"), None);
    assert_eq!(builder.resolve_file_path("/x/absent.py"), None);
}

#[test]
fn test_minimal_context_uses_relevant_files() {
    let tmp = python_project();
    write(tmp.path(), "routes/users.py", "def list_users():\n    return []\n");
    let mut builder = ContextBuilder::new(tmp.path());
    let ctx = builder.build_analysis_context("KeyError raised in users.py handler", None);

    let analysis = ctx.error_analysis.as_ref().unwrap();
    assert_eq!(analysis.error_category, "python_key");
    assert!(ctx.primary_context.filepath.ends_with("users.py"));
    assert_eq!(ctx.primary_context.line_number, 1);
    assert!(ctx.upstream_context.unwrap().dependency_summary.contains("Project Type:"));
}

#[test]
fn test_minimal_context_synthetic_primary() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "README.md", "# nothing to scan\n");
    let mut builder = ContextBuilder::new(tmp.path());
    let ctx = builder.build_analysis_context("everything is on fire", None);

    assert_eq!(ctx.primary_context.filepath, ERROR_LOG_PATH);
    assert_eq!(ctx.primary_context.context_type, ContextType::ErrorAnalysis);
    assert_eq!(ctx.primary_context.content, "everything is on fire");
    assert!(ctx.traceback_contexts.is_empty());
    assert!(ctx.upstream_context.is_none());

    let prompt = builder.context_for_prompt(&ctx, true, true, true);
    assert!(prompt.contains("(No specific file path in error)"));
    assert!(prompt.contains("Error Message:\neverything is on fire"));
}

#[test]
fn test_context_for_prompt_section_order() {
    let tmp = python_project();
    let mut builder = ContextBuilder::new(tmp.path());
    let ctx = builder.build_analysis_context(&python_log(tmp.path()), None);
    let prompt = builder.context_for_prompt(&ctx, true, true, true);

    let order = [
        "## PROJECT INFORMATION",
        "<ProjectStructure>",
        "## FILE TREE",
        "</ProjectStructure>",
        "## PRIMARY ERROR LOCATION",
        "## CALL STACK CONTEXT",
        "## UPSTREAM CONTEXT (for root cause analysis)",
    ];
    let positions: Vec<usize> = order.iter().map(|s| prompt.find(s).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(prompt.contains("Function: run"));

    let bare = builder.context_for_prompt(&ctx, false, false, false);
    assert!(bare.starts_with("## PRIMARY ERROR LOCATION"));
    assert!(!bare.contains("UPSTREAM CONTEXT"));
}

#[test]
fn test_file_tree_cached_per_builder() {
    let tmp = python_project();
    let builder = ContextBuilder::new(tmp.path());
    let first = builder.file_tree().to_string();
    write(tmp.path(), "late.py", "");
    assert_eq!(builder.file_tree(), first);
    assert!(!first.contains("late.py"));
}

#[test]
fn test_deep_context_checks_mentioned_files() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "server.js", "const express = require('express');\n");
    write(tmp.path(), "public/app.css", "body {}\n");
    let mut builder = ContextBuilder::new(tmp.path());

    let deep = builder.deep_context("Error: Cannot GET /public/index.html", None);
    assert!(deep.contains("- /public/index.html: MISSING"));
    assert!(deep.contains("### FILE: server.js"));
    assert!(deep.contains("- public/: app.css"));
    assert!(deep.contains("- static/: DOES NOT EXIST"));
}
