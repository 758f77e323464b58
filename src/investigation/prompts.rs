//! Prompt text for the two investigation rounds

/// Instructions for the first round, where the model only picks files to read
pub const INVESTIGATE_SYSTEM_PROMPT: &str = r#"You are a debugging assistant working on a real project.
This is the INVESTIGATE step. You cannot see any source code yet.

Study the error log, the files detected in the traceback and the project tree,
then decide which files you need to read before you can fix or explain the error.

RULES:
1. Return ONLY a JSON object. No prose outside it.
2. Only request files that appear in the project tree. Use paths relative to the project root.
3. Always include the files from the traceback that belong to the project.
4. Request at most 10 files.

OUTPUT FORMAT:
{
  "action_type": "INVESTIGATE",
  "thought": "What you suspect and why these files matter",
  "files_to_read": ["src/app.py", "src/models.py"]
}
"#;

/// Instructions for the second round, where the model patches or answers
pub const PATCH_SYSTEM_PROMPT: &str = r#"You are a debugging assistant working on a real project.
You now have the contents of the files you asked for.

Choose ONE action:
- PATCH when source code must change to fix the error.
- ANSWER when the problem is configuration, environment or a question about the project,
  or when the files do not contain the cause.

RULES:
1. Return ONLY a JSON object. No prose outside it.
2. "full_code_block" holds the COMPLETE corrected code for the changed function, class or file.
   Do not include line numbers or ">>" markers.
3. Use file paths exactly as they appear in the project tree. Never invent a path;
   use null when no project file is involved.
4. If the bug originates in a different file than the one that failed, set
   "root_cause_file" and "root_cause_explanation".
5. Fix only the reported error. Do not add unrelated changes.

OUTPUT FORMAT:
{
  "action_type": "PATCH" or "ANSWER",
  "filepath": "src/app.py" or null,
  "full_code_block": "complete corrected code, or \"\" for ANSWER",
  "explanation": "What was wrong and what changed, or the answer",
  "root_cause_file": "src/models.py" (optional),
  "root_cause_explanation": "Why the bug originates there" (optional),
  "additional_fixes": [
    {"filepath": "src/other.py", "full_code_block": "...", "explanation": "..."}
  ] (optional)
}
"#;

/// First-round prompt: the log, the traceback files and the tree
pub fn investigate_prompt(error_log: &str, traceback_files: &[String], file_tree: &str) -> String {
    let mut parts = vec![
        INVESTIGATE_SYSTEM_PROMPT.to_string(),
        "## ERROR LOG".to_string(),
        "```".to_string(),
        error_log.to_string(),
        "```".to_string(),
        String::new(),
        "## FILES DETECTED IN TRACEBACK".to_string(),
    ];
    if traceback_files.is_empty() {
        parts.push("(none)".to_string());
    } else {
        parts.extend(traceback_files.iter().map(|f| format!("- {}", f)));
    }
    parts.push(String::new());
    parts.push(project_structure(file_tree));
    parts.join("\n")
}

/// Second-round prompt: the log, the tree and every file read, in read order
pub fn patch_prompt(error_log: &str, file_tree: &str, files: &[(String, String)]) -> String {
    let mut parts = vec![
        PATCH_SYSTEM_PROMPT.to_string(),
        "## ERROR LOG".to_string(),
        "```".to_string(),
        error_log.to_string(),
        "```".to_string(),
        String::new(),
        project_structure(file_tree),
        String::new(),
        "## SOURCE FILES".to_string(),
    ];
    for (path, content) in files {
        parts.push(format!("\n### FILE: {}", path));
        parts.push("```".to_string());
        parts.push(content.clone());
        parts.push("```".to_string());
    }
    parts.join("\n")
}

fn project_structure(file_tree: &str) -> String {
    format!(
        "<ProjectStructure>\n## PROJECT FILE TREE\n```\n{}\n```\n</ProjectStructure>",
        file_tree
    )
}
