//! Two-round investigation: the model first picks files, then patches or answers
//!
//! Round one shows the model the error log, the traceback files and the project
//! tree, and asks only for a list of files to read. The engine merges that list
//! with the traceback files, reads them from inside the project root and sends
//! their contents in round two, which must end in a PATCH or an ANSWER.

pub mod prompts;
pub mod response;
pub mod transport;

pub use response::{ActionType, AdditionalFix, ModelReply, normalize_filepath, parse_reply};
pub use transport::{GeminiClient, KeyPool, ModelClient, Transport, TransportStats};

use crate::analysis::context_builder::ContextBuilder;
use crate::analysis::error_analyzer::ErrorAnalyzer;
use crate::error::DeepfixError;
use crate::language::Language;
use crate::paths::{confine_to_root, relative_to};
use crate::traceback::parse_traceback;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Where a file on the read list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOrigin {
    /// Requested by the model in round one
    Model,
    /// A traceback frame inside the project
    Traceback,
    /// Picked by error analysis when nothing else was available
    Heuristic,
}

/// One file the engine actually read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRead {
    pub path: String,
    pub origin: FileOrigin,
}

/// Final outcome of an investigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixResult {
    pub action_type: ActionType,
    pub filepath: Option<String>,
    pub full_code_block: String,
    pub explanation: String,
    pub root_cause_file: Option<String>,
    pub root_cause_explanation: Option<String>,
    pub additional_fixes: Vec<AdditionalFix>,
    /// Audit trail of every file whose contents reached the model
    pub files_read: Vec<FileRead>,
    pub model_used: String,
    pub raw_response: String,
}

impl FixResult {
    fn answer(
        explanation: String,
        files_read: Vec<FileRead>,
        model_used: String,
        raw_response: String,
    ) -> Self {
        Self {
            action_type: ActionType::Answer,
            filepath: None,
            full_code_block: String::new(),
            explanation,
            root_cause_file: None,
            root_cause_explanation: None,
            additional_fixes: Vec::new(),
            files_read,
            model_used,
            raw_response,
        }
    }

    fn from_reply(
        reply: ModelReply,
        action_type: ActionType,
        files_read: Vec<FileRead>,
        model_used: String,
        raw_response: String,
    ) -> Self {
        Self {
            action_type,
            filepath: reply.filepath,
            full_code_block: reply.full_code_block,
            explanation: reply.explanation,
            root_cause_file: reply.root_cause_file,
            root_cause_explanation: reply.root_cause_explanation,
            additional_fixes: reply.additional_fixes,
            files_read,
            model_used,
            raw_response,
        }
    }

    pub fn is_patch(&self) -> bool {
        self.action_type == ActionType::Patch
    }
}

pub struct InvestigationEngine<C> {
    transport: Transport<C>,
    builder: ContextBuilder,
}

impl<C: ModelClient> InvestigationEngine<C> {
    pub fn new(transport: Transport<C>, builder: ContextBuilder) -> Self {
        Self { transport, builder }
    }

    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    pub fn project_root(&self) -> &Path {
        self.builder.project_root()
    }

    /// Run both rounds for `error_log`
    ///
    /// Only transport failures are returned as errors. Protocol problems, such
    /// as unreadable files or a model that keeps investigating, end in an ANSWER.
    pub async fn investigate(
        &self,
        error_log: &str,
        language_hint: Option<Language>,
    ) -> Result<FixResult, DeepfixError> {
        let traceback = parse_traceback(error_log, language_hint);
        let traceback_files = self.traceback_files(&traceback.files());
        let file_tree = self.builder.file_tree();

        tracing::info!(
            root = %self.project_root().display(),
            traceback_files = traceback_files.len(),
            "Starting investigation"
        );

        let prompt = prompts::investigate_prompt(error_log, &traceback_files, file_tree);
        let (raw, model) = self.transport.generate(&prompt).await?;
        let reply = parse_reply(&raw);
        let claimed = reply.classify();
        if claimed != ActionType::Investigate {
            tracing::warn!(model = %model, claimed = %claimed, "First round skipped INVESTIGATE, re-classifying");
        }

        let plan = self.read_plan(error_log, &reply.files_to_read, &traceback_files);
        let (contents, files_read) = self.read_files(&plan).await;

        if files_read.is_empty() {
            let requested: Vec<&str> = plan.iter().map(|f| f.path.as_str()).collect();
            let explanation = if requested.is_empty() {
                "No project files could be identified for this error, so no fix was attempted.".to_string()
            } else {
                format!(
                    "None of the requested files could be read from the project: {}",
                    requested.join(", ")
                )
            };
            return Ok(FixResult::answer(explanation, files_read, model, raw));
        }

        let unread: Vec<&str> = traceback_files
            .iter()
            .filter(|f| !files_read.iter().any(|r| &r.path == *f))
            .map(String::as_str)
            .collect();
        if !unread.is_empty() {
            let explanation = format!(
                "Files from the traceback could not be read, so a reliable fix is not possible: {}",
                unread.join(", ")
            );
            return Ok(FixResult::answer(explanation, files_read, model, raw));
        }

        let prompt = prompts::patch_prompt(error_log, file_tree, &contents);
        let (raw, model) = self.transport.generate(&prompt).await?;
        let reply = parse_reply(&raw);

        let result = match reply.classify() {
            ActionType::Investigate => {
                let wanted = if reply.files_to_read.is_empty() {
                    "no specific files named".to_string()
                } else {
                    reply.files_to_read.join(", ")
                };
                FixResult::answer(
                    format!("The investigation needs more files before a fix can be made: {}", wanted),
                    files_read,
                    model,
                    raw,
                )
            }
            action => FixResult::from_reply(reply, action, files_read, model, raw),
        };

        let stats = self.transport.stats();
        tracing::info!(
            action = %result.action_type,
            model = %result.model_used,
            files_read = result.files_read.len(),
            key_rotations = stats.key_rotations,
            model_fallbacks = stats.model_fallbacks,
            "Investigation finished"
        );
        Ok(result)
    }

    /// Frame paths that resolve to files inside the project root, root-relative
    fn traceback_files(&self, frame_paths: &[String]) -> Vec<String> {
        let root = self.project_root();
        let mut files: Vec<String> = Vec::new();
        for frame_path in frame_paths {
            let Some(resolved) = self.builder.resolve_file_path(frame_path) else {
                continue;
            };
            if let Some(rel) = relative_to(root, &resolved)
                && !files.contains(&rel)
            {
                files.push(rel);
            }
        }
        files
    }

    /// Files to read, deduplicated: model picks, traceback files, then heuristics
    fn read_plan(
        &self,
        error_log: &str,
        requested: &[String],
        traceback_files: &[String],
    ) -> Vec<FileRead> {
        let root = self.project_root();
        let mut plan: Vec<FileRead> = Vec::new();

        for path in requested {
            if let Some(path) = normalize_filepath(Some(path)) {
                push_planned(&mut plan, root, &path, FileOrigin::Model);
            }
        }
        for path in traceback_files {
            push_planned(&mut plan, root, path, FileOrigin::Traceback);
        }

        if plan.is_empty() {
            let analysis =
                ErrorAnalyzer::new(Some(Arc::clone(self.builder.scanner()))).analyze(error_log);
            let entry_points = &self.builder.project_info().entry_points;
            for file in analysis.relevant_files.iter().chain(entry_points) {
                push_planned(&mut plan, root, &file.path, FileOrigin::Heuristic);
            }
        }
        plan
    }

    /// Read every planned file that stays inside the project root
    async fn read_files(&self, plan: &[FileRead]) -> (Vec<(String, String)>, Vec<FileRead>) {
        let root = self.project_root();
        let mut contents: Vec<(String, String)> = Vec::new();
        let mut files_read: Vec<FileRead> = Vec::new();

        for file in plan {
            let Some(path) = confine_to_root(root, &file.path) else {
                tracing::warn!(file = %file.path, "Refusing to read file outside the project root");
                continue;
            };
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    tracing::debug!(file = %file.path, origin = ?file.origin, "Read file for investigation");
                    contents.push((file.path.clone(), content));
                    files_read.push(file.clone());
                }
                Err(e) => {
                    tracing::warn!(file = %file.path, error = %e, "Could not read requested file");
                }
            }
        }

        (contents, files_read)
    }
}

fn push_planned(plan: &mut Vec<FileRead>, root: &Path, path: &str, origin: FileOrigin) {
    let key = plan_key(root, path);
    if !key.is_empty() && !plan.iter().any(|f| f.path == key) {
        plan.push(FileRead { path: key, origin });
    }
}

/// Root-relative form of a requested path, used for deduplication
fn plan_key(root: &Path, path: &str) -> String {
    let trimmed = path.trim();
    let as_path = Path::new(trimmed);
    if as_path.is_absolute() {
        return relative_to(root, as_path).unwrap_or_else(|| trimmed.to_string());
    }
    trimmed.trim_start_matches("./").to_string()
}
