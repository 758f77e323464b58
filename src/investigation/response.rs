//! Defensive parsing of model replies
//!
//! Models wrap JSON in prose or fences, invent placeholder paths and sometimes
//! skip the protocol entirely. Everything here degrades to a usable reply.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Which step of the protocol a reply belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Investigate,
    Patch,
    Answer,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Investigate => "INVESTIGATE",
            ActionType::Patch => "PATCH",
            ActionType::Answer => "ANSWER",
        }
    }

    /// Lenient parse; accepts any case and surrounding whitespace
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INVESTIGATE" => Some(ActionType::Investigate),
            "PATCH" => Some(ActionType::Patch),
            "ANSWER" => Some(ActionType::Answer),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fix for a file other than the main one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalFix {
    pub filepath: Option<String>,
    pub full_code_block: String,
    pub explanation: String,
}

/// A model reply after parsing, before classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Action the model claimed, if it named a valid one
    pub action: Option<ActionType>,
    pub thought: Option<String>,
    pub files_to_read: Vec<String>,
    pub filepath: Option<String>,
    pub full_code_block: String,
    pub explanation: String,
    pub root_cause_file: Option<String>,
    pub root_cause_explanation: Option<String>,
    pub additional_fixes: Vec<AdditionalFix>,
    /// True when no JSON object could be recovered from the text
    pub synthesized: bool,
}

impl ModelReply {
    /// The action this reply amounts to
    ///
    /// An explicit, valid `action_type` wins. Otherwise a non-empty
    /// `files_to_read` means INVESTIGATE, a target file or code means PATCH, and
    /// anything else is an ANSWER.
    pub fn classify(&self) -> ActionType {
        if let Some(action) = self.action {
            return action;
        }
        if !self.files_to_read.is_empty() {
            ActionType::Investigate
        } else if self.filepath.is_some() && !self.full_code_block.trim().is_empty() {
            ActionType::Patch
        } else {
            ActionType::Answer
        }
    }
}

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").unwrap());

static BRACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

/// Recover a JSON object from model output
///
/// Tried in order: the whole text, the first fenced code block, then the span
/// from the first `{` to the last `}`.
pub fn parse_json_response(text: &str) -> Option<Value> {
    let as_object = |candidate: &str| {
        serde_json::from_str::<Value>(candidate.trim())
            .ok()
            .filter(Value::is_object)
    };

    if let Some(value) = as_object(text) {
        return Some(value);
    }
    if let Some(value) = FENCED_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| as_object(m.as_str()))
    {
        return Some(value);
    }
    BRACES_RE.find(text).and_then(|m| as_object(m.as_str()))
}

/// Parse raw model output into a [`ModelReply`]
///
/// Fields are read leniently: wrong types are ignored rather than rejected.
/// Text with no recoverable object becomes an ANSWER carrying the raw output.
pub fn parse_reply(text: &str) -> ModelReply {
    let Some(value) = parse_json_response(text) else {
        tracing::warn!("Model reply was not JSON, synthesizing an answer");
        return ModelReply {
            action: Some(ActionType::Answer),
            full_code_block: text.to_string(),
            explanation: "Model returned a non-JSON response. Raw output provided.".to_string(),
            synthesized: true,
            ..Default::default()
        };
    };

    let additional_fixes = value
        .get("additional_fixes")
        .and_then(Value::as_array)
        .map(|fixes| {
            fixes
                .iter()
                .filter(|fix| fix.is_object())
                .map(|fix| AdditionalFix {
                    filepath: normalize_filepath(string_field(fix, "filepath").as_deref()),
                    full_code_block: string_field(fix, "full_code_block").unwrap_or_default(),
                    explanation: string_field(fix, "explanation").unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    let files_to_read = value
        .get("files_to_read")
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(Value::as_str)
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect()
        })
        .unwrap_or_default();

    ModelReply {
        action: string_field(&value, "action_type").and_then(|a| ActionType::parse(&a)),
        thought: string_field(&value, "thought"),
        files_to_read,
        filepath: normalize_filepath(string_field(&value, "filepath").as_deref()),
        full_code_block: string_field(&value, "full_code_block").unwrap_or_default(),
        explanation: string_field(&value, "explanation").unwrap_or_default(),
        root_cause_file: normalize_filepath(string_field(&value, "root_cause_file").as_deref()),
        root_cause_explanation: string_field(&value, "root_cause_explanation"),
        additional_fixes,
        synthesized: false,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Paths models emit when they have no real file in mind
const PLACEHOLDER_PATHS: &[&str] = &[
    "unknown",
    "path/to/file.py",
    "path/to/your/code.py",
    "path/to/your/file.py",
    "example.py",
    "your_file.py",
    "file.py",
    "",
];

static PLACEHOLDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)^path/to/", r"(?i)^your[_-]", r"(?i)^example[_-]?", r"(?i)<.*>"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Trim a model-supplied path and drop placeholders
pub fn normalize_filepath(filepath: Option<&str>) -> Option<String> {
    let trimmed = filepath?
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();

    let lower = trimmed.to_lowercase();
    if PLACEHOLDER_PATHS.contains(&lower.as_str()) {
        return None;
    }
    if PLACEHOLDER_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
        return None;
    }
    Some(trimmed.to_string())
}
