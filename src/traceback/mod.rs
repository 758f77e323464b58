//! Traceback pattern matching: language detection, stack frames and error headers
//! for Python, JavaScript/TypeScript, Go, Rust, Java/Kotlin, C#, Ruby and PHP.
//!
//! Frames always come out ordered outer → inner, so the last frame is the one where
//! the error surfaced. Every format except Python prints the innermost call first,
//! so those matches are reversed.

pub mod patterns;

use crate::language::Language;
use crate::types::{ParsedTraceback, TraceFrame};
use patterns::{FramePattern, GENERIC_ERRORS, LANGUAGE_MARKERS};
use regex::Captures;

/// Marker score per language, in detection order
pub fn language_scores(log: &str) -> Vec<(Language, usize)> {
    LANGUAGE_MARKERS
        .iter()
        .map(|(lang, markers)| {
            let score = markers.iter().filter(|m| log.contains(**m)).count();
            (*lang, score)
        })
        .collect()
}

/// Most likely language of a log; ties go to the earlier language, no markers give Unknown
pub fn detect_language(log: &str) -> Language {
    let mut best = (Language::Unknown, 0);
    for (lang, score) in language_scores(log) {
        if score > best.1 {
            best = (lang, score);
        }
    }
    best.0
}

/// Parse a log into frames and error info, detecting the language unless hinted
pub fn parse_traceback(log: &str, hint: Option<Language>) -> ParsedTraceback {
    let language = hint.unwrap_or_else(|| detect_language(log));
    let frames = extract_frames(log, language);
    let (error_type, error_message) = extract_error_info(log, language);

    tracing::debug!(
        language = %language,
        frames = frames.len(),
        error_type = error_type.as_deref().unwrap_or(""),
        "Parsed traceback"
    );

    ParsedTraceback {
        frames,
        error_type,
        error_message,
        language,
        raw: log.to_string(),
    }
}

fn frame_from(caps: &Captures, pattern: &FramePattern, language: Language) -> Option<TraceFrame> {
    let group = |idx: Option<usize>| {
        idx.and_then(|i| caps.get(i))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
    };

    let fields = pattern.fields;
    let filepath = group(Some(fields.file))?;
    let line_number: usize = group(Some(fields.line))?.parse().ok()?;
    if line_number == 0 {
        return None;
    }

    Some(TraceFrame {
        filepath: filepath.to_string(),
        line_number,
        function_name: group(fields.function).map(str::to_string),
        column_number: group(fields.column).and_then(|c| c.parse().ok()),
        language,
    })
}

/// Stack frames ordered outer → inner, without exact duplicates
pub fn extract_frames(log: &str, language: Language) -> Vec<TraceFrame> {
    let mut found: Vec<(usize, TraceFrame)> = Vec::new();

    for pattern in patterns::frame_patterns(language) {
        for caps in pattern.regex.captures_iter(log) {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            if let Some(frame) = frame_from(&caps, pattern, language) {
                found.push((start, frame));
            }
        }
    }

    // Stable sort keeps pattern order for matches at the same offset
    found.sort_by_key(|(start, _)| *start);

    let mut frames: Vec<TraceFrame> = Vec::new();
    for (_, frame) in found {
        if !frames.contains(&frame) {
            frames.push(frame);
        }
    }

    if language != Language::Python {
        frames.reverse();
    }
    frames
}

/// Error type and message; one-group patterns yield a message only
pub fn extract_error_info(log: &str, language: Language) -> (Option<String>, Option<String>) {
    for regex in patterns::error_patterns(language) {
        if let Some(caps) = regex.captures(log) {
            let first = caps.get(1).map(|m| m.as_str().trim().to_string());
            return match caps.get(2) {
                Some(message) => (first, Some(message.as_str().trim().to_string())),
                None => (None, first),
            };
        }
    }

    for regex in GENERIC_ERRORS.iter() {
        if let Some(caps) = regex.captures(log) {
            return (None, caps.get(1).map(|m| m.as_str().trim().to_string()));
        }
    }

    (None, None)
}

/// `(path, line)` for every frame, detecting the language unless hinted
pub fn extract_file_line_pairs(log: &str, hint: Option<Language>) -> Vec<(String, usize)> {
    let language = hint.unwrap_or_else(|| detect_language(log));
    extract_frames(log, language)
        .into_iter()
        .map(|f| (f.filepath, f.line_number))
        .collect()
}

#[cfg(test)]
mod tests;
