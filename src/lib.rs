//! # deepfix - Error Context Builder and Investigation Engine
//!
//! Turns a raw error log into the context a language model needs to repair the
//! code that failed, then drives a two-round conversation with the model that
//! ends in a patch or an answer.
//!
//! ## Overview
//!
//! Stack traces from Python, JavaScript/TypeScript, Go, Rust, Java, C#, Ruby, PHP
//! and C/C++ are parsed into frames. Each frame's file is read and the enclosing
//! function or class is extracted with a native parser (Python) or a tree-sitter
//! grammar, falling back to a window of lines. Imports are resolved to project
//! files, a dependency graph and call chain are built, and upstream files the
//! traceback never mentions are pulled in for root-cause analysis. Logs without
//! frames are classified by an error analyzer that finds relevant files by
//! keyword.
//!
//! ## Key Features
//!
//! - **Traceback Parsing**: Per-language frame patterns with language detection
//! - **Symbol Extraction**: Tree-sitter grammars for 10 languages plus a native Python parser
//! - **Import Resolution**: Python, JS/TS, Go, Rust, Java, C#, Ruby, PHP and C/C++ rules
//! - **Project Scanning**: Gitignore-aware scan with framework and entry point detection
//! - **Investigation**: INVESTIGATE then PATCH/ANSWER, with key rotation and model fallback
//!
//! ## Architecture
//!
//! ```text
//! error log ──► traceback ──► ContextBuilder ──► prompt text
//!                               │
//!        ┌──────────────┬───────┴──────┬────────────────┐
//!        │              │              │                │
//!   parsers      import_resolver  dependency_graph  project_scanner
//!                                                       │
//!                                                 error_analyzer
//!
//! InvestigationEngine ──► Transport ──► ModelClient (Gemini)
//! ```
//!
//! ## Modules
//!
//! - [`traceback`]: Language detection and frame extraction
//! - [`parsers`]: Parser registry, native Python parser and tree-sitter parsers
//! - [`analysis`]: Import resolution, dependency graph, call chains, scanning and context assembly
//! - [`context_reader`]: Frame snippets without a project scan
//! - [`investigation`]: Two-round model protocol and resilient transport
//! - [`config`]: Configuration management with environment variable support
//! - [`types`]: Shared data model
//! - [`error`]: Error types
//! - [`paths`]: Path normalization and root confinement
//!
//! ## Usage Example
//!
//! ```no_run
//! use deepfix::analysis::ContextBuilder;
//!
//! let log = std::fs::read_to_string("error.log").unwrap();
//! let mut builder = ContextBuilder::new("/path/to/project");
//! let ctx = builder.build_analysis_context(&log, None);
//! println!("{}", builder.context_for_prompt(&ctx, true, true, true));
//! ```

/// Import resolution, dependency graph, call chains, project scanning and context assembly
pub mod analysis;

/// Configuration management with environment variable overrides
pub mod config;

/// Traceback snippets read straight from the frame paths
pub mod context_reader;

/// Error types and utilities
pub mod error;

/// Two-round INVESTIGATE then PATCH/ANSWER engine with model transport
pub mod investigation;

/// Source languages and their file extensions
pub mod language;

/// Per-language source parsers behind a common trait
pub mod parsers;

/// Path normalization and utility functions
pub mod paths;

/// Stack trace parsing and language detection
pub mod traceback;

/// Shared data model: symbols, imports, frames and file contexts
pub mod types;
