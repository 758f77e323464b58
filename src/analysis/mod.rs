//! Project-level analysis: import resolution, dependency and call graphs,
//! project scanning, error classification and context assembly.

pub mod call_chain;
pub mod context_builder;
pub mod dependency_graph;
pub mod error_analyzer;
pub mod extract;
pub mod import_resolver;
pub mod project_scanner;
pub mod scan_cache;

pub use call_chain::{CallChain, CallChainAnalyzer, CallSite};
pub use context_builder::ContextBuilder;
pub use dependency_graph::DependencyGraph;
pub use error_analyzer::{ErrorAnalysis, ErrorAnalyzer};
pub use extract::ContextExtractor;
pub use import_resolver::ImportResolver;
pub use project_scanner::{ProjectFile, ProjectInfo, ProjectScanner};
pub use scan_cache::ScanCache;
