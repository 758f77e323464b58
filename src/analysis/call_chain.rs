//! Call chains built from traceback frames and extracted file contexts

use crate::language::Language;
use crate::parsers::{ParserRegistry, SourceParser};
use crate::types::{FileContext, ParsedTraceback, TraceFrame};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// One step of a call chain
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub filepath: String,
    pub line_number: usize,
    pub function_name: Option<String>,
    pub called_function: Option<String>,
    pub language: Language,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = Path::new(&self.filepath)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filepath.clone());
        write!(
            f,
            "{}:{} {}",
            file,
            self.line_number,
            self.function_name.as_deref().unwrap_or("<module>")
        )?;
        if let Some(called) = &self.called_function {
            write!(f, " -> {}", called)?;
        }
        Ok(())
    }
}

/// Ordered call sites from entry point to error
#[derive(Debug, Clone, Default)]
pub struct CallChain {
    pub sites: Vec<CallSite>,
    pub error_frame: Option<TraceFrame>,
}

impl CallChain {
    pub fn entry_point(&self) -> Option<&CallSite> {
        self.sites.first()
    }

    pub fn error_site(&self) -> Option<&CallSite> {
        self.sites.last()
    }

    pub fn to_string_list(&self) -> Vec<String> {
        self.sites.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for CallChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_list().join(" -> "))
    }
}

/// Builds call chains and does light source searches over them
pub struct CallChainAnalyzer {
    project_root: PathBuf,
    source_cache: HashMap<String, Option<String>>,
}

impl CallChainAnalyzer {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            source_cache: HashMap::new(),
        }
    }

    /// One site per frame; each site's callee is the next frame's function
    pub fn analyze_traceback(&self, traceback: &ParsedTraceback) -> CallChain {
        let frames = &traceback.frames;
        let sites = frames
            .iter()
            .enumerate()
            .map(|(i, frame)| CallSite {
                filepath: frame.filepath.clone(),
                line_number: frame.line_number,
                function_name: frame.function_name.clone(),
                called_function: frames.get(i + 1).and_then(|next| next.function_name.clone()),
                language: frame.language,
            })
            .collect();

        CallChain {
            sites,
            error_frame: traceback.primary_frame().cloned(),
        }
    }

    /// One site per context, with the callee taken from calls inside its symbol
    pub fn analyze_from_contexts(
        &mut self,
        contexts: &[FileContext],
        traceback: Option<&ParsedTraceback>,
    ) -> CallChain {
        let sites = contexts
            .iter()
            .map(|ctx| {
                let function_name = ctx
                    .function_name
                    .clone()
                    .or_else(|| ctx.class_name.as_ref().map(|c| format!("{}.__init__", c)));
                CallSite {
                    filepath: ctx.filepath.clone(),
                    line_number: ctx.line_number,
                    function_name,
                    called_function: self.find_called_function(ctx),
                    language: ctx.language,
                }
            })
            .collect();

        CallChain {
            sites,
            error_frame: traceback.and_then(|tb| tb.primary_frame().cloned()),
        }
    }

    fn find_called_function(&mut self, ctx: &FileContext) -> Option<String> {
        let symbol = ctx.symbol.as_ref()?;
        let mut parser = ParserRegistry::create_parser(ctx.language)?;
        let source = match &ctx.raw_source {
            Some(source) => source.clone(),
            None => self.source(&ctx.filepath)?,
        };
        if !parser.parse(&source, &ctx.filepath) {
            return None;
        }
        parser.calls_in_symbol(symbol).into_iter().next()
    }

    /// File text, read once and cached; relative paths fall back to the project root
    pub fn source(&mut self, filepath: &str) -> Option<String> {
        if let Some(cached) = self.source_cache.get(filepath) {
            return cached.clone();
        }

        let direct = PathBuf::from(filepath);
        let path = if direct.exists() {
            direct
        } else {
            self.project_root.join(filepath)
        };
        let source = std::fs::read(&path)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
        self.source_cache.insert(filepath.to_string(), source.clone());
        source
    }

    /// Sites whose line assigns `variable` or declares it as a parameter
    pub fn find_data_flow(&mut self, chain: &CallChain, variable: &str) -> Vec<CallSite> {
        let assign_spaced = format!("{} =", variable);
        let assign_tight = format!("{}=", variable);

        let mut found = Vec::new();
        for site in &chain.sites {
            let Some(source) = self.source(&site.filepath) else {
                continue;
            };
            let Some(line) = site
                .line_number
                .checked_sub(1)
                .and_then(|idx| source.lines().nth(idx))
            else {
                continue;
            };

            let assigns = line.contains(&assign_spaced) || line.contains(&assign_tight);
            let declares =
                line.contains(variable) && (line.contains("def ") || line.contains("func "));
            if assigns || declares {
                found.push(site.clone());
            }
        }
        found
    }

    /// Lines in other contexts' files that call `function_name`
    pub fn upstream_callers(
        &mut self,
        filepath: &str,
        function_name: &str,
        contexts: &[FileContext],
    ) -> Vec<CallSite> {
        let needle = format!("{}(", function_name);
        let mut callers = Vec::new();

        for ctx in contexts.iter().filter(|c| c.filepath != filepath) {
            let Some(source) = self.source(&ctx.filepath) else {
                continue;
            };
            for (idx, line) in source.lines().enumerate() {
                if line.contains(&needle) {
                    callers.push(CallSite {
                        filepath: ctx.filepath.clone(),
                        line_number: idx + 1,
                        function_name: ctx.function_name.clone(),
                        called_function: Some(function_name.to_string()),
                        language: ctx.language,
                    });
                }
            }
        }
        callers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traceback::parse_traceback;
    use crate::types::{ContextType, Symbol, SymbolKind};
    use std::fs;
    use tempfile::TempDir;

    const LOG: &str = r#"Traceback (most recent call last):
  File "/app/main.py", line 10, in <module>
    run()
  File "/app/service.py", line 25, in run
    return process(data)
  File "/app/worker.py", line 3, in process
    return 1 / 0
ZeroDivisionError: division by zero"#;

    #[test]
    fn test_analyze_traceback_links_callees() {
        let analyzer = CallChainAnalyzer::new("/app");
        let chain = analyzer.analyze_traceback(&parse_traceback(LOG, None));

        assert_eq!(chain.sites.len(), 3);
        assert_eq!(chain.entry_point().unwrap().to_string(), "main.py:10 <module> -> run");
        assert_eq!(chain.sites[1].to_string(), "service.py:25 run -> process");
        assert_eq!(chain.error_site().unwrap().to_string(), "worker.py:3 process");
        assert_eq!(chain.error_frame.as_ref().unwrap().filepath, "/app/worker.py");
        assert_eq!(
            chain.to_string(),
            "main.py:10 <module> -> run -> service.py:25 run -> process -> worker.py:3 process"
        );
    }

    #[test]
    fn test_analyze_from_contexts_uses_symbol_calls() {
        let tmp = TempDir::new().unwrap();
        let source = "def handler(req):\n    data = load(req)\n    return save(data)\n";
        let path = tmp.path().join("views.py");
        fs::write(&path, source).unwrap();

        let mut ctx = FileContext::new(
            path.display().to_string(),
            2,
            ContextType::Ast,
            "",
            Language::Python,
        );
        ctx.function_name = Some("handler".to_string());
        ctx.symbol = Some(Symbol::new("handler", SymbolKind::Function, 1, 3));

        let mut class_ctx = FileContext::new("models.py", 4, ContextType::Lines, "", Language::Python);
        class_ctx.class_name = Some("User".to_string());

        let mut analyzer = CallChainAnalyzer::new(tmp.path());
        let chain = analyzer.analyze_from_contexts(&[ctx, class_ctx], None);
        assert_eq!(chain.sites[0].called_function.as_deref(), Some("load"));
        assert_eq!(chain.sites[1].function_name.as_deref(), Some("User.__init__"));
        assert_eq!(chain.sites[1].called_function, None);
    }

    #[test]
    fn test_find_data_flow() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("a.py"),
            "def run(total):\n    count = total + 1\n    return count\n",
        )
        .unwrap();

        let site = |line| CallSite {
            filepath: "a.py".to_string(),
            line_number: line,
            function_name: Some("run".to_string()),
            called_function: None,
            language: Language::Python,
        };
        let chain = CallChain {
            sites: vec![site(1), site(2), site(3), site(99)],
            error_frame: None,
        };

        let mut analyzer = CallChainAnalyzer::new(tmp.path());
        let lines: Vec<usize> = analyzer
            .find_data_flow(&chain, "count")
            .iter()
            .map(|s| s.line_number)
            .collect();
        assert_eq!(lines, vec![2]);

        let lines: Vec<usize> = analyzer
            .find_data_flow(&chain, "total")
            .iter()
            .map(|s| s.line_number)
            .collect();
        assert_eq!(lines, vec![1]);
    }

    #[test]
    fn test_upstream_callers_skips_own_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.py"), "def process(x):\n    return x\n").unwrap();
        fs::write(tmp.path().join("b.py"), "from a import process\n\nprocess(1)\nprocess(2)\n").unwrap();

        let contexts = vec![
            FileContext::new("a.py", 1, ContextType::Lines, "", Language::Python),
            FileContext::new("b.py", 3, ContextType::Lines, "", Language::Python),
        ];
        let mut analyzer = CallChainAnalyzer::new(tmp.path());
        let callers = analyzer.upstream_callers("a.py", "process", &contexts);
        let lines: Vec<usize> = callers.iter().map(|c| c.line_number).collect();
        assert_eq!(lines, vec![3, 4]);
        assert!(callers.iter().all(|c| c.filepath == "b.py"));
    }
}
