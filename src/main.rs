use anyhow::{Context, Result};
use clap::Parser;
use deepfix::analysis::ContextBuilder;
use deepfix::config::Config;
use deepfix::error::ValidationError;
use deepfix::investigation::{GeminiClient, InvestigationEngine, Transport};
use deepfix::language::Language;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deepfix")]
#[command(about = "Build repair context for an error log and ask a model for a fix", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root the error came from
    #[arg(short, long, default_value = ".", env = "DEEPFIX_PROJECT")]
    project: PathBuf,

    /// File holding the error log (read from stdin when omitted)
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Language hint, e.g. python, typescript, go
    #[arg(long)]
    language: Option<String>,

    /// Print the analysis context as JSON without calling a model
    #[arg(long)]
    context_only: bool,

    /// Configuration file (defaults to the platform config location)
    #[arg(long, env = "DEEPFIX_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for JSON output
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    if !cli.project.exists() {
        return Err(ValidationError::PathNotFound(cli.project.display().to_string()).into());
    }
    if !cli.project.is_dir() {
        return Err(ValidationError::NotADirectory(cli.project.display().to_string()).into());
    }

    let language = match cli.language.as_deref() {
        Some(name) => Some(
            Language::from_name(name)
                .ok_or_else(|| ValidationError::UnknownLanguage(name.to_string()))?,
        ),
        None => None,
    };

    let error_log = match &cli.log {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read error log {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read error log from stdin")?;
            buf
        }
    };
    if error_log.trim().is_empty() {
        return Err(ValidationError::Empty("error log".to_string()).into());
    }

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default()?,
    };
    config.apply_env_overrides();
    config.validate()?;

    let mut builder = ContextBuilder::with_config(&cli.project, &config, None);

    if cli.context_only {
        let ctx = builder.build_analysis_context(&error_log, language);
        let prompt = builder.context_for_prompt(&ctx, true, true, true);
        let output = serde_json::json!({ "context": ctx, "prompt": prompt });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let client = GeminiClient::from_config(&config.model)?;
    let transport = Transport::from_config(client, &config.model);
    let engine = InvestigationEngine::new(transport, builder);

    let result = engine.investigate(&error_log, language).await?;
    let output = serde_json::json!({
        "result": result,
        "transport": engine.transport().stats(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
