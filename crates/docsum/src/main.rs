mod progress_bar;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsum_common::{logger, AppConfig, SummaryMode};
use docsum_llm::{
    language_name, LanguageDetector, LlmTranslator, OllamaService, PromptLocalizer, RetryPolicy,
};
use docsum_pipeline::{
    LoggingObserver, PipelineOrchestrator, PipelineServices, PlainTextExtractor, ProgressObserver,
    RunTracker, TextExtractor,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::progress_bar::ProgressBarObserver;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "docsum")]
#[command(about = "docsum - cluster-based document summarization with local models", long_about = None)]
struct Cli {
    /// Log level (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a text or markdown file
    Summarize {
        /// File to summarize
        file: PathBuf,

        /// Instruction for the model (defaults to the built-in prompt)
        #[arg(long, conflicts_with = "prompt_file")]
        prompt: Option<String>,

        /// Read the instruction from a file
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Write the summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Summary mode: aggregate or per-cluster
        #[arg(long)]
        mode: Option<SummaryMode>,

        /// Log progress instead of drawing a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Detect a file's language and show the localized default prompt
    Detect {
        /// File to inspect
        file: PathBuf,
    },

    /// Check that the Ollama server is reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    let mut config = AppConfig::from_env()?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Err(e) = logger::setup_logging(&config.log_dir, &config.log_level) {
        eprintln!("File logging unavailable ({}), logging to console only", e);
        logger::setup_console_logging(&config.log_level)?;
    }

    match cli.command {
        Commands::Summarize {
            file,
            prompt,
            prompt_file,
            output,
            mode,
            no_progress,
        } => {
            if let Some(mode) = mode {
                config.pipeline.summary_mode = mode;
            }
            let prompt = match prompt_file {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("cannot read prompt file {}", path.display()))?,
                ),
                None => prompt,
            };
            let observer: Arc<dyn ProgressObserver> = if no_progress {
                Arc::new(LoggingObserver)
            } else {
                Arc::new(ProgressBarObserver::new())
            };
            summarize(&config, &file, prompt, output.as_deref(), observer).await?;
        }
        Commands::Detect { file } => detect(&config, &file).await?,
        Commands::Check => check(&config).await?,
    }

    Ok(())
}

async fn summarize(
    config: &AppConfig,
    file: &Path,
    prompt: Option<String>,
    output: Option<&Path>,
    observer: Arc<dyn ProgressObserver>,
) -> Result<()> {
    let text = PlainTextExtractor.extract(file).await?;

    tracing::info!("docsum starting...");
    tracing::info!("  File: {}", file.display());
    tracing::info!("  LLM model: {}", config.llm_model);
    tracing::info!("  Embedding model: {}", config.embedding_model);

    let service = Arc::new(OllamaService::from_config(config)?);
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        &config.pipeline,
        PipelineServices::ollama(service),
        observer,
    )?);

    let handle = orchestrator.spawn(text, prompt);
    let cancel = handle.cancellation_token();
    let join = handle.join();
    tokio::pin!(join);

    let outcome = tokio::select! {
        outcome = &mut join => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling run");
            cancel.cancel();
            join.await
        }
    };
    log_runs(orchestrator.tracker());

    let result = outcome?;
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }

    match output {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", result.text))
                .await
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("Summary written to {}", path.display());
        }
        None => println!("{}", result.text),
    }

    Ok(())
}

fn log_runs(tracker: &RunTracker) {
    for run in tracker.runs() {
        let elapsed = run
            .finished_at
            .map(|end| (end - run.started_at).num_milliseconds())
            .unwrap_or_default();
        tracing::debug!("Run {} ended in {} after {} ms", run.run_id, run.stage, elapsed);
    }
}

async fn detect(config: &AppConfig, file: &Path) -> Result<()> {
    let text = PlainTextExtractor.extract(file).await?;

    let detector = LanguageDetector::from_config(&config.pipeline);
    let language = detector.detect(&text)?;

    let service = Arc::new(OllamaService::from_config(config)?);
    let localizer = PromptLocalizer::new(
        detector,
        Arc::new(LlmTranslator::new(service)),
        RetryPolicy::from_config(&config.pipeline),
    );
    let prompt = localizer.localize(None, &language).await;

    println!("Language: {} ({})", language, language_name(&language));
    println!("Prompt: {}", prompt.localized);
    if let Some(reason) = &prompt.degraded {
        eprintln!("warning: prompt not translated: {}", reason);
    }

    Ok(())
}

async fn check(config: &AppConfig) -> Result<()> {
    let service = OllamaService::from_config(config)?;
    let base_url = service.client().base_url().to_string();

    if service.client().test_connection().await? {
        println!("Ollama reachable at {}", base_url);
        println!("  LLM model: {}", service.llm_model());
        println!("  Embedding model: {}", service.embedding_model());
        Ok(())
    } else {
        anyhow::bail!("Ollama not reachable at {}", base_url)
    }
}
