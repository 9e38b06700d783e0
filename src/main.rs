//! Prompt Optimizer CLI - Rewrite prompts through Gemini, OpenAI or Ollama

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use prompt_optimizer::{
    api::{test_provider, ApiError, ProviderType},
    config::Config,
    diff::{line_diff, word_diff},
    history::{History, HistoryEntry},
    metrics::MetricsTracker,
    orchestrator::{Comparison, OptimizationResult, Orchestrator},
    payload::ContextFile,
    tokens::estimate,
    tui::{DispatchSpinner, TerminalRenderer},
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "prompt-optimizer")]
#[command(about = "Rewrite prompts with an LLM before handing them to a coding agent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a prompt
    Optimize {
        /// Prompt text (reads stdin when neither --input nor --input-file is given)
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read the prompt from a file
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Attach a file as context
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// A filename seen on the page the prompt came from
        #[arg(long)]
        filename: Vec<String>,

        /// Provider (gemini, openai, ollama)
        #[arg(short, long, value_parser = parse_provider)]
        provider: Option<ProviderType>,

        /// Model to use instead of the provider default
        #[arg(short, long)]
        model: Option<String>,

        /// Turn off a directive for this run
        #[arg(long, value_enum)]
        disable: Vec<Directive>,

        /// Print the payload without sending it
        #[arg(long)]
        dry_run: bool,

        /// Show a word diff of the result against the input
        #[arg(long)]
        diff: bool,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,

        /// Don't record this run in history
        #[arg(long)]
        no_history: bool,

        /// Write the optimized prompt to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Optimize several prompt files concurrently
    Batch {
        /// Prompt files, one prompt per file
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Provider (gemini, openai, ollama)
        #[arg(short, long, value_parser = parse_provider)]
        provider: Option<ProviderType>,

        /// Maximum requests in flight
        #[arg(short, long, default_value = "4")]
        concurrency: usize,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,

        /// Don't record results in history
        #[arg(long)]
        no_history: bool,
    },

    /// Check that a provider is reachable with the configured credential
    TestProvider {
        /// Provider (gemini, openai, ollama)
        #[arg(short, long, value_parser = parse_provider)]
        provider: Option<ProviderType>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two text files
    Diff {
        original: PathBuf,
        optimized: PathBuf,

        /// Line diff instead of word diff
        #[arg(long)]
        lines: bool,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate the token count of text or a file
    Count {
        /// Text to count (reads stdin when neither text nor --file is given)
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Browse past optimizations
    #[command(subcommand)]
    History(HistoryCommands),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List recent entries, newest first
    List {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show one entry with its diff
    Show { id: u64 },

    /// Delete all entries
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Initialize configuration file with defaults
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., provider, preferences.full_code, history.max_entries).
        /// `saved_snippets` appends one snippet; an empty value clears them.
        key: String,

        /// Value to set
        value: String,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum Directive {
    NoReadme,
    FullCode,
    ShortSummary,
    PreferVanilla,
}

fn parse_provider(s: &str) -> Result<ProviderType, String> {
    s.parse().map_err(|e: ApiError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Optimize {
            input,
            input_file,
            file,
            filename,
            provider,
            model,
            disable,
            dry_run,
            diff,
            json,
            no_history,
            output,
        } => {
            let options = OptimizeOptions {
                dry_run,
                diff,
                json,
                no_history,
                output,
            };
            let raw = read_input(input, input_file.as_deref())?;
            run_optimize(raw, file, filename, provider, model, disable, options).await?;
        }
        Commands::Batch {
            inputs,
            provider,
            concurrency,
            json,
            no_history,
        } => {
            run_batch(inputs, provider, concurrency, json, no_history).await?;
        }
        Commands::TestProvider { provider, json } => {
            run_test_provider(provider, json).await?;
        }
        Commands::Diff {
            original,
            optimized,
            lines,
            json,
        } => {
            run_diff(&original, &optimized, lines, json)?;
        }
        Commands::Count { text, file } => {
            let text = read_input(text, file.as_deref())?;
            TerminalRenderer::new().render_count(estimate(&text));
        }
        Commands::History(cmd) => {
            run_history_command(cmd)?;
        }
        Commands::Config(cmd) => {
            run_config_command(cmd)?;
        }
    }

    Ok(())
}

/// Text from the argument, else the file, else stdin
fn read_input(text: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    Ok(buffer)
}

fn load_config(provider: Option<ProviderType>) -> Result<Config> {
    let mut config = Config::load().with_context(|| {
        format!("failed to load {}", Config::default_path().display())
    })?;
    if let Some(provider) = provider {
        config.preferences.provider = provider;
    }
    Ok(config)
}

fn open_history(config: &Config) -> Result<History> {
    let path = config
        .history
        .path
        .clone()
        .unwrap_or_else(History::default_path);
    History::load_from(path, config.history.max_entries.max(1)).context("failed to open history")
}

/// Record successful runs; history trouble is reported but never fails the run
fn record_history(config: &Config, entries: Vec<HistoryEntry>) {
    if !config.history.enabled || entries.is_empty() {
        return;
    }

    let result = open_history(config).and_then(|mut history| {
        for entry in entries {
            history.record(entry);
        }
        history.save().context("failed to save history")
    });

    if let Err(e) = result {
        warn!("History not updated: {:#}", e);
    }
}

struct OptimizeOptions {
    dry_run: bool,
    diff: bool,
    json: bool,
    no_history: bool,
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct OptimizeOutput<'a> {
    #[serde(flatten)]
    result: &'a OptimizationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<Comparison>,
}

async fn run_optimize(
    raw: String,
    files: Vec<PathBuf>,
    filenames: Vec<String>,
    provider: Option<ProviderType>,
    model: Option<String>,
    disable: Vec<Directive>,
    options: OptimizeOptions,
) -> Result<()> {
    let mut config = load_config(provider)?;
    for directive in disable {
        let prefs = &mut config.preferences;
        match directive {
            Directive::NoReadme => prefs.no_readme = false,
            Directive::FullCode => prefs.full_code = false,
            Directive::ShortSummary => prefs.short_summary = false,
            Directive::PreferVanilla => prefs.prefer_vanilla = false,
        }
    }

    let mut context = Vec::new();
    for path in &files {
        let file = ContextFile::from_path(path)
            .with_context(|| format!("failed to read context file {}", path.display()))?;
        if file.truncated {
            info!("{} has {} lines, attaching the first 50", file.name, file.total_lines);
        }
        context.push(file);
    }

    let mut request = config
        .optimize_request(raw)
        .with_filenames(filenames)
        .with_files(context);
    if model.is_some() {
        request = request.with_model(model);
    }

    let orchestrator = Orchestrator::default();
    let renderer = TerminalRenderer::new();

    if options.dry_run {
        let payload = orchestrator.payload_for(&request);
        if options.json {
            let out = serde_json::json!({ "payload": payload, "tokens": estimate(&payload) });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("{}", payload);
            renderer.render_count(estimate(&payload));
        }
        return Ok(());
    }

    let provider = config.preferences.provider;
    let mut spinner = if options.json {
        DispatchSpinner::hidden()
    } else {
        DispatchSpinner::new()
    };
    spinner.start(&format!("Optimizing with {}", provider));
    let result = orchestrator.optimize(&request).await;
    spinner.stop();

    let comparison = result
        .text()
        .map(|text| Comparison::between(&request.raw_text, text));

    if options.json {
        let out = OptimizeOutput {
            result: &result,
            comparison: comparison.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    }

    let text = match result.into_result() {
        Ok(text) => text,
        Err(error) => {
            if !options.json {
                renderer.render_error(&error.to_string());
            }
            return Err(error.into());
        }
    };

    if let Some(path) = &options.output {
        std::fs::write(path, &text).with_context(|| format!("failed to write {}", path.display()))?;
    }

    if !options.json {
        if options.output.is_none() {
            renderer.render_text(&text);
        } else if let Some(path) = &options.output {
            renderer.render_success(&format!("Optimized prompt written to {}", path.display()));
        }
        if let Some(comparison) = &comparison {
            if options.diff {
                renderer.render_header("Diff");
                renderer.render_word_diff(&comparison.diff.original, &comparison.diff.optimized);
            }
            renderer.render_comparison(comparison);
        }
    }

    if !options.no_history {
        record_history(&config, vec![HistoryEntry::new(provider, request.raw_text, text)]);
    }

    Ok(())
}

#[derive(Serialize)]
struct BatchItem {
    input: PathBuf,
    #[serde(flatten)]
    result: OptimizationResult,
}

async fn run_batch(
    inputs: Vec<PathBuf>,
    provider: Option<ProviderType>,
    concurrency: usize,
    json: bool,
    no_history: bool,
) -> Result<()> {
    let config = load_config(provider)?;
    let provider = config.preferences.provider;
    let orchestrator = Orchestrator::default();
    let metrics = MetricsTracker::new();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    info!(
        "Optimizing {} prompts with {} (max {} in flight)",
        inputs.len(),
        provider,
        concurrency.max(1)
    );

    for path in inputs {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let request = config.optimize_request(raw);
        let orchestrator = orchestrator.clone();
        let metrics = metrics.clone();
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let started = Instant::now();
            let result = orchestrator.optimize(&request).await;
            let elapsed = started.elapsed();

            match (result.text(), result.error()) {
                (Some(text), _) => {
                    metrics.record_success(estimate(&request.raw_text), estimate(text), elapsed)
                }
                (None, Some(error)) => metrics.record_failure(error.kind(), elapsed),
                (None, None) => {}
            }
            (path, request.raw_text, result)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.context("optimization task panicked")?);
    }
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));

    let renderer = TerminalRenderer::new();
    let mut history_entries = Vec::new();
    let mut items = Vec::new();

    for (path, raw, result) in outcomes {
        if !json {
            renderer.render_header(&path.display().to_string());
            match (result.text(), result.error()) {
                (Some(text), _) => {
                    renderer.render_text(text);
                    renderer.render_comparison(&Comparison::between(&raw, text));
                }
                (None, Some(error)) => renderer.render_error(&error.to_string()),
                (None, None) => {}
            }
        }
        if let Some(text) = result.text() {
            history_entries.push(HistoryEntry::new(provider, raw.clone(), text));
        }
        items.push(BatchItem { input: path, result });
    }

    let summary = metrics.summary();
    if json {
        let out = serde_json::json!({ "results": items, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        renderer.render_summary(&summary);
    }

    if !no_history {
        record_history(&config, history_entries);
    }

    if summary.failure_count > 0 {
        anyhow::bail!("{} of {} prompts failed", summary.failure_count, summary.request_count);
    }
    Ok(())
}

async fn run_test_provider(provider: Option<ProviderType>, json: bool) -> Result<()> {
    let config = load_config(provider)?;
    let provider = config.preferences.provider;

    let mut spinner = if json {
        DispatchSpinner::hidden()
    } else {
        DispatchSpinner::new()
    };
    spinner.start(&format!("Contacting {}", provider));
    let result = test_provider(&reqwest::Client::new(), &config.provider_config()).await;
    spinner.stop();

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        TerminalRenderer::new().render_provider_test(provider, &result);
    }

    if !result.success {
        anyhow::bail!("{} check failed", provider);
    }
    Ok(())
}

fn run_diff(original: &Path, optimized: &Path, lines: bool, json: bool) -> Result<()> {
    let a = std::fs::read_to_string(original)
        .with_context(|| format!("failed to read {}", original.display()))?;
    let b = std::fs::read_to_string(optimized)
        .with_context(|| format!("failed to read {}", optimized.display()))?;
    let renderer = TerminalRenderer::new();

    if lines {
        let changes = line_diff(&a, &b);
        if json {
            println!("{}", serde_json::to_string_pretty(&changes)?);
        } else {
            renderer.render_line_diff(&changes);
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&Comparison::between(&a, &b))?);
    } else {
        let diff = word_diff(&a, &b);
        renderer.render_word_diff(&diff.original, &diff.optimized);
        renderer.render_comparison(&Comparison::between(&a, &b));
    }
    Ok(())
}

fn run_history_command(cmd: HistoryCommands) -> Result<()> {
    let config = Config::load()?;
    let renderer = TerminalRenderer::new();
    let mut history = open_history(&config)?;

    match cmd {
        HistoryCommands::List { limit } => {
            let shown = limit.min(history.len());
            renderer.render_history(&history.entries()[..shown]);
        }
        HistoryCommands::Show { id } => {
            let entry = history
                .get(id)
                .with_context(|| format!("no history entry #{}", id))?;
            renderer.render_header(&format!("#{} original", entry.id));
            renderer.render_text(&entry.original);
            renderer.render_header(&format!("#{} optimized ({})", entry.id, entry.provider));
            renderer.render_text(&entry.optimized);
            renderer.render_comparison(&Comparison::between(&entry.original, &entry.optimized));
        }
        HistoryCommands::Clear => {
            let removed = history.len();
            history.clear();
            history.save()?;
            renderer.render_success(&format!("Removed {} entries", removed));
        }
    }
    Ok(())
}

fn run_config_command(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => {
            config_init(force)?;
        }
        ConfigCommands::Show => {
            config_show()?;
        }
        ConfigCommands::Set { key, value } => {
            config_set(&key, &value)?;
        }
        ConfigCommands::Path => {
            config_path();
        }
        ConfigCommands::Validate => {
            config_validate()?;
        }
    }
    Ok(())
}

fn config_init(force: bool) -> Result<()> {
    let path = Config::default_path();

    if path.exists() && !force {
        println!("Configuration file already exists at: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, Config::example())?;

    println!("Configuration file created at: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file to add your API keys, or");
    println!("  2. Set environment variables:");
    println!("     export GEMINI_API_KEY=your_gemini_key");
    println!("     export OPENAI_API_KEY=your_openai_key");
    println!();
    println!("Then check the provider:");
    println!("  prompt-optimizer test-provider");

    Ok(())
}

fn config_show() -> Result<()> {
    let config = Config::load()?;
    println!("{}", toml::to_string_pretty(&config.redacted())?);

    // Show environment variable status
    println!("\n--- Environment Variables ---");
    for name in ["GEMINI_API_KEY", "OPENAI_API_KEY"] {
        let state = if std::env::var(name).is_ok() { "set" } else { "not set" };
        println!("{}: {}", name, state);
    }
    println!(
        "OLLAMA_URL: {}",
        std::env::var("OLLAMA_URL").unwrap_or_else(|_| "not set".to_string())
    );
    println!(
        "PROMPT_OPTIMIZER_PROVIDER: {}",
        std::env::var("PROMPT_OPTIMIZER_PROVIDER").unwrap_or_else(|_| "not set".to_string())
    );

    Ok(())
}

fn config_set(key: &str, value: &str) -> Result<()> {
    // Load without env overrides so they don't get written to disk
    let path = Config::default_path();
    let mut config = if path.exists() {
        toml::from_str(&std::fs::read_to_string(&path)?)?
    } else {
        Config::default()
    };

    config.set(key, value)?;
    config.save()?;

    let shown = if key.ends_with("key") { "***" } else { value };
    println!("Set {} = {}", key, shown);
    Ok(())
}

fn config_path() {
    let path = Config::default_path();
    println!("{}", path.display());

    if path.exists() {
        println!("(file exists)");
    } else {
        println!("(file does not exist - run 'config init' to create)");
    }
}

fn config_validate() -> Result<()> {
    let config = Config::load()?;
    let renderer = TerminalRenderer::new();

    match config.validate() {
        Ok(()) => {
            let provider = config.provider_config();
            renderer.render_success("Configuration is valid");
            renderer.render_info(&format!(
                "Provider: {} (model: {}, timeout: {}s)",
                provider.provider,
                provider.model(),
                config.generation.timeout_secs
            ));
            if provider.provider == ProviderType::Ollama {
                renderer.render_info(&format!("Ollama URL: {}", provider.ollama_url()));
            }
            let history = if config.history.enabled {
                format!("on (keeps {})", config.history.max_entries)
            } else {
                "off".to_string()
            };
            renderer.render_info(&format!("History: {}", history));
        }
        Err(e) => {
            renderer.render_error(&format!("Configuration validation failed: {}", e));
            println!();
            println!("To fix, either:");
            println!("  1. Set a key in config: prompt-optimizer config set api_key <key>");
            println!("  2. Set environment variables: export GEMINI_API_KEY=your_key");
            println!("  3. Switch to a local model: prompt-optimizer config set provider ollama");
        }
    }

    Ok(())
}
