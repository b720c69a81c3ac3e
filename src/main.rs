//! FluxReview - multi-agent AI code review
//!
//! A CLI tool that fans one piece of source code out to four analysis
//! agents running in parallel on a local Ollama model, merges their
//! findings into a scored report and asks a fifth agent for a fix.
//!
//! Exit codes:
//!   0 - Success (score at or above --fail-below, or no threshold set)
//!   1 - Runtime error (connection, config, empty input, timeout, etc.)
//!   2 - Quality score below the --fail-below threshold

mod agent;
mod analysis;
mod cli;
mod config;
mod models;
mod pipeline;
mod report;

use agent::{OllamaBackend, WorkerKind};
use anyhow::{anyhow, Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use models::{AnalysisRequest, ProgressEvent, ProgressStatus, Report};
use pipeline::{Coordinator, StreamMessage};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is resolved before logging so `general.verbose` can set the level
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("FluxReview v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run_review(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Review failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fluxreview.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the model, language and scoring policy.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout stays clean for `--sse`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete review workflow. Returns exit code (0 or 2).
async fn run_review(args: Args, config: Config) -> Result<i32> {
    let code = read_code(&args)?;
    let request = AnalysisRequest::new(code, Some(config.general.language.as_str()));
    // Reject before touching the backend
    Coordinator::validate(&request)?;

    let backend = OllamaBackend::new(config.ollama_config())?;
    let coordinator =
        Arc::new(Coordinator::new(Arc::new(backend)).with_policy(config.score_policy()));

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, args.timeout);

    let chatty = !args.quiet && !args.sse;
    if chatty {
        println!("🤖 Starting multi-agent review...");
        println!("   Model: {}", config.model.name);
        println!("   Ollama: {}", config.model.ollama_url);
        println!("   Language: {}", request.language);
        println!("   Lines: {}", request.code.lines().count());
        if let Some(secs) = args.timeout {
            println!("   Deadline: {}s", secs);
        }
        println!();
    }

    let report = if args.sse {
        run_sse(&coordinator, request, cancel).await?
    } else if args.stream && !args.quiet {
        run_with_spinners(&coordinator, request, cancel).await?
    } else {
        coordinator.run_with(&request, None, &cancel).await?
    };

    // Generate and save the report
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if chatty {
        print_summary(&report, output_path);
    }

    // Check --fail-below threshold
    if let Some(threshold) = args.fail_below {
        if report.score < threshold {
            eprintln!(
                "\n⛔ Quality score {} is below {}. Failing (exit code 2).",
                report.score, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Cancel the review on Ctrl-C, or once the deadline passes.
fn spawn_cancel_triggers(cancel: &CancellationToken, timeout: Option<u64>) {
    if let Some(secs) = timeout {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!("Review deadline of {}s reached", secs);
            token.cancel();
        });
    }

    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted");
            token.cancel();
        }
    });
}

/// Read the code under review from --file or stdin.
fn read_code(args: &Args) -> Result<String> {
    if args.stdin {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("Failed to read code from stdin")?;
        return Ok(code);
    }

    let path = args
        .file
        .as_ref()
        .ok_or_else(|| anyhow!("No input given: use --file or --stdin"))?;
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file: {}", path.display()))
}

/// Print every stream message as a server-sent-events frame.
async fn run_sse(
    coordinator: &Arc<Coordinator>,
    request: AnalysisRequest,
    cancel: CancellationToken,
) -> Result<Report> {
    let mut receiver = coordinator.run_streaming(request, cancel)?;
    let mut stdout = std::io::stdout();

    while let Some(message) = receiver.recv().await {
        stdout
            .write_all(message.to_sse().as_bytes())
            .context("Failed to write event to stdout")?;
        stdout.flush().context("Failed to flush stdout")?;

        match message {
            StreamMessage::Progress(_) => {}
            StreamMessage::Result(report) => return Ok(*report),
            StreamMessage::Error { message } => return Err(anyhow!(message)),
        }
    }

    Err(anyhow!("Review stream closed without a result"))
}

fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Drive one spinner per agent from the progress stream.
async fn run_with_spinners(
    coordinator: &Arc<Coordinator>,
    request: AnalysisRequest,
    cancel: CancellationToken,
) -> Result<Report> {
    let multi = MultiProgress::new();
    let style = create_spinner_style();

    let phase = multi.add(ProgressBar::new_spinner());
    phase.set_style(style.clone());
    phase.set_message("Preparing review");

    let mut spinners: HashMap<&'static str, ProgressBar> = HashMap::new();
    for kind in WorkerKind::ALL {
        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(style.clone());
        spinner.set_message(format!("{}: waiting", kind.label()));
        spinners.insert(kind.key(), spinner);
    }

    let mut receiver = coordinator.run_streaming(request, cancel)?;
    let outcome = loop {
        let Some(message) = receiver.recv().await else {
            break Err(anyhow!("Review stream closed without a result"));
        };

        match message {
            StreamMessage::Progress(event) => match spinners.get(event.agent.as_str()) {
                Some(spinner) => update_agent_spinner(spinner, &event),
                None => update_phase_spinner(&phase, &event),
            },
            StreamMessage::Result(report) => break Ok(*report),
            StreamMessage::Error { message } => break Err(anyhow!(message)),
        }
    };

    for spinner in spinners.values().chain(std::iter::once(&phase)) {
        if !spinner.is_finished() {
            spinner.abandon();
        }
    }

    outcome
}

fn update_agent_spinner(spinner: &ProgressBar, event: &ProgressEvent) {
    let label = event.data["label"].as_str().unwrap_or(&event.agent);
    let seconds = event.data["duration_ms"].as_u64().unwrap_or(0) as f64 / 1000.0;

    match event.status {
        ProgressStatus::Started | ProgressStatus::Running => {
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner.set_message(format!("{}: analyzing...", label));
        }
        ProgressStatus::Completed => {
            spinner.finish_with_message(format!("✅ {} ({:.1}s)", label, seconds));
        }
        ProgressStatus::Failed => {
            let error = event.data["error"].as_str().unwrap_or("unknown error");
            spinner.finish_with_message(format!("❌ {}: {}", label, error));
        }
    }
}

fn update_phase_spinner(spinner: &ProgressBar, event: &ProgressEvent) {
    match event.status {
        ProgressStatus::Started => {
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner.set_message("Running analysis agents");
        }
        ProgressStatus::Running => {
            let phase = event.data["phase"].as_str().unwrap_or("working");
            spinner.set_message(format!("Phase: {}", phase));
        }
        ProgressStatus::Completed => {
            let seconds = event.data["total_time_ms"].as_u64().unwrap_or(0) as f64 / 1000.0;
            spinner.finish_with_message(format!("✅ Review complete ({:.1}s)", seconds));
        }
        ProgressStatus::Failed => {
            spinner.finish_with_message("❌ Review failed");
        }
    }
}

fn print_summary(report: &Report, output_path: &Path) {
    let metadata = &report.metadata;

    println!("\n📊 Review Summary:");
    println!("   Score: {}/100 (Grade: {})", report.score, report.grade);
    println!("   Total issues: {}", metadata.total_issues);
    println!(
        "   - 🔴 Critical: {} | 🟠 High: {} | 🟡 Medium: {} | 🟢 Low: {}",
        metadata.critical_count, metadata.high_count, metadata.medium_count, metadata.low_count
    );

    let failed: Vec<&str> = [
        (WorkerKind::Security, report.agent_results.security.failed),
        (WorkerKind::Performance, report.agent_results.performance.failed),
        (WorkerKind::Style, report.agent_results.style.failed),
        (WorkerKind::Bugs, report.agent_results.bugs.failed),
        (WorkerKind::AutoFix, report.agent_results.autofix.failed),
    ]
    .into_iter()
    .filter(|(_, failed)| *failed)
    .map(|(kind, _)| kind.label())
    .collect();
    if !failed.is_empty() {
        println!("   ⚠️  Failed agents: {}", failed.join(", "));
    }

    println!(
        "   Duration: {:.1}s",
        metadata.processing_time_ms as f64 / 1000.0
    );
    println!(
        "\n✅ Review complete! Report saved to: {}",
        output_path.display()
    );
}

/// Where the active configuration came from.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    Fallback(anyhow::Error),
}

impl ConfigSource {
    /// Reports the source once the subscriber is installed.
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(e) => warn!("Failed to load config, using defaults: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` path must load. A broken default file falls back to defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(e))),
    }
}
