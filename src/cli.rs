//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// FluxReview - multi-agent AI code review
///
/// Runs security, performance, style and bug-detection agents over one
/// source file in parallel, merges their findings into a scored report
/// and proposes a fixed version of the code. Uses a local Ollama model.
///
/// Examples:
///   fluxreview --file app.py
///   fluxreview --file main.rs --language rust --format json
///   cat app.js | fluxreview --stdin --language javascript --stream
///   fluxreview --file app.py --fail-below 70
///   fluxreview --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Source file to review
    #[arg(
        short,
        long,
        value_name = "PATH",
        conflicts_with = "stdin",
        required_unless_present_any = ["stdin", "init_config"]
    )]
    pub file: Option<PathBuf>,

    /// Read the code to review from standard input
    #[arg(long)]
    pub stdin: bool,

    /// Language of the code (default: from config, or python)
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    ///
    /// Defaults to the config file's output setting (fluxreview_report.md).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Show live per-agent progress while the review runs
    #[arg(long, conflicts_with = "sse")]
    pub stream: bool,

    /// Print progress and the final report as server-sent events on stdout
    #[arg(long)]
    pub sse: bool,

    /// Abort the whole review after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Ollama model to use for every agent
    ///
    /// Can also be set via FLUXREVIEW_MODEL env var or .fluxreview.toml config.
    #[arg(short, long, env = "FLUXREVIEW_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fluxreview.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Fail if the quality score is below this value
    ///
    /// Useful for CI pipelines. Exit code 2 when the score is lower.
    #[arg(long, value_name = "SCORE")]
    pub fail_below: Option<u8>,

    /// Generate a default .fluxreview.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(score) = self.fail_below {
            if score > 100 {
                return Err("--fail-below must be between 0 and 100".to_string());
            }
        }

        if let Some(ref path) = self.file {
            if !path.is_file() {
                return Err(format!("Source file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `general.verbose`. `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
