//! `graft`: apply code blocks from LLM output to a Python project

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use graft_engine::{Controller, EngineConfig, RunReport};
use graft_extract::BlockExtractor;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "graft", version)]
#[command(about = "Integrate fenced code blocks from LLM output into a Python source tree", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Enable debug output")]
    verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, help = "Log output format")]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Apply every block in the input to the project")]
    Apply(ApplyArgs),

    #[command(about = "Print the blocks found in the input as JSON, without touching files")]
    Extract {
        #[arg(long, short, help = "LLM output file")]
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ApplyArgs {
    #[arg(long, short, help = "LLM output file (overrides input_file)")]
    input: Option<PathBuf>,

    #[arg(long, short, help = "Configuration file (.toml, .yaml or .json)")]
    config: Option<PathBuf>,

    #[arg(long, short, help = "Project root (overrides root_dir)")]
    root: Option<PathBuf>,

    #[arg(long, help = "Compute diffs without writing files")]
    dry_run: bool,

    #[arg(long, help = "Stop at the first failed block")]
    strict: bool,

    #[arg(long, help = "Do not write .bak copies")]
    no_backup: bool,

    #[arg(long, help = "Fail update blocks whose module does not exist")]
    no_create: bool,

    #[arg(long, help = "Skip the formatter")]
    no_format: bool,

    #[arg(long, value_name = "COMMAND", help = "External formatter reading stdin, e.g. \"ruff format -\"")]
    formatter: Option<String>,

    #[arg(long, value_name = "COMMAND", help = "External syntax check reading stdin")]
    validator: Option<String>,

    #[arg(long, value_name = "PATH", help = "Write the run report as JSON")]
    report: Option<PathBuf>,

    #[arg(long, short, help = "Do not print diffs")]
    quiet: bool,
}

impl ApplyArgs {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => EngineConfig::new(),
        };
        if let Some(input) = &self.input {
            config = config.with_input_file(input.clone());
        }
        if let Some(root) = &self.root {
            config = config.with_root_dir(root.clone());
        }
        if self.dry_run {
            config = config.with_dry_run(true);
        }
        if self.strict {
            config = config.with_strict_parsing(true);
        }
        if self.no_backup {
            config = config.with_backup(false);
        }
        if self.no_create {
            config = config.with_create_missing_modules(false);
        }
        if self.no_format {
            config = config.with_formatting(false);
        }
        if let Some(command) = &self.formatter {
            config = config.with_formatter_command(split_command(command));
        }
        if let Some(command) = &self.validator {
            config = config.with_validator_command(split_command(command));
        }
        Ok(config)
    }
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    match format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init(),
    }
}

fn apply(args: &ApplyArgs) -> Result<RunReport> {
    let config = args.engine_config()?;
    tracing::debug!(?config, "effective configuration");
    let report = Controller::with_tracing(config)
        .run()
        .context("reading LLM output")?;

    if !args.quiet {
        for diff in report.records.iter().filter_map(|r| r.unified_diff.as_deref()) {
            print!("{diff}");
        }
    }
    if let Some(path) = &args.report {
        write_report(&report, path)?;
    }
    Ok(report)
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = report.to_json().context("serializing run report")?;
    std::fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))
}

fn extract(input: &Path) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let blocks = BlockExtractor::new().extract(&text);
    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}

/// Exit status: number of failed blocks, clamped to 255
fn run(cli: &Cli) -> Result<u8> {
    match &cli.command {
        Commands::Apply(args) => Ok(apply(args)?.exit_code()),
        Commands::Extract { input } => {
            extract(input)?;
            Ok(0)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
