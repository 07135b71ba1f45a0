//! Judgebox CLI
//!
//! A command-line tool for judging code submissions in Docker sandboxes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use judgebox::{
    CaseOutcome, Config, EXAMPLE_CONFIG, ResourceLimits, RunRequest, Runner, Verdict,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "judgebox")]
#[command(about = "A tool for judging code submissions against generated test harnesses")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: judgebox.toml)
        #[arg(short, long, default_value = "judgebox.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Judge a submission against the built-in test cases
    Run {
        /// Source file defining `add`
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., python, csharp, javascript)
        #[arg(short, long)]
        language: String,

        /// Wall time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Memory limit in KB
        #[arg(short, long)]
        memory_limit: Option<u64>,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the generated harness program without running it
    Generate {
        /// Source file defining `add`
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID
        #[arg(short, long)]
        language: String,
    },

    /// List available languages
    Languages,

    /// Show configuration
    ShowConfig,

    /// Check that the container runtime is reachable
    Ping,

    /// Pull language images ahead of time
    Pull {
        /// Language IDs to pull (default: all)
        #[arg(short, long)]
        language: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Init { output, force } = &cli.command {
        return init_config(output, *force).await;
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Run {
            source,
            language,
            time_limit,
            memory_limit,
            json,
        } => run_submission(config, &source, language, time_limit, memory_limit, json).await,
        Commands::Generate { source, language } => {
            let code = read_source(&source).await?;
            let program = Runner::new(config)
                .generate(&code, &language)
                .context("failed to generate harness")?;
            print!("{program}");
            Ok(())
        }
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
        Commands::Ping => {
            let version = Runner::new(config)
                .ping()
                .await
                .context("container runtime is not reachable")?;
            println!("Docker server version {version}");
            Ok(())
        }
        Commands::Pull { language } => {
            Runner::new(config)
                .pull_images(&language)
                .await
                .context("failed to pull images")?;
            println!("Images are up to date");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!(?path, "loading configuration");
            Config::from_file(path).context("failed to load configuration")
        }
        None => {
            debug!("using default configuration");
            Ok(Config::default())
        }
    }
}

async fn read_source(source: &Path) -> Result<String> {
    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("failed to read source file '{}'", source.display()))
}

async fn run_submission(
    config: Config,
    source: &Path,
    language: String,
    time_limit: Option<f64>,
    memory_limit: Option<u64>,
    json: bool,
) -> Result<()> {
    let code = read_source(source).await?;

    // Only explicitly-specified values, so per-language defaults still apply
    let mut limits = ResourceLimits::unset();
    if let Some(seconds) = time_limit {
        limits = limits.with_wall_time_limit(seconds);
    }
    if let Some(kb) = memory_limit {
        limits = limits.with_memory_limit(kb);
    }

    let mut request = RunRequest::new(code, language);
    if time_limit.is_some() || memory_limit.is_some() {
        request = request.with_limits(limits);
    }

    info!(language = %request.language, "running submission");
    let verdict = Runner::new(config)
        .run_request(request)
        .await
        .context("run failed")?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&verdict).context("failed to serialize verdict")?;
        println!("{rendered}");
    } else {
        print_verdict(&verdict);
    }

    if verdict.all_passed() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn print_verdict(verdict: &Verdict) {
    for case in &verdict.cases {
        let args = case
            .args
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mark = if case.expected_match { "pass" } else { "FAIL" };
        match &case.outcome {
            CaseOutcome::Value(value) => println!("  {mark} add({args}) = {value}"),
            CaseOutcome::Error(error) => println!("  {mark} add({args}) raised {error}"),
        }
    }

    println!("Status: {:?}", verdict.status);
    if verdict.success {
        println!("Passed: {}/{}", verdict.passed, verdict.total);
    }
    if let Some(error) = &verdict.error {
        println!("Error: {error}");
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    for (id, name) in config.language_list() {
        let image = config
            .get_language(id)
            .map(|lang| lang.image.as_str())
            .unwrap_or_default();
        println!("  {id:<15} {name} ({image})");
    }
}

fn show_config(config: &Config) {
    let limits = &config.default_limits;
    println!("Default resource limits:");
    println!("  Time limit: {:?}", limits.time_limit);
    println!("  Wall time limit: {:?}", limits.wall_time_limit);
    println!("  Memory limit: {:?} KB", limits.memory_limit);
    println!("  CPUs: {:?}", limits.cpus);
    println!("  Max processes: {:?}", limits.max_processes);
    println!("  Max output: {:?} KB", limits.max_output);
    println!();
    println!("Docker binary: {}", config.docker_binary().display());
    println!("Workspace root: {}", config.workspace_root.display());
    println!("Max concurrent runs: {}", config.max_concurrent_runs);
    println!("Pull policy: {}", config.pull_policy.as_str());
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
