use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::control::set_override as set_color_override;
use jsonlogic_compat::config::EnginesConfig;
use jsonlogic_compat::harness::{self, PersistPolicy, RunPlan};
use jsonlogic_compat::registry::EngineRegistry;
use jsonlogic_compat::report::{build_matrix, load_results, render_markdown, render_text, Reporter};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Run the shared JsonLogic test suites against one or more engines")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log progress details (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable coloured output
    #[arg(long = "no-color", global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the suites and merge the counts into a results file
    Run(RunArgs),
    /// Render the compatibility matrix from every results file
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Engine(s) to test, by registry name
    #[arg(
        short = 'e',
        long = "engine",
        env = "LIBRARY",
        value_delimiter = ',',
        required = true
    )]
    engines: Vec<String>,

    /// Directory holding index.json and the suite files
    #[arg(long, value_name = "DIR", default_value = "suites")]
    suites: PathBuf,

    /// Results file for this ecosystem
    #[arg(long, value_name = "FILE", default_value = "results/rust.json")]
    results: PathBuf,

    /// Engine registry (YAML)
    #[arg(long, value_name = "FILE", default_value = "engines.yaml")]
    config: PathBuf,

    /// Write the results file even if the run aborts
    #[arg(long = "best-effort")]
    best_effort: bool,

    /// Do not print a progress line per case
    #[arg(short = 'q', long = "silent")]
    silent: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ReportFormat {
    Markdown,
    Text,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Directory of per-ecosystem results files
    #[arg(long = "results-dir", value_name = "DIR", default_value = "results")]
    results_dir: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "markdown")]
    format: ReportFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "jsonlogic_compat=info".to_string())
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "jsonlogic_compat=warn".to_string())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    set_color_override(!cli.no_color);

    match cli.command {
        Command::Run(args) => run(args),
        Command::Report(args) => report(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = EnginesConfig::load(&args.config)
        .with_context(|| format!("loading engine registry {}", args.config.display()))?;
    let registry = EngineRegistry::from_config(&config);
    info!(engines = ?registry.names().collect::<Vec<_>>(), "engine registry loaded");

    let plan = RunPlan {
        suites_dir: args.suites,
        results_file: args.results,
        engines: args.engines,
        policy: if args.best_effort {
            PersistPolicy::BestEffort
        } else {
            PersistPolicy::Strict
        },
    };

    let mut reporter = Reporter::new(io::stdout().lock()).silent(args.silent);
    let outcome = harness::run(&registry, &plan, &mut reporter)?;
    drop(reporter);

    if !outcome.unavailable.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}

fn report(args: ReportArgs) -> Result<()> {
    let results = load_results(&args.results_dir)?;
    if args.output.is_some() {
        set_color_override(false);
    }
    let matrix = build_matrix(&results).generated_now();
    let rendered = match args.format {
        ReportFormat::Markdown => render_markdown(&matrix),
        ReportFormat::Text => render_text(&matrix),
    };
    match args.output {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("writing report to {}", path.display()))?;
            println!("Report generated: {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
