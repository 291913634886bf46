use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use cadence_core::{CadenceConfig, OutputFormat, CONFIG_FILE_NAME};
use cadence_history::loader::load_commits;
use cadence_history::mining::{export_commits, ExportOptions};
use cadence_report::pipeline;

#[derive(Parser)]
#[command(
    name = "cadence",
    version,
    about = "Commit and code-review activity reports",
    long_about = "Cadence turns a project's commit log and code-review history into yearly\n\
                  activity reports: commits per month, new contributors per month, and a\n\
                  smoothed weekly count of review transactions.\n\n\
                  Examples:\n  \
                    cadence                          Run every analysis for the configured year\n  \
                    cadence commits --year 2020      Monthly commit frequency for 2020\n  \
                    cadence reviews --format json    Weekly review series as JSON\n  \
                    cadence export --repo ../gecko   Write the commit CSV from a git repository\n  \
                    cadence init                     Create a .cadence.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .cadence.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for statistics.\n\n\
                       Formats:\n  \
                         text      Fixed-width tables (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown tables"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Target year (overrides [dataset] year)
    #[arg(long, global = true)]
    year: Option<i32>,

    /// Skip writing SVG charts
    #[arg(long, global = true)]
    no_charts: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run every analysis in sequence (the default)
    #[command(long_about = "Run every analysis in sequence.\n\n\
        1. Monthly commit frequency from the commit CSV\n\
        2. First commit per author, saved to the first-commits CSV\n\
        3. Monthly new contributors from the saved first commits\n\
        4. Weekly review transactions, skipped if the review JSON is missing")]
    Run,
    /// Monthly commit frequency
    Commits,
    /// Extract first commits per author and chart new contributors
    #[command(long_about = "Extract first commits per author and chart new contributors.\n\n\
        Rewrites the first-commits CSV from the commit CSV, then re-reads it and\n\
        counts new contributors per month.")]
    Contributors,
    /// Weekly code-review transactions with a rolling mean
    Reviews,
    /// Export a git repository's history as the commit CSV
    #[command(long_about = "Export a git repository's history as the commit CSV.\n\n\
        Writes one `author,date` row per commit, newest first, with dates in git's\n\
        default format and each commit's own UTC offset.\n\n\
        Examples:\n  cadence export --repo ../gecko\n  cadence export --repo . --branch release --output release.csv")]
    Export {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Output CSV (default: [dataset] commits)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Branch to walk (default: HEAD)
        #[arg(long)]
        branch: Option<String>,
    },
    /// Create a default .cadence.toml configuration file
    #[command(long_about = "Create a default .cadence.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .cadence.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# Cadence Configuration

[dataset]
# year = 2021
# commits = "firefox_commits.csv"
# first_commits = "firefox_first_commits.csv"
# "{year}" is replaced with the target year
# reviews = "phab_firefox_revisions_{year}.json"

[charts]
# enabled = true
# dir = "charts"
# width = 1500
# height = 800

[reviews]
# Wall clock used for review timestamps: "local" or "utc"
# timezone = "local"
# smoothing_window = 4
"#;

fn load_config(cli: &Cli) -> Result<CadenceConfig> {
    let mut config = match &cli.config {
        Some(path) => CadenceConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE_NAME);
            if default_path.exists() {
                CadenceConfig::from_file(default_path)?
            } else {
                CadenceConfig::default()
            }
        }
    };

    tracing::info!(
        year = config.dataset.year,
        charts = config.charts.enabled,
        "resolved configuration"
    );

    if let Some(year) = cli.year {
        config.dataset.year = year;
    }
    if cli.no_charts {
        config.charts.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

fn warn_missing_reviews(config: &CadenceConfig) {
    eprintln!(
        "Warning: Could not find {}",
        config.dataset.reviews_path().display()
    );
    eprintln!("Skipping review data analysis.");
}

fn emit(rendered: &str) {
    if rendered.is_empty() {
        return;
    }
    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE_NAME);
            if path.exists() {
                miette::bail!("{CONFIG_FILE_NAME} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE_NAME} with default configuration");
            return Ok(());
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "cadence", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&cli)?;
    let year = config.dataset.year;

    if cli.verbose {
        eprintln!("format: {}", cli.format);
        eprintln!(
            "year: {year}, commits: {}, reviews: {}",
            config.dataset.commits.display(),
            config.dataset.reviews_path().display()
        );
        if config.charts.enabled {
            eprintln!(
                "charts: {} ({}x{})",
                config.charts.dir.display(),
                config.charts.width,
                config.charts.height
            );
        } else {
            eprintln!("charts: disabled");
        }
        eprintln!(
            "reviews: {} time, {}-week rolling mean",
            config.reviews.timezone, config.reviews.smoothing_window
        );
    }

    match cli.command {
        None | Some(Command::Run) => {
            let outcome = pipeline::run_all(&config, |step| eprintln!("{step}"))?;
            if outcome.reviews.is_none() {
                warn_missing_reviews(&config);
            }
            emit(&outcome.render(cli.format)?);
            if cli.format == OutputFormat::Text {
                eprintln!("\nAnalysis complete!");
            }
        }
        Some(Command::Commits) => {
            eprintln!("Analyzing monthly commits for {year}...");
            let records = load_commits(&config.dataset.commits)?;
            let outcome = pipeline::monthly_commits(&records, &config)?;
            emit(&outcome.render(cli.format)?);
        }
        Some(Command::Contributors) => {
            eprintln!("Creating first commits dataset...");
            let records = load_commits(&config.dataset.commits)?;
            let saved = pipeline::create_first_commits(&records, &config)?;
            eprintln!("Analyzing monthly new contributors for {year}...");
            let outcome = pipeline::analyze_new_contributors(&config)?;
            match cli.format {
                OutputFormat::Json => {
                    let doc = serde_json::json!({
                        "firstCommits": saved,
                        "newContributors": outcome,
                    });
                    println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
                }
                format => {
                    emit(&saved.render(format)?);
                    emit(&outcome.render(format)?);
                }
            }
        }
        Some(Command::Reviews) => {
            eprintln!("Analyzing weekly review activity for {year}...");
            match pipeline::analyze_review_activity(&config)? {
                Some(outcome) => {
                    emit(&outcome.render(cli.format)?);
                    if cli.format == OutputFormat::Text {
                        eprintln!(
                            "{} review transactions across {} weeks.",
                            outcome.report.total(),
                            outcome.report.weeks.len()
                        );
                    }
                }
                None => warn_missing_reviews(&config),
            }
        }
        Some(Command::Export {
            ref repo,
            ref output,
            ref branch,
        }) => {
            let output = output.clone().unwrap_or_else(|| config.dataset.commits.clone());
            let options = ExportOptions {
                branch: branch.clone(),
            };

            let is_tty = std::io::stderr().is_terminal();
            let spinner = if is_tty {
                let pb = indicatif::ProgressBar::new_spinner();
                pb.set_style(
                    indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                        .into_diagnostic()?,
                );
                pb.set_message(format!("Exporting history of {}...", repo.display()));
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                Some(pb)
            } else {
                eprintln!("Exporting history of {}...", repo.display());
                None
            };

            let written = export_commits(repo, &output, &options).inspect_err(|_e| {
                if let Some(pb) = &spinner {
                    pb.finish_with_message("Failed");
                }
            })?;

            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            match cli.format {
                OutputFormat::Json => {
                    let doc = serde_json::json!({
                        "commits": written,
                        "output": output,
                    });
                    println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
                }
                _ => println!("Wrote {written} commits to '{}'", output.display()),
            }
        }
        Some(Command::Init) | Some(Command::Completions { .. }) => unreachable!(),
    }

    Ok(())
}
