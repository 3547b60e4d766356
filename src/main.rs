// SPDX-License-Identifier: PMPL-1.0-or-later
//! a11yaudit CLI - heuristic WCAG audits for HTML files, URLs and directories

use a11yaudit::config::{self, EngineChoice};
use a11yaudit::model::AuditInput;
use a11yaudit::report::{generate_listing, generate_report, generate_scan_report, OutputFormat};
use a11yaudit::store::{JsonDirStore, ReportStore};
use a11yaudit::{scanner, AuditConfig, Auditor};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Heuristic WCAG accessibility audits for HTML documents
#[derive(Parser)]
#[command(name = "a11yaudit")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: FormatArg,

    /// Evaluator preference (overrides the config file)
    #[arg(long, global = true)]
    engine: Option<EngineArg>,

    /// Byte cap on audited HTML (overrides the config file)
    #[arg(long, global = true)]
    max_bytes: Option<usize>,

    /// Time budget in milliseconds (overrides the config file)
    #[arg(long, global = true)]
    budget_ms: Option<u64>,

    /// Config file (TOML or YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for stored reports (overrides the config file)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit one HTML document from a file, stdin or a URL
    Audit {
        /// HTML file, or `-` for stdin
        file: Option<PathBuf>,

        /// URL to fetch when no file is given, or to record as the source
        #[arg(long)]
        url: Option<String>,
    },

    /// Audit every .html/.htm file under a directory
    Scan {
        /// Directory to scan
        dir: PathBuf,
    },

    /// Inspect stored reports
    Reports {
        #[command(subcommand)]
        action: ReportsCommand,
    },

    /// Write a default config file
    InitConfig {
        /// Destination (defaults to the user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ReportsCommand {
    /// List stored reports, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 20)]
        per_page: usize,
    },

    /// Show one stored report
    Show {
        id: u64,
    },
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Engine CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineArg {
    /// Structured engine when built in, pattern otherwise
    Auto,
    /// Pattern engine only
    Pattern,
}

impl From<EngineArg> for EngineChoice {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Auto => EngineChoice::Auto,
            EngineArg::Pattern => EngineChoice::Pattern,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("a11yaudit=debug")
    } else {
        EnvFilter::new("a11yaudit=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file values with command-line overrides applied
fn resolve_config(cli: &Cli) -> anyhow::Result<AuditConfig> {
    let path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut config = config::load_config(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(engine) = cli.engine {
        config.engine = engine.into();
    }
    if let Some(max_bytes) = cli.max_bytes {
        config.max_bytes = max_bytes;
    }
    if let Some(budget_ms) = cli.budget_ms {
        config.time_budget_ms = budget_ms;
    }
    if let Some(store) = &cli.store {
        config.store.dir = Some(store.clone());
    }
    Ok(config)
}

fn read_input(file: Option<&Path>, url: Option<String>) -> anyhow::Result<AuditInput> {
    let html = match file {
        Some(p) if p == Path::new("-") => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("Failed to read stdin")?;
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
        Some(p) => {
            let bytes =
                std::fs::read(p).with_context(|| format!("Failed to read {}", p.display()))?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        None => None,
    };
    Ok(AuditInput { html, url })
}

fn report_store(config: &AuditConfig) -> anyhow::Result<JsonDirStore> {
    match &config.store.dir {
        Some(dir) => Ok(JsonDirStore::new(dir)),
        None => bail!("No report store configured; pass --store or set store.dir in the config"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format: OutputFormat = cli.format.into();

    match &cli.command {
        Commands::Audit { file, url } => {
            let config = resolve_config(&cli)?;
            let input = read_input(file.as_deref(), url.clone())?;
            let response = Auditor::new(config).audit_response(&input);
            write_output(&generate_report(&response, format), cli.output.as_deref())?;

            if !response.ok {
                std::process::exit(1);
            }
        }

        Commands::Scan { dir } => {
            let config = resolve_config(&cli)?;
            let auditor = Auditor::new(config);
            let results = scanner::scan_directory(dir, &auditor)?;
            write_output(&generate_scan_report(&results, format), cli.output.as_deref())?;

            if results.iter().any(|r| !r.response.ok) {
                std::process::exit(1);
            }
        }

        Commands::Reports { action } => {
            let store = report_store(&resolve_config(&cli)?)?;
            match action {
                ReportsCommand::List { page, per_page } => {
                    let listing = store.list(*page, *per_page)?;
                    write_output(&generate_listing(&listing, format), cli.output.as_deref())?;
                }
                ReportsCommand::Show { id } => match store.get(*id)? {
                    Some(stored) => {
                        let response = a11yaudit::AuditResponse::success(stored.report);
                        write_output(&generate_report(&response, format), cli.output.as_deref())?;
                    }
                    None => bail!("No stored report with id {}", id),
                },
            }
        }

        Commands::InitConfig { path, force } => {
            let path = path.clone().unwrap_or_else(config::default_config_path);
            if path.exists() && !force {
                bail!("{} already exists; use --force to overwrite", path.display());
            }
            config::write_default_config(&path)?;
            eprintln!("Default config written to {}", path.display());
        }
    }

    Ok(())
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
