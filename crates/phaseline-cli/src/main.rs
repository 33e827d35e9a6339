//! phaseline CLI - Project portfolio timelines
//!
//! Command-line interface for loading, filtering and charting portfolio data.

mod config;
mod report;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use phaseline_core::{Renderer, TagField};
use phaseline_parser::{parse_date_range_with, RolloverPolicy, TagFilter};
use phaseline_render::{AggregatorConfig, SummaryRenderer};
use phaseline_source::{Session, SourceChain};

use config::{Config, Overrides, DEFAULT_CONFIG_FILE};
use report::ExitCode;

#[derive(Parser)]
#[command(name = "phaseline")]
#[command(author, version, about = "Project portfolio timelines", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    sources: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// CSV-derived JSON export (path or URL)
    #[arg(long, global = true, value_name = "LOCATION")]
    csv_json: Option<String>,

    /// Normalized bundle JSON (path or URL)
    #[arg(long, global = true, value_name = "LOCATION")]
    data: Option<String>,

    /// Remote database token
    #[arg(long, global = true, env = "PHASELINE_REMOTE_TOKEN", hide_env_values = true)]
    remote_token: Option<String>,

    /// Remote database identifier
    #[arg(long, global = true, env = "PHASELINE_DATABASE_ID")]
    database_id: Option<String>,

    /// Narrow viewport: shorter labels, taller rows, no legend
    #[arg(long, global = true)]
    mobile: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load from the first available source and print the bundle
    Load {
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the distinct values of a tag field
    Tags {
        /// Tag field (org-unit, program)
        #[arg(value_name = "FIELD")]
        field: TagField,

        /// Print a JSON array instead of one value per line
        #[arg(long)]
        json: bool,
    },

    /// Build the chart series, layout and summary
    Chart {
        #[command(flatten)]
        filter: FilterArgs,

        /// Reference date for "today" (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        today: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ChartFormat::Json)]
        format: ChartFormat,
    },

    /// Show the dashboard counts
    Stats {
        #[command(flatten)]
        filter: FilterArgs,

        /// Reference date for "today" (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        today: Option<NaiveDate>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a "DD/MM/YYYY → DD/MM/YYYY" range and print it as ISO dates
    ParseRange {
        #[arg(value_name = "RANGE")]
        range: String,

        /// Reject impossible calendar dates instead of rolling them over
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Keep tasks whose organizational unit contains this text
    #[arg(long)]
    org_unit: Option<String>,

    /// Keep tasks whose program contains this text
    #[arg(long)]
    program: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> TagFilter {
        TagFilter {
            org_unit: self.org_unit.clone(),
            program: self.program.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ChartFormat {
    Json,
    Text,
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => ExitCode::Success,
        Err(error) => {
            eprintln!("{}", report::format_error(&error));
            ExitCode::Failure
        }
    };
    code.into()
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::ParseRange { range, strict } = &cli.command {
        return cmd_parse_range(range, *strict);
    }

    let mut config = Config::load(&cli.config)?;
    config.apply_overrides(&Overrides {
        csv_json: cli.sources.csv_json.clone(),
        data: cli.sources.data.clone(),
        remote_token: cli.sources.remote_token.clone(),
        database_id: cli.sources.database_id.clone(),
        mobile: cli.sources.mobile,
    });

    let mut session = load_session(&config).await?;

    match cli.command {
        Commands::Load { output } => cmd_load(&session, output),
        Commands::Tags { field, json } => cmd_tags(&session, field, json),
        Commands::Chart {
            filter,
            today,
            format,
        } => {
            session.apply_filter(filter.to_filter());
            cmd_chart(&session, &config, today.unwrap_or_else(today_local), format)
        }
        Commands::Stats {
            filter,
            today,
            json,
        } => {
            session.apply_filter(filter.to_filter());
            cmd_stats(&session, &config, today.unwrap_or_else(today_local), json)
        }
        Commands::ParseRange { .. } => Ok(()),
    }
}

fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

async fn load_session(config: &Config) -> Result<Session> {
    let chain = SourceChain::from_config(&config.source_config())?
        .normalizer(config.normalizer())
        .project(config.project_summary());

    let mut session =
        Session::new(config.normalizer()).phase_order(config.display.phase_order.clone());
    let ticket = session.begin_load();
    let loaded = chain.load().await.context("Failed to load portfolio")?;
    session.complete_load(ticket, loaded);
    Ok(session)
}

fn write_output(content: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

fn cmd_load(session: &Session, output: Option<PathBuf>) -> Result<()> {
    let bundle = session.current();
    let json = serde_json::to_string_pretty(bundle.as_ref())?;
    write_output(&json, output)
}

fn cmd_tags(session: &Session, field: TagField, json: bool) -> Result<()> {
    let values = session.tag_index(field);
    if json {
        println!("{}", serde_json::to_string(&values)?);
    } else {
        for value in values {
            println!("{}", value);
        }
    }
    Ok(())
}

fn cmd_chart(
    session: &Session,
    config: &Config,
    today: NaiveDate,
    format: ChartFormat,
) -> Result<()> {
    let viewport = config.display.viewport;
    let aggregator = AggregatorConfig {
        phase_order: config.display.phase_order.clone(),
        viewport,
    };
    let bundle = session.current();

    match format {
        ChartFormat::Json => {
            let view = session.chart(viewport, today);
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        ChartFormat::Text => {
            let text = SummaryRenderer::new(today)
                .aggregator(aggregator)
                .render(&bundle)?;
            print!("{}", text);
        }
    }
    Ok(())
}

fn cmd_stats(session: &Session, config: &Config, today: NaiveDate, json: bool) -> Result<()> {
    if json {
        let view = session.chart(config.display.viewport, today);
        println!("{}", serde_json::to_string_pretty(&view.stats)?);
        return Ok(());
    }
    let text = SummaryRenderer::new(today)
        .stats_only()
        .render(&session.current())?;
    print!("{}", text);
    Ok(())
}

fn cmd_parse_range(range: &str, strict: bool) -> Result<()> {
    let policy = if strict {
        RolloverPolicy::Strict
    } else {
        RolloverPolicy::Lenient
    };
    let Some(parsed) = parse_date_range_with(range, policy) else {
        bail!("not a valid date range: {:?}", range);
    };
    println!("{} → {}", parsed.start_iso(), parsed.end_iso());
    if parsed.is_inverted() {
        eprintln!("warning: range ends before it starts");
    }
    Ok(())
}
