//! datana CLI - Spreadsheet Dashboard Engine
//!
//! Command-line interface for loading sales sheets, aggregating them and
//! rendering the dashboard as text, JSON, chart payloads or Excel.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use datana_core::{FilterSet, Renderer};
use datana_engine::{Dashboard, EngineConfig};
use datana_render::{ChartRenderer, ExcelRenderer, TextRenderer};

/// Config file picked up from the working directory
const DEFAULT_CONFIG: &str = "datana.toml";

#[derive(Parser)]
#[command(name = "datana")]
#[command(author, version, about = "Spreadsheet dashboard engine", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine config file (defaults to ./datana.toml when present)
    #[arg(short, long, env = "DATANA_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a sheet and print the dashboard
    Summary {
        /// Input file path (.json or .csv)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Leave the per-product table out of the text report
        #[arg(long)]
        compact: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which column each field was read from
    Columns {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List the category and brand filter values
    Options {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the dashboard as an Excel workbook
    Export {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output .xlsx path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Keep records dated on or after this day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    from: Option<NaiveDate>,

    /// Keep records dated on or before this day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    to: Option<NaiveDate>,

    /// Allowed category (repeatable)
    #[arg(long = "category", value_name = "CATEGORY")]
    categories: Vec<String>,

    /// Allowed brand (repeatable)
    #[arg(long = "brand", value_name = "BRAND")]
    brands: Vec<String>,
}

impl FilterArgs {
    fn to_filter_set(&self) -> FilterSet {
        let mut filters = FilterSet::new();
        filters.start_date = self.from;
        filters.end_date = self.to;
        filters.categories.extend(self.categories.iter().cloned());
        filters.brands.extend(self.brands.iter().cloned());
        filters
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Plain-text report
    Text,
    /// The full dashboard series as JSON
    Json,
    /// Chart card payloads as JSON
    Charts,
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Summary {
            file,
            filters,
            format,
            compact,
            output,
        } => cmd_summary(&file, &filters, format, compact, output.as_deref(), config),
        Commands::Columns { file } => cmd_columns(&file, config),
        Commands::Options { file, json } => cmd_options(&file, json, config),
        Commands::Export {
            file,
            filters,
            output,
        } => cmd_export(&file, &filters, &output, config),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    let default = Path::new(DEFAULT_CONFIG);
    if default.exists() {
        tracing::info!(path = DEFAULT_CONFIG, "using config from working directory");
        return EngineConfig::load(default)
            .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG));
    }
    Ok(EngineConfig::default())
}

fn load_dashboard(file: &Path, config: EngineConfig) -> Result<Dashboard> {
    let rows = datana_ingest::load_file(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    tracing::info!(rows = rows.len(), file = %file.display(), "loaded sheet");
    Ok(Dashboard::with_config(rows, config))
}

fn cmd_summary(
    file: &Path,
    filters: &FilterArgs,
    format: OutputFormat,
    compact: bool,
    output: Option<&Path>,
    config: EngineConfig,
) -> Result<()> {
    let dashboard = load_dashboard(file, config)?;
    let series = dashboard.series(&filters.to_filter_set());
    if series.unreadable_rows > 0 {
        tracing::warn!(
            unreadable = series.unreadable_rows,
            "some rows had no readable numbers and count as zero"
        );
    }

    let rendered = match format {
        OutputFormat::Text => {
            let renderer = if compact {
                TextRenderer::new().compact()
            } else {
                TextRenderer::new()
            };
            renderer.render(&series)?
        }
        OutputFormat::Json => serde_json::to_string_pretty(&series)?,
        OutputFormat::Charts => serde_json::to_string_pretty(&ChartRenderer::new().render(&series)?)?,
    };

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Written: {}", path.display());
        }
        None => print!("{}", ensure_newline(rendered)),
    }
    Ok(())
}

fn cmd_columns(file: &Path, config: EngineConfig) -> Result<()> {
    let dashboard = load_dashboard(file, config)?;
    print!("{}", dashboard.columns());
    Ok(())
}

fn cmd_options(file: &Path, json: bool, config: EngineConfig) -> Result<()> {
    let dashboard = load_dashboard(file, config)?;
    let options = dashboard.filter_options();
    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    println!("Categories:");
    for category in &options.categories {
        println!("  {category}");
    }
    println!("Brands:");
    for brand in &options.brands {
        println!("  {brand}");
    }
    Ok(())
}

fn cmd_export(file: &Path, filters: &FilterArgs, output: &Path, config: EngineConfig) -> Result<()> {
    let dashboard = load_dashboard(file, config)?;
    let series = dashboard.series(&filters.to_filter_set());

    let bytes = ExcelRenderer::new()
        .render(&series)
        .context("Failed to render Excel report")?;
    fs::write(output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Written: {}", output.display());
    Ok(())
}

fn ensure_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
