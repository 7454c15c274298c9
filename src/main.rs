//! `listado` CLI - fetch, parse and publish a supplier price list

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use listado::config::{self, AppConfig};
use listado::engine::{EngineConfig, Extraction};
use listado::sink;

#[derive(Parser)]
#[command(name = "listado")]
#[command(about = "Supplier price-list extractor: PDF in, (code, description, unit, price) out")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the price-list PDF, extract records, write CSV and spreadsheet
    Sync {
        /// Source PDF URL (defaults to source_url from the config file)
        url: Option<String>,

        /// Path of the CSV artifact
        #[arg(long, default_value = "proveedor_extracted.csv")]
        csv: PathBuf,

        /// Skip the spreadsheet write
        #[arg(long)]
        no_sheet: bool,

        /// Spreadsheet id (defaults to spreadsheet_id from the config file)
        #[arg(long)]
        spreadsheet: Option<String>,

        /// Worksheet name
        #[arg(long)]
        sheet_name: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Extract records from a local PDF and print them as CSV
    Parse {
        /// Path to the PDF file
        file: PathBuf,

        /// Write CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine policy overrides. Unset flags fall back to the config file, which
/// falls back to the built-in defaults.
#[derive(Args)]
struct EngineArgs {
    /// Minimum accepted price value
    #[arg(long)]
    floor: Option<f64>,

    /// Vertical clustering tolerance for the word path
    #[arg(long)]
    tolerance: Option<f32>,

    /// Disable code carry-over from code-only lines
    #[arg(long)]
    no_carryover: bool,

    /// Carry-over aging window, in lines
    #[arg(long)]
    carryover_window: Option<usize>,

    /// Clear the pending description when a boilerplate line is skipped
    #[arg(long)]
    clear_pending_on_skip: bool,
}

impl EngineArgs {
    fn apply(&self, mut cfg: EngineConfig) -> EngineConfig {
        if let Some(floor) = self.floor {
            cfg.price_floor = floor;
        }
        if let Some(tolerance) = self.tolerance {
            cfg.line_tolerance = tolerance;
        }
        if self.no_carryover {
            cfg.carryover = false;
        }
        if let Some(window) = self.carryover_window {
            cfg.carryover_window = window;
        }
        if self.clear_pending_on_skip {
            cfg.clear_pending_on_skip = true;
        }
        cfg
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let app = config::load()?;

    match cli.command {
        Commands::Sync {
            url,
            csv,
            no_sheet,
            spreadsheet,
            sheet_name,
            engine,
        } => cmd_sync(app, url, &csv, no_sheet, spreadsheet, sheet_name, &engine).await,
        Commands::Parse {
            file,
            output,
            engine,
        } => cmd_parse(&app, &file, output.as_deref(), &engine),
    }
}

async fn cmd_sync(
    app: AppConfig,
    url: Option<String>,
    csv_path: &Path,
    no_sheet: bool,
    spreadsheet: Option<String>,
    sheet_name: Option<String>,
    engine_args: &EngineArgs,
) -> Result<()> {
    let source = url
        .or_else(|| app.source_url.clone())
        .context("no source URL: pass one or set source_url in the config file")?;

    let bytes = listado::fetch::download_pdf(&source).await?;
    let extraction = extract(&bytes, engine_args.apply(app.engine.clone()))?;

    println!(
        "{} records ({} merged from split lines)",
        extraction.records.len(),
        extraction.stats.pending_merges
    );

    sink::csv::write_file(csv_path, &extraction.records)?;

    if !no_sheet {
        let id = spreadsheet
            .or(app.spreadsheet_id)
            .context("no spreadsheet id: pass --spreadsheet or set spreadsheet_id in the config file")?;
        let name = sheet_name
            .or(app.sheet_name)
            .unwrap_or_else(|| "LISTA_PROVEEDOR".to_string());
        let writer = sink::sheets::SheetsWriter::from_env(&id, &name)?;
        writer.replace_all(&extraction.records).await?;
    }

    Ok(())
}

fn cmd_parse(
    app: &AppConfig,
    file: &Path,
    output: Option<&Path>,
    engine_args: &EngineArgs,
) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let extraction = extract(&bytes, engine_args.apply(app.engine.clone()))?;

    match output {
        Some(path) => sink::csv::write_file(path, &extraction.records)?,
        None => sink::csv::write_to(std::io::stdout().lock(), &extraction.records)?,
    }

    Ok(())
}

#[cfg(feature = "pdf")]
fn extract(bytes: &[u8], cfg: EngineConfig) -> Result<Extraction> {
    let engine = listado::engine::Engine::new(cfg);
    let pages = listado::pdf::extract_pages(bytes)?;
    Ok(engine.process_pages(&pages))
}

#[cfg(not(feature = "pdf"))]
fn extract(_bytes: &[u8], _cfg: EngineConfig) -> Result<Extraction> {
    anyhow::bail!("this build has no PDF backend; rebuild with --features pdf")
}
