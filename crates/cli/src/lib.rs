use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sheet_context_builder::{
    ChatMessage, ContextConfig, JsonFileSource, QueryContextBuilder, QueryType, WorkbookSnapshot,
};
use sheet_context_chunker::{RangeDetector, RangeInfo};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheet-context")]
#[command(about = "Ranked spreadsheet context for language-model questions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML configuration file (SHEET_CONTEXT_* env vars still apply)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the context bundle for a question and print its wire payload
    Context(ContextArgs),

    /// Print the detected ranges of every sheet
    Ranges(RangesArgs),
}

#[derive(Args)]
struct ContextArgs {
    /// Workbook capture: {"activeSheet": ..., "sheets": [...]}
    #[arg(long)]
    workbook: PathBuf,

    /// Question text
    #[arg(long, short, default_value = "")]
    query: String,

    /// Chat history JSON: [{"role": "user", "content": ...}, ...]
    #[arg(long)]
    history: Option<PathBuf>,

    /// general | formula | data | chart
    #[arg(long, default_value = "general")]
    query_type: QueryType,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct RangesArgs {
    /// Workbook capture JSON
    #[arg(long)]
    workbook: PathBuf,

    /// Only this sheet
    #[arg(long)]
    sheet: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetRanges {
    sheet_name: String,
    ranges: Vec<RangeInfo>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = ContextConfig::resolve(cli.config.as_deref()).context("Invalid configuration")?;

    match cli.command {
        Commands::Context(args) => run_context(args, config).await?,
        Commands::Ranges(args) => run_ranges(args, &config)?,
    }

    Ok(())
}

async fn run_context(args: ContextArgs, config: ContextConfig) -> Result<()> {
    let history = match &args.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let source = JsonFileSource::new(&args.workbook);
    let mut builder = QueryContextBuilder::new(source, config)?;
    let context = builder
        .build_context(args.query_type, &history, &args.query)
        .await
        .with_context(|| format!("Failed to build context from {}", args.workbook.display()))?;

    if context.is_degraded() {
        log::warn!("Degraded sheets: {}", context.degraded.join(", "));
    }

    let wire = builder.to_wire_format(&context)?;
    if args.pretty {
        let value: serde_json::Value = serde_json::from_str(&wire)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{wire}");
    }
    Ok(())
}

fn run_ranges(args: RangesArgs, config: &ContextConfig) -> Result<()> {
    let raw = fs::read_to_string(&args.workbook)
        .with_context(|| format!("Failed to read {}", args.workbook.display()))?;
    let snapshot = WorkbookSnapshot::from_json(&raw)?;
    let detector = RangeDetector::new(config.detector.clone())?
        .with_compressor_config(config.compressor.clone());

    let report: Vec<SheetRanges> = snapshot
        .sheets
        .iter()
        .filter(|s| args.sheet.as_deref().map_or(true, |name| s.name == name))
        .map(|sheet| SheetRanges {
            sheet_name: sheet.name.clone(),
            ranges: detector.detect(Some(sheet)).ranges,
        })
        .collect();

    if let Some(name) = &args.sheet {
        if report.is_empty() {
            anyhow::bail!("Sheet '{name}' not found in {}", args.workbook.display());
        }
    }

    print_json(&report, args.pretty)
}

fn load_history(path: &Path) -> Result<Vec<ChatMessage>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read history {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid chat history in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
