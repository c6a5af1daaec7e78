//! paintcalc CLI - check estimator workbooks and price estimates

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use paintcalc::analysis::analyze;
use paintcalc::{CompiledWorkbook, Engine, EngineConfig, EstimateInput, PricingTier};
use paintcalc_core::Workbook;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "paintcalc")]
#[command(author, version, about = "Paint estimate calculation tool")]
struct Cli {
    /// More logging (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a workbook and report its size
    Check {
        /// Workbook definition (JSON)
        workbook: PathBuf,
    },

    /// Categorize a workbook's formulas
    Analyze {
        /// Workbook definition (JSON)
        workbook: PathBuf,

        /// Number of most complex formulas to list
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Price an estimate input against a workbook
    #[command(alias = "calc")]
    Calculate {
        /// Workbook definition (JSON)
        workbook: PathBuf,

        /// Estimate input record (JSON)
        input: PathBuf,

        /// Engine configuration (JSON, default: built-in)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print the result
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check { workbook } => check(&workbook),
        Commands::Analyze {
            workbook,
            top,
            json,
        } => show_analysis(&workbook, top, json),
        Commands::Calculate {
            workbook,
            input,
            config,
            pretty,
        } => calculate(&workbook, &input, config.as_deref(), pretty),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_workbook(path: &Path) -> Result<Workbook> {
    let file = File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    Workbook::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to load workbook '{}'", path.display()))
}

fn compile(path: &Path) -> Result<CompiledWorkbook> {
    let workbook = load_workbook(path)?;
    CompiledWorkbook::compile(workbook)
        .with_context(|| format!("Failed to compile '{}'", path.display()))
}

fn check(path: &Path) -> Result<()> {
    let compiled = compile(path)?;
    let stats = compiled.stats();

    println!("Workbook: {}", compiled.workbook().identity());
    println!("Sheets: {}", stats.sheets);
    println!("Cells: {} ({} formulas)", stats.cells, stats.formulas);
    println!("Dependencies: {}", stats.edges);
    println!("Inputs: {}", stats.inputs);
    println!("Sections: {}", stats.sections);
    println!("Outputs: {}", stats.outputs);
    Ok(())
}

fn show_analysis(path: &Path, top: usize, json: bool) -> Result<()> {
    let workbook = load_workbook(path)?;
    let analysis = analyze(&workbook, top);

    if json {
        let text = serde_json::to_string_pretty(&analysis).context("Failed to serialize analysis")?;
        println!("{}", text);
        return Ok(());
    }

    println!("Formulas: {}", analysis.total_formulas);
    if analysis.parse_errors > 0 {
        println!("Unparseable: {}", analysis.parse_errors);
    }

    println!();
    println!("By category:");
    for (category, count) in &analysis.by_category {
        println!("  {:<12} {}", category, count);
    }

    println!();
    println!("By sheet:");
    for (sheet, count) in &analysis.by_sheet {
        println!("  {:<12} {}", sheet, count);
    }

    if !analysis.most_complex.is_empty() {
        println!();
        println!("Most complex:");
        for summary in &analysis.most_complex {
            println!(
                "  {:<12} {:>3} refs  {}",
                summary.cell, summary.references, summary.formula
            );
        }
    }
    Ok(())
}

fn calculate(
    workbook: &Path,
    input: &Path,
    config: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let compiled = compile(workbook)?;
    let engine = Engine::new(Arc::new(compiled), config).context("Invalid engine configuration")?;

    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;
    let input_record = EstimateInput::from_json_str(&text)
        .with_context(|| format!("Failed to parse input '{}'", input.display()))?;

    let result = engine
        .calculate(&input_record)
        .context("Failed to calculate estimate")?;

    let json = if pretty {
        result.to_json_pretty()
    } else {
        result.to_json()
    }
    .context("Failed to serialize result")?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json).context("Failed to write to stdout")?;

    for tier in PricingTier::ALL {
        eprintln!("{:<7} {}", tier, result.final_price(tier));
    }
    Ok(())
}
