use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playbook::prelude::*;
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "playbook")]
#[command(about = "Evaluate and rank rule-driven pullback strategy variants", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run one or more variants over a data file
    Run {
        //json run configuration; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        //path to csv data file with indicator columns
        #[arg(long)]
        data: Option<PathBuf>,

        //variant keys (eg v2,v5 or 2,5); unknown keys fall back to the default
        #[arg(long, value_delimiter = ',')]
        variants: Vec<String>,

        //run every registered variant
        #[arg(long, conflicts_with = "variants")]
        all: bool,

        //json variant registry replacing the built-in catalog
        #[arg(long)]
        variants_file: Option<PathBuf>,

        //positions allowed open at once
        #[arg(long)]
        max_open_trades: Option<usize>,

        //output options
        //output path for the ranked summary csv
        #[arg(long)]
        output_csv: Option<PathBuf>,

        //output path for the ranked summary json
        #[arg(long)]
        output_json: Option<PathBuf>,

        //directory for per-variant trade csv files
        #[arg(long)]
        trades_dir: Option<PathBuf>,
    },

    //list registered variants
    Variants {
        #[arg(long)]
        variants_file: Option<PathBuf>,
    },

    //write a default run configuration
    InitConfig {
        #[arg(long, default_value = "playbook.json")]
        output: PathBuf,

        //also write the built-in registry so it can be edited
        #[arg(long)]
        registry_output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            variants,
            all,
            variants_file,
            max_open_trades,
            output_csv,
            output_json,
            trades_dir,
        } => {
            let mut run_config = match config {
                Some(path) => RunConfiguration::from_json_file(&path)?,
                None => RunConfiguration::default(),
            };

            //flags override file values
            if let Some(data) = data {
                run_config.data_path = data;
            }
            if all {
                run_config.variants.clear();
            } else if !variants.is_empty() {
                run_config.variants = variants;
            }
            if variants_file.is_some() {
                run_config.variants_file = variants_file;
            }
            if let Some(max_open_trades) = max_open_trades {
                run_config.max_open_trades = max_open_trades;
            }
            if output_csv.is_some() {
                run_config.output_csv = output_csv;
            }
            if output_json.is_some() {
                run_config.output_json = output_json;
            }
            if trades_dir.is_some() {
                run_config.trades_dir = trades_dir;
            }

            run_variants(&run_config)?;
        }
        Commands::Variants { variants_file } => {
            let registry = match variants_file {
                Some(path) => VariantRegistry::from_json_file(&path)?,
                None => VariantRegistry::builtin(),
            };
            print_registry(&registry);
        }
        Commands::InitConfig {
            output,
            registry_output,
        } => {
            RunConfiguration::default().to_json_file(&output)?;
            println!("Configuration written to {:?}", output);

            if let Some(path) = registry_output {
                VariantRegistry::builtin().to_json_file(&path)?;
                println!("Variant registry written to {:?}", path);
            }
        }
    }

    Ok(())
}

fn run_variants(config: &RunConfiguration) -> Result<()> {
    println!("Playbook Variant Evaluation");
    println!("===========================\n");

    //load data
    println!("Loading data from {:?}...", config.data_path);
    let frame = load_csv(&config.data_path)
        .context(format!("Failed to load data from {:?}", config.data_path))?;

    if let (Some(first), Some(last)) = (frame.first(), frame.last()) {
        println!("Loaded {} intervals", frame.len());
        println!("Date range: {} to {}\n", first.timestamp, last.timestamp);
    }

    let registry = config.registry()?;
    let selections = config.select(&registry);

    for selection in selections.iter().filter(|s| s.resolution.fell_back) {
        println!(
            "Unknown variant {:?}, using {}",
            selection.requested.unwrap_or_default(),
            selection.resolution.variant.name
        );
    }

    let variants: Vec<Variant> = selections
        .iter()
        .map(|s| s.resolution.variant.clone())
        .collect();

    println!(
        "Running {} variant(s), max open trades {}...\n",
        variants.len(),
        config.max_open_trades
    );
    let engine = BacktestEngine::new(config.backtest_config());
    let runs = engine
        .run_all(&frame, &variants)
        .context("Variant evaluation failed")?;

    let mut results: Vec<VariantRunResult> = runs.iter().map(|r| r.summary.clone()).collect();
    rank(&mut results);

    //display results
    if let [only] = results.as_slice() {
        println!("Variant Results");
        println!("===============\n");
        only.pretty_print_table();
    } else {
        println!("Ranked Results");
        println!("==============\n");
        print_ranked_table(&results);
    }

    let recap = top_recap(&results, 3);
    if !recap.is_empty() {
        println!("\nTop variants:");
        for line in recap {
            println!("  {}", line);
        }
    }

    //save outputs if requested
    if let Some(path) = &config.output_csv {
        write_summary_csv(&results, path)?;
        println!("\nSummary saved to {:?}", path);
    }

    if let Some(path) = &config.output_json {
        write_summary_json(&results, path)?;
        println!("Summary saved to {:?}", path);
    }

    if let Some(dir) = &config.trades_dir {
        let written = write_trade_files(&runs, dir)?;
        println!("Trades saved to {} file(s) in {:?}", written.len(), dir);
    }

    Ok(())
}

fn print_registry(registry: &VariantRegistry) {
    let mut table = Table::new();

    table.add_row(Row::new(vec![
        Cell::new("Key"),
        Cell::new("Description"),
        Cell::new("Pullback"),
        Cell::new("Confirmation"),
        Cell::new("Trend"),
        Cell::new("Exit"),
        Cell::new("TP (R)"),
    ]));

    for (key, variant) in registry.keys().zip(registry.variants()) {
        table.add_row(Row::new(vec![
            Cell::new(key),
            Cell::new(&variant.description),
            Cell::new(&format!("{:?}", variant.pullback)),
            Cell::new(&format!("{:?}", variant.confirmation)),
            Cell::new(&format!("{:?}", variant.trend_filter)),
            Cell::new(&format!("{:?}", variant.exit)),
            Cell::new(&format!("{:.1}", variant.tp_multiple)),
        ]));
    }

    table.printstd();
}
