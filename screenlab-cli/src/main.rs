//! ScreenLab CLI: run, benchmark, and validate commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and write artifacts
//! - `benchmark`: replay a reference index over a config's rebalance grid
//! - `validate`: parse and validate a config file without running it
//!
//! Market data comes from long-format CSV files or a seeded synthetic universe.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use screenlab_core::data::{InMemoryProvider, SyntheticUniverse, SYNTHETIC_INDEX};
use screenlab_core::Configuration;
use screenlab_runner::export::{export_benchmark_csv, save_artifacts};
use screenlab_runner::{
    run_benchmark, run_with_benchmark, BacktestConfig, BacktestResult, BenchmarkResult, Metrics,
};

#[derive(Parser)]
#[command(
    name = "screenlab",
    version,
    about = "ScreenLab CLI: fundamental-screen equity backtests"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        /// Benchmark index symbol. Overrides the config's [benchmark] section.
        #[arg(long)]
        benchmark: Option<String>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,
    },
    /// Replay a benchmark index over a config's rebalance grid.
    Benchmark {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        /// Index symbol. Defaults to the config's [benchmark] section.
        #[arg(long)]
        symbol: Option<String>,

        /// Write the benchmark curve to this CSV file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse and validate a config file.
    Validate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
}

/// Where market data comes from.
#[derive(Args)]
struct DataArgs {
    /// Long-format price CSV (date,symbol,close).
    #[arg(long, conflicts_with = "synthetic")]
    prices: Option<PathBuf>,

    /// Fundamentals CSV (symbol,date|year,market_cap,roce,roe,pe,pat).
    #[arg(long, requires = "prices")]
    fundamentals: Option<PathBuf>,

    /// Generate a synthetic universe with this many instruments.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for the synthetic universe.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data,
            benchmark,
            output_dir,
            no_artifacts,
        } => run_cmd(&config, &data, benchmark, &output_dir, no_artifacts),
        Commands::Benchmark {
            config,
            data,
            symbol,
            output,
        } => benchmark_cmd(&config, &data, symbol, output.as_deref()),
        Commands::Validate { config } => validate_cmd(&config),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn load_config(path: &Path) -> Result<(BacktestConfig, Configuration)> {
    let file = BacktestConfig::from_file(path)?;
    let config = file
        .to_configuration()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok((file, config))
}

/// Build the provider. `index_symbol` is kept out of the investable universe.
fn load_provider(
    data: &DataArgs,
    config: &Configuration,
    index_symbol: Option<&str>,
) -> Result<InMemoryProvider> {
    match (&data.prices, data.synthetic) {
        (Some(prices), None) => {
            let indices: Vec<String> = index_symbol.map(str::to_string).into_iter().collect();
            Ok(InMemoryProvider::from_csv(
                prices.display().to_string(),
                prices,
                data.fundamentals.as_deref(),
                &indices,
            )?)
        }
        (None, Some(n)) => {
            if n == 0 {
                bail!("--synthetic needs at least one instrument");
            }
            Ok(SyntheticUniverse::new(n, data.seed).build(config.start_date, config.end_date))
        }
        (None, None) => bail!("one of --prices or --synthetic is required"),
        (Some(_), Some(_)) => bail!("--prices and --synthetic are mutually exclusive"),
    }
}

fn resolve_benchmark(
    flag: Option<String>,
    file: &BacktestConfig,
    data: &DataArgs,
) -> Option<String> {
    flag.or_else(|| file.benchmark_symbol().map(str::to_string))
        .or_else(|| data.synthetic.map(|_| SYNTHETIC_INDEX.to_string()))
}

fn run_cmd(
    config_path: &Path,
    data: &DataArgs,
    benchmark: Option<String>,
    output_dir: &Path,
    no_artifacts: bool,
) -> Result<()> {
    let (file, config) = load_config(config_path)?;
    let benchmark = resolve_benchmark(benchmark, &file, data);
    let provider = load_provider(data, &config, benchmark.as_deref())?;

    let result = run_with_benchmark(&config, &provider, benchmark.as_deref())?;
    print_summary(&result);

    if !no_artifacts {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn benchmark_cmd(
    config_path: &Path,
    data: &DataArgs,
    symbol: Option<String>,
    output: Option<&Path>,
) -> Result<()> {
    let (file, config) = load_config(config_path)?;
    let Some(symbol) = resolve_benchmark(symbol, &file, data) else {
        bail!("no benchmark symbol: pass --symbol or add a [benchmark] section");
    };
    let provider = load_provider(data, &config, Some(&symbol))?;

    let bench = run_benchmark(&config, &provider, &symbol, None)?;
    print_benchmark(&bench);

    if let Some(path) = output {
        std::fs::write(path, export_benchmark_csv(&bench)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Benchmark curve saved to: {}", path.display());
    }
    Ok(())
}

fn validate_cmd(config_path: &Path) -> Result<()> {
    let (file, config) = load_config(config_path)?;
    println!("Config OK: {}", config_path.display());
    println!("Period:         {} to {}", config.start_date, config.end_date);
    println!("Capital:        {:.2}", config.initial_capital);
    println!("Rebalance:      {}", config.frequency);
    println!("Portfolio:      {} ({})", config.portfolio_size, config.sizing);
    if !config.ranking.is_empty() {
        let mode = if config.composite_ranking { "composite" } else { "first criterion" };
        println!("Ranking:        {} [{mode}]", config.ranking);
    }
    if let Some(symbol) = file.benchmark_symbol() {
        println!("Benchmark:      {symbol}");
    }
    println!(
        "Requires:       {}",
        config
            .required_factors()
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn print_metrics(m: &Metrics) {
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Calmar:         {:.3}", m.calmar);
    println!("Volatility:     {:.2}%", m.annual_volatility * 100.0);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
}

fn print_summary(result: &BacktestResult) {
    let cfg = &result.config;
    println!();
    println!("=== Backtest Result ===");
    println!("Run:            {}", result.run_id);
    println!("Data:           {}", result.provider);
    println!("Period:         {} to {}", cfg.start_date, cfg.end_date);
    println!("Days:           {}", result.equity_curve.len());
    println!("Rebalances:     {}", result.rebalances.len());
    if let Some(value) = result.final_value() {
        println!("Final Value:    {value:.2}");
    }
    println!();
    println!("--- Performance ---");
    print_metrics(&result.metrics);
    if let Some(bench) = &result.benchmark {
        println!();
        print_benchmark(bench);
    }
    if result.has_warnings() {
        println!();
        for warn in &result.warnings {
            match warn.date {
                Some(date) => println!("WARNING [{date}]: {}", warn.message),
                None => println!("WARNING: {}", warn.message),
            }
        }
    }
}

fn print_benchmark(bench: &BenchmarkResult) {
    println!("--- Benchmark: {} ---", bench.symbol);
    if let Some(value) = bench.equity_curve.last().map(|p| p.value) {
        println!("Final Value:    {value:.2}");
    }
    print_metrics(&bench.metrics());
}
