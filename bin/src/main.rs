//! CLI for fd-sorts.
//!
//! Lists the signal registry and runs quantile portfolio sorts over signal
//! and return CSV exports.

use clap::{Parser, Subcommand};
use fd_sorts::{
    CsvReturnSource, CsvSignalSource, Period, SignalCategory, SignalInfo, SignalReport,
    SignalRegistry, SignalStudy, SortConfig,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fd-sorts")]
#[command(about = "Quantile portfolio sorts for firm-level signals", long_about = None)]
#[command(version)]
struct Cli {
    /// Signal documentation CSV replacing the built-in registry
    #[arg(long, global = true)]
    signal_doc: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all registered signals
    List,
    /// Show information about a specific signal
    Info {
        /// Signal acronym
        signal: String,
    },
    /// Sort on one or more signals and summarize group returns
    Sort(SortArgs),
}

#[derive(clap::Args)]
struct SortArgs {
    /// Signal CSV: permno, yyyymm, <signal columns>
    #[arg(long)]
    signals: PathBuf,
    /// Return CSV: permno, date, ret
    #[arg(long)]
    returns: PathBuf,
    /// Signal to sort on (repeatable)
    #[arg(long = "signal", required = true)]
    signal_names: Vec<String>,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of quantile groups
    #[arg(long)]
    groups: Option<usize>,
    /// Months between signal and return period
    #[arg(long)]
    lag: Option<i32>,
    /// Day-of-month used to display periods
    #[arg(long)]
    anchor_day: Option<u32>,
    /// First return period, yyyymm
    #[arg(long)]
    start: Option<i32>,
    /// Last return period, yyyymm
    #[arg(long)]
    end: Option<i32>,
    /// Multiplier applied to returns (100 for decimal returns)
    #[arg(long, default_value_t = 1.0)]
    return_scale: f64,
    /// Multiply signals by their documented sign
    #[arg(long)]
    sign_adjust: bool,
    /// Print reports as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> fd_sorts::Result<()> {
    let registry = match &cli.signal_doc {
        Some(path) => SignalRegistry::from_doc_path(path)?,
        None => SignalRegistry::with_defaults(),
    };

    match cli.command {
        Commands::List => list_signals(&registry),
        Commands::Info { signal } => show_signal_info(&registry, &signal)?,
        Commands::Sort(args) => run_sort(registry, args)?,
    }

    Ok(())
}

/// List all signals grouped by category.
fn list_signals(registry: &SignalRegistry) {
    let mut by_category: HashMap<SignalCategory, Vec<&SignalInfo>> = HashMap::new();
    for info in registry.all_info() {
        by_category.entry(info.category).or_default().push(info);
    }

    println!("Available Signals ({} total)\n", registry.len());

    // Sort categories for consistent output
    let mut categories: Vec<_> = by_category.keys().copied().collect();
    categories.sort_by_key(|c| c.to_string());

    for category in categories {
        println!("{category}:");
        for info in &by_category[&category] {
            println!("  {:<12} {:+} {}", info.name, info.sign, info.description);
        }
        println!();
    }
}

/// Show metadata for a single signal.
fn show_signal_info(registry: &SignalRegistry, name: &str) -> fd_sorts::Result<()> {
    let info = registry
        .get(name)
        .ok_or_else(|| fd_sorts::SortError::UnknownSignal(name.to_string()))?;

    println!("Signal: {}", info.name);
    println!("Category: {}", info.category);
    println!("Description: {}", info.description);
    println!("Sign: {:+}", info.sign);
    Ok(())
}

/// Build the configuration from an optional file, then apply flag overrides.
fn sort_config(args: &SortArgs) -> fd_sorts::Result<SortConfig> {
    let mut config = match &args.config {
        Some(path) => SortConfig::from_path(path)?,
        None => SortConfig::default(),
    };

    if let Some(groups) = args.groups {
        config.n_groups = groups;
    }
    if let Some(lag) = args.lag {
        config.lag_months = lag;
    }
    if let Some(anchor_day) = args.anchor_day {
        config.anchor_day = anchor_day;
    }
    if let Some(start) = args.start {
        config.start = Some(Period::from_yyyymm(start)?);
    }
    if let Some(end) = args.end {
        config.end = Some(Period::from_yyyymm(end)?);
    }
    config.sign_adjust |= args.sign_adjust;

    config.validate()?;
    Ok(config)
}

fn run_sort(registry: SignalRegistry, args: SortArgs) -> fd_sorts::Result<()> {
    let config = sort_config(&args)?;
    tracing::info!(?config, "running portfolio sorts");

    let study = SignalStudy::new(
        CsvSignalSource::new(&args.signals),
        CsvReturnSource::new(&args.returns).with_scale(args.return_scale),
        config,
    )
    .with_registry(registry);

    let names: Vec<&str> = args.signal_names.iter().map(String::as_str).collect();
    let reports = study.run(&names)?;

    if args.json {
        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| fd_sorts::SortError::Computation(e.to_string()))?;
        println!("{json}");
    } else {
        for report in &reports {
            print_report(report, config.anchor_day)?;
        }
    }

    Ok(())
}

/// Print one signal's per-group table and spread.
fn print_report(report: &SignalReport, anchor_day: u32) -> fd_sorts::Result<()> {
    println!("Signal: {}", report.signal);
    println!(
        "{:>5} {:>10} {:>10} {:>10} {:>8} {:>12} {:>12}",
        "port", "mean_ret", "std_ret", "avg_n", "months", "start", "end"
    );

    for group in &report.groups {
        let std_ret = group
            .std_return
            .map_or_else(|| "-".to_string(), |s| format!("{s:.4}"));
        println!(
            "{:>5} {:>10.4} {:>10} {:>10.1} {:>8} {:>12} {:>12}",
            group.group,
            group.mean_return,
            std_ret,
            group.avg_n_firms,
            group.n_periods,
            group.first_period.to_date(anchor_day)?,
            group.last_period.to_date(anchor_day)?,
        );
    }

    match &report.spread {
        Some(spread) => {
            let t_stat = spread
                .t_stat
                .map_or_else(|| "-".to_string(), |t| format!("{t:.2}"));
            println!(
                "long-short: mean {:.4}, t-stat {}, {} months",
                spread.mean_return, t_stat, spread.n_periods
            );
        }
        None => println!("long-short: no overlapping months"),
    }
    println!();
    Ok(())
}
