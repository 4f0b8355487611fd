//! Betting Strategy CLI - build combinations and stakes from a list of bets

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use betting_strategy::core::{DEFAULT_MARGIN, MAX_COMBINATIONS, MAX_ENUMERATION};
use betting_strategy::data::{load_bets, load_persisted, save_strategy, PersistedStrategy};
use betting_strategy::models::{AllocationMethod, RiskPreference, StrategyType};
use betting_strategy::report::write_report;
use betting_strategy::strategy::{BettingStrategy, StrategyConfig, StrategyEngine};

#[derive(Parser)]
#[command(name = "betting-strategy")]
#[command(author, version, about = "Betting combination and stake allocation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build combinations and stakes from a bets file
    Process {
        /// Bets file (.csv with name,odds,confidence columns or .json)
        #[arg(short, long)]
        bets: PathBuf,

        /// Total budget to allocate
        #[arg(long, default_value = "100")]
        budget: f64,

        /// Strategy type: Accumulator, Parlay or System
        #[arg(short, long, default_value = "Accumulator")]
        strategy: String,

        /// Legs for Accumulator / Parlay, maximum combination size for System
        #[arg(long)]
        folds: Option<usize>,

        /// Risk preference: Conservative, Moderate or Aggressive
        #[arg(short, long, default_value = "Moderate")]
        risk: String,

        /// Allocation method: kelly or mean_variance
        #[arg(short, long, default_value = "kelly")]
        method: String,

        /// Bookmaker margin removed from combined odds
        #[arg(long, default_value_t = DEFAULT_MARGIN)]
        margin: f64,

        /// Maximum ranked combinations kept for allocation
        #[arg(long, default_value_t = MAX_COMBINATIONS)]
        max_combinations: usize,

        /// Refuse System bets that expand to more combinations than this
        #[arg(long, default_value_t = MAX_ENUMERATION)]
        max_enumeration: u64,

        /// Save the strategy as JSON
        #[arg(long)]
        save: Option<PathBuf>,

        /// Write a text report
        #[arg(long)]
        report: Option<PathBuf>,

        /// Number of combinations to show
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Show a saved strategy
    Show {
        /// Strategy JSON file
        file: PathBuf,

        /// Number of combinations to show
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Generate a text report from a saved strategy
    Report {
        /// Strategy JSON file
        input: PathBuf,

        /// Output text file
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    println!(
        "{}",
        format!("Betting Strategy CLI v{}", env!("CARGO_PKG_VERSION"))
            .cyan()
            .bold()
    );
    println!();

    if cli.interactive {
        run_interactive()?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Process {
                bets,
                budget,
                strategy,
                folds,
                risk,
                method,
                margin,
                max_combinations,
                max_enumeration,
                save,
                report,
                top,
            } => {
                let config = StrategyConfig::new(
                    budget,
                    parse_strategy_type(&strategy)?,
                    parse_risk(&risk)?,
                )
                .with_folds(folds)
                .with_allocation_method(parse_method(&method)?)
                .with_margin(margin)
                .with_max_combinations(max_combinations)
                .with_max_enumeration(max_enumeration);

                run_process(&bets, config, save.as_deref(), report.as_deref(), top)?;
            }
            Commands::Show { file, top } => {
                show_strategy(&file, top)?;
            }
            Commands::Report { input, output } => {
                run_report(&input, &output)?;
            }
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

fn parse_strategy_type(s: &str) -> Result<StrategyType> {
    match StrategyType::parse(s) {
        Some(t) => Ok(t),
        None => bail!(
            "Unknown strategy type '{}' (expected one of: {})",
            s,
            names(StrategyType::ALL.iter().map(|t| t.name()))
        ),
    }
}

fn parse_risk(s: &str) -> Result<RiskPreference> {
    match RiskPreference::parse(s) {
        Some(r) => Ok(r),
        None => bail!(
            "Unknown risk preference '{}' (expected one of: {})",
            s,
            names(RiskPreference::ALL.iter().map(|r| r.name()))
        ),
    }
}

fn parse_method(s: &str) -> Result<AllocationMethod> {
    match AllocationMethod::parse(s) {
        Some(m) => Ok(m),
        None => bail!(
            "Unknown allocation method '{}' (expected one of: {})",
            s,
            names(AllocationMethod::ALL.iter().map(|m| m.name()))
        ),
    }
}

fn names<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn run_process(
    bets_path: &Path,
    config: StrategyConfig,
    save: Option<&Path>,
    report: Option<&Path>,
    top: usize,
) -> Result<()> {
    let bets = load_bets(bets_path)
        .with_context(|| format!("Failed to load bets from {:?}", bets_path))?;

    println!(
        "{}: {} bets / {} / {} / {} / budget {:.2}",
        "Processing".green(),
        bets.len(),
        config.strategy_type,
        config.risk_preference,
        config.allocation_method,
        config.total_budget
    );
    println!();

    let pb = spinner("Building combinations and allocating stakes...")?;
    let result = StrategyEngine::new(config).process(&bets);
    pb.finish_and_clear();

    let strategy = result.context("Failed to process strategy")?;
    print_strategy(&strategy, top);

    if let Some(path) = save {
        save_strategy(&strategy, path)
            .with_context(|| format!("Failed to save strategy to {:?}", path))?;
        println!("{} Strategy saved to {:?}", "→".green(), path);
    }

    if let Some(path) = report {
        write_report(&PersistedStrategy::from_strategy(&strategy), path)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        println!("{} Report written to {:?}", "→".green(), path);
    }

    Ok(())
}

fn show_strategy(path: &Path, top: usize) -> Result<()> {
    let persisted =
        load_persisted(path).with_context(|| format!("Failed to read strategy {:?}", path))?;
    if let Some(ref date) = persisted.date {
        println!("{}: {}", "Saved".green(), date);
    }

    let strategy = persisted
        .into_strategy()
        .with_context(|| format!("Strategy {:?} is inconsistent", path))?;
    print_strategy(&strategy, top);

    Ok(())
}

fn run_report(input: &Path, output: &Path) -> Result<()> {
    let persisted =
        load_persisted(input).with_context(|| format!("Failed to read strategy {:?}", input))?;
    write_report(&persisted, output)
        .with_context(|| format!("Failed to write report to {:?}", output))?;

    println!("Report generated successfully: {:?}", output);
    Ok(())
}

fn print_strategy(strategy: &BettingStrategy, top: usize) {
    let summary = strategy.summary();

    println!("{}", "Strategy:".yellow().bold());
    println!(
        "  Type: {}  Folds: {}  Risk: {}  Method: {}",
        strategy.strategy_type(),
        strategy
            .folds()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string()),
        strategy.risk_preference(),
        strategy.allocation().method
    );
    println!(
        "  Budget: {:.2}  Staked: {:.2}  Potential payout: {:.2}  Expected profit: {:+.2}",
        summary.total_budget,
        summary.total_stake,
        summary.total_potential_payout,
        summary.expected_profit
    );
    println!(
        "  Combinations: {} ({} funded)",
        summary.combination_count, summary.funded_count
    );
    println!();

    if let Some(warning) = strategy.warning() {
        println!("{} {}", "!".yellow().bold(), warning.yellow());
        println!();
        return;
    }

    println!("{}", "Combinations (by stake):".yellow().bold());
    println!(
        "{:>4} {:<36} {:>5} {:>9} {:>8} {:>8} {:>10} {:>10}",
        "#", "Legs", "Folds", "Odds", "Prob", "EV", "Stake", "Payout"
    );
    println!("{}", "-".repeat(96));

    for (rank, (combination, entry)) in strategy.ranked_by_stake().iter().take(top).enumerate() {
        let ev = format!("{:+.3}", combination.ev_per_dollar());
        let ev = if combination.ev_per_dollar() >= 0.0 {
            ev.green()
        } else {
            ev.red()
        };
        let stake = format!("{:.2}", entry.stake);
        let stake = if entry.stake > 0.0 {
            stake.normal()
        } else {
            stake.dimmed()
        };

        println!(
            "{:>4} {:<36} {:>5} {:>9.2} {:>7.2}% {:>8} {:>10} {:>10.2}",
            rank + 1,
            truncate_label(&combination.label(), 36),
            combination.folds(),
            combination.combined_odds(),
            combination.combined_prob() * 100.0,
            ev,
            stake,
            combination.combined_odds() * entry.stake
        );
    }

    let remaining = strategy.combinations().len().saturating_sub(top);
    if remaining > 0 {
        println!("{}", format!("  ... {} more", remaining).dimmed());
    }
    println!();

    let unique = strategy.unique_bets();
    println!("{} ({}):", "Bets in play".yellow().bold(), unique.len());
    for bet in unique {
        println!(
            "  - {} @ {:.2} ({:.1}%)",
            bet.name, bet.odds, bet.confidence
        );
    }
    println!();
}

fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let cut: String = label.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn run_interactive() -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!();

    let theme = ColorfulTheme::default();

    loop {
        let options = vec![
            "Process a bets file",
            "Show a saved strategy",
            "Generate a report",
            "Quit",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => {
                let bets: String = Input::with_theme(&theme)
                    .with_prompt("Bets file (.csv or .json)")
                    .interact_text()?;

                let budget: f64 = Input::with_theme(&theme)
                    .with_prompt("Total budget")
                    .default(100.0)
                    .interact_text()?;

                let strategy_names: Vec<&str> =
                    StrategyType::ALL.iter().map(|t| t.name()).collect();
                let strategy_type = StrategyType::ALL[Select::with_theme(&theme)
                    .with_prompt("Strategy type")
                    .items(&strategy_names)
                    .default(0)
                    .interact()?];

                let folds = if strategy_type == StrategyType::System {
                    let input: String = Input::with_theme(&theme)
                        .with_prompt("Maximum combination size (blank for all bets)")
                        .allow_empty(true)
                        .interact_text()?;
                    let input = input.trim();
                    if input.is_empty() {
                        None
                    } else {
                        Some(
                            input
                                .parse::<usize>()
                                .with_context(|| format!("Invalid folds '{}'", input))?,
                        )
                    }
                } else {
                    None
                };

                let risk_names: Vec<&str> =
                    RiskPreference::ALL.iter().map(|r| r.name()).collect();
                let risk = RiskPreference::ALL[Select::with_theme(&theme)
                    .with_prompt("Risk preference")
                    .items(&risk_names)
                    .default(1)
                    .interact()?];

                let method_names: Vec<&str> =
                    AllocationMethod::ALL.iter().map(|m| m.name()).collect();
                let method = AllocationMethod::ALL[Select::with_theme(&theme)
                    .with_prompt("Allocation method")
                    .items(&method_names)
                    .default(0)
                    .interact()?];

                let save: String = Input::with_theme(&theme)
                    .with_prompt("Save to JSON (blank to skip)")
                    .allow_empty(true)
                    .interact_text()?;
                let save = Some(save.trim()).filter(|s| !s.is_empty()).map(PathBuf::from);

                let config = StrategyConfig::new(budget, strategy_type, risk)
                    .with_folds(folds)
                    .with_allocation_method(method);

                println!();
                if let Err(e) = run_process(Path::new(bets.trim()), config, save.as_deref(), None, 10) {
                    println!("{} {:#}", "Error:".red().bold(), e);
                }
                println!();
            }
            1 => {
                let file: String = Input::with_theme(&theme)
                    .with_prompt("Strategy JSON file")
                    .interact_text()?;

                println!();
                if let Err(e) = show_strategy(Path::new(file.trim()), 10) {
                    println!("{} {:#}", "Error:".red().bold(), e);
                }
                println!();
            }
            2 => {
                let input: String = Input::with_theme(&theme)
                    .with_prompt("Strategy JSON file")
                    .interact_text()?;
                let output: String = Input::with_theme(&theme)
                    .with_prompt("Report output file")
                    .default("betting_report.txt".to_string())
                    .interact_text()?;

                println!();
                if let Err(e) = run_report(Path::new(input.trim()), Path::new(output.trim())) {
                    println!("{} {:#}", "Error:".red().bold(), e);
                }
                println!();
            }
            3 => {
                println!("Goodbye!");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
