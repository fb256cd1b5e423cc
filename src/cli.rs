//! CLI definition and dispatch.
//!
//! Every data subcommand loads the INI config, builds a `CsvAdapter` over
//! `[data] path`, runs one engine and prints its result as pretty JSON on
//! stdout. `project` reads no price data. Diagnostics go through `tracing` (stderr).

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::backtest_from_port;
use crate::domain::config_validation::{
    load_backtest_config, load_data_settings, load_monte_carlo_config, load_options_rate,
    load_projection_volatility, load_risk_settings, load_var_config,
};
use crate::domain::error::QuantError;
use crate::domain::monte_carlo::simulate_from_port;
use crate::domain::options::{OptionContract, OptionKind, analyze_option};
use crate::domain::pairs::{ScanMode, scan_pairs};
use crate::domain::projection::{ProjectionInput, project};
use crate::domain::risk_assessment::assess_risk;
use crate::domain::sampling::seeded_rng;
use crate::domain::strategy::StrategyKind;
use crate::domain::universe::parse_symbols;
use crate::domain::var::calculate_var;
use crate::ports::price_port::PriceHistoryPort;

#[derive(Parser, Debug)]
#[command(name = "quantcrew", about = "Quantitative analytics over local price history")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "quantcrew.ini")]
    pub config: PathBuf,
    /// Analysis date (YYYY-MM-DD); defaults to [data] end_date, then today
    #[arg(long, global = true)]
    pub as_of: Option<NaiveDate>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Black-Scholes valuation and Greeks for one option
    Options {
        symbol: String,
        #[arg(long)]
        strike: f64,
        #[arg(long, default_value_t = 30)]
        days: u32,
        #[arg(long, default_value = "call")]
        kind: OptionKind,
    },
    /// Monte Carlo simulation of an investment in one symbol
    MonteCarlo {
        symbol: String,
        #[arg(long)]
        investment: Option<f64>,
        #[arg(long)]
        days: Option<usize>,
        #[arg(long)]
        simulations: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Portfolio VaR / CVaR by three methods
    Var {
        /// Comma-separated symbols, equally weighted
        #[arg(long)]
        symbols: String,
        #[arg(long)]
        portfolio_value: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Cointegration scan over a symbol universe
    Pairs {
        #[arg(long)]
        symbols: String,
        /// Only test pairs that include this symbol
        #[arg(long)]
        test_symbol: Option<String>,
    },
    /// Backtest a moving-average or RSI strategy
    Backtest {
        symbol: String,
        /// Overrides [backtest] strategy, using that strategy's default parameters
        #[arg(long)]
        strategy: Option<StrategyKind>,
        #[arg(long)]
        capital: Option<f64>,
    },
    /// Deterministic three-scenario performance projection
    Project {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        expected_return: f64,
        #[arg(long)]
        years: u32,
        #[arg(long)]
        volatility: Option<f64>,
    },
    /// Beta, Sharpe, VaR and drawdown against a benchmark
    Risk {
        symbol: String,
        #[arg(long)]
        benchmark: Option<String>,
    },
    /// List symbols with a price file
    Symbols,
}

/// Loaded config plus the price source it points at.
struct Session {
    config: FileConfigAdapter,
    prices: CsvAdapter,
    as_of: NaiveDate,
}

pub fn run(cli: Cli) -> ExitCode {
    match dispatch(cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Routes one command; the price session is only opened by commands that read history.
fn dispatch(cli: Cli) -> Result<String, QuantError> {
    let session = || open_session(&cli.config, cli.as_of);
    match cli.command {
        Command::Options {
            symbol,
            strike,
            days,
            kind,
        } => run_options(&session()?, &symbol, strike, days, kind),
        Command::MonteCarlo {
            symbol,
            investment,
            days,
            simulations,
            seed,
        } => run_monte_carlo(&session()?, &symbol, investment, days, simulations, seed),
        Command::Var {
            symbols,
            portfolio_value,
            seed,
        } => run_var(&session()?, &symbols, portfolio_value, seed),
        Command::Pairs {
            symbols,
            test_symbol,
        } => run_pairs(&session()?, &symbols, test_symbol),
        Command::Backtest {
            symbol,
            strategy,
            capital,
        } => run_backtest(&session()?, &symbol, strategy, capital),
        Command::Risk { symbol, benchmark } => run_risk(&session()?, &symbol, benchmark),
        Command::Symbols => session()?.prices.list_symbols().and_then(|s| to_json(&s)),
        Command::Project {
            amount,
            expected_return,
            years,
            volatility,
        } => run_project(&cli.config, amount, expected_return, years, volatility),
    }
}

fn fail(err: &QuantError) -> ExitCode {
    error!("{err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantError> {
    FileConfigAdapter::from_file(path).map_err(|e| QuantError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn open_session(config_path: &Path, as_of: Option<NaiveDate>) -> Result<Session, QuantError> {
    info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let data = load_data_settings(&config)?;
    let as_of = as_of
        .or(data.end_date)
        .unwrap_or_else(|| Local::now().date_naive());
    let prices = CsvAdapter::new(data.path).with_earliest(data.start_date);
    Ok(Session {
        config,
        prices,
        as_of,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, QuantError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| QuantError::Io(std::io::Error::other(e)))
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn run_options(
    session: &Session,
    symbol: &str,
    strike: f64,
    days: u32,
    kind: OptionKind,
) -> Result<String, QuantError> {
    let rate = load_options_rate(&session.config)?;
    let contract = OptionContract::new(kind, strike, days).with_rate(rate);
    let valuation = analyze_option(&session.prices, &normalize(symbol), session.as_of, &contract)?;
    to_json(&valuation)
}

fn run_monte_carlo(
    session: &Session,
    symbol: &str,
    investment: Option<f64>,
    days: Option<usize>,
    simulations: Option<usize>,
    seed: Option<u64>,
) -> Result<String, QuantError> {
    let (mut settings, config_seed) = load_monte_carlo_config(&session.config)?;
    if let Some(v) = investment {
        settings.investment = v;
    }
    if let Some(v) = days {
        settings.horizon_days = v;
    }
    if let Some(v) = simulations {
        settings.simulations = v;
    }
    let mut rng = seeded_rng(seed.or(config_seed));
    let result = simulate_from_port(
        &session.prices,
        &normalize(symbol),
        session.as_of,
        &settings,
        &mut rng,
    )?;
    to_json(&result)
}

fn run_var(
    session: &Session,
    symbols: &str,
    portfolio_value: Option<f64>,
    seed: Option<u64>,
) -> Result<String, QuantError> {
    let symbols = parse_symbols(symbols)?;
    let (mut settings, config_seed) = load_var_config(&session.config)?;
    if let Some(v) = portfolio_value {
        settings.portfolio_value = v;
    }
    let mut rng = seeded_rng(seed.or(config_seed));
    let report = calculate_var(&session.prices, &symbols, session.as_of, &settings, &mut rng)?;
    to_json(&report)
}

fn run_pairs(
    session: &Session,
    symbols: &str,
    test_symbol: Option<String>,
) -> Result<String, QuantError> {
    let symbols = parse_symbols(symbols)?;
    let mode = match test_symbol {
        Some(s) => ScanMode::AgainstSymbol(normalize(&s)),
        None => ScanMode::AllPairs,
    };
    let scan = scan_pairs(&session.prices, &symbols, session.as_of, mode);
    to_json(&scan)
}

fn run_backtest(
    session: &Session,
    symbol: &str,
    strategy: Option<StrategyKind>,
    capital: Option<f64>,
) -> Result<String, QuantError> {
    let mut settings = load_backtest_config(&session.config)?;
    if let Some(kind) = strategy {
        if kind.name() != settings.strategy.name() {
            settings.strategy = kind;
        }
    }
    if let Some(v) = capital {
        settings.initial_capital = v;
    }
    let result = backtest_from_port(&session.prices, &normalize(symbol), session.as_of, &settings)?;
    to_json(&result)
}

fn run_risk(
    session: &Session,
    symbol: &str,
    benchmark: Option<String>,
) -> Result<String, QuantError> {
    let settings = load_risk_settings(&session.config)?;
    let benchmark = benchmark.map_or(settings.benchmark, |b| normalize(&b));
    let assessment = assess_risk(
        &session.prices,
        &normalize(symbol),
        &benchmark,
        session.as_of,
        settings.risk_free_rate,
    )?;
    to_json(&assessment)
}

/// Needs no price data; the config file is only read when `volatility` is absent.
fn run_project(
    config_path: &Path,
    amount: f64,
    expected_return: f64,
    years: u32,
    volatility: Option<f64>,
) -> Result<String, QuantError> {
    let volatility = match volatility {
        Some(v) => v,
        None => load_projection_volatility(&load_config(config_path)?)?,
    };
    let input = ProjectionInput::new(amount, expected_return, years).with_volatility(volatility);
    let projection = project(input);
    if let Some(reason) = &projection.error {
        error!("{reason}");
    }
    to_json(&projection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_options_command() {
        let cli = Cli::parse_from([
            "quantcrew", "-c", "cfg.ini", "options", "AAPL", "--strike", "150", "--kind", "put",
        ]);
        assert_eq!(cli.config, PathBuf::from("cfg.ini"));
        match cli.command {
            Command::Options {
                symbol,
                strike,
                days,
                kind,
            } => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(strike, 150.0);
                assert_eq!(days, 30);
                assert_eq!(kind, OptionKind::Put);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_global_as_of_after_subcommand() {
        let cli = Cli::parse_from(["quantcrew", "symbols", "--as-of", "2024-06-30"]);
        assert_eq!(cli.as_of, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(cli.config, PathBuf::from("quantcrew.ini"));
    }

    #[test]
    fn parses_backtest_strategy_override() {
        let cli = Cli::parse_from(["quantcrew", "backtest", "MSFT", "--strategy", "rsi"]);
        match cli.command {
            Command::Backtest { strategy, .. } => assert_eq!(strategy, Some(StrategyKind::rsi())),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_option_kind() {
        let result = Cli::try_parse_from([
            "quantcrew", "options", "AAPL", "--strike", "100", "--kind", "straddle",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn project_routes_without_a_session() {
        let cli = Cli::parse_from([
            "quantcrew", "-c", "/nonexistent/quantcrew.ini", "project", "--amount", "1000",
            "--expected-return", "0.05", "--years", "2", "--volatility", "0.1",
        ]);
        let json = dispatch(cli).unwrap();
        assert!(json.contains("\"timeline_months\": 24"));
    }

    #[test]
    fn data_commands_open_the_config() {
        let cli = Cli::parse_from(["quantcrew", "-c", "/nonexistent/quantcrew.ini", "symbols"]);
        assert!(matches!(dispatch(cli), Err(QuantError::ConfigParse { .. })));
    }

    #[test]
    fn missing_config_is_config_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/quantcrew.ini")),
            Err(QuantError::ConfigParse { .. })
        ));
    }
}
