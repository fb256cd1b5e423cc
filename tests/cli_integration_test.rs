//! CLI integration tests over real INI and CSV files on disk.
//!
//! Tests cover:
//! - Config loading and section validation
//! - Exit codes of `cli::run` per error class
//! - Full command runs against a temporary price directory
//! - CSV adapter date clamping through `[data] start_date`

mod common;

use clap::Parser;
use common::*;
use quantcrew::adapters::csv_adapter::CsvAdapter;
use quantcrew::adapters::file_config_adapter::FileConfigAdapter;
use quantcrew::cli::{self, Cli};
use quantcrew::domain::config_validation::*;
use quantcrew::domain::error::QuantError;
use quantcrew::domain::strategy::StrategyKind;
use quantcrew::ports::price_port::PriceHistoryPort;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("prices")).unwrap();
        Self { dir }
    }

    fn prices_dir(&self) -> PathBuf {
        self.dir.path().join("prices")
    }

    fn add_symbol(&self, symbol: &str, prices: &[f64]) {
        let path = self.prices_dir().join(format!("{symbol}.csv"));
        fs::write(path, csv_contents(&points_ending(prices))).unwrap();
    }

    /// Writes `quantcrew.ini` with a `[data]` section followed by `extra`.
    fn write_config(&self, extra: &str) -> PathBuf {
        let path = self.dir.path().join("quantcrew.ini");
        let content = format!(
            "[data]\npath = {}\nend_date = 2024-12-31\n\n{extra}",
            self.prices_dir().display()
        );
        fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, config: &Path, args: &[&str]) -> ExitCode {
        let config = config.to_str().unwrap();
        let mut argv = vec!["quantcrew", "-c", config];
        argv.extend_from_slice(args);
        cli::run(Cli::parse_from(argv))
    }
}

fn standard_workspace() -> Workspace {
    let ws = Workspace::new();
    let base = random_walk(101, 900, 100.0, 0.015);
    ws.add_symbol("AAA", &base);
    ws.add_symbol("BBB", &linear_dependent(&base, 0.5, 3.0));
    ws.add_symbol("SPY", &random_walk(102, 900, 400.0, 0.01));
    ws
}

mod config_loading {
    use super::*;

    #[test]
    fn load_config_reads_sections() {
        let ws = Workspace::new();
        let path = ws.write_config("[risk]\nbenchmark = qqq\nrisk_free_rate = 0.03\n");
        let config = cli::load_config(&path).unwrap();

        let data = load_data_settings(&config).unwrap();
        assert_eq!(data.path, ws.prices_dir());
        assert_eq!(data.end_date, Some(date("2024-12-31")));
        assert_eq!(data.start_date, None);

        let risk = load_risk_settings(&config).unwrap();
        assert_eq!(risk.benchmark, "QQQ");
        assert_eq!(risk.risk_free_rate, 0.03);
    }

    #[test]
    fn missing_file_is_config_parse_error() {
        let ws = Workspace::new();
        assert!(matches!(
            cli::load_config(&ws.dir.path().join("absent.ini")),
            Err(QuantError::ConfigParse { .. })
        ));
    }

    #[test]
    fn defaults_when_sections_absent() {
        let config = FileConfigAdapter::from_string("[data]\npath = /tmp\n").unwrap();

        let (mc, seed) = load_monte_carlo_config(&config).unwrap();
        assert_eq!(mc.investment, 10_000.0);
        assert_eq!(mc.horizon_days, 252);
        assert_eq!(mc.simulations, 1_000);
        assert_eq!(seed, None);

        let (var, _) = load_var_config(&config).unwrap();
        assert_eq!(var.confidence_levels, vec![0.90, 0.95, 0.99]);
        assert_eq!(var.holding_period, 10);
        assert_eq!(var.simulations, 10_000);

        let backtest = load_backtest_config(&config).unwrap();
        assert_eq!(backtest.initial_capital, 10_000.0);
        assert_eq!(backtest.strategy, StrategyKind::moving_average());

        assert_eq!(load_options_rate(&config).unwrap(), 0.05);
        assert_eq!(load_projection_volatility(&config).unwrap(), 0.15);
    }

    #[test]
    fn rsi_strategy_from_config() {
        let config = FileConfigAdapter::from_string(
            "[backtest]\nstrategy = rsi\nrsi_period = 10\noversold = 25\noverbought = 75\n",
        )
        .unwrap();
        let backtest = load_backtest_config(&config).unwrap();
        assert_eq!(
            backtest.strategy,
            StrategyKind::Rsi {
                period: 10,
                oversold: 25.0,
                overbought: 75.0,
            }
        );
    }

    #[test]
    fn data_path_is_required() {
        let config = FileConfigAdapter::from_string("[data]\nend_date = 2024-12-31\n").unwrap();
        let err = load_data_settings(&config).unwrap_err();
        assert!(matches!(
            err,
            QuantError::ConfigMissing { ref section, ref key } if section == "data" && key == "path"
        ));
    }

    #[test]
    fn inverted_date_range_rejected() {
        let config = FileConfigAdapter::from_string(
            "[data]\npath = /tmp\nstart_date = 2024-06-01\nend_date = 2024-01-01\n",
        )
        .unwrap();
        assert!(matches!(
            load_data_settings(&config),
            Err(QuantError::ConfigInvalid { .. })
        ));
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn missing_config_exits_2() {
        let ws = Workspace::new();
        let code = ws.run(&ws.dir.path().join("absent.ini"), &["symbols"]);
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn invalid_config_value_exits_2() {
        let ws = standard_workspace();
        let config = ws.write_config("[var]\nconfidence_levels = 0.95,1.5\n");
        assert_eq!(ws.run(&config, &["var", "--symbols", "AAA"]), ExitCode::from(2));
    }

    #[test]
    fn missing_price_file_exits_3() {
        let ws = standard_workspace();
        let config = ws.write_config("");
        let code = ws.run(&config, &["options", "ZZZ", "--strike", "100"]);
        assert_eq!(code, ExitCode::from(3));
    }

    #[test]
    fn invalid_strike_exits_4() {
        let ws = standard_workspace();
        let config = ws.write_config("");
        let code = ws.run(&config, &["options", "AAA", "--strike=-5"]);
        assert_eq!(code, ExitCode::from(4));
    }

    #[test]
    fn empty_window_exits_5() {
        let ws = standard_workspace();
        let config = ws.write_config("");
        let code = ws.run(&config, &["--as-of", "2010-01-01", "backtest", "AAA"]);
        assert_eq!(code, ExitCode::from(5));
    }
}

mod commands {
    use super::*;

    #[test]
    fn every_data_command_succeeds() {
        let ws = standard_workspace();
        let config = ws.write_config(
            "[monte_carlo]\nsimulations = 200\nseed = 7\n\n[var]\nsimulations = 500\nseed = 7\n",
        );

        let runs: [&[&str]; 7] = [
            &["symbols"],
            &["options", "aaa", "--strike", "100", "--kind", "put"],
            &["monte-carlo", "AAA", "--days", "20"],
            &["var", "--symbols", "AAA,BBB,MISSING"],
            &["pairs", "--symbols", "AAA,BBB,SPY", "--test-symbol", "aaa"],
            &["backtest", "AAA", "--strategy", "rsi"],
            &["risk", "AAA"],
        ];
        for args in runs {
            assert_eq!(ws.run(&config, args), ExitCode::SUCCESS, "{args:?}");
        }
    }

    #[test]
    fn project_without_config_file() {
        let ws = Workspace::new();
        let code = ws.run(
            &ws.dir.path().join("absent.ini"),
            &[
                "project",
                "--amount",
                "10000",
                "--expected-return",
                "0.08",
                "--years",
                "10",
                "--volatility",
                "0.15",
            ],
        );
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn invalid_projection_is_reported_not_fatal() {
        let ws = Workspace::new();
        let config = ws.write_config("");
        let code = ws.run(
            &config,
            &["project", "--amount=-1", "--expected-return", "0.08", "--years", "5"],
        );
        assert_eq!(code, ExitCode::SUCCESS);
    }
}

mod csv_source {
    use super::*;

    #[test]
    fn start_date_clamps_history() {
        let ws = Workspace::new();
        ws.add_symbol("AAA", &constant(100, 10.0));

        let adapter = CsvAdapter::new(ws.prices_dir()).with_earliest(Some(date("2024-12-01")));
        let series = adapter
            .fetch_prices("AAA", date("2020-01-01"), end_date())
            .unwrap();
        assert_eq!(series.len(), 31);

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["AAA".to_string()]);
    }

    #[test]
    fn clamped_window_reaches_engines() {
        let ws = Workspace::new();
        ws.add_symbol("AAA", &random_walk(5, 400, 50.0, 0.01));
        let path = ws.dir.path().join("quantcrew.ini");
        fs::write(
            &path,
            format!(
                "[data]\npath = {}\nstart_date = 2024-12-20\nend_date = 2024-12-31\n",
                ws.prices_dir().display()
            ),
        )
        .unwrap();

        // Twelve rows are below the VaR minimum of thirty.
        assert_eq!(ws.run(&path, &["var", "--symbols", "AAA"]), ExitCode::from(5));
    }
}
