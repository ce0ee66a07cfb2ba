//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_error_log_adapter::CsvErrorLogAdapter;
use crate::adapters::csv_price_adapter::CsvPriceAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::csv_watchlist_adapter::CsvWatchlistAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_memory_adapter::JsonMemoryAdapter;
use crate::adapters::null_news_adapter::NullNewsAdapter;
use crate::domain::analysis::{ForecastEngine, ReportStatus};
use crate::domain::backtest::BacktestConfig;
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::validate_engine_config;
use crate::domain::error::ForecastError;
use crate::domain::memory::PredictionMemory;
use crate::domain::price_series::{Interval, Period};
use crate::domain::trainer::TrainerConfig;
use crate::domain::watchlist::{WatchlistEntry, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "pricecast", about = "Adaptive multi-horizon price forecaster")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze the watchlist and write the report
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols instead of the watchlist
        #[arg(long)]
        symbols: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest a sample of the watchlist
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
        /// Number of watchlist symbols to sample
        #[arg(long)]
        sample: Option<usize>,
        /// Retrain flagged symbols and reset their memory correction
        #[arg(long)]
        retrain: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rolling cross-validation of the short window for one symbol
    CrossValidate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// Print forecasts for one symbol without recording anything
    Forecast {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// Manage the watchlist
    Watchlist {
        #[arg(short, long)]
        config: PathBuf,
        #[command(subcommand)]
        action: WatchlistAction,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum WatchlistAction {
    List,
    Add {
        symbol: String,
        #[arg(long)]
        category: Option<String>,
    },
    Remove {
        symbol: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Analyze {
            config,
            symbols,
            output,
        } => run_analyze(&config, symbols.as_deref(), output.as_ref()),
        Command::Backtest {
            config,
            symbols,
            sample,
            retrain,
            output,
        } => run_backtest(&config, symbols.as_deref(), sample, retrain, output.as_ref()),
        Command::CrossValidate { config, symbol } => run_cross_validate(&config, &symbol),
        Command::Forecast { config, symbol } => run_forecast(&config, &symbol),
        Command::Watchlist { config, action } => run_watchlist(&config, action),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: ForecastError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Installs the global subscriber; `RUST_LOG` overrides `[logging] level`.
pub fn init_logging(config: &dyn ConfigPort) {
    let level = config
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(&level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        tracing::debug!(error = %e, "subscriber already installed");
    }
}

fn parse_period(
    adapter: &dyn ConfigPort,
    section: &str,
    default: Period,
) -> Result<Period, ForecastError> {
    match adapter.get_string(section, "period") {
        Some(s) => s.parse().map_err(|e: ForecastError| ForecastError::ConfigInvalid {
            section: section.into(),
            key: "period".into(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Validates the configuration and builds the engine settings from it.
pub fn build_engine_config(adapter: &dyn ConfigPort) -> Result<EngineConfig, ForecastError> {
    validate_engine_config(adapter)?;
    let defaults = EngineConfig::default();

    let interval = match adapter.get_string("data", "interval") {
        Some(s) => s.parse::<Interval>()?,
        None => defaults.interval,
    };
    let short_window = adapter.get_usize("model", "short_window", defaults.short_window);
    let long_window = adapter.get_usize("model", "long_window", defaults.long_window);
    let trainer_defaults = TrainerConfig::default();
    let trainer = TrainerConfig {
        learning_rate: adapter.get_double("model", "learning_rate", trainer_defaults.learning_rate),
        epochs: adapter.get_usize("model", "epochs", trainer_defaults.epochs),
        l2: adapter.get_double("model", "l2", trainer_defaults.l2),
        tolerance: adapter.get_double("model", "tolerance", trainer_defaults.tolerance),
        seed: adapter.get_usize("model", "seed", trainer_defaults.seed as usize) as u64,
    };
    let backtest = BacktestConfig {
        short_window,
        long_window,
        validation_span: adapter.get_usize(
            "backtest",
            "validation_span",
            defaults.backtest.validation_span,
        ),
        threshold: adapter.get_double("backtest", "threshold", defaults.backtest.threshold),
    };

    Ok(EngineConfig {
        period: parse_period(adapter, "data", defaults.period)?,
        interval,
        short_window,
        long_window,
        short_horizon: adapter.get_usize("analysis", "short_horizon", defaults.short_horizon),
        long_horizon: adapter.get_usize("analysis", "long_horizon", defaults.long_horizon),
        validation_span: adapter.get_usize("analysis", "validation_span", defaults.validation_span),
        error_threshold: adapter.get_double("analysis", "error_threshold", defaults.error_threshold),
        cv_splits: adapter.get_usize("analysis", "cv_splits", defaults.cv_splits),
        ensemble_models: adapter.get_usize("analysis", "ensemble_models", defaults.ensemble_models),
        volatility_lookback: adapter.get_usize(
            "analysis",
            "volatility_lookback",
            defaults.volatility_lookback,
        ),
        memory_lookback: adapter.get_usize("memory", "lookback", defaults.memory_lookback),
        trainer,
        backtest,
        backtest_period: parse_period(adapter, "backtest", defaults.backtest_period)?,
        backtest_sample_size: adapter.get_usize(
            "backtest",
            "sample_size",
            defaults.backtest_sample_size,
        ),
    })
}

/// Opens the configured memory store. An unusable store leaves the memory
/// running without persistence.
pub fn open_memory(adapter: &FileConfigAdapter, lookback: usize) -> PredictionMemory {
    let backend = adapter
        .get_string("memory", "backend")
        .unwrap_or_else(|| "json".to_string())
        .to_lowercase();

    #[cfg(feature = "sqlite")]
    if backend == "sqlite" {
        use crate::adapters::sqlite_memory_adapter::SqliteMemoryAdapter;

        let store = SqliteMemoryAdapter::from_config(adapter).and_then(|store| {
            store.initialize_schema()?;
            Ok(store)
        });
        return match store {
            Ok(store) => PredictionMemory::open(Box::new(store), lookback),
            Err(e) => {
                tracing::warn!(error = %e, "sqlite memory unavailable, continuing without persistence");
                PredictionMemory::in_memory(lookback)
            }
        };
    }

    tracing::debug!(backend = %backend, "opening json memory");
    let path = adapter.get_path("memory", "path", "memory.json");
    PredictionMemory::open(Box::new(JsonMemoryAdapter::new(path)), lookback)
}

fn watchlist_adapter(adapter: &FileConfigAdapter) -> CsvWatchlistAdapter {
    CsvWatchlistAdapter::new(adapter.get_path("watchlist", "path", "stocks.csv"))
}

/// Symbols from `--symbols` (keeping watchlist categories), else the whole
/// watchlist.
pub fn resolve_entries(
    symbols_override: Option<&str>,
    adapter: &FileConfigAdapter,
) -> Result<Vec<WatchlistEntry>, ForecastError> {
    let watchlist = watchlist_adapter(adapter).load()?;
    match symbols_override {
        Some(list) => {
            let symbols = parse_symbols(list)
                .map_err(|e| ForecastError::invalid_parameter("symbols", e.to_string()))?;
            Ok(watchlist.select(&symbols))
        }
        None => Ok(watchlist.entries().to_vec()),
    }
}

fn run_analyze(
    config_path: &PathBuf,
    symbols: Option<&str>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    init_logging(&adapter);

    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let entries = match resolve_entries(symbols, &adapter) {
        Ok(e) => e,
        Err(e) => return fail(e),
    };
    if entries.is_empty() {
        eprintln!("error: no symbols to analyze");
        return ExitCode::from(2);
    }

    let data = CsvPriceAdapter::new(adapter.get_path("data", "path", "."));
    let memory = open_memory(&adapter, engine_config.memory_lookback);
    let error_log = CsvErrorLogAdapter::new(adapter.get_path("error_log", "path", "error_log.csv"));
    let report = CsvReportAdapter::new(
        output_path
            .cloned()
            .unwrap_or_else(|| adapter.get_path("report", "path", "report.csv")),
        adapter.get_path("report", "backtest_path", "backtest_results.csv"),
    );
    let engine = ForecastEngine::new(engine_config, &data, &memory, &NullNewsAdapter, &error_log);

    eprintln!("Analyzing {} symbol(s)", entries.len());
    let records = engine.analyze_watchlist(&entries);

    let mut analyzed = 0;
    for record in &records {
        match record.status {
            ReportStatus::Analyzed => {
                analyzed += 1;
                println!(
                    "{:<8} {:<16} last={:.2} next={:.2} adjusted={:.2}{}",
                    record.symbol,
                    record.category,
                    record.last_close.unwrap_or(f64::NAN),
                    record.next_prediction.unwrap_or(f64::NAN),
                    record.adjusted_prediction.unwrap_or(f64::NAN),
                    if record.significant == Some(true) {
                        "  [significant error]"
                    } else {
                        ""
                    }
                );
            }
            ReportStatus::Skipped => {
                println!("{:<8} skipped: {}", record.symbol, record.explanation);
            }
        }
    }

    if let Err(e) = report.write_reports(&records) {
        return fail(e);
    }
    if memory.is_degraded() {
        eprintln!("warning: prediction memory is not being persisted");
    }
    eprintln!(
        "{} analyzed, {} skipped",
        analyzed,
        records.len() - analyzed
    );

    if analyzed == 0 {
        ExitCode::from(5)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_backtest(
    config_path: &PathBuf,
    symbols: Option<&str>,
    sample: Option<usize>,
    retrain: bool,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    init_logging(&adapter);

    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let entries = if symbols.is_some() {
        resolve_entries(symbols, &adapter)
    } else {
        let n = sample.unwrap_or(engine_config.backtest_sample_size);
        watchlist_adapter(&adapter)
            .load()
            .map(|list| list.sample(n, engine_config.trainer.seed))
    };
    let entries = match entries {
        Ok(e) => e,
        Err(e) => return fail(e),
    };
    if entries.is_empty() {
        eprintln!("error: no symbols to backtest");
        return ExitCode::from(2);
    }

    let data = CsvPriceAdapter::new(adapter.get_path("data", "path", "."));
    let memory = open_memory(&adapter, engine_config.memory_lookback);
    let error_log = CsvErrorLogAdapter::new(adapter.get_path("error_log", "path", "error_log.csv"));
    let report = CsvReportAdapter::new(
        adapter.get_path("report", "path", "report.csv"),
        output_path
            .cloned()
            .unwrap_or_else(|| adapter.get_path("report", "backtest_path", "backtest_results.csv")),
    );
    let engine = ForecastEngine::new(engine_config, &data, &memory, &NullNewsAdapter, &error_log);

    eprintln!("Backtesting {} symbol(s)", entries.len());
    let run = engine.backtest_watchlist(&entries);

    for result in &run.results {
        println!(
            "{:<8} short_mae={:.4} long_mae={:.4}{}",
            result.symbol,
            result.short_error,
            result.long_error,
            if result.retrain { "  retrain" } else { "" }
        );
    }
    for skipped in &run.skipped {
        println!("{:<8} skipped: {}", skipped.symbol, skipped.reason);
    }

    if let Err(e) = report.write_backtest(&run.results) {
        return fail(e);
    }

    if retrain {
        for flagged in run.flagged() {
            match engine.retrain_symbol(&flagged.symbol) {
                Ok(_) => eprintln!("Retrained {}", flagged.symbol),
                Err(e) => eprintln!("warning: retrain failed for {}: {e}", flagged.symbol),
            }
        }
    } else if run.flagged().next().is_some() {
        eprintln!("Symbols flagged for retraining; rerun with --retrain to apply");
    }

    eprintln!(
        "{} backtested, {} flagged, {} skipped",
        run.results.len(),
        run.flagged().count(),
        run.skipped.len()
    );
    if run.results.is_empty() {
        ExitCode::from(5)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_cross_validate(config_path: &PathBuf, symbol: &str) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    init_logging(&adapter);

    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let data = CsvPriceAdapter::new(adapter.get_path("data", "path", "."));
    let memory = PredictionMemory::in_memory(engine_config.memory_lookback);
    let error_log = CsvErrorLogAdapter::new(adapter.get_path("error_log", "path", "error_log.csv"));
    let engine = ForecastEngine::new(engine_config, &data, &memory, &NullNewsAdapter, &error_log);

    let symbol = symbol.trim().to_uppercase();
    match engine.cross_validate_symbol(&symbol) {
        Ok(cv) => {
            for (i, loss) in cv.fold_losses.iter().enumerate() {
                println!("fold {}: mae={:.4}", i + 1, loss);
            }
            println!("average: mae={:.4}", cv.average_loss);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_forecast(config_path: &PathBuf, symbol: &str) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    init_logging(&adapter);

    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let (short_horizon, long_horizon) = (engine_config.short_horizon, engine_config.long_horizon);
    let data = CsvPriceAdapter::new(adapter.get_path("data", "path", "."));
    let memory = open_memory(&adapter, engine_config.memory_lookback);
    let error_log = CsvErrorLogAdapter::new(adapter.get_path("error_log", "path", "error_log.csv"));
    let engine = ForecastEngine::new(engine_config, &data, &memory, &NullNewsAdapter, &error_log);

    let symbol = symbol.trim().to_uppercase();
    match engine.forecast_symbol(&symbol) {
        Ok(f) => {
            println!("symbol:     {}", f.symbol);
            println!("last close: {:.4}", f.last_close);
            println!("next:       {:.4}", f.next_prediction);
            println!("adjusted:   {:.4}", f.adjusted_prediction);
            println!("{short_horizon}-day:     {:.4}", f.predicted_short);
            println!("{long_horizon}-day:     {:.4}", f.predicted_long);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_watchlist(config_path: &PathBuf, action: WatchlistAction) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let store = watchlist_adapter(&adapter);
    let mut watchlist = match store.load() {
        Ok(w) => w,
        Err(e) => return fail(e),
    };

    match action {
        WatchlistAction::List => {
            for entry in watchlist.entries() {
                println!("{},{}", entry.symbol, entry.category);
            }
            eprintln!("{} symbols", watchlist.len());
            return ExitCode::SUCCESS;
        }
        WatchlistAction::Add { symbol, category } => {
            let entry = WatchlistEntry::new(&symbol, category.as_deref());
            let added = entry.symbol.clone();
            if let Err(e) = watchlist.add(entry) {
                return fail(ForecastError::invalid_parameter("symbol", e.to_string()));
            }
            eprintln!("Added {added}");
        }
        WatchlistAction::Remove { symbol } => match watchlist.remove(&symbol) {
            Ok(removed) => eprintln!("Removed {}", removed.symbol),
            Err(e) => return fail(ForecastError::invalid_parameter("symbol", e.to_string())),
        },
    }

    match store.save(&watchlist) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    eprintln!(
        "  windows: short={} long={}",
        config.short_window, config.long_window
    );
    eprintln!(
        "  horizons: short={} long={}",
        config.short_horizon, config.long_horizon
    );
    eprintln!(
        "  training: lr={} epochs={} l2={} seed={}",
        config.trainer.learning_rate, config.trainer.epochs, config.trainer.l2, config.trainer.seed
    );
    eprintln!(
        "  analysis: period={} threshold={} cv_splits={} ensemble={}",
        config.period, config.error_threshold, config.cv_splits, config.ensemble_models
    );

    match watchlist_adapter(&adapter).load() {
        Ok(list) => eprintln!("  watchlist: {} symbols", list.len()),
        Err(e) => return fail(e),
    }

    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn init_logging_twice_keeps_first_subscriber() {
        let config = make_config("[logging]\nlevel = warn\n");
        init_logging(&config);
        init_logging(&config);
        tracing::warn!("still logging");
    }

    #[test]
    fn build_engine_config_defaults() {
        let config = build_engine_config(&make_config("[data]\npath = ./prices\n")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn build_engine_config_reads_sections() {
        let config = build_engine_config(&make_config(
            r#"
[data]
path = ./prices
period = 6mo

[model]
short_window = 5
long_window = 20
epochs = 300
seed = 7

[analysis]
error_threshold = 2.5
cv_splits = 4

[memory]
lookback = 10

[backtest]
period = 90d
validation_span = 30
threshold = 3.0
sample_size = 4
"#,
        ))
        .unwrap();

        assert_eq!(config.period, Period::from_days(180));
        assert_eq!(config.short_window, 5);
        assert_eq!(config.long_window, 20);
        assert_eq!(config.trainer.epochs, 300);
        assert_eq!(config.trainer.seed, 7);
        assert_eq!(config.error_threshold, 2.5);
        assert_eq!(config.cv_splits, 4);
        assert_eq!(config.memory_lookback, 10);
        assert_eq!(config.backtest_period, Period::from_days(90));
        assert_eq!(config.backtest.short_window, 5);
        assert_eq!(config.backtest.long_window, 20);
        assert_eq!(config.backtest.validation_span, 30);
        assert_eq!(config.backtest.threshold, 3.0);
        assert_eq!(config.backtest_sample_size, 4);
    }

    #[test]
    fn build_engine_config_rejects_invalid() {
        let err = build_engine_config(&make_config("[data]\npath = p\n[model]\nshort_window = 1\n"))
            .unwrap_err();
        assert!(matches!(err, ForecastError::ConfigInvalid { key, .. } if key == "short_window"));
    }

    #[test]
    fn cli_parses_backtest_flags() {
        let cli = Cli::try_parse_from([
            "pricecast", "backtest", "-c", "cfg.ini", "--sample", "3", "--retrain",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                sample, retrain, ..
            } => {
                assert_eq!(sample, Some(3));
                assert!(retrain);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_watchlist_add() {
        let cli = Cli::try_parse_from([
            "pricecast", "watchlist", "-c", "cfg.ini", "add", "aapl", "--category", "Tech",
        ])
        .unwrap();
        match cli.command {
            Command::Watchlist {
                action: WatchlistAction::Add { symbol, category },
                ..
            } => {
                assert_eq!(symbol, "aapl");
                assert_eq!(category.as_deref(), Some("Tech"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
