//! Per-symbol forecasting pipeline and batch drivers.
//!
//! [`ForecastEngine`] wires the trainer, forecaster, memory and error analyzer
//! to the injected ports. Batch runs never abort on a single symbol: every
//! failure becomes a skipped [`ReportRecord`].

use crate::domain::backtest::{self, BacktestResult, RetrainOutcome};
use crate::domain::config::EngineConfig;
use crate::domain::cross_validation::{CrossValidation, cross_validate};
use crate::domain::ensemble::ensemble_predict;
use crate::domain::error::ForecastError;
use crate::domain::error_analysis::{
    ErrorAssessment, ErrorEvent, Horizon, news_factor, score, volatility_factor,
};
use crate::domain::forecast::{forecast_path, predict_horizon, predict_next};
use crate::domain::memory::PredictionMemory;
use crate::domain::price_series::{Period, PriceSeries};
use crate::domain::trainer::Trainer;
use crate::domain::watchlist::WatchlistEntry;
use crate::ports::data_port::MarketDataPort;
use crate::ports::error_log_port::ErrorLogPort;
use crate::ports::news_port::{NewsPort, NewsSignal};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

/// Hindsight comparison of a prefix-trained forecast against the held-out tail.
#[derive(Debug, Clone, PartialEq)]
pub struct HindsightCheck {
    pub horizon: Horizon,
    pub actual: f64,
    pub predicted: f64,
    pub assessment: ErrorAssessment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub category: String,
    pub last_date: Option<NaiveDate>,
    pub last_close: f64,
    pub short_horizon: usize,
    pub long_horizon: usize,
    pub predicted_short: f64,
    pub predicted_long: f64,
    pub next_prediction: f64,
    pub adjusted_prediction: f64,
    pub hindsight: Vec<HindsightCheck>,
    /// Assessment of the latest earlier forecast resolved in this run.
    pub last_step: Option<ErrorAssessment>,
    pub cross_validation: Option<CrossValidation>,
    pub ensemble_prediction: Option<f64>,
    pub news: NewsSignal,
    pub training_count: usize,
}

impl SymbolAnalysis {
    pub fn explanation(&self) -> String {
        self.hindsight
            .iter()
            .map(|h| h.assessment.explanation.as_str())
            .chain(self.last_step.iter().map(|a| a.explanation.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_significant(&self) -> bool {
        self.last_step.as_ref().is_some_and(|a| a.is_significant)
            || self.hindsight.iter().any(|h| h.assessment.is_significant)
    }

    fn check(&self, short: bool) -> Option<&HindsightCheck> {
        self.hindsight
            .iter()
            .find(|h| matches!(h.horizon, Horizon::Short(_)) == short)
    }
}

/// Forecasts without the bookkeeping of a full analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSummary {
    pub symbol: String,
    pub last_close: f64,
    pub next_prediction: f64,
    pub adjusted_prediction: f64,
    pub predicted_short: f64,
    pub predicted_long: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Analyzed,
    Skipped,
}

/// One flat report row per symbol, skipped symbols included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub symbol: String,
    pub category: String,
    pub status: ReportStatus,
    pub last_date: Option<NaiveDate>,
    pub last_close: Option<f64>,
    pub predicted_short: Option<f64>,
    pub predicted_long: Option<f64>,
    pub next_prediction: Option<f64>,
    pub adjusted_prediction: Option<f64>,
    pub ensemble_prediction: Option<f64>,
    pub cv_loss: Option<f64>,
    pub last_step_error: Option<f64>,
    pub significant: Option<bool>,
    pub news_sentiment: Option<f64>,
    pub training_count: Option<usize>,
    pub short_actual: Option<f64>,
    pub short_error: Option<f64>,
    pub short_reason: Option<String>,
    pub long_actual: Option<f64>,
    pub long_error: Option<f64>,
    pub long_reason: Option<String>,
    /// Headlines joined with `" | "`.
    pub news_headlines: Option<String>,
    pub explanation: String,
}

impl ReportRecord {
    pub fn analyzed(analysis: &SymbolAnalysis) -> Self {
        let short = analysis.check(true);
        let long = analysis.check(false);
        let headlines = &analysis.news.headlines;
        Self {
            symbol: analysis.symbol.clone(),
            category: analysis.category.clone(),
            status: ReportStatus::Analyzed,
            last_date: analysis.last_date,
            last_close: Some(analysis.last_close),
            predicted_short: Some(analysis.predicted_short),
            predicted_long: Some(analysis.predicted_long),
            next_prediction: Some(analysis.next_prediction),
            adjusted_prediction: Some(analysis.adjusted_prediction),
            ensemble_prediction: analysis.ensemble_prediction,
            cv_loss: analysis.cross_validation.as_ref().map(|cv| cv.average_loss),
            last_step_error: analysis.last_step.as_ref().map(|a| a.error),
            significant: Some(analysis.is_significant()),
            news_sentiment: Some(analysis.news.sentiment),
            training_count: Some(analysis.training_count),
            short_actual: short.map(|h| h.actual),
            short_error: short.map(|h| h.assessment.error),
            short_reason: short.map(|h| h.assessment.explanation.clone()),
            long_actual: long.map(|h| h.actual),
            long_error: long.map(|h| h.assessment.error),
            long_reason: long.map(|h| h.assessment.explanation.clone()),
            news_headlines: (!headlines.is_empty()).then(|| headlines.join(" | ")),
            explanation: analysis.explanation(),
        }
    }

    pub fn skipped(entry: &WatchlistEntry, reason: &ForecastError) -> Self {
        Self {
            symbol: entry.symbol.clone(),
            category: entry.category.clone(),
            status: ReportStatus::Skipped,
            last_date: None,
            last_close: None,
            predicted_short: None,
            predicted_long: None,
            next_prediction: None,
            adjusted_prediction: None,
            ensemble_prediction: None,
            cv_loss: None,
            last_step_error: None,
            significant: None,
            news_sentiment: None,
            training_count: None,
            short_actual: None,
            short_error: None,
            short_reason: None,
            long_actual: None,
            long_error: None,
            long_reason: None,
            news_headlines: None,
            explanation: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestRun {
    pub results: Vec<BacktestResult>,
    pub skipped: Vec<SkippedSymbol>,
}

impl BacktestRun {
    pub fn flagged(&self) -> impl Iterator<Item = &BacktestResult> {
        self.results.iter().filter(|r| r.retrain)
    }
}

pub struct ForecastEngine<'a> {
    config: EngineConfig,
    trainer: Trainer,
    data: &'a dyn MarketDataPort,
    memory: &'a PredictionMemory,
    news: &'a dyn NewsPort,
    error_log: &'a dyn ErrorLogPort,
}

impl<'a> ForecastEngine<'a> {
    pub fn new(
        config: EngineConfig,
        data: &'a dyn MarketDataPort,
        memory: &'a PredictionMemory,
        news: &'a dyn NewsPort,
        error_log: &'a dyn ErrorLogPort,
    ) -> Self {
        let trainer = Trainer::new(config.trainer.clone());
        Self {
            config,
            trainer,
            data,
            memory,
            news,
            error_log,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    /// Fetches the series; provider errors and empty series become `NoData`.
    pub fn fetch(&self, symbol: &str, period: Period) -> Result<PriceSeries, ForecastError> {
        match self.data.get_series(symbol, period, self.config.interval) {
            Ok(series) if !series.is_empty() => Ok(series),
            Ok(_) => Err(ForecastError::NoData {
                symbol: symbol.to_string(),
            }),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "data provider failed");
                Err(ForecastError::NoData {
                    symbol: symbol.to_string(),
                })
            }
        }
    }

    fn news_signal(&self, symbol: &str) -> NewsSignal {
        self.news.signal(symbol).unwrap_or_else(|e| {
            tracing::warn!(symbol = %symbol, error = %e, "news unavailable, using neutral signal");
            NewsSignal::neutral()
        })
    }

    fn log_if_significant(
        &self,
        entry: &WatchlistEntry,
        horizon: Horizon,
        actual: f64,
        predicted: f64,
        assessment: &ErrorAssessment,
    ) {
        if !assessment.is_significant {
            return;
        }
        let event = ErrorEvent {
            timestamp: Utc::now(),
            category: entry.category.clone(),
            symbol: entry.symbol.clone(),
            horizon_label: horizon.label(),
            actual,
            predicted,
            reason: assessment.explanation.clone(),
        };
        if let Err(e) = self.error_log.append(&event) {
            tracing::warn!(symbol = %entry.symbol, error = %e, "failed to append error log");
        }
    }

    pub fn analyze_symbol(&self, entry: &WatchlistEntry) -> Result<SymbolAnalysis, ForecastError> {
        let symbol = entry.symbol.as_str();
        let cfg = &self.config;
        let series = self.fetch(symbol, cfg.period)?;
        let closes = series.closes();
        let (Some(last_date), Some(last_close)) = (series.last_date(), series.last_close()) else {
            return Err(ForecastError::NoData {
                symbol: symbol.to_string(),
            });
        };
        tracing::debug!(symbol = %symbol, bars = series.len(), "analyzing");

        let short_model = self.trainer.train(symbol, &series, cfg.short_window)?;
        let long_model = self.trainer.train(symbol, &series, cfg.long_window)?;

        let predicted_short =
            predict_horizon(&short_model, &series, cfg.short_horizon, cfg.short_window)?;
        let predicted_long =
            predict_horizon(&long_model, &series, cfg.long_horizon, cfg.long_window)?;

        let news = self.news_signal(symbol);
        let vol = volatility_factor(&closes, cfg.volatility_lookback);
        let news_weight = news_factor(&news);

        let hindsight = if series.len() >= 2 * cfg.validation_span {
            match self.hindsight(&series, vol, news_weight) {
                Ok(checks) => checks,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "hindsight check skipped");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        for check in &hindsight {
            self.log_if_significant(
                entry,
                check.horizon,
                check.actual,
                check.predicted,
                &check.assessment,
            );
        }

        let step_horizon = Horizon::Short(1);
        let mut last_step = None;
        for resolved in self.memory.resolve(symbol, &series) {
            let Some(actual) = resolved.actual else {
                continue;
            };
            let assessment = score(
                step_horizon,
                actual,
                resolved.predicted,
                cfg.error_threshold,
                vol,
                news_weight,
            );
            self.log_if_significant(entry, step_horizon, actual, resolved.predicted, &assessment);
            last_step = Some(assessment);
        }

        let next_prediction = predict_next(&short_model, &series, cfg.short_window)?;
        let adjusted_prediction = self.memory.adjust(symbol, next_prediction);
        let target = last_date.succ_opt().ok_or_else(|| {
            ForecastError::invalid_parameter("date", format!("no day after {last_date}"))
        })?;
        if self.memory.record_pending(symbol, target, next_prediction)?.is_none() {
            tracing::debug!(symbol = %symbol, target = %target, "forecast already recorded");
        }

        let cross_validation =
            match cross_validate(&self.trainer, symbol, &series, cfg.short_window, cfg.cv_splits) {
                Ok(cv) => Some(cv),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "cross-validation skipped");
                    None
                }
            };
        let ensemble_prediction = match ensemble_predict(
            &self.trainer,
            symbol,
            &series,
            cfg.short_window,
            cfg.ensemble_models,
        ) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "ensemble skipped");
                None
            }
        };

        let analysis = SymbolAnalysis {
            symbol: symbol.to_string(),
            category: entry.category.clone(),
            last_date: Some(last_date),
            last_close,
            short_horizon: cfg.short_horizon,
            long_horizon: cfg.long_horizon,
            predicted_short,
            predicted_long,
            next_prediction,
            adjusted_prediction,
            hindsight,
            last_step,
            cross_validation,
            ensemble_prediction,
            news,
            training_count: self.memory.training_count(symbol),
        };
        tracing::info!(
            symbol = %symbol,
            next = analysis.next_prediction,
            adjusted = analysis.adjusted_prediction,
            significant = analysis.is_significant(),
            "analysis complete"
        );
        Ok(analysis)
    }

    /// Read-only forecast: nothing is recorded in memory or the error log.
    pub fn forecast_symbol(&self, symbol: &str) -> Result<ForecastSummary, ForecastError> {
        let cfg = &self.config;
        let series = self.fetch(symbol, cfg.period)?;
        let last_close = series.last_close().ok_or_else(|| ForecastError::NoData {
            symbol: symbol.to_string(),
        })?;
        let short_model = self.trainer.train(symbol, &series, cfg.short_window)?;
        let long_model = self.trainer.train(symbol, &series, cfg.long_window)?;
        let next_prediction = predict_next(&short_model, &series, cfg.short_window)?;
        Ok(ForecastSummary {
            symbol: symbol.to_string(),
            last_close,
            next_prediction,
            adjusted_prediction: self.memory.adjust(symbol, next_prediction),
            predicted_short: predict_horizon(
                &short_model,
                &series,
                cfg.short_horizon,
                cfg.short_window,
            )?,
            predicted_long: predict_horizon(&long_model, &series, cfg.long_horizon, cfg.long_window)?,
        })
    }

    /// Prefix-trained models forecast the held-out tail; steps past the
    /// span are capped to its last value.
    fn hindsight(
        &self,
        series: &PriceSeries,
        vol: f64,
        news_weight: f64,
    ) -> Result<Vec<HindsightCheck>, ForecastError> {
        let cfg = &self.config;
        let symbol = series.symbol();
        let span = cfg.validation_span;
        let (prefix, tail) =
            series
                .split_tail(span)
                .ok_or_else(|| ForecastError::InsufficientData {
                    symbol: symbol.to_string(),
                    have: series.len(),
                    need: 2 * span,
                })?;
        let prefix_closes = prefix.closes();
        let tail_closes = tail.closes();

        let checks = [
            (Horizon::Short(cfg.short_horizon), cfg.short_window),
            (Horizon::Long(cfg.long_horizon), cfg.long_window),
        ];
        let mut out = Vec::with_capacity(checks.len());
        for (horizon, window) in checks {
            let model = self.trainer.train(symbol, &prefix, window)?;
            let days = match horizon {
                Horizon::Short(d) | Horizon::Long(d) => d,
            };
            let step = days.clamp(1, tail_closes.len());
            let path = forecast_path(&model, &prefix_closes, step);
            let (Some(&predicted), Some(&actual)) = (path.last(), tail_closes.get(step - 1)) else {
                continue;
            };
            let assessment = score(horizon, actual, predicted, cfg.error_threshold, vol, news_weight);
            out.push(HindsightCheck {
                horizon,
                actual,
                predicted,
                assessment,
            });
        }
        Ok(out)
    }

    pub fn analyze_watchlist(&self, entries: &[WatchlistEntry]) -> Vec<ReportRecord> {
        entries
            .iter()
            .map(|entry| match self.analyze_symbol(entry) {
                Ok(analysis) => ReportRecord::analyzed(&analysis),
                Err(e) => {
                    log_skip(&entry.symbol, &e);
                    ReportRecord::skipped(entry, &e)
                }
            })
            .collect()
    }

    pub fn backtest_symbol(&self, symbol: &str) -> Result<BacktestResult, ForecastError> {
        let series = self.fetch(symbol, self.config.backtest_period)?;
        backtest::run_backtest(&self.trainer, &series, &self.config.backtest)
    }

    pub fn backtest_watchlist(&self, entries: &[WatchlistEntry]) -> BacktestRun {
        let mut run = BacktestRun::default();
        for entry in entries {
            match self.backtest_symbol(&entry.symbol) {
                Ok(result) => run.results.push(result),
                Err(e) => {
                    log_skip(&entry.symbol, &e);
                    run.skipped.push(SkippedSymbol {
                        symbol: entry.symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        run
    }

    /// Retrains a flagged symbol on the analysis period and resets its
    /// memory correction.
    pub fn retrain_symbol(&self, symbol: &str) -> Result<RetrainOutcome, ForecastError> {
        let series = self.fetch(symbol, self.config.period)?;
        backtest::retrain(&self.trainer, self.memory, &series, &self.config.backtest)
    }

    pub fn cross_validate_symbol(&self, symbol: &str) -> Result<CrossValidation, ForecastError> {
        let series = self.fetch(symbol, self.config.period)?;
        cross_validate(
            &self.trainer,
            symbol,
            &series,
            self.config.short_window,
            self.config.cv_splits,
        )
    }
}

fn log_skip(symbol: &str, err: &ForecastError) {
    if err.is_per_symbol() {
        tracing::warn!(symbol = %symbol, error = %err, "symbol skipped");
    } else {
        tracing::error!(symbol = %symbol, error = %err, "symbol skipped");
    }
}
