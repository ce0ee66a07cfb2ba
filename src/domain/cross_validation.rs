//! Rolling-window time-series cross-validation.
//!
//! With `fold = len / (n_splits + 1)`, fold k trains on
//! `[k*fold, (k+1)*fold)` and validates on the following `fold` closes; the
//! last fold also absorbs the remainder. Validation segments never overlap
//! and no fold ever trains on data after its validation segment.

use crate::domain::error::ForecastError;
use crate::domain::metrics::{mean, mean_absolute_error};
use crate::domain::model::Regressor;
use crate::domain::price_series::PriceSeries;
use crate::domain::trainer::Trainer;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct FoldSplit {
    pub train: Range<usize>,
    pub validation: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    pub fold_losses: Vec<f64>,
    pub average_loss: f64,
}

pub fn fold_splits(
    symbol: &str,
    len: usize,
    window: usize,
    n_splits: usize,
) -> Result<Vec<FoldSplit>, ForecastError> {
    if n_splits == 0 {
        return Err(ForecastError::invalid_parameter("n_splits", "must be at least 1"));
    }
    let fold = len / (n_splits + 1);
    if fold < window + 1 {
        return Err(ForecastError::InsufficientData {
            symbol: symbol.to_string(),
            have: len,
            need: (window + 1) * (n_splits + 1),
        });
    }

    Ok((0..n_splits)
        .map(|k| {
            let val_start = (k + 1) * fold;
            let val_end = if k + 1 == n_splits { len } else { val_start + fold };
            FoldSplit {
                train: k * fold..val_start,
                validation: val_start..val_end,
            }
        })
        .collect())
}

pub fn cross_validate(
    trainer: &Trainer,
    symbol: &str,
    series: &PriceSeries,
    window: usize,
    n_splits: usize,
) -> Result<CrossValidation, ForecastError> {
    let closes = series.closes();
    let splits = fold_splits(symbol, closes.len(), window, n_splits)?;
    let mut fold_losses = Vec::with_capacity(splits.len());

    for split in &splits {
        let model = trainer.train_closes(
            symbol,
            &closes[split.train.clone()],
            window,
            trainer.config().seed,
        )?;

        let predicted: Vec<f64> = split
            .validation
            .clone()
            .map(|j| model.predict(&closes[j - window..j]))
            .collect();
        let actual = &closes[split.validation.clone()];
        let loss = mean_absolute_error(actual, &predicted).ok_or_else(|| {
            ForecastError::InsufficientData {
                symbol: symbol.to_string(),
                have: closes.len(),
                need: (window + 1) * (n_splits + 1),
            }
        })?;
        tracing::debug!(
            symbol = %symbol,
            train = ?split.train,
            validation = ?split.validation,
            loss,
            "cross-validation fold"
        );
        fold_losses.push(loss);
    }

    let average_loss = mean(&fold_losses).unwrap_or(0.0);
    Ok(CrossValidation {
        fold_losses,
        average_loss,
    })
}
