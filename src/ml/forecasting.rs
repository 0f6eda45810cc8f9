//! Daily demand forecasting.
//!
//! Two models are available. Histories shorter than
//! [`ForecastSettings::min_history_points`] get a constant baseline; everything else
//! gets a level + weekly-seasonal model whose P10/P90 bands widen with the square
//! root of the horizon distance:
//!
//! ```text
//! base[i]   = mean + seasonality[dow(last) + 1 + i]
//! spread[i] = z * sigma * sqrt(i + 1)
//! ```
//!
//! `z` defaults to 1.28, the one-sided normal quantile for 90%. The bands are a normal
//! approximation over the residuals, not an exact distributional fit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ForecastSettings;
use crate::errors::ForecastError;
use crate::ml::statistics::{
    ensure_finite, mean, median, prediction_band, residuals, stddev, weekly_seasonality,
    DAYS_PER_WEEK,
};
use crate::models::{DemandPoint, Forecast, ForecastMetadata, ForecastModel};

const HOURS_PER_DAY: u32 = 24;

/// Forecast bands and metadata before they are bound to a store and SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub median: Vec<f64>,
    pub p10: Vec<f64>,
    pub p90: Vec<f64>,
    pub metadata: ForecastMetadata,
}

impl ForecastPayload {
    pub fn into_forecast(
        self,
        store_id: Uuid,
        sku_id: Uuid,
        horizon_hours: u32,
        generated_at: DateTime<Utc>,
    ) -> Forecast {
        Forecast {
            id: Uuid::new_v4(),
            store_id,
            sku_id,
            horizon_hours,
            generated_at,
            median: self.median,
            p10: self.p10,
            p90: self.p90,
            metadata: self.metadata,
        }
    }
}

/// Level and day-of-week deviations fitted on a series.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SeasonalFit {
    level: f64,
    seasonality: [f64; DAYS_PER_WEEK],
}

impl SeasonalFit {
    fn fit(series: &[DemandPoint]) -> Result<Self, ForecastError> {
        let quantities: Vec<f64> = series.iter().map(|p| p.quantity).collect();
        let level = mean(&quantities)?;
        Ok(Self {
            level,
            seasonality: weekly_seasonality(series, level),
        })
    }

    fn predict(&self, day_of_week: usize) -> f64 {
        self.level + self.seasonality[day_of_week % DAYS_PER_WEEK]
    }
}

/// Number of daily forecast points covering `horizon_hours`.
pub fn forecast_days(horizon_hours: u32) -> usize {
    horizon_hours.div_ceil(HOURS_PER_DAY) as usize
}

/// Produces a daily forecast covering `horizon_hours` from `history`.
///
/// `history` is expected to hold one point per sales day. Order does not matter; the
/// series is sorted by timestamp before fitting.
pub fn generate_forecast(
    history: &[DemandPoint],
    horizon_hours: u32,
    settings: &ForecastSettings,
) -> Result<ForecastPayload, ForecastError> {
    let days = forecast_days(horizon_hours);
    if history.len() < settings.min_history_points {
        return baseline_forecast(history, days, settings);
    }

    let mut series = history.to_vec();
    series.sort_by_key(|p| p.timestamp);

    let fit = SeasonalFit::fit(&series)?;
    let residuals = residuals(&series, fit.level, &fit.seasonality);
    let sigma = stddev(&residuals, mean(&residuals)?)?;
    ensure_finite(fit.level, "mean demand")?;
    ensure_finite(sigma, "residual standard deviation")?;

    let last_dow = series
        .last()
        .map(DemandPoint::day_of_week)
        .ok_or_else(|| ForecastError::insufficient("seasonal forecast without history"))?;

    let mut payload = ForecastPayload {
        median: Vec::with_capacity(days),
        p10: Vec::with_capacity(days),
        p90: Vec::with_capacity(days),
        metadata: ForecastMetadata {
            model: ForecastModel::WeeklySeasonal,
            accuracy: None,
            note: None,
        },
    };

    for i in 0..days {
        let day_of_week = (last_dow + 1 + i) % DAYS_PER_WEEK;
        let base = fit.predict(day_of_week);
        let uncertainty = sigma * ((i + 1) as f64).sqrt();
        let (low, high) = prediction_band(base, uncertainty, settings.interval_z);

        payload.median.push(ensure_finite(base.max(0.0), "median")?);
        payload.p10.push(ensure_finite(low, "p10")?);
        payload.p90.push(ensure_finite(high, "p90")?);
    }

    payload.metadata.accuracy = Some(backtest_accuracy(&series, settings)?);
    payload.metadata.note = Some(format!(
        "Fitted on {} days of history, residual sigma {:.2}",
        series.len(),
        sigma
    ));
    Ok(payload)
}

/// Constant forecast for short histories.
///
/// The value is the median of the available quantities (floored at 1), or
/// `baseline_default` when there is no history. Bands are fixed multiples of it.
pub fn baseline_forecast(
    history: &[DemandPoint],
    days: usize,
    settings: &ForecastSettings,
) -> Result<ForecastPayload, ForecastError> {
    let (value, note) = if history.is_empty() {
        (
            settings.baseline_default,
            "No sales history; using the default baseline".to_string(),
        )
    } else {
        let quantities: Vec<f64> = history.iter().map(|p| p.quantity).collect();
        (
            ensure_finite(median(&quantities)?, "baseline median")?.max(1.0),
            format!(
                "Only {} days of history; using the median as a constant baseline",
                history.len()
            ),
        )
    };
    let value = ensure_finite(value, "baseline")?;

    Ok(ForecastPayload {
        median: vec![value; days],
        p10: vec![value * settings.baseline_p10_multiplier; days],
        p90: vec![value * settings.baseline_p90_multiplier; days],
        metadata: ForecastMetadata {
            model: ForecastModel::Baseline,
            accuracy: Some(settings.baseline_accuracy),
            note: Some(note),
        },
    })
}

/// Accuracy in percent from holding out the trailing `holdout_days` points.
///
/// The model is refitted on the remaining points and scored with MAPE over held-out
/// days with non-zero demand. Falls back to `fallback_accuracy` when the training set
/// is too short or no held-out day had demand.
pub fn backtest_accuracy(
    series: &[DemandPoint],
    settings: &ForecastSettings,
) -> Result<f64, ForecastError> {
    let holdout = settings.holdout_days;
    if series.len() < holdout + settings.min_history_points {
        return Ok(settings.fallback_accuracy);
    }

    let (train, test) = series.split_at(series.len() - holdout);
    let fit = SeasonalFit::fit(train)?;

    let errors: Vec<f64> = test
        .iter()
        .filter(|p| p.quantity > 0.0)
        .map(|p| {
            let predicted = fit.predict(p.day_of_week()).max(0.0);
            (p.quantity - predicted).abs() / p.quantity
        })
        .collect();

    if errors.is_empty() {
        return Ok(settings.fallback_accuracy);
    }

    let mape = ensure_finite(mean(&errors)?, "MAPE")?;
    Ok(((1.0 - mape) * 100.0).clamp(0.0, 100.0))
}
