//! Numeric primitives shared by the forecast and anomaly engines.
//!
//! Every function is pure and works on borrowed slices. Day-of-week indices are
//! Sunday based: 0 = Sunday through 6 = Saturday.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ForecastError;
use crate::models::DemandPoint;

pub const DAYS_PER_WEEK: usize = 7;

/// Arithmetic mean.
pub fn mean(xs: &[f64]) -> Result<f64, ForecastError> {
    if xs.is_empty() {
        return Err(ForecastError::insufficient("mean of an empty sequence"));
    }
    Ok(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Population standard deviation (divides by N) around a supplied mean.
pub fn stddev(xs: &[f64], mean: f64) -> Result<f64, ForecastError> {
    if xs.is_empty() {
        return Err(ForecastError::insufficient(
            "standard deviation of an empty sequence",
        ));
    }
    let variance = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64;
    Ok(variance.sqrt())
}

pub fn median(xs: &[f64]) -> Result<f64, ForecastError> {
    if xs.is_empty() {
        return Err(ForecastError::insufficient("median of an empty sequence"));
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Number of observations falling on each day of the week.
pub fn weekday_counts(series: &[DemandPoint]) -> [usize; DAYS_PER_WEEK] {
    let mut counts = [0usize; DAYS_PER_WEEK];
    for point in series {
        counts[point.day_of_week()] += 1;
    }
    counts
}

/// Per day-of-week average minus `overall_mean`. Days without observations get 0.
pub fn weekly_seasonality(series: &[DemandPoint], overall_mean: f64) -> [f64; DAYS_PER_WEEK] {
    let mut sums = [0.0f64; DAYS_PER_WEEK];
    let counts = weekday_counts(series);
    for point in series {
        sums[point.day_of_week()] += point.quantity;
    }

    let mut seasonality = [0.0f64; DAYS_PER_WEEK];
    for day in 0..DAYS_PER_WEEK {
        if counts[day] > 0 {
            seasonality[day] = sums[day] / counts[day] as f64 - overall_mean;
        }
    }
    seasonality
}

/// `actual - (mean + seasonality[day_of_week])` for every observation, in input order.
pub fn residuals(
    series: &[DemandPoint],
    mean: f64,
    seasonality: &[f64; DAYS_PER_WEEK],
) -> Vec<f64> {
    series
        .iter()
        .map(|point| point.quantity - (mean + seasonality[point.day_of_week()]))
        .collect()
}

/// Total quantity for one UTC calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub quantity: f64,
}

impl DailyTotal {
    /// The total as a demand point stamped at midnight UTC.
    pub fn to_point(self) -> DemandPoint {
        DemandPoint::new(self.date.and_time(NaiveTime::MIN).and_utc(), self.quantity)
    }
}

/// Buckets observations into one total per UTC date, ascending by date.
///
/// Dates without observations are absent, not zero filled.
pub fn daily_aggregate(series: &[DemandPoint]) -> Vec<DailyTotal> {
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for point in series {
        *buckets.entry(point.timestamp.date_naive()).or_insert(0.0) += point.quantity;
    }
    buckets
        .into_iter()
        .map(|(date, quantity)| DailyTotal { date, quantity })
        .collect()
}

/// Symmetric band `center ± z·sigma`, both ends clamped at zero.
///
/// This is a normal approximation: with z = 1.28 the ends approximate the 10th and
/// 90th percentiles.
pub fn prediction_band(center: f64, sigma: f64, z: f64) -> (f64, f64) {
    let spread = z * sigma.max(0.0);
    ((center - spread).max(0.0), (center + spread).max(0.0))
}

/// Rejects NaN and infinite values with a `Computation` error naming the quantity.
pub fn ensure_finite(value: f64, what: &str) -> Result<f64, ForecastError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ForecastError::computation(format!(
            "{} is not finite ({})",
            what, value
        )))
    }
}
