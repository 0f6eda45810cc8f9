//! Async batch entry points over a [`ForecastStore`](crate::repositories::ForecastStore).

pub mod anomaly_detection;
pub mod forecasting;

pub use anomaly_detection::AnomalyDetectionService;
pub use forecasting::{ForecastRunReport, ForecastingService, ReorderRunReport, SkuFailure};
