/*!
 * # Forecasting Core
 *
 * Pure, synchronous engines over finite historical windows. Nothing in this module
 * performs I/O or holds shared state, so every function is safe to call from
 * parallel tasks for different stores or SKUs.
 *
 * - [`statistics`]: mean, deviation, weekly seasonality, daily aggregation
 * - [`forecasting`]: baseline and weekly-seasonal demand forecasts with backtesting
 * - [`reorder`]: reorder trigger and quantities from a forecast
 * - [`anomaly_detection`]: demand and inventory data quality anomalies
 */

pub mod anomaly_detection;
pub mod forecasting;
pub mod reorder;
pub mod statistics;

pub use anomaly_detection::{detect_demand_anomalies, detect_inventory_anomalies};
pub use forecasting::{generate_forecast, ForecastPayload};
pub use reorder::{suggest_reorder, ReorderPlan};
