//! Inventory Forecast Library
//!
//! Demand forecasting, reorder recommendation and anomaly detection for
//! multi-store inventory. The numeric engines in [`ml`] are pure functions; the
//! [`services`] run them per store against a [`repositories::ForecastStore`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod ml;
pub mod models;
pub mod repositories;
pub mod services;

pub use errors::{ForecastError, ServiceError};
