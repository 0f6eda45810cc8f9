use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use futures::future;
use inventory_forecast::{
    config::{self, AppConfig},
    db,
    models::{AnomalyAction, AnomalyReport, ReorderAction},
    repositories::{ForecastStore, SeaOrmStore},
    services::{AnomalyDetectionService, ForecastRunReport, ForecastingService, ReorderRunReport},
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::InitDb => {
            db::create_schema(context.store.connection())
                .await
                .context("failed to create schema")?;
            println!("Schema ready");
        }
        Commands::Forecast(args) => {
            let report = context
                .forecasting_service()
                .run_store_forecasts(args.store)
                .await
                .context("forecast run failed")?;
            render(&report, cli.json, render_forecast_report)?;
        }
        Commands::Reorder(args) => {
            let report = context
                .forecasting_service()
                .generate_reorder_suggestions(args.store)
                .await
                .context("reorder run failed")?;
            render(&report, cli.json, render_reorder_report)?;
        }
        Commands::Anomalies(args) => {
            let report = detect(&context, args.store, args.persist).await?;
            render(&report, cli.json, render_anomaly_report)?;
        }
        Commands::ResolveAnomaly(args) => {
            let anomaly = context
                .anomaly_service()
                .process_anomaly_action(args.id, args.action.into())
                .await
                .context("failed to resolve anomaly")?;
            render(&anomaly, cli.json, |a| {
                println!("Anomaly {} is now {}", a.id, a.status)
            })?;
        }
        Commands::ReviewReorder(args) => {
            let suggestion = context
                .forecasting_service()
                .process_reorder_action(args.id, args.action.into())
                .await
                .context("failed to review reorder suggestion")?;
            render(&suggestion, cli.json, |s| {
                println!(
                    "Reorder suggestion {} ({} units) is now {}",
                    s.id, s.suggested_qty, s.status
                )
            })?;
        }
        Commands::RunAll(args) => {
            let summary = run_all(&context, args.store).await?;
            render(&summary, cli.json, |s| {
                render_forecast_report(&s.forecasts);
                render_reorder_report(&s.reorders);
                render_anomaly_report(&s.anomalies);
            })?;
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "forecast-cli",
    about = "Demand forecasts, reorder suggestions and anomaly scans per store",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing tables
    InitDb,
    /// Forecast every active SKU of a store
    Forecast(StoreArgs),
    /// Generate reorder suggestions from the stored forecasts
    Reorder(StoreArgs),
    /// Scan a store for demand and inventory anomalies
    Anomalies(AnomaliesArgs),
    ResolveAnomaly(ResolveAnomalyArgs),
    ReviewReorder(ReviewReorderArgs),
    /// Forecast, reorder and persist anomalies for a store
    RunAll(StoreArgs),
}

#[derive(Args)]
struct StoreArgs {
    #[arg(long, help = "Store identifier")]
    store: Uuid,
}

#[derive(Args)]
struct AnomaliesArgs {
    #[arg(long, help = "Store identifier")]
    store: Uuid,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Store the detected anomalies as pending records"
    )]
    persist: bool,
}

#[derive(Args)]
struct ResolveAnomalyArgs {
    #[arg(long, help = "Anomaly identifier")]
    id: Uuid,
    #[arg(long, value_enum)]
    action: AnomalyActionArg,
}

#[derive(Args)]
struct ReviewReorderArgs {
    #[arg(long, help = "Reorder suggestion identifier")]
    id: Uuid,
    #[arg(long, value_enum)]
    action: ReorderActionArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum AnomalyActionArg {
    Accept,
    Ignore,
}

impl From<AnomalyActionArg> for AnomalyAction {
    fn from(value: AnomalyActionArg) -> Self {
        match value {
            AnomalyActionArg::Accept => AnomalyAction::Accept,
            AnomalyActionArg::Ignore => AnomalyAction::Ignore,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReorderActionArg {
    Approve,
    Reject,
}

impl From<ReorderActionArg> for ReorderAction {
    fn from(value: ReorderActionArg) -> Self {
        match value {
            ReorderActionArg::Approve => ReorderAction::Approve,
            ReorderActionArg::Reject => ReorderAction::Reject,
        }
    }
}

struct CliContext {
    config: AppConfig,
    store: Arc<SeaOrmStore>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let store = Arc::new(SeaOrmStore::new(Arc::new(db_pool)));

        Ok(Self { config, store })
    }

    fn shared_store(&self) -> Arc<dyn ForecastStore> {
        self.store.clone()
    }

    fn forecasting_service(&self) -> ForecastingService {
        ForecastingService::new(
            self.shared_store(),
            self.config.forecast.clone(),
            self.config.reorder.clone(),
        )
    }

    fn anomaly_service(&self) -> AnomalyDetectionService {
        AnomalyDetectionService::new(self.shared_store(), self.config.anomaly.clone())
    }
}

#[derive(Serialize)]
struct RunAllSummary {
    forecasts: ForecastRunReport,
    reorders: ReorderRunReport,
    anomalies: AnomalyReport,
}

async fn detect(context: &CliContext, store_id: Uuid, persist: bool) -> Result<AnomalyReport> {
    let service = context.anomaly_service();
    let report = service
        .detect_anomalies(store_id)
        .await
        .context("anomaly detection failed")?;
    if persist {
        service
            .persist_anomalies(&report)
            .await
            .context("failed to persist anomalies")?;
        info!(count = report.anomalies.len(), "Anomalies persisted");
    }
    Ok(report)
}

async fn run_all(context: &CliContext, store_id: Uuid) -> Result<RunAllSummary> {
    let forecasting = context.forecasting_service();
    let planning = async {
        let forecasts = forecasting
            .run_store_forecasts(store_id)
            .await
            .context("forecast run failed")?;
        let reorders = forecasting
            .generate_reorder_suggestions(store_id)
            .await
            .context("reorder run failed")?;
        Ok::<_, anyhow::Error>((forecasts, reorders))
    };

    let ((forecasts, reorders), anomalies) =
        future::try_join(planning, detect(context, store_id, true)).await?;

    Ok(RunAllSummary {
        forecasts,
        reorders,
        anomalies,
    })
}

fn render<T: Serialize>(value: &T, json: bool, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn render_forecast_report(report: &ForecastRunReport) {
    println!(
        "Forecasts for store {}: {} processed, {} succeeded, {} failed",
        report.store_id, report.processed, report.succeeded, report.failed
    );
    for failure in &report.failures {
        println!("  - SKU {}: {}", failure.sku_id, failure.error);
    }
}

fn render_reorder_report(report: &ReorderRunReport) {
    println!(
        "Reorders for store {}: {} evaluated, {} created, {} not triggered, {} suppressed, {} skipped, {} failed",
        report.store_id,
        report.evaluated,
        report.created,
        report.not_triggered,
        report.suppressed,
        report.skipped,
        report.failed
    );
    for failure in &report.failures {
        println!("  - SKU {}: {}", failure.sku_id, failure.error);
    }
}

fn render_anomaly_report(report: &AnomalyReport) {
    let summary = &report.summary;
    println!(
        "Anomalies: {} total ({} high, {} medium, {} low)",
        summary.total, summary.high_severity, summary.medium_severity, summary.low_severity
    );
    for anomaly in &report.anomalies {
        println!(
            "  - [{}] {} SKU {}: {}",
            anomaly.severity, anomaly.anomaly_type, anomaly.sku_id, anomaly.description
        );
    }
}
