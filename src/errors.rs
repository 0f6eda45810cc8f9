use sea_orm::error::DbErr;
use serde::Serialize;
use uuid::Uuid;

/// Failures raised by the pure forecasting, reorder and anomaly engines.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
pub enum ForecastError {
    /// A statistic needed data the input did not provide and no fallback exists.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A computation produced NaN or an infinite value.
    #[error("Computation error: {0}")]
    Computation(String),
}

impl ForecastError {
    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<ForecastError> for ServiceError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::InsufficientData(msg) => ServiceError::InsufficientData(msg),
            ForecastError::Computation(msg) => ServiceError::ComputationError(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    pub fn database_error_message(message: impl Into<String>) -> Self {
        ServiceError::DatabaseError(DbErr::Custom(message.into()))
    }

    pub fn anomaly_not_found(id: Uuid) -> Self {
        ServiceError::NotFound(format!("Anomaly with ID {} not found", id))
    }

    pub fn suggestion_not_found(id: Uuid) -> Self {
        ServiceError::NotFound(format!("Reorder suggestion with ID {} not found", id))
    }

    /// A review or resolution attempted on a record that has left the pending state.
    pub fn not_pending(record: &str, id: Uuid, status: impl std::fmt::Display) -> Self {
        ServiceError::InvalidOperation(format!("{} {} is already {}", record, id, status))
    }

    /// True when the failure came from the input data or the numeric engines rather
    /// than from infrastructure. Batch runs treat these as per-SKU failures.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData(_)
                | Self::ComputationError(_)
                | Self::InvalidInput(_)
                | Self::ValidationError(_)
        )
    }
}

pub type AppError = ServiceError;
