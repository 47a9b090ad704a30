use thiserror::Error;

/// Errors for genuinely invalid call contracts. Data-shape problems in the
/// trade collection never surface here.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("invalid thresholds: {}", .0.join(", "))]
    InvalidThresholds(Vec<String>),

    #[error("failed to load thresholds: {0}")]
    ThresholdLoad(#[from] ::config::ConfigError),

    #[error("trade source failed: {0}")]
    Source(#[source] anyhow::Error),

    #[error("analysis already in flight for user {user_id}, strategy {strategy_id}")]
    AlreadyInFlight { user_id: String, strategy_id: String },
}

/// Reasons a single raw record is excluded at the ingestion boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("unparseable date '{value}'")]
    InvalidDate { value: String },

    #[error("non-numeric value for {field}: {value}")]
    NonNumeric { field: &'static str, value: String },

    #[error("unknown side '{value}'")]
    InvalidSide { value: String },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: rust_decimal::Decimal },

    #[error("{field} magnitude exceeds {limit}: {value}")]
    OutOfRange {
        field: &'static str,
        value: rust_decimal::Decimal,
        limit: rust_decimal::Decimal,
    },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
